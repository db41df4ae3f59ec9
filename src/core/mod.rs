pub mod arrivals;
pub mod checkout_queue;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod progress;
pub mod resource_pool;
pub mod simulation;
pub mod stats;
pub mod types;
pub mod workflows;
