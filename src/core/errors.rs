use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`ResourcePool`](super::resource_pool::ResourcePool).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    /// No resource became available within the caller's timeout
    #[error("no {pool} available within {waited:?}")]
    Timeout { pool: String, waited: Duration },

    #[error("{pool} pool is closed")]
    Closed { pool: String },

    /// More resources were released than acquired
    #[error("release into {pool} pool would exceed its capacity of {capacity}")]
    Overflow { pool: String, capacity: usize },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("checkout queue closed, car {0} dropped")]
    CheckoutClosed(u64),
}

pub type SimResult<T> = Result<T, SimError>;
