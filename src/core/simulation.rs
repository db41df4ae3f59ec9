use super::arrivals::ArrivalGenerator;
use super::clock::TickSource;
use super::config::SimulationConfig;
use super::dispatcher::Dispatcher;
use super::errors::SimResult;
use super::progress::ProgressReporter;
use super::stats::{Stats, StatsSnapshot};
use super::types::FuelType;
use super::workflows::StationContext;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Arrivals waiting for the dispatcher; it never blocks for long, so this rarely fills
const ARRIVAL_CHANNEL_CAPACITY: usize = 64;

/// Run controller for one simulation.
///
/// Shutdown stops the clock, arrivals and progress reporting only. Refuel and
/// checkout tasks already in flight keep running through the grace period,
/// and whatever they have not recorded by then is missing from the snapshot.
/// Short runs therefore undercount. After the snapshot the dispatcher is
/// stopped and the checkout queue closed, which releases idle registers and
/// drops cars still blocked on the hand-off.
pub struct Simulation {
    config: Arc<SimulationConfig>,
    stats: Arc<Stats>,
}

impl Simulation {
    /// Validate `config` and prepare a run
    ///
    /// # Returns
    /// [`SimError::Config`](super::errors::SimError::Config) if the configuration is unusable
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            stats: Arc::new(Stats::new()),
        })
    }

    /// The validated configuration this simulation will run with
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Live statistics, readable while [`Simulation::run`] is in progress
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    /// Run for the configured length and return the final statistics.
    pub async fn run(self) -> StatsSnapshot {
        let ctx = Arc::new(StationContext::new(self.config.clone(), self.stats.clone()));
        let (arrivals_tx, arrivals_rx) = mpsc::channel(ARRIVAL_CHANNEL_CAPACITY);
        let dispatcher = Dispatcher::new(ctx.clone(), arrivals_rx).spawn();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let clock = TickSource::spawn(self.config.tick_interval(), shutdown_rx.clone());

        let generator = ArrivalGenerator::new(self.config.clone(), self.stats.clone(), arrivals_tx);
        let generator = tokio::spawn(generator.run(clock.subscribe(), shutdown_rx.clone()));

        let reporter = ProgressReporter::new(self.stats.clone(), self.config.report_every_ticks);
        let reporter = tokio::spawn(reporter.run(clock.subscribe(), shutdown_rx));

        log::info!(
            "Simulation started: {:.1}s, spawn chance {:.2} per {}ms tick",
            self.config.simulation_length,
            self.config.car_spawn_chance,
            self.config.tick_interval_ms
        );

        tokio::time::sleep(self.config.run_length()).await;
        // receivers only disappear if their tasks already ended
        let _ = shutdown_tx.send(true);
        if let Err(e) = generator.await {
            log::error!("Arrival generator failed: {}", e);
        }
        if let Err(e) = reporter.await {
            log::error!("Progress reporter failed: {}", e);
        }
        clock.join().await;

        tokio::time::sleep(self.config.shutdown_grace()).await;
        let snapshot = self.stats.snapshot();
        dispatcher.abort();
        // wakes idle registers and any refuel blocked on a full queue
        ctx.checkout.close();
        Self::log_leftovers(&ctx);

        log::info!(
            "Simulation finished: {} cars, {} refueled, {} checked out, {} not served",
            snapshot.cars_spawned,
            snapshot.refueled_total(),
            snapshot.checked_out_total(),
            snapshot.cars_not_served
        );
        snapshot
    }

    fn log_leftovers(ctx: &StationContext) {
        if !ctx.checkout.is_empty() {
            log::debug!(
                "[Simulation] {} cars left unserved in the checkout queue",
                ctx.checkout.len()
            );
        }
        for fuel in FuelType::ALL {
            let pool = ctx.station_pool(fuel);
            if pool.held() > 0 {
                log::debug!(
                    "[Simulation] {}: {} of {} still busy at shutdown",
                    pool.name(),
                    pool.held(),
                    pool.capacity()
                );
            }
        }
    }
}
