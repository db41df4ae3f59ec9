use super::clock::Tick;
use super::stats::Stats;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Logs live queue depths every `every` ticks until shutdown.
pub struct ProgressReporter {
    stats: Arc<Stats>,
    every: u64,
}

impl ProgressReporter {
    pub fn new(stats: Arc<Stats>, every: u64) -> Self {
        Self { stats, every }
    }

    fn is_report_tick(&self, tick: Tick) -> bool {
        self.every > 0 && tick % self.every == 0
    }

    /// One line summary of the current gauges
    pub fn line(&self) -> String {
        format!(
            "Cars spawned: {} | in queue to refuel: {} | in queue to checkout: {} | checked out: {}",
            self.stats.cars_spawned(),
            self.stats.cars_in_refuel_queue(),
            self.stats.cars_in_checkout_queue(),
            self.stats.cars_checked_out_total()
        )
    }

    pub async fn run(
        self,
        mut ticks: broadcast::Receiver<Tick>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                tick = ticks.recv() => match tick {
                    Ok(tick) if self.is_report_tick(tick) => {
                        log::info!("[Progress] {}", self.line());
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_cadence() {
        let reporter = ProgressReporter::new(Arc::new(Stats::new()), 10);
        assert!(!reporter.is_report_tick(1));
        assert!(reporter.is_report_tick(10));
        assert!(reporter.is_report_tick(30));

        let disabled = ProgressReporter::new(Arc::new(Stats::new()), 0);
        assert!(!disabled.is_report_tick(10));
    }

    #[test]
    fn test_line_reflects_gauges() {
        let stats = Arc::new(Stats::new());
        stats.record_arrival();
        stats.record_arrival();
        stats.enter_refuel_queue();
        let reporter = ProgressReporter::new(stats, 10);
        let line = reporter.line();
        assert!(line.contains("Cars spawned: 2"));
        assert!(line.contains("in queue to refuel: 1"));
        assert!(line.contains("checked out: 0"));
    }
}
