use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Sequence number of a tick, starting at 1
pub type Tick = u64;

/// Periodic clock fanned out to every subscriber.
///
/// Ticks are numbered from 1; the first one fires one full period after
/// [`TickSource::spawn`]. The clock stops when the shutdown flag flips to
/// `true`, after which subscribers see the channel close.
pub struct TickSource {
    tx: broadcast::Sender<Tick>,
    handle: JoinHandle<()>,
}

impl TickSource {
    pub fn spawn(period: Duration, mut shutdown: watch::Receiver<bool>) -> Self {
        let (tx, _) = broadcast::channel(16);
        let sender = tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick: Tick = 0;
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => {
                        tick += 1;
                        // no subscribers is not an error
                        let _ = sender.send(tick);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            log::debug!("[Clock] Stopped after {} ticks", tick);
        });
        Self { tx, handle }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Tick> {
        self.tx.subscribe()
    }

    /// Wait for the clock task to finish and drop the last sender
    pub async fn join(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}
