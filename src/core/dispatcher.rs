use super::errors::SimError;
use super::types::{Car, CashRegister};
use super::workflows::{checkout, refuel, StationContext};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The only place where workflow tasks are started.
///
/// Waits on two sources at once: newly arrived cars, each of which gets a
/// refuel task, and free registers, each of which gets a checkout task. It
/// never waits on a task it started and never stops on its own.
pub struct Dispatcher {
    ctx: Arc<StationContext>,
    arrivals: mpsc::Receiver<Car>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<StationContext>, arrivals: mpsc::Receiver<Car>) -> Self {
        Self { ctx, arrivals }
    }

    /// Run on a new task. The handle is only used to abort it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        let mut refuels = 0u64;
        let mut checkouts = 0u64;
        loop {
            tokio::select! {
                Some(car) = self.arrivals.recv() => {
                    refuels += 1;
                    Self::start_refuel(self.ctx.clone(), car);
                }
                register = self.ctx.registers.acquire() => match register {
                    Ok(register) => {
                        checkouts += 1;
                        Self::start_checkout(self.ctx.clone(), register);
                    }
                    Err(e) => {
                        log::error!("[Dispatcher] {}; stopping", e);
                        break;
                    }
                },
            }
        }
        log::debug!(
            "[Dispatcher] Started {} refuels and {} checkouts",
            refuels,
            checkouts
        );
    }

    fn start_refuel(ctx: Arc<StationContext>, car: Car) {
        tokio::spawn(async move {
            let car_id = car.id;
            match refuel(ctx, car).await {
                Ok(_) => {}
                // only happens after the run has ended
                Err(SimError::CheckoutClosed(_)) => {
                    log::debug!("[Refuel car {}] Checkout closed before hand-off", car_id);
                }
                Err(e) => log::error!("[Refuel car {}] {}", car_id, e),
            }
        });
    }

    fn start_checkout(ctx: Arc<StationContext>, register: CashRegister) {
        tokio::spawn(async move {
            let register_id = register.id;
            if let Err(e) = checkout(ctx, register).await {
                log::error!("[Checkout register {}] {}", register_id, e);
            }
        });
    }
}
