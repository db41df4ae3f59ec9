//! Per-car service workflows.
//!
//! A refuel task lives from arrival until the car is handed to checkout or
//! gives up; a checkout task lives from the moment a register is free until
//! the register goes back into its pool.

use super::checkout_queue::CheckoutQueue;
use super::config::SimulationConfig;
use super::errors::{PoolError, SimError, SimResult};
use super::resource_pool::ResourcePool;
use super::stats::Stats;
use super::types::{Car, CashRegister, FuelType, PerFuel, Station};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Everything the workflows share: parameters, pools, the checkout queue and statistics.
#[derive(Debug)]
pub struct StationContext {
    pub config: Arc<SimulationConfig>,
    pub stats: Arc<Stats>,
    pub stations: PerFuel<ResourcePool<Station>>,
    pub registers: ResourcePool<CashRegister>,
    pub checkout: CheckoutQueue,
}

impl StationContext {
    /// Build every pool from the configuration.
    ///
    /// Station ids are unique across categories and assigned in category order.
    pub fn new(config: Arc<SimulationConfig>, stats: Arc<Stats>) -> Self {
        let mut next_id = 0;
        let stations = PerFuel::from_fn(|fuel| {
            let resources = (0..config.station_counts[fuel])
                .map(|_| {
                    let station = Station::new(next_id, fuel, config.fueling_time[fuel]);
                    next_id += 1;
                    station
                })
                .collect();
            ResourcePool::new(format!("{} station", fuel), resources)
        });
        let registers = ResourcePool::new(
            "cash register",
            (0..config.cash_register_count).map(CashRegister::new).collect(),
        );
        let checkout = CheckoutQueue::new(config.checkout_queue_capacity);

        Self {
            config,
            stats,
            stations,
            registers,
            checkout,
        }
    }

    pub fn station_pool(&self, fuel: FuelType) -> &ResourcePool<Station> {
        &self.stations[fuel]
    }
}

/// How a refuel attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum RefuelOutcome {
    /// Refueled and queued for checkout
    HandedToCheckout {
        car_id: u64,
        station_id: usize,
        units: f64,
        receipt: f64,
        service_time: Duration,
    },
    /// Patience ran out before a station was free
    Abandoned { car_id: u64, waited: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    pub car_id: u64,
    pub register_id: usize,
    pub queue_wait: Duration,
    pub service_time: Duration,
}

/// Dispensed units for a service of `service_secs` at a station whose
/// longest service is `max_secs`.
pub fn dispensed_units(service_secs: f64, max_secs: f64, tank_size: u32) -> f64 {
    if max_secs <= 0.0 {
        return 0.0;
    }
    service_secs / max_secs * tank_size as f64
}

/// Wait for a station, refuel, and hand the car to checkout.
///
/// The car gets exactly one attempt. Giving up is recorded in statistics and
/// reported as [`RefuelOutcome::Abandoned`], not as an error.
///
/// # Returns
/// [`SimError::CheckoutClosed`] if the checkout queue closes before the car
/// gets a place in it. The refuel itself stays counted.
pub async fn refuel(ctx: Arc<StationContext>, mut car: Car) -> SimResult<RefuelOutcome> {
    let pool = ctx.station_pool(car.fuel);
    ctx.stats.enter_refuel_queue();

    let station = match pool.acquire_timeout(car.patience).await {
        Ok(station) => {
            ctx.stats.leave_refuel_queue();
            station
        }
        Err(PoolError::Timeout { .. }) => {
            ctx.stats.leave_refuel_queue();
            ctx.stats.record_abandonment(car.patience);
            log::debug!(
                "[Refuel car {}] Left after waiting {:.2}s for a {} station",
                car.id,
                car.patience.as_secs_f64(),
                car.fuel
            );
            return Ok(RefuelOutcome::Abandoned {
                car_id: car.id,
                waited: car.patience,
            });
        }
        Err(e) => {
            ctx.stats.leave_refuel_queue();
            return Err(e.into());
        }
    };

    let service_secs = station.fueling_time.sample(&mut rand::thread_rng());
    let service_time = Duration::from_secs_f64(service_secs);
    log::debug!(
        "[Refuel car {}] Refueling {} at station {} for {:.2}s",
        car.id,
        car.fuel,
        station.id,
        service_secs
    );
    tokio::time::sleep(service_time).await;

    let units = dispensed_units(service_secs, station.fueling_time.max, car.tank_size);
    car.receipt = units * ctx.config.fuel_pricing[car.fuel];
    ctx.stats.record_refuel(car.fuel, units, service_time);
    car.checkout_queue_start = Some(Instant::now());

    let station_id = station.id;
    if let Err(e) = pool.release(station) {
        log::error!("[Refuel car {}] Could not return station {}: {}", car.id, station_id, e);
    }

    let outcome = RefuelOutcome::HandedToCheckout {
        car_id: car.id,
        station_id,
        units,
        receipt: car.receipt,
        service_time,
    };

    // counted before the push so cars held back by a full queue show up too
    ctx.stats.enter_checkout_queue();
    if let Err(car) = ctx.checkout.push(car).await {
        ctx.stats.leave_checkout_queue();
        return Err(SimError::CheckoutClosed(car.id));
    }
    Ok(outcome)
}

/// Serve the next queued car at `register`, then return the register.
///
/// Returns `None` if the checkout queue was closed.
pub async fn checkout(
    ctx: Arc<StationContext>,
    register: CashRegister,
) -> SimResult<Option<CheckoutOutcome>> {
    let car = match ctx.checkout.pop().await {
        Some(car) => car,
        None => {
            ctx.registers.release(register)?;
            return Ok(None);
        }
    };
    ctx.stats.leave_checkout_queue();

    let queue_wait = car
        .checkout_queue_start
        .map(|start| start.elapsed())
        .unwrap_or_default();
    ctx.stats.record_checkout_queue_wait(queue_wait);

    let service_secs = ctx.config.checkout_time.sample(&mut rand::thread_rng());
    let service_time = Duration::from_secs_f64(service_secs);
    ctx.stats
        .record_checkout_started(car.fuel, car.receipt, service_time);

    log::debug!(
        "[Checkout register {}] Car {} paying {:.2} for {}, {:.2}s",
        register.id,
        car.id,
        car.receipt,
        car.fuel,
        service_secs
    );
    tokio::time::sleep(service_time).await;

    ctx.stats.record_checkout_finished(car.fuel);
    let outcome = CheckoutOutcome {
        car_id: car.id,
        register_id: register.id,
        queue_wait,
        service_time,
    };
    ctx.registers.release(register)?;
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispensed_units() {
        assert_eq!(dispensed_units(5.0, 5.0, 60), 60.0);
        assert_eq!(dispensed_units(2.5, 5.0, 60), 30.0);
        assert_eq!(dispensed_units(1.0, 0.0, 60), 0.0);
    }

    #[test]
    fn test_context_builds_pools_from_config() {
        let config = Arc::new(
            SimulationConfig::default()
                .with_station_counts([3, 2, 0, 1])
                .with_cash_registers(4)
                .with_checkout_queue_capacity(7),
        );
        let ctx = StationContext::new(config, Arc::new(Stats::new()));

        assert_eq!(ctx.station_pool(FuelType::Gas).capacity(), 3);
        assert_eq!(ctx.station_pool(FuelType::Diesel).capacity(), 2);
        assert_eq!(ctx.station_pool(FuelType::Lpg).capacity(), 0);
        assert_eq!(ctx.station_pool(FuelType::Electric).capacity(), 1);
        assert_eq!(ctx.registers.capacity(), 4);
        assert_eq!(ctx.checkout.capacity(), 7);
    }

    #[tokio::test]
    async fn test_station_ids_are_unique_across_fuels() {
        let config = Arc::new(SimulationConfig::default().with_station_counts([2, 2, 1, 1]));
        let ctx = StationContext::new(config, Arc::new(Stats::new()));

        let mut ids = Vec::new();
        for fuel in FuelType::ALL {
            let pool = ctx.station_pool(fuel);
            for _ in 0..pool.capacity() {
                let station = pool.acquire().await.unwrap();
                assert_eq!(station.fuel, fuel);
                ids.push(station.id);
            }
            assert_eq!(pool.held(), pool.capacity());
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }
}
