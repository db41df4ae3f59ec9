//! Run-wide statistics shared by every task.
//!
//! Integer counters are atomics, floating sums are mutex-guarded. Each field
//! is updated on its own; a snapshot taken mid-run may see a count whose
//! paired sum has not been added yet.

use super::types::{FuelType, PerFuel};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct Sum(Mutex<f64>);

impl Sum {
    fn add(&self, value: f64) {
        *self.0.lock() += value;
    }

    fn get(&self) -> f64 {
        *self.0.lock()
    }
}

/// Counters, live gauges and running sums for one simulation run.
///
/// Shared behind an `Arc` by the generator, every workflow task and the
/// progress reporter. Only the `record_*`, `enter_*` and `leave_*` methods
/// mutate it.
#[derive(Debug, Default)]
pub struct Stats {
    cars_spawned: AtomicU64,
    cars_not_served: AtomicU64,
    cars_refueled: PerFuel<AtomicU64>,
    cars_checked_out: PerFuel<AtomicU64>,
    in_refuel_queue: AtomicI64,
    in_checkout_queue: AtomicI64,

    cash_per_fuel: PerFuel<Sum>,
    units_per_fuel: PerFuel<Sum>,
    time_refueling: PerFuel<Sum>,
    checkout_time_total: Sum,
    time_before_leaving: Sum,
    time_in_checkout_queue: Sum,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&self) {
        self.cars_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// A car started waiting for a station
    pub fn enter_refuel_queue(&self) {
        self.in_refuel_queue.fetch_add(1, Ordering::Relaxed);
    }

    pub fn leave_refuel_queue(&self) {
        self.in_refuel_queue.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn enter_checkout_queue(&self) {
        self.in_checkout_queue.fetch_add(1, Ordering::Relaxed);
    }

    pub fn leave_checkout_queue(&self) {
        self.in_checkout_queue.fetch_sub(1, Ordering::Relaxed);
    }

    /// A car finished refueling
    ///
    /// # Arguments
    /// * `fuel` - Category of the station that served it
    /// * `units` - Amount dispensed, in the category's unit
    /// * `duration` - Time spent at the station
    pub fn record_refuel(&self, fuel: FuelType, units: f64, duration: Duration) {
        self.units_per_fuel[fuel].add(units);
        self.time_refueling[fuel].add(duration.as_secs_f64());
        self.cars_refueled[fuel].fetch_add(1, Ordering::Relaxed);
    }

    /// A car gave up waiting for a station after `waited`
    pub fn record_abandonment(&self, waited: Duration) {
        self.time_before_leaving.add(waited.as_secs_f64());
        self.cars_not_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Time between the end of refueling and reaching a register
    pub fn record_checkout_queue_wait(&self, waited: Duration) {
        self.time_in_checkout_queue.add(waited.as_secs_f64());
    }

    /// Book a checkout's service time and revenue; called before the service completes
    pub fn record_checkout_started(&self, fuel: FuelType, receipt: f64, duration: Duration) {
        self.checkout_time_total.add(duration.as_secs_f64());
        self.cash_per_fuel[fuel].add(receipt);
    }

    pub fn record_checkout_finished(&self, fuel: FuelType) {
        self.cars_checked_out[fuel].fetch_add(1, Ordering::Relaxed);
    }

    pub fn cars_spawned(&self) -> u64 {
        self.cars_spawned.load(Ordering::Relaxed)
    }

    pub fn cars_in_refuel_queue(&self) -> i64 {
        self.in_refuel_queue.load(Ordering::Relaxed)
    }

    pub fn cars_in_checkout_queue(&self) -> i64 {
        self.in_checkout_queue.load(Ordering::Relaxed)
    }

    pub fn cars_checked_out_total(&self) -> u64 {
        self.cars_checked_out
            .values()
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Copy every field into a plain value
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cars_spawned: self.cars_spawned.load(Ordering::Relaxed),
            cars_not_served: self.cars_not_served.load(Ordering::Relaxed),
            cars_refueled: self.cars_refueled.map(|c| c.load(Ordering::Relaxed)),
            cars_checked_out: self.cars_checked_out.map(|c| c.load(Ordering::Relaxed)),
            cars_in_refuel_queue: self.in_refuel_queue.load(Ordering::Relaxed),
            cars_in_checkout_queue: self.in_checkout_queue.load(Ordering::Relaxed),
            cash_per_fuel: self.cash_per_fuel.map(Sum::get),
            units_per_fuel: self.units_per_fuel.map(Sum::get),
            time_refueling: self.time_refueling.map(Sum::get),
            checkout_time_total: self.checkout_time_total.get(),
            time_before_leaving: self.time_before_leaving.get(),
            time_in_checkout_queue: self.time_in_checkout_queue.get(),
        }
    }
}

/// Point-in-time copy of [`Stats`]. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatsSnapshot {
    pub cars_spawned: u64,
    pub cars_not_served: u64,
    pub cars_refueled: PerFuel<u64>,
    pub cars_checked_out: PerFuel<u64>,
    pub cars_in_refuel_queue: i64,
    pub cars_in_checkout_queue: i64,
    pub cash_per_fuel: PerFuel<f64>,
    pub units_per_fuel: PerFuel<f64>,
    pub time_refueling: PerFuel<f64>,
    pub checkout_time_total: f64,
    pub time_before_leaving: f64,
    pub time_in_checkout_queue: f64,
}

impl StatsSnapshot {
    pub fn refueled_total(&self) -> u64 {
        self.cars_refueled.values().iter().sum()
    }

    pub fn checked_out_total(&self) -> u64 {
        self.cars_checked_out.values().iter().sum()
    }

    pub fn cash_total(&self) -> f64 {
        self.cash_per_fuel.values().iter().sum()
    }

    pub fn units_total(&self) -> f64 {
        self.units_per_fuel.values().iter().sum()
    }

    pub fn refueling_time_total(&self) -> f64 {
        self.time_refueling.values().iter().sum()
    }

    /// Every arrival has been resolved one way or the other
    pub fn is_drained(&self) -> bool {
        self.refueled_total() + self.cars_not_served == self.cars_spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = Stats::new().snapshot();
        assert_eq!(snapshot, StatsSnapshot::default());
        assert!(snapshot.is_drained());
    }

    #[test]
    fn test_refuel_and_checkout_accounting() {
        let stats = Stats::new();
        stats.record_arrival();
        stats.enter_refuel_queue();
        stats.leave_refuel_queue();
        stats.record_refuel(FuelType::Diesel, 30.0, Duration::from_secs(4));
        stats.enter_checkout_queue();

        let mid = stats.snapshot();
        assert_eq!(mid.cars_refueled[FuelType::Diesel], 1);
        assert_eq!(mid.cars_in_checkout_queue, 1);
        assert_eq!(mid.time_refueling[FuelType::Diesel], 4.0);
        assert!(mid.is_drained());

        stats.leave_checkout_queue();
        stats.record_checkout_queue_wait(Duration::from_millis(500));
        stats.record_checkout_started(FuelType::Diesel, 45.0, Duration::from_secs(2));
        stats.record_checkout_finished(FuelType::Diesel);

        let done = stats.snapshot();
        assert_eq!(done.checked_out_total(), 1);
        assert_eq!(done.cash_per_fuel[FuelType::Diesel], 45.0);
        assert_eq!(done.checkout_time_total, 2.0);
        assert_eq!(done.time_in_checkout_queue, 0.5);
        assert_eq!(done.cars_in_checkout_queue, 0);
    }

    #[test]
    fn test_abandonment_accounting() {
        let stats = Stats::new();
        stats.record_arrival();
        stats.record_abandonment(Duration::from_millis(1500));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cars_not_served, 1);
        assert_eq!(snapshot.time_before_leaving, 1.5);
        assert!(snapshot.is_drained());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_arrival();
                        stats.record_refuel(FuelType::Gas, 1.0, Duration::from_millis(10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cars_spawned, 8000);
        assert_eq!(snapshot.cars_refueled[FuelType::Gas], 8000);
        assert!((snapshot.units_per_fuel[FuelType::Gas] - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = Stats::new();
        stats.record_arrival();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["cars_spawned"], 1);
        assert_eq!(json["cars_refueled"].as_array().unwrap().len(), 4);
    }
}
