use super::errors::{SimError, SimResult};
use super::types::{FuelType, PerFuel, TimeRange};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Reject seconds values that cannot become a `Duration`
fn check_seconds(what: &str, seconds: f64) -> SimResult<()> {
    Duration::try_from_secs_f64(seconds)
        .map(|_| ())
        .map_err(|_| SimError::Config(format!("{} of {} seconds is out of range", what, seconds)))
}

fn default_checkout_queue_capacity() -> usize {
    10
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_report_every_ticks() -> u64 {
    10
}

fn default_shutdown_grace_ms() -> u64 {
    200
}

/// Parameter bundle for one simulation run.
///
/// Per-fuel arrays are in [`FuelType::ALL`] order. Durations are in seconds
/// unless the field name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Price per dispensed unit
    pub fuel_pricing: PerFuel<f64>,
    /// Arrival weights, used as cumulative ranges over `[0, 1)`
    pub fuel_type_chance: PerFuel<f64>,
    pub fueling_time: PerFuel<TimeRange>,
    pub station_counts: PerFuel<usize>,
    pub cash_register_count: usize,
    pub checkout_time: TimeRange,
    /// Probability that a car arrives on any given tick
    pub car_spawn_chance: f64,
    pub car_wait_time_bias: f64,
    pub simulation_length: f64,

    #[serde(default = "default_checkout_queue_capacity")]
    pub checkout_queue_capacity: usize,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Progress is logged every this many ticks; 0 disables it
    #[serde(default = "default_report_every_ticks")]
    pub report_every_ticks: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fuel_pricing: PerFuel::new([1.65, 1.55, 0.95, 0.45]),
            fuel_type_chance: PerFuel::new([0.45, 0.3, 0.1, 0.15]),
            fueling_time: PerFuel::new([
                TimeRange::new(2.0, 5.0),
                TimeRange::new(3.0, 6.0),
                TimeRange::new(3.0, 7.0),
                TimeRange::new(10.0, 20.0),
            ]),
            station_counts: PerFuel::new([4, 2, 1, 2]),
            cash_register_count: 2,
            checkout_time: TimeRange::new(1.0, 3.0),
            car_spawn_chance: 0.3,
            car_wait_time_bias: 5.0,
            simulation_length: 30.0,
            checkout_queue_capacity: default_checkout_queue_capacity(),
            tick_interval_ms: default_tick_interval_ms(),
            report_every_ticks: default_report_every_ticks(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration from a JSON string
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            log::error!("Error reading config file {}: {}", path.display(), e);
            SimError::Io(e)
        })?;
        Self::from_json(&json)
    }

    /// Set the simulation length
    ///
    /// # Arguments
    /// * `seconds` - Wall-clock length of the arrival phase
    ///
    /// # Returns
    /// A new configuration with the specified length
    pub fn with_simulation_length(mut self, seconds: f64) -> Self {
        self.simulation_length = seconds;
        self
    }

    /// Set the per-tick arrival probability
    ///
    /// # Arguments
    /// * `chance` - Probability in `[0, 1]` that a car arrives on a tick
    pub fn with_spawn_chance(mut self, chance: f64) -> Self {
        self.car_spawn_chance = chance;
        self
    }

    /// Set the patience bias. Patience is drawn from `[bias / 1.5, bias * 2]` seconds.
    pub fn with_wait_time_bias(mut self, bias: f64) -> Self {
        self.car_wait_time_bias = bias;
        self
    }

    /// Set the arrival weights in [`FuelType::ALL`] order
    ///
    /// # Arguments
    /// * `weights` - Non-negative weights; they are normalized by their sum
    ///
    /// # Returns
    /// A new configuration with the specified weights
    pub fn with_fuel_type_chance(mut self, weights: [f64; 4]) -> Self {
        self.fuel_type_chance = PerFuel::new(weights);
        self
    }

    pub fn with_station_counts(mut self, counts: [usize; 4]) -> Self {
        self.station_counts = PerFuel::new(counts);
        self
    }

    /// Set the service time range for one fuel type
    ///
    /// # Arguments
    /// * `fuel` - The category to change
    /// * `range` - Service time in seconds; `max` also scales dispensed units
    ///
    /// # Returns
    /// A new configuration with the specified range
    pub fn with_fueling_time(mut self, fuel: FuelType, range: TimeRange) -> Self {
        self.fueling_time[fuel] = range;
        self
    }

    pub fn with_cash_registers(mut self, count: usize) -> Self {
        self.cash_register_count = count;
        self
    }

    pub fn with_checkout_time(mut self, range: TimeRange) -> Self {
        self.checkout_time = range;
        self
    }

    /// Set how many refueled cars may wait for a register before refueling
    /// stalls on the hand-off
    pub fn with_checkout_queue_capacity(mut self, capacity: usize) -> Self {
        self.checkout_queue_capacity = capacity;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Length of the arrival phase. Only meaningful on a validated configuration.
    pub fn run_length(&self) -> Duration {
        Duration::try_from_secs_f64(self.simulation_length).unwrap_or_default()
    }

    /// Check that every parameter is usable.
    ///
    /// Every value later turned into a [`Duration`] must be representable as
    /// one. An all-zero weight vector is accepted with a warning.
    ///
    /// # Returns
    /// `Ok(())` if the configuration can be run, otherwise [`SimError::Config`]
    pub fn validate(&self) -> SimResult<()> {
        if !(self.simulation_length > 0.0) || !self.simulation_length.is_finite() {
            return Err(SimError::Config(
                "Simulation length must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.car_spawn_chance) {
            return Err(SimError::Config(
                "Car spawn chance must be between 0 and 1".to_string(),
            ));
        }

        if !(self.car_wait_time_bias >= 0.0) || !self.car_wait_time_bias.is_finite() {
            return Err(SimError::Config(
                "Car wait time bias cannot be negative".to_string(),
            ));
        }

        for (fuel, price) in self.fuel_pricing.iter() {
            if !(*price >= 0.0) {
                return Err(SimError::Config(format!("{} price cannot be negative", fuel)));
            }
        }

        for (fuel, weight) in self.fuel_type_chance.iter() {
            if !(*weight >= 0.0) {
                return Err(SimError::Config(format!(
                    "{} arrival chance cannot be negative",
                    fuel
                )));
            }
        }

        for (fuel, range) in self.fueling_time.iter() {
            if !(range.min >= 0.0) || range.min > range.max {
                return Err(SimError::Config(format!(
                    "{} fueling time must satisfy 0 <= min <= max",
                    fuel
                )));
            }
            if range.max <= 0.0 {
                return Err(SimError::Config(format!(
                    "{} maximum fueling time must be greater than 0",
                    fuel
                )));
            }
        }

        if !(self.checkout_time.min >= 0.0) || self.checkout_time.min > self.checkout_time.max {
            return Err(SimError::Config(
                "Checkout time must satisfy 0 <= min <= max".to_string(),
            ));
        }

        check_seconds("Simulation length", self.simulation_length)?;
        check_seconds("Longest patience (car wait time bias * 2)", self.car_wait_time_bias * 2.0)?;
        for (fuel, range) in self.fueling_time.iter() {
            check_seconds(&format!("{} maximum fueling time", fuel), range.max)?;
        }
        check_seconds("Maximum checkout time", self.checkout_time.max)?;

        if self.checkout_queue_capacity == 0 {
            return Err(SimError::Config(
                "Checkout queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(SimError::Config(
                "Tick interval must be greater than 0".to_string(),
            ));
        }

        let total_weight: f64 = self.fuel_type_chance.values().iter().sum();
        if total_weight == 0.0 {
            log::warn!(
                "All fuel type chances are zero; every car will want {}",
                FuelType::Gas
            );
        }

        if self.cash_register_count == 0 {
            log::warn!("No cash registers configured; no car will ever check out");
        }

        for (fuel, count) in self.station_counts.iter() {
            if *count == 0 && self.fuel_type_chance[fuel] > 0.0 {
                log::warn!("No {} stations configured; every {} car will leave unserved", fuel, fuel);
            }
        }

        Ok(())
    }
}
