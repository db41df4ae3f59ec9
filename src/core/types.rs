use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Fuel category. Partitions both demand (cars) and supply (stations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FuelType {
    Gas,
    Diesel,
    Lpg,
    Electric,
}

impl FuelType {
    /// Every category, in the order used by all per-fuel tables.
    pub const ALL: [FuelType; 4] = [
        FuelType::Gas,
        FuelType::Diesel,
        FuelType::Lpg,
        FuelType::Electric,
    ];

    /// Position of this category in per-fuel tables
    pub fn index(self) -> usize {
        match self {
            FuelType::Gas => 0,
            FuelType::Diesel => 1,
            FuelType::Lpg => 2,
            FuelType::Electric => 3,
        }
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            FuelType::Gas => "Gas",
            FuelType::Diesel => "Diesel",
            FuelType::Lpg => "LPG",
            FuelType::Electric => "Electric",
        }
    }

    /// Unit in which this fuel is dispensed
    pub fn unit(self) -> &'static str {
        match self {
            FuelType::Gas | FuelType::Diesel => "l",
            FuelType::Lpg => "kg",
            FuelType::Electric => "kWh",
        }
    }

    /// Tank capacity range in multiples of five units, inclusive on both ends.
    fn tank_steps(self) -> (u32, u32) {
        match self {
            FuelType::Gas => (8, 24),      // 40-120 l
            FuelType::Diesel => (9, 29),   // 45-145 l
            FuelType::Lpg => (7, 24),      // 35-120 kg
            FuelType::Electric => (6, 24), // 30-120 kWh
        }
    }

    /// Sample a tank capacity for a car of this category
    pub fn sample_tank_size<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        let (low, high) = self.tank_steps();
        rng.gen_range(low..=high) * 5
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fixed-size table keyed by [`FuelType`].
///
/// Serialises as a plain four-element array in [`FuelType::ALL`] order, which
/// is the layout of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerFuel<T>(pub [T; 4]);

impl<T> PerFuel<T> {
    pub fn new(values: [T; 4]) -> Self {
        Self(values)
    }

    /// Build a table by evaluating `f` once per category
    pub fn from_fn(f: impl FnMut(FuelType) -> T) -> Self {
        Self(FuelType::ALL.map(f))
    }

    /// Iterate `(category, value)` pairs in category order
    pub fn iter(&self) -> impl Iterator<Item = (FuelType, &T)> {
        FuelType::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> &[T; 4] {
        &self.0
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerFuel<U> {
        PerFuel::from_fn(|fuel| f(&self[fuel]))
    }
}

impl<T> Index<FuelType> for PerFuel<T> {
    type Output = T;

    fn index(&self, fuel: FuelType) -> &T {
        &self.0[fuel.index()]
    }
}

impl<T> IndexMut<FuelType> for PerFuel<T> {
    fn index_mut(&mut self, fuel: FuelType) -> &mut T {
        &mut self.0[fuel.index()]
    }
}

/// Inclusive `[min, max]` range of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(alias = "Min")]
    pub min: f64,
    #[serde(alias = "Max")]
    pub max: f64,
}

impl TimeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A degenerate range that always samples `seconds`
    pub fn fixed(seconds: f64) -> Self {
        Self::new(seconds, seconds)
    }

    /// Sample a value in seconds uniformly from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        Uniform::new_inclusive(self.min, self.max).sample(rng)
    }
}

static NEXT_CAR_ID: AtomicU64 = AtomicU64::new(0);

/// A customer. Owned by exactly one workflow task at a time.
#[derive(Debug, Clone)]
pub struct Car {
    pub id: u64,
    pub fuel: FuelType,
    /// How long the car waits for a station before leaving
    pub patience: Duration,
    /// Tank capacity in the fuel's unit
    pub tank_size: u32,
    pub receipt: f64,
    pub checkout_queue_start: Option<Instant>,
}

impl Car {
    /// Create a car with the next process-wide id
    pub fn new(fuel: FuelType, patience: Duration, tank_size: u32) -> Self {
        Self {
            id: NEXT_CAR_ID.fetch_add(1, Ordering::Relaxed),
            fuel,
            patience,
            tank_size,
            receipt: 0.0,
            checkout_queue_start: None,
        }
    }

    /// Sample a new car of category `fuel`.
    ///
    /// Patience is drawn uniformly from `[bias / 1.5, bias * 2]` seconds.
    pub fn random<R: Rng + ?Sized>(fuel: FuelType, wait_time_bias: f64, rng: &mut R) -> Self {
        let patience = TimeRange::new(wait_time_bias / 1.5, wait_time_bias * 2.0).sample(rng);
        let tank_size = fuel.sample_tank_size(rng);
        // validated configs keep this in range; anything larger waits indefinitely
        let patience = Duration::try_from_secs_f64(patience.max(0.0)).unwrap_or(Duration::MAX);
        Self::new(fuel, patience, tank_size)
    }
}

/// A fuel dispenser for a single category.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: usize,
    pub fuel: FuelType,
    pub fueling_time: TimeRange,
}

impl Station {
    pub fn new(id: usize, fuel: FuelType, fueling_time: TimeRange) -> Self {
        Self {
            id,
            fuel,
            fueling_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashRegister {
    pub id: usize,
}

impl CashRegister {
    pub fn new(id: usize) -> Self {
        Self { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fuel_index_matches_all_order() {
        for (i, fuel) in FuelType::ALL.iter().enumerate() {
            assert_eq!(fuel.index(), i);
        }
    }

    #[test]
    fn test_per_fuel_indexing() {
        let mut table = PerFuel::new([1, 2, 3, 4]);
        assert_eq!(table[FuelType::Lpg], 3);
        table[FuelType::Electric] += 10;
        assert_eq!(table.values(), &[1, 2, 3, 14]);
    }

    #[test]
    fn test_per_fuel_deserializes_from_array() {
        let table: PerFuel<f64> = serde_json::from_str("[1.5, 2.0, 0.5, 0.25]").unwrap();
        assert_eq!(table[FuelType::Diesel], 2.0);
        assert!(serde_json::from_str::<PerFuel<f64>>("[1.0, 2.0]").is_err());
    }

    #[test]
    fn test_time_range_accepts_capitalized_keys() {
        let range: TimeRange = serde_json::from_str(r#"{"Min": 1.0, "Max": 3.0}"#).unwrap();
        assert_eq!(range, TimeRange::new(1.0, 3.0));
    }

    #[test]
    fn test_time_range_sample_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = TimeRange::new(2.0, 5.0);
        for _ in 0..1000 {
            let v = range.sample(&mut rng);
            assert!((2.0..=5.0).contains(&v));
        }
        assert_eq!(TimeRange::fixed(1.0).sample(&mut rng), 1.0);
    }

    #[test]
    fn test_tank_sizes_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let gas = FuelType::Gas.sample_tank_size(&mut rng);
            assert!((40..=120).contains(&gas) && gas % 5 == 0);
            let diesel = FuelType::Diesel.sample_tank_size(&mut rng);
            assert!((45..=145).contains(&diesel));
            let lpg = FuelType::Lpg.sample_tank_size(&mut rng);
            assert!((35..=120).contains(&lpg));
            let electric = FuelType::Electric.sample_tank_size(&mut rng);
            assert!((30..=120).contains(&electric));
        }
    }

    #[test]
    fn test_car_ids_are_unique_and_increasing() {
        let a = Car::new(FuelType::Gas, Duration::from_secs(1), 40);
        let b = Car::new(FuelType::Gas, Duration::from_secs(1), 40);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_random_car_patience_window() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let car = Car::random(FuelType::Diesel, 3.0, &mut rng);
            let secs = car.patience.as_secs_f64();
            assert!(secs >= 2.0 - 1e-9 && secs <= 6.0 + 1e-9);
            assert_eq!(car.receipt, 0.0);
            assert!(car.checkout_queue_start.is_none());
        }
    }

    #[test]
    fn test_out_of_range_patience_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(4);
        let car = Car::random(FuelType::Gas, 1e20, &mut rng);
        assert_eq!(car.patience, Duration::MAX);
        let car = Car::random(FuelType::Gas, -1.0, &mut rng);
        assert_eq!(car.patience, Duration::ZERO);
    }
}
