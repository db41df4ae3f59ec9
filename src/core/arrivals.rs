//! Tick-driven car arrivals.

use super::clock::Tick;
use super::config::SimulationConfig;
use super::stats::Stats;
use super::types::{Car, FuelType, PerFuel};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Select a fuel type for a uniform `draw` in `[0, 1)`.
///
/// Weights are normalized by their sum, so category `i` is picked with
/// probability `w[i] / sum(w)`. Each category owns the cumulative interval
/// `[low, high]` in category order and on a shared boundary the later
/// category wins.
///
/// # Arguments
/// * `weights` - Non-negative arrival weights, in any scale
/// * `draw` - Uniform sample in `[0, 1)`
///
/// # Returns
/// The selected category. An all-zero weight vector always selects the first one.
pub fn pick_fuel_type(weights: &PerFuel<f64>, draw: f64) -> FuelType {
    let mut selected = FuelType::ALL[0];
    let total: f64 = weights.values().iter().sum();
    if !(total > 0.0) {
        return selected;
    }

    let mut cumulative = 0.0;
    for (fuel, weight) in weights.iter() {
        let low = cumulative / total;
        cumulative += weight;
        let high = cumulative / total;
        if draw >= low && draw <= high {
            selected = fuel;
        }
    }
    selected
}

/// Produces cars on clock ticks and hands them to the dispatcher.
pub struct ArrivalGenerator {
    config: Arc<SimulationConfig>,
    stats: Arc<Stats>,
    arrivals: mpsc::Sender<Car>,
}

impl ArrivalGenerator {
    /// Create a generator
    ///
    /// # Arguments
    /// * `config` - Spawn chance, fuel weights and patience bias are read from here
    /// * `stats` - Every spawned car is counted here before it is sent
    /// * `arrivals` - Channel to the dispatcher
    pub fn new(
        config: Arc<SimulationConfig>,
        stats: Arc<Stats>,
        arrivals: mpsc::Sender<Car>,
    ) -> Self {
        Self {
            config,
            stats,
            arrivals,
        }
    }

    /// Roll for an arrival. Returns the new car, if any.
    pub fn maybe_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Car> {
        if rng.gen::<f64>() >= self.config.car_spawn_chance {
            return None;
        }
        let fuel = pick_fuel_type(&self.config.fuel_type_chance, rng.gen::<f64>());
        Some(Car::random(fuel, self.config.car_wait_time_bias, rng))
    }

    /// Run until shutdown is signalled or the clock stops.
    pub async fn run(
        self,
        mut ticks: broadcast::Receiver<Tick>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut spawned = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                tick = ticks.recv() => match tick {
                    Ok(tick) => {
                        let car = self.maybe_spawn(&mut rand::thread_rng());
                        if let Some(car) = car {
                            log::debug!(
                                "[Arrivals] Tick {}: car {} ({}, tank {} {}, patience {:.2}s)",
                                tick,
                                car.id,
                                car.fuel,
                                car.tank_size,
                                car.fuel.unit(),
                                car.patience.as_secs_f64()
                            );
                            self.stats.record_arrival();
                            spawned += 1;
                            if self.arrivals.send(car).await.is_err() {
                                log::warn!("[Arrivals] Dispatcher is gone, stopping");
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("[Arrivals] Missed {} ticks", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("[Arrivals] Stopped after {} cars", spawned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frequencies(weights: [f64; 4], draws: usize, seed: u64) -> PerFuel<f64> {
        let weights = PerFuel::new(weights);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = PerFuel::new([0usize; 4]);
        for _ in 0..draws {
            counts[pick_fuel_type(&weights, rng.gen::<f64>())] += 1;
        }
        counts.map(|c| *c as f64 / draws as f64)
    }

    #[test]
    fn test_pick_boundaries() {
        let weights = PerFuel::new([0.25, 0.25, 0.25, 0.25]);
        assert_eq!(pick_fuel_type(&weights, 0.0), FuelType::Gas);
        assert_eq!(pick_fuel_type(&weights, 0.1), FuelType::Gas);
        // shared boundary goes to the later category
        assert_eq!(pick_fuel_type(&weights, 0.25), FuelType::Diesel);
        assert_eq!(pick_fuel_type(&weights, 0.6), FuelType::Lpg);
        assert_eq!(pick_fuel_type(&weights, 0.99), FuelType::Electric);
    }

    #[test]
    fn test_zero_width_intervals() {
        let weights = PerFuel::new([0.0, 1.0, 0.0, 0.0]);
        // 0.0 sits in both [0, 0] and [0, 1]; the later wins
        assert_eq!(pick_fuel_type(&weights, 0.0), FuelType::Diesel);
        assert_eq!(pick_fuel_type(&weights, 0.5), FuelType::Diesel);
    }

    #[test]
    fn test_weights_are_normalized() {
        // [0.1; 4] behaves like [0.25; 4]
        let weights = PerFuel::new([0.1, 0.1, 0.1, 0.1]);
        assert_eq!(pick_fuel_type(&weights, 0.2), FuelType::Gas);
        assert_eq!(pick_fuel_type(&weights, 0.35), FuelType::Diesel);
        assert_eq!(pick_fuel_type(&weights, 0.6), FuelType::Lpg);
        assert_eq!(pick_fuel_type(&weights, 0.9), FuelType::Electric);

        let weights = PerFuel::new([2.0, 1.0, 1.0, 0.0]);
        assert_eq!(pick_fuel_type(&weights, 0.49), FuelType::Gas);
        assert_eq!(pick_fuel_type(&weights, 0.6), FuelType::Diesel);
        assert_eq!(pick_fuel_type(&weights, 0.99), FuelType::Lpg);
    }

    #[test]
    fn test_all_zero_weights_select_first_category() {
        let weights = PerFuel::new([0.0; 4]);
        assert_eq!(pick_fuel_type(&weights, 0.0), FuelType::Gas);
        assert_eq!(pick_fuel_type(&weights, 0.7), FuelType::Gas);
    }

    #[test]
    fn test_only_first_category() {
        let freq = frequencies([1.0, 0.0, 0.0, 0.0], 50_000, 1);
        assert_eq!(freq[FuelType::Gas], 1.0);
        assert_eq!(freq[FuelType::Diesel], 0.0);
        assert_eq!(freq[FuelType::Lpg], 0.0);
        assert_eq!(freq[FuelType::Electric], 0.0);
    }

    #[test]
    fn test_weighted_draw_converges() {
        let tolerance = 0.01;
        let cases = [
            ([0.4, 0.3, 0.2, 0.1], [0.4, 0.3, 0.2, 0.1]),
            ([2.0, 1.0, 1.0, 0.0], [0.5, 0.25, 0.25, 0.0]),
            ([0.2, 0.2, 0.2, 0.2], [0.25, 0.25, 0.25, 0.25]),
            ([1.0, 1.0, 1.0, 1.0], [0.25, 0.25, 0.25, 0.25]),
        ];
        for (seed, (weights, expected)) in cases.into_iter().enumerate() {
            let freq = frequencies(weights, 200_000, 42 + seed as u64);
            for (fuel, observed) in freq.iter() {
                let expected = expected[fuel.index()];
                assert!(
                    (observed - expected).abs() < tolerance,
                    "{:?} {}: observed {:.4}, expected {:.4}",
                    weights,
                    fuel,
                    observed,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_maybe_spawn_respects_chance() {
        let (tx, _rx) = mpsc::channel(1);
        let mut rng = StdRng::seed_from_u64(5);

        let never = ArrivalGenerator::new(
            Arc::new(SimulationConfig::default().with_spawn_chance(0.0)),
            Arc::new(Stats::new()),
            tx.clone(),
        );
        assert!((0..1000).all(|_| never.maybe_spawn(&mut rng).is_none()));

        let always = ArrivalGenerator::new(
            Arc::new(
                SimulationConfig::default()
                    .with_spawn_chance(1.0)
                    .with_fuel_type_chance([1.0, 0.0, 0.0, 0.0]),
            ),
            Arc::new(Stats::new()),
            tx,
        );
        for _ in 0..1000 {
            let car = always.maybe_spawn(&mut rng).unwrap();
            assert_eq!(car.fuel, FuelType::Gas);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_stops_on_shutdown() {
        use crate::core::clock::TickSource;
        use std::time::Duration;

        let config = Arc::new(SimulationConfig::default().with_spawn_chance(1.0));
        let stats = Arc::new(Stats::new());
        let (tx, mut rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let clock = TickSource::spawn(Duration::from_millis(100), shutdown_rx.clone());

        let generator = ArrivalGenerator::new(config, stats.clone(), tx);
        let handle = tokio::spawn(generator.run(clock.subscribe(), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(1050)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        clock.join().await;

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 10);
        assert_eq!(stats.cars_spawned(), 10);
    }
}
