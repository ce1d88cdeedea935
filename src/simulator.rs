//! # Simulated Battery Module
//!
//! Fabricates telemetry for demos and UI work without hardware. Every tick
//! draws fresh values inside plausible ranges for a 24 V LiFePO4 pack and
//! publishes a complete `BatterySnapshot`.

use crate::session::{wait_for_stop, ConnectionStatus, Reporter, SessionUpdate};
use crate::telemetry::BatterySnapshot;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::ops::{Range, RangeInclusive};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

pub const SIMULATED_DEVICE_NAME: &str = "IC-24V50-EP (simulated)";

const VOLTAGE_RANGE_V: Range<f64> = 24.0..27.2;
const CURRENT_RANGE_A: Range<f64> = -15.0..15.0;
const TEMPERATURE_RANGE_C: Range<f64> = 18.0..35.0;
const SOC_RANGE_PCT: RangeInclusive<i32> = 10..=100;
const STARTING_CYCLES: u32 = 42;
/// Chance per sample that the cycle counter advances
const CYCLE_PROBABILITY: f64 = 0.02;

pub struct Simulator {
    rng: SmallRng,
    capacity_ah: f64,
    cycles: u32,
}

impl Simulator {
    pub fn new(capacity_ah: f64) -> Self {
        Self::with_rng(SmallRng::from_os_rng(), capacity_ah)
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64, capacity_ah: f64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), capacity_ah)
    }

    fn with_rng(rng: SmallRng, capacity_ah: f64) -> Self {
        Self {
            rng,
            capacity_ah,
            cycles: STARTING_CYCLES,
        }
    }

    pub fn sample(&mut self) -> BatterySnapshot {
        let voltage = round2(self.rng.random_range(VOLTAGE_RANGE_V));
        let current = round2(self.rng.random_range(CURRENT_RANGE_A));

        if self.rng.random_bool(CYCLE_PROBABILITY) {
            self.cycles += 1;
        }

        let mut snapshot = BatterySnapshot::default();
        snapshot.set_electrics(voltage, current);
        snapshot.set_state_of_charge(self.rng.random_range(SOC_RANGE_PCT));
        snapshot.temperature = round2(self.rng.random_range(TEMPERATURE_RANGE_C));
        snapshot.cycles = self.cycles;
        snapshot.estimate_times(self.capacity_ah);
        snapshot
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Publishes a new snapshot every `interval` until the stop flag is set.
pub async fn run_simulation(
    reporter: Reporter,
    should_stop: Arc<AtomicBool>,
    interval: Duration,
    capacity_ah: f64,
) {
    let mut simulator = Simulator::new(capacity_ah);
    let mut ticker = tokio::time::interval(interval);

    reporter.status(ConnectionStatus::Connected {
        name: SIMULATED_DEVICE_NAME.to_string(),
    });
    reporter.event("Simulation started");

    let stop = wait_for_stop(&should_stop);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                reporter.send(SessionUpdate::Snapshot(simulator.sample()));
            }
            _ = &mut stop => {
                break;
            }
        }
    }

    reporter.event("Simulation stopped");
    reporter.status(ConnectionStatus::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::BatteryStatus;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;

    #[test]
    fn test_samples_stay_in_range() {
        let mut simulator = Simulator::with_seed(7, 50.0);

        for _ in 0..500 {
            let snapshot = simulator.sample();
            assert!(snapshot.voltage() >= 24.0 && snapshot.voltage() <= 27.2);
            assert!(snapshot.current() >= -15.0 && snapshot.current() <= 15.0);
            assert!(snapshot.temperature >= 18.0 && snapshot.temperature <= 35.0);
            assert!(snapshot.state_of_charge() >= 10 && snapshot.state_of_charge() <= 100);
        }
    }

    #[test]
    fn test_power_matches_electrics() {
        let mut simulator = Simulator::with_seed(11, 50.0);

        for _ in 0..500 {
            let snapshot = simulator.sample();
            let expected = (snapshot.voltage() * snapshot.current()).abs();
            assert!((snapshot.power() - expected).abs() < 1e-9);
            assert_eq!(snapshot.status, BatteryStatus::from_current(snapshot.current()));
        }
    }

    #[test]
    fn test_estimates_follow_status() {
        let mut simulator = Simulator::with_seed(3, 50.0);

        for _ in 0..200 {
            let snapshot = simulator.sample();
            match snapshot.status {
                BatteryStatus::Charging => assert_eq!(snapshot.time_to_empty, "--:--"),
                BatteryStatus::Discharging => assert_eq!(snapshot.time_to_full, "--:--"),
                BatteryStatus::Standby => {
                    assert_eq!(snapshot.time_to_full, "--:--");
                    assert_eq!(snapshot.time_to_empty, "--:--");
                }
            }
        }
    }

    #[test]
    fn test_cycles_never_decrease() {
        let mut simulator = Simulator::with_seed(5, 50.0);
        let mut last = 0;
        for _ in 0..300 {
            let cycles = simulator.sample().cycles;
            assert!(cycles >= last);
            last = cycles;
        }
        assert!(last >= STARTING_CYCLES);
    }

    #[tokio::test]
    async fn test_simulation_publishes_until_stopped() {
        let (sender, receiver) = mpsc::channel();
        let should_stop = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_simulation(
            Reporter::new(sender),
            should_stop.clone(),
            Duration::from_millis(20),
            50.0,
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        should_stop.store(true, Ordering::Relaxed);
        task.await.unwrap();

        let updates: Vec<SessionUpdate> = receiver.try_iter().map(|m| m.update).collect();
        assert!(matches!(
            updates.first(),
            Some(SessionUpdate::Status(ConnectionStatus::Connected { .. }))
        ));
        assert!(updates.iter().filter(|u| matches!(u, SessionUpdate::Snapshot(_))).count() >= 2);
        assert!(matches!(
            updates.last(),
            Some(SessionUpdate::Status(ConnectionStatus::Disconnected))
        ));
    }
}
