//! # Battery Telemetry Module
//!
//! The single in-memory record the dashboard renders. Both data sources
//! (Bluetooth session and simulator) produce or patch a `BatterySnapshot`;
//! the UI never computes anything itself.
//!
//! ## Invariants
//! - `power` is always `|voltage * current|` (only `set_electrics` touches V/I)
//! - `state_of_charge` is always within 0..=100
//! - `BatterySnapshot::default()` is the zeroed state shown after disconnect
//!
//! ## Sign Convention
//! Positive current charges the pack, negative current discharges it.

/// Below this magnitude the pack is considered idle
const STANDBY_THRESHOLD_A: f64 = 0.1;

/// Placeholder for durations that don't apply
pub const NO_ESTIMATE: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryStatus {
    #[default]
    Standby,
    Charging,
    Discharging,
}

impl BatteryStatus {
    pub fn from_current(amps: f64) -> Self {
        if !amps.is_finite() || amps.abs() < STANDBY_THRESHOLD_A {
            BatteryStatus::Standby
        } else if amps > 0.0 {
            BatteryStatus::Charging
        } else {
            BatteryStatus::Discharging
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatteryStatus::Standby => "Standby",
            BatteryStatus::Charging => "Charging",
            BatteryStatus::Discharging => "Discharging",
        }
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatterySnapshot {
    voltage: f64,
    current: f64,
    power: f64,
    state_of_charge: u8,
    pub temperature: f64,
    pub cycles: u32,
    pub status: BatteryStatus,
    pub time_to_full: String,
    pub time_to_empty: String,
}

impl Default for BatterySnapshot {
    fn default() -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            state_of_charge: 0,
            temperature: 0.0,
            cycles: 0,
            status: BatteryStatus::Standby,
            time_to_full: NO_ESTIMATE.to_string(),
            time_to_empty: NO_ESTIMATE.to_string(),
        }
    }
}

impl BatterySnapshot {
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn state_of_charge(&self) -> u8 {
        self.state_of_charge
    }

    /// Set voltage and current together, re-deriving power and status.
    pub fn set_electrics(&mut self, voltage: f64, current: f64) {
        self.voltage = voltage;
        self.current = current;
        self.power = (voltage * current).abs();
        self.status = BatteryStatus::from_current(current);
    }

    /// Set the state of charge, clamped into 0..=100.
    pub fn set_state_of_charge(&mut self, percent: i32) {
        self.state_of_charge = percent.clamp(0, 100) as u8;
    }

    /// Fill `time_to_full` / `time_to_empty` from the current flow.
    ///
    /// Only the estimate matching the present status is filled in; the
    /// other one shows `--:--`.
    pub fn estimate_times(&mut self, capacity_ah: f64) {
        let remaining_ah = capacity_ah * f64::from(self.state_of_charge) / 100.0;

        self.time_to_full = NO_ESTIMATE.to_string();
        self.time_to_empty = NO_ESTIMATE.to_string();

        match self.status {
            BatteryStatus::Charging => {
                let missing_ah = (capacity_ah - remaining_ah).max(0.0);
                self.time_to_full = format_hours(missing_ah / self.current);
            }
            BatteryStatus::Discharging => {
                self.time_to_empty = format_hours(remaining_ah / self.current.abs());
            }
            BatteryStatus::Standby => {}
        }
    }
}

/// Render fractional hours as `H:MM`.
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return NO_ESTIMATE.to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    format!("{}:{:02}", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_zeroed() {
        let snapshot = BatterySnapshot::default();
        assert_eq!(snapshot.voltage(), 0.0);
        assert_eq!(snapshot.current(), 0.0);
        assert_eq!(snapshot.power(), 0.0);
        assert_eq!(snapshot.state_of_charge(), 0);
        assert_eq!(snapshot.status, BatteryStatus::Standby);
        assert_eq!(snapshot.time_to_full, "--:--");
        assert_eq!(snapshot.time_to_empty, "--:--");
    }

    #[test]
    fn test_power_is_absolute_product() {
        let mut snapshot = BatterySnapshot::default();

        snapshot.set_electrics(25.6, -4.0);
        assert!((snapshot.power() - 102.4).abs() < 1e-9);
        assert_eq!(snapshot.status, BatteryStatus::Discharging);

        snapshot.set_electrics(26.8, 10.0);
        assert!((snapshot.power() - 268.0).abs() < 1e-9);
        assert_eq!(snapshot.status, BatteryStatus::Charging);
    }

    #[test]
    fn test_status_threshold() {
        assert_eq!(BatteryStatus::from_current(0.05), BatteryStatus::Standby);
        assert_eq!(BatteryStatus::from_current(-0.05), BatteryStatus::Standby);
        assert_eq!(BatteryStatus::from_current(0.5), BatteryStatus::Charging);
        assert_eq!(BatteryStatus::from_current(-0.5), BatteryStatus::Discharging);
        assert_eq!(BatteryStatus::from_current(f64::NAN), BatteryStatus::Standby);
    }

    #[test]
    fn test_state_of_charge_is_clamped() {
        let mut snapshot = BatterySnapshot::default();
        snapshot.set_state_of_charge(140);
        assert_eq!(snapshot.state_of_charge(), 100);
        snapshot.set_state_of_charge(-3);
        assert_eq!(snapshot.state_of_charge(), 0);
        snapshot.set_state_of_charge(57);
        assert_eq!(snapshot.state_of_charge(), 57);
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(1.5), "1:30");
        assert_eq!(format_hours(0.25), "0:15");
        assert_eq!(format_hours(12.0), "12:00");
        assert_eq!(format_hours(0.0), "--:--");
        assert_eq!(format_hours(-2.0), "--:--");
        assert_eq!(format_hours(f64::INFINITY), "--:--");
    }

    #[test]
    fn test_estimate_times_discharging() {
        let mut snapshot = BatterySnapshot::default();
        snapshot.set_state_of_charge(50);
        snapshot.set_electrics(25.6, -5.0);
        snapshot.estimate_times(50.0);

        // 25 Ah left at 5 A
        assert_eq!(snapshot.time_to_empty, "5:00");
        assert_eq!(snapshot.time_to_full, "--:--");
    }

    #[test]
    fn test_estimate_times_charging() {
        let mut snapshot = BatterySnapshot::default();
        snapshot.set_state_of_charge(80);
        snapshot.set_electrics(27.0, 10.0);
        snapshot.estimate_times(50.0);

        // 10 Ah missing at 10 A
        assert_eq!(snapshot.time_to_full, "1:00");
        assert_eq!(snapshot.time_to_empty, "--:--");
    }

    #[test]
    fn test_estimate_times_standby() {
        let mut snapshot = BatterySnapshot::default();
        snapshot.set_state_of_charge(80);
        snapshot.set_electrics(26.0, 0.0);
        snapshot.estimate_times(50.0);

        assert_eq!(snapshot.time_to_full, "--:--");
        assert_eq!(snapshot.time_to_empty, "--:--");
    }
}
