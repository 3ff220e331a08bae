//! TOML configuration loader with validation.
//!
//! All tunables live here: tick period, pilot/proximity classification
//! thresholds, lock actuator timing, meter estimation parameters and the
//! operator-facing defaults. Every timing value is given in milliseconds
//! and converted to tick counts at controller construction.

use std::path::Path;

use serde::Deserialize;

use evse_common::config::ConfigError;
use evse_common::consts::{
    CHARGING_CURRENT_MIN, DEFAULT_TICK_MS, MAX_CHARGING_CURRENT_MAX, MAX_CHARGING_CURRENT_MIN,
    TEMP_THRESHOLD_MAX, TEMP_THRESHOLD_MIN,
};

/// Convert a millisecond window to a tick count (at least one tick).
#[inline]
pub fn ms_to_ticks(ms: u32, tick_ms: u32) -> u32 {
    ms.div_ceil(tick_ms).max(1)
}

// ─── Controller ─────────────────────────────────────────────────────

/// Operator-facing controller settings and defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Tick period of the control loop [ms].
    pub tick_ms: u32,
    /// Socket-with-lock outlet instead of a fixed cable.
    pub socket_outlet: bool,
    /// Require authorization before charging.
    pub require_auth: bool,
    /// Residual current monitoring active.
    pub rcm: bool,
    /// Over-temperature threshold [°C].
    pub temp_threshold: u8,
    /// Max charging current [A].
    pub max_charging_current: u8,
    /// Charging current applied at startup [0.1 A].
    pub default_charging_current: u16,
    /// Consumption limit applied at startup [Ws], 0 = disabled.
    pub default_consumption_limit: u32,
    /// Charging time limit applied at startup [s], 0 = disabled.
    pub default_charging_time_limit: u32,
    /// Under-power limit applied at startup [W], 0 = disabled.
    pub default_under_power_limit: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            socket_outlet: false,
            require_auth: false,
            rcm: false,
            temp_threshold: 60,
            max_charging_current: 32,
            default_charging_current: 320,
            default_consumption_limit: 0,
            default_charging_time_limit: 0,
            default_under_power_limit: 0,
        }
    }
}

// ─── Pilot ──────────────────────────────────────────────────────────

/// Control-pilot classification thresholds [mV on the CP line] and the
/// debounce window. Band thresholds must be strictly descending.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PilotConfig {
    /// Consecutive ticks a new band must persist before it is accepted.
    pub debounce_ticks: u8,
    /// Lower edge of the 12 V band [mV].
    pub threshold_12: i16,
    /// Lower edge of the 9 V band [mV].
    pub threshold_9: i16,
    /// Lower edge of the 6 V band [mV].
    pub threshold_6: i16,
    /// Lower edge of the 3 V band [mV]; below is a pilot fault.
    pub threshold_3: i16,
    /// Negative rail the PWM low half must reach for the diode check [mV].
    pub threshold_diode: i16,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            debounce_ticks: 3,
            threshold_12: 10_500,
            threshold_9: 7_500,
            threshold_6: 4_500,
            threshold_3: 1_500,
            threshold_diode: -10_500,
        }
    }
}

// ─── Proximity ──────────────────────────────────────────────────────

/// Proximity (PP) classification thresholds [mV], strictly descending.
/// Below the last threshold the cable is rated 63 A.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProximityConfig {
    /// At or above: 13 A cable.
    pub threshold_13: u16,
    /// At or above: 20 A cable.
    pub threshold_20: u16,
    /// At or above: 32 A cable.
    pub threshold_32: u16,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            threshold_13: 2_600,
            threshold_20: 1_600,
            threshold_32: 800,
        }
    }
}

// ─── Socket Lock ────────────────────────────────────────────────────

/// Socket lock actuator tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// Feedback line level that means "locked".
    pub detection_high: bool,
    /// Actuator drive time per attempt [ms].
    pub operating_time: u16,
    /// Rest time between two operations [ms].
    pub break_time: u16,
    /// Attempts before latching a fault.
    pub retry_count: u8,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            detection_high: true,
            operating_time: 300,
            break_time: 1_000,
            retry_count: 5,
        }
    }
}

// ─── Energy Meter ───────────────────────────────────────────────────

/// Parameters for current-only or metering-less boards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    /// Assumed AC voltage when the board cannot measure it [V].
    pub ac_voltage: u16,
    /// Three-phase installation.
    pub three_phase: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            ac_voltage: 230,
            three_phase: false,
        }
    }
}

// ─── Bundle ─────────────────────────────────────────────────────────

/// Complete controller configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvseConfig {
    pub controller: ControllerConfig,
    pub pilot: PilotConfig,
    pub proximity: ProximityConfig,
    pub lock: LockConfig,
    pub meter: MeterConfig,
}

impl EvseConfig {
    /// Validate parameter bounds and threshold ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if !(50..=1_000).contains(&c.tick_ms) {
            return Err(ConfigError::Validation(format!(
                "tick_ms {} outside 50..=1000",
                c.tick_ms
            )));
        }
        if !(MAX_CHARGING_CURRENT_MIN..=MAX_CHARGING_CURRENT_MAX).contains(&c.max_charging_current)
        {
            return Err(ConfigError::Validation(format!(
                "max_charging_current {}A outside {}..={}A",
                c.max_charging_current, MAX_CHARGING_CURRENT_MIN, MAX_CHARGING_CURRENT_MAX
            )));
        }
        if !(CHARGING_CURRENT_MIN..=c.max_charging_current as u16 * 10)
            .contains(&c.default_charging_current)
        {
            return Err(ConfigError::Validation(format!(
                "default_charging_current {} outside {}..={} (0.1 A)",
                c.default_charging_current,
                CHARGING_CURRENT_MIN,
                c.max_charging_current as u16 * 10
            )));
        }
        if !(TEMP_THRESHOLD_MIN..=TEMP_THRESHOLD_MAX).contains(&c.temp_threshold) {
            return Err(ConfigError::Validation(format!(
                "temp_threshold {}°C outside {}..={}°C",
                c.temp_threshold, TEMP_THRESHOLD_MIN, TEMP_THRESHOLD_MAX
            )));
        }

        let p = &self.pilot;
        if p.debounce_ticks == 0 || p.debounce_ticks > 10 {
            return Err(ConfigError::Validation(format!(
                "pilot debounce_ticks {} outside 1..=10",
                p.debounce_ticks
            )));
        }
        if !(p.threshold_12 > p.threshold_9
            && p.threshold_9 > p.threshold_6
            && p.threshold_6 > p.threshold_3
            && p.threshold_3 > 0)
        {
            return Err(ConfigError::Validation(
                "pilot band thresholds must be strictly descending and positive".into(),
            ));
        }
        if p.threshold_diode >= 0 {
            return Err(ConfigError::Validation(
                "pilot threshold_diode must be negative".into(),
            ));
        }

        let x = &self.proximity;
        if !(x.threshold_13 > x.threshold_20 && x.threshold_20 > x.threshold_32) {
            return Err(ConfigError::Validation(
                "proximity thresholds must be strictly descending".into(),
            ));
        }

        let l = &self.lock;
        if !(100..=1_000).contains(&l.operating_time) {
            return Err(ConfigError::Validation(format!(
                "lock operating_time {}ms outside 100..=1000ms",
                l.operating_time
            )));
        }
        if l.retry_count == 0 {
            return Err(ConfigError::Validation("lock retry_count must be > 0".into()));
        }

        if !(100..=500).contains(&self.meter.ac_voltage) {
            return Err(ConfigError::Validation(format!(
                "meter ac_voltage {}V outside 100..=500V",
                self.meter.ac_voltage
            )));
        }

        Ok(())
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<EvseConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::FileNotFound(format!("{}: {e}", path.display())))?;
    let config: EvseConfig =
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        EvseConfig::default().validate().unwrap();
    }

    #[test]
    fn tick_ms_bounds() {
        let mut cfg = EvseConfig::default();
        cfg.controller.tick_ms = 20;
        assert!(cfg.validate().is_err());
        cfg.controller.tick_ms = 1_000;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn threshold_ordering_enforced() {
        let mut cfg = EvseConfig::default();
        cfg.pilot.threshold_9 = cfg.pilot.threshold_12;
        assert!(cfg.validate().is_err());

        let mut cfg = EvseConfig::default();
        cfg.proximity.threshold_32 = 5_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_current_must_fit_max() {
        let mut cfg = EvseConfig::default();
        cfg.controller.max_charging_current = 16;
        cfg.controller.default_charging_current = 320;
        assert!(cfg.validate().is_err());
        cfg.controller.default_charging_current = 160;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[controller]\ntick_ms = 100\nmax_charging_current = 16\n\
             default_charging_current = 100\n\n[lock]\noperating_time = 200\n"
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.controller.tick_ms, 100);
        assert_eq!(cfg.controller.max_charging_current, 16);
        assert_eq!(cfg.lock.operating_time, 200);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.pilot.threshold_12, 10_500);
    }

    #[test]
    fn load_rejects_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[controller]\nunknown_knob = 1\n").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(1_000, 250), 4);
        assert_eq!(ms_to_ticks(100, 250), 1);
        assert_eq!(ms_to_ticks(600, 250), 3);
        assert_eq!(ms_to_ticks(0, 250), 1);
    }
}
