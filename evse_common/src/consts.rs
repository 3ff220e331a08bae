//! Shared constants: current bounds, timing windows, duty-curve breakpoints.
//!
//! Timing windows are given in milliseconds and converted to tick counts by
//! the controller at construction time.

use static_assertions::const_assert;

/// Default tick period [ms]. The controller is tick-count based; every
/// timeout below is divided by the configured tick period.
pub const DEFAULT_TICK_MS: u32 = 250;

// ─── Charging Current ───────────────────────────────────────────────

/// Lowest configurable max charging current [A].
pub const MAX_CHARGING_CURRENT_MIN: u8 = 6;
/// Highest configurable max charging current [A].
pub const MAX_CHARGING_CURRENT_MAX: u8 = 63;
/// Lowest advertisable charging current [0.1 A].
pub const CHARGING_CURRENT_MIN: u16 = 60;
/// Highest current the duty curve can encode [0.1 A].
pub const CHARGING_CURRENT_MAX: u16 = 800;
/// Upper edge of the linear duty segment [0.1 A]; above it the
/// high-current segment applies.
pub const DUTY_LINEAR_MAX: u16 = 510;

// ─── Timing Windows ─────────────────────────────────────────────────

/// Validity window of an authorization grant [ms].
pub const AUTHORIZED_TIME_MS: u32 = 60_000;
/// Recovery wait before auto-clearing transient faults [ms].
pub const ERROR_WAIT_TIME_MS: u32 = 60_000;
/// Sustained under-power window before the limit trips [ms].
pub const UNDER_POWER_TIME_MS: u32 = 60_000;
/// Relay grace in C1/D1 for the vehicle to stop drawing [ms].
pub const C1_D1_RELAY_WAIT_MS: u32 = 6_000;
/// Delay before the first lock attempt after a lock command [ms].
pub const LOCK_DELAY_MS: u32 = 500;
/// Duration of the RCM self-test injection [ms].
pub const RCM_TEST_PULSE_MS: u32 = 100;

// ─── Temperature ────────────────────────────────────────────────────

/// Lowest configurable over-temperature threshold [°C].
pub const TEMP_THRESHOLD_MIN: u8 = 40;
/// Highest configurable over-temperature threshold [°C].
pub const TEMP_THRESHOLD_MAX: u8 = 80;
/// Hysteresis below the threshold before TEMPERATURE_HIGH clears [0.01 °C].
pub const TEMP_HYSTERESIS: i16 = 200;

// ─── Pilot ──────────────────────────────────────────────────────────

/// Oversampling depth of one pilot measurement.
pub const PILOT_SAMPLES: usize = 64;

const_assert!(MAX_CHARGING_CURRENT_MIN < MAX_CHARGING_CURRENT_MAX);
const_assert!(CHARGING_CURRENT_MIN == MAX_CHARGING_CURRENT_MIN as u16 * 10);
const_assert!(DUTY_LINEAR_MAX < CHARGING_CURRENT_MAX);
const_assert!(TEMP_THRESHOLD_MIN < TEMP_THRESHOLD_MAX);
