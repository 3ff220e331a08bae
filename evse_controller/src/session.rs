//! Session statistics and operator limit enforcement.
//!
//! Accumulates elapsed/charging time and delivered energy from the meter
//! readings, and evaluates the three operator limits each tick. Limits
//! are policy, not faults: a reached limit asks the core for a soft stop
//! and clears itself when the operator raises or disables the limit.

use evse_common::error::LimitFlags;
use evse_common::hal::types::MeterReading;

use crate::config::ms_to_ticks;
use evse_common::consts::UNDER_POWER_TIME_MS;

/// Per-session statistics and limit evaluation.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    active: bool,
    session_ms: u64,
    charging_ms: u64,
    consumption_ws: u32,
    power_w: u16,
    voltage_v: [f32; 3],
    current_a: [f32; 3],

    /// Consumption limit [Ws], 0 = disabled.
    consumption_limit: u32,
    /// Charging time limit [s], 0 = disabled.
    charging_time_limit: u32,
    /// Under-power limit [W], 0 = disabled.
    under_power_limit: u16,

    under_power_ticks: u32,
    under_power_window: u32,
    limits: LimitFlags,
}

impl SessionTracker {
    pub fn new(
        consumption_limit: u32,
        charging_time_limit: u32,
        under_power_limit: u16,
        tick_ms: u32,
    ) -> Self {
        Self {
            active: false,
            session_ms: 0,
            charging_ms: 0,
            consumption_ws: 0,
            power_w: 0,
            voltage_v: [0.0; 3],
            current_a: [0.0; 3],
            consumption_limit,
            charging_time_limit,
            under_power_limit,
            under_power_ticks: 0,
            under_power_window: ms_to_ticks(UNDER_POWER_TIME_MS, tick_ms),
            limits: LimitFlags::empty(),
        }
    }

    /// Begin a new session (vehicle plugged in), zeroing the statistics.
    pub fn start_session(&mut self) {
        if !self.active {
            self.active = true;
            self.session_ms = 0;
            self.charging_ms = 0;
            self.consumption_ws = 0;
            self.power_w = 0;
            self.under_power_ticks = 0;
        }
    }

    /// End the session and drop the limit flags.
    pub fn end_session(&mut self) {
        self.active = false;
        self.limits = LimitFlags::empty();
        self.under_power_ticks = 0;
    }

    /// Fold one tick's meter reading into the statistics.
    pub fn update(&mut self, charging: bool, reading: &MeterReading, tick_ms: u32) {
        self.power_w = reading.power_w;
        self.voltage_v = reading.voltage_v;
        self.current_a = reading.current_a;

        if self.active {
            self.session_ms += tick_ms as u64;
            if charging {
                self.charging_ms += tick_ms as u64;
                self.consumption_ws = self.consumption_ws.saturating_add(reading.energy_ws);
            }
        }
    }

    /// Evaluate the limits against the current statistics.
    ///
    /// Consumption and time limits set and clear their flags freely; the
    /// under-power flag is only evaluated while charging, so it holds its
    /// value through the soft stop it caused.
    pub fn check_limits(&mut self, charging: bool) -> LimitFlags {
        if self.consumption_limit > 0 && self.consumption_ws > self.consumption_limit {
            self.limits.insert(LimitFlags::CONSUMPTION);
        } else {
            self.limits.remove(LimitFlags::CONSUMPTION);
        }

        if self.charging_time_limit > 0 && self.charging_time_s() > self.charging_time_limit {
            self.limits.insert(LimitFlags::CHARGING_TIME);
        } else {
            self.limits.remove(LimitFlags::CHARGING_TIME);
        }

        if charging {
            if self.under_power_limit > 0 && self.power_w < self.under_power_limit {
                self.under_power_ticks = self.under_power_ticks.saturating_add(1);
            } else {
                self.under_power_ticks = 0;
            }

            if self.under_power_ticks > self.under_power_window {
                self.limits.insert(LimitFlags::UNDER_POWER);
            } else {
                self.limits.remove(LimitFlags::UNDER_POWER);
            }
        }

        self.limits
    }

    /// Restart the under-power grace window (new authorization).
    pub fn reset_under_power_window(&mut self) {
        self.under_power_ticks = 0;
    }

    #[inline]
    pub const fn limits(&self) -> LimitFlags {
        self.limits
    }

    #[inline]
    pub const fn limit_reached(&self) -> bool {
        !self.limits.is_empty()
    }

    // ── Statistics ──

    /// Session elapsed time [s].
    #[inline]
    pub const fn session_time_s(&self) -> u32 {
        (self.session_ms / 1_000) as u32
    }

    /// Charging (relay closed) time [s].
    #[inline]
    pub const fn charging_time_s(&self) -> u32 {
        (self.charging_ms / 1_000) as u32
    }

    /// Session consumption [Ws].
    #[inline]
    pub const fn consumption_ws(&self) -> u32 {
        self.consumption_ws
    }

    /// Session consumption [Wh].
    #[inline]
    pub const fn consumption_wh(&self) -> u32 {
        self.consumption_ws / 3_600
    }

    /// Last measured power [W].
    #[inline]
    pub const fn power_w(&self) -> u16 {
        self.power_w
    }

    /// Last per-phase voltage [V].
    #[inline]
    pub const fn voltage_v(&self) -> [f32; 3] {
        self.voltage_v
    }

    /// Last per-phase current [A].
    #[inline]
    pub const fn current_a(&self) -> [f32; 3] {
        self.current_a
    }

    // ── Limit configuration ──

    pub const fn consumption_limit(&self) -> u32 {
        self.consumption_limit
    }

    pub fn set_consumption_limit(&mut self, limit: u32) {
        self.consumption_limit = limit;
    }

    pub const fn charging_time_limit(&self) -> u32 {
        self.charging_time_limit
    }

    pub fn set_charging_time_limit(&mut self, limit: u32) {
        self.charging_time_limit = limit;
    }

    pub const fn under_power_limit(&self) -> u16 {
        self.under_power_limit
    }

    pub fn set_under_power_limit(&mut self, limit: u16) {
        self.under_power_limit = limit;
    }
}
