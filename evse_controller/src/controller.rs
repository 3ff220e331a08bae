//! Charging controller core.
//!
//! One `EvseController` instance owns the board, the meter and every
//! subsystem, and advances them once per `process()` call in a fixed
//! order: lock actuator → pilot sampler → error monitor → authorization →
//! state machine → outputs → session tracker. `process()` never blocks
//! and never fails; configuration setters validate synchronously and
//! touch no hardware.
//!
//! The internal state variable never holds E: the public state is
//! computed from the fault mask, so a cleared fault resumes from where
//! the machine stood.

use std::time::Duration;

use tracing::{debug, info, warn};

use evse_common::config::ConfigError;
use evse_common::consts::{
    AUTHORIZED_TIME_MS, C1_D1_RELAY_WAIT_MS, CHARGING_CURRENT_MIN, MAX_CHARGING_CURRENT_MAX,
    MAX_CHARGING_CURRENT_MIN, TEMP_THRESHOLD_MAX, TEMP_THRESHOLD_MIN,
};
use evse_common::error::{ErrorFlags, LimitFlags, ParamError};
use evse_common::hal::driver::{BoardIo, EnergyMeter};
use evse_common::hal::types::{BoardCapabilities, PilotOutput};
use evse_common::state::EvseState;

use crate::auth::AuthGate;
use crate::config::{EvseConfig, ProximityConfig, ms_to_ticks};
use crate::lock::{LockStatus, SocketLock};
use crate::monitor::ErrorMonitor;
use crate::pilot::{PilotBand, PilotSampler, cable_rating_from_mv};
use crate::pwm::{duty_for_current, effective_current};
use crate::session::SessionTracker;

/// The charging station control core.
pub struct EvseController<B: BoardIo, M: EnergyMeter> {
    board: B,
    meter: M,
    caps: BoardCapabilities,
    tick: Duration,
    tick_ms: u32,

    sampler: PilotSampler,
    monitor: ErrorMonitor,
    auth: AuthGate,
    lock: SocketLock,
    session: SessionTracker,
    proximity: ProximityConfig,

    /// Internal machine state; never E (derived from the fault mask).
    state: EvseState,
    /// Last applied (public) state.
    applied: EvseState,
    enabled: bool,
    available: bool,
    socket_outlet: bool,

    /// Requested charging current [0.1 A].
    charging_current: u16,
    /// Startup fallback current [0.1 A].
    default_charging_current: u16,
    /// Board/operator ceiling [A].
    max_charging_current: u8,
    /// From the proximity signal [A].
    cable_rating: u8,

    /// Startup fallback limits.
    default_consumption_limit: u32,
    default_charging_time_limit: u32,
    default_under_power_limit: u16,

    pilot_out: PilotOutput,
    relay_closed: bool,
    /// C1/D1 relay grace countdown [ticks], 0 = inactive.
    relay_wait_ticks: u32,
    relay_wait_window: u32,
}

impl<B: BoardIo, M: EnergyMeter> EvseController<B, M> {
    /// Build a controller from a validated configuration and hardware
    /// drivers. Config switches for absent peripherals are downgraded
    /// with a warning, mirroring what the setters reject.
    pub fn new(config: EvseConfig, mut board: B, meter: M) -> Result<Self, ConfigError> {
        config.validate()?;
        let caps = board.capabilities();
        let c = config.controller.clone();

        let socket_outlet = if c.socket_outlet && !caps.proximity {
            warn!("socket outlet disabled, proximity sensing not available");
            false
        } else {
            c.socket_outlet
        };
        let rcm = if c.rcm && !caps.rcm {
            warn!("residual current monitoring disabled, not available");
            false
        } else {
            c.rcm
        };

        board.set_pilot(PilotOutput::SteadyHigh);
        board.set_relay(false);

        Ok(Self {
            caps,
            tick: Duration::from_millis(c.tick_ms as u64),
            tick_ms: c.tick_ms,
            sampler: PilotSampler::new(&config.pilot),
            monitor: ErrorMonitor::new(caps, rcm, c.temp_threshold, c.tick_ms),
            auth: AuthGate::new(
                c.require_auth,
                ms_to_ticks(AUTHORIZED_TIME_MS, c.tick_ms),
            ),
            lock: SocketLock::new(&config.lock, c.tick_ms),
            session: SessionTracker::new(
                c.default_consumption_limit,
                c.default_charging_time_limit,
                c.default_under_power_limit,
                c.tick_ms,
            ),
            proximity: config.proximity,
            state: EvseState::A,
            applied: EvseState::A,
            enabled: true,
            available: true,
            socket_outlet,
            charging_current: c.default_charging_current,
            default_charging_current: c.default_charging_current,
            max_charging_current: c.max_charging_current,
            cable_rating: MAX_CHARGING_CURRENT_MAX,
            default_consumption_limit: c.default_consumption_limit,
            default_charging_time_limit: c.default_charging_time_limit,
            default_under_power_limit: c.default_under_power_limit,
            pilot_out: PilotOutput::SteadyHigh,
            relay_closed: false,
            relay_wait_ticks: 0,
            relay_wait_window: ms_to_ticks(C1_D1_RELAY_WAIT_MS, c.tick_ms),
            board,
            meter,
        })
    }

    /// Advance the controller one tick.
    pub fn process(&mut self) {
        if self.socket_lock_active() {
            self.lock.tick(&mut self.board);
        }

        let samples = self.board.pilot_samples();
        let reading = self.sampler.sample(&samples, self.pilot_out.is_pwm());
        let diode_fault = self.pilot_out.is_pwm() && !reading.diode_ok;

        let lock_status = self.lock.status();
        self.monitor
            .poll(&mut self.board, self.socket_outlet, lock_status, diode_fault);
        if self.monitor.take_wait_expired() {
            self.state = EvseState::A;
        }
        // A freshly cleared mask skips one evaluation so the fallback
        // outputs are applied before the machine resumes.
        let suppress = self.monitor.take_cleared();

        self.auth.tick();

        if self.monitor.errors().is_empty() && !suppress {
            let limits = self.session.check_limits(self.state.is_charging());
            if !limits.is_empty() && self.state.is_charging() {
                info!(?limits, "charging limit reached");
            }
            self.step_machine(reading.band);
        }

        let public = if self.monitor.errors().is_empty() {
            self.state
        } else {
            EvseState::E
        };
        if public != self.applied {
            info!("enter {public} state");
            if !self.monitor.errors().is_empty() {
                info!(flags = ?self.monitor.errors(), "fault mask");
            }
            self.enter_state(public);
            self.applied = public;
        } else if self.pilot_out.is_pwm() {
            // Setters change the effective limit between ticks; refresh
            // the advertised duty here so they never touch hardware.
            self.apply_pwm();
        }

        let charging = self.applied.is_charging();
        let advertised = self.effective_charging_current();
        let meter_reading = self.meter.poll(charging, advertised, self.tick);
        self.session.update(charging, &meter_reading, self.tick_ms);
    }

    // ─── Transition Table ───────────────────────────────────────────

    fn step_machine(&mut self, band: PilotBand) {
        use EvseState::*;

        match self.state {
            A => {
                if !self.available {
                    self.state = F;
                    return;
                }
                match band {
                    PilotBand::Volt12 => {}
                    PilotBand::Volt9 => self.state = B1,
                    _ => self.pilot_fault(),
                }
            }
            B1 | B2 => {
                if self.state == B1 {
                    self.auth.evaluate();
                }
                if !self.available {
                    self.state = F;
                    return;
                }
                let allowed = self.charging_allowed();
                match band {
                    PilotBand::Volt12 => self.state = A,
                    PilotBand::Volt9 => self.state = if allowed { B2 } else { B1 },
                    PilotBand::Volt6 => self.state = if allowed { C2 } else { C1 },
                    _ => self.pilot_fault(),
                }
            }
            C1 | C2 => {
                if self.state == C1 && self.relay_grace_expired() {
                    warn!("force switch off ac relay");
                    self.set_relay(false);
                    if !self.available {
                        self.state = F;
                        return;
                    }
                }
                let allowed = self.charging_allowed();
                match band {
                    PilotBand::Volt12 => self.state = A,
                    PilotBand::Volt9 => self.state = if allowed { B2 } else { B1 },
                    PilotBand::Volt6 => self.state = if allowed { C2 } else { C1 },
                    PilotBand::Volt3 => self.state = if allowed { D2 } else { D1 },
                    PilotBand::Fault => self.pilot_fault(),
                }
            }
            D1 | D2 => {
                if self.state == D1 && self.relay_grace_expired() {
                    warn!("force switch off ac relay");
                    self.set_relay(false);
                    if !self.available {
                        self.state = F;
                        return;
                    }
                }
                let allowed = self.charging_allowed();
                match band {
                    PilotBand::Volt6 => self.state = if allowed { C2 } else { C1 },
                    PilotBand::Volt3 => self.state = if allowed { D2 } else { D1 },
                    _ => self.pilot_fault(),
                }
            }
            E => {}
            F => {
                if self.available {
                    self.state = A;
                }
            }
        }
    }

    /// Entry actions when the public state changes.
    fn enter_state(&mut self, to: EvseState) {
        use EvseState::*;

        match to {
            A | E | F => {
                self.apply_pilot(if to == A {
                    PilotOutput::SteadyHigh
                } else {
                    PilotOutput::SteadyLow
                });
                self.set_relay(false);
                self.relay_wait_ticks = 0;
                self.request_lock(false);
                self.auth.reset();
                self.session.end_session();
                self.monitor.rearm_selftest();
            }
            B1 => {
                self.apply_pilot(PilotOutput::SteadyHigh);
                self.set_relay(false);
                self.relay_wait_ticks = 0;
                self.request_lock(true);
                self.monitor.start_selftest(&mut self.board);
                if self.socket_outlet {
                    let mv = self.board.proximity_mv();
                    self.cable_rating = cable_rating_from_mv(mv, &self.proximity);
                    debug!(mv, rating = self.cable_rating, "cable rating sampled");
                }
                self.session.start_session();
            }
            B2 => {
                self.apply_pwm();
                self.set_relay(false);
            }
            C1 | D1 => {
                self.apply_pilot(PilotOutput::SteadyHigh);
                self.relay_wait_ticks = self.relay_wait_window;
            }
            C2 | D2 => {
                self.apply_pwm();
                self.set_relay(true);
            }
        }
    }

    /// All gates that must hold before PWM advertisement and relay close.
    fn charging_allowed(&self) -> bool {
        if !self.enabled
            || !self.available
            || !self.auth.is_authorized()
            || self.session.limit_reached()
        {
            return false;
        }
        if self.socket_lock_active() && self.lock.status() != LockStatus::Idle {
            return false;
        }
        if !self.monitor.selftest_ok() {
            return false;
        }
        self.effective_charging_current() >= CHARGING_CURRENT_MIN
    }

    fn pilot_fault(&mut self) {
        self.monitor.set_fault(ErrorFlags::PILOT_FAULT);
    }

    fn relay_grace_expired(&mut self) -> bool {
        if self.relay_wait_ticks == 0 {
            return false;
        }
        self.relay_wait_ticks -= 1;
        self.relay_wait_ticks == 0
    }

    // ─── Outputs ────────────────────────────────────────────────────

    fn apply_pilot(&mut self, output: PilotOutput) {
        if self.pilot_out != output {
            self.pilot_out = output;
            self.board.set_pilot(output);
        }
    }

    fn apply_pwm(&mut self) {
        match duty_for_current(self.effective_charging_current()) {
            Some(duty) => self.apply_pilot(PilotOutput::Pwm(duty)),
            None => warn!(
                current = self.effective_charging_current(),
                "advertised current not encodable, pilot unchanged"
            ),
        }
    }

    fn set_relay(&mut self, closed: bool) {
        if self.relay_closed != closed {
            self.relay_closed = closed;
            self.board.set_relay(closed);
        }
    }

    fn request_lock(&mut self, locked: bool) {
        if self.socket_lock_active()
            && !self
                .monitor
                .errors()
                .intersects(ErrorFlags::LOCK_FAULT | ErrorFlags::UNLOCK_FAULT)
        {
            self.lock.request(locked);
        }
    }

    fn socket_lock_active(&self) -> bool {
        self.caps.socket_lock && self.socket_outlet
    }

    // ─── State & Diagnostics ────────────────────────────────────────

    /// Public controller state; E whenever the fault mask is non-empty.
    pub fn state(&self) -> EvseState {
        if self.monitor.errors().is_empty() {
            self.state
        } else {
            EvseState::E
        }
    }

    /// String form of the state for protocol adapters.
    pub fn state_str(&self) -> &'static str {
        self.state().as_str()
    }

    pub fn error(&self) -> ErrorFlags {
        self.monitor.errors()
    }

    pub const fn capabilities(&self) -> BoardCapabilities {
        self.caps
    }

    // ─── Control ────────────────────────────────────────────────────

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        info!(enabled, "set enabled");
        self.enabled = enabled;
    }

    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Availability gate. Toggling off→on clears the fault mask and any
    /// latched lock failure, restarting from A.
    pub fn set_available(&mut self, available: bool) {
        info!(available, "set available");
        if available && !self.available {
            self.monitor.clear_all();
            self.lock.reset_faults();
            self.state = EvseState::A;
        }
        self.available = available;
    }

    pub fn is_require_auth(&self) -> bool {
        self.auth.is_require_auth()
    }

    pub fn set_require_auth(&mut self, require_auth: bool) {
        info!(require_auth, "set require auth");
        self.auth.set_require_auth(require_auth);
    }

    /// Grant authorization for the next (or currently pending) session.
    pub fn authorize(&mut self) {
        info!("authorize");
        self.auth.authorize();
        self.session.reset_under_power_window();
    }

    /// A connected vehicle is waiting for authorization.
    pub fn is_pending_auth(&self) -> bool {
        self.state.is_session() && !self.auth.is_authorized()
    }

    // ─── Charging Current ───────────────────────────────────────────

    /// Requested charging current [0.1 A].
    pub const fn charging_current(&self) -> u16 {
        self.charging_current
    }

    pub fn set_charging_current(&mut self, current: u16) -> Result<(), ParamError> {
        if !(CHARGING_CURRENT_MIN..=self.max_charging_current as u16 * 10).contains(&current) {
            return Err(ParamError::OutOfRange);
        }
        info!(current, "set charging current");
        self.charging_current = current;
        Ok(())
    }

    /// Startup fallback current [0.1 A].
    pub const fn default_charging_current(&self) -> u16 {
        self.default_charging_current
    }

    pub fn set_default_charging_current(&mut self, current: u16) -> Result<(), ParamError> {
        if !(CHARGING_CURRENT_MIN..=self.max_charging_current as u16 * 10).contains(&current) {
            return Err(ParamError::OutOfRange);
        }
        self.default_charging_current = current;
        Ok(())
    }

    /// Operator/hardware ceiling [A].
    pub const fn max_charging_current(&self) -> u8 {
        self.max_charging_current
    }

    pub fn set_max_charging_current(&mut self, current: u8) -> Result<(), ParamError> {
        if !(MAX_CHARGING_CURRENT_MIN..=MAX_CHARGING_CURRENT_MAX).contains(&current) {
            return Err(ParamError::OutOfRange);
        }
        info!(current, "set max charging current");
        self.max_charging_current = current;
        Ok(())
    }

    /// Connected cable rating [A], sampled at plug-in.
    pub const fn cable_rating(&self) -> u8 {
        self.cable_rating
    }

    /// min(requested, max, cable) [0.1 A].
    pub fn effective_charging_current(&self) -> u16 {
        effective_current(
            self.charging_current,
            self.max_charging_current,
            self.cable_rating,
        )
    }

    // ─── Socket / RCM / Temperature ─────────────────────────────────

    pub const fn socket_outlet(&self) -> bool {
        self.socket_outlet
    }

    pub fn set_socket_outlet(&mut self, socket_outlet: bool) -> Result<(), ParamError> {
        if socket_outlet && !self.caps.proximity {
            return Err(ParamError::NotSupported);
        }
        self.socket_outlet = socket_outlet;
        Ok(())
    }

    pub fn is_rcm(&self) -> bool {
        self.monitor.is_rcm()
    }

    pub fn set_rcm(&mut self, rcm: bool) -> Result<(), ParamError> {
        if rcm && !self.caps.rcm {
            return Err(ParamError::NotSupported);
        }
        self.monitor.set_rcm(rcm);
        Ok(())
    }

    pub fn temp_threshold(&self) -> u8 {
        self.monitor.temp_threshold()
    }

    pub fn set_temp_threshold(&mut self, threshold: u8) -> Result<(), ParamError> {
        if !(TEMP_THRESHOLD_MIN..=TEMP_THRESHOLD_MAX).contains(&threshold) {
            return Err(ParamError::OutOfRange);
        }
        self.monitor.set_temp_threshold(threshold);
        Ok(())
    }

    // ─── Limits ─────────────────────────────────────────────────────

    pub fn is_limit_reached(&self) -> bool {
        self.session.limit_reached()
    }

    pub fn limits(&self) -> LimitFlags {
        self.session.limits()
    }

    pub fn consumption_limit(&self) -> u32 {
        self.session.consumption_limit()
    }

    pub fn set_consumption_limit(&mut self, limit: u32) {
        self.session.set_consumption_limit(limit);
    }

    pub fn charging_time_limit(&self) -> u32 {
        self.session.charging_time_limit()
    }

    pub fn set_charging_time_limit(&mut self, limit: u32) {
        self.session.set_charging_time_limit(limit);
    }

    pub fn under_power_limit(&self) -> u16 {
        self.session.under_power_limit()
    }

    pub fn set_under_power_limit(&mut self, limit: u16) {
        self.session.set_under_power_limit(limit);
    }

    pub const fn default_consumption_limit(&self) -> u32 {
        self.default_consumption_limit
    }

    pub fn set_default_consumption_limit(&mut self, limit: u32) {
        self.default_consumption_limit = limit;
    }

    pub const fn default_charging_time_limit(&self) -> u32 {
        self.default_charging_time_limit
    }

    pub fn set_default_charging_time_limit(&mut self, limit: u32) {
        self.default_charging_time_limit = limit;
    }

    pub const fn default_under_power_limit(&self) -> u16 {
        self.default_under_power_limit
    }

    pub fn set_default_under_power_limit(&mut self, limit: u16) {
        self.default_under_power_limit = limit;
    }

    // ─── Session Statistics ─────────────────────────────────────────

    /// Session elapsed time [s].
    pub fn session_time(&self) -> u32 {
        self.session.session_time_s()
    }

    /// Charging time [s].
    pub fn charging_time(&self) -> u32 {
        self.session.charging_time_s()
    }

    /// Session consumption [Ws].
    pub fn consumption(&self) -> u32 {
        self.session.consumption_ws()
    }

    /// Session consumption [Wh].
    pub fn consumption_wh(&self) -> u32 {
        self.session.consumption_wh()
    }

    /// Actual power [W].
    pub fn power(&self) -> u16 {
        self.session.power_w()
    }

    /// Per-phase voltage [V].
    pub fn voltage(&self) -> [f32; 3] {
        self.session.voltage_v()
    }

    /// Per-phase current [A].
    pub fn current(&self) -> [f32; 3] {
        self.session.current_a()
    }

    /// Lifetime delivered energy [Wh].
    pub fn total_consumption_wh(&self) -> u64 {
        self.meter.total_consumption_wh()
    }

    pub fn reset_total_consumption(&mut self) {
        self.meter.reset_total_consumption();
    }

    // ─── Host Access ────────────────────────────────────────────────

    pub const fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }
}
