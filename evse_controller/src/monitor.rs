//! Error monitor: sticky fault mask, RCM supervision, temperature checks.
//!
//! The monitor owns the fault mask. Transient faults (pilot, diode, RCM)
//! re-arm a recovery wait window on every set and clear together when it
//! expires; lock and temperature-sensor faults persist until the operator
//! clears them. The RCM self-test is a small tick-counted state machine:
//! inject the test signal, expect a trip, release.

use tracing::{info, warn};

use evse_common::error::ErrorFlags;
use evse_common::hal::driver::BoardIo;
use evse_common::hal::types::BoardCapabilities;

use crate::config::ms_to_ticks;
use crate::lock::LockStatus;
use evse_common::consts::{ERROR_WAIT_TIME_MS, RCM_TEST_PULSE_MS, TEMP_HYSTERESIS};

/// Residual current monitor self-test progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcmSelfTest {
    /// Not run for the current session.
    Idle,
    /// Test signal asserted, counting down the pulse.
    Injecting(u32),
    /// The monitor tripped on the test signal.
    Passed,
    /// The monitor did not trip.
    Failed,
}

/// Fault mask owner, polled once per tick.
#[derive(Debug, Clone)]
pub struct ErrorMonitor {
    errors: ErrorFlags,
    /// Mask transitioned to empty this tick; the core skips one
    /// evaluation so outputs are applied first.
    cleared: bool,
    /// Recovery window expired this tick; the core falls back to A.
    wait_expired: bool,
    wait_ticks: u32,
    wait_window: u32,

    rcm: bool,
    selftest: RcmSelfTest,
    test_pulse_ticks: u32,

    temp_threshold: u8,
    caps: BoardCapabilities,
}

impl ErrorMonitor {
    pub fn new(caps: BoardCapabilities, rcm: bool, temp_threshold: u8, tick_ms: u32) -> Self {
        Self {
            errors: ErrorFlags::empty(),
            cleared: false,
            wait_expired: false,
            wait_ticks: 0,
            wait_window: ms_to_ticks(ERROR_WAIT_TIME_MS, tick_ms),
            rcm,
            selftest: RcmSelfTest::Idle,
            test_pulse_ticks: ms_to_ticks(RCM_TEST_PULSE_MS, tick_ms),
            temp_threshold,
            caps,
        }
    }

    #[inline]
    pub const fn errors(&self) -> ErrorFlags {
        self.errors
    }

    /// Poll all fault sources for one tick.
    pub fn poll<B: BoardIo>(
        &mut self,
        board: &mut B,
        socket_outlet: bool,
        lock_status: LockStatus,
        diode_fault: bool,
    ) {
        // Recovery window for transient faults.
        if self.wait_ticks > 0 {
            self.wait_ticks -= 1;
            if self.wait_ticks == 0 {
                self.clear(ErrorFlags::AUTO_CLEAR);
                self.wait_expired = true;
            }
        }

        if diode_fault {
            self.set(ErrorFlags::DIODE_SHORT);
        }

        if self.caps.socket_lock && socket_outlet {
            match lock_status {
                LockStatus::LockingFail => self.set(ErrorFlags::LOCK_FAULT),
                LockStatus::UnlockingFail => self.set(ErrorFlags::UNLOCK_FAULT),
                _ => {}
            }
        }

        if self.rcm && self.caps.rcm {
            match self.selftest {
                RcmSelfTest::Injecting(ticks) if ticks > 1 => {
                    self.selftest = RcmSelfTest::Injecting(ticks - 1);
                }
                RcmSelfTest::Injecting(_) => {
                    board.set_rcm_test(false);
                    if board.rcm_triggered() {
                        info!("residual current monitor self test success");
                        self.selftest = RcmSelfTest::Passed;
                    } else {
                        warn!("residual current monitor self test fail");
                        self.selftest = RcmSelfTest::Failed;
                        self.set(ErrorFlags::RCM_SELFTEST_FAULT);
                    }
                }
                _ => {
                    if board.rcm_triggered() {
                        self.set(ErrorFlags::RCM_TRIGGERED);
                    }
                }
            }
        }

        if self.caps.temp_sensor {
            match board.temperature() {
                None => self.set(ErrorFlags::TEMPERATURE_FAULT),
                Some(temp) => {
                    let threshold = self.temp_threshold as i16 * 100;
                    if temp > threshold {
                        self.set(ErrorFlags::TEMPERATURE_HIGH);
                    } else if temp < threshold - TEMP_HYSTERESIS {
                        self.clear(ErrorFlags::TEMPERATURE_HIGH);
                    }
                }
            }
        }
    }

    /// Record faults detected by the core (pilot fault).
    pub fn set_fault(&mut self, bits: ErrorFlags) {
        self.set(bits);
    }

    /// The mask became empty this tick. Consuming read.
    pub fn take_cleared(&mut self) -> bool {
        std::mem::take(&mut self.cleared)
    }

    /// The recovery window expired this tick. Consuming read.
    pub fn take_wait_expired(&mut self) -> bool {
        std::mem::take(&mut self.wait_expired)
    }

    /// Operator fault clear (available off→on) or restart.
    pub fn clear_all(&mut self) {
        self.errors = ErrorFlags::empty();
        self.wait_ticks = 0;
        self.cleared = false;
        self.wait_expired = false;
    }

    // ── RCM self-test ──

    /// Begin the pre-charge self-test (B1 entry). No-op when RCM is off
    /// or the test already ran this session.
    pub fn start_selftest<B: BoardIo>(&mut self, board: &mut B) {
        if self.rcm && self.caps.rcm && self.selftest == RcmSelfTest::Idle {
            board.set_rcm_test(true);
            self.selftest = RcmSelfTest::Injecting(self.test_pulse_ticks);
        }
    }

    /// Re-arm the self-test for the next session (A/E/F entry).
    pub fn rearm_selftest(&mut self) {
        self.selftest = RcmSelfTest::Idle;
    }

    /// The RCM gate for relay closing: passed, or not applicable.
    #[inline]
    pub fn selftest_ok(&self) -> bool {
        !self.rcm || !self.caps.rcm || self.selftest == RcmSelfTest::Passed
    }

    #[inline]
    pub const fn selftest(&self) -> RcmSelfTest {
        self.selftest
    }

    // ── Runtime configuration ──

    #[inline]
    pub const fn is_rcm(&self) -> bool {
        self.rcm
    }

    pub fn set_rcm(&mut self, rcm: bool) {
        self.rcm = rcm;
    }

    #[inline]
    pub const fn temp_threshold(&self) -> u8 {
        self.temp_threshold
    }

    pub fn set_temp_threshold(&mut self, threshold: u8) {
        self.temp_threshold = threshold;
    }

    fn set(&mut self, bits: ErrorFlags) {
        let new = bits.difference(self.errors);
        if !new.is_empty() {
            warn!(flags = ?new, "fault raised");
        }
        self.errors.insert(bits);
        if bits.intersects(ErrorFlags::AUTO_CLEAR) {
            self.wait_ticks = self.wait_window;
        }
    }

    fn clear(&mut self, bits: ErrorFlags) {
        let had_errors = !self.errors.is_empty();
        self.errors.remove(bits);
        if had_errors && self.errors.is_empty() {
            self.cleared = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockStatus;
    use crate::sim::SimBoard;

    fn full_caps() -> BoardCapabilities {
        BoardCapabilities {
            proximity: true,
            socket_lock: true,
            rcm: true,
            temp_sensor: true,
        }
    }

    fn monitor(rcm: bool) -> ErrorMonitor {
        ErrorMonitor::new(full_caps(), rcm, 60, 250)
    }

    fn poll_quiet(m: &mut ErrorMonitor, board: &mut SimBoard) {
        m.poll(board, true, LockStatus::Idle, false);
    }

    #[test]
    fn diode_fault_sets_bit() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        m.poll(&mut board, false, LockStatus::Idle, true);
        assert!(m.errors().contains(ErrorFlags::DIODE_SHORT));
    }

    #[test]
    fn lock_failures_map_to_faults() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        m.poll(&mut board, true, LockStatus::LockingFail, false);
        assert!(m.errors().contains(ErrorFlags::LOCK_FAULT));

        m.poll(&mut board, true, LockStatus::UnlockingFail, false);
        assert!(m.errors().contains(ErrorFlags::UNLOCK_FAULT));
    }

    #[test]
    fn lock_failures_ignored_for_fixed_cable() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        m.poll(&mut board, false, LockStatus::LockingFail, false);
        assert!(m.errors().is_empty());
    }

    #[test]
    fn rcm_trip_latches() {
        let mut m = monitor(true);
        let mut board = SimBoard::default();
        board.trip_rcm();
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().contains(ErrorFlags::RCM_TRIGGERED));
    }

    #[test]
    fn selftest_passes_on_healthy_monitor() {
        let mut m = monitor(true);
        let mut board = SimBoard::default();
        assert!(!m.selftest_ok());

        m.start_selftest(&mut board);
        poll_quiet(&mut m, &mut board);
        assert_eq!(m.selftest(), RcmSelfTest::Passed);
        assert!(m.selftest_ok());
        assert!(m.errors().is_empty());
    }

    #[test]
    fn selftest_failure_sets_fault() {
        let mut m = monitor(true);
        let mut board = SimBoard::default();
        board.set_rcm_healthy(false);

        m.start_selftest(&mut board);
        poll_quiet(&mut m, &mut board);
        assert_eq!(m.selftest(), RcmSelfTest::Failed);
        assert!(m.errors().contains(ErrorFlags::RCM_SELFTEST_FAULT));
        assert!(!m.selftest_ok());
    }

    #[test]
    fn selftest_not_required_when_rcm_off() {
        let m = monitor(false);
        assert!(m.selftest_ok());
    }

    #[test]
    fn overtemperature_with_hysteresis() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();

        board.set_temperature(Some(6_100));
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().contains(ErrorFlags::TEMPERATURE_HIGH));

        // Just below threshold: inside the hysteresis band, still high.
        board.set_temperature(Some(5_950));
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().contains(ErrorFlags::TEMPERATURE_HIGH));

        board.set_temperature(Some(5_700));
        poll_quiet(&mut m, &mut board);
        assert!(!m.errors().contains(ErrorFlags::TEMPERATURE_HIGH));
        assert!(m.take_cleared());
    }

    #[test]
    fn sensor_failure_is_sticky() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        board.set_temperature(None);
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().contains(ErrorFlags::TEMPERATURE_FAULT));

        board.set_temperature(Some(2_500));
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().contains(ErrorFlags::TEMPERATURE_FAULT));

        m.clear_all();
        assert!(m.errors().is_empty());
    }

    #[test]
    fn transient_faults_recover_after_wait_window() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        m.set_fault(ErrorFlags::PILOT_FAULT);

        // 60 s at 250 ms = 240 ticks.
        for _ in 0..239 {
            poll_quiet(&mut m, &mut board);
            assert!(!m.errors().is_empty());
        }
        poll_quiet(&mut m, &mut board);
        assert!(m.errors().is_empty());
        assert!(m.take_wait_expired());
        assert!(m.take_cleared());
    }

    #[test]
    fn sticky_fault_survives_wait_window() {
        let mut m = monitor(false);
        let mut board = SimBoard::default();
        m.set_fault(ErrorFlags::PILOT_FAULT | ErrorFlags::LOCK_FAULT);

        for _ in 0..240 {
            poll_quiet(&mut m, &mut board);
        }
        assert_eq!(m.errors(), ErrorFlags::LOCK_FAULT);
        assert!(m.take_wait_expired());
        assert!(!m.take_cleared());
    }
}
