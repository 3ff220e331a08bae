//! Socket lock actuator control.
//!
//! Drives the lock motor for a configured operating time, verifies the
//! feedback line, retries a bounded number of times and enforces a rest
//! period between operations to protect the actuator. All waits are tick
//! counts; a timeout that exhausts the retry budget latches a fail status
//! which the error monitor turns into a fault.

use tracing::{info, warn};

use evse_common::hal::driver::BoardIo;
use evse_common::hal::types::LockDrive;

use crate::config::{LockConfig, ms_to_ticks};

use evse_common::consts::LOCK_DELAY_MS;

/// Externally visible actuator status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// At rest, last operation (if any) succeeded.
    Idle,
    /// An operation is pending or in progress.
    Operating,
    /// Lock engagement failed after all retries.
    LockingFail,
    /// Lock release failed after all retries.
    UnlockingFail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Settle delay before the first lock attempt.
    PreDelay(u32),
    /// Actuator energized.
    Driving(u32),
    /// Rest between operations.
    Break(u32),
}

/// Tick-driven socket lock controller.
#[derive(Debug, Clone)]
pub struct SocketLock {
    detection_high: bool,
    operate_ticks: u32,
    break_ticks: u32,
    pre_delay_ticks: u32,
    retry_count: u8,

    target: bool,
    engaged: bool,
    pending: bool,
    attempts_left: u8,
    phase: Phase,
    status: LockStatus,
}

impl SocketLock {
    pub fn new(config: &LockConfig, tick_ms: u32) -> Self {
        Self {
            detection_high: config.detection_high,
            operate_ticks: ms_to_ticks(config.operating_time as u32, tick_ms),
            break_ticks: ms_to_ticks(config.break_time as u32, tick_ms),
            pre_delay_ticks: ms_to_ticks(LOCK_DELAY_MS, tick_ms),
            retry_count: config.retry_count,
            target: false,
            engaged: false,
            pending: false,
            attempts_left: 0,
            phase: Phase::Idle,
            status: LockStatus::Idle,
        }
    }

    #[inline]
    pub const fn status(&self) -> LockStatus {
        self.status
    }

    /// Verified actuator position.
    #[inline]
    pub const fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Command the actuator toward a position. Ignored while a fail status
    /// is latched or when the position is already commanded.
    pub fn request(&mut self, locked: bool) {
        if matches!(self.status, LockStatus::LockingFail | LockStatus::UnlockingFail) {
            return;
        }
        if locked == self.target {
            return;
        }
        self.target = locked;
        self.pending = true;
        self.status = LockStatus::Operating;
    }

    /// Drop a latched fail status (operator fault clear).
    pub fn reset_faults(&mut self) {
        if matches!(self.status, LockStatus::LockingFail | LockStatus::UnlockingFail) {
            self.status = LockStatus::Idle;
            self.target = self.engaged;
            self.pending = false;
            self.phase = Phase::Idle;
        }
    }

    /// Advance the actuator one tick.
    pub fn tick<B: BoardIo>(&mut self, board: &mut B) {
        match self.phase {
            Phase::Idle => {
                if self.pending {
                    self.pending = false;
                    self.attempts_left = self.retry_count;
                    if self.target {
                        self.phase = Phase::PreDelay(self.pre_delay_ticks);
                    } else {
                        self.drive(board);
                    }
                }
            }
            Phase::PreDelay(ticks) => {
                if ticks > 1 {
                    self.phase = Phase::PreDelay(ticks - 1);
                } else {
                    self.drive(board);
                }
            }
            Phase::Driving(ticks) => {
                if ticks > 1 {
                    self.phase = Phase::Driving(ticks - 1);
                } else {
                    board.set_lock(LockDrive::Off);
                    let sensed = board.lock_detect() == self.detection_high;
                    if sensed == self.target {
                        info!(locked = self.target, "socket lock operation ok");
                        self.engaged = self.target;
                        self.status = LockStatus::Idle;
                        self.phase = Phase::Break(self.break_ticks);
                    } else if self.attempts_left > 1 {
                        warn!(locked = self.target, "socket lock not in position, repeating");
                        self.attempts_left -= 1;
                        self.drive(board);
                    } else {
                        warn!(locked = self.target, "socket lock operation failed");
                        self.status = if self.target {
                            LockStatus::LockingFail
                        } else {
                            LockStatus::UnlockingFail
                        };
                        self.phase = Phase::Break(self.break_ticks);
                    }
                }
            }
            Phase::Break(ticks) => {
                if ticks > 1 {
                    self.phase = Phase::Break(ticks - 1);
                } else {
                    self.phase = Phase::Idle;
                }
            }
        }
    }

    fn drive<B: BoardIo>(&mut self, board: &mut B) {
        board.set_lock(if self.target {
            LockDrive::Lock
        } else {
            LockDrive::Unlock
        });
        self.phase = Phase::Driving(self.operate_ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBoard;

    fn lock() -> SocketLock {
        // 250 ms ticks: operate = 2, pre-delay = 2, break = 4.
        SocketLock::new(&LockConfig::default(), 250)
    }

    fn settle(lock: &mut SocketLock, board: &mut SimBoard, ticks: u32) {
        for _ in 0..ticks {
            lock.tick(board);
        }
    }

    #[test]
    fn lock_engages_after_pre_delay_and_operate() {
        let mut l = lock();
        let mut board = SimBoard::default();

        l.request(true);
        assert_eq!(l.status(), LockStatus::Operating);

        // start + pre-delay (2) + driving (2) + feedback check
        settle(&mut l, &mut board, 6);
        assert_eq!(l.status(), LockStatus::Idle);
        assert!(l.is_engaged());
        assert!(board.lock_position());
    }

    #[test]
    fn unlock_skips_pre_delay() {
        let mut l = lock();
        let mut board = SimBoard::default();
        l.request(true);
        settle(&mut l, &mut board, 8);
        assert!(l.is_engaged());

        l.request(false);
        // rest of the break + start + driving (2)
        settle(&mut l, &mut board, 4);
        assert_eq!(l.status(), LockStatus::Idle);
        assert!(!l.is_engaged());
    }

    #[test]
    fn jammed_lock_fails_after_retries() {
        let mut l = lock();
        let mut board = SimBoard::default();
        board.jam_lock(true);

        l.request(true);
        // start + pre-delay + 5 attempts x 2 ticks
        settle(&mut l, &mut board, 16);
        assert_eq!(l.status(), LockStatus::LockingFail);
        assert!(!l.is_engaged());
    }

    #[test]
    fn jammed_unlock_reports_unlocking_fail() {
        let mut l = lock();
        let mut board = SimBoard::default();
        l.request(true);
        settle(&mut l, &mut board, 8);

        board.jam_lock(true);
        l.request(false);
        settle(&mut l, &mut board, 14);
        assert_eq!(l.status(), LockStatus::UnlockingFail);
    }

    #[test]
    fn requests_refused_while_failed() {
        let mut l = lock();
        let mut board = SimBoard::default();
        board.jam_lock(true);
        l.request(true);
        settle(&mut l, &mut board, 16);
        assert_eq!(l.status(), LockStatus::LockingFail);

        l.request(false);
        assert_eq!(l.status(), LockStatus::LockingFail);

        l.reset_faults();
        assert_eq!(l.status(), LockStatus::Idle);
    }

    #[test]
    fn break_time_spaces_operations() {
        let mut l = lock();
        let mut board = SimBoard::default();
        l.request(true);
        settle(&mut l, &mut board, 5);
        assert!(l.is_engaged());

        // Unlock requested during the break: nothing moves until it ends.
        l.request(false);
        settle(&mut l, &mut board, 3);
        assert!(board.lock_position(), "unlock must wait out the break");

        settle(&mut l, &mut board, 4);
        assert!(!board.lock_position());
        assert_eq!(l.status(), LockStatus::Idle);
    }
}
