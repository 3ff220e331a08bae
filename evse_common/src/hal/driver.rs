//! Board I/O and energy meter driver traits.
//!
//! The controller owns one `BoardIo` and one `EnergyMeter` implementation
//! and talks to hardware exclusively through them, which keeps the core
//! testable against simulated peripherals.

use std::time::Duration;

use crate::hal::types::{BoardCapabilities, LockDrive, MeterReading, PilotBuffer, PilotOutput};

/// Interface to the charging-hardware board.
///
/// Every method is a non-blocking register or bus operation; the
/// controller calls them from inside its tick and assumes they return
/// promptly. Methods for absent peripherals (see
/// [`BoardCapabilities`]) are never called.
pub trait BoardIo: Send {
    /// Peripherals present on this board. Queried once at construction.
    fn capabilities(&self) -> BoardCapabilities;

    /// Oversampled control-pilot readings for this tick [mV, CP domain].
    fn pilot_samples(&mut self) -> PilotBuffer;

    /// Drive the control-pilot output stage.
    fn set_pilot(&mut self, output: PilotOutput);

    /// Proximity (PP) line level [mV]. Requires `proximity`.
    fn proximity_mv(&mut self) -> u16;

    /// Close or open the AC power relay.
    fn set_relay(&mut self, closed: bool);

    /// Latched residual-current trip since the last call; reading clears
    /// the latch. Requires `rcm`.
    fn rcm_triggered(&mut self) -> bool;

    /// Assert or release the RCM test injection signal. Requires `rcm`.
    fn set_rcm_test(&mut self, active: bool);

    /// Drive the socket lock actuator. Requires `socket_lock`.
    fn set_lock(&mut self, drive: LockDrive);

    /// Raw lock feedback line level. Polarity is configuration
    /// (`detection_high`). Requires `socket_lock`.
    fn lock_detect(&mut self) -> bool;

    /// Highest probe temperature [0.01 °C], or `None` when no probe
    /// responds. Requires `temp_sensor`.
    fn temperature(&mut self) -> Option<i16>;
}

/// Interface to the energy metering subsystem.
///
/// The session/limit tracker polls the meter once per tick and
/// accumulates the returned increments; the meter itself keeps only the
/// lifetime total.
pub trait EnergyMeter: Send {
    /// Measure one tick. `charging` and the advertised current [0.1 A]
    /// let metering-less boards estimate power.
    fn poll(&mut self, charging: bool, charging_current: u16, dt: Duration) -> MeterReading;

    /// Lifetime delivered energy [Wh].
    fn total_consumption_wh(&self) -> u64;

    /// Zero the lifetime counter.
    fn reset_total_consumption(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBoard;

    impl BoardIo for NullBoard {
        fn capabilities(&self) -> BoardCapabilities {
            BoardCapabilities::default()
        }
        fn pilot_samples(&mut self) -> PilotBuffer {
            PilotBuffer::new()
        }
        fn set_pilot(&mut self, _output: PilotOutput) {}
        fn proximity_mv(&mut self) -> u16 {
            0
        }
        fn set_relay(&mut self, _closed: bool) {}
        fn rcm_triggered(&mut self) -> bool {
            false
        }
        fn set_rcm_test(&mut self, _active: bool) {}
        fn set_lock(&mut self, _drive: LockDrive) {}
        fn lock_detect(&mut self) -> bool {
            false
        }
        fn temperature(&mut self) -> Option<i16> {
            None
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let mut board: Box<dyn BoardIo> = Box::new(NullBoard);
        assert_eq!(board.capabilities(), BoardCapabilities::default());
        assert!(board.pilot_samples().is_empty());
    }
}
