//! Value types crossing the board I/O boundary.

use heapless::Vec;

use crate::consts::PILOT_SAMPLES;

/// One tick's worth of raw control-pilot samples [mV on the CP line,
/// −12000..=12000]. Fixed capacity, filled by the board driver.
pub type PilotBuffer = Vec<i16, PILOT_SAMPLES>;

/// Peripherals present on a given board variant.
///
/// The controller queries these once at construction and skips the
/// monitor/lock steps for absent hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardCapabilities {
    /// Proximity (cable rating) sensing on the PP line.
    pub proximity: bool,
    /// Electromechanical socket lock with feedback.
    pub socket_lock: bool,
    /// Residual current monitor with test input.
    pub rcm: bool,
    /// Temperature probe(s).
    pub temp_sensor: bool,
}

/// Commanded state of the control-pilot output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotOutput {
    /// Steady +12 V (states A, B1, C1, D1).
    SteadyHigh,
    /// Steady −12 V (states E, F).
    SteadyLow,
    /// 1 kHz PWM with the given duty [0.1 %].
    Pwm(u16),
}

impl PilotOutput {
    /// PWM is being generated (the diode check applies).
    #[inline]
    pub const fn is_pwm(self) -> bool {
        matches!(self, Self::Pwm(_))
    }
}

/// Commanded state of the lock actuator H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDrive {
    /// Drive toward the locked position.
    Lock,
    /// Drive toward the unlocked position.
    Unlock,
    /// Actuator unpowered.
    Off,
}

/// One tick's worth of energy meter output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterReading {
    /// Instantaneous power [W].
    pub power_w: u16,
    /// Energy delivered during the tick [Ws].
    pub energy_ws: u32,
    /// Per-phase voltage [V].
    pub voltage_v: [f32; 3],
    /// Per-phase current [A].
    pub current_a: [f32; 3],
}
