//! Simulated board and energy meter.
//!
//! Behavioral stand-ins for the real peripherals: the vehicle side is a
//! settable CP level and diode flag, the lock actuator moves instantly
//! unless jammed, the RCM latches a trip while the test signal is
//! asserted. Used by the demo binary and throughout the test suite.

use std::time::Duration;

use evse_common::hal::driver::{BoardIo, EnergyMeter};
use evse_common::hal::types::{
    BoardCapabilities, LockDrive, MeterReading, PilotBuffer, PilotOutput,
};

/// Simulated charging hardware.
#[derive(Debug, Clone)]
pub struct SimBoard {
    caps: BoardCapabilities,
    /// CP level presented by the (simulated) vehicle [mV].
    cp_mv: i16,
    diode_present: bool,
    proximity_mv: u16,
    pilot: PilotOutput,
    relay: bool,
    rcm_latch: bool,
    rcm_healthy: bool,
    lock_position: bool,
    lock_jammed: bool,
    temperature: Option<i16>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::with_capabilities(BoardCapabilities {
            proximity: true,
            socket_lock: true,
            rcm: true,
            temp_sensor: true,
        })
    }
}

impl SimBoard {
    pub fn with_capabilities(caps: BoardCapabilities) -> Self {
        Self {
            caps,
            cp_mv: 11_800,
            diode_present: true,
            proximity_mv: 200,
            pilot: PilotOutput::SteadyHigh,
            relay: false,
            rcm_latch: false,
            rcm_healthy: true,
            lock_position: false,
            lock_jammed: false,
            temperature: Some(2_500),
        }
    }

    // ── Vehicle / environment knobs ──

    /// Present a CP level, as the vehicle's resistor network would.
    pub fn set_cp_millivolts(&mut self, mv: i16) {
        self.cp_mv = mv;
    }

    /// Remove or restore the vehicle diode (short condition).
    pub fn set_diode_present(&mut self, present: bool) {
        self.diode_present = present;
    }

    /// Present a PP level encoding the cable rating.
    pub fn set_proximity_mv(&mut self, mv: u16) {
        self.proximity_mv = mv;
    }

    /// Latch a residual-current trip.
    pub fn trip_rcm(&mut self) {
        self.rcm_latch = true;
    }

    /// Whether the RCM responds to its test input.
    pub fn set_rcm_healthy(&mut self, healthy: bool) {
        self.rcm_healthy = healthy;
    }

    /// Seize the lock mechanism.
    pub fn jam_lock(&mut self, jammed: bool) {
        self.lock_jammed = jammed;
    }

    pub fn set_temperature(&mut self, temperature: Option<i16>) {
        self.temperature = temperature;
    }

    // ── Inspection ──

    pub const fn pilot_output(&self) -> PilotOutput {
        self.pilot
    }

    pub const fn relay_closed(&self) -> bool {
        self.relay
    }

    pub const fn lock_position(&self) -> bool {
        self.lock_position
    }
}

impl BoardIo for SimBoard {
    fn capabilities(&self) -> BoardCapabilities {
        self.caps
    }

    fn pilot_samples(&mut self) -> PilotBuffer {
        let mut buf = PilotBuffer::new();
        let (high, low) = match self.pilot {
            PilotOutput::SteadyHigh => (self.cp_mv, self.cp_mv),
            PilotOutput::SteadyLow => (-12_000, -12_000),
            PilotOutput::Pwm(_) => {
                let low = if self.diode_present { -12_000 } else { self.cp_mv };
                (self.cp_mv, low)
            }
        };
        for i in 0..buf.capacity() {
            let sample = if i % 2 == 0 { high } else { low };
            let _ = buf.push(sample);
        }
        buf
    }

    fn set_pilot(&mut self, output: PilotOutput) {
        self.pilot = output;
    }

    fn proximity_mv(&mut self) -> u16 {
        self.proximity_mv
    }

    fn set_relay(&mut self, closed: bool) {
        self.relay = closed;
    }

    fn rcm_triggered(&mut self) -> bool {
        std::mem::take(&mut self.rcm_latch)
    }

    fn set_rcm_test(&mut self, active: bool) {
        if active && self.rcm_healthy {
            self.rcm_latch = true;
        }
    }

    fn set_lock(&mut self, drive: LockDrive) {
        if self.lock_jammed {
            return;
        }
        match drive {
            LockDrive::Lock => self.lock_position = true,
            LockDrive::Unlock => self.lock_position = false,
            LockDrive::Off => {}
        }
    }

    fn lock_detect(&mut self) -> bool {
        self.lock_position
    }

    fn temperature(&mut self) -> Option<i16> {
        self.temperature
    }
}

/// Estimating meter for boards without measurement hardware: power is
/// derived from the advertised current and a configured AC voltage.
#[derive(Debug, Clone)]
pub struct DummyMeter {
    ac_voltage: u16,
    three_phase: bool,
    total_ws: u64,
}

impl DummyMeter {
    pub const fn new(ac_voltage: u16, three_phase: bool) -> Self {
        Self {
            ac_voltage,
            three_phase,
            total_ws: 0,
        }
    }
}

impl EnergyMeter for DummyMeter {
    fn poll(&mut self, charging: bool, charging_current: u16, dt: Duration) -> MeterReading {
        if !charging {
            return MeterReading {
                voltage_v: self.voltages(),
                ..MeterReading::default()
            };
        }

        let amps = charging_current as f32 / 10.0;
        let volts = self.ac_voltage as f32;
        let phases = if self.three_phase { 3.0 } else { 1.0 };
        let va = volts * amps * phases;
        let energy_ws = (va * dt.as_millis() as f32 / 1000.0).round() as u32;
        self.total_ws += energy_ws as u64;

        let phase_current = if self.three_phase {
            [amps, amps, amps]
        } else {
            [amps, 0.0, 0.0]
        };

        MeterReading {
            power_w: va.min(u16::MAX as f32) as u16,
            energy_ws,
            voltage_v: self.voltages(),
            current_a: phase_current,
        }
    }

    fn total_consumption_wh(&self) -> u64 {
        self.total_ws / 3_600
    }

    fn reset_total_consumption(&mut self) {
        self.total_ws = 0;
    }
}

impl DummyMeter {
    fn voltages(&self) -> [f32; 3] {
        let volts = self.ac_voltage as f32;
        if self.three_phase {
            [volts, volts, volts]
        } else {
            [volts, 0.0, 0.0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pilot_buffer_reflects_output_stage() {
        let mut board = SimBoard::default();
        board.set_cp_millivolts(8_800);

        let buf = board.pilot_samples();
        assert!(buf.iter().all(|&s| s == 8_800));

        board.set_pilot(PilotOutput::Pwm(266));
        let buf = board.pilot_samples();
        assert!(buf.contains(&8_800));
        assert!(buf.contains(&-12_000));

        board.set_diode_present(false);
        let buf = board.pilot_samples();
        assert!(!buf.contains(&-12_000));
    }

    #[test]
    fn rcm_test_latches_trip_when_healthy() {
        let mut board = SimBoard::default();
        board.set_rcm_test(true);
        board.set_rcm_test(false);
        assert!(board.rcm_triggered());
        assert!(!board.rcm_triggered());

        board.set_rcm_healthy(false);
        board.set_rcm_test(true);
        board.set_rcm_test(false);
        assert!(!board.rcm_triggered());
    }

    #[test]
    fn dummy_meter_estimates_power() {
        let mut meter = DummyMeter::new(230, false);
        let reading = meter.poll(true, 160, Duration::from_millis(1_000));
        assert_eq!(reading.power_w, 3_680);
        assert_eq!(reading.energy_ws, 3_680);
        assert_eq!(reading.current_a[0], 16.0);
        assert_eq!(reading.current_a[1], 0.0);

        let idle = meter.poll(false, 160, Duration::from_millis(1_000));
        assert_eq!(idle.power_w, 0);
        assert_eq!(idle.energy_ws, 0);
    }

    #[test]
    fn dummy_meter_three_phase() {
        let mut meter = DummyMeter::new(230, true);
        let reading = meter.poll(true, 160, Duration::from_millis(1_000));
        assert_eq!(reading.power_w, 11_040);
        assert_eq!(reading.current_a, [16.0, 16.0, 16.0]);
    }

    #[test]
    fn total_consumption_accumulates_and_resets() {
        let mut meter = DummyMeter::new(230, false);
        for _ in 0..3_600 {
            meter.poll(true, 160, Duration::from_millis(1_000));
        }
        assert_eq!(meter.total_consumption_wh(), 3_680);
        meter.reset_total_consumption();
        assert_eq!(meter.total_consumption_wh(), 0);
    }
}
