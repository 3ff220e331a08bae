//! Hardware abstraction for the charging controller.
//!
//! - [`driver`] - `BoardIo` and `EnergyMeter` traits for pluggable backends
//! - [`types`] - Capability flags, pilot output, lock drive, meter reading

pub mod driver;
pub mod types;

pub use driver::{BoardIo, EnergyMeter};
pub use types::{BoardCapabilities, LockDrive, MeterReading, PilotBuffer, PilotOutput};
