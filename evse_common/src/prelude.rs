//! Prelude module for common re-exports.
//!
//! Consumers can `use evse_common::prelude::*;` and get the most
//! important types without listing individual paths.

// ─── States & Flags ─────────────────────────────────────────────────
pub use crate::error::{ErrorFlags, LimitFlags, ParamError};
pub use crate::state::EvseState;

// ─── Hardware Interfaces ────────────────────────────────────────────
pub use crate::hal::driver::{BoardIo, EnergyMeter};
pub use crate::hal::types::{
    BoardCapabilities, LockDrive, MeterReading, PilotBuffer, PilotOutput,
};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::ConfigError;
pub use crate::consts::DEFAULT_TICK_MS;
