//! EVSE Common Library
//!
//! This crate provides shared types, constants and hardware interfaces
//! for all EVSE workspace crates.
//!
//! # Module Structure
//!
//! - [`state`] - IEC 61851-1 controller states
//! - [`error`] - Fault and limit bitflags, setter error type
//! - [`consts`] - Shared constants (current bounds, timing windows)
//! - [`hal`] - Board I/O and energy meter driver interfaces
//! - [`config`] - Configuration error type
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod error;
pub mod hal;
pub mod prelude;
pub mod state;
