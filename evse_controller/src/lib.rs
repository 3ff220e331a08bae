//! # EVSE Controller Library
//!
//! Control core of an IEC 61851-1 charging station. A single
//! [`controller::EvseController`] owns the board I/O, the energy meter and
//! every subsystem, and advances them once per `process()` tick:
//!
//! 1. **Pilot sampler** — oversampled CP classification with debounce
//! 2. **Error monitor** — sticky fault mask, RCM supervision, temperature
//! 3. **Authorization gate** — B1→B2 gating with a grant window
//! 4. **State machine core** — A/B1/B2/C1/C2/D1/D2/E/F transitions
//! 5. **PWM / relay / lock outputs** — applied on state change only
//! 6. **Session & limit tracker** — energy, time and under-power limits
//!
//! All timeouts are tick counts; `process()` never blocks and never
//! allocates in steady state. Protocol adapters (Modbus, MQTT, shell)
//! live outside this crate and talk through the typed accessor API.

pub mod auth;
pub mod config;
pub mod controller;
pub mod lock;
pub mod monitor;
pub mod pilot;
pub mod pwm;
pub mod rt;
pub mod session;
pub mod sim;
