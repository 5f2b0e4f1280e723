//! Application core — the control kernel, zero I/O.
//!
//! Command parsing and dispatch, the per-cycle orchestration, and the
//! outbound event model. All interaction with the outside world happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
