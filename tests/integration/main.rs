//! Host-side integration tests for the control kernel.
//!
//! Everything runs against the mock hardware adapter — no GPIO, no UART,
//! just the same port traits the firmware binary wires up on the target.

mod mock_hw;

mod feeding_flow_tests;
mod service_tests;
