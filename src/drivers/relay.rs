//! Relay module driver (2-channel, active LOW).
//!
//! Callers pass logical on/off. The polarity inversion for active-low relay
//! boards happens here and nowhere else — no other component ever reasons
//! about electrical levels.

use crate::drivers::hw_init;
use crate::state::RelayId;

/// Fixed pin table for the relay bank.
#[derive(Debug, Clone, Copy)]
pub struct RelayBank {
    pins: [i32; RelayId::COUNT],
}

impl RelayBank {
    pub fn new(led_pin: i32, fan_pin: i32) -> Self {
        Self {
            pins: [led_pin, fan_pin],
        }
    }

    /// Drive one channel. `on` is logical; the pin is driven LOW to energise.
    pub fn apply(&self, id: RelayId, on: bool) {
        hw_init::gpio_write(self.pins[id.index()], !on);
    }

    /// Park every channel de-energised (pins HIGH).
    pub fn all_off(&self) {
        for &pin in &self.pins {
            hw_init::gpio_write(pin, true);
        }
    }
}
