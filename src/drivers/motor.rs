//! DC motor driver primitives.
//!
//! Two wiring variants are in play on this board: the auger and the feed
//! gate sit on L298N H-bridge channels (two direction pins + one PWM enable),
//! the blower sits on a BTS7960 with independent forward/reverse PWM half
//! bridges. Both are expressed as a [`MotorSpec`] so the actuator driver can
//! treat every motor uniformly.
//!
//! ## PWM floor
//!
//! Each motor class stalls below a minimum duty (gearbox friction on the
//! auger, static pressure on the blower, lead-screw load on the gate). Any
//! nonzero speed request below that floor is raised to the floor rather than
//! rejected — a small requested speed means "run slowly", never "hum and
//! overheat".

use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::state::Direction;

/// Lowest duty the auger reliably turns at.
pub const AUGER_MIN_PWM: u8 = 90;
/// Lowest duty that produces airflow from the blower.
pub const BLOWER_MIN_PWM: u8 = 60;
/// Lowest duty that moves the gate lead screw under load.
pub const GATE_MIN_PWM: u8 = 110;

/// Output wiring of one motor.
#[derive(Debug, Clone, Copy)]
pub enum MotorPins {
    /// L298N-style: two direction pins, one PWM enable.
    HBridge { in1: i32, in2: i32, ena: i32 },
    /// BTS7960-style: one PWM pin per direction.
    DualPwm { rpwm: i32, lpwm: i32 },
}

/// Static description of one motor channel.
#[derive(Debug, Clone, Copy)]
pub struct MotorSpec {
    pub pins: MotorPins,
    /// Minimum effective duty for this motor class.
    pub min_effective_pwm: u8,
}

impl MotorSpec {
    /// Clamp a requested duty to the effective range: zero stays zero,
    /// anything else is at least the floor.
    pub fn clamp_duty(&self, requested: u8) -> u8 {
        if requested == 0 {
            0
        } else {
            requested.max(self.min_effective_pwm)
        }
    }

    /// Write direction and duty to the output pins. Returns the duty that
    /// was actually applied after floor clamping.
    pub fn apply(&self, direction: Direction, requested: u8) -> Result<u8, ActuatorError> {
        let duty = match direction {
            Direction::Stopped => 0,
            _ => self.clamp_duty(requested),
        };

        match self.pins {
            MotorPins::HBridge { in1, in2, ena } => {
                let (a, b) = match direction {
                    Direction::Forward if duty > 0 => (true, false),
                    Direction::Reverse if duty > 0 => (false, true),
                    _ => (false, false),
                };
                hw_init::gpio_write(in1, a);
                hw_init::gpio_write(in2, b);
                hw_init::pwm_write(ena, duty);
            }
            MotorPins::DualPwm { rpwm, lpwm } => {
                let (r, l) = match direction {
                    Direction::Forward => (duty, 0),
                    Direction::Reverse => (0, duty),
                    Direction::Stopped => (0, 0),
                };
                hw_init::pwm_write(rpwm, r);
                hw_init::pwm_write(lpwm, l);
            }
        }
        Ok(duty)
    }
}
