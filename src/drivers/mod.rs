//! Actuator drivers and hardware initialisation.

pub mod hw_init;
pub mod motor;
pub mod relay;

use log::debug;

use crate::error::ActuatorError;
use crate::pins;
use crate::state::{ActuatorId, ActuatorState, Direction, RelayId};
use motor::{MotorPins, MotorSpec};
use relay::RelayBank;

/// Maps a logical actuator id + direction/speed to discrete output-pin
/// writes, and a logical relay id + on/off to an (inverted) relay pin write.
///
/// The driver also mirrors every applied command into the caller-supplied
/// logical state arrays, so `SystemState` always reflects the last write.
#[derive(Debug)]
pub struct ActuatorDriver {
    motors: [MotorSpec; ActuatorId::COUNT],
    relays: RelayBank,
}

impl ActuatorDriver {
    /// Build the driver for the board's fixed wiring.
    pub fn new() -> Self {
        let motors = [
            // ActuatorId::Auger
            MotorSpec {
                pins: MotorPins::HBridge {
                    in1: pins::AUGER_IN1_GPIO,
                    in2: pins::AUGER_IN2_GPIO,
                    ena: pins::AUGER_ENA_GPIO,
                },
                min_effective_pwm: motor::AUGER_MIN_PWM,
            },
            // ActuatorId::Blower
            MotorSpec {
                pins: MotorPins::DualPwm {
                    rpwm: pins::BLOWER_RPWM_GPIO,
                    lpwm: pins::BLOWER_LPWM_GPIO,
                },
                min_effective_pwm: motor::BLOWER_MIN_PWM,
            },
            // ActuatorId::Gate
            MotorSpec {
                pins: MotorPins::HBridge {
                    in1: pins::GATE_IN1_GPIO,
                    in2: pins::GATE_IN2_GPIO,
                    ena: pins::GATE_ENA_GPIO,
                },
                min_effective_pwm: motor::GATE_MIN_PWM,
            },
        ];
        Self {
            motors,
            relays: RelayBank::new(pins::RELAY_LED_GPIO, pins::RELAY_FAN_GPIO),
        }
    }

    /// Drive one motor. `Stopped` forces speed 0 and parks every output low;
    /// nonzero speeds below the motor's effective floor are raised to it.
    /// The applied state is mirrored into `actuators`.
    pub fn set_actuator(
        &self,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
        id: ActuatorId,
        direction: Direction,
        speed: u8,
    ) -> Result<(), ActuatorError> {
        let applied = self.motors[id.index()].apply(direction, speed)?;
        let direction = if applied == 0 {
            Direction::Stopped
        } else {
            direction
        };
        actuators[id.index()] = ActuatorState {
            direction,
            speed: applied,
        };
        debug!("{}: {:?} duty={}", id.name(), direction, applied);
        Ok(())
    }

    /// Drive one relay channel with a logical on/off. Polarity inversion for
    /// the active-low board happens inside [`RelayBank`].
    pub fn set_relay(&self, relays: &mut [bool; RelayId::COUNT], id: RelayId, on: bool) {
        self.relays.apply(id, on);
        relays[id.index()] = on;
        debug!("relay {}: {}", id.name(), if on { "on" } else { "off" });
    }

    /// Stop every motor. Relays are left as they are — stopping motion must
    /// not kill the pond light.
    pub fn stop_all(
        &self,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
    ) -> Result<(), ActuatorError> {
        for id in ActuatorId::ALL {
            self.set_actuator(actuators, id, Direction::Stopped, 0)?;
        }
        Ok(())
    }
}

impl Default for ActuatorDriver {
    fn default() -> Self {
        Self::new()
    }
}
