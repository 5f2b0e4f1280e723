//! Shared mutable state threaded through every control-cycle call.
//!
//! `SystemState` is the single struct the poll loop owns and mutates. No
//! component holds a reference to it longer than one call — the service
//! destructures it and lends individual fields out for the duration of a
//! dispatch or tick. No hidden statics; tests construct a fresh state each.

use crate::config::FeederConfig;
use crate::error::{ActuatorError, SensorError};
use crate::feeding::FeedingSession;

/// Milliseconds since boot (monotonic).
pub type Millis = u64;

// ---------------------------------------------------------------------------
// Actuator identity
// ---------------------------------------------------------------------------

/// Every motor the controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActuatorId {
    /// Screw-feed motor that dispenses food.
    Auger = 0,
    /// Ventilation / feed-clearing motor.
    Blower = 1,
    /// Linear actuator opening and closing the feed gate.
    Gate = 2,
}

impl ActuatorId {
    /// Total number of actuators — used to size fixed tables.
    pub const COUNT: usize = 3;

    /// All actuators, in table order.
    pub const ALL: [Self; Self::COUNT] = [Self::Auger, Self::Blower, Self::Gate];

    /// Table index for this actuator.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve a raw numeric id from the command surface.
    pub fn try_from_raw(raw: u8) -> Result<Self, ActuatorError> {
        match raw {
            0 => Ok(Self::Auger),
            1 => Ok(Self::Blower),
            2 => Ok(Self::Gate),
            _ => Err(ActuatorError::UnknownId),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Auger => "auger",
            Self::Blower => "blower",
            Self::Gate => "gate",
        }
    }
}

/// Every relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RelayId {
    /// Pond LED light.
    Led = 0,
    /// Control-box cooling fan.
    Fan = 1,
}

impl RelayId {
    pub const COUNT: usize = 2;

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Led => "led",
            Self::Fan => "fan",
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator state
// ---------------------------------------------------------------------------

/// Direction of a motor. `Stopped` is a first-class variant so an invalid
/// "direction set but speed zero-with-pins-high" state is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Reverse,
    #[default]
    Stopped,
}

/// Logical state of one motor, mirroring the last applied pin writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub direction: Direction,
    /// Applied PWM duty. Zero iff `direction == Stopped`.
    pub speed: u8,
}

impl ActuatorState {
    pub fn is_running(&self) -> bool {
        self.direction != Direction::Stopped
    }
}

// ---------------------------------------------------------------------------
// Sensor channels
// ---------------------------------------------------------------------------

/// One cached sensor value with its freshness bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Channel {
    value: f32,
    updated_at: Millis,
    valid: bool,
}

impl Channel {
    /// Record a fresh valid reading.
    pub fn record(&mut self, value: f32, now: Millis) {
        self.value = value;
        self.updated_at = now;
        self.valid = true;
    }

    /// Current value if fresh; `Stale` once older than `max_age_ms`,
    /// `NotReady` before the first reading.
    pub fn current(&self, now: Millis, max_age_ms: u32) -> Result<f32, SensorError> {
        if !self.valid {
            return Err(SensorError::NotReady);
        }
        if now.saturating_sub(self.updated_at) > u64::from(max_age_ms) {
            return Err(SensorError::Stale);
        }
        Ok(self.value)
    }

    /// Last known value regardless of age (status reporting).
    pub fn last(&self) -> Option<f32> {
        self.valid.then_some(self.value)
    }

    /// Timestamp of the last valid reading.
    pub fn updated_at(&self) -> Millis {
        self.updated_at
    }
}

/// Last-known-good value per sensor channel. Written only by the sampler;
/// read by the sequencer, climate supervision, and status reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestReadings {
    /// Food weight on the scale (kg).
    pub weight_kg: Channel,
    /// Feed-hopper climate.
    pub feed_temp_c: Channel,
    pub feed_humidity_pct: Channel,
    /// Control-box climate.
    pub box_temp_c: Channel,
    pub box_humidity_pct: Channel,
    /// Battery / load rail.
    pub load_voltage_v: Channel,
    pub load_current_a: Channel,
    /// Solar input.
    pub solar_voltage_v: Channel,
    pub solar_current_a: Channel,
    /// Soil moisture around the pond (%).
    pub soil_moisture_pct: Channel,
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

/// The process-wide control context. Created once at startup with all
/// actuators stopped and the feeding session idle; lives for the process
/// lifetime; mutated exclusively inside the poll-loop call chain.
#[derive(Debug)]
pub struct SystemState {
    /// Logical motor states, indexed by [`ActuatorId`].
    pub actuators: [ActuatorState; ActuatorId::COUNT],
    /// Logical relay states, indexed by [`RelayId`]. Wiring polarity is an
    /// ActuatorDriver concern and never stored here.
    pub relays: [bool; RelayId::COUNT],
    /// The (single) feeding session.
    pub feeding: FeedingSession,
    /// Cached sensor readings.
    pub sensors: LatestReadings,
    /// Tunable parameters.
    pub config: FeederConfig,
}

impl SystemState {
    pub fn new(config: FeederConfig) -> Self {
        Self {
            actuators: [ActuatorState::default(); ActuatorId::COUNT],
            relays: [false; RelayId::COUNT],
            feeding: FeedingSession::new(),
            sensors: LatestReadings::default(),
            config,
        }
    }

    pub fn actuator(&self, id: ActuatorId) -> &ActuatorState {
        &self.actuators[id.index()]
    }

    pub fn relay(&self, id: RelayId) -> bool {
        self.relays[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeding::FeedStatus;

    #[test]
    fn fresh_state_is_quiescent() {
        let s = SystemState::new(FeederConfig::default());
        for id in ActuatorId::ALL {
            assert_eq!(s.actuator(id).direction, Direction::Stopped);
            assert_eq!(s.actuator(id).speed, 0);
        }
        assert!(!s.relay(RelayId::Led));
        assert!(!s.relay(RelayId::Fan));
        assert_eq!(s.feeding.status, FeedStatus::Idle);
    }

    #[test]
    fn actuator_id_raw_roundtrip() {
        for id in ActuatorId::ALL {
            assert_eq!(ActuatorId::try_from_raw(id as u8).unwrap(), id);
        }
        assert!(ActuatorId::try_from_raw(3).is_err());
        assert!(ActuatorId::try_from_raw(255).is_err());
    }

    #[test]
    fn channel_freshness_lifecycle() {
        let mut ch = Channel::default();
        assert_eq!(ch.current(0, 1000), Err(SensorError::NotReady));

        ch.record(1.25, 1_000);
        assert_eq!(ch.current(1_500, 1000), Ok(1.25));
        assert_eq!(ch.current(2_000, 1000), Ok(1.25));
        assert_eq!(ch.current(2_001, 1000), Err(SensorError::Stale));
        // Stale never erases the last known value.
        assert_eq!(ch.last(), Some(1.25));
    }
}
