//! Outbound application events.
//!
//! The kernel emits these through the [`EventSink`](super::ports::EventSink)
//! port. Adapters on the other side decide what to do with them — render the
//! status line for the Pi bridge, log to serial, record in a test.

use core::fmt;

use crate::feeding::FeedStatus;
use crate::state::{ActuatorId, Direction, Millis, RelayId, SystemState};

/// Structured events emitted by the control kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum FeederEvent {
    /// The service has started.
    Started,

    /// A feeding session began.
    FeedStarted {
        target_grams: f32,
        start_weight_kg: f32,
    },

    /// Periodic progress while a session is active.
    FeedProgress {
        dispensed_grams: f32,
        target_grams: f32,
        elapsed_ms: u64,
    },

    /// A feeding session left `Active`.
    FeedEnded {
        outcome: FeedStatus,
        dispensed_grams: f32,
        elapsed_ms: u64,
    },

    /// A safety timeout force-stopped an actuator.
    AutoStopped(ActuatorId),

    /// The emergency stop ran: every motor off, feeding forced idle.
    EmergencyStop,

    /// Periodic (or `STATUS`-requested) snapshot.
    Status(StatusSnapshot),
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot suitable for the host bridge's flat status line.
///
/// Field meanings and the rendered order are an external contract with the
/// Pi server — extend at the end, never reorder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub feed_temp_c: f32,
    pub feed_humidity_pct: f32,
    pub box_temp_c: f32,
    pub box_humidity_pct: f32,
    pub weight_kg: f32,
    pub load_voltage_v: f32,
    pub load_current_a: f32,
    pub solar_voltage_v: f32,
    pub solar_current_a: f32,
    pub soil_moisture_pct: f32,
    pub led_on: bool,
    pub fan_on: bool,
    pub blower_on: bool,
    /// 0 = stopped, 1 = extending, 2 = retracting.
    pub gate_code: u8,
    /// 0 = stopped, 1 = forward, 2 = reverse.
    pub auger_code: u8,
    pub feeding: bool,
    pub uptime_secs: u64,
}

impl StatusSnapshot {
    /// Collect the snapshot from the live state. Sensor fields fall back to
    /// the last known value; a channel that has never read reports 0.
    pub fn collect(state: &SystemState, now: Millis) -> Self {
        let s = &state.sensors;
        let last = |ch: &crate::state::Channel| ch.last().unwrap_or(0.0);
        Self {
            feed_temp_c: last(&s.feed_temp_c),
            feed_humidity_pct: last(&s.feed_humidity_pct),
            box_temp_c: last(&s.box_temp_c),
            box_humidity_pct: last(&s.box_humidity_pct),
            weight_kg: last(&s.weight_kg),
            load_voltage_v: last(&s.load_voltage_v),
            load_current_a: last(&s.load_current_a),
            solar_voltage_v: last(&s.solar_voltage_v),
            solar_current_a: last(&s.solar_current_a),
            soil_moisture_pct: last(&s.soil_moisture_pct),
            led_on: state.relay(RelayId::Led),
            fan_on: state.relay(RelayId::Fan),
            blower_on: state.actuator(ActuatorId::Blower).is_running(),
            gate_code: direction_code(state.actuator(ActuatorId::Gate).direction),
            auger_code: direction_code(state.actuator(ActuatorId::Auger).direction),
            feeding: state.feeding.is_active(),
            uptime_secs: now / 1000,
        }
    }

    /// The summary word at the end of the status line.
    pub fn status_word(&self) -> &'static str {
        if self.feeding {
            "Feeding"
        } else if self.auger_code != 0 {
            "Auger_Active"
        } else if self.gate_code != 0 {
            "Actuator_Active"
        } else if self.blower_on {
            "Blower_Active"
        } else {
            "Idle"
        }
    }
}

fn direction_code(dir: Direction) -> u8 {
    match dir {
        Direction::Stopped => 0,
        Direction::Forward => 1,
        Direction::Reverse => 2,
    }
}

/// Render the flat `key:value` comma-joined line consumed by the Pi bridge.
/// Byte-for-byte format is an external contract; keep precision per field.
impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TEMP1:{:.1},HUM1:{:.0},TEMP2:{:.1},HUM2:{:.0},WEIGHT:{:.2},\
             BATV:{:.2},BATI:{:.3},SOLV:{:.2},SOLI:{:.3},SOIL:{:.0},\
             LED:{},FAN:{},BLOWER:{},ACTUATOR:{},AUGER:{},FEEDING:{},\
             TIME:{},STATUS:{}",
            self.feed_temp_c,
            self.feed_humidity_pct,
            self.box_temp_c,
            self.box_humidity_pct,
            self.weight_kg,
            self.load_voltage_v,
            self.load_current_a,
            self.solar_voltage_v,
            self.solar_current_a,
            self.soil_moisture_pct,
            u8::from(self.led_on),
            u8::from(self.fan_on),
            u8::from(self.blower_on),
            self.gate_code,
            self.auger_code,
            u8::from(self.feeding),
            self.uptime_secs,
            self.status_word(),
        )
    }
}
