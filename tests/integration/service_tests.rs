//! Command-dispatch and supervision tests through the full service.

use crate::mock_hw::{CalCall, MockCal, MockSensors, RecordingSink};
use fishfeeder::adapters::config_store::InMemoryConfigStore;
use fishfeeder::app::events::FeederEvent;
use fishfeeder::app::ports::ConfigPort;
use fishfeeder::app::service::FeederService;
use fishfeeder::config::FeederConfig;
use fishfeeder::state::{ActuatorId, Direction, RelayId};

struct Rig {
    service: FeederService,
    sensors: MockSensors,
    cal: MockCal,
    sink: RecordingSink,
    now: u64,
}

const STEP_MS: u64 = 100;

impl Rig {
    fn new() -> Self {
        let mut service = FeederService::new(FeederConfig::default());
        let mut sink = RecordingSink::new();
        service.start(&mut sink);
        Self {
            service,
            sensors: MockSensors::new(),
            cal: MockCal::new(),
            sink,
            now: 0,
        }
    }

    fn run_until(&mut self, deadline: u64) {
        while self.now <= deadline {
            self.service
                .tick(self.now, &mut self.sensors, &mut self.sink);
            self.now += STEP_MS;
        }
    }

    fn send(&mut self, line: &str) {
        self.service
            .handle_line(line, self.now, &mut self.cal, &mut self.sink);
    }
}

// ── Relays ────────────────────────────────────────────────────

#[test]
fn relay_codes_drive_logical_state() {
    let mut rig = Rig::new();

    rig.send("R:3");
    assert!(rig.service.state().relay(RelayId::Led));
    rig.send("R:1");
    assert!(rig.service.state().relay(RelayId::Fan));
    rig.send("R:4");
    assert!(!rig.service.state().relay(RelayId::Led));
    rig.send("R:5");
    assert!(rig.service.state().relay(RelayId::Led));
    assert!(rig.service.state().relay(RelayId::Fan));
    rig.send("R:0");
    assert!(!rig.service.state().relay(RelayId::Led));
    assert!(!rig.service.state().relay(RelayId::Fan));
}

// ── Motors ────────────────────────────────────────────────────

#[test]
fn auger_forward_arms_default_duration() {
    let mut rig = Rig::new();
    rig.send("G:1");
    let auger = rig.service.state().actuator(ActuatorId::Auger);
    assert_eq!(auger.direction, Direction::Forward);
    assert_eq!(auger.speed, rig.service.config().auger_speed_forward);
    assert_eq!(
        rig.service.deadline(ActuatorId::Auger),
        Some(u64::from(fishfeeder::feeding::secs_to_ms(
            rig.service.config().auger_run_secs
        )))
    );
}

#[test]
fn auger_zero_duration_runs_until_told() {
    let mut rig = Rig::new();
    rig.send("G:1:0");
    assert!(rig
        .service
        .state()
        .actuator(ActuatorId::Auger)
        .is_running());
    assert_eq!(rig.service.deadline(ActuatorId::Auger), None);

    // Still running long past any default.
    rig.run_until(120_000);
    assert!(rig
        .service
        .state()
        .actuator(ActuatorId::Auger)
        .is_running());

    rig.send("G:0");
    assert!(!rig
        .service
        .state()
        .actuator(ActuatorId::Auger)
        .is_running());
}

#[test]
fn blower_runs_at_requested_pwm() {
    let mut rig = Rig::new();
    rig.send("B:1:128");
    let blower = rig.service.state().actuator(ActuatorId::Blower);
    assert_eq!(blower.direction, Direction::Forward);
    assert_eq!(blower.speed, 128);
    assert!(rig.service.deadline(ActuatorId::Blower).is_some());

    rig.send("B:0");
    assert!(!rig
        .service
        .state()
        .actuator(ActuatorId::Blower)
        .is_running());
}

#[test]
fn sub_floor_blower_request_is_raised() {
    let mut rig = Rig::new();
    rig.send("B:1:5");
    let blower = rig.service.state().actuator(ActuatorId::Blower);
    assert_eq!(blower.speed, fishfeeder::drivers::motor::BLOWER_MIN_PWM);
}

#[test]
fn speed_test_is_bounded_by_timeout() {
    let mut rig = Rig::new();
    rig.send("G:3");
    assert!(rig
        .service
        .state()
        .actuator(ActuatorId::Auger)
        .is_running());
    assert_eq!(rig.service.deadline(ActuatorId::Auger), Some(3_000));

    rig.run_until(4_000);
    assert!(!rig
        .service
        .state()
        .actuator(ActuatorId::Auger)
        .is_running());
}

// ── Scenario C: explicit stop beats the pending timeout ───────

#[test]
fn explicit_stop_clears_armed_deadline() {
    let mut rig = Rig::new();

    rig.send("A:1:3");
    assert!(rig.service.state().actuator(ActuatorId::Gate).is_running());
    assert_eq!(rig.service.deadline(ActuatorId::Gate), Some(3_000));

    rig.run_until(1_000);
    rig.send("A:0");
    assert!(!rig.service.state().actuator(ActuatorId::Gate).is_running());
    assert_eq!(rig.service.deadline(ActuatorId::Gate), None);

    // The sweep at t=3000 has nothing to do — no AutoStopped event ever.
    rig.run_until(5_000);
    assert_eq!(
        rig.sink.count(|e| matches!(e, FeederEvent::AutoStopped(_))),
        0
    );
}

#[test]
fn armed_timeout_fires_without_explicit_stop() {
    let mut rig = Rig::new();
    rig.send("A:1:3");
    rig.run_until(5_000);
    assert!(!rig.service.state().actuator(ActuatorId::Gate).is_running());
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            FeederEvent::AutoStopped(ActuatorId::Gate)
        )),
        1
    );
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_command_emits_immediately() {
    let mut rig = Rig::new();
    rig.send("STATUS");
    assert_eq!(rig.sink.count(|e| matches!(e, FeederEvent::Status(_))), 1);
}

#[test]
fn status_line_emitted_periodically() {
    let mut rig = Rig::new();
    rig.run_until(5_000);
    let count = rig.sink.count(|e| matches!(e, FeederEvent::Status(_)));
    // 1 s cadence over 5 s (first at t=0).
    assert!((5..=7).contains(&count), "{} status events", count);
}

#[test]
fn status_snapshot_reflects_actuators_and_sensors() {
    let mut rig = Rig::new();
    rig.sensors.weight_kg = Ok(2.5);
    rig.send("R:3;G:1");
    rig.run_until(2_000);

    let snap = rig
        .sink
        .events
        .iter()
        .rev()
        .find_map(|e| match e {
            FeederEvent::Status(s) => Some(*s),
            _ => None,
        })
        .expect("periodic status must exist");
    assert!(snap.led_on);
    assert_eq!(snap.auger_code, 1);
    assert!((snap.weight_kg - 2.5).abs() < 0.01);
    assert_eq!(snap.status_word(), "Auger_Active");
}

// ── Calibration pass-through ──────────────────────────────────

#[test]
fn calibration_commands_reach_the_port() {
    let mut rig = Rig::new();
    rig.send("CAL:tare");
    rig.send("CAL:weight:1.5");
    assert_eq!(
        rig.cal.calls,
        vec![CalCall::Tare, CalCall::SetReference { kg: 1.5 }]
    );
}

// ── Runtime configuration ─────────────────────────────────────

#[test]
fn cfg_updates_and_auto_saves_after_debounce() {
    let mut rig = Rig::new();
    let mut store = InMemoryConfigStore::new();

    rig.send("CFG:AUGER_SPEED:150");
    assert_eq!(rig.service.config().auger_speed_forward, 150);
    assert!(rig.service.is_config_dirty());

    // Inside the debounce window: no save.
    assert!(!rig.service.auto_save_if_needed(rig.now + 1_000, &mut store));
    // After it: saved and clean.
    assert!(rig.service.auto_save_if_needed(rig.now + 6_000, &mut store));
    assert!(!rig.service.is_config_dirty());
    assert_eq!(store.load().unwrap().auger_speed_forward, 150);
}

#[test]
fn out_of_range_cfg_is_dropped() {
    let mut rig = Rig::new();
    let before = rig.service.config().auger_speed_forward;
    rig.send("CFG:AUGER_SPEED:9000");
    assert_eq!(rig.service.config().auger_speed_forward, before);
    assert!(!rig.service.is_config_dirty());
}

// ── Input robustness ──────────────────────────────────────────

#[test]
fn malformed_input_changes_nothing() {
    let mut rig = Rig::new();
    for junk in ["", "GARBAGE", "R:9", "G:x", "FEED:-10", "B:1:999", "::::"] {
        rig.send(junk);
    }
    for id in ActuatorId::ALL {
        assert!(!rig.service.state().actuator(id).is_running());
    }
    assert!(!rig.service.state().relay(RelayId::Led));
    assert!(!rig.service.state().relay(RelayId::Fan));
    assert!(rig
        .sink
        .events
        .iter()
        .all(|e| matches!(e, FeederEvent::Started)));
}

#[test]
fn semicolon_separated_commands_dispatch_independently() {
    let mut rig = Rig::new();
    rig.send("R:3; G:1 ;BOGUS;B:1:200");
    assert!(rig.service.state().relay(RelayId::Led));
    assert!(rig.service.state().actuator(ActuatorId::Auger).is_running());
    assert_eq!(rig.service.state().actuator(ActuatorId::Blower).speed, 200);
}

// ── Climate supervision ───────────────────────────────────────

#[test]
fn auto_fan_follows_box_temperature_with_hysteresis() {
    let mut rig = Rig::new();
    rig.sensors.box_temp_c = 35.0;
    rig.run_until(6_000);
    assert!(
        rig.service.state().relay(RelayId::Fan),
        "fan must engage above threshold"
    );

    // Just below the on-threshold but inside the hysteresis band: stays on.
    rig.sensors.box_temp_c = 29.0;
    rig.run_until(rig.now + 12_000);
    assert!(rig.service.state().relay(RelayId::Fan));

    // Below threshold − hysteresis: switches off.
    rig.sensors.box_temp_c = 25.0;
    rig.run_until(rig.now + 12_000);
    assert!(!rig.service.state().relay(RelayId::Fan));
}
