//! End-to-end feeding-sequence scenarios through the full service:
//! command line in → dispatch → sampler → sequencer → events out.

use crate::mock_hw::{MockCal, MockSensors, RecordingSink};
use fishfeeder::app::events::FeederEvent;
use fishfeeder::app::service::FeederService;
use fishfeeder::config::FeederConfig;
use fishfeeder::error::SensorError;
use fishfeeder::feeding::FeedStatus;
use fishfeeder::state::{ActuatorId, Direction};

/// Test harness stepping the poll loop at a fixed cadence.
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

    /// Step the loop until `deadline` (inclusive).
    fn run_until(&mut self, deadline: u64) {
        while self.now <= deadline {
            self.service
                .tick(self.now, &mut self.sensors, &mut self.sink);
            self.now += STEP_MS;
        }
    }

    /// Warm the sampler up so the weight channel holds a fresh reading.
    fn warm_up(&mut self) {
        self.run_until(2_000);
    }

    fn send(&mut self, line: &str) {
        self.service
            .handle_line(line, self.now, &mut self.cal, &mut self.sink);
    }

    fn auger_running(&self) -> bool {
        self.service
            .state()
            .actuator(ActuatorId::Auger)
            .is_running()
    }
}

// ── Scenario A: target reached before the ceiling ─────────────

#[test]
fn feed_completes_when_target_weight_reached() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    assert_eq!(rig.service.feeding().status, FeedStatus::Active);
    assert!(rig.auger_running());
    let started_at = rig.service.feeding().start_time;

    // The scale gains 60 g shortly after the feed starts.
    rig.sensors.weight_kg = Ok(1.06);
    rig.run_until(started_at + 5_000);

    assert_eq!(rig.service.feeding().status, FeedStatus::Completed);
    assert!(!rig.auger_running(), "auger must stop on completion");

    let ended = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            FeederEvent::FeedEnded {
                outcome,
                dispensed_grams,
                elapsed_ms,
            } => Some((*outcome, *dispensed_grams, *elapsed_ms)),
            _ => None,
        })
        .expect("FeedEnded must be emitted");
    assert_eq!(ended.0, FeedStatus::Completed);
    assert!(ended.1 >= 50.0, "dispensed {} g", ended.1);
    assert!(ended.2 < 30_000, "finished well before the ceiling");
}

// ── Scenario B: weight never moves ────────────────────────────

#[test]
fn feed_times_out_when_weight_never_moves() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    assert_eq!(rig.service.feeding().status, FeedStatus::Active);
    let started_at = rig.service.feeding().start_time;

    // Fresh readings keep arriving, but the value never changes.
    rig.run_until(started_at + 35_000);

    assert_eq!(rig.service.feeding().status, FeedStatus::TimedOut);
    assert!(!rig.auger_running(), "auger must stop on timeout");

    let ended = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            FeederEvent::FeedEnded {
                outcome,
                elapsed_ms,
                ..
            } => Some((*outcome, *elapsed_ms)),
            _ => None,
        })
        .expect("FeedEnded must be emitted");
    assert_eq!(ended.0, FeedStatus::TimedOut);
    let ceiling = u64::from(rig.service.config().max_feed_duration_ms);
    assert!(ended.1 > ceiling && ended.1 <= ceiling + 2 * STEP_MS);
}

// ── P1: mutual exclusion ──────────────────────────────────────

#[test]
fn second_feed_while_active_is_a_noop() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    let first_start = rig.service.feeding().start_time;
    let first_baseline = rig.service.feeding().start_weight_kg;

    rig.run_until(rig.now + 1_000);
    rig.sensors.weight_kg = Ok(1.2);
    rig.send("FEED:100");

    // Session fields untouched, no second FeedStarted.
    assert_eq!(rig.service.feeding().start_time, first_start);
    assert!((rig.service.feeding().start_weight_kg - first_baseline).abs() < f32::EPSILON);
    assert!((rig.service.feeding().target_grams - 50.0).abs() < f32::EPSILON);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, FeederEvent::FeedStarted { .. })),
        1
    );
}

// ── Stale weight handling ─────────────────────────────────────

#[test]
fn feed_refused_when_weight_is_stale() {
    let mut rig = Rig::new();
    // No warm-up: the weight channel has never been read.
    rig.send("FEED:50");
    assert_eq!(rig.service.feeding().status, FeedStatus::Idle);
    assert!(!rig.auger_running());
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, FeederEvent::FeedStarted { .. })),
        0
    );
}

#[test]
fn feed_aborts_when_scale_goes_dark_mid_session() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    assert_eq!(rig.service.feeding().status, FeedStatus::Active);
    let started_at = rig.service.feeding().start_time;

    // The scale stops answering right after the session starts.
    rig.sensors.weight_kg = Err(SensorError::ReadFailed);
    let stale_window = u64::from(rig.service.config().weight_stale_ms);
    rig.run_until(started_at + 2 * stale_window + 2_000);

    assert_eq!(
        rig.service.feeding().status,
        FeedStatus::TimedOut,
        "a blind session must not keep dispensing"
    );
    assert!(!rig.auger_running());

    // And it terminated well before the 30 s ceiling.
    let ended_at = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            FeederEvent::FeedEnded { elapsed_ms, .. } => Some(*elapsed_ms),
            _ => None,
        })
        .unwrap();
    assert!(ended_at < u64::from(rig.service.config().max_feed_duration_ms));
}

// ── Gate and blower choreography ──────────────────────────────

#[test]
fn feed_completion_closes_gate_and_fires_blower() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    assert_eq!(
        rig.service.state().actuator(ActuatorId::Gate).direction,
        Direction::Forward,
        "gate opens at session start"
    );

    rig.sensors.weight_kg = Ok(1.1);
    let started_at = rig.service.feeding().start_time;
    rig.run_until(started_at + 4_000);
    assert_eq!(rig.service.feeding().status, FeedStatus::Completed);

    // Clearing movements run with their own timeouts armed.
    assert_eq!(
        rig.service.state().actuator(ActuatorId::Blower).direction,
        Direction::Forward
    );
    assert!(rig.service.deadline(ActuatorId::Blower).is_some());

    // Eventually everything auto-stops.
    let quiesce_by = rig.now + 10_000;
    rig.run_until(quiesce_by);
    for id in ActuatorId::ALL {
        assert!(
            !rig.service.state().actuator(id).is_running(),
            "{} still running after clearing window",
            id.name()
        );
    }
}

// ── Terminal → next session ───────────────────────────────────

#[test]
fn next_feed_reinitializes_after_terminal_state() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:50");
    rig.sensors.weight_kg = Ok(1.1);
    let started_at = rig.service.feeding().start_time;
    rig.run_until(started_at + 4_000);
    assert_eq!(rig.service.feeding().status, FeedStatus::Completed);

    // Let the new baseline land in the weight channel, then feed again.
    rig.run_until(rig.now + 3_000);
    rig.send("FEED:20");
    assert_eq!(rig.service.feeding().status, FeedStatus::Active);
    assert!((rig.service.feeding().start_weight_kg - 1.1).abs() < 0.01);
}

// ── Emergency stop ────────────────────────────────────────────

#[test]
fn emergency_stop_kills_motors_and_resets_session() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:500");
    assert_eq!(rig.service.feeding().status, FeedStatus::Active);
    assert!(rig.auger_running());

    rig.send("STOP");
    assert_eq!(rig.service.feeding().status, FeedStatus::Idle);
    for id in ActuatorId::ALL {
        assert!(!rig.service.state().actuator(id).is_running());
        assert_eq!(rig.service.deadline(id), None);
    }
    assert_eq!(rig.sink.count(|e| matches!(e, FeederEvent::EmergencyStop)), 1);

    // The sweep afterwards has nothing to stop.
    let before = rig
        .sink
        .count(|e| matches!(e, FeederEvent::AutoStopped(_)));
    rig.run_until(rig.now + 35_000);
    assert_eq!(
        rig.sink.count(|e| matches!(e, FeederEvent::AutoStopped(_))),
        before
    );
}

// ── Progress reporting ────────────────────────────────────────

#[test]
fn progress_events_flow_while_feeding() {
    let mut rig = Rig::new();
    rig.warm_up();

    rig.send("FEED:500");
    let started_at = rig.service.feeding().start_time;
    rig.run_until(started_at + 7_000);

    let progress = rig
        .sink
        .count(|e| matches!(e, FeederEvent::FeedProgress { .. }));
    // 2 s cadence over 7 s: at least three reports.
    assert!(progress >= 3, "only {} progress events", progress);
}
