//! Feeder service — dispatch and per-cycle orchestration.
//!
//! ```text
//!  serial line ──▶ handle_line ──▶ Command::parse ──▶ dispatch
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!  tick: feeding advance → timeout sweep → sensor phase → auto-fan → status
//! ```
//!
//! [`FeederService`] owns the [`SystemState`] and the kernel components and
//! is the single entry point mutating shared state each cycle. The per-cycle
//! ordering is a contract: input is dispatched **before** the feeding
//! sequence advances and before timeout expiry, so a just-arrived stop
//! command always takes effect before that same cycle's auto-stop logic.
//!
//! Dispatch never blocks and never recurses; a valid command performs its
//! one state mutation and returns. Malformed input is absorbed here —
//! logged at debug level, dropped, no state change.

use log::{debug, info, warn};

use crate::app::commands::{
    BlowerCommand, CalCommand, Command, ConfigParam, MotorCommand, RelayCommand,
};
use crate::app::events::{FeederEvent, StatusSnapshot};
use crate::app::ports::{CalibrationPort, ConfigPort, EventSink, SensorPort};
use crate::config::FeederConfig;
use crate::drivers::ActuatorDriver;
use crate::feeding::{secs_to_ms, FeedTransition, FeedingSession};
use crate::scheduler::SafetyTimeoutScheduler;
use crate::sensors::SensorSampler;
use crate::state::{ActuatorId, Direction, Millis, RelayId, SystemState};

/// Speed-test run: half throttle for a fixed three seconds, bounded by the
/// safety scheduler instead of a blocking wait.
const SPEED_TEST_PWM: u8 = 127;
const SPEED_TEST_SECS: f32 = 3.0;

/// Config changes flush to storage after this quiet period.
const CONFIG_SAVE_DEBOUNCE_MS: u64 = 5_000;

pub struct FeederService {
    state: SystemState,
    driver: ActuatorDriver,
    scheduler: SafetyTimeoutScheduler,
    sampler: SensorSampler,
    last_status_at: Millis,
    last_progress_at: Millis,
    last_fan_check_at: Millis,
    config_dirty: bool,
    dirty_at: Millis,
}

impl FeederService {
    pub fn new(config: FeederConfig) -> Self {
        let sampler = SensorSampler::new(config.sensor_read_interval_ms);
        Self {
            state: SystemState::new(config),
            driver: ActuatorDriver::new(),
            scheduler: SafetyTimeoutScheduler::new(),
            sampler,
            last_status_at: 0,
            last_progress_at: 0,
            last_fan_check_at: 0,
            config_dirty: false,
            dirty_at: 0,
        }
    }

    /// Announce startup. All actuators are already parked by construction.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&FeederEvent::Started);
        info!("feeder service started, all actuators stopped");
    }

    // ── Command input ─────────────────────────────────────────

    /// Consume one input line. A line may carry several `;`-separated
    /// commands; each is parsed and dispatched independently.
    pub fn handle_line(
        &mut self,
        line: &str,
        now: Millis,
        cal: &mut impl CalibrationPort,
        sink: &mut impl EventSink,
    ) {
        for token in line.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match Command::parse(token) {
                Ok(cmd) => self.dispatch(cmd, now, cal, sink),
                Err(e) => debug!("dropping {:?}: {}", token, e),
            }
        }
    }

    /// Execute one validated command. Exactly one state mutation per call.
    pub fn dispatch(
        &mut self,
        cmd: Command,
        now: Millis,
        cal: &mut impl CalibrationPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            Command::Relay(rc) => self.apply_relay(rc),
            Command::Auger(mc) => self.apply_motor(ActuatorId::Auger, mc, now),
            Command::Gate(mc) => self.apply_motor(ActuatorId::Gate, mc, now),
            Command::Blower(bc) => self.apply_blower(bc, now),
            Command::Feed { grams } => self.start_feed(grams, now, sink),
            Command::Calibrate(c) => self.apply_calibration(c, cal),
            Command::SetParam(param, value) => self.apply_param(param, value, now),
            Command::Status => {
                sink.emit(&FeederEvent::Status(StatusSnapshot::collect(
                    &self.state,
                    now,
                )));
            }
            Command::EmergencyStop => self.emergency_stop(sink),
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// One poll cycle. The caller drains and dispatches input first; this
    /// then advances the feeding sequence, sweeps the safety deadlines,
    /// advances the sampling phase, runs climate supervision, and emits the
    /// periodic reports.
    pub fn tick(&mut self, now: Millis, hw: &mut impl SensorPort, sink: &mut impl EventSink) {
        // 1. Feeding sequence.
        {
            let SystemState {
                feeding,
                actuators,
                sensors,
                config,
                ..
            } = &mut self.state;
            let weight = sensors.weight_kg.current(now, config.weight_stale_ms);
            match feeding.tick(config, weight, now, &self.driver, actuators, &mut self.scheduler)
            {
                Ok(Some(transition)) => {
                    let (outcome, dispensed_grams, elapsed_ms) = match transition {
                        FeedTransition::Completed {
                            dispensed_grams,
                            elapsed_ms,
                        } => (feeding.status, dispensed_grams, elapsed_ms),
                        FeedTransition::TimedOut {
                            dispensed_grams,
                            elapsed_ms,
                        } => (feeding.status, dispensed_grams, elapsed_ms),
                    };
                    sink.emit(&FeederEvent::FeedEnded {
                        outcome,
                        dispensed_grams,
                        elapsed_ms,
                    });
                }
                Ok(None) => {}
                Err(e) => log::error!("feeding actuator write failed: {}", e),
            }
        }

        // 2. Safety-timeout sweep.
        let stopped = self
            .scheduler
            .tick(now, &self.driver, &mut self.state.actuators);
        for id in stopped {
            sink.emit(&FeederEvent::AutoStopped(id));
        }

        // 3. Sensor sampling phase.
        self.sampler.tick(now, &mut self.state.sensors, hw);

        // 4. Climate supervision.
        self.check_auto_fan(now);

        // 5. Feed progress report.
        let progress_interval = u64::from(self.state.config.feed_progress_interval_ms);
        if self.state.feeding.is_active()
            && now.saturating_sub(self.last_progress_at) >= progress_interval
        {
            self.last_progress_at = now;
            sink.emit(&FeederEvent::FeedProgress {
                dispensed_grams: self.state.feeding.dispensed_grams(),
                target_grams: self.state.feeding.target_grams,
                elapsed_ms: now.saturating_sub(self.state.feeding.start_time),
            });
        }

        // 6. Status line.
        let status_interval = u64::from(self.state.config.status_interval_ms);
        if now.saturating_sub(self.last_status_at) >= status_interval {
            self.last_status_at = now;
            sink.emit(&FeederEvent::Status(StatusSnapshot::collect(
                &self.state,
                now,
            )));
        }
    }

    // ── Dispatch targets ──────────────────────────────────────

    fn apply_relay(&mut self, rc: RelayCommand) {
        let SystemState { relays, .. } = &mut self.state;
        match rc {
            RelayCommand::AllOff => {
                self.driver.set_relay(relays, RelayId::Fan, false);
                self.driver.set_relay(relays, RelayId::Led, false);
            }
            RelayCommand::FanOn => self.driver.set_relay(relays, RelayId::Fan, true),
            RelayCommand::FanOff => self.driver.set_relay(relays, RelayId::Fan, false),
            RelayCommand::LedOn => self.driver.set_relay(relays, RelayId::Led, true),
            RelayCommand::LedOff => self.driver.set_relay(relays, RelayId::Led, false),
            RelayCommand::AllOn => {
                self.driver.set_relay(relays, RelayId::Fan, true);
                self.driver.set_relay(relays, RelayId::Led, true);
            }
        }
    }

    fn apply_motor(&mut self, id: ActuatorId, mc: MotorCommand, now: Millis) {
        let SystemState {
            actuators, config, ..
        } = &mut self.state;

        let (direction, speed, default_secs) = match mc {
            MotorCommand::Stop => {
                if let Err(e) = self.driver.set_actuator(actuators, id, Direction::Stopped, 0) {
                    warn!("{}: stop failed: {}", id.name(), e);
                }
                self.scheduler.disarm(id);
                return;
            }
            MotorCommand::Forward { run_secs } => {
                let (speed, default) = match id {
                    ActuatorId::Auger => (config.auger_speed_forward, config.auger_run_secs),
                    ActuatorId::Gate => (config.gate_speed, config.gate_open_secs),
                    ActuatorId::Blower => (config.blower_speed, config.blower_run_secs),
                };
                (Direction::Forward, speed, run_secs.unwrap_or(default))
            }
            MotorCommand::Reverse { run_secs } => {
                let (speed, default) = match id {
                    ActuatorId::Auger => (config.auger_speed_reverse, config.auger_run_secs),
                    ActuatorId::Gate => (config.gate_speed, config.gate_close_secs),
                    ActuatorId::Blower => (config.blower_speed, config.blower_run_secs),
                };
                (Direction::Reverse, speed, run_secs.unwrap_or(default))
            }
            MotorCommand::SpeedTest => {
                (Direction::Forward, SPEED_TEST_PWM, SPEED_TEST_SECS)
            }
        };

        match self.driver.set_actuator(actuators, id, direction, speed) {
            Ok(()) => self.scheduler.arm(id, now, secs_to_ms(default_secs)),
            Err(e) => warn!("{}: command dropped: {}", id.name(), e),
        }
    }

    fn apply_blower(&mut self, bc: BlowerCommand, now: Millis) {
        match bc {
            BlowerCommand::Off => self.apply_motor(ActuatorId::Blower, MotorCommand::Stop, now),
            BlowerCommand::On { pwm } => {
                let SystemState {
                    actuators, config, ..
                } = &mut self.state;
                let duty = pwm.unwrap_or(config.blower_speed);
                match self
                    .driver
                    .set_actuator(actuators, ActuatorId::Blower, Direction::Forward, duty)
                {
                    Ok(()) => self.scheduler.arm(
                        ActuatorId::Blower,
                        now,
                        secs_to_ms(config.blower_run_secs),
                    ),
                    Err(e) => warn!("blower: command dropped: {}", e),
                }
            }
        }
    }

    fn start_feed(&mut self, grams: f32, now: Millis, sink: &mut impl EventSink) {
        if grams > self.state.config.max_single_feed_grams {
            warn!(
                "feed: {:.0} g exceeds single-feed ceiling of {:.0} g, dropped",
                grams, self.state.config.max_single_feed_grams
            );
            return;
        }

        let SystemState {
            feeding,
            actuators,
            sensors,
            config,
            ..
        } = &mut self.state;
        let weight = sensors.weight_kg.current(now, config.weight_stale_ms);

        match feeding.start(
            config,
            weight,
            now,
            &self.driver,
            actuators,
            &mut self.scheduler,
            grams,
        ) {
            Ok(()) => {
                self.last_progress_at = now;
                sink.emit(&FeederEvent::FeedStarted {
                    target_grams: grams,
                    start_weight_kg: feeding.start_weight_kg,
                });
            }
            Err(e) => warn!("feed rejected: {}", e),
        }
    }

    fn apply_calibration(&mut self, c: CalCommand, cal: &mut impl CalibrationPort) {
        let result = match c {
            CalCommand::Tare => cal.tare(),
            CalCommand::SetReference { kg } => cal.set_reference_kg(kg),
        };
        match result {
            Ok(()) => info!("calibration applied: {:?}", c),
            Err(e) => warn!("calibration failed: {}", e),
        }
    }

    fn apply_param(&mut self, param: ConfigParam, value: f32, now: Millis) {
        let config = &mut self.state.config;
        let accepted = match param {
            ConfigParam::AugerSpeed if (1.0..=255.0).contains(&value) => {
                config.auger_speed_forward = value as u8;
                true
            }
            ConfigParam::BlowerSpeed if (1.0..=255.0).contains(&value) => {
                config.blower_speed = value as u8;
                true
            }
            ConfigParam::GateSpeed if (1.0..=255.0).contains(&value) => {
                config.gate_speed = value as u8;
                true
            }
            ConfigParam::AugerRunSecs if (0.0..=120.0).contains(&value) => {
                config.auger_run_secs = value;
                true
            }
            ConfigParam::FanOnTempC if value > 0.0 && value < 100.0 => {
                config.fan_on_temp_c = value;
                true
            }
            _ => false,
        };

        if accepted {
            info!("config: {:?} = {}", param, value);
            self.mark_config_dirty(now);
        } else {
            warn!("config: {:?} = {} out of range, dropped", param, value);
        }
    }

    /// Emergency stop: every motor off, every deadline cleared, feeding
    /// forced idle regardless of phase. Relays are left alone — killing
    /// motion must not kill the pond light.
    fn emergency_stop(&mut self, sink: &mut impl EventSink) {
        warn!("EMERGENCY STOP — all motors off");
        if let Err(e) = self.driver.stop_all(&mut self.state.actuators) {
            log::error!("emergency stop write failed: {}", e);
        }
        self.scheduler.clear_all();
        self.state.feeding.force_idle();
        sink.emit(&FeederEvent::EmergencyStop);
    }

    // ── Climate supervision ───────────────────────────────────

    /// Auto-fan: on above the threshold, off below threshold − hysteresis.
    /// Skipped entirely while the box-climate reading is stale.
    fn check_auto_fan(&mut self, now: Millis) {
        let SystemState {
            relays,
            sensors,
            config,
            ..
        } = &mut self.state;
        if !config.auto_fan_enabled {
            return;
        }
        if now.saturating_sub(self.last_fan_check_at) < u64::from(config.fan_check_interval_ms) {
            return;
        }
        self.last_fan_check_at = now;

        let Ok(temp) = sensors.box_temp_c.current(now, config.climate_stale_ms) else {
            return;
        };

        let fan_on = relays[RelayId::Fan.index()];
        if !fan_on && temp > config.fan_on_temp_c {
            info!("auto-fan: box at {:.1} °C, fan on", temp);
            self.driver.set_relay(relays, RelayId::Fan, true);
        } else if fan_on && temp < config.fan_on_temp_c - config.fan_hysteresis_c {
            info!("auto-fan: box at {:.1} °C, fan off", temp);
            self.driver.set_relay(relays, RelayId::Fan, false);
        }
    }

    // ── Config persistence ────────────────────────────────────

    /// Mark the live config as modified; the debounce starts now.
    pub fn mark_config_dirty(&mut self, now: Millis) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_at = now;
        }
    }

    /// Flush the config once it has been dirty for the debounce period.
    /// Returns `true` if it was saved.
    pub fn auto_save_if_needed(&mut self, now: Millis, storage: &mut impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if now.saturating_sub(self.dirty_at) < CONFIG_SAVE_DEBOUNCE_MS {
            return false;
        }
        match storage.save(&self.state.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("config auto-saved");
                true
            }
            Err(e) => {
                warn!("config auto-save failed: {}", e);
                false
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Queries (tests, status, bridge) ───────────────────────

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn feeding(&self) -> &FeedingSession {
        &self.state.feeding
    }

    pub fn config(&self) -> &FeederConfig {
        &self.state.config
    }

    /// Pending auto-stop deadline for an actuator, if armed.
    pub fn deadline(&self, id: ActuatorId) -> Option<Millis> {
        self.scheduler.deadline(id)
    }
}
