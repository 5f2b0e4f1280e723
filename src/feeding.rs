//! Weight-monitored feeding sequencer.
//!
//! ```text
//!        FEED:<grams>                 target reached
//!  Idle ──────────────▶ Active ──────────────────────▶ Completed ─┐
//!   ▲                     │                                       │ next FEED
//!   │                     │ timeout / weight stale                │
//!   │                     ▼                                       │
//!   └───────────────── TimedOut ◀─────────────────────────────────┘
//! ```
//!
//! One bounded episode of auger operation aiming to dispense a target mass.
//! Termination is double-gated: the weight delta reaching the target, and a
//! hard duration backstop armed in the safety scheduler at start — the
//! session can never outlive `max_feed_duration_ms` even if every weight
//! reading stalls.
//!
//! Transitions are strictly forward; a terminal state is left only by the
//! next `start` (or `force_idle` from the emergency-stop path, which
//! bypasses the guards).

use log::{info, warn};

use crate::config::{FeederConfig, WeightDelta};
use crate::drivers::ActuatorDriver;
use crate::error::{ActuatorError, FeedError, SensorError};
use crate::scheduler::SafetyTimeoutScheduler;
use crate::state::{ActuatorId, ActuatorState, Direction, Millis};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Idle,
    Active,
    Completed,
    TimedOut,
}

/// Why a session left `Active`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedTransition {
    Completed {
        dispensed_grams: f32,
        elapsed_ms: u64,
    },
    TimedOut {
        dispensed_grams: f32,
        elapsed_ms: u64,
    },
}

/// The one feeding session. Lives inside `SystemState`; all sequencing
/// methods borrow the collaborating components for a single call only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedingSession {
    pub status: FeedStatus,
    pub target_grams: f32,
    pub start_weight_kg: f32,
    pub start_time: Millis,
    /// Timestamp of the most recent trusted weight reading seen by `tick`.
    last_weight_at: Millis,
    /// Dispensed mass at the last trusted reading (reported on timeout).
    last_dispensed_grams: f32,
}

impl FeedingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status == FeedStatus::Active
    }

    /// Begin a session: record the baseline, open the feed gate (when
    /// configured), start the auger forward, and arm the duration backstop.
    ///
    /// Rejected while a session is active — the second request is a no-op
    /// and does not reset the baseline. Rejected when the scale cannot be
    /// trusted (`weight` stale or missing).
    pub fn start(
        &mut self,
        config: &FeederConfig,
        weight_kg: Result<f32, SensorError>,
        now: Millis,
        driver: &ActuatorDriver,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
        scheduler: &mut SafetyTimeoutScheduler,
        target_grams: f32,
    ) -> Result<(), FeedError> {
        if self.is_active() {
            return Err(FeedError::AlreadyActive);
        }
        let start_weight_kg = weight_kg.map_err(|_| FeedError::StaleWeight)?;

        self.status = FeedStatus::Active;
        self.target_grams = target_grams;
        self.start_weight_kg = start_weight_kg;
        self.start_time = now;
        self.last_weight_at = now;
        self.last_dispensed_grams = 0.0;

        // Gate first so food can fall while the auger spins up. Both
        // movements are non-blocking: the gate travel is bounded by its own
        // armed timeout, never by a wait here.
        if config.gate_open_secs > 0.0 {
            driver.set_actuator(actuators, ActuatorId::Gate, Direction::Forward, config.gate_speed)?;
            scheduler.arm(ActuatorId::Gate, now, secs_to_ms(config.gate_open_secs));
        }

        driver.set_actuator(
            actuators,
            ActuatorId::Auger,
            Direction::Forward,
            config.auger_speed_forward,
        )?;
        // Hard backstop, independent of the weight-based stop below.
        scheduler.arm(ActuatorId::Auger, now, config.max_feed_duration_ms);

        info!(
            "feed: started target={:.0} g baseline={:.2} kg",
            target_grams, start_weight_kg
        );
        Ok(())
    }

    /// Advance an active session. No-op in any other state.
    ///
    /// Terminates with `Completed` once the dispensed mass reaches the
    /// target, with `TimedOut` once the duration ceiling passes or the scale
    /// has been silent longer than its staleness window — a persistently
    /// stale weight must stop the auger, never let it run blind.
    pub fn tick(
        &mut self,
        config: &FeederConfig,
        weight_kg: Result<f32, SensorError>,
        now: Millis,
        driver: &ActuatorDriver,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
        scheduler: &mut SafetyTimeoutScheduler,
    ) -> Result<Option<FeedTransition>, ActuatorError> {
        if !self.is_active() {
            return Ok(None);
        }
        let elapsed_ms = now.saturating_sub(self.start_time);

        if let Ok(w) = weight_kg {
            self.last_weight_at = now;
            self.last_dispensed_grams =
                dispensed_grams(config.weight_delta, self.start_weight_kg, w);

            if self.last_dispensed_grams >= self.target_grams {
                self.finish(FeedStatus::Completed, config, now, driver, actuators, scheduler)?;
                info!(
                    "feed: completed {:.1} g in {} ms",
                    self.last_dispensed_grams, elapsed_ms
                );
                return Ok(Some(FeedTransition::Completed {
                    dispensed_grams: self.last_dispensed_grams,
                    elapsed_ms,
                }));
            }
        } else if now.saturating_sub(self.last_weight_at) > u64::from(config.weight_stale_ms) {
            warn!("feed: weight stale for {} ms, aborting", now - self.last_weight_at);
            self.finish(FeedStatus::TimedOut, config, now, driver, actuators, scheduler)?;
            return Ok(Some(FeedTransition::TimedOut {
                dispensed_grams: self.last_dispensed_grams,
                elapsed_ms,
            }));
        }

        if elapsed_ms > u64::from(config.max_feed_duration_ms) {
            warn!(
                "feed: timed out at {} ms with {:.1} g dispensed",
                elapsed_ms, self.last_dispensed_grams
            );
            self.finish(FeedStatus::TimedOut, config, now, driver, actuators, scheduler)?;
            return Ok(Some(FeedTransition::TimedOut {
                dispensed_grams: self.last_dispensed_grams,
                elapsed_ms,
            }));
        }

        Ok(None)
    }

    /// Emergency-stop path: reset to `Idle` regardless of the current phase,
    /// bypassing the normal forward-only transition guards. Actuator stops
    /// are the caller's responsibility (the whole bank is being killed).
    pub fn force_idle(&mut self) {
        if self.status != FeedStatus::Idle {
            info!("feed: forced idle from {:?}", self.status);
        }
        self.status = FeedStatus::Idle;
    }

    /// Dispensed mass at the last trusted reading (progress reporting).
    pub fn dispensed_grams(&self) -> f32 {
        self.last_dispensed_grams
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Terminal transition. Stops the auger exactly once (the transition
    /// itself is the once-guard; the write is idempotent anyway), then
    /// issues the configured gate-close and blower-clear movements, each
    /// bounded by its own armed timeout.
    fn finish(
        &mut self,
        status: FeedStatus,
        config: &FeederConfig,
        now: Millis,
        driver: &ActuatorDriver,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
        scheduler: &mut SafetyTimeoutScheduler,
    ) -> Result<(), ActuatorError> {
        self.status = status;
        driver.set_actuator(actuators, ActuatorId::Auger, Direction::Stopped, 0)?;
        scheduler.disarm(ActuatorId::Auger);

        if config.gate_close_secs > 0.0 {
            driver.set_actuator(actuators, ActuatorId::Gate, Direction::Reverse, config.gate_speed)?;
            scheduler.arm(ActuatorId::Gate, now, secs_to_ms(config.gate_close_secs));
        }
        if config.blower_clear_secs > 0.0 {
            driver.set_actuator(
                actuators,
                ActuatorId::Blower,
                Direction::Forward,
                config.blower_speed,
            )?;
            scheduler.arm(ActuatorId::Blower, now, secs_to_ms(config.blower_clear_secs));
        }
        Ok(())
    }
}

/// Orient the weight delta per deployment (see [`WeightDelta`]).
pub fn dispensed_grams(mode: WeightDelta, start_kg: f32, current_kg: f32) -> f32 {
    let delta_kg = match mode {
        WeightDelta::ScaleIncreases => current_kg - start_kg,
        WeightDelta::ReservoirDecreases => start_kg - current_kg,
    };
    delta_kg * 1000.0
}

/// Seconds-as-float (command surface / config) to scheduler milliseconds.
pub fn secs_to_ms(secs: f32) -> u32 {
    if secs <= 0.0 {
        0
    } else {
        (secs * 1000.0) as u32
    }
}
