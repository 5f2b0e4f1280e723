//! Safety-timeout scheduler.
//!
//! One optional absolute deadline per actuator, held in a fixed-size table
//! and swept once per poll cycle — O(number of actuators), no allocation.
//! When a deadline elapses the actuator is force-stopped through the
//! [`ActuatorDriver`] and the slot is cleared in the same cycle, so a
//! consumed deadline can never fire twice.
//!
//! The scheduler knows nothing about sensors or commands; it is purely a
//! deadline table plus a force-stop trigger.

use log::info;

use crate::drivers::ActuatorDriver;
use crate::state::{ActuatorId, ActuatorState, Direction, Millis};

pub struct SafetyTimeoutScheduler {
    deadlines: [Option<Millis>; ActuatorId::COUNT],
}

impl SafetyTimeoutScheduler {
    pub fn new() -> Self {
        Self {
            deadlines: [None; ActuatorId::COUNT],
        }
    }

    /// Arm (or re-arm) the auto-stop deadline for an actuator already in
    /// motion. `duration_ms == 0` clears the slot instead — explicit
    /// "run until told otherwise" semantics for manual use. Repeated arms
    /// overwrite; deadlines never stack.
    pub fn arm(&mut self, id: ActuatorId, now: Millis, duration_ms: u32) {
        if duration_ms == 0 {
            self.deadlines[id.index()] = None;
            info!("{}: auto-stop disabled (manual run)", id.name());
        } else {
            self.deadlines[id.index()] = Some(now + Millis::from(duration_ms));
        }
    }

    /// Clear the deadline for an actuator (explicit stop commands call this
    /// so a later sweep has nothing left to do).
    pub fn disarm(&mut self, id: ActuatorId) {
        self.deadlines[id.index()] = None;
    }

    /// Clear every deadline (emergency stop).
    pub fn clear_all(&mut self) {
        self.deadlines = [None; ActuatorId::COUNT];
    }

    /// The pending deadline for an actuator, if any.
    pub fn deadline(&self, id: ActuatorId) -> Option<Millis> {
        self.deadlines[id.index()]
    }

    /// Sweep the table: force-stop every actuator whose deadline is due and
    /// clear its slot. Returns the actuators that were stopped this cycle.
    /// Calling again after a deadline was consumed performs no further
    /// action.
    pub fn tick(
        &mut self,
        now: Millis,
        driver: &ActuatorDriver,
        actuators: &mut [ActuatorState; ActuatorId::COUNT],
    ) -> heapless::Vec<ActuatorId, { ActuatorId::COUNT }> {
        let mut stopped = heapless::Vec::new();
        for id in ActuatorId::ALL {
            let Some(deadline) = self.deadlines[id.index()] else {
                continue;
            };
            if deadline > now {
                continue;
            }
            self.deadlines[id.index()] = None;
            if let Err(e) = driver.set_actuator(actuators, id, Direction::Stopped, 0) {
                log::error!("{}: auto-stop write failed: {}", id.name(), e);
            }
            info!("{}: auto-stopped at {} ms", id.name(), now);
            // Vec is sized to hold every actuator; push cannot fail.
            let _ = stopped.push(id);
        }
        stopped
    }
}

impl Default for SafetyTimeoutScheduler {
    fn default() -> Self {
        Self::new()
    }
}
