//! Phase-based sensor sampling.
//!
//! Reading every sensor in one cycle would stall the poll loop (the DHT22
//! alone costs milliseconds on the target), so the sampler advances one
//! *phase* per interval and reads only that phase's sensors:
//!
//! ```text
//! phase 0: climate (both DHT22s)
//! phase 1: power rails (ADC burst)
//! phase 2: soil moisture
//! phase 3: weight (HX711 — slowest, gets its own phase)
//! ```
//!
//! Results land in [`LatestReadings`] with a timestamp; consumers decide
//! freshness through `Channel::current`. A failed read keeps the previous
//! good value — a single flaky sensor must not crash the control loop, it
//! just ages into staleness.

use log::debug;

use crate::app::ports::SensorPort;
use crate::state::{LatestReadings, Millis};

/// Number of sampling phases in one full rotation.
pub const PHASE_COUNT: u8 = 4;

pub struct SensorSampler {
    phase: u8,
    last_advance: Millis,
    interval_ms: u32,
    /// First tick reads immediately instead of waiting a full interval.
    primed: bool,
}

impl SensorSampler {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            phase: 0,
            last_advance: 0,
            interval_ms,
            primed: false,
        }
    }

    /// Advance one phase if the interval elapsed. Never blocks beyond the
    /// single phase read the port performs.
    pub fn tick(
        &mut self,
        now: Millis,
        readings: &mut LatestReadings,
        port: &mut impl SensorPort,
    ) {
        if self.primed && now.saturating_sub(self.last_advance) < u64::from(self.interval_ms) {
            return;
        }
        self.primed = true;
        self.last_advance = now;

        match self.phase {
            0 => {
                if let Ok(c) = port.read_feed_climate() {
                    readings.feed_temp_c.record(c.temperature_c, now);
                    readings.feed_humidity_pct.record(c.humidity_pct, now);
                }
                if let Ok(c) = port.read_box_climate() {
                    readings.box_temp_c.record(c.temperature_c, now);
                    readings.box_humidity_pct.record(c.humidity_pct, now);
                }
            }
            1 => {
                if let Ok(p) = port.read_power() {
                    readings.load_voltage_v.record(p.load_voltage_v, now);
                    readings.load_current_a.record(p.load_current_a, now);
                    readings.solar_voltage_v.record(p.solar_voltage_v, now);
                    readings.solar_current_a.record(p.solar_current_a, now);
                }
            }
            2 => {
                if let Ok(pct) = port.read_soil_moisture() {
                    readings.soil_moisture_pct.record(pct, now);
                }
            }
            _ => {
                match port.read_weight_kg() {
                    Ok(kg) => readings.weight_kg.record(kg, now),
                    Err(e) => debug!("weight read failed: {}", e),
                }
            }
        }

        self.phase = (self.phase + 1) % PHASE_COUNT;
    }

    /// The phase the next tick will read.
    pub fn phase(&self) -> u8 {
        self.phase
    }
}
