//! Mock hardware adapter for integration tests.
//!
//! `MockSensors` serves scripted readings through the same `SensorPort` the
//! real adapter implements; `MockCal` and `RecordingSink` record every call
//! so tests can assert on the full interaction history.

use fishfeeder::app::events::FeederEvent;
use fishfeeder::app::ports::{
    CalibrationPort, ClimateReading, EventSink, PowerReading, SensorPort,
};
use fishfeeder::error::SensorError;

// ── MockSensors ───────────────────────────────────────────────

pub struct MockSensors {
    pub weight_kg: Result<f32, SensorError>,
    pub box_temp_c: f32,
    pub feed_temp_c: f32,
}

impl MockSensors {
    pub fn new() -> Self {
        Self {
            weight_kg: Ok(1.0),
            box_temp_c: 25.0,
            feed_temp_c: 24.0,
        }
    }
}

impl Default for MockSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockSensors {
    fn read_feed_climate(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(ClimateReading {
            temperature_c: self.feed_temp_c,
            humidity_pct: 55.0,
        })
    }

    fn read_box_climate(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(ClimateReading {
            temperature_c: self.box_temp_c,
            humidity_pct: 45.0,
        })
    }

    fn read_power(&mut self) -> Result<PowerReading, SensorError> {
        Ok(PowerReading {
            load_voltage_v: 12.6,
            load_current_a: 0.4,
            solar_voltage_v: 18.2,
            solar_current_a: 0.9,
        })
    }

    fn read_soil_moisture(&mut self) -> Result<f32, SensorError> {
        Ok(60.0)
    }

    fn read_weight_kg(&mut self) -> Result<f32, SensorError> {
        self.weight_kg
    }
}

// ── MockCal ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CalCall {
    Tare,
    SetReference { kg: f32 },
}

#[derive(Default)]
pub struct MockCal {
    pub calls: Vec<CalCall>,
}

impl MockCal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalibrationPort for MockCal {
    fn tare(&mut self) -> Result<(), SensorError> {
        self.calls.push(CalCall::Tare);
        Ok(())
    }

    fn set_reference_kg(&mut self, kg: f32) -> Result<(), SensorError> {
        self.calls.push(CalCall::SetReference { kg });
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<FeederEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<F: Fn(&FeederEvent) -> bool>(&self, pred: F) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &FeederEvent) {
        self.events.push(event.clone());
    }
}
