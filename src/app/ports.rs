//! Port traits — the boundary between the control kernel and the outside
//! world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeederService (kernel)
//! ```
//!
//! Driven adapters (sensor acquisition, calibration, event sinks, config
//! storage) implement these traits. The kernel consumes them via generics,
//! so it never touches hardware directly and every port call must be
//! non-blocking: acquisition that can stall on the target belongs behind a
//! cached adapter, not inside the poll loop.

use crate::config::FeederConfig;
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → kernel)
// ───────────────────────────────────────────────────────────────

/// One temperature/humidity pair from a DHT22.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Battery and solar rail measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    pub load_voltage_v: f32,
    pub load_current_a: f32,
    pub solar_voltage_v: f32,
    pub solar_current_a: f32,
}

/// Read-side port: the sampler calls exactly one of these per phase.
///
/// Every method must return promptly — an `Err` is always preferable to a
/// wait. The kernel retains the previous good value on failure.
pub trait SensorPort {
    /// DHT22 in the feed hopper.
    fn read_feed_climate(&mut self) -> Result<ClimateReading, SensorError>;

    /// DHT22 in the control box.
    fn read_box_climate(&mut self) -> Result<ClimateReading, SensorError>;

    /// Battery / solar rails (ADC burst).
    fn read_power(&mut self) -> Result<PowerReading, SensorError>;

    /// Soil-moisture probe (%).
    fn read_soil_moisture(&mut self) -> Result<f32, SensorError>;

    /// HX711 load cell (kg). The slowest read — scheduled in its own phase.
    fn read_weight_kg(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Calibration port (driven adapter: kernel → scale driver)
// ───────────────────────────────────────────────────────────────

/// Pass-through for `CAL:` commands. Calibration math and its persistence
/// belong to the scale adapter; the kernel only forwards validated requests.
pub trait CalibrationPort {
    /// Zero the scale at the current load.
    fn tare(&mut self) -> Result<(), SensorError>;

    /// Calibrate against a known reference mass currently on the scale.
    fn set_reference_kg(&mut self, kg: f32) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: kernel → logging / host bridge)
// ───────────────────────────────────────────────────────────────

/// The kernel emits structured [`FeederEvent`](super::events::FeederEvent)s
/// through this port. Adapters decide where they go (serial line to the Pi
/// bridge, plain log, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::FeederEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: kernel ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the feeder configuration.
///
/// Implementations MUST validate before persisting. Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped —
/// a compromised upstream channel must not be able to inject dangerous
/// operating parameters (e.g. an unbounded `max_feed_duration_ms`).
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<FeederConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &FeederConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
