//! System configuration parameters.
//!
//! All tunable parameters for the FishFeeder controller. Values can be
//! overridden at runtime through `CFG:` commands and persisted via the
//! config port.

use serde::{Deserialize, Serialize};

/// Which way the scale moves while the auger dispenses food.
///
/// Deployment-specific: a scale under the receiving tray gains mass, a load
/// cell under the feed hopper loses it. The completion test in the feeding
/// sequencer uses this to orient the weight delta — it is a configuration
/// parameter, never a hard-coded sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightDelta {
    /// Downstream scale: dispensing increases the measured mass.
    ScaleIncreases,
    /// Hopper load cell: dispensing decreases the measured mass.
    ReservoirDecreases,
}

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederConfig {
    // --- Motor speeds (PWM 0-255) ---
    /// Auger forward speed.
    pub auger_speed_forward: u8,
    /// Auger reverse speed (jam clearing).
    pub auger_speed_reverse: u8,
    /// Blower speed.
    pub blower_speed: u8,
    /// Feed-gate actuator speed.
    pub gate_speed: u8,

    // --- Default auto-stop durations (seconds; 0 = run until told) ---
    /// Auger run time for manual `G:1`/`G:2` commands.
    pub auger_run_secs: f32,
    /// Blower run time for manual `B:1` commands.
    pub blower_run_secs: f32,
    /// Gate extend (open) travel time.
    pub gate_open_secs: f32,
    /// Gate retract (close) travel time.
    pub gate_close_secs: f32,

    // --- Feeding sequence ---
    /// Hard ceiling on one feeding session, independent of weight behaviour.
    pub max_feed_duration_ms: u32,
    /// Largest amount a single `FEED` command may request.
    pub max_single_feed_grams: f32,
    /// Orientation of the dispensed-mass computation.
    pub weight_delta: WeightDelta,
    /// Blower burst after the session ends, pushing food to the pond
    /// (0 = disabled).
    pub blower_clear_secs: f32,

    // --- Sensor sampling ---
    /// One sampling phase advances each interval.
    pub sensor_read_interval_ms: u32,
    /// Weight readings older than this are stale.
    pub weight_stale_ms: u32,
    /// Climate readings older than this are stale.
    pub climate_stale_ms: u32,

    // --- Climate supervision ---
    /// Automatic control-box fan.
    pub auto_fan_enabled: bool,
    /// Fan switches on above this box temperature (°C).
    pub fan_on_temp_c: f32,
    /// Fan switches off below `fan_on_temp_c - fan_hysteresis_c`.
    pub fan_hysteresis_c: f32,
    /// Auto-fan evaluation interval.
    pub fan_check_interval_ms: u32,

    // --- Reporting ---
    /// Status line emission interval.
    pub status_interval_ms: u32,
    /// Feed-progress emission interval while a session is active.
    pub feed_progress_interval_ms: u32,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // Motors
            auger_speed_forward: 200,
            auger_speed_reverse: 180,
            blower_speed: 250,
            gate_speed: 220,

            // Auto-stop defaults
            auger_run_secs: 10.0,
            blower_run_secs: 5.0,
            gate_open_secs: 2.0,
            gate_close_secs: 1.0,

            // Feeding
            max_feed_duration_ms: 30_000,
            max_single_feed_grams: 1000.0,
            weight_delta: WeightDelta::ScaleIncreases,
            blower_clear_secs: 5.0,

            // Sensors
            sensor_read_interval_ms: 500,
            weight_stale_ms: 5_000,
            climate_stale_ms: 10_000,

            // Climate
            auto_fan_enabled: true,
            fan_on_temp_c: 30.0,
            fan_hysteresis_c: 2.0,
            fan_check_interval_ms: 5_000,

            // Reporting
            status_interval_ms: 1_000,
            feed_progress_interval_ms: 2_000,
        }
    }
}

impl FeederConfig {
    /// Range-check every field. Returns the first violation as a static
    /// description; callers must reject (not clamp) invalid configs so a
    /// compromised upstream channel cannot inject dangerous parameters.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.auger_speed_forward == 0 {
            return Err("auger_speed_forward must be nonzero");
        }
        if self.auger_speed_reverse == 0 {
            return Err("auger_speed_reverse must be nonzero");
        }
        if self.blower_speed == 0 {
            return Err("blower_speed must be nonzero");
        }
        if self.gate_speed == 0 {
            return Err("gate_speed must be nonzero");
        }
        if !(self.auger_run_secs >= 0.0 && self.auger_run_secs <= 120.0) {
            return Err("auger_run_secs out of range (0-120)");
        }
        if !(self.blower_run_secs >= 0.0 && self.blower_run_secs <= 120.0) {
            return Err("blower_run_secs out of range (0-120)");
        }
        if !(self.gate_open_secs >= 0.0 && self.gate_open_secs <= 30.0) {
            return Err("gate_open_secs out of range (0-30)");
        }
        if !(self.gate_close_secs >= 0.0 && self.gate_close_secs <= 30.0) {
            return Err("gate_close_secs out of range (0-30)");
        }
        if self.max_feed_duration_ms == 0 || self.max_feed_duration_ms > 120_000 {
            return Err("max_feed_duration_ms out of range (1-120000)");
        }
        if !(self.max_single_feed_grams > 0.0 && self.max_single_feed_grams <= 5000.0) {
            return Err("max_single_feed_grams out of range (0-5000)");
        }
        if !(self.blower_clear_secs >= 0.0 && self.blower_clear_secs <= 60.0) {
            return Err("blower_clear_secs out of range (0-60)");
        }
        if self.sensor_read_interval_ms == 0 {
            return Err("sensor_read_interval_ms must be nonzero");
        }
        if self.weight_stale_ms == 0 {
            return Err("weight_stale_ms must be nonzero");
        }
        if !(self.fan_on_temp_c > 0.0 && self.fan_on_temp_c < 100.0) {
            return Err("fan_on_temp_c out of range (0-100)");
        }
        if !(self.fan_hysteresis_c >= 0.0 && self.fan_hysteresis_c < self.fan_on_temp_c) {
            return Err("fan_hysteresis_c out of range");
        }
        if self.status_interval_ms == 0 {
            return Err("status_interval_ms must be nonzero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = FeederConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.auger_speed_forward > 0);
        assert!(c.max_feed_duration_ms > 0);
        assert!(c.max_single_feed_grams > 0.0);
        assert!(c.weight_stale_ms < c.max_feed_duration_ms);
    }

    #[test]
    fn feed_backstop_shorter_than_manual_auger_ceiling() {
        // The weight-based session ceiling must be independent of (and no
        // looser than) what a manual run could be configured to.
        let c = FeederConfig::default();
        assert!(c.max_feed_duration_ms <= 120_000);
    }

    #[test]
    fn serde_roundtrip() {
        let c = FeederConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: FeederConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.auger_speed_forward, c2.auger_speed_forward);
        assert_eq!(c.weight_delta, c2.weight_delta);
        assert!((c.max_single_feed_grams - c2.max_single_feed_grams).abs() < 0.001);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = FeederConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: FeederConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.blower_speed, c2.blower_speed);
        assert!((c.fan_on_temp_c - c2.fan_on_temp_c).abs() < 0.001);
    }

    #[test]
    fn zero_speed_rejected() {
        let mut c = FeederConfig::default();
        c.auger_speed_forward = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn oversized_feed_ceiling_rejected() {
        let mut c = FeederConfig::default();
        c.max_feed_duration_ms = 10_000_000;
        assert!(c.validate().is_err());
    }
}
