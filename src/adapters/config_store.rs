//! Config persistence adapters.
//!
//! The kernel talks to [`ConfigPort`]; this module provides the NVS-backed
//! store for the target and an in-memory store for host tests and for
//! running degraded when NVS init fails.
//!
//! Stored format is postcard (compact, schema-light). Every save validates
//! first — an invalid config is rejected, never clamped into range.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::FeederConfig;

// ───────────────────────────────────────────────────────────────
// In-memory store (host tests, NVS-failure fallback)
// ───────────────────────────────────────────────────────────────

/// Keeps the serialized blob in memory. Same validation and encoding as the
/// NVS store so round-trip tests exercise the real persistence path.
#[derive(Default)]
pub struct InMemoryConfigStore {
    blob: Option<Vec<u8>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigPort for InMemoryConfigStore {
    fn load(&self) -> Result<FeederConfig, ConfigError> {
        let bytes = self.blob.as_ref().ok_or(ConfigError::NotFound)?;
        let config: FeederConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate().map_err(ConfigError::ValidationFailed)?;
        Ok(config)
    }

    fn save(&mut self, config: &FeederConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.blob = Some(bytes);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// NVS store (target only)
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "espidf")]
pub use nvs::NvsConfigStore;

#[cfg(feature = "espidf")]
mod nvs {
    use super::{ConfigError, ConfigPort, FeederConfig};
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
    use log::info;

    const NAMESPACE: &str = "feeder";
    const KEY: &str = "config";
    const MAX_BLOB: usize = 512;

    pub struct NvsConfigStore {
        nvs: EspNvs<NvsDefault>,
    }

    impl NvsConfigStore {
        pub fn new() -> anyhow::Result<Self> {
            let partition = EspDefaultNvsPartition::take()?;
            let nvs = EspNvs::new(partition, NAMESPACE, true)?;
            info!("NVS config store ready (namespace '{}')", NAMESPACE);
            Ok(Self { nvs })
        }
    }

    impl ConfigPort for NvsConfigStore {
        fn load(&self) -> Result<FeederConfig, ConfigError> {
            let mut buf = [0u8; MAX_BLOB];
            let bytes = self
                .nvs
                .get_raw(KEY, &mut buf)
                .map_err(|_| ConfigError::IoError)?
                .ok_or(ConfigError::NotFound)?;
            let config: FeederConfig =
                postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
            config.validate().map_err(ConfigError::ValidationFailed)?;
            Ok(config)
        }

        fn save(&mut self, config: &FeederConfig) -> Result<(), ConfigError> {
            config.validate().map_err(ConfigError::ValidationFailed)?;
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.nvs
                .set_raw(KEY, &bytes)
                .map_err(|_| ConfigError::IoError)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightDelta;

    #[test]
    fn load_before_save_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert_eq!(store.load().unwrap_err(), ConfigError::NotFound);
    }

    #[test]
    fn save_load_roundtrip() {
        let mut store = InMemoryConfigStore::new();
        let mut config = FeederConfig::default();
        config.auger_speed_forward = 180;
        config.weight_delta = WeightDelta::ReservoirDecreases;

        store.save(&config).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.auger_speed_forward, 180);
        assert_eq!(loaded.weight_delta, WeightDelta::ReservoirDecreases);
    }

    #[test]
    fn invalid_config_is_rejected_not_clamped() {
        let mut store = InMemoryConfigStore::new();
        let mut config = FeederConfig::default();
        config.max_feed_duration_ms = 0;
        assert!(matches!(
            store.save(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
        // Nothing was persisted.
        assert_eq!(store.load().unwrap_err(), ConfigError::NotFound);
    }
}
