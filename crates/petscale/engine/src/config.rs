//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Build profile the engine is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    Release,
    /// Short refresh window so association changes show up immediately.
    Development,
}

/// Configuration for the scale engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a full rescan stays fresh, in milliseconds.
    pub refresh_ttl_ms: u64,

    /// Uniform scale applied by the forced override.
    pub forced_override_scale: f32,

    /// Scale a companion is reverted to when a forced override is lifted.
    pub native_scale: f32,

    /// Maximum roster length (players plus the wildcard entry).
    pub roster_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_ttl_ms: 500,
            forced_override_scale: 1.5,
            native_scale: 1.0,
            roster_capacity: 101,
        }
    }
}

impl EngineConfig {
    /// Create config tuned for a build profile.
    pub fn for_profile(profile: BuildProfile) -> Self {
        let mut config = Self::default();

        match profile {
            BuildProfile::Release => {}
            BuildProfile::Development => {
                config.refresh_ttl_ms = 20;
            }
        }

        config
    }

    /// Refresh window as a duration.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_millis(self.refresh_ttl_ms)
    }
}
