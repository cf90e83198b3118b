//! Rule profile persistence.
//!
//! A profile is a JSON document holding the override mode and the ordered
//! rule rows. Documents from before versioning are a bare array of rows; they
//! load as version 0 with every rule migration-pending.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use petscale_types::{OverrideMode, RuleRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// Current profile document version.
pub const PROFILE_VERSION: u32 = 1;

/// Persisted engine settings and rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleProfile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub override_mode: OverrideMode,
    #[serde(default)]
    pub rules: Vec<RuleRow>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProfile {
    Document {
        #[serde(default)]
        version: u32,
        #[serde(default, rename = "overrideMode")]
        override_mode: OverrideMode,
        #[serde(default)]
        rules: Vec<serde_json::Value>,
    },
    Rows(Vec<serde_json::Value>),
}

impl ScaleProfile {
    pub fn new(override_mode: OverrideMode, rules: Vec<RuleRow>) -> Self {
        Self {
            version: PROFILE_VERSION,
            override_mode,
            rules,
        }
    }

    /// Parse a profile, dropping rows that do not decode.
    pub fn from_json(input: &str) -> EngineResult<Self> {
        let (version, override_mode, values) = match serde_json::from_str::<RawProfile>(input)? {
            RawProfile::Document {
                version,
                override_mode,
                rules,
            } => (version, override_mode, rules),
            RawProfile::Rows(rows) => (0, OverrideMode::Off, rows),
        };

        let rules = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<RuleRow>(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(row = index, error = %e, "Skipping unreadable rule row");
                    None
                }
            })
            .collect();

        Ok(Self {
            version,
            override_mode,
            rules,
        })
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Storage for the rule profile.
pub trait RuleRepository: Send {
    /// Load the stored profile, or an empty one when nothing is stored.
    fn load(&self) -> EngineResult<ScaleProfile>;

    fn save(&mut self, profile: &ScaleProfile) -> EngineResult<()>;
}

/// Profile stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "profile.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RuleRepository for JsonFileRepository {
    fn load(&self) -> EngineResult<ScaleProfile> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No profile on disk, starting empty");
            return Ok(ScaleProfile::new(OverrideMode::Off, Vec::new()));
        }
        let contents = fs::read_to_string(&self.path)?;
        ScaleProfile::from_json(&contents)
    }

    fn save(&mut self, profile: &ScaleProfile) -> EngineResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, profile.to_json()?)?;
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), rules = profile.rules.len(), "Profile saved");
        Ok(())
    }
}

/// In-memory repository. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    profile: Arc<Mutex<ScaleProfile>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: ScaleProfile) -> Self {
        Self {
            profile: Arc::new(Mutex::new(profile)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the stored profile.
    pub fn snapshot(&self) -> EngineResult<ScaleProfile> {
        self.profile
            .lock()
            .map(|p| p.clone())
            .map_err(|_| EngineError::Internal("profile lock poisoned".to_string()))
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn load(&self) -> EngineResult<ScaleProfile> {
        self.snapshot()
    }

    fn save(&mut self, profile: &ScaleProfile) -> EngineResult<()> {
        let mut stored = self
            .profile
            .lock()
            .map_err(|_| EngineError::Internal("profile lock poisoned".to_string()))?;
        *stored = profile.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
