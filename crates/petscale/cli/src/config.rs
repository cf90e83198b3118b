//! CLI configuration

use std::path::{Path, PathBuf};

use petscale_engine::{BuildProfile, EngineConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Rule profile location
    pub profile: Option<PathBuf>,

    /// Use the development refresh window
    #[serde(default)]
    pub development: bool,

    /// Engine settings, overriding the build profile defaults
    pub engine: Option<EngineConfig>,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => match Self::config_dir() {
                Ok(dir) => dir.join("config.toml"),
                Err(_) => return Ok(CliConfig::default()),
            },
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Profile path: explicit flag, then config file, then the config directory.
    pub fn profile_path(&self, flag: Option<&Path>) -> CliResult<PathBuf> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.profile {
            return Ok(path.clone());
        }
        Ok(Self::config_dir()?.join("profile.json"))
    }

    /// Engine configuration to run with
    pub fn engine_config(&self) -> EngineConfig {
        match &self.engine {
            Some(config) => config.clone(),
            None if self.development => EngineConfig::for_profile(BuildProfile::Development),
            None => EngineConfig::for_profile(BuildProfile::Release),
        }
    }

    fn config_dir() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("petscale"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.profile.is_none());
        assert_eq!(config.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_load_missing_config() {
        let config = CliConfig::load(Some("/nonexistent/path/config.toml")).unwrap();
        assert!(config.profile.is_none());
    }

    #[test]
    fn test_toml_config() {
        let config: CliConfig = toml::from_str(
            r#"
            profile = "/tmp/rules.json"
            development = true
            "#,
        )
        .unwrap();
        assert_eq!(config.engine_config().refresh_ttl_ms, 20);
        assert_eq!(
            config.profile_path(None).unwrap(),
            PathBuf::from("/tmp/rules.json")
        );
        assert_eq!(
            config.profile_path(Some(Path::new("other.json"))).unwrap(),
            PathBuf::from("other.json")
        );
    }

    #[test]
    fn test_engine_section_overrides_profile() {
        let config: CliConfig = toml::from_str(
            r#"
            development = true

            [engine]
            refresh_ttl_ms = 250
            "#,
        )
        .unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.refresh_ttl_ms, 250);
        assert_eq!(engine.forced_override_scale, 1.5);
    }
}
