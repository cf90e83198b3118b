//! Forced-override toggle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RuleError;

/// Which owners' overridable companions are forced to the uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverrideMode {
    #[default]
    Off,
    /// Only the local player's companions.
    #[serde(rename = "Self")]
    OwnOnly,
    /// Only other players' companions.
    Others,
    All,
}

impl OverrideMode {
    /// Whether a companion with this ownership is forced in this mode.
    pub fn applies_to(self, owner_is_local: bool) -> bool {
        match self {
            OverrideMode::Off => false,
            OverrideMode::OwnOnly => owner_is_local,
            OverrideMode::Others => !owner_is_local,
            OverrideMode::All => true,
        }
    }
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverrideMode::Off => "off",
            OverrideMode::OwnOnly => "self",
            OverrideMode::Others => "others",
            OverrideMode::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for OverrideMode {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(OverrideMode::Off),
            "self" | "1" => Ok(OverrideMode::OwnOnly),
            "others" | "2" => Ok(OverrideMode::Others),
            "all" | "3" => Ok(OverrideMode::All),
            _ => Err(RuleError::UnknownSelector(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_applicability() {
        assert!(!OverrideMode::Off.applies_to(true));
        assert!(!OverrideMode::Off.applies_to(false));
        assert!(OverrideMode::OwnOnly.applies_to(true));
        assert!(!OverrideMode::OwnOnly.applies_to(false));
        assert!(!OverrideMode::Others.applies_to(true));
        assert!(OverrideMode::Others.applies_to(false));
        assert!(OverrideMode::All.applies_to(true));
        assert!(OverrideMode::All.applies_to(false));
    }

    #[test]
    fn test_mode_parsing_accepts_legacy_numbers() {
        assert_eq!("2".parse::<OverrideMode>().unwrap(), OverrideMode::Others);
        assert_eq!("Self".parse::<OverrideMode>().unwrap(), OverrideMode::OwnOnly);
        assert!("sometimes".parse::<OverrideMode>().is_err());
    }

    #[test]
    fn test_mode_serde_name() {
        assert_eq!(serde_json::to_string(&OverrideMode::OwnOnly).unwrap(), "\"Self\"");
        let mode: OverrideMode = serde_json::from_str("\"All\"").unwrap();
        assert_eq!(mode, OverrideMode::All);
    }
}
