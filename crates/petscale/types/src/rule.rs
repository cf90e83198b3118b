//! Scale rules and their persisted row format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::companion::{CompanionKind, KindTarget};
use crate::errors::{RuleError, RuleResult};
use crate::owner::{OwnerIdentity, OTHER_PLAYERS};

/// Preset size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

/// How a rule sizes a companion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeSelector {
    Small,
    Medium,
    Large,
    /// User supplied scale, clamped to the kind's floor at resolution time.
    Custom(f32),
}

impl SizeSelector {
    pub fn tier(&self) -> Option<SizeTier> {
        match self {
            SizeSelector::Small => Some(SizeTier::Small),
            SizeSelector::Medium => Some(SizeTier::Medium),
            SizeSelector::Large => Some(SizeTier::Large),
            SizeSelector::Custom(_) => None,
        }
    }

    pub fn tag(&self) -> SizeTag {
        match self {
            SizeSelector::Small => SizeTag::Small,
            SizeSelector::Medium => SizeTag::Medium,
            SizeSelector::Large => SizeTag::Large,
            SizeSelector::Custom(_) => SizeTag::Custom,
        }
    }

    pub fn custom_value(&self) -> Option<f32> {
        match self {
            SizeSelector::Custom(value) => Some(*value),
            _ => None,
        }
    }

    /// Build a selector from its persisted tag and custom column.
    pub fn from_parts(tag: SizeTag, custom_value: f32) -> RuleResult<Self> {
        let selector = match tag {
            SizeTag::Small => SizeSelector::Small,
            SizeTag::Medium => SizeSelector::Medium,
            SizeTag::Large => SizeSelector::Large,
            SizeTag::Custom => {
                if !custom_value.is_finite() || custom_value <= 0.0 {
                    return Err(RuleError::InvalidCustomValue(custom_value));
                }
                SizeSelector::Custom(custom_value)
            }
        };
        Ok(selector)
    }
}

impl fmt::Display for SizeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSelector::Custom(value) => write!(f, "Custom({value})"),
            other => write!(f, "{}", other.tag()),
        }
    }
}

/// Persisted selector column.
///
/// Accepts the legacy spellings (`SmallModelScale`, ...) and the numeric
/// enum values older profiles were written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SizeTagRepr")]
pub enum SizeTag {
    Small,
    Medium,
    Large,
    Custom,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeTagRepr {
    Name(String),
    Index(u8),
}

impl TryFrom<SizeTagRepr> for SizeTag {
    type Error = RuleError;

    fn try_from(repr: SizeTagRepr) -> RuleResult<Self> {
        match repr {
            SizeTagRepr::Name(name) => name.parse(),
            SizeTagRepr::Index(0) => Ok(SizeTag::Small),
            SizeTagRepr::Index(1) => Ok(SizeTag::Medium),
            SizeTagRepr::Index(2) => Ok(SizeTag::Large),
            SizeTagRepr::Index(3) => Ok(SizeTag::Custom),
            SizeTagRepr::Index(other) => Err(RuleError::UnknownSelector(other.to_string())),
        }
    }
}

impl fmt::Display for SizeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeTag::Small => "Small",
            SizeTag::Medium => "Medium",
            SizeTag::Large => "Large",
            SizeTag::Custom => "Custom",
        };
        f.write_str(name)
    }
}

impl FromStr for SizeTag {
    type Err = RuleError;

    fn from_str(s: &str) -> RuleResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "smallmodelscale" => Ok(SizeTag::Small),
            "medium" | "mediummodelscale" => Ok(SizeTag::Medium),
            "large" | "largemodelscale" => Ok(SizeTag::Large),
            "custom" => Ok(SizeTag::Custom),
            _ => Err(RuleError::UnknownSelector(s.to_string())),
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleRule {
    pub owner: OwnerIdentity,
    pub target: KindTarget,
    pub size: SizeSelector,
}

impl ScaleRule {
    /// Build a rule, rejecting selectors that are illegal for the kind.
    pub fn new(owner: OwnerIdentity, target: KindTarget, size: SizeSelector) -> RuleResult<Self> {
        let rule = Self {
            owner,
            target,
            size,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> RuleResult<()> {
        if self.owner.name.trim().is_empty() {
            return Err(RuleError::EmptyOwnerName);
        }
        if let SizeSelector::Custom(value) = self.size {
            if !value.is_finite() || value <= 0.0 {
                return Err(RuleError::InvalidCustomValue(value));
            }
        }
        let legal = match self.target {
            KindTarget::AllKinds => true,
            KindTarget::Kind(CompanionKind::Unknown) => {
                return Err(RuleError::UnknownKind(CompanionKind::Unknown.to_string()))
            }
            KindTarget::Kind(kind) => match self.size {
                SizeSelector::Custom(_) => kind.is_custom_eligible(),
                _ => kind.is_preset_eligible(),
            },
        };
        if !legal {
            return Err(RuleError::InvalidCombination {
                kind: self.target,
                selector: self.size.tag().to_string(),
            });
        }
        Ok(())
    }

    pub fn is_generic(&self) -> bool {
        self.owner.generic
    }

    pub fn to_row(&self) -> RuleRow {
        RuleRow {
            name: self.owner.name.clone(),
            stable_id: self.owner.content_id,
            world_id: self.owner.world_id,
            kind: self.target,
            size_selector: self.size.tag(),
            custom_value: self.size.custom_value().unwrap_or_default(),
            generic: Some(self.owner.generic),
        }
    }
}

impl fmt::Display for ScaleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.owner, self.target, self.size)
    }
}

/// Persisted row of the rule table.
///
/// Rows written before ids were tracked carry neither `stableId` nor
/// `worldId` nor `generic`; they load as migration-pending rules and the
/// wildcard flag is derived from the reserved owner name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRow {
    #[serde(alias = "CharacterName")]
    pub name: String,
    #[serde(default)]
    pub stable_id: u64,
    #[serde(default)]
    pub world_id: u16,
    #[serde(alias = "PetID")]
    pub kind: KindTarget,
    #[serde(alias = "PetSize")]
    pub size_selector: SizeTag,
    #[serde(default)]
    pub custom_value: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<bool>,
}

impl TryFrom<RuleRow> for ScaleRule {
    type Error = RuleError;

    fn try_from(row: RuleRow) -> RuleResult<Self> {
        let generic = row.generic.unwrap_or(row.name == OTHER_PLAYERS);
        let owner = if generic {
            OwnerIdentity {
                name: row.name,
                content_id: 0,
                world_id: 0,
                generic: true,
            }
        } else {
            OwnerIdentity::new(row.name, row.stable_id, row.world_id)
        };
        let size = SizeSelector::from_parts(row.size_selector, row.custom_value)?;
        ScaleRule::new(owner, row.kind, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(owner: OwnerIdentity, kind: CompanionKind, size: SizeSelector) -> RuleResult<ScaleRule> {
        ScaleRule::new(owner, KindTarget::Kind(kind), size)
    }

    #[test]
    fn test_preset_only_for_preset_kinds() {
        assert!(rule(OwnerIdentity::named("Foo"), CompanionKind::Bahamut, SizeSelector::Small).is_ok());

        let err = rule(OwnerIdentity::named("Foo"), CompanionKind::Eos, SizeSelector::Large).unwrap_err();
        assert!(matches!(err, RuleError::InvalidCombination { .. }));
    }

    #[test]
    fn test_custom_only_for_custom_kinds() {
        let owner = OwnerIdentity::named("Foo");
        assert!(rule(owner.clone(), CompanionKind::Carbuncle, SizeSelector::Custom(0.8)).is_ok());

        let err = rule(owner, CompanionKind::Phoenix, SizeSelector::Custom(0.8)).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidCombination {
                kind: KindTarget::Kind(CompanionKind::Phoenix),
                selector: "Custom".to_string(),
            }
        );
    }

    #[test]
    fn test_all_kinds_accepts_both_selectors() {
        let owner = OwnerIdentity::other_players();
        assert!(ScaleRule::new(owner.clone(), KindTarget::AllKinds, SizeSelector::Medium).is_ok());
        assert!(ScaleRule::new(owner, KindTarget::AllKinds, SizeSelector::Custom(1.2)).is_ok());
    }

    #[test]
    fn test_invalid_custom_values_rejected() {
        for value in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = rule(OwnerIdentity::named("Foo"), CompanionKind::Rook, SizeSelector::Custom(value));
            assert!(matches!(result, Err(RuleError::InvalidCustomValue(_))));
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = rule(OwnerIdentity::named("Foo"), CompanionKind::Unknown, SizeSelector::Small);
        assert!(matches!(result, Err(RuleError::UnknownKind(_))));
    }

    #[test]
    fn test_blank_owner_rejected() {
        let result = rule(OwnerIdentity::named("  "), CompanionKind::Titan, SizeSelector::Small);
        assert_eq!(result.unwrap_err(), RuleError::EmptyOwnerName);
    }

    #[test]
    fn test_row_conversion_keeps_identity() {
        let original = rule(
            OwnerIdentity::new("Foo", 1234, 73),
            CompanionKind::Eos,
            SizeSelector::Custom(0.75),
        )
        .unwrap();
        let row = original.to_row();
        assert_eq!(row.stable_id, 1234);
        assert_eq!(row.size_selector, SizeTag::Custom);
        assert_eq!(ScaleRule::try_from(row).unwrap(), original);
    }

    #[test]
    fn test_row_json_layout() {
        let wildcard = rule(OwnerIdentity::other_players(), CompanionKind::Bahamut, SizeSelector::Small).unwrap();
        let json = serde_json::to_value(wildcard.to_row()).unwrap();
        assert_eq!(json["name"], "Other players");
        assert_eq!(json["stableId"], 0);
        assert_eq!(json["worldId"], 0);
        assert_eq!(json["kind"], "Bahamut");
        assert_eq!(json["sizeSelector"], "Small");
        assert_eq!(json["generic"], true);
    }

    #[test]
    fn test_legacy_row_loads_as_pending() {
        let json = r#"{"CharacterName":"Foo","PetID":"Ifrit","PetSize":"LargeModelScale"}"#;
        let row: RuleRow = serde_json::from_str(json).unwrap();
        let legacy = ScaleRule::try_from(row).unwrap();
        assert!(legacy.owner.is_pending());
        assert!(!legacy.is_generic());
        assert_eq!(legacy.size, SizeSelector::Large);

        let json = r#"{"name":"Other players","kind":0,"sizeSelector":0}"#;
        let row: RuleRow = serde_json::from_str(json).unwrap();
        let legacy = ScaleRule::try_from(row).unwrap();
        assert!(legacy.is_generic());
        assert_eq!(legacy.target, KindTarget::AllKinds);
    }

    #[test]
    fn test_size_tag_parsing() {
        assert_eq!("LARGE".parse::<SizeTag>().unwrap(), SizeTag::Large);
        assert!(matches!("huge".parse::<SizeTag>(), Err(RuleError::UnknownSelector(_))));
    }
}
