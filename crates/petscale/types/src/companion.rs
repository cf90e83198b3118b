//! Companion kinds and the numeric tables that identify them.
//!
//! The host exposes companions only through a raw model id, and the
//! reference sheet only through a row id. Both are mapped onto the closed
//! [`CompanionKind`] enum here; anything that is not in the tables becomes
//! [`CompanionKind::Unknown`] and is ignored by the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{RuleError, RuleResult};

/// Companion kinds tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompanionKind {
    Bahamut,
    Phoenix,
    Ifrit,
    Titan,
    Garuda,
    SolarBahamut,
    Eos,
    Selene,
    Seraph,
    Rook,
    AutomatonQueen,
    Esteem,
    Carbuncle,
    RubyCarbuncle,
    TopazCarbuncle,
    EmeraldCarbuncle,
    IfritEgi,
    TitanEgi,
    GarudaEgi,
    /// Any model id that is not in the table.
    Unknown,
}

/// Static facts about one tracked kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindInfo {
    pub kind: CompanionKind,
    pub model_id: i32,
    pub row_id: u32,
    /// Minimum custom scale, `None` for preset-only kinds.
    pub custom_floor: Option<f32>,
}

const fn preset(kind: CompanionKind, model_id: i32, row_id: u32) -> KindInfo {
    KindInfo {
        kind,
        model_id,
        row_id,
        custom_floor: None,
    }
}

const fn custom(kind: CompanionKind, model_id: i32, row_id: u32, floor: f32) -> KindInfo {
    KindInfo {
        kind,
        model_id,
        row_id,
        custom_floor: Some(floor),
    }
}

/// Every tracked kind, in declaration order.
pub const KIND_TABLE: [KindInfo; 19] = [
    preset(CompanionKind::Bahamut, 1930, 10),
    preset(CompanionKind::Phoenix, 2620, 14),
    preset(CompanionKind::Ifrit, 3122, 30),
    preset(CompanionKind::Titan, 3124, 31),
    preset(CompanionKind::Garuda, 3123, 32),
    preset(CompanionKind::SolarBahamut, 4038, 46),
    custom(CompanionKind::Eos, 407, 6, 0.5),
    custom(CompanionKind::Selene, 408, 7, 0.5),
    custom(CompanionKind::Seraph, 2619, 15, 0.5),
    custom(CompanionKind::Rook, 1027, 8, 0.4),
    custom(CompanionKind::AutomatonQueen, 2618, 18, 0.4),
    custom(CompanionKind::Esteem, 2621, 17, 0.5),
    custom(CompanionKind::Carbuncle, 411, 23, 0.3),
    custom(CompanionKind::RubyCarbuncle, 410, 24, 0.3),
    custom(CompanionKind::TopazCarbuncle, 412, 25, 0.3),
    custom(CompanionKind::EmeraldCarbuncle, 409, 26, 0.3),
    custom(CompanionKind::IfritEgi, 415, 27, 0.3),
    custom(CompanionKind::TitanEgi, 416, 28, 0.3),
    custom(CompanionKind::GarudaEgi, 417, 29, 0.3),
];

impl CompanionKind {
    /// Map a raw host model id onto a kind.
    pub fn from_model_id(model_id: i32) -> Self {
        KIND_TABLE
            .iter()
            .find(|info| info.model_id == model_id)
            .map(|info| info.kind)
            .unwrap_or(CompanionKind::Unknown)
    }

    /// Map a reference sheet row id onto a kind.
    pub fn from_row_id(row_id: u32) -> Self {
        KIND_TABLE
            .iter()
            .find(|info| info.row_id == row_id)
            .map(|info| info.kind)
            .unwrap_or(CompanionKind::Unknown)
    }

    /// Static table entry, `None` for `Unknown`.
    pub fn info(self) -> Option<&'static KindInfo> {
        KIND_TABLE.iter().find(|info| info.kind == self)
    }

    pub fn is_tracked(self) -> bool {
        self != CompanionKind::Unknown
    }

    /// Kinds that accept the Small/Medium/Large selectors.
    pub fn is_preset_eligible(self) -> bool {
        self.info().is_some_and(|info| info.custom_floor.is_none())
    }

    /// Kinds that accept a custom float scale.
    pub fn is_custom_eligible(self) -> bool {
        self.info().is_some_and(|info| info.custom_floor.is_some())
    }

    /// Floor applied to custom values for this kind.
    pub fn custom_floor(self) -> Option<f32> {
        self.info().and_then(|info| info.custom_floor)
    }

    /// Kinds the forced-override toggle acts on (Seraph is larger by default
    /// and stays out).
    pub fn is_overridable(self) -> bool {
        matches!(self, CompanionKind::Eos | CompanionKind::Selene)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompanionKind::Bahamut => "Bahamut",
            CompanionKind::Phoenix => "Phoenix",
            CompanionKind::Ifrit => "Ifrit",
            CompanionKind::Titan => "Titan",
            CompanionKind::Garuda => "Garuda",
            CompanionKind::SolarBahamut => "SolarBahamut",
            CompanionKind::Eos => "Eos",
            CompanionKind::Selene => "Selene",
            CompanionKind::Seraph => "Seraph",
            CompanionKind::Rook => "Rook",
            CompanionKind::AutomatonQueen => "AutomatonQueen",
            CompanionKind::Esteem => "Esteem",
            CompanionKind::Carbuncle => "Carbuncle",
            CompanionKind::RubyCarbuncle => "RubyCarbuncle",
            CompanionKind::TopazCarbuncle => "TopazCarbuncle",
            CompanionKind::EmeraldCarbuncle => "EmeraldCarbuncle",
            CompanionKind::IfritEgi => "IfritEgi",
            CompanionKind::TitanEgi => "TitanEgi",
            CompanionKind::GarudaEgi => "GarudaEgi",
            CompanionKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CompanionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanionKind {
    type Err = RuleError;

    fn from_str(s: &str) -> RuleResult<Self> {
        KIND_TABLE
            .iter()
            .map(|info| info.kind)
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RuleError::UnknownKind(s.to_string()))
    }
}

/// Kind column of a scale rule.
///
/// Serialised as `"AllKinds"` or the kind name. Older profiles stored the raw
/// model id (0 for all kinds), which is still accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "KindRepr")]
pub enum KindTarget {
    /// Matches every tracked kind.
    AllKinds,
    Kind(CompanionKind),
}

impl KindTarget {
    pub const ALL_KINDS_NAME: &'static str = "AllKinds";

    /// Name used for ordering and persistence.
    pub fn name(&self) -> &'static str {
        match self {
            KindTarget::AllKinds => Self::ALL_KINDS_NAME,
            KindTarget::Kind(kind) => kind.as_str(),
        }
    }

    pub fn covers(&self, kind: CompanionKind) -> bool {
        match self {
            KindTarget::AllKinds => kind.is_tracked(),
            KindTarget::Kind(target) => *target == kind,
        }
    }
}

impl fmt::Display for KindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KindTarget {
    type Err = RuleError;

    fn from_str(s: &str) -> RuleResult<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(Self::ALL_KINDS_NAME)
            || trimmed.eq_ignore_ascii_case("AllPets")
        {
            return Ok(KindTarget::AllKinds);
        }
        trimmed.parse().map(KindTarget::Kind)
    }
}

impl From<KindTarget> for String {
    fn from(target: KindTarget) -> Self {
        target.name().to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KindRepr {
    Name(String),
    ModelId(i32),
}

impl TryFrom<KindRepr> for KindTarget {
    type Error = RuleError;

    fn try_from(repr: KindRepr) -> RuleResult<Self> {
        match repr {
            KindRepr::Name(name) => name.parse(),
            KindRepr::ModelId(0) => Ok(KindTarget::AllKinds),
            KindRepr::ModelId(id) => match CompanionKind::from_model_id(id) {
                CompanionKind::Unknown => Err(RuleError::UnknownKind(id.to_string())),
                kind => Ok(KindTarget::Kind(kind)),
            },
        }
    }
}

impl From<CompanionKind> for KindTarget {
    fn from(kind: CompanionKind) -> Self {
        KindTarget::Kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids_round_trip_through_table() {
        for info in KIND_TABLE.iter() {
            assert_eq!(CompanionKind::from_model_id(info.model_id), info.kind);
            assert_eq!(CompanionKind::from_row_id(info.row_id), info.kind);
            assert_eq!(info.kind.info().map(|i| i.model_id), Some(info.model_id));
        }
    }

    #[test]
    fn test_table_ids_are_unique() {
        let mut models: Vec<i32> = KIND_TABLE.iter().map(|i| i.model_id).collect();
        let mut rows: Vec<u32> = KIND_TABLE.iter().map(|i| i.row_id).collect();
        models.sort_unstable();
        models.dedup();
        rows.sort_unstable();
        rows.dedup();
        assert_eq!(models.len(), KIND_TABLE.len());
        assert_eq!(rows.len(), KIND_TABLE.len());
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(CompanionKind::from_model_id(0), CompanionKind::Unknown);
        assert_eq!(CompanionKind::from_model_id(99999), CompanionKind::Unknown);
        assert_eq!(CompanionKind::from_row_id(1), CompanionKind::Unknown);
        assert!(!CompanionKind::Unknown.is_tracked());
        assert!(CompanionKind::Unknown.info().is_none());
    }

    #[test]
    fn test_eligibility_sets_are_disjoint() {
        for info in KIND_TABLE.iter() {
            assert_ne!(
                info.kind.is_preset_eligible(),
                info.kind.is_custom_eligible(),
                "{} must be in exactly one set",
                info.kind
            );
        }
        assert!(CompanionKind::Bahamut.is_preset_eligible());
        assert!(CompanionKind::Eos.is_custom_eligible());
        assert!(!CompanionKind::Unknown.is_preset_eligible());
        assert!(!CompanionKind::Unknown.is_custom_eligible());
    }

    #[test]
    fn test_overridable_kinds() {
        assert!(CompanionKind::Eos.is_overridable());
        assert!(CompanionKind::Selene.is_overridable());
        assert!(!CompanionKind::Seraph.is_overridable());
        assert!(!CompanionKind::Bahamut.is_overridable());
    }

    #[test]
    fn test_kind_target_parsing() {
        assert_eq!("AllKinds".parse::<KindTarget>().unwrap(), KindTarget::AllKinds);
        assert_eq!("AllPets".parse::<KindTarget>().unwrap(), KindTarget::AllKinds);
        assert_eq!(
            "solarbahamut".parse::<KindTarget>().unwrap(),
            KindTarget::Kind(CompanionKind::SolarBahamut)
        );
        assert!(matches!(
            "Unknown".parse::<KindTarget>(),
            Err(RuleError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_kind_target_serde() {
        let json = serde_json::to_string(&KindTarget::Kind(CompanionKind::Rook)).unwrap();
        assert_eq!(json, "\"Rook\"");
        let back: KindTarget = serde_json::from_str("\"AllKinds\"").unwrap();
        assert_eq!(back, KindTarget::AllKinds);
        assert!(serde_json::from_str::<KindTarget>("\"Moogle\"").is_err());

        let legacy: KindTarget = serde_json::from_str("1930").unwrap();
        assert_eq!(legacy, KindTarget::Kind(CompanionKind::Bahamut));
        assert!(serde_json::from_str::<KindTarget>("12").is_err());
    }

    #[test]
    fn test_all_kinds_sorts_before_kind_names() {
        for info in KIND_TABLE.iter() {
            assert!(KindTarget::AllKinds.name() < info.kind.as_str());
        }
    }
}
