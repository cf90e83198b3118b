//! # PetScale Types
//!
//! Value types shared by the PetScale engine and its tooling:
//!
//! - [`CompanionKind`]: closed set of tracked companions with the model id and
//!   reference row id tables used to recognise them
//! - [`OwnerIdentity`]: who a rule is for, including the "Other players"
//!   wildcard and the migration-pending (name-only) state
//! - [`ScaleRule`] / [`RuleRow`]: a rule and its persisted row format
//! - [`OverrideMode`]: the forced-override toggle
//!
//! Rule construction validates selector/kind combinations up front, so an
//! invalid rule can never reach the rule store.

pub mod companion;
pub mod errors;
pub mod mode;
pub mod owner;
pub mod rule;

pub use companion::{CompanionKind, KindInfo, KindTarget, KIND_TABLE};
pub use errors::{RuleError, RuleResult};
pub use mode::OverrideMode;
pub use owner::{ObjectId, OwnerIdentity, OTHER_PLAYERS};
pub use rule::{RuleRow, ScaleRule, SizeSelector, SizeTag, SizeTier};
