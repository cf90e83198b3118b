//! # PetScale Engine
//!
//! Live-state reconciliation of companion scales inside a host application.
//!
//! Every scheduler tick the engine either rescans the host's entity table or
//! walks the companions it already knows about, and applies a per-owner,
//! per-kind scale from a small rule table:
//!
//! - **Association cache**: owner/companion pairs rebuilt at most once per
//!   refresh window ([`AssociationCache`])
//! - **Rule store**: wildcard rules ordered ahead of specific rules so the
//!   specific ones win ([`RuleStore`])
//! - **Identity resolver**: migrates name-keyed rules to stable ids on first
//!   sight of the owner ([`IdentityResolver`])
//! - **Scale resolution**: walks the rules for one companion
//!   ([`ScaleResolver`])
//! - **Override state machine**: the Off/Self/Others/All forced-scale toggle
//!   and its safe revert ([`OverrideController`])
//!
//! The host is reached only through [`WorldHost`]; [`InMemoryWorld`] is a
//! complete in-memory implementation for tests and simulation.
//!
//! ```no_run
//! use std::time::Instant;
//! use petscale_engine::{
//!     EngineConfig, InMemoryRuleRepository, InMemoryWorld, ReferenceHandle, ScaleEngine,
//! };
//!
//! # fn main() -> petscale_engine::EngineResult<()> {
//! let mut engine = ScaleEngine::open(
//!     EngineConfig::default(),
//!     ReferenceHandle::unavailable(),
//!     Box::new(InMemoryRuleRepository::new()),
//! )?;
//! let mut world = InMemoryWorld::new();
//! let report = engine.tick(&mut world, Instant::now());
//! assert!(report.idle);
//! # Ok(())
//! # }
//! ```

pub mod association;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod identity;
pub mod override_state;
pub mod persistence;
pub mod reference;
pub mod resolution;
pub mod roster;
pub mod rule_store;

pub use association::{
    AssociationCache, AssociationEntry, CacheState, CacheStats, EntityHandle, RefreshSummary,
};
pub use config::{BuildProfile, EngineConfig};
pub use engine::{ScaleEngine, SessionEvent, TickReport};
pub use error::{EngineError, EngineResult};
pub use host::{EntityKind, EntityRecord, InMemoryWorld, WorldHost};
pub use identity::{IdentityResolution, IdentityResolver};
pub use override_state::{ForcedOverride, OverrideController, Reconciliation};
pub use persistence::{
    InMemoryRuleRepository, JsonFileRepository, RuleRepository, ScaleProfile, PROFILE_VERSION,
};
pub use reference::{
    spawn_reference_loader, CompanionSheetRow, ReferenceHandle, ReferenceSource, ReferenceTables,
    SizeScales, StaticReferenceSource,
};
pub use resolution::{DecisionOrigin, ResolveRequest, ScaleDecision, ScaleResolver};
pub use roster::PlayerRoster;
pub use rule_store::{RuleChange, RuleStore};
