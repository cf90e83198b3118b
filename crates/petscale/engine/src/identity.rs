//! Owner identity resolution and legacy rule migration.
//!
//! Rules written before stable ids were tracked are keyed by display name
//! only. The first time a complete observation (name, stable id, world id) of
//! an owner with that name is seen, the ids are attached to the rule in place.
//! From then on the rule matches by id and the name is no longer
//! authoritative.

use std::collections::HashSet;

use petscale_types::OwnerIdentity;
use tracing::{info, warn};

use crate::host::EntityRecord;
use crate::rule_store::RuleStore;

/// Result of resolving one observed owner.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityResolution {
    /// Identity as observed.
    pub identity: OwnerIdentity,
    /// Number of rules migrated by this observation.
    pub backfilled: usize,
    /// True when a rule with the same name is bound to a different stable id.
    pub ambiguous: bool,
}

/// Resolves observed owners against the rule table.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    warned: HashSet<(String, u64)>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, rules: &mut RuleStore, observed: &EntityRecord) -> IdentityResolution {
        let identity = observed.owner_identity();
        let mut resolution = IdentityResolution {
            identity,
            backfilled: 0,
            ambiguous: false,
        };
        let identity = &resolution.identity;

        let pending: Vec<usize> = rules
            .rules()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.owner.is_pending() && r.owner.name == identity.name)
            .map(|(i, _)| i)
            .collect();

        if identity.is_complete() {
            for index in pending {
                if rules.backfill(index, identity.content_id, identity.world_id) {
                    resolution.backfilled += 1;
                }
            }
            if resolution.backfilled > 0 {
                info!(
                    owner = %identity.name,
                    content_id = identity.content_id,
                    world_id = identity.world_id,
                    rules = resolution.backfilled,
                    "Migrated name-keyed rules to stable id"
                );
            }
        }

        // Any rule for this name that is already bound to another stable id,
        // whether finalized or still waiting for its world id.
        let conflicting = identity.content_id != 0
            && rules.rules().iter().any(|r| {
                !r.owner.generic
                    && r.owner.content_id != 0
                    && r.owner.name == identity.name
                    && r.owner.content_id != identity.content_id
            });

        if conflicting {
            resolution.ambiguous = true;
            if self.warned.insert((identity.name.clone(), identity.content_id)) {
                warn!(
                    owner = %identity.name,
                    content_id = identity.content_id,
                    "Owner name already bound to a different stable id, not merging"
                );
            }
        }

        resolution
    }

    /// Forget which ambiguities were reported.
    pub fn reset(&mut self) {
        self.warned.clear();
    }
}
