//! Scale resolution.
//!
//! Rules are visited in store order: the wildcard group first (skipped for
//! the local player's companions), then the specific rules matching the
//! owner. Every matching rule that yields a scale replaces the previous
//! decision, so the last match wins and a specific rule always supersedes a
//! wildcard one.

use petscale_types::{CompanionKind, OwnerIdentity, ScaleRule, SizeSelector};
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTables;
use crate::rule_store::RuleStore;

/// Which rule group produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOrigin {
    Wildcard,
    Specific,
}

/// Scale to apply to a companion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleDecision {
    pub scale: f32,
    /// Index of the deciding rule in the store.
    pub rule_index: usize,
    pub origin: DecisionOrigin,
}

/// One companion to resolve.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub kind: CompanionKind,
    /// Live name of the companion, used for the reference lookup.
    pub companion_name: &'a str,
    pub owner: &'a OwnerIdentity,
    pub owner_is_local: bool,
}

/// Walks the rule table for a companion.
pub struct ScaleResolver<'a> {
    rules: &'a RuleStore,
    reference: &'a ReferenceTables,
}

impl<'a> ScaleResolver<'a> {
    pub fn new(rules: &'a RuleStore, reference: &'a ReferenceTables) -> Self {
        Self { rules, reference }
    }

    /// Decide the scale for one companion, walking
    /// [`RuleStore::applicable_rules`]. `None` leaves the companion unresolved.
    pub fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ScaleDecision> {
        if !request.kind.is_tracked() {
            return None;
        }

        let mut decision = None;
        for (index, rule) in
            self.rules
                .applicable_rules(request.owner, request.kind, request.owner_is_local)
        {
            if let Some(scale) = self.rule_scale(rule, request) {
                decision = Some(ScaleDecision {
                    scale,
                    rule_index: index,
                    origin: if rule.owner.generic {
                        DecisionOrigin::Wildcard
                    } else {
                        DecisionOrigin::Specific
                    },
                });
            }
        }

        decision
    }

    /// Scale an applicable rule gives the companion. Presets need reference
    /// data for the companion's name.
    fn rule_scale(&self, rule: &ScaleRule, request: &ResolveRequest<'_>) -> Option<f32> {
        match rule.size {
            SizeSelector::Custom(value) => {
                let floor = request.kind.custom_floor()?;
                Some(value.max(floor))
            }
            preset => {
                let tier = preset.tier()?;
                self.reference
                    .scales_for(request.kind, request.companion_name)
                    .map(|scales| scales.for_tier(tier))
            }
        }
    }
}

/// True when the decision comes from a finalized rule for this specific
/// owner. Such a rule takes precedence over the forced override.
pub fn is_governing(rules: &RuleStore, decision: &ScaleDecision) -> bool {
    decision.origin == DecisionOrigin::Specific
        && rules
            .get(decision.rule_index)
            .is_some_and(|rule| !rule.owner.is_pending())
}
