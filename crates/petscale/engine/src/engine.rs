//! The scale engine.
//!
//! [`ScaleEngine::tick`] is driven by the host scheduler. A tick either
//! rescans the world (when the association cache is stale or its window has
//! expired) or walks the unresolved associations and applies scales. Each
//! companion is handled independently; nothing in a tick can fail.

use std::time::Instant;

use petscale_types::{KindTarget, ObjectId, OverrideMode, OwnerIdentity, ScaleRule, SizeSelector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::association::{AssociationCache, AssociationEntry, CacheStats};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::host::{EntityRecord, WorldHost};
use crate::identity::IdentityResolver;
use crate::override_state::{OverrideController, Reconciliation};
use crate::persistence::{RuleRepository, ScaleProfile};
use crate::reference::{ReferenceHandle, ReferenceTables};
use crate::resolution::{is_governing, ResolveRequest, ScaleResolver};
use crate::roster::PlayerRoster;
use crate::rule_store::{RuleChange, RuleStore};

/// Host session transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Login,
    Logout,
    TerritoryChanged,
}

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// No local player; nothing was done.
    pub idle: bool,
    /// The world was rescanned this tick.
    pub refreshed: bool,
    /// Migrated rules were written back.
    pub flushed: bool,
    pub tracked: usize,
    pub visited: usize,
    pub applied: usize,
    pub forced: usize,
    pub reverted: usize,
    /// Override records taken over by a finalized rule.
    pub released: usize,
    /// Override records dropped because something else changed the scale.
    pub diverged: usize,
    pub skipped: usize,
    pub undecided: usize,
    pub backfills: usize,
    pub ambiguities: usize,
}

/// Per-companion outcome.
enum EntryOutcome {
    Skipped,
    Undecided,
    Applied,
    Forced,
}

/// Owns every piece of engine state. One instance per host session.
pub struct ScaleEngine {
    config: EngineConfig,
    rules: RuleStore,
    identity: IdentityResolver,
    cache: AssociationCache,
    overrides: OverrideController,
    roster: PlayerRoster,
    roster_pending: bool,
    reference: ReferenceHandle,
    repository: Box<dyn RuleRepository>,
}

impl ScaleEngine {
    /// Create an engine from the stored profile.
    pub fn open(
        config: EngineConfig,
        reference: ReferenceHandle,
        repository: Box<dyn RuleRepository>,
    ) -> EngineResult<Self> {
        let profile = repository.load()?;
        let rules = RuleStore::from_rows(profile.rules);

        info!(
            rules = rules.len(),
            mode = %profile.override_mode,
            version = profile.version,
            "Scale engine started"
        );

        let mut roster = PlayerRoster::new(config.roster_capacity);
        roster.rebuild_offline(rules.owner_names());

        Ok(Self {
            cache: AssociationCache::new(config.refresh_ttl()),
            overrides: OverrideController::new(
                profile.override_mode,
                config.forced_override_scale,
                config.native_scale,
            ),
            identity: IdentityResolver::new(),
            roster,
            roster_pending: true,
            rules,
            reference,
            repository,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn override_mode(&self) -> OverrideMode {
        self.overrides.mode()
    }

    pub fn overrides(&self) -> &OverrideController {
        &self.overrides
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Cached association for a companion.
    pub fn lookup(&self, companion: ObjectId) -> Option<&AssociationEntry> {
        self.cache.lookup(companion)
    }

    pub fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    pub fn player_count(&self, logged_in: bool) -> usize {
        self.roster.player_count(logged_in)
    }

    /// Run one scheduler tick.
    pub fn tick<H: WorldHost>(&mut self, host: &mut H, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        let Some(local) = host.local_player() else {
            report.idle = true;
            return report;
        };

        if self.cache.needs_refresh(now) {
            let snapshot = host.enumerate_entities();
            let summary = self.cache.refresh(&snapshot, now);

            let cache = &self.cache;
            let purged = self.overrides.retain_live(|id| cache.contains(id));
            if purged > 0 {
                debug!(purged, "Dropped override records for vanished companions");
            }

            if self.roster_pending {
                self.roster.rebuild_live(&local, &snapshot);
                self.roster_pending = false;
            }

            report.refreshed = true;
            report.tracked = summary.tracked;
            return report;
        }

        let reference = self.reference.current();
        report.tracked = self.cache.len();

        for entry in self.cache.unresolved() {
            report.visited += 1;
            match self.process_entry(host, &entry, &local, &reference, &mut report) {
                EntryOutcome::Skipped => report.skipped += 1,
                EntryOutcome::Undecided => report.undecided += 1,
                EntryOutcome::Applied => {
                    report.applied += 1;
                    self.cache.mark_resolved(entry.companion.object_id);
                }
                EntryOutcome::Forced => {
                    report.forced += 1;
                    self.cache.mark_resolved(entry.companion.object_id);
                }
            }
        }

        if self.rules.is_dirty() {
            match self.persist() {
                Ok(()) => report.flushed = true,
                Err(e) => warn!(error = %e, "Failed to save migrated rules, will retry"),
            }
        }

        report
    }

    fn process_entry<H: WorldHost>(
        &mut self,
        host: &mut H,
        entry: &AssociationEntry,
        local: &EntityRecord,
        reference: &ReferenceTables,
        report: &mut TickReport,
    ) -> EntryOutcome {
        let companion_id = entry.companion.object_id;
        let Some(owner_handle) = entry.owner else {
            return EntryOutcome::Skipped;
        };
        if !self.cache.is_current(&entry.companion) || !self.cache.is_current(&owner_handle) {
            return EntryOutcome::Skipped;
        }

        // Re-fetch both sides; the snapshot may be gone by now.
        let Some(companion) = host.entity(companion_id) else {
            return EntryOutcome::Skipped;
        };
        if companion.owner_id != entry.owner_ref || !host.is_visible(companion_id) {
            return EntryOutcome::Skipped;
        }
        let Some(owner) = host.entity(owner_handle.object_id) else {
            return EntryOutcome::Skipped;
        };
        let owner_is_local = owner.object_id == local.object_id;

        let resolution = self.identity.resolve(&mut self.rules, &owner);
        report.backfills += resolution.backfilled;
        if resolution.ambiguous {
            report.ambiguities += 1;
        }

        let decision = ScaleResolver::new(&self.rules, reference).resolve(&ResolveRequest {
            kind: entry.kind,
            companion_name: &companion.name,
            owner: &resolution.identity,
            owner_is_local,
        });
        let governed = decision
            .as_ref()
            .is_some_and(|d| is_governing(&self.rules, d));

        if entry.kind.is_overridable() {
            if !governed && self.overrides.wants_force(entry.kind, owner_is_local) {
                let scale = self.overrides.force(companion_id, entry.kind);
                host.apply_scale(companion_id, scale);
                return EntryOutcome::Forced;
            }

            if governed {
                if self.overrides.release(companion_id) {
                    report.released += 1;
                }
            } else {
                match self
                    .overrides
                    .reconcile(companion_id, host.current_scale(companion_id))
                {
                    Reconciliation::Reverted(native) => {
                        report.reverted += 1;
                        if decision.is_none() {
                            host.apply_scale(companion_id, native);
                        }
                    }
                    Reconciliation::Diverged => report.diverged += 1,
                    Reconciliation::NotForced => {}
                }
            }
        }

        match decision {
            Some(decision) => {
                debug!(
                    companion = %companion_id,
                    owner = %owner.name,
                    kind = %entry.kind,
                    scale = decision.scale,
                    origin = ?decision.origin,
                    "Applying scale"
                );
                host.apply_scale(companion_id, decision.scale);
                EntryOutcome::Applied
            }
            None => EntryOutcome::Undecided,
        }
    }

    /// Insert or update a rule.
    pub fn add_or_update_rule(
        &mut self,
        owner: OwnerIdentity,
        target: KindTarget,
        size: SizeSelector,
    ) -> EngineResult<RuleChange> {
        let rule = ScaleRule::new(owner, target, size)?;
        let change = self.rules.add_or_update(rule)?;
        if change != RuleChange::Unchanged {
            self.cache.reset_resolved();
            self.persist()?;
        }
        Ok(change)
    }

    /// Remove the rule at `index` in table order.
    pub fn remove_rule(&mut self, index: usize) -> EngineResult<ScaleRule> {
        let removed = self.rules.remove(index)?;
        self.cache.reset_resolved();
        self.persist()?;
        Ok(removed)
    }

    /// Remove every rule.
    pub fn clear_rules(&mut self) -> EngineResult<usize> {
        let count = self.rules.clear();
        if count > 0 {
            self.cache.reset_resolved();
            self.persist()?;
        }
        Ok(count)
    }

    /// Change the override mode. Takes effect on the next tick.
    pub fn set_override_mode(&mut self, mode: OverrideMode) -> EngineResult<bool> {
        if !self.overrides.set_mode(mode) {
            return Ok(false);
        }
        self.cache.reset_resolved();
        self.persist()?;
        Ok(true)
    }

    /// Force a rescan, and a roster rebuild, on the next tick.
    pub fn request_cache_refresh(&mut self) {
        self.cache.invalidate();
        self.roster_pending = true;
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        debug!(event = ?event, "Session event");
        self.cache.invalidate();
        match event {
            SessionEvent::Logout => {
                self.overrides.clear();
                self.identity.reset();
                self.roster.rebuild_offline(self.rules.owner_names());
                self.roster_pending = true;
            }
            SessionEvent::Login => self.roster_pending = true,
            SessionEvent::TerritoryChanged => {}
        }
    }

    /// Write the current rules and mode to the repository.
    pub fn persist(&mut self) -> EngineResult<()> {
        let profile = ScaleProfile::new(self.overrides.mode(), self.rules.to_rows());
        self.repository.save(&profile)?;
        self.rules.mark_clean();
        Ok(())
    }
}
