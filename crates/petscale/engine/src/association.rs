//! Owner/companion association cache.
//!
//! A full rescan is expensive, so associations are rebuilt at most once per
//! refresh window. Between refreshes the engine only walks the unresolved
//! entries.
//!
//! ```text
//!   Stale ──refresh──▶ Fresh ──ttl expired──▶ Stale
//!     ▲                  │
//!     └───invalidate─────┘
//! ```
//!
//! Entries hold [`EntityHandle`]s stamped with the refresh generation that
//! produced them. A handle from an older generation is never dereferenced;
//! the engine re-fetches the entity by id from the host before each use.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use petscale_types::{CompanionKind, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::{EntityKind, EntityRecord};

/// Freshness of the cached associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheState {
    Stale,
    Fresh,
}

/// Generation-checked reference to a host entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub object_id: ObjectId,
    pub generation: u64,
}

/// One tracked companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationEntry {
    pub companion: EntityHandle,
    pub kind: CompanionKind,
    pub name: String,
    /// Raw owner id reported by the host for the companion.
    pub owner_ref: ObjectId,
    /// Filled by the second refresh pass.
    pub owner: Option<EntityHandle>,
    /// Set once a scale was applied in the current window.
    pub resolved: bool,
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub refresh_count: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub tracked: usize,
    pub paired: usize,
}

/// Summary of a single refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub generation: u64,
    pub tracked: usize,
    pub paired: usize,
}

/// The association cache.
#[derive(Debug, Clone)]
pub struct AssociationCache {
    ttl: Duration,
    state: CacheState,
    last_refresh: Option<Instant>,
    generation: u64,
    entries: BTreeMap<ObjectId, AssociationEntry>,
    stats: CacheStats,
}

impl AssociationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: CacheState::Stale,
            last_refresh: None,
            generation: 0,
            entries: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the next tick must rescan.
    pub fn needs_refresh(&self, now: Instant) -> bool {
        match (self.state, self.last_refresh) {
            (CacheState::Fresh, Some(last)) => now.saturating_duration_since(last) >= self.ttl,
            _ => true,
        }
    }

    /// Rebuild all associations from a snapshot.
    pub fn refresh(&mut self, snapshot: &[EntityRecord], now: Instant) -> RefreshSummary {
        self.generation += 1;
        let generation = self.generation;
        self.entries.clear();

        // Pass 1: every companion of a tracked kind.
        for record in snapshot {
            if record.kind != EntityKind::BattleNpc
                || !record.object_id.is_valid()
                || !record.owner_id.is_valid()
            {
                continue;
            }
            let kind = CompanionKind::from_model_id(record.model_id);
            if !kind.is_tracked() {
                continue;
            }
            self.entries.insert(
                record.object_id,
                AssociationEntry {
                    companion: EntityHandle {
                        object_id: record.object_id,
                        generation,
                    },
                    kind,
                    name: record.name.clone(),
                    owner_ref: record.owner_id,
                    owner: None,
                    resolved: false,
                },
            );
        }

        // Pass 2: attach owners by raw owner id.
        for player in snapshot.iter().filter(|r| r.is_player()) {
            for entry in self.entries.values_mut() {
                if entry.owner_ref == player.object_id {
                    entry.owner = Some(EntityHandle {
                        object_id: player.object_id,
                        generation,
                    });
                }
            }
        }

        let paired = self.entries.values().filter(|e| e.owner.is_some()).count();
        self.state = CacheState::Fresh;
        self.last_refresh = Some(now);
        self.stats.refresh_count += 1;
        self.stats.last_refreshed_at = Some(Utc::now());
        self.stats.tracked = self.entries.len();
        self.stats.paired = paired;

        debug!(
            generation,
            entities = snapshot.len(),
            tracked = self.entries.len(),
            paired,
            "Association cache refreshed"
        );

        RefreshSummary {
            generation,
            tracked: self.entries.len(),
            paired,
        }
    }

    /// Force a rescan on the next tick.
    pub fn invalidate(&mut self) {
        self.state = CacheState::Stale;
    }

    /// Make every entry eligible for resolution again.
    pub fn reset_resolved(&mut self) {
        for entry in self.entries.values_mut() {
            entry.resolved = false;
        }
    }

    /// Entries still awaiting a scale, in object id order.
    pub fn unresolved(&self) -> Vec<AssociationEntry> {
        self.entries
            .values()
            .filter(|e| !e.resolved)
            .cloned()
            .collect()
    }

    pub fn mark_resolved(&mut self, object_id: ObjectId) {
        if let Some(entry) = self.entries.get_mut(&object_id) {
            entry.resolved = true;
        }
    }

    pub fn lookup(&self, object_id: ObjectId) -> Option<&AssociationEntry> {
        self.entries.get(&object_id)
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.entries.contains_key(&object_id)
    }

    /// Whether a handle was issued by the current generation.
    pub fn is_current(&self, handle: &EntityHandle) -> bool {
        handle.generation == self.generation && self.state == CacheState::Fresh
    }

    pub fn entries(&self) -> impl Iterator<Item = &AssociationEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
