//! Forced-override state machine.
//!
//! A global [`OverrideMode`] forces overridable companions to a uniform
//! scale. Each forced companion gets a record so the force can be undone
//! later, but only while the companion still carries the forced scale.

use std::collections::HashMap;

use petscale_types::{CompanionKind, ObjectId, OverrideMode};
use tracing::{debug, info};

/// A companion currently held at the forced scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForcedOverride {
    pub kind: CompanionKind,
    pub scale: f32,
}

/// What reconciling a companion did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// No record for this companion.
    NotForced,
    /// Record removed; the companion should be set to this scale.
    Reverted(f32),
    /// Record removed; the scale was changed by someone else and is left
    /// alone.
    Diverged,
}

/// Tracks the override mode and every forced companion.
#[derive(Debug, Clone)]
pub struct OverrideController {
    mode: OverrideMode,
    forced_scale: f32,
    native_scale: f32,
    records: HashMap<ObjectId, ForcedOverride>,
}

impl OverrideController {
    pub fn new(mode: OverrideMode, forced_scale: f32, native_scale: f32) -> Self {
        Self {
            mode,
            forced_scale,
            native_scale,
            records: HashMap::new(),
        }
    }

    pub fn mode(&self) -> OverrideMode {
        self.mode
    }

    pub fn forced_scale(&self) -> f32 {
        self.forced_scale
    }

    /// Change the mode. Returns false when it was already set.
    pub fn set_mode(&mut self, mode: OverrideMode) -> bool {
        if self.mode == mode {
            return false;
        }
        info!(from = %self.mode, to = %mode, forced = self.records.len(), "Override mode changed");
        self.mode = mode;
        true
    }

    /// Whether the current mode forces this companion.
    pub fn wants_force(&self, kind: CompanionKind, owner_is_local: bool) -> bool {
        kind.is_overridable() && self.mode.applies_to(owner_is_local)
    }

    /// Record a forced companion and return the scale to apply.
    pub fn force(&mut self, companion: ObjectId, kind: CompanionKind) -> f32 {
        self.records.insert(
            companion,
            ForcedOverride {
                kind,
                scale: self.forced_scale,
            },
        );
        debug!(companion = %companion, kind = %kind, scale = self.forced_scale, "Forced override");
        self.forced_scale
    }

    /// Lift a force that no longer applies.
    pub fn reconcile(&mut self, companion: ObjectId, current_scale: Option<f32>) -> Reconciliation {
        let Some(record) = self.records.remove(&companion) else {
            return Reconciliation::NotForced;
        };

        match current_scale {
            Some(current) if (current - record.scale).abs() <= f32::EPSILON => {
                debug!(companion = %companion, scale = self.native_scale, "Reverting forced override");
                Reconciliation::Reverted(self.native_scale)
            }
            _ => {
                debug!(companion = %companion, current = ?current_scale, "Forced scale changed externally, leaving it");
                Reconciliation::Diverged
            }
        }
    }

    /// Drop a record because an explicit rule now governs the companion.
    pub fn release(&mut self, companion: ObjectId) -> bool {
        self.records.remove(&companion).is_some()
    }

    /// Keep only records for companions that still exist.
    pub fn retain_live(&mut self, mut live: impl FnMut(ObjectId) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| live(*id));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_forced(&self, companion: ObjectId) -> bool {
        self.records.contains_key(&companion)
    }

    pub fn record(&self, companion: ObjectId) -> Option<&ForcedOverride> {
        self.records.get(&companion)
    }

    pub fn forced_count(&self) -> usize {
        self.records.len()
    }
}
