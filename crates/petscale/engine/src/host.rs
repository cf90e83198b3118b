//! Host world interface.
//!
//! The engine never owns entities. It reads a snapshot through
//! [`WorldHost::enumerate_entities`] on refresh and re-fetches individual
//! entities by [`ObjectId`] before acting on them, so no host reference ever
//! outlives the call that produced it.

use std::cell::Cell;
use std::collections::BTreeMap;

use petscale_types::{ObjectId, OwnerIdentity};
use serde::{Deserialize, Serialize};

/// Broad classification of a host entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A player character.
    Player,
    /// A non-player battle entity; companions are of this kind.
    BattleNpc,
    Other,
}

/// One row of a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub object_id: ObjectId,
    pub kind: EntityKind,
    /// Raw model id, mapped onto a companion kind by the engine.
    #[serde(default)]
    pub model_id: i32,
    /// Object id of the owner, [`ObjectId::INVALID`] when unowned.
    #[serde(default = "invalid_object")]
    pub owner_id: ObjectId,
    pub name: String,
    /// Stable character id, 0 when the host does not expose it.
    #[serde(default)]
    pub content_id: u64,
    #[serde(default)]
    pub world_id: u16,
    #[serde(default)]
    pub is_local_player: bool,
}

fn invalid_object() -> ObjectId {
    ObjectId::INVALID
}

impl EntityRecord {
    /// A player character.
    pub fn player(object_id: u32, name: impl Into<String>, content_id: u64, world_id: u16) -> Self {
        Self {
            object_id: ObjectId(object_id),
            kind: EntityKind::Player,
            model_id: 0,
            owner_id: ObjectId::INVALID,
            name: name.into(),
            content_id,
            world_id,
            is_local_player: false,
        }
    }

    /// A companion owned by `owner_id`.
    pub fn companion(object_id: u32, name: impl Into<String>, model_id: i32, owner_id: u32) -> Self {
        Self {
            object_id: ObjectId(object_id),
            kind: EntityKind::BattleNpc,
            model_id,
            owner_id: ObjectId(owner_id),
            name: name.into(),
            content_id: 0,
            world_id: 0,
            is_local_player: false,
        }
    }

    pub fn local(mut self) -> Self {
        self.is_local_player = true;
        self
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player && self.object_id.is_valid()
    }

    /// Identity as observed live.
    pub fn owner_identity(&self) -> OwnerIdentity {
        OwnerIdentity::new(self.name.clone(), self.content_id, self.world_id)
    }
}

/// Primitives the engine consumes from the host.
pub trait WorldHost {
    /// The local player, `None` while logged out.
    fn local_player(&self) -> Option<EntityRecord>;

    /// Full snapshot of the entity table. Called once per refresh.
    fn enumerate_entities(&self) -> Vec<EntityRecord>;

    /// Re-fetch a single entity by id.
    fn entity(&self, object_id: ObjectId) -> Option<EntityRecord>;

    /// Whether the entity is drawn. Invisible companions are not acted on.
    fn is_visible(&self, object_id: ObjectId) -> bool;

    /// Scale currently applied to the entity.
    fn current_scale(&self, object_id: ObjectId) -> Option<f32>;

    /// Set the entity's scale. Must be safe to repeat with the same value.
    fn apply_scale(&mut self, object_id: ObjectId, scale: f32);
}

#[derive(Debug, Clone)]
struct WorldSlot {
    record: EntityRecord,
    visible: bool,
    scale: f32,
}

/// In-memory world used by tests and the scenario simulator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorld {
    slots: BTreeMap<ObjectId, WorldSlot>,
    applied: Vec<(ObjectId, f32)>,
    enumerations: Cell<usize>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity. New entities are visible at scale 1.0.
    pub fn insert(&mut self, record: EntityRecord) {
        let slot = WorldSlot {
            record,
            visible: true,
            scale: 1.0,
        };
        self.slots.insert(slot.record.object_id, slot);
    }

    pub fn remove(&mut self, object_id: ObjectId) {
        self.slots.remove(&object_id);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn set_visible(&mut self, object_id: ObjectId, visible: bool) {
        if let Some(slot) = self.slots.get_mut(&object_id) {
            slot.visible = visible;
        }
    }

    /// Change a scale without recording it as an engine application.
    pub fn set_scale(&mut self, object_id: ObjectId, scale: f32) {
        if let Some(slot) = self.slots.get_mut(&object_id) {
            slot.scale = scale;
        }
    }

    pub fn scale_of(&self, object_id: ObjectId) -> Option<f32> {
        self.slots.get(&object_id).map(|slot| slot.scale)
    }

    /// Every `apply_scale` call in order.
    pub fn applied(&self) -> &[(ObjectId, f32)] {
        &self.applied
    }

    pub fn clear_applied(&mut self) {
        self.applied.clear();
    }

    /// Number of full snapshots taken.
    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl WorldHost for InMemoryWorld {
    fn local_player(&self) -> Option<EntityRecord> {
        self.slots
            .values()
            .find(|slot| slot.record.is_local_player && slot.record.kind == EntityKind::Player)
            .map(|slot| slot.record.clone())
    }

    fn enumerate_entities(&self) -> Vec<EntityRecord> {
        self.enumerations.set(self.enumerations.get() + 1);
        self.slots.values().map(|slot| slot.record.clone()).collect()
    }

    fn entity(&self, object_id: ObjectId) -> Option<EntityRecord> {
        self.slots.get(&object_id).map(|slot| slot.record.clone())
    }

    fn is_visible(&self, object_id: ObjectId) -> bool {
        self.slots.get(&object_id).is_some_and(|slot| slot.visible)
    }

    fn current_scale(&self, object_id: ObjectId) -> Option<f32> {
        self.scale_of(object_id)
    }

    fn apply_scale(&mut self, object_id: ObjectId, scale: f32) {
        if let Some(slot) = self.slots.get_mut(&object_id) {
            slot.scale = scale;
            self.applied.push((object_id, scale));
        }
    }
}
