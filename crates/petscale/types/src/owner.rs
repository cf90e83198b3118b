//! Owner identities and host object ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved owner name of the wildcard identity.
pub const OTHER_PLAYERS: &str = "Other players";

/// Host object id of a live entity.
///
/// Only valid for the snapshot it was read from; the engine re-fetches the
/// entity by id before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Host sentinel for "no object".
    pub const INVALID: ObjectId = ObjectId(0xE000_0000);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// Identity of a companion owner as stored in a rule or observed live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerIdentity {
    /// Display name.
    pub name: String,
    /// Stable numeric id, 0 when unknown.
    pub content_id: u64,
    /// World id, 0 when unknown.
    pub world_id: u16,
    /// Matches any owner other than the local player.
    pub generic: bool,
}

impl OwnerIdentity {
    /// A fully identified owner.
    pub fn new(name: impl Into<String>, content_id: u64, world_id: u16) -> Self {
        Self {
            name: name.into(),
            content_id,
            world_id,
            generic: false,
        }
    }

    /// A legacy name-only owner awaiting migration.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, 0, 0)
    }

    /// The wildcard "Other players" identity.
    pub fn other_players() -> Self {
        Self {
            name: OTHER_PLAYERS.to_string(),
            content_id: 0,
            world_id: 0,
            generic: true,
        }
    }

    /// True while the stable id or world id is still missing.
    pub fn is_pending(&self) -> bool {
        !self.generic && (self.content_id == 0 || self.world_id == 0)
    }

    /// True when an observation carries enough to finalize a pending rule.
    pub fn is_complete(&self) -> bool {
        self.content_id != 0 && self.world_id != 0
    }

    /// Whether a specific rule with this identity governs the observed owner.
    ///
    /// Identities that carry a stable id match only by that id, even while
    /// the world id is missing. Name-only identities match by name.
    pub fn matches_observed(&self, observed: &OwnerIdentity) -> bool {
        if self.generic {
            return false;
        }
        if self.content_id != 0 {
            self.content_id == observed.content_id
        } else {
            self.name == observed.name
        }
    }

    /// Whether two rule identities denote the same owner for uniqueness.
    pub fn same_owner(&self, other: &OwnerIdentity) -> bool {
        match (self.generic, other.generic) {
            (true, true) => self.name == other.name,
            (false, false) if self.content_id != 0 && other.content_id != 0 => {
                self.content_id == other.content_id
            }
            (false, false) => self.name == other.name,
            _ => false,
        }
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generic || self.is_pending() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({:X}@{})", self.name, self.content_id, self.world_id)
        }
    }
}
