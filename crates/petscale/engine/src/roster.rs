//! Selectable owners for the rule editor.

use petscale_types::OTHER_PLAYERS;
use serde::{Deserialize, Serialize};

use crate::host::EntityRecord;

/// Names offered when adding a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRoster {
    capacity: usize,
    names: Vec<String>,
}

impl PlayerRoster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            names: Vec::new(),
        }
    }

    /// Local player, the wildcard, then every other player in the snapshot.
    pub fn rebuild_live(&mut self, local: &EntityRecord, snapshot: &[EntityRecord]) {
        self.names.clear();
        self.push(&local.name);
        self.push(OTHER_PLAYERS);
        for player in snapshot.iter().filter(|r| r.is_player()) {
            if player.object_id == local.object_id {
                continue;
            }
            self.push(&player.name);
        }
    }

    /// Owners already present in the rule table.
    pub fn rebuild_offline(&mut self, owner_names: impl IntoIterator<Item = String>) {
        self.names.clear();
        for name in owner_names {
            self.push(&name);
        }
    }

    fn push(&mut self, name: &str) {
        if self.names.len() < self.capacity && !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Selectable players, excluding the wildcard entry.
    pub fn player_count(&self, logged_in: bool) -> usize {
        if !logged_in || self.names.len() < 2 {
            0
        } else {
            self.names.len() - 1
        }
    }
}
