//! Ordered rule table.
//!
//! Rules are kept sorted with every wildcard rule ahead of every specific
//! rule, then by owner name (ordinal) and kind name. Resolution relies on that
//! order: the wildcard group is visited first so a specific rule visited later
//! supersedes it. The wildcard group length is recomputed on every mutation.

use std::cmp::Ordering;

use petscale_types::{CompanionKind, KindTarget, OwnerIdentity, RuleRow, ScaleRule, SizeSelector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

/// Outcome of [`RuleStore::add_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleChange {
    Inserted,
    Updated,
    Unchanged,
}

/// The rule table.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<ScaleRule>,
    wildcard_len: usize,
    dirty: bool,
}

fn canonical_order(a: &ScaleRule, b: &ScaleRule) -> Ordering {
    b.owner
        .generic
        .cmp(&a.owner.generic)
        .then_with(|| a.owner.name.cmp(&b.owner.name))
        .then_with(|| a.target.name().cmp(b.target.name()))
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from validated rules. Later duplicates update earlier ones.
    pub fn from_rules(rules: impl IntoIterator<Item = ScaleRule>) -> Self {
        let mut store = Self::new();
        for rule in rules {
            if let Err(e) = rule.validate() {
                warn!(rule = %rule, error = %e, "Dropping invalid rule");
                continue;
            }
            store.upsert(rule);
        }
        store.reindex();
        store.dirty = false;
        store
    }

    /// Build from persisted rows, skipping rows that fail validation.
    pub fn from_rows(rows: impl IntoIterator<Item = RuleRow>) -> Self {
        let rules = rows.into_iter().filter_map(|row| {
            let name = row.name.clone();
            match ScaleRule::try_from(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(owner = %name, error = %e, "Dropping invalid persisted rule");
                    None
                }
            }
        });
        Self::from_rules(rules)
    }

    pub fn rules(&self) -> &[ScaleRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&ScaleRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Insert a rule, or update the selector of the rule with the same owner
    /// and kind.
    pub fn add_or_update(&mut self, rule: ScaleRule) -> EngineResult<RuleChange> {
        rule.validate()?;

        let description = rule.to_string();
        let change = self.upsert(rule);
        if change != RuleChange::Unchanged {
            self.reindex();
            self.dirty = true;
            info!(rule = %description, change = ?change, "Rule table changed");
        }
        Ok(change)
    }

    fn upsert(&mut self, rule: ScaleRule) -> RuleChange {
        let existing = self
            .rules
            .iter_mut()
            .find(|r| r.target == rule.target && r.owner.same_owner(&rule.owner));

        match existing {
            None => {
                self.rules.push(rule);
                RuleChange::Inserted
            }
            Some(current) => {
                let mut changed = !same_size(&current.size, &rule.size);
                current.size = rule.size;

                // A finalized identity supersedes a pending one for the same
                // owner, never the other way round.
                if current.owner.is_pending() && !rule.owner.is_pending() {
                    current.owner = rule.owner;
                    changed = true;
                }

                if changed {
                    RuleChange::Updated
                } else {
                    RuleChange::Unchanged
                }
            }
        }
    }

    /// Remove the rule at `index` in canonical order.
    pub fn remove(&mut self, index: usize) -> EngineResult<ScaleRule> {
        if index >= self.rules.len() {
            return Err(EngineError::RuleIndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        let removed = self.rules.remove(index);
        self.reindex();
        self.dirty = true;
        info!(rule = %removed, "Rule removed");
        Ok(removed)
    }

    /// Remove every rule, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.rules.len();
        self.rules.clear();
        self.reindex();
        if count > 0 {
            self.dirty = true;
            info!(count, "Rule table cleared");
        }
        count
    }

    /// Wildcard rules and specific rules, in visit order.
    pub fn split(&self) -> (&[ScaleRule], &[ScaleRule]) {
        self.rules.split_at(self.wildcard_len)
    }

    /// Index of the last wildcard rule, `None` when there are none.
    pub fn wildcard_boundary(&self) -> Option<usize> {
        self.wildcard_len.checked_sub(1)
    }

    /// Attach a stable identity to a migration-pending rule.
    ///
    /// Returns false when the rule is already finalized or generic.
    pub fn backfill(&mut self, index: usize, content_id: u64, world_id: u16) -> bool {
        let Some(rule) = self.rules.get_mut(index) else {
            return false;
        };
        if !rule.owner.is_pending() || content_id == 0 || world_id == 0 {
            return false;
        }
        // A stable id entered by the user is never replaced.
        if rule.owner.content_id != 0 && rule.owner.content_id != content_id {
            return false;
        }
        rule.owner.content_id = content_id;
        rule.owner.world_id = world_id;
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn to_rows(&self) -> Vec<RuleRow> {
        self.rules.iter().map(ScaleRule::to_row).collect()
    }

    /// Distinct owner names, in table order.
    pub fn owner_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.owner.name) {
                names.push(rule.owner.name.clone());
            }
        }
        names
    }

    /// Rules that may decide a companion's scale, in visit order.
    ///
    /// Wildcard rules come first and are skipped entirely for the local
    /// player's companions; specific rules must match the observed owner. A
    /// rule is listed only when its target covers `kind` and its selector is
    /// usable for that kind. The last rule that yields a scale decides.
    pub fn applicable_rules<'a>(
        &'a self,
        owner: &'a OwnerIdentity,
        kind: CompanionKind,
        owner_is_local: bool,
    ) -> impl Iterator<Item = (usize, &'a ScaleRule)> + 'a {
        let first = if owner_is_local { self.wildcard_len } else { 0 };
        self.rules
            .iter()
            .enumerate()
            .skip(first)
            .filter(move |(_, rule)| {
                (rule.owner.generic || rule.owner.matches_observed(owner))
                    && rule.target.covers(kind)
                    && selector_fits(&rule.size, kind)
            })
    }

    fn reindex(&mut self) {
        self.rules.sort_by(canonical_order);
        self.wildcard_len = self.rules.iter().take_while(|r| r.owner.generic).count();
    }
}

fn selector_fits(size: &SizeSelector, kind: CompanionKind) -> bool {
    match size {
        SizeSelector::Custom(_) => kind.is_custom_eligible(),
        _ => true,
    }
}

fn same_size(a: &SizeSelector, b: &SizeSelector) -> bool {
    match (a, b) {
        (SizeSelector::Custom(x), SizeSelector::Custom(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(owner: OwnerIdentity, kind: KindTarget, size: SizeSelector) -> ScaleRule {
        ScaleRule::new(owner, kind, size).unwrap()
    }

    fn bahamut(owner: OwnerIdentity, size: SizeSelector) -> ScaleRule {
        rule(owner, KindTarget::Kind(CompanionKind::Bahamut), size)
    }

    #[test]
    fn test_wildcards_sort_first() {
        let mut store = RuleStore::new();
        store
            .add_or_update(bahamut(OwnerIdentity::named("Aaron"), SizeSelector::Small))
            .unwrap();
        store
            .add_or_update(bahamut(OwnerIdentity::other_players(), SizeSelector::Large))
            .unwrap();
        store
            .add_or_update(rule(
                OwnerIdentity::named("Zed"),
                KindTarget::AllKinds,
                SizeSelector::Medium,
            ))
            .unwrap();

        let names: Vec<&str> = store.rules().iter().map(|r| r.owner.name.as_str()).collect();
        assert_eq!(names, vec!["Other players", "Aaron", "Zed"]);
        assert_eq!(store.wildcard_boundary(), Some(0));

        let (wildcard, specific) = store.split();
        assert_eq!(wildcard.len(), 1);
        assert_eq!(specific.len(), 2);
    }

    #[test]
    fn test_name_order_is_ordinal() {
        let store = RuleStore::from_rules(vec![
            bahamut(OwnerIdentity::named("bob"), SizeSelector::Small),
            bahamut(OwnerIdentity::named("Bob"), SizeSelector::Small),
        ]);
        assert_eq!(store.rules()[0].owner.name, "Bob");
        assert_eq!(store.rules()[1].owner.name, "bob");
    }

    #[test]
    fn test_all_kinds_sorts_before_kinds_of_same_owner() {
        let owner = OwnerIdentity::named("Foo");
        let store = RuleStore::from_rules(vec![
            rule(owner.clone(), KindTarget::Kind(CompanionKind::Eos), SizeSelector::Custom(0.8)),
            rule(owner, KindTarget::AllKinds, SizeSelector::Small),
        ]);
        assert_eq!(store.rules()[0].target, KindTarget::AllKinds);
    }

    #[test]
    fn test_add_or_update_reports_change() {
        let mut store = RuleStore::new();
        let owner = OwnerIdentity::named("Foo");

        let first = store.add_or_update(bahamut(owner.clone(), SizeSelector::Small)).unwrap();
        assert_eq!(first, RuleChange::Inserted);
        let again = store.add_or_update(bahamut(owner.clone(), SizeSelector::Small)).unwrap();
        assert_eq!(again, RuleChange::Unchanged);
        let updated = store.add_or_update(bahamut(owner, SizeSelector::Large)).unwrap();
        assert_eq!(updated, RuleChange::Updated);

        assert_eq!(store.len(), 1);
        assert_eq!(store.rules()[0].size, SizeSelector::Large);
    }

    #[test]
    fn test_finalized_rules_unique_by_stable_id() {
        let mut store = RuleStore::new();
        store
            .add_or_update(bahamut(OwnerIdentity::new("Foo", 1234, 73), SizeSelector::Small))
            .unwrap();
        let change = store
            .add_or_update(bahamut(OwnerIdentity::new("Foo Renamed", 1234, 73), SizeSelector::Large))
            .unwrap();
        assert_eq!(change, RuleChange::Updated);

        let other = store
            .add_or_update(bahamut(OwnerIdentity::new("Foo", 999, 73), SizeSelector::Large))
            .unwrap();
        assert_eq!(other, RuleChange::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_finalized_identity_replaces_pending() {
        let mut store = RuleStore::new();
        store
            .add_or_update(bahamut(OwnerIdentity::named("Foo"), SizeSelector::Small))
            .unwrap();
        let change = store
            .add_or_update(bahamut(OwnerIdentity::new("Foo", 1234, 73), SizeSelector::Small))
            .unwrap();
        assert_eq!(change, RuleChange::Updated);
        assert_eq!(store.rules()[0].owner.content_id, 1234);
    }

    #[test]
    fn test_invalid_rule_rejected_at_boundary() {
        let mut store = RuleStore::new();
        let bad = ScaleRule {
            owner: OwnerIdentity::named("Foo"),
            target: KindTarget::Kind(CompanionKind::Bahamut),
            size: SizeSelector::Custom(0.9),
        };
        let err = store.add_or_update(bad).unwrap_err();
        assert!(matches!(err, EngineError::Rule(_)));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_remove_recomputes_boundary() {
        let mut store = RuleStore::from_rules(vec![
            bahamut(OwnerIdentity::other_players(), SizeSelector::Small),
            bahamut(OwnerIdentity::named("Foo"), SizeSelector::Large),
        ]);
        assert_eq!(store.wildcard_boundary(), Some(0));

        let removed = store.remove(0).unwrap();
        assert!(removed.is_generic());
        assert_eq!(store.wildcard_boundary(), None);
        assert!(store.is_dirty());

        let err = store.remove(5).unwrap_err();
        assert!(matches!(err, EngineError::RuleIndexOutOfRange { index: 5, len: 1 }));
    }

    #[test]
    fn test_applicable_rules_in_visit_order() {
        let store = RuleStore::from_rules(vec![
            bahamut(OwnerIdentity::named("Foo"), SizeSelector::Large),
            bahamut(OwnerIdentity::other_players(), SizeSelector::Small),
            rule(OwnerIdentity::other_players(), KindTarget::AllKinds, SizeSelector::Medium),
            bahamut(OwnerIdentity::named("Bar"), SizeSelector::Medium),
        ]);

        let foo = OwnerIdentity::new("Foo", 1234, 73);
        let indexes: Vec<usize> = store
            .applicable_rules(&foo, CompanionKind::Bahamut, false)
            .map(|(i, _)| i)
            .collect();
        // "AllKinds" sorts before "Bahamut"; Bar's rule does not match Foo.
        assert_eq!(indexes, vec![0, 1, 3]);
        assert_eq!(store.rules()[3].owner.name, "Foo");

        let phoenix: Vec<usize> = store
            .applicable_rules(&foo, CompanionKind::Phoenix, false)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(phoenix, vec![0]);
    }

    #[test]
    fn test_applicable_rules_skip_wildcards_for_local_player() {
        let store = RuleStore::from_rules(vec![rule(
            OwnerIdentity::other_players(),
            KindTarget::AllKinds,
            SizeSelector::Custom(0.8),
        )]);
        let me = OwnerIdentity::new("Me", 1, 1);

        assert_eq!(store.applicable_rules(&me, CompanionKind::Eos, true).count(), 0);
        assert_eq!(store.applicable_rules(&me, CompanionKind::Eos, false).count(), 1);
    }

    #[test]
    fn test_applicable_rules_drop_custom_for_preset_kind() {
        let store = RuleStore::from_rules(vec![rule(
            OwnerIdentity::other_players(),
            KindTarget::AllKinds,
            SizeSelector::Custom(0.8),
        )]);
        let stranger = OwnerIdentity::new("Stranger", 5678, 73);

        assert_eq!(
            store.applicable_rules(&stranger, CompanionKind::Bahamut, false).count(),
            0
        );
    }

    #[test]
    fn test_backfill_keeps_user_stable_id() {
        let mut store = RuleStore::from_rules(vec![bahamut(
            OwnerIdentity::new("Foo", 1234, 0),
            SizeSelector::Small,
        )]);
        assert!(!store.backfill(0, 5678, 73));
        assert!(!store.is_dirty());

        assert!(store.backfill(0, 1234, 73));
        assert_eq!(store.rules()[0].owner.content_id, 1234);
        assert_eq!(store.rules()[0].owner.world_id, 73);
    }

    #[test]
    fn test_clear() {
        let mut store = RuleStore::from_rules(vec![
            bahamut(OwnerIdentity::other_players(), SizeSelector::Small),
            bahamut(OwnerIdentity::named("Foo"), SizeSelector::Large),
        ]);
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.wildcard_boundary(), None);
    }

    #[test]
    fn test_backfill_only_once() {
        let mut store = RuleStore::from_rules(vec![bahamut(
            OwnerIdentity::named("Foo"),
            SizeSelector::Small,
        )]);
        assert!(store.backfill(0, 1234, 73));
        assert!(!store.backfill(0, 999, 73));
        assert_eq!(store.rules()[0].owner.content_id, 1234);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_from_rows_skips_invalid() {
        let rows = vec![
            bahamut(OwnerIdentity::named("Foo"), SizeSelector::Small).to_row(),
            RuleRow {
                name: "Bar".to_string(),
                stable_id: 0,
                world_id: 0,
                kind: KindTarget::Kind(CompanionKind::Titan),
                size_selector: petscale_types::SizeTag::Custom,
                custom_value: 0.7,
                generic: None,
            },
        ];
        let store = RuleStore::from_rows(rows);
        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_owner_names_distinct() {
        let store = RuleStore::from_rules(vec![
            bahamut(OwnerIdentity::named("Foo"), SizeSelector::Small),
            rule(OwnerIdentity::named("Foo"), KindTarget::AllKinds, SizeSelector::Small),
            bahamut(OwnerIdentity::other_players(), SizeSelector::Small),
        ]);
        assert_eq!(store.owner_names(), vec!["Other players".to_string(), "Foo".to_string()]);
    }
}
