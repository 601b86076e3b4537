//! Persistence for the user's rule list.
//!
//! The whole collection is read and replaced as one JSON document; there is
//! no incremental update. A broken store degrades to "no rules" rather than
//! taking the service down.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing as log;
use uuid::Uuid;

use super::{NotificationRule, engine};

pub struct RuleStore {
    path: PathBuf,
    rules: Vec<NotificationRule>,
}

impl RuleStore {
    /// Loads the store from `path`, degrading to an empty rule list if the
    /// file is missing, unreadable or malformed.
    pub fn load(path: impl Into<PathBuf>) -> RuleStore {
        let path = path.into();
        let rules = match read_rules(&path) {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!(
                    "failed to load rules from {}: {e:#}; starting with none",
                    path.display()
                );
                Vec::new()
            }
        };
        RuleStore { path, rules }
    }

    pub fn rules(&self) -> &[NotificationRule] {
        &self.rules
    }

    /// The enabled rules in evaluation order.
    pub fn prepared(&self) -> Vec<&NotificationRule> {
        engine::prepare(&self.rules)
    }

    pub fn add(&mut self, rule: NotificationRule) -> anyhow::Result<()> {
        self.rules.push(rule);
        self.save()
    }

    /// Replaces the rule with the same id.
    pub fn update(&mut self, rule: NotificationRule) -> anyhow::Result<()> {
        let slot = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .with_context(|| format!("no rule with id {}", rule.id))?;
        *slot = rule;
        self.save()
    }

    /// Removes a rule by id. Returns false (without touching the file) if no
    /// such rule exists.
    pub fn remove(&mut self, id: Uuid) -> anyhow::Result<bool> {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        if self.rules.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Reorders the list to match `order` and reassigns each rule's priority
    /// to its new list position. `order` must mention every rule exactly
    /// once.
    pub fn reorder(&mut self, order: &[Uuid]) -> anyhow::Result<()> {
        if order.len() != self.rules.len() {
            anyhow::bail!(
                "reorder lists {} ids but the store holds {} rules",
                order.len(),
                self.rules.len()
            );
        }
        let mut reordered = Vec::with_capacity(self.rules.len());
        for id in order {
            let pos = self
                .rules
                .iter()
                .position(|r| r.id == *id)
                .with_context(|| format!("no rule with id {id}"))?;
            reordered.push(self.rules.remove(pos));
        }
        for (position, rule) in reordered.iter_mut().enumerate() {
            rule.priority = position as i64;
        }
        self.rules = reordered;
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(&self.rules)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write rules to {}", self.path.display()))
    }
}

fn read_rules(path: &Path) -> anyhow::Result<Vec<NotificationRule>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&contents)
        .with_context(|| format!("malformed rule store at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ConditionField, ConditionOperator, RuleAction, RuleCondition};

    fn sample_rule(name: &str, priority: i64) -> NotificationRule {
        let mut rule = NotificationRule::new(name, priority);
        rule.conditions = vec![RuleCondition {
            field: ConditionField::Repository,
            operator: ConditionOperator::Matches,
            value: "rust-lang/*".to_string(),
        }];
        rule.actions = vec![RuleAction::SuppressAlert];
        rule
    }

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        let mut store = RuleStore::load(&path);
        store.add(sample_rule("one", 0)).unwrap();
        store.add(sample_rule("two", 1)).unwrap();

        let reloaded = RuleStore::load(&path);
        assert_eq!(reloaded.rules(), store.rules());
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::load(dir.path().join("nope.json"));
        assert!(store.rules().is_empty());
    }

    #[test]
    fn corrupt_file_degrades_to_no_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let store = RuleStore::load(&path);
        assert!(store.rules().is_empty());
    }

    #[test]
    fn update_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path().join("rules.json"));
        let rule = sample_rule("before", 0);
        let id = rule.id;
        store.add(rule).unwrap();

        let mut changed = store.rules()[0].clone();
        changed.name = "after".to_string();
        store.update(changed).unwrap();
        assert_eq!(store.rules()[0].name, "after");
        assert_eq!(store.rules()[0].id, id);

        let mut unknown = sample_rule("ghost", 9);
        unknown.id = Uuid::new_v4();
        assert!(store.update(unknown).is_err());
    }

    #[test]
    fn remove_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path().join("rules.json"));
        let rule = sample_rule("doomed", 0);
        let id = rule.id;
        store.add(rule).unwrap();

        assert!(store.remove(id).unwrap());
        assert!(store.rules().is_empty());
        assert!(!store.remove(id).unwrap());
    }

    #[test]
    fn reorder_reassigns_priorities_to_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path().join("rules.json"));
        store.add(sample_rule("a", 0)).unwrap();
        store.add(sample_rule("b", 1)).unwrap();
        store.add(sample_rule("c", 2)).unwrap();

        let ids: Vec<Uuid> = store.rules().iter().map(|r| r.id).collect();
        store.reorder(&[ids[2], ids[0], ids[1]]).unwrap();

        let names: Vec<&str> = store.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
        let priorities: Vec<i64> = store.rules().iter().map(|r| r.priority).collect();
        assert_eq!(priorities, [0, 1, 2]);
    }

    #[test]
    fn prepared_view_is_enabled_only_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path().join("rules.json"));
        store.add(sample_rule("low", 5)).unwrap();
        let mut disabled = sample_rule("disabled", 1);
        disabled.is_enabled = false;
        store.add(disabled).unwrap();
        store.add(sample_rule("high", 0)).unwrap();

        let prepared = store.prepared();
        let names: Vec<&str> = prepared.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["high", "low"]);
    }
}
