//! Display grouping of the flat notification list.

use std::collections::HashMap;

use crate::github::Notification;

/// A set of notifications sharing a group key, for one row of the UI.
#[derive(Debug, Clone)]
pub struct NotificationGroup {
    pub key: String,
    /// Members in input order. Never empty.
    pub notifications: Vec<Notification>,
}

impl NotificationGroup {
    /// The member with the greatest `updated_at`; ties go to the earliest
    /// input position.
    pub fn latest(&self) -> &Notification {
        self.notifications
            .iter()
            .reduce(|best, n| if n.updated_at > best.updated_at { n } else { best })
            .expect("groups are never empty")
    }
}

/// Partitions `notifications` by group key and sorts the groups by their
/// latest update, newest first.
///
/// Pure and recomputed in full on every call; callers memoize if they need
/// to.
pub fn group(notifications: &[Notification]) -> Vec<NotificationGroup> {
    let mut groups: Vec<NotificationGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for n in notifications {
        match index.get(n.group_key()) {
            Some(&slot) => groups[slot].notifications.push(n.clone()),
            None => {
                index.insert(n.group_key(), groups.len());
                groups.push(NotificationGroup {
                    key: n.group_key().to_string(),
                    notifications: vec![n.clone()],
                });
            }
        }
    }
    // Stable sort: groups with equal timestamps keep first-seen order.
    groups.sort_by(|a, b| b.latest().updated_at.cmp(&a.latest().updated_at));
    groups
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::tests::notification;

    #[test]
    fn every_notification_forms_its_own_group() {
        let now = Utc::now();
        let list = vec![
            notification().id("a").updated_at(now).build(),
            notification().id("b").updated_at(now + Duration::minutes(5)).build(),
        ];
        let groups = group(&list);
        assert_eq!(groups.len(), 2);
        // Newest first.
        assert_eq!(groups[0].key, "b");
        assert_eq!(groups[1].key, "a");
        for g in &groups {
            assert!(g.notifications.iter().all(|n| n.group_key() == g.key));
            assert!(g.notifications.iter().any(|n| n.id == g.latest().id));
        }
    }

    #[test]
    fn latest_breaks_ties_by_input_order() {
        let now = Utc::now();
        let list = vec![
            notification().id("x").updated_at(now).build(),
            notification().id("y").updated_at(now).build(),
        ];
        let groups = group(&list);
        assert_eq!(groups[0].key, "x");
        assert_eq!(groups[1].key, "y");
    }

    #[test]
    fn grouping_is_idempotent() {
        let now = Utc::now();
        let list = vec![
            notification().id("a").updated_at(now).build(),
            notification().id("b").updated_at(now + Duration::minutes(1)).build(),
            notification().id("c").updated_at(now - Duration::minutes(1)).build(),
        ];
        let once = group(&list);
        let flattened: Vec<_> = once
            .iter()
            .flat_map(|g| g.notifications.iter().cloned())
            .collect();
        let twice = group(&flattened);

        let partition =
            |gs: &[NotificationGroup]| -> Vec<(String, Vec<String>)> {
                gs.iter()
                    .map(|g| {
                        (
                            g.key.clone(),
                            g.notifications.iter().map(|n| n.id.clone()).collect(),
                        )
                    })
                    .collect()
            };
        assert_eq!(partition(&once), partition(&twice));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group(&[]).is_empty());
    }
}
