//! Identity merging
//!
//! Collapses the raw identities of one person into their canonical name
//! using the configured [`AliasTable`](crate::config::AliasTable):
//!
//! 1. For every alias-table entry, message counts are summed, activity logs
//!    concatenated (canonical first, then aliases in table order) and the
//!    earliest join date kept.
//! 2. Identities the table does not mention pass through unchanged.
//! 3. Excluded names are dropped from the message counts only. Their logs
//!    and join dates stay reachable.
//!
//! Absent entries read as zero, empty or unknown; merging never fails.

use crate::config::GroupConfig;
use crate::types::{ActivityLogs, JoinDates, MessageCounts};

/// Merger output, keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedIdentities {
    pub messages: MessageCounts,
    pub activity_logs: ActivityLogs,
    pub joined_at: JoinDates,
}

/// Folds aliases into canonical members.
pub struct IdentityMerger<'c> {
    config: &'c GroupConfig,
}

impl<'c> IdentityMerger<'c> {
    pub fn new(config: &'c GroupConfig) -> Self {
        Self { config }
    }

    /// Merge parser output. Pure: the inputs are only read.
    pub fn merge(
        &self,
        messages: &MessageCounts,
        activity_logs: &ActivityLogs,
        joined_at: &JoinDates,
    ) -> MergedIdentities {
        let mut merged = MergedIdentities::default();

        for entry in self.config.aliases.entries() {
            let identities = || {
                std::iter::once(entry.name.as_str()).chain(entry.aliases.iter().map(String::as_str))
            };

            let seen = identities().any(|id| {
                messages.contains_key(id) || activity_logs.contains_key(id) || joined_at.contains_key(id)
            });
            if !seen {
                continue;
            }

            let total: u64 = identities().map(|id| messages.get_or_default(id)).sum();
            let participant = identities().any(|id| messages.contains_key(id));
            if total > 0 || participant {
                merged.messages.insert(entry.name.clone(), total);
            }

            let logs: Vec<String> = identities()
                .flat_map(|id| activity_logs.get_or_default(id))
                .collect();
            merged.activity_logs.insert(entry.name.clone(), logs);

            if let Some(earliest) = identities().filter_map(|id| joined_at.get(id)).min() {
                merged.joined_at.insert(entry.name.clone(), *earliest);
            }
        }

        for (member, count) in messages.iter() {
            if self.config.aliases.is_mapped(member) {
                continue;
            }
            merged.messages.insert(member, *count);
            if let Some(log) = activity_logs.get(member) {
                merged.activity_logs.insert(member, log.clone());
            }
            if let Some(date) = joined_at.get(member) {
                merged.joined_at.insert(member, *date);
            }
        }

        for excluded in self.config.excluded_names() {
            if merged.messages.remove(excluded).is_some() {
                tracing::debug!(member = excluded, "Excluded from member counts");
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasTable;
    use chrono::NaiveDateTime;

    fn date(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn config_with(aliases: AliasTable) -> GroupConfig {
        GroupConfig {
            aliases,
            ..Default::default()
        }
    }

    #[test]
    fn test_alias_counts_are_summed() {
        let config = config_with(AliasTable::from_pairs([("Alice", vec!["Alice Phone2"])]));
        let messages: MessageCounts = [("Alice", 3), ("Alice Phone2", 2)].into_iter().collect();

        let merged =
            IdentityMerger::new(&config).merge(&messages, &ActivityLogs::new(), &JoinDates::new());

        assert_eq!(merged.messages.get_or_default("Alice"), 5);
        assert!(!merged.messages.contains_key("Alice Phone2"));
    }

    #[test]
    fn test_logs_concatenate_in_table_order() {
        let config = config_with(AliasTable::from_pairs([("Alice", vec!["A1", "A2"])]));
        let messages: MessageCounts = [("A2", 1), ("Alice", 1), ("A1", 1)].into_iter().collect();
        let logs: ActivityLogs = [
            ("A2", vec!["a2 joined".to_string()]),
            ("Alice", vec!["alice added".to_string()]),
            ("A1", vec!["a1 joined".to_string()]),
        ]
        .into_iter()
        .collect();

        let merged = IdentityMerger::new(&config).merge(&messages, &logs, &JoinDates::new());

        assert_eq!(
            merged.activity_logs.get_or_default("Alice"),
            vec!["alice added", "a1 joined", "a2 joined"]
        );
    }

    #[test]
    fn test_join_date_is_minimum_over_aliases() {
        let config = config_with(AliasTable::from_pairs([("Alice", vec!["A1", "A2"])]));
        let messages: MessageCounts = [("A1", 1)].into_iter().collect();
        let joined: JoinDates = [
            ("Alice", date("2024-03-01 00:00:00")),
            ("A2", date("2023-05-01 00:00:00")),
        ]
        .into_iter()
        .collect();

        let merged = IdentityMerger::new(&config).merge(&messages, &ActivityLogs::new(), &joined);
        assert_eq!(merged.joined_at.get("Alice"), Some(&date("2023-05-01 00:00:00")));
    }

    #[test]
    fn test_merge_is_independent_of_input_order() {
        let config = config_with(AliasTable::from_pairs([("A", vec!["A1", "A2"])]));
        let logs_for = |order: &[&str]| -> ActivityLogs {
            order
                .iter()
                .map(|id| (*id, vec![format!("{id} log")]))
                .collect()
        };
        let counts_for = |order: &[&str]| -> MessageCounts {
            order.iter().map(|id| (*id, id.len() as u64)).collect()
        };
        let joined_for = |order: &[&str]| -> JoinDates {
            order
                .iter()
                .map(|id| (*id, date(&format!("2024-01-0{} 00:00:00", &id[1..]))))
                .collect()
        };

        let merger = IdentityMerger::new(&config);
        let forward = merger.merge(
            &counts_for(&["A1", "A2"]),
            &logs_for(&["A1", "A2"]),
            &joined_for(&["A1", "A2"]),
        );
        let backward = merger.merge(
            &counts_for(&["A2", "A1"]),
            &logs_for(&["A2", "A1"]),
            &joined_for(&["A2", "A1"]),
        );

        assert_eq!(forward, backward);
        assert_eq!(forward.joined_at.get("A"), Some(&date("2024-01-01 00:00:00")));
        assert_eq!(
            forward.activity_logs.get_or_default("A"),
            vec!["A1 log", "A2 log"]
        );
    }

    #[test]
    fn test_unmapped_members_pass_through() {
        let config = config_with(AliasTable::from_pairs([("Alice", vec!["Alice Phone2"])]));
        let messages: MessageCounts = [("Bob", 4)].into_iter().collect();
        let logs: ActivityLogs = [("Bob", vec!["Added by Dana".to_string()])]
            .into_iter()
            .collect();
        let joined: JoinDates = [("Bob", date("2024-01-01 00:00:00"))].into_iter().collect();

        let merged = IdentityMerger::new(&config).merge(&messages, &logs, &joined);

        assert_eq!(merged.messages.get_or_default("Bob"), 4);
        assert_eq!(merged.activity_logs.get_or_default("Bob"), vec!["Added by Dana"]);
        assert_eq!(merged.joined_at.get("Bob"), Some(&date("2024-01-01 00:00:00")));
        // Alice never appeared anywhere
        assert!(!merged.messages.contains_key("Alice"));
        assert!(!merged.activity_logs.contains_key("Alice"));
        assert!(!merged.joined_at.contains_key("Alice"));
    }

    #[test]
    fn test_excluded_names_leave_message_counts_only() {
        let config = GroupConfig {
            group_name: "Hiking Club".to_string(),
            left_chat: vec!["Gone".to_string()],
            ..Default::default()
        };
        let messages: MessageCounts = [("Hiking Club", 7), ("Gone", 2), ("Bob", 1)]
            .into_iter()
            .collect();
        let logs: ActivityLogs = [("Gone", vec!["Added by Dana".to_string()])]
            .into_iter()
            .collect();
        let joined: JoinDates = [("Gone", date("2024-01-01 00:00:00"))].into_iter().collect();

        let merged = IdentityMerger::new(&config).merge(&messages, &logs, &joined);

        let members: Vec<_> = merged.messages.keys().collect();
        assert_eq!(members, vec!["Bob"]);
        assert!(merged.activity_logs.contains_key("Gone"));
        assert!(merged.joined_at.contains_key("Gone"));
    }

    #[test]
    fn test_zero_count_canonical_participant_is_kept() {
        let config = config_with(AliasTable::from_pairs([("Bob", vec!["Bob Tablet"])]));
        let messages: MessageCounts = [("Bob Tablet", 0)].into_iter().collect();

        let merged =
            IdentityMerger::new(&config).merge(&messages, &ActivityLogs::new(), &JoinDates::new());
        assert_eq!(merged.messages.get("Bob"), Some(&0));
    }

    #[test]
    fn test_merge_is_idempotent_for_unmapped_names() {
        let config = GroupConfig::default();
        let messages: MessageCounts = [("Bob", 2), ("Carol", 5)].into_iter().collect();
        let logs: ActivityLogs = [
            ("Bob", vec!["Added by Dana".to_string()]),
            ("Carol", vec!["Joined via link".to_string()]),
        ]
        .into_iter()
        .collect();
        let joined: JoinDates = [("Carol", date("2024-02-02 00:00:00"))].into_iter().collect();

        let merger = IdentityMerger::new(&config);
        let once = merger.merge(&messages, &logs, &joined);
        let twice = merger.merge(&once.messages, &once.activity_logs, &once.joined_at);
        assert_eq!(once, twice);
    }
}
