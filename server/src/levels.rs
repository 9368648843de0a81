//! Group-wide level progression
//!
//! Every combat group advances through levels together: a level is done once
//! every live member of the group has reported completing it. Membership is
//! read fresh from the registry on each report, so players who join, leave or
//! get evicted mid-level immediately change what "everyone" means.
//!
//! Lock order is group state first, then registry. The registry never takes
//! the group lock.

use crate::registry::PlayerRegistry;
use log::{debug, info};
use shared::LevelCompletionResponse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Progress of one combat group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupLevelState {
    pub current_level: i64,
    /// Players that finished `current_level`
    pub completed_ids: HashSet<String>,
}

impl GroupLevelState {
    fn rebase(&mut self, level: i64) {
        self.current_level = level;
        self.completed_ids.clear();
    }
}

/// Result of a single completion report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOutcome {
    pub all_completed: bool,
    pub current_level: i64,
    /// Members still missing, sorted; empty when `all_completed`
    pub waiting_for: Vec<String>,
}

impl LevelOutcome {
    pub fn to_response(&self) -> LevelCompletionResponse {
        if self.all_completed {
            LevelCompletionResponse::completed(self.current_level)
        } else {
            LevelCompletionResponse::waiting(self.current_level, self.waiting_for.clone())
        }
    }
}

pub struct LevelTracker {
    groups: RwLock<HashMap<String, GroupLevelState>>,
    registry: Arc<PlayerRegistry>,
}

impl LevelTracker {
    pub fn new(registry: Arc<PlayerRegistry>) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// Records that `player_id` finished `level` in `group`.
    ///
    /// A report for a level the group already left is answered as completed
    /// without touching state. A report for a level ahead of the group moves
    /// the group there and discards earlier completions.
    pub async fn report_completion(&self, player_id: &str, group: &str, level: i64) -> LevelOutcome {
        let mut groups = self.groups.write().await;
        let state = groups.entry(group.to_string()).or_default();

        if level < state.current_level {
            debug!(
                "Stale report from {} for level {} in group '{}' (current {})",
                player_id, level, group, state.current_level
            );
            return LevelOutcome {
                all_completed: true,
                current_level: state.current_level,
                waiting_for: Vec::new(),
            };
        }

        if level > state.current_level {
            info!(
                "Group '{}' jumped from level {} to {}",
                group, state.current_level, level
            );
            state.rebase(level);
        }

        state.completed_ids.insert(player_id.to_string());

        let members = self.registry.members_of(group).await;
        let mut waiting_for: Vec<String> = members
            .difference(&state.completed_ids)
            .cloned()
            .collect();
        waiting_for.sort();

        info!(
            "Group '{}': {}/{} members completed level {}",
            group,
            members.len() - waiting_for.len(),
            members.len(),
            state.current_level
        );

        if waiting_for.is_empty() {
            // pinned at the top so the level never wraps backwards
            let next = state.current_level.saturating_add(1);
            state.rebase(next);
            info!("Group '{}' advanced to level {}", group, next);
            return LevelOutcome {
                all_completed: true,
                current_level: next,
                waiting_for,
            };
        }

        LevelOutcome {
            all_completed: false,
            current_level: state.current_level,
            waiting_for,
        }
    }

    pub async fn current_level(&self, group: &str) -> Option<i64> {
        self.groups.read().await.get(group).map(|s| s.current_level)
    }

    pub async fn completed_ids(&self, group: &str) -> Option<HashSet<String>> {
        self.groups
            .read()
            .await
            .get(group)
            .map(|s| s.completed_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{dummy_player, DUMMY_GROUP_TAG};

    async fn tracker_with(members: &[(&str, &str)]) -> (LevelTracker, Arc<PlayerRegistry>) {
        let registry = Arc::new(PlayerRegistry::new());
        for (id, group) in members {
            registry.upsert_group_tag(id, group, 0).await;
        }
        (LevelTracker::new(Arc::clone(&registry)), registry)
    }

    #[tokio::test]
    async fn test_consensus_requires_every_member() {
        let (tracker, _) = tracker_with(&[("A", "g"), ("B", "g"), ("C", "g")]).await;

        // bring the group to level 2
        let outcome = tracker.report_completion("A", "g", 2).await;
        assert!(!outcome.all_completed);
        assert_eq!(outcome.current_level, 2);

        let outcome = tracker.report_completion("B", "g", 2).await;
        assert!(!outcome.all_completed);
        assert_eq!(outcome.current_level, 2);
        assert_eq!(outcome.waiting_for, vec!["C".to_string()]);

        let outcome = tracker.report_completion("C", "g", 2).await;
        assert!(outcome.all_completed);
        assert_eq!(outcome.current_level, 3);
        assert!(outcome.waiting_for.is_empty());
        assert_eq!(tracker.completed_ids("g").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_stale_report_does_not_mutate() {
        let (tracker, _) = tracker_with(&[("A", "g"), ("B", "g")]).await;
        tracker.report_completion("A", "g", 2).await;
        tracker.report_completion("B", "g", 2).await;
        assert_eq!(tracker.current_level("g").await, Some(3));

        tracker.report_completion("A", "g", 3).await;
        let before = tracker.completed_ids("g").await.unwrap();

        let outcome = tracker.report_completion("B", "g", 1).await;
        assert_eq!(
            outcome,
            LevelOutcome {
                all_completed: true,
                current_level: 3,
                waiting_for: Vec::new()
            }
        );
        assert_eq!(tracker.completed_ids("g").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_jump_ahead_discards_earlier_completions() {
        let (tracker, _) = tracker_with(&[("A", "g"), ("B", "g")]).await;
        tracker.report_completion("A", "g", 0).await;
        assert!(tracker.completed_ids("g").await.unwrap().contains("A"));

        let outcome = tracker.report_completion("B", "g", 4).await;
        assert!(!outcome.all_completed);
        assert_eq!(outcome.current_level, 4);
        assert_eq!(outcome.waiting_for, vec!["A".to_string()]);

        let completed = tracker.completed_ids("g").await.unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed.contains("B"));
    }

    #[tokio::test]
    async fn test_levels_advance_by_one_per_consensus() {
        let (tracker, _) = tracker_with(&[("A", "g"), ("B", "g")]).await;
        let mut observed = Vec::new();

        for level in 0..5 {
            observed.push(tracker.report_completion("A", "g", level).await.current_level);
            observed.push(tracker.report_completion("B", "g", level).await.current_level);
        }

        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(observed, vec![0, 1, 1, 2, 2, 3, 3, 4, 4, 5]);
    }

    #[tokio::test]
    async fn test_huge_level_never_wraps() {
        let (tracker, _) = tracker_with(&[]).await;
        let request = shared::control::decode_level_completion(
            br#"{"playerId":"a","combatId":"g","levelNum":1e300}"#,
        )
        .unwrap();
        assert_eq!(request.level(), i64::MAX);

        let outcome = tracker.report_completion("a", "g", request.level()).await;
        assert!(outcome.all_completed);
        assert_eq!(outcome.current_level, i64::MAX);

        let outcome = tracker.report_completion("a", "g", i64::MAX).await;
        assert_eq!(outcome.current_level, i64::MAX);
        assert_eq!(tracker.current_level("g").await, Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_empty_group_completes_on_first_report() {
        let (tracker, _) = tracker_with(&[]).await;
        let outcome = tracker.report_completion("loner", "empty", 0).await;
        assert!(outcome.all_completed);
        assert_eq!(outcome.current_level, 1);
    }

    #[tokio::test]
    async fn test_seed_player_never_blocks_consensus() {
        let registry = Arc::new(PlayerRegistry::new().with_seed(dummy_player(0)));
        registry.upsert_group_tag("A", DUMMY_GROUP_TAG, 0).await;
        let tracker = LevelTracker::new(Arc::clone(&registry));

        let outcome = tracker.report_completion("A", DUMMY_GROUP_TAG, 0).await;
        assert!(outcome.all_completed);
    }

    #[tokio::test]
    async fn test_evicted_member_stops_blocking() {
        let (tracker, registry) = tracker_with(&[("A", "g"), ("B", "g"), ("C", "g")]).await;

        let outcome = tracker.report_completion("A", "g", 0).await;
        assert!(!outcome.all_completed);

        // C disappears before finishing; membership is recomputed per report
        registry.remove("C").await;

        let outcome = tracker.report_completion("B", "g", 0).await;
        assert!(outcome.all_completed);
        assert_eq!(outcome.current_level, 1);
    }

    #[tokio::test]
    async fn test_evicted_reporter_left_in_completed_set() {
        let (tracker, registry) = tracker_with(&[("A", "g"), ("B", "g")]).await;
        tracker.report_completion("A", "g", 0).await;
        registry.remove("A").await;

        // A's stale completion is not purged but does not matter either
        assert!(tracker.completed_ids("g").await.unwrap().contains("A"));
        let outcome = tracker.report_completion("B", "g", 0).await;
        assert!(outcome.all_completed);
    }

    #[tokio::test]
    async fn test_late_joiner_raises_threshold() {
        let (tracker, registry) = tracker_with(&[("A", "g"), ("B", "g")]).await;
        tracker.report_completion("A", "g", 0).await;

        registry.upsert_group_tag("D", "g", 0).await;

        let outcome = tracker.report_completion("B", "g", 0).await;
        assert!(!outcome.all_completed);
        assert_eq!(outcome.waiting_for, vec!["D".to_string()]);
    }

    #[tokio::test]
    async fn test_groups_are_independent() {
        let (tracker, _) = tracker_with(&[("A", "g1"), ("B", "g2"), ("C", "g2")]).await;

        assert!(tracker.report_completion("A", "g1", 0).await.all_completed);
        assert!(!tracker.report_completion("B", "g2", 0).await.all_completed);
        assert_eq!(tracker.current_level("g1").await, Some(1));
        assert_eq!(tracker.current_level("g2").await, Some(0));
        assert_eq!(tracker.current_level("g3").await, None);
    }

    #[tokio::test]
    async fn test_outcome_to_response() {
        let done = LevelOutcome {
            all_completed: true,
            current_level: 4,
            waiting_for: Vec::new(),
        };
        assert_eq!(done.to_response(), LevelCompletionResponse::completed(4));

        let pending = LevelOutcome {
            all_completed: false,
            current_level: 2,
            waiting_for: vec!["x".to_string()],
        };
        let response = pending.to_response();
        assert!(!response.all_completed);
        assert_eq!(response.current_level, Some(2));
        assert_eq!(response.waiting_for_players, Some(vec!["x".to_string()]));
    }
}
