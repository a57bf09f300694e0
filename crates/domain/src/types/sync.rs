//! Queued mutation records and queue counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_label_conversions;

/// Priority of a queued mutation or cached resource.
///
/// Variants are declared lowest to highest so the derived `Ord` sorts
/// `Critical` last; sync ordering sorts descending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl_domain_label_conversions!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

/// Kind of mutation replayed against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl_domain_label_conversions!(OperationKind {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// A locally made mutation waiting for delivery.
///
/// Only `retry_count` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    pub entity_name: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub enqueued_at: i64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub priority: Priority,
}

impl SyncOperation {
    pub fn new(
        kind: OperationKind,
        entity_name: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
        max_retries: u32,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            entity_name: entity_name.into(),
            payload,
            enqueued_at,
            retry_count: 0,
            max_retries,
            priority,
        }
    }

    /// 1 on first delivery, 2 on the first redelivery, and so on. Handlers
    /// can key deduplication on `(id, delivery_attempt)`.
    pub fn delivery_attempt(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Retry budget spent; the operation is dead-lettered.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Aggregate queue counters, persisted next to the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: usize,
    /// Operations dead-lettered after exhausting their retries.
    pub failed: u64,
    pub completed: u64,
    /// Operations dropped by overflow eviction.
    #[serde(default)]
    pub evicted: u64,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl QueueStats {
    /// Whether anything was lost and the user should be told.
    pub fn has_data_loss(&self) -> bool {
        self.failed > 0 || self.evicted > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates descending priority sort puts critical first.
    ///
    /// Assertions:
    /// - Confirms order after `sort_by(|a, b| b.cmp(a))`.
    #[test]
    fn test_priority_order() {
        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        priorities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    /// Validates retry accounting helpers.
    ///
    /// Assertions:
    /// - Confirms a fresh operation is on delivery attempt 1.
    /// - Ensures the operation is exhausted once `retry_count == max_retries`.
    #[test]
    fn test_retry_accounting() {
        let mut op = SyncOperation::new(
            OperationKind::Update,
            "proposal",
            serde_json::json!({ "id": 7, "status": "sent" }),
            Priority::High,
            2,
            0,
        );
        assert_eq!(op.delivery_attempt(), 1);
        assert!(!op.is_exhausted());

        op.retry_count = 2;
        assert_eq!(op.delivery_attempt(), 3);
        assert!(op.is_exhausted());
    }

    /// Validates counters written before `evicted` existed still load.
    ///
    /// Assertions:
    /// - Confirms missing fields default to zero / `None`.
    #[test]
    fn test_stats_backward_compatible() {
        let stats: QueueStats =
            serde_json::from_str(r#"{"pending":2,"failed":1,"completed":9}"#).unwrap();
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.last_sync_at, None);
        assert!(stats.has_data_loss());
    }
}
