//! Editorial workflow: unpublished entries moving through review.
//!
//! [`EditorialWorkflow`] is a projection of the review area keyed by
//! `collection.slug`. Each entry sits in exactly one status bucket; a
//! published entry leaves the tracker.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::{Entry, workflow_key};
use crate::error::{QuireError, Result};

/// Review status of an unpublished entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Work in progress
    #[default]
    Draft,
    /// Waiting for a reviewer
    PendingReview,
    /// Approved, ready to publish
    PendingPublish,
}

impl WorkflowStatus {
    /// All statuses in board order.
    pub const ALL: [WorkflowStatus; 3] = [
        WorkflowStatus::Draft,
        WorkflowStatus::PendingReview,
        WorkflowStatus::PendingPublish,
    ];

    /// Configuration/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::PendingReview => "pending_review",
            WorkflowStatus::PendingPublish => "pending_publish",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = crate::error::QuireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WorkflowStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::error::QuireError::Config(format!("unknown workflow status '{s}'")))
    }
}

// ==================== Tracker ====================

/// Result of asking the tracker to publish an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The entry was ready and has left the tracker
    Published(Box<Entry>),
    /// The entry is not at `pending_publish`; it stays where it was
    NotReady(WorkflowStatus),
    /// No such entry is tracked
    Unknown,
}

/// Unpublished entries grouped by status.
#[derive(Debug, Clone, Default)]
pub struct EditorialWorkflow {
    entries: IndexMap<String, Entry>,
}

impl EditorialWorkflow {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked set with `entries`. Entries without a status
    /// are tracked as drafts.
    pub fn load(&mut self, entries: Vec<Entry>) {
        self.entries.clear();
        for entry in entries {
            self.track(entry);
        }
    }

    /// Track or replace one entry.
    pub fn track(&mut self, mut entry: Entry) {
        entry.status.get_or_insert_default();
        self.entries.insert(entry.workflow_key(), entry);
    }

    /// Tracked entry, if any.
    pub fn get(&self, collection: &str, slug: &str) -> Option<&Entry> {
        self.entries.get(&workflow_key(collection, slug))
    }

    /// Status of a tracked entry.
    pub fn status(&self, collection: &str, slug: &str) -> Option<WorkflowStatus> {
        self.get(collection, slug).and_then(|e| e.status)
    }

    /// Entries at `status`, in tracking order.
    pub fn by_status(&self, status: WorkflowStatus) -> Vec<&Entry> {
        self.entries
            .values()
            .filter(|e| e.status == Some(status))
            .collect()
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is under review.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that an entry may be published.
    pub fn ensure_publishable(&self, collection: &str, slug: &str) -> Result<()> {
        let key = workflow_key(collection, slug);
        match self.entries.get(&key).and_then(|e| e.status) {
            Some(WorkflowStatus::PendingPublish) => Ok(()),
            Some(_) => Err(QuireError::NotReady(key)),
            None => Err(QuireError::NotFound(key)),
        }
    }

    /// Publish an entry: only one at `pending_publish` leaves the tracker.
    pub fn publish(&mut self, collection: &str, slug: &str) -> PublishOutcome {
        let key = workflow_key(collection, slug);
        match self.entries.get(&key).and_then(|e| e.status) {
            Some(WorkflowStatus::PendingPublish) => match self.entries.shift_remove(&key) {
                Some(entry) => PublishOutcome::Published(Box::new(entry)),
                None => PublishOutcome::Unknown,
            },
            Some(status) => PublishOutcome::NotReady(status),
            None => PublishOutcome::Unknown,
        }
    }

    /// Move an entry to `status`, returning the previous status.
    pub fn move_status(&mut self, collection: &str, slug: &str, status: WorkflowStatus) -> Result<WorkflowStatus> {
        let key = workflow_key(collection, slug);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| QuireError::NotFound(key.clone()))?;
        let previous = entry.status.replace(status).unwrap_or_default();
        Ok(previous)
    }

    /// Stop tracking an entry.
    pub fn remove(&mut self, collection: &str, slug: &str) -> Option<Entry> {
        self.entries.shift_remove(&workflow_key(collection, slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slug: &str, status: WorkflowStatus) -> Entry {
        let mut entry = Entry::new("posts", slug, format!("content/posts/{slug}.md"));
        entry.status = Some(status);
        entry
    }

    fn tracker() -> EditorialWorkflow {
        let mut tracker = EditorialWorkflow::new();
        tracker.load(vec![
            entry("a", WorkflowStatus::Draft),
            entry("b", WorkflowStatus::PendingReview),
            entry("c", WorkflowStatus::PendingPublish),
        ]);
        tracker
    }

    #[test]
    fn status_names_round_trip() {
        for status in WorkflowStatus::ALL {
            assert_eq!(status.as_str().parse::<WorkflowStatus>().unwrap(), status);
        }
        assert!("published".parse::<WorkflowStatus>().is_err());
    }

    #[test]
    fn publish_requires_pending_publish() {
        let mut tracker = tracker();
        assert_eq!(tracker.publish("posts", "a"), PublishOutcome::NotReady(WorkflowStatus::Draft));
        assert_eq!(
            tracker.publish("posts", "b"),
            PublishOutcome::NotReady(WorkflowStatus::PendingReview)
        );
        assert_eq!(tracker.by_status(WorkflowStatus::Draft).len(), 1);
        assert!(matches!(
            tracker.ensure_publishable("posts", "b"),
            Err(QuireError::NotReady(_))
        ));

        assert!(matches!(tracker.publish("posts", "c"), PublishOutcome::Published(_)));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.publish("posts", "c"), PublishOutcome::Unknown);
    }

    #[test]
    fn moving_keeps_one_bucket_per_entry() {
        let mut tracker = tracker();
        let previous = tracker
            .move_status("posts", "a", WorkflowStatus::PendingPublish)
            .unwrap();
        assert_eq!(previous, WorkflowStatus::Draft);
        assert!(tracker.by_status(WorkflowStatus::Draft).is_empty());
        assert_eq!(tracker.by_status(WorkflowStatus::PendingPublish).len(), 2);
        assert!(tracker.move_status("posts", "zzz", WorkflowStatus::Draft).is_err());
    }

    #[test]
    fn untracked_entries_get_draft_status() {
        let mut tracker = EditorialWorkflow::new();
        tracker.track(Entry::new("posts", "x", "content/posts/x.md"));
        assert_eq!(tracker.status("posts", "x"), Some(WorkflowStatus::Draft));
        assert!(tracker.remove("posts", "x").is_some());
        assert!(tracker.is_empty());
    }
}
