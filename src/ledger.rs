//! Timeline ledger.
//!
//! Each submission carries an ordered record of every status change it went
//! through. The record is a value: appending produces a new timeline and
//! leaves the original untouched, so a caller holding an older timeline never
//! observes entries added by somebody else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::slice;
use uuid::Uuid;

use crate::db::types::Status;

/// A single, immutable record of a status change.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Status the submission entered.
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    /// Human-readable description of the change.
    pub note: String,
    /// User who caused this change.
    #[serde(rename = "actorId")]
    pub actor: Uuid,
}

impl Entry {
    /// Create an entry timestamped now.
    pub fn new(status: Status, note: String, actor: Uuid) -> Entry {
        Entry {
            status,
            timestamp: Utc::now(),
            note,
            actor,
        }
    }
}

/// Chronologically ordered sequence of [`Entry`]s.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<Entry>,
}

impl Timeline {
    /// Start a new timeline with its first entry.
    pub fn seeded(entry: Entry) -> Timeline {
        Timeline {
            entries: vec![entry],
        }
    }

    /// Create a copy of this timeline with an additional entry at the end.
    pub fn appended(&self, entry: Entry) -> Timeline {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(entry);
        Timeline { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn iter(&self) -> slice::Iter<Entry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: Status, note: &str) -> Entry {
        Entry::new(status, note.to_string(), Uuid::nil())
    }

    #[test]
    fn append_copies() {
        let first = Timeline::seeded(entry(Status::Submitted, "first"));
        let second = first.appended(entry(Status::Received, "second"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second.entries()[0], first.entries()[0]);
        assert_eq!(second.last().unwrap().status, Status::Received);
    }

    #[test]
    fn append_preserves_prefix() {
        let mut timeline = Timeline::seeded(entry(Status::Submitted, "0"));

        for (inx, &status) in Status::ALL.iter().enumerate() {
            let next = timeline.appended(entry(status, &inx.to_string()));
            assert_eq!(&next.entries()[..timeline.len()], timeline.entries());
            timeline = next;
        }

        assert_eq!(timeline.len(), Status::ALL.len() + 1);
    }

    #[test]
    fn serialized_shape() {
        let timeline = Timeline::seeded(entry(Status::Submitted, "note"));
        let value = serde_json::to_value(&timeline).unwrap();
        let first = &value.as_array().unwrap()[0];

        assert_eq!(first["status"], "submitted");
        assert_eq!(first["note"], "note");
        assert_eq!(first["actorId"], Uuid::nil().to_string());
        assert!(first["timestamp"].is_string());
    }
}
