//! Snapshot of a group's active members, used only for name reconciliation.
//!
//! A roster is built fresh for every pass and passed explicitly to the
//! reconciler; nothing here is cached. A member added after the snapshot was
//! taken is simply invisible to that pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::reconcile::normalize_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub member: Member,
    /// Normalized, token-sorted form of the name used for scoring.
    pub key: String,
}

/// Active members of one group at a point in time, in insertion order.
///
/// Insertion order is what the reconciler uses to break ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterIndex {
    pub group_id: i64,
    pub built_at: DateTime<Utc>,
    entries: Vec<RosterEntry>,
}

impl RosterIndex {
    pub fn new(group_id: i64, members: Vec<Member>) -> Self {
        let mut entries: Vec<RosterEntry> = Vec::with_capacity(members.len());
        for member in members {
            // Same member listed twice (e.g. two group_members rows) keeps its first slot
            if entries.iter().any(|e| e.member.id == member.id) {
                continue;
            }
            let key = normalize_name(&member.name);
            entries.push(RosterEntry { member, key });
        }
        Self {
            group_id,
            built_at: Utc::now(),
            entries,
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names, passed to extractors as hint context.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.member.name.clone()).collect()
    }

    pub fn get(&self, member_id: i64) -> Option<&Member> {
        self.entries
            .iter()
            .map(|e| &e.member)
            .find(|m| m.id == member_id)
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.get(member_id).is_some()
    }
}

/// Anything that can produce a roster snapshot for a group.
///
/// Failing to build a roster is fatal to the pipeline.
pub trait RosterSource {
    fn build_roster(&self, group_id: i64) -> Result<RosterIndex, PipelineError>;
}
