//! What a commit writes, decided before touching the store.
//!
//! [`CommitPlan::build`] walks a reconciled draft and sorts every row into
//! "write" or "reject". A row whose owner is not settled is rejected on its
//! own and never written with a null owner. A strategy whose suggester is not
//! settled is still written, with no suggester. The session-level sentiment row
//! has no owner and is always written when its category is in scope.
//!
//! Every planned row carries an item key (its owner's [`RefPath`], or
//! `sentiment` for the session row). The store keeps a ledger of the keys it
//! has written, so a follow-up commit after corrections writes only what is
//! new and never inserts the same item twice.
//!
//! The store executes the plan in one transaction through [`DraftWriter`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::{
    AttendanceRecord, Category, ChallengeGroup, Draft, ExtractedNameRef, Goal, MarketingGroup,
    RefPath, SentimentStatement, SessionSentiment, StuckDetection,
};
use crate::error::PipelineError;

/// Ledger key of the session-level sentiment row.
pub const SENTIMENT_ITEM: &str = "sentiment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Refuse to commit while any in-scope reference needs review.
    Strict,
    /// Write settled rows, report the rest as rejected.
    #[default]
    Partial,
}

/// Which categories to persist, and how to treat unsettled references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitScope {
    pub categories: BTreeSet<Category>,
    pub policy: CommitPolicy,
}

impl CommitScope {
    pub fn all(policy: CommitPolicy) -> Self {
        Self {
            categories: Category::ALL.into_iter().collect(),
            policy,
        }
    }

    pub fn only(categories: impl IntoIterator<Item = Category>, policy: CommitPolicy) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            policy,
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The owner still needs review.
    Unresolved { raw_name: String },
    /// Same member already has an attendance row for this session.
    DuplicateAttendance { member_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub category: Category,
    pub item_path: RefPath,
    pub reason: RejectReason,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReport {
    pub session_id: i64,
    pub committed_at: DateTime<Utc>,
    /// Top-level items written per category.
    pub written: BTreeMap<Category, usize>,
    /// Rows inserted per table, including child rows.
    pub rows_by_table: BTreeMap<String, usize>,
    pub rejected: Vec<Rejection>,
    /// In-scope categories not written because extraction failed.
    pub skipped: Vec<Category>,
    /// Item keys left alone because an earlier commit already wrote them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub already_committed: Vec<String>,
}

impl CommitReport {
    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }

    /// In-scope categories that ended with nothing left to write.
    pub fn settled_categories(&self, scope: &CommitScope) -> BTreeSet<Category> {
        scope
            .categories
            .iter()
            .copied()
            .filter(|c| !self.skipped.contains(c) && !self.rejected.iter().any(|r| r.category == *c))
            .collect()
    }
}

/// Writes a reconciled draft atomically: every planned row or none of them.
///
/// Items the store has already written for the session are never written
/// again. When nothing new is left to write and nothing was rejected, the
/// writer must refuse with [`PipelineError::AlreadyCommitted`] without
/// writing anything.
pub trait DraftWriter {
    fn write_draft(
        &self,
        session_id: i64,
        run_id: Option<&str>,
        draft: &Draft,
        scope: &CommitScope,
    ) -> Result<CommitReport, PipelineError>;
}

/// One planned row and the settled owner it is written under.
#[derive(Debug)]
pub struct PlannedRow<'a, T> {
    pub path: RefPath,
    pub member_id: i64,
    pub item: &'a T,
}

impl<T> PlannedRow<'_, T> {
    pub fn key(&self) -> String {
        self.path.to_string()
    }
}

/// Rows to write for one commit, borrowed from the draft.
#[derive(Debug, Default)]
pub struct CommitPlan<'a> {
    pub attendance: Vec<PlannedRow<'a, AttendanceRecord>>,
    pub goals: Vec<PlannedRow<'a, Goal>>,
    pub challenges: Vec<PlannedRow<'a, ChallengeGroup>>,
    pub marketing: Vec<PlannedRow<'a, MarketingGroup>>,
    pub stucks: Vec<PlannedRow<'a, StuckDetection>>,
    pub sentiment: Option<&'a SessionSentiment>,
    pub statements: Vec<PlannedRow<'a, SentimentStatement>>,
    pub rejected: Vec<Rejection>,
    pub skipped: Vec<Category>,
    pub already_committed: Vec<String>,
}

impl<'a> CommitPlan<'a> {
    pub fn build(draft: &'a Draft, scope: &CommitScope) -> Self {
        let mut plan = CommitPlan::default();

        for category in Category::ALL {
            if scope.includes(category) && !draft.is_ok(category) {
                plan.skipped.push(category);
            }
        }

        if scope.includes(Category::Attendance) {
            if let Some(rows) = draft.attendance.value() {
                for (index, row) in rows.iter().enumerate() {
                    let path = RefPath::Attendance { index };
                    let Some(member_id) = plan.owner(path, &row.extracted_name) else {
                        continue;
                    };
                    if plan.attendance.iter().any(|r| r.member_id == member_id) {
                        plan.reject(path, RejectReason::DuplicateAttendance { member_id });
                        continue;
                    }
                    plan.attendance.push(PlannedRow { path, member_id, item: row });
                }
            }
        }

        if scope.includes(Category::Goals) {
            if let Some(goals) = draft.goals.value() {
                for (index, goal) in goals.iter().enumerate() {
                    let path = RefPath::GoalOwner { index };
                    if let Some(member_id) = plan.owner(path, &goal.owner) {
                        plan.goals.push(PlannedRow { path, member_id, item: goal });
                    }
                }
            }
        }

        if scope.includes(Category::Challenges) {
            if let Some(groups) = draft.challenges.value() {
                for (group, cg) in groups.iter().enumerate() {
                    let path = RefPath::ChallengeOwner { group };
                    if let Some(member_id) = plan.owner(path, &cg.owner) {
                        plan.challenges.push(PlannedRow { path, member_id, item: cg });
                    }
                }
            }
        }

        if scope.includes(Category::Marketing) {
            if let Some(groups) = draft.marketing_activities.value() {
                for (group, mg) in groups.iter().enumerate() {
                    let path = RefPath::MarketingOwner { group };
                    if let Some(member_id) = plan.owner(path, &mg.owner) {
                        plan.marketing.push(PlannedRow { path, member_id, item: mg });
                    }
                }
            }
        }

        if scope.includes(Category::Stucks) {
            if let Some(stucks) = draft.stuck_detections.value() {
                for (index, stuck) in stucks.iter().enumerate() {
                    let path = RefPath::StuckOwner { index };
                    if let Some(member_id) = plan.owner(path, &stuck.owner) {
                        plan.stucks.push(PlannedRow { path, member_id, item: stuck });
                    }
                }
            }
        }

        if scope.includes(Category::Sentiment) {
            if let Some(sentiment) = draft.sentiment.value() {
                plan.sentiment = Some(sentiment);
                for (index, statement) in sentiment.statements.iter().enumerate() {
                    let path = RefPath::StatementOwner { index };
                    if let Some(member_id) = plan.owner(path, &statement.owner) {
                        plan.statements.push(PlannedRow { path, member_id, item: statement });
                    }
                }
            }
        }

        plan
    }

    /// Settled member for a row owner, or record the rejection.
    fn owner(&mut self, path: RefPath, name_ref: &ExtractedNameRef) -> Option<i64> {
        let member_id = name_ref.resolved_member();
        if member_id.is_none() {
            self.reject(
                path,
                RejectReason::Unresolved {
                    raw_name: name_ref.raw_name.clone(),
                },
            );
        }
        member_id
    }

    fn reject(&mut self, item_path: RefPath, reason: RejectReason) {
        self.rejected.push(Rejection {
            category: item_path.category(),
            item_path,
            reason,
        });
    }

    /// Drop rows an earlier commit already wrote.
    ///
    /// `written` holds item keys written from the same extraction run.
    /// `locked` holds categories another run has already written to; item
    /// indices of a different run do not line up, so those categories are
    /// left alone entirely.
    pub fn exclude_committed(&mut self, written: &BTreeSet<String>, locked: &BTreeSet<Category>) {
        let mut dropped = Vec::new();
        let mut keep = |path: &RefPath| {
            let key = path.to_string();
            if locked.contains(&path.category()) || written.contains(&key) {
                dropped.push(key);
                false
            } else {
                true
            }
        };
        self.attendance.retain(|r| keep(&r.path));
        self.goals.retain(|r| keep(&r.path));
        self.challenges.retain(|r| keep(&r.path));
        self.marketing.retain(|r| keep(&r.path));
        self.stucks.retain(|r| keep(&r.path));
        self.statements.retain(|r| keep(&r.path));

        if self.sentiment.is_some()
            && (locked.contains(&Category::Sentiment) || written.contains(SENTIMENT_ITEM))
        {
            self.sentiment = None;
            dropped.push(SENTIMENT_ITEM.to_string());
        }
        self.already_committed.extend(dropped);
    }

    /// Nothing left to insert.
    pub fn is_empty(&self) -> bool {
        self.item_keys().is_empty()
    }

    /// Ledger keys of every row this plan inserts.
    pub fn item_keys(&self) -> Vec<(String, Category)> {
        let mut keys: Vec<(String, Category)> = Vec::new();
        keys.extend(self.attendance.iter().map(|r| (r.key(), Category::Attendance)));
        keys.extend(self.goals.iter().map(|r| (r.key(), Category::Goals)));
        keys.extend(self.challenges.iter().map(|r| (r.key(), Category::Challenges)));
        keys.extend(self.marketing.iter().map(|r| (r.key(), Category::Marketing)));
        keys.extend(self.stucks.iter().map(|r| (r.key(), Category::Stucks)));
        if self.sentiment.is_some() {
            keys.push((SENTIMENT_ITEM.to_string(), Category::Sentiment));
        }
        keys.extend(self.statements.iter().map(|r| (r.key(), Category::Sentiment)));
        keys
    }

    /// Top-level items per in-scope, successfully extracted category.
    pub fn written_counts(&self, scope: &CommitScope) -> BTreeMap<Category, usize> {
        Category::ALL
            .into_iter()
            .filter(|c| scope.includes(*c) && !self.skipped.contains(c))
            .map(|c| {
                let count = match c {
                    Category::Attendance => self.attendance.len(),
                    Category::Goals => self.goals.len(),
                    Category::Challenges => {
                        self.challenges.iter().map(|r| r.item.challenges.len()).sum()
                    }
                    Category::Marketing => {
                        self.marketing.iter().map(|r| r.item.activities.len()).sum()
                    }
                    Category::Stucks => self.stucks.len(),
                    Category::Sentiment => usize::from(self.sentiment.is_some()),
                };
                (c, count)
            })
            .collect()
    }
}
