//! Review session: the draft of one session between extraction and commit.
//!
//! ```text
//! Drafted ──reconcile──▶ AwaitingReview ──corrections──▶ Ready ──commit──▶ Committed
//!                   └──────────────(nothing flagged)─────▶ Ready
//! ```
//!
//! A commit that leaves rows behind (rejected owners, categories out of
//! scope) keeps the session open: the reviewer corrects what was rejected and
//! commits again, and the store writes only what it has not written yet. Once
//! every category has been written in full the session is Committed and
//! immutable. A failed commit leaves the session exactly as it was, so the
//! same call can be repeated.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::draft::{Category, Draft, RefPath, Resolution, ResolutionSource};
use crate::error::PipelineError;
use crate::orchestrator::ExtractionPass;
use crate::persist::{CommitPolicy, CommitReport, CommitScope, DraftWriter};
use crate::reconcile::{MatchCandidate, ReconcileSummary, Reconciler};
use crate::roster::RosterIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Extracted, not yet reconciled.
    Drafted,
    /// At least one reference needs review.
    AwaitingReview,
    /// Every reference is settled.
    Ready,
    /// Every category written in full.
    Committed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub session_id: i64,
    /// Extraction run this draft came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub roster: RosterIndex,
    pub draft: Draft,
    state: ReviewState,
    /// Categories with nothing left to write.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    committed: BTreeSet<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report: Option<CommitReport>,
}

impl ReviewSession {
    pub fn new(session_id: i64, pass: ExtractionPass) -> Self {
        Self {
            session_id,
            run_id: None,
            roster: pass.roster,
            draft: pass.draft,
            state: ReviewState::Drafted,
            committed: BTreeSet::new(),
            report: None,
        }
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// Report of the latest commit.
    pub fn report(&self) -> Option<&CommitReport> {
        self.report.as_ref()
    }

    /// Categories already written in full.
    pub fn committed_categories(&self) -> &BTreeSet<Category> {
        &self.committed
    }

    fn ensure_open(&self) -> Result<(), PipelineError> {
        if self.state == ReviewState::Committed {
            return Err(PipelineError::AlreadyCommitted(self.session_id));
        }
        Ok(())
    }

    fn refresh_state(&mut self) {
        self.state = if self.committed.len() == Category::ALL.len() {
            ReviewState::Committed
        } else if self.draft.unresolved().is_empty() {
            ReviewState::Ready
        } else {
            ReviewState::AwaitingReview
        };
    }

    /// Reconcile every reference against the session's roster snapshot.
    /// Manual corrections are kept.
    pub fn reconcile(&mut self, reconciler: &Reconciler) -> Result<ReconcileSummary, PipelineError> {
        self.ensure_open()?;
        let summary = reconciler.resolve(&mut self.draft, &self.roster);
        self.refresh_state();
        Ok(summary)
    }

    /// Point one reference at a roster member.
    pub fn apply_correction(&mut self, path: &RefPath, member_id: i64) -> Result<(), PipelineError> {
        self.ensure_open()?;

        let member = self.roster.get(member_id).cloned().ok_or_else(|| {
            PipelineError::InvalidCorrection(format!(
                "member {} is not on the roster of group {}",
                member_id, self.roster.group_id
            ))
        })?;
        let name_ref = self.draft.get_ref_mut(path).ok_or_else(|| {
            PipelineError::InvalidCorrection(format!("no reference at {}", path))
        })?;

        log::info!(
            "Session {}: {} ('{}') corrected to member {}",
            self.session_id,
            path,
            name_ref.raw_name,
            member.id
        );
        name_ref.resolution = Some(Resolution {
            member_id: Some(member.id),
            member_name: Some(member.name),
            confidence_percent: 100,
            needs_review: false,
            source: ResolutionSource::Manual,
        });

        if self.state != ReviewState::Drafted {
            self.refresh_state();
        }
        Ok(())
    }

    /// Roster candidates for the name at `path`, best first.
    pub fn suggestions(
        &self,
        reconciler: &Reconciler,
        path: &RefPath,
    ) -> Result<Vec<MatchCandidate>, PipelineError> {
        let name_ref = self.draft.get_ref(path).ok_or_else(|| {
            PipelineError::InvalidCorrection(format!("no reference at {}", path))
        })?;
        Ok(reconciler.suggestions(&name_ref.raw_name, &self.roster))
    }

    /// References still needing review within `categories`.
    pub fn unresolved_in(&self, categories: &BTreeSet<Category>) -> Vec<RefPath> {
        self.draft
            .unresolved()
            .into_iter()
            .filter(|p| categories.contains(&p.category()))
            .collect()
    }

    /// Nothing needs review in any category.
    pub fn ready(&self) -> bool {
        self.state != ReviewState::Drafted && self.draft.unresolved().is_empty()
    }

    /// Nothing needs review in the categories about to be persisted.
    pub fn ready_for(&self, categories: &BTreeSet<Category>) -> bool {
        self.state != ReviewState::Drafted && self.unresolved_in(categories).is_empty()
    }

    /// Persist the draft through `writer`.
    ///
    /// Strict scope fails with [`PipelineError::NotReady`] while any in-scope
    /// reference needs review; partial scope writes settled rows and reports
    /// the rest as rejected. Rows written by an earlier commit are not written
    /// again. On any error the session is unchanged.
    pub fn commit(
        &mut self,
        writer: &dyn DraftWriter,
        scope: &CommitScope,
    ) -> Result<&CommitReport, PipelineError> {
        self.ensure_open()?;

        if self.state == ReviewState::Drafted {
            return Err(PipelineError::NotReady {
                unresolved: self.unresolved_in(&scope.categories),
            });
        }
        if scope.policy == CommitPolicy::Strict {
            let unresolved = self.unresolved_in(&scope.categories);
            if !unresolved.is_empty() {
                return Err(PipelineError::NotReady { unresolved });
            }
        }

        let report = writer.write_draft(self.session_id, self.run_id.as_deref(), &self.draft, scope)?;
        self.committed.extend(report.settled_categories(scope));
        self.refresh_state();
        Ok(self.report.insert(report))
    }
}
