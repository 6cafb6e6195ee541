//! Confidence-scored reconciliation of extracted names to roster members.
//!
//! Names are folded (diacritics stripped, lowercased, punctuation dropped),
//! tokenized and token-sorted so that "Lin, Jamie" and "Jamie Lin" compare
//! equal, then scored with normalized Damerau-Levenshtein similarity.
//!
//! Outcome per reference:
//! - unique best >= high-confidence threshold: resolved, no review
//! - best >= review threshold, or runner-up within the tie margin: best guess, flagged
//! - best < review threshold, or empty roster: no member, flagged
//!
//! Ties go to the earlier roster entry. Manual corrections are never overwritten.

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::draft::{Draft, Resolution, ResolutionSource};
use crate::roster::RosterIndex;
use crate::types::MatchThresholds;

/// Normalize a person name for fuzzy matching.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two normalized names in 0.0..=1.0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_damerau_levenshtein(a, b)
}

/// Score as a 0–100 display percentage. Floors, so a score under a threshold
/// never displays at or above it.
pub fn confidence_percent(score: f64) -> u8 {
    ((score * 100.0) + 1e-9).floor().clamp(0.0, 100.0) as u8
}

/// One roster member scored against an extracted name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub member_id: i64,
    pub member_name: String,
    pub score: f64,
    pub confidence_percent: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub auto_resolved: usize,
    pub flagged: usize,
    pub unmatched: usize,
    pub manual: usize,
}

pub struct Reconciler {
    thresholds: MatchThresholds,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(MatchThresholds::default())
    }
}

impl Reconciler {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    /// Resolve every reference in `draft` against `roster`, in place.
    ///
    /// Depends only on each raw name and the roster, so running it again on
    /// the same inputs yields the same resolutions.
    pub fn resolve(&self, draft: &mut Draft, roster: &RosterIndex) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        draft.for_each_ref_mut(|_, name_ref| {
            if name_ref.is_manual() {
                summary.manual += 1;
                return;
            }
            let resolution = self.resolve_name(&name_ref.raw_name, roster);
            if resolution.member_id.is_none() {
                summary.unmatched += 1;
            } else if resolution.needs_review {
                summary.flagged += 1;
            } else {
                summary.auto_resolved += 1;
            }
            name_ref.resolution = Some(resolution);
        });

        // A goal with no text cannot be saved unseen, however good the name match
        if let Some(goals) = draft.goals.value_mut() {
            for (index, goal) in goals.iter_mut().enumerate() {
                if !goal.lacks_text() {
                    continue;
                }
                if let Some(resolution) = goal.owner.resolution.as_mut() {
                    if resolution.source == ResolutionSource::Matched && !resolution.needs_review {
                        resolution.needs_review = true;
                        summary.auto_resolved -= 1;
                        summary.flagged += 1;
                    }
                }
                log::warn!("goals[{}] has no goal text; flagged for review", index);
            }
        }

        log::info!(
            "Reconciled names against {} member(s) of group {}: {} auto, {} flagged, {} unmatched, {} manual",
            roster.len(),
            roster.group_id,
            summary.auto_resolved,
            summary.flagged,
            summary.unmatched,
            summary.manual
        );
        summary
    }

    /// Pick the best roster member for one raw name.
    pub fn resolve_name(&self, raw_name: &str, roster: &RosterIndex) -> Resolution {
        let key = normalize_name(raw_name);

        let mut best: Option<(usize, f64)> = None;
        let mut runner_up: Option<f64> = None;
        if !key.is_empty() {
            for (i, entry) in roster.entries().iter().enumerate() {
                let score = name_similarity(&key, &entry.key);
                match best {
                    // Equal scores keep the earlier roster entry
                    Some((_, best_score)) if score <= best_score => {
                        runner_up = Some(runner_up.map_or(score, |r| r.max(score)));
                    }
                    _ => {
                        if let Some((_, prev)) = best {
                            runner_up = Some(runner_up.map_or(prev, |r| r.max(prev)));
                        }
                        best = Some((i, score));
                    }
                }
            }
        }

        let Some((index, score)) = best else {
            return Resolution {
                member_id: None,
                member_name: None,
                confidence_percent: 0,
                needs_review: true,
                source: ResolutionSource::Matched,
            };
        };

        if score < self.thresholds.review {
            return Resolution {
                member_id: None,
                member_name: None,
                confidence_percent: confidence_percent(score),
                needs_review: true,
                source: ResolutionSource::Matched,
            };
        }

        let contested = runner_up.is_some_and(|r| score - r <= self.thresholds.tie_margin);
        let member = &roster.entries()[index].member;
        Resolution {
            member_id: Some(member.id),
            member_name: Some(member.name.clone()),
            confidence_percent: confidence_percent(score),
            needs_review: contested || score < self.thresholds.high_confidence,
            source: ResolutionSource::Matched,
        }
    }

    /// Top candidates for a name, best first, for the review list.
    pub fn suggestions(&self, raw_name: &str, roster: &RosterIndex) -> Vec<MatchCandidate> {
        let key = normalize_name(raw_name);
        if key.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<MatchCandidate> = roster
            .entries()
            .iter()
            .map(|entry| {
                let score = name_similarity(&key, &entry.key);
                MatchCandidate {
                    member_id: entry.member.id,
                    member_name: entry.member.name.clone(),
                    score,
                    confidence_percent: confidence_percent(score),
                }
            })
            .filter(|c| c.score > 0.0)
            .collect();

        // Stable sort keeps roster order among equal scores
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.thresholds.suggestion_limit);
        candidates
    }
}
