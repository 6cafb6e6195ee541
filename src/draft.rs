//! Draft facts extracted from one session transcript.
//!
//! Every category is wrapped in [`CategoryResult`], so a failed extractor shows
//! up as an explicit `failed` entry instead of an empty list. Person mentions are
//! [`ExtractedNameRef`]s that carry the raw name exactly as written plus the
//! reconciler's verdict, addressed individually through [`RefPath`].

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionFailure;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
pub enum Category {
    #[serde(rename = "attendance")]
    #[value(name = "attendance")]
    Attendance,
    #[serde(rename = "goals")]
    #[value(name = "goals")]
    Goals,
    #[serde(rename = "challenges")]
    #[value(name = "challenges")]
    Challenges,
    #[serde(rename = "marketing_activities")]
    #[value(name = "marketing_activities")]
    Marketing,
    #[serde(rename = "stuck_detections")]
    #[value(name = "stuck_detections")]
    Stucks,
    #[serde(rename = "sentiment")]
    #[value(name = "sentiment")]
    Sentiment,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Attendance,
        Category::Goals,
        Category::Challenges,
        Category::Marketing,
        Category::Stucks,
        Category::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Attendance => "attendance",
            Category::Goals => "goals",
            Category::Challenges => "challenges",
            Category::Marketing => "marketing_activities",
            Category::Stucks => "stuck_detections",
            Category::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Outcome of one extractor: its facts, or why there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryResult<T> {
    Ok { value: T },
    Failed { failure: ExtractionFailure },
}

impl<T> CategoryResult<T> {
    pub fn ok(value: T) -> Self {
        CategoryResult::Ok { value }
    }

    pub fn failed(failure: ExtractionFailure) -> Self {
        CategoryResult::Failed { failure }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CategoryResult::Ok { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            CategoryResult::Ok { value } => Some(value),
            CategoryResult::Failed { .. } => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            CategoryResult::Ok { value } => Some(value),
            CategoryResult::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            CategoryResult::Ok { .. } => None,
            CategoryResult::Failed { failure } => Some(failure),
        }
    }
}

impl<T> From<Result<T, ExtractionFailure>> for CategoryResult<T> {
    fn from(result: Result<T, ExtractionFailure>) -> Self {
        match result {
            Ok(value) => CategoryResult::ok(value),
            Err(failure) => CategoryResult::failed(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Name references
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Computed by the reconciler from name similarity.
    Matched,
    /// Set by a reviewer; the reconciler leaves it alone.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub member_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    /// 0–100, for display.
    pub confidence_percent: u8,
    pub needs_review: bool,
    pub source: ResolutionSource,
}

/// A person mentioned in the transcript, pending identity resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedNameRef {
    pub raw_name: String,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl ExtractedNameRef {
    pub fn new(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            resolution: None,
        }
    }

    /// Unreconciled references always need review.
    pub fn needs_review(&self) -> bool {
        self.resolution.as_ref().is_none_or(|r| r.needs_review)
    }

    /// Best-guess member, flagged or not.
    pub fn member_id(&self) -> Option<i64> {
        self.resolution.as_ref().and_then(|r| r.member_id)
    }

    /// Member id only when the reference is settled.
    pub fn resolved_member(&self) -> Option<i64> {
        if self.needs_review() {
            None
        } else {
            self.member_id()
        }
    }

    pub fn confidence_percent(&self) -> u8 {
        self.resolution
            .as_ref()
            .map(|r| r.confidence_percent)
            .unwrap_or(0)
    }

    pub fn is_manual(&self) -> bool {
        self.resolution
            .as_ref()
            .is_some_and(|r| r.source == ResolutionSource::Manual)
    }
}

/// Address of one [`ExtractedNameRef`] inside a [`Draft`].
///
/// Renders as a dotted path such as `challenges[0].challenges[1].strategies[0].suggested_by`
/// and parses back from the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefPath {
    Attendance {
        index: usize,
    },
    GoalOwner {
        index: usize,
    },
    ChallengeOwner {
        group: usize,
    },
    StrategySuggestedBy {
        group: usize,
        challenge: usize,
        strategy: usize,
    },
    MarketingOwner {
        group: usize,
    },
    StuckOwner {
        index: usize,
    },
    StatementOwner {
        index: usize,
    },
}

impl RefPath {
    pub fn category(&self) -> Category {
        match self {
            RefPath::Attendance { .. } => Category::Attendance,
            RefPath::GoalOwner { .. } => Category::Goals,
            RefPath::ChallengeOwner { .. } | RefPath::StrategySuggestedBy { .. } => {
                Category::Challenges
            }
            RefPath::MarketingOwner { .. } => Category::Marketing,
            RefPath::StuckOwner { .. } => Category::Stucks,
            RefPath::StatementOwner { .. } => Category::Sentiment,
        }
    }
}

impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefPath::Attendance { index } => write!(f, "attendance[{}].name", index),
            RefPath::GoalOwner { index } => write!(f, "goals[{}].owner", index),
            RefPath::ChallengeOwner { group } => write!(f, "challenges[{}].owner", group),
            RefPath::StrategySuggestedBy {
                group,
                challenge,
                strategy,
            } => write!(
                f,
                "challenges[{}].challenges[{}].strategies[{}].suggested_by",
                group, challenge, strategy
            ),
            RefPath::MarketingOwner { group } => {
                write!(f, "marketing_activities[{}].owner", group)
            }
            RefPath::StuckOwner { index } => write!(f, "stuck_detections[{}].owner", index),
            RefPath::StatementOwner { index } => {
                write!(f, "sentiment.statements[{}].owner", index)
            }
        }
    }
}

/// Split `name[3]` into `("name", Some(3))`.
fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.split_once('[') {
        None => Some((segment, None)),
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, Some(index)))
        }
    }
}

impl FromStr for RefPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("unrecognised reference path '{}'", s);
        let parts = s
            .trim()
            .split('.')
            .map(parse_segment)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let path = match parts.as_slice() {
            [("attendance", Some(i)), ("name", None)] => RefPath::Attendance { index: *i },
            [("goals", Some(i)), ("owner", None)] => RefPath::GoalOwner { index: *i },
            [("challenges", Some(g)), ("owner", None)] => RefPath::ChallengeOwner { group: *g },
            [("challenges", Some(g)), ("challenges", Some(c)), ("strategies", Some(s)), ("suggested_by", None)] => {
                RefPath::StrategySuggestedBy {
                    group: *g,
                    challenge: *c,
                    strategy: *s,
                }
            }
            [("marketing_activities", Some(g)), ("owner", None)] => {
                RefPath::MarketingOwner { group: *g }
            }
            [("stuck_detections", Some(i)), ("owner", None)] => RefPath::StuckOwner { index: *i },
            [("sentiment", None), ("statements", Some(i)), ("owner", None)] => {
                RefPath::StatementOwner { index: *i }
            }
            _ => return Err(invalid()),
        };
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Category items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    AbsentWithoutUpdates,
    Travelling,
    FamilyTime,
    WorkBusiness,
    Wellness,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::AbsentWithoutUpdates => "absent_without_updates",
            AttendanceStatus::Travelling => "travelling",
            AttendanceStatus::FamilyTime => "family_time",
            AttendanceStatus::WorkBusiness => "work_business",
            AttendanceStatus::Wellness => "wellness",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub extracted_name: ExtractedNameRef,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub owner: ExtractedNameRef,
    pub goal_text: String,
    pub is_vague: bool,
}

impl Goal {
    /// The model named an owner but gave no goal text.
    pub fn lacks_text(&self) -> bool {
        self.goal_text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    MindsetReframe,
    TacticalProcess,
    ResourceSuggestion,
    Connection,
    Framework,
}

impl StrategyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::MindsetReframe => "mindset_reframe",
            StrategyTag::TacticalProcess => "tactical_process",
            StrategyTag::ResourceSuggestion => "resource_suggestion",
            StrategyTag::Connection => "connection",
            StrategyTag::Framework => "framework",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub summary: String,
    #[serde(default)]
    pub tag: Option<StrategyTag>,
    #[serde(default)]
    pub suggested_by: Option<ExtractedNameRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeGroup {
    pub owner: ExtractedNameRef,
    pub challenges: Vec<Challenge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketingStage {
    NoneMentioned,
    Meetings,
    Proposals,
    Closed,
}

impl MarketingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketingStage::NoneMentioned => "none_mentioned",
            MarketingStage::Meetings => "meetings",
            MarketingStage::Proposals => "proposals",
            MarketingStage::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    NoneMentioned,
    NetworkActivation,
    Linkedin,
    ColdOutreach,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::NoneMentioned => "none_mentioned",
            ActivityType::NetworkActivation => "network_activation",
            ActivityType::Linkedin => "linkedin",
            ActivityType::ColdOutreach => "cold_outreach",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    OneTime,
    Monthly,
    Hybrid,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::OneTime => "one_time",
            ContractType::Monthly => "monthly",
            ContractType::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingOutcome {
    pub meetings: i64,
    pub proposals: i64,
    pub clients: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingActivity {
    pub stage: MarketingStage,
    pub activity_type: ActivityType,
    /// Negative when a deal was lost.
    pub quantity: i64,
    pub is_win: bool,
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub outcome: Option<MarketingOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingGroup {
    pub owner: ExtractedNameRef,
    pub activities: Vec<MarketingActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StuckDetection {
    pub owner: ExtractedNameRef,
    pub classification: String,
    pub summary: String,
    #[serde(default)]
    pub exact_quotes: Vec<String>,
    #[serde(default)]
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentStatement {
    pub owner: ExtractedNameRef,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub exact_quotes: Vec<String>,
    pub is_negative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSentiment {
    /// 1 (very negative) to 5 (high positive).
    pub score: u8,
    pub rationale: String,
    pub dominant_emotion: String,
    pub confidence: f64,
    #[serde(default)]
    pub statements: Vec<SentimentStatement>,
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// The unreconciled, unsaved output of one extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub attendance: CategoryResult<Vec<AttendanceRecord>>,
    pub goals: CategoryResult<Vec<Goal>>,
    pub challenges: CategoryResult<Vec<ChallengeGroup>>,
    pub marketing_activities: CategoryResult<Vec<MarketingGroup>>,
    pub stuck_detections: CategoryResult<Vec<StuckDetection>>,
    pub sentiment: CategoryResult<SessionSentiment>,
}

impl Draft {
    /// The failure recorded for `category`, if its extractor failed.
    pub fn failure(&self, category: Category) -> Option<&ExtractionFailure> {
        match category {
            Category::Attendance => self.attendance.failure(),
            Category::Goals => self.goals.failure(),
            Category::Challenges => self.challenges.failure(),
            Category::Marketing => self.marketing_activities.failure(),
            Category::Stucks => self.stuck_detections.failure(),
            Category::Sentiment => self.sentiment.failure(),
        }
    }

    pub fn is_ok(&self, category: Category) -> bool {
        self.failure(category).is_none()
    }

    pub fn failures(&self) -> Vec<(Category, &ExtractionFailure)> {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.failure(c).map(|f| (c, f)))
            .collect()
    }

    /// Every name reference in category order.
    pub fn refs(&self) -> Vec<(RefPath, &ExtractedNameRef)> {
        let mut out = Vec::new();
        if let Some(rows) = self.attendance.value() {
            for (index, row) in rows.iter().enumerate() {
                out.push((RefPath::Attendance { index }, &row.extracted_name));
            }
        }
        if let Some(goals) = self.goals.value() {
            for (index, goal) in goals.iter().enumerate() {
                out.push((RefPath::GoalOwner { index }, &goal.owner));
            }
        }
        if let Some(groups) = self.challenges.value() {
            for (group, cg) in groups.iter().enumerate() {
                out.push((RefPath::ChallengeOwner { group }, &cg.owner));
                for (challenge, ch) in cg.challenges.iter().enumerate() {
                    for (strategy, st) in ch.strategies.iter().enumerate() {
                        if let Some(ref by) = st.suggested_by {
                            out.push((
                                RefPath::StrategySuggestedBy {
                                    group,
                                    challenge,
                                    strategy,
                                },
                                by,
                            ));
                        }
                    }
                }
            }
        }
        if let Some(groups) = self.marketing_activities.value() {
            for (group, mg) in groups.iter().enumerate() {
                out.push((RefPath::MarketingOwner { group }, &mg.owner));
            }
        }
        if let Some(stucks) = self.stuck_detections.value() {
            for (index, stuck) in stucks.iter().enumerate() {
                out.push((RefPath::StuckOwner { index }, &stuck.owner));
            }
        }
        if let Some(sentiment) = self.sentiment.value() {
            for (index, statement) in sentiment.statements.iter().enumerate() {
                out.push((RefPath::StatementOwner { index }, &statement.owner));
            }
        }
        out
    }

    /// Visit every name reference mutably, in the same order as [`Draft::refs`].
    pub fn for_each_ref_mut(&mut self, mut f: impl FnMut(RefPath, &mut ExtractedNameRef)) {
        if let Some(rows) = self.attendance.value_mut() {
            for (index, row) in rows.iter_mut().enumerate() {
                f(RefPath::Attendance { index }, &mut row.extracted_name);
            }
        }
        if let Some(goals) = self.goals.value_mut() {
            for (index, goal) in goals.iter_mut().enumerate() {
                f(RefPath::GoalOwner { index }, &mut goal.owner);
            }
        }
        if let Some(groups) = self.challenges.value_mut() {
            for (group, cg) in groups.iter_mut().enumerate() {
                f(RefPath::ChallengeOwner { group }, &mut cg.owner);
                for (challenge, ch) in cg.challenges.iter_mut().enumerate() {
                    for (strategy, st) in ch.strategies.iter_mut().enumerate() {
                        if let Some(ref mut by) = st.suggested_by {
                            f(
                                RefPath::StrategySuggestedBy {
                                    group,
                                    challenge,
                                    strategy,
                                },
                                by,
                            );
                        }
                    }
                }
            }
        }
        if let Some(groups) = self.marketing_activities.value_mut() {
            for (group, mg) in groups.iter_mut().enumerate() {
                f(RefPath::MarketingOwner { group }, &mut mg.owner);
            }
        }
        if let Some(stucks) = self.stuck_detections.value_mut() {
            for (index, stuck) in stucks.iter_mut().enumerate() {
                f(RefPath::StuckOwner { index }, &mut stuck.owner);
            }
        }
        if let Some(sentiment) = self.sentiment.value_mut() {
            for (index, statement) in sentiment.statements.iter_mut().enumerate() {
                f(RefPath::StatementOwner { index }, &mut statement.owner);
            }
        }
    }

    pub fn get_ref_mut(&mut self, path: &RefPath) -> Option<&mut ExtractedNameRef> {
        match *path {
            RefPath::Attendance { index } => self
                .attendance
                .value_mut()?
                .get_mut(index)
                .map(|r| &mut r.extracted_name),
            RefPath::GoalOwner { index } => {
                self.goals.value_mut()?.get_mut(index).map(|g| &mut g.owner)
            }
            RefPath::ChallengeOwner { group } => self
                .challenges
                .value_mut()?
                .get_mut(group)
                .map(|g| &mut g.owner),
            RefPath::StrategySuggestedBy {
                group,
                challenge,
                strategy,
            } => self
                .challenges
                .value_mut()?
                .get_mut(group)?
                .challenges
                .get_mut(challenge)?
                .strategies
                .get_mut(strategy)?
                .suggested_by
                .as_mut(),
            RefPath::MarketingOwner { group } => self
                .marketing_activities
                .value_mut()?
                .get_mut(group)
                .map(|g| &mut g.owner),
            RefPath::StuckOwner { index } => self
                .stuck_detections
                .value_mut()?
                .get_mut(index)
                .map(|s| &mut s.owner),
            RefPath::StatementOwner { index } => self
                .sentiment
                .value_mut()?
                .statements
                .get_mut(index)
                .map(|s| &mut s.owner),
        }
    }

    pub fn get_ref(&self, path: &RefPath) -> Option<&ExtractedNameRef> {
        self.refs()
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, r)| r)
    }

    /// Paths of references still flagged for review.
    pub fn unresolved(&self) -> Vec<RefPath> {
        self.refs()
            .into_iter()
            .filter(|(_, r)| r.needs_review())
            .map(|(p, _)| p)
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_draft;
    use super::*;

    #[test]
    fn test_refs_cover_every_reference_kind() {
        let draft = sample_draft();
        let paths: Vec<String> = draft.refs().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "attendance[0].name",
                "attendance[1].name",
                "goals[0].owner",
                "challenges[0].owner",
                "challenges[0].challenges[0].strategies[0].suggested_by",
                "marketing_activities[0].owner",
                "stuck_detections[0].owner",
                "sentiment.statements[0].owner",
            ]
        );
    }

    #[test]
    fn test_ref_path_parses_its_display_form() {
        let draft = sample_draft();
        for (path, _) in draft.refs() {
            let parsed: RefPath = path.to_string().parse().unwrap();
            assert_eq!(parsed, path);
        }
        assert!("goals[x].owner".parse::<RefPath>().is_err());
        assert!("goals[0]".parse::<RefPath>().is_err());
        assert!("attendance[0].owner".parse::<RefPath>().is_err());
    }

    #[test]
    fn test_get_ref_mut_reaches_nested_strategy() {
        let mut draft = sample_draft();
        let path = RefPath::StrategySuggestedBy {
            group: 0,
            challenge: 0,
            strategy: 0,
        };
        assert_eq!(draft.get_ref_mut(&path).unwrap().raw_name, "Jamie Lin");

        // Strategy without a suggester has no reference to address
        let missing = RefPath::StrategySuggestedBy {
            group: 0,
            challenge: 0,
            strategy: 1,
        };
        assert!(draft.get_ref_mut(&missing).is_none());
        assert!(draft.get_ref_mut(&RefPath::GoalOwner { index: 9 }).is_none());
    }

    #[test]
    fn test_failed_category_keeps_its_slot() {
        let mut draft = sample_draft();
        draft.goals = CategoryResult::failed(ExtractionFailure::Timeout { millis: 50 });

        assert!(!draft.is_ok(Category::Goals));
        assert_eq!(draft.failures().len(), 1);
        assert!(draft.refs().iter().all(|(p, _)| p.category() != Category::Goals));

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["goals"]["status"], "failed");
        assert_eq!(json["goals"]["failure"]["kind"], "timeout");
        assert_eq!(json["attendance"]["status"], "ok");
    }

    #[test]
    fn test_unreconciled_refs_need_review() {
        let draft = sample_draft();
        assert_eq!(draft.unresolved().len(), draft.refs().len());
        let name = ExtractedNameRef::new("Someone");
        assert!(name.needs_review());
        assert_eq!(name.resolved_member(), None);
        assert_eq!(name.confidence_percent(), 0);
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("marketing".parse::<Category>().is_err());
    }
}
