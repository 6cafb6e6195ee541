//! Parsing of raw extractor output into draft items.
//!
//! Model output is treated as untrusted. Code fences and surrounding prose are
//! stripped, free-text labels are normalized, and fields the model commonly
//! misspells or renames are accepted under their aliases. An unknown attendance
//! status or an out-of-range sentiment score fails the whole category, while an
//! unknown marketing stage or strategy tag degrades to "none"/no tag.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::draft::{
    ActivityType, AttendanceRecord, AttendanceStatus, Challenge, ChallengeGroup, ContractType,
    ExtractedNameRef, Goal, MarketingActivity, MarketingGroup, MarketingOutcome, MarketingStage,
    SentimentStatement, SessionSentiment, Strategy, StrategyTag, StuckDetection,
};
use crate::error::ExtractionFailure;
use crate::util::normalize_label;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:[A-Za-z]+)?\s*(.*?)```").unwrap())
}

/// Pull the JSON document out of raw model output.
pub fn json_payload(raw: &str) -> Result<Value, ExtractionFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionFailure::malformed("empty output"));
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    if let Some(inner) = fence_re().captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.as_str().trim()) {
            return Ok(value);
        }
    }

    // Prose around the document: take the outermost bracketed span
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    let preview: String = trimmed.chars().take(80).collect();
    Err(ExtractionFailure::malformed(format!(
        "output is not JSON: {}",
        preview
    )))
}

/// The list under `key`, or the document itself when it is already a list.
fn items<T: DeserializeOwned>(raw: &str, key: &str) -> Result<Vec<T>, ExtractionFailure> {
    let list = match json_payload(raw)? {
        Value::Array(list) => list,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(list)) => list,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ExtractionFailure::malformed(format!(
                    "'{}' is not a list (found {})",
                    key,
                    json_kind(&other)
                )))
            }
            None => {
                return Err(ExtractionFailure::malformed(format!(
                    "missing '{}' list",
                    key
                )))
            }
        },
        other => {
            return Err(ExtractionFailure::malformed(format!(
                "expected a list or object, found {}",
                json_kind(&other)
            )))
        }
    };

    list.into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| ExtractionFailure::malformed(format!("{}[{}]: {}", key, i, e)))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn name_ref(name: Option<String>) -> ExtractedNameRef {
    ExtractedNameRef::new(name.unwrap_or_default().trim())
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// A field the model sometimes gives as a single string instead of a list.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    #[default]
    Missing,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::Missing => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

pub fn parse_attendance_status(label: &str) -> Option<AttendanceStatus> {
    match normalize_label(label).as_str() {
        "present" | "attended" => Some(AttendanceStatus::Present),
        "absent_without_updates" | "absent" | "absent_without_update" => {
            Some(AttendanceStatus::AbsentWithoutUpdates)
        }
        "travelling" | "traveling" | "travel" => Some(AttendanceStatus::Travelling),
        "family_time" | "family" => Some(AttendanceStatus::FamilyTime),
        "work_business" | "work" | "business" => Some(AttendanceStatus::WorkBusiness),
        "wellness" | "health" => Some(AttendanceStatus::Wellness),
        _ => None,
    }
}

pub fn parse_strategy_tag(label: &str) -> Option<StrategyTag> {
    match normalize_label(label).as_str() {
        "mindset_reframe" | "mindset" => Some(StrategyTag::MindsetReframe),
        "a_step_by_step_action_or_method" | "step_by_step_action_or_method" | "tactical_process"
        | "tactical" => Some(StrategyTag::TacticalProcess),
        "resource_or_tool_suggestion" | "resource_suggestion" | "resource" | "tool" => {
            Some(StrategyTag::ResourceSuggestion)
        }
        "connection_referral" | "connection" | "referral" => Some(StrategyTag::Connection),
        "a_structure_model_or_named_methodology" | "structure_model_or_named_methodology"
        | "framework" => Some(StrategyTag::Framework),
        _ => None,
    }
}

pub fn parse_stage(label: &str) -> MarketingStage {
    match normalize_label(label).as_str() {
        "meetings" | "meeting" => MarketingStage::Meetings,
        "proposals" | "proposal" => MarketingStage::Proposals,
        "closed" | "close" | "won" => MarketingStage::Closed,
        _ => MarketingStage::NoneMentioned,
    }
}

pub fn parse_activity_type(label: &str) -> ActivityType {
    match normalize_label(label).as_str() {
        "network_activation" => ActivityType::NetworkActivation,
        "linkedin" => ActivityType::Linkedin,
        "cold_outreach" => ActivityType::ColdOutreach,
        _ => ActivityType::NoneMentioned,
    }
}

pub fn parse_contract_type(label: &str) -> Option<ContractType> {
    match normalize_label(label).as_str() {
        "monthly" | "retainer" => Some(ContractType::Monthly),
        "one_time" | "onetime" | "project" => Some(ContractType::OneTime),
        "hybrid" => Some(ContractType::Hybrid),
        _ => None,
    }
}

/// Canonical display label for a stuck classification; anything else is "Other".
pub fn canonical_stuck_classification(label: &str) -> &'static str {
    match normalize_label(label).as_str() {
        "momentum_drop" => "Momentum Drop",
        "emotional_block" => "Emotional Block",
        "overwhelm" => "Overwhelm",
        "decision_paralysis" => "Decision Paralysis",
        "repeating_goal" => "Repeating Goal",
        _ => "Other",
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireAttendance {
    #[serde(default)]
    name: Option<String>,
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

pub fn parse_attendance(raw: &str) -> Result<Vec<AttendanceRecord>, ExtractionFailure> {
    items::<WireAttendance>(raw, "attendance")?
        .into_iter()
        .map(|row| {
            let status = parse_attendance_status(&row.status).ok_or_else(|| {
                ExtractionFailure::malformed(format!(
                    "unknown attendance status '{}'",
                    row.status
                ))
            })?;
            Ok(AttendanceRecord {
                extracted_name: name_ref(row.name),
                status,
                notes: non_empty(row.notes),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct WireGoal {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "goal", alias = "goal_text")]
    quantifiable_goal: Option<String>,
    #[serde(default)]
    is_vague: bool,
}

/// Goals without text are kept; reconciliation flags their owner for review.
pub fn parse_goals(raw: &str) -> Result<Vec<Goal>, ExtractionFailure> {
    Ok(items::<WireGoal>(raw, "goals")?
        .into_iter()
        .map(|g| Goal {
            owner: name_ref(g.name),
            goal_text: non_empty(g.quantifiable_goal).unwrap_or_default(),
            is_vague: g.is_vague,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct WireStrategy {
    #[serde(default, alias = "suggested_by")]
    name: Option<String>,
    summary: String,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChallenge {
    #[serde(alias = "description")]
    challenge: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    strategies: Vec<WireStrategy>,
}

#[derive(Debug, Deserialize)]
struct WireChallengeGroup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    challenges: Vec<WireChallenge>,
}

pub fn parse_challenges(raw: &str) -> Result<Vec<ChallengeGroup>, ExtractionFailure> {
    Ok(items::<WireChallengeGroup>(raw, "challenges")?
        .into_iter()
        .map(|group| ChallengeGroup {
            owner: name_ref(group.name),
            challenges: group
                .challenges
                .into_iter()
                .map(|c| Challenge {
                    description: c.challenge.trim().to_string(),
                    category: non_empty(c.category).unwrap_or_else(|| "Other".to_string()),
                    strategies: c
                        .strategies
                        .into_iter()
                        .map(|s| Strategy {
                            summary: s.summary.trim().to_string(),
                            tag: s.tag.as_deref().and_then(parse_strategy_tag),
                            suggested_by: non_empty(s.name).map(ExtractedNameRef::new),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct WireOutcome {
    #[serde(default, alias = "meetings")]
    no_of_meetings: i64,
    #[serde(default, alias = "proposals")]
    no_of_proposals: i64,
    #[serde(default, alias = "clients")]
    no_of_clients: i64,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireActivity {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default, alias = "activity_type")]
    activity: Option<String>,
    #[serde(default, alias = "quanitity")]
    quantity: i64,
    #[serde(default)]
    outcome: Option<WireOutcome>,
    #[serde(default)]
    is_win: bool,
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    revenue: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireMarketingGroup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    activities: Vec<WireActivity>,
}

pub fn parse_marketing(raw: &str) -> Result<Vec<MarketingGroup>, ExtractionFailure> {
    Ok(items::<WireMarketingGroup>(raw, "activities")?
        .into_iter()
        .map(|group| MarketingGroup {
            owner: name_ref(group.name),
            activities: group
                .activities
                .into_iter()
                .map(|a| MarketingActivity {
                    stage: a.stage.as_deref().map_or(MarketingStage::NoneMentioned, parse_stage),
                    activity_type: a
                        .activity
                        .as_deref()
                        .map_or(ActivityType::NoneMentioned, parse_activity_type),
                    quantity: a.quantity,
                    is_win: a.is_win,
                    contract_type: a.contract_type.as_deref().and_then(parse_contract_type),
                    revenue: a.revenue,
                    outcome: a.outcome.map(|o| MarketingOutcome {
                        meetings: o.no_of_meetings,
                        proposals: o.no_of_proposals,
                        clients: o.no_of_clients,
                        notes: non_empty(o.notes),
                    }),
                })
                .collect(),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct WireStuck {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default, alias = "summary")]
    stuck_summary: Option<String>,
    #[serde(default)]
    exact_quotes: OneOrMany,
    #[serde(default, alias = "next_step")]
    potential_next_step: Option<String>,
}

pub fn parse_stucks(raw: &str) -> Result<Vec<StuckDetection>, ExtractionFailure> {
    Ok(items::<WireStuck>(raw, "detections")?
        .into_iter()
        .map(|s| StuckDetection {
            owner: name_ref(s.name),
            classification: canonical_stuck_classification(
                s.classification.as_deref().unwrap_or_default(),
            )
            .to_string(),
            summary: non_empty(s.stuck_summary).unwrap_or_default(),
            exact_quotes: s.exact_quotes.into_vec(),
            next_step: non_empty(s.potential_next_step),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct WireStatement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "emotions")]
    emotion: OneOrMany,
    #[serde(default)]
    exact_quotes: OneOrMany,
    #[serde(default)]
    is_negative: bool,
}

#[derive(Debug, Deserialize)]
struct WireSentiment {
    #[serde(alias = "score")]
    sentiment_score: f64,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    dominant_emotion: String,
    #[serde(default, alias = "confidence")]
    confidence_score: f64,
    #[serde(default, alias = "statements")]
    representative_quotes: Vec<WireStatement>,
}

pub fn parse_sentiment(raw: &str) -> Result<SessionSentiment, ExtractionFailure> {
    let mut value = json_payload(raw)?;
    if let Some(inner) = value.get_mut("sentiment").filter(|v| v.is_object()) {
        value = inner.take();
    }
    let wire: WireSentiment = serde_json::from_value(value)
        .map_err(|e| ExtractionFailure::malformed(format!("sentiment: {}", e)))?;

    let score = wire.sentiment_score.round();
    if !(1.0..=5.0).contains(&score) || (wire.sentiment_score - score).abs() > f64::EPSILON {
        return Err(ExtractionFailure::malformed(format!(
            "sentiment score {} is not a whole number from 1 to 5",
            wire.sentiment_score
        )));
    }

    Ok(SessionSentiment {
        score: score as u8,
        rationale: wire.rationale.trim().to_string(),
        dominant_emotion: wire.dominant_emotion.trim().to_string(),
        confidence: wire.confidence_score.clamp(0.0, 1.0),
        statements: wire
            .representative_quotes
            .into_iter()
            .map(|s| SentimentStatement {
                owner: name_ref(s.name),
                emotions: s.emotion.into_vec(),
                exact_quotes: s.exact_quotes.into_vec(),
                is_negative: s.is_negative,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_payload_strips_fences_and_prose() {
        let fenced = "```json\n{\"goals\": []}\n```";
        assert!(json_payload(fenced).unwrap().is_object());

        let chatty = "Sure! Here is the result:\n[{\"name\": \"Pat\"}]\nHope this helps.";
        assert!(json_payload(chatty).unwrap().is_array());

        assert!(matches!(
            json_payload("I could not find anything."),
            Err(ExtractionFailure::Malformed { .. })
        ));
        assert!(json_payload("   ").is_err());
    }

    #[test]
    fn test_parse_attendance_labels() {
        let raw = r#"{"attendance": [
            {"name": "Jaime Lin", "status": "present", "notes": null},
            {"name": "Pat Osei", "status": "Absent without updates", "notes": ""},
            {"name": "Alex Kim", "status": "work/business", "notes": "Client workshop"}
        ]}"#;
        let rows = parse_attendance(raw).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].extracted_name.raw_name, "Jaime Lin");
        assert_eq!(rows[1].status, AttendanceStatus::AbsentWithoutUpdates);
        assert_eq!(rows[1].notes, None);
        assert_eq!(rows[2].status, AttendanceStatus::WorkBusiness);
        assert_eq!(rows[2].notes.as_deref(), Some("Client workshop"));
    }

    #[test]
    fn test_unknown_attendance_status_is_malformed() {
        let raw = r#"[{"name": "Pat", "status": "on the moon"}]"#;
        let err = parse_attendance(raw).unwrap_err();
        assert!(err.to_string().contains("on the moon"));
    }

    #[test]
    fn test_parse_goals_keeps_empty_text_and_null_owner() {
        let raw = r#"{"goals": [
            {"name": null, "quantifiable_goal": "Send 5 proposals", "is_vague": false},
            {"name": "Pat", "quantifiable_goal": "  ", "is_vague": true},
            {"name": "Sam"}
        ]}"#;
        let goals = parse_goals(raw).unwrap();
        assert_eq!(goals.len(), 3);
        assert_eq!(goals[0].owner.raw_name, "");
        assert_eq!(goals[0].goal_text, "Send 5 proposals");
        assert!(!goals[0].lacks_text());

        assert_eq!(goals[1].owner.raw_name, "Pat");
        assert_eq!(goals[1].goal_text, "");
        assert!(goals[1].is_vague);
        assert!(goals[1].lacks_text());
        assert!(goals[2].lacks_text());
        // Nothing is settled before reconciliation
        assert!(goals.iter().all(|g| g.owner.needs_review()));
    }

    #[test]
    fn test_parse_challenges_tags_and_suggesters() {
        let raw = r#"{"challenges": [{"name": "Pat Osei", "challenges": [{
            "challenge": "Inconsistent pipeline",
            "category": "Lead Generation",
            "strategies": [
                {"name": "Jamie Lin", "summary": "Weekly outreach block", "tag": "A step by step action or method"},
                {"name": null, "summary": "Try the Mom Test", "tag": "Resource or tool Suggestion"},
                {"name": "", "summary": "Ask for intros", "tag": "Connection/referral"},
                {"summary": "Think bigger", "tag": "something new"}
            ]
        }]}]}"#;
        let groups = parse_challenges(raw).unwrap();
        let strategies = &groups[0].challenges[0].strategies;
        assert_eq!(strategies[0].tag, Some(StrategyTag::TacticalProcess));
        assert_eq!(
            strategies[0].suggested_by.as_ref().unwrap().raw_name,
            "Jamie Lin"
        );
        assert_eq!(strategies[1].tag, Some(StrategyTag::ResourceSuggestion));
        assert!(strategies[1].suggested_by.is_none());
        assert_eq!(strategies[2].tag, Some(StrategyTag::Connection));
        assert!(strategies[2].suggested_by.is_none());
        assert_eq!(strategies[3].tag, None);
    }

    #[test]
    fn test_parse_marketing_accepts_misspelled_quantity() {
        let raw = r#"{"activities": [{"name": "Jamie Lin", "activities": [
            {"stage": "proposals", "activity": "Network Activation", "quanitity": 2,
             "outcome": {"no_of_meetings": 3, "no_of_proposals": 2, "no_of_clients": 0, "notes": "two out"},
             "is_win": false, "contract_type": null, "revenue": null, "client_involved": true},
            {"stage": "pitching", "activity": "billboards", "quantity": -1,
             "is_win": true, "contract_type": "one-time", "revenue": 4500.0}
        ]}]}"#;
        let groups = parse_marketing(raw).unwrap();
        let acts = &groups[0].activities;
        assert_eq!(acts[0].stage, MarketingStage::Proposals);
        assert_eq!(acts[0].activity_type, ActivityType::NetworkActivation);
        assert_eq!(acts[0].quantity, 2);
        assert_eq!(acts[0].outcome.as_ref().unwrap().meetings, 3);
        assert_eq!(acts[1].stage, MarketingStage::NoneMentioned);
        assert_eq!(acts[1].activity_type, ActivityType::NoneMentioned);
        assert_eq!(acts[1].quantity, -1);
        assert_eq!(acts[1].contract_type, Some(ContractType::OneTime));
        assert_eq!(acts[1].revenue, Some(4500.0));
        assert!(acts[1].outcome.is_none());
    }

    #[test]
    fn test_parse_stucks_single_quote_string() {
        let raw = r#"{"detections": [{"name": "Pat", "classification": "momentum drop",
            "stuck_summary": "No outreach", "exact_quotes": "I haven't done anything",
            "potential_next_step": "Micro-goals"},
            {"name": "Alex", "classification": "Existential dread", "stuck_summary": "Unsure",
            "exact_quotes": ["a", "b"]}]}"#;
        let stucks = parse_stucks(raw).unwrap();
        assert_eq!(stucks[0].classification, "Momentum Drop");
        assert_eq!(stucks[0].exact_quotes, vec!["I haven't done anything"]);
        assert_eq!(stucks[1].classification, "Other");
        assert_eq!(stucks[1].exact_quotes.len(), 2);
        assert_eq!(stucks[1].next_step, None);
    }

    #[test]
    fn test_parse_sentiment() {
        let raw = r#"```json
        {"sentiment_score": 4, "rationale": "Upbeat", "dominant_emotion": "optimistic",
         "confidence_score": 0.82,
         "representative_quotes": [{"name": "Jamie Lin", "emotion": ["excited"],
            "exact_quotes": ["Finally closed it!"], "is_negative": false}]}
        ```"#;
        let sentiment = parse_sentiment(raw).unwrap();
        assert_eq!(sentiment.score, 4);
        assert_eq!(sentiment.confidence, 0.82);
        assert_eq!(sentiment.statements[0].owner.raw_name, "Jamie Lin");
        assert_eq!(sentiment.statements[0].emotions, vec!["excited"]);
    }

    #[test]
    fn test_sentiment_score_out_of_range_is_malformed() {
        for bad in ["0", "6", "3.5"] {
            let raw = format!(r#"{{"sentiment_score": {}, "rationale": "x"}}"#, bad);
            assert!(matches!(
                parse_sentiment(&raw),
                Err(ExtractionFailure::Malformed { .. })
            ));
        }
        let clamped = parse_sentiment(r#"{"sentiment_score": 2, "confidence_score": 7}"#).unwrap();
        assert_eq!(clamped.confidence, 1.0);
    }

    #[test]
    fn test_wrong_list_type_is_malformed() {
        let err = parse_goals(r#"{"goals": "none"}"#).unwrap_err();
        assert!(err.to_string().contains("not a list"));
        assert!(parse_goals(r#"{"goals": null}"#).unwrap().is_empty());
    }
}
