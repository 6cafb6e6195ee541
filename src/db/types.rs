//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A member's role inside one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Facilitator,
    Participant,
    Observer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Facilitator => "facilitator",
            MemberRole::Participant => "participant",
            MemberRole::Observer => "observer",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "facilitator" => MemberRole::Facilitator,
            "observer" => MemberRole::Observer,
            _ => MemberRole::Participant,
        }
    }
}

/// A row from the `peer_groups` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbGroup {
    pub id: i64,
    pub program_id: Option<i64>,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
}

/// A row from the `members` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMember {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub is_active: bool,
}

/// An open membership joined with its member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbGroupMember {
    pub member_id: i64,
    pub name: String,
    pub role: MemberRole,
    pub joined_at: String,
}

/// A row from the `sessions` table. The transcript text itself is not loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSession {
    pub id: i64,
    pub group_id: i64,
    pub session_number: i64,
    pub session_date: Option<String>,
    pub transcript_sha256: Option<String>,
    pub extractions_committed_at: Option<String>,
    pub created_at: String,
}

impl DbSession {
    pub fn is_committed(&self) -> bool {
        self.extractions_committed_at.is_some()
    }
}

/// A row from `extraction_runs`: one pass over one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbExtractionRun {
    pub id: String,
    pub session_id: i64,
    pub transcript_sha256: String,
    /// Category name to `"ok"` or the failure kind.
    pub category_status: serde_json::Value,
    pub roster_size: i64,
    pub unresolved_count: i64,
    pub created_at: String,
}

/// A committed attendance row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAttendance {
    pub member_id: i64,
    pub status: String,
    pub notes: Option<String>,
    pub extracted_name: Option<String>,
    pub confidence: Option<i64>,
}

/// A committed strategy with its (possibly unknown) suggester.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStrategy {
    pub challenge_id: i64,
    pub summary: String,
    pub tag: Option<String>,
    pub suggested_by: Option<i64>,
    pub suggested_by_name: Option<String>,
}

/// Committed sentiment for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSentiment {
    pub score: i64,
    pub rationale: String,
    pub dominant_emotion: String,
    pub confidence: f64,
    pub statement_count: i64,
}

/// One ledger row: an item a commit has written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCommittedItem {
    pub item_path: String,
    pub category: String,
    /// Empty when the review had no extraction run id.
    pub run_id: String,
    pub committed_at: String,
}

/// Where a history row came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSessionRef {
    pub session_id: i64,
    pub session_number: i64,
    pub session_date: Option<String>,
}

/// A committed goal with its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbGoal {
    pub id: i64,
    pub session: DbSessionRef,
    pub member_id: i64,
    pub goal_text: String,
    pub is_vague: bool,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub extracted_name: Option<String>,
    pub created_at: String,
}

/// A committed challenge with its strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbChallenge {
    pub id: i64,
    pub session: DbSessionRef,
    pub description: String,
    pub category: String,
    pub strategies: Vec<DbStrategy>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStuck {
    pub id: i64,
    pub session: DbSessionRef,
    pub classification: String,
    pub summary: String,
    pub exact_quotes: Vec<String>,
    pub next_step: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMarketingOutcome {
    pub meetings: i64,
    pub proposals: i64,
    pub clients: i64,
    pub notes: Option<String>,
}

/// A committed marketing activity and its outcome, if one was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMarketingActivity {
    pub id: i64,
    pub session: DbSessionRef,
    pub stage: String,
    pub activity_type: String,
    pub quantity: i64,
    pub is_win: bool,
    pub contract_type: Option<String>,
    pub revenue: Option<f64>,
    pub outcome: Option<DbMarketingOutcome>,
    pub created_at: String,
}

/// A group session and its committed sentiment, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSessionSentiment {
    pub session: DbSessionRef,
    pub sentiment: Option<DbSentiment>,
}
