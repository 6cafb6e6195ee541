// Group analytics
// Per-member activity counts over committed facts and a heuristic risk level.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{DbGoal, MemberRole, SessionDb};
use crate::error::PipelineError;

/// How far back member history is read for the counts below.
const HISTORY_LIMIT: usize = 100;
/// A member with no goal set in this window counts as inactive.
const RECENT_GOAL_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    OnTrack,
    MediumRisk,
    HighRisk,
    CrushingIt,
}

/// Inputs to [`assess_risk`], already counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskSignals {
    pub sessions_recorded: usize,
    pub absences: usize,
    pub recent_goals: usize,
    pub stuck_detections: usize,
    pub wins: usize,
    pub revenue: f64,
}

/// Score a member and map the score to a level.
///
/// Two or more absences add 3 and a single absence adds 1. No recent goal
/// while attendance exists adds 2, as do two or more stuck detections. Any
/// win or revenue overrides the score with `CrushingIt`; otherwise 4 and up
/// is high risk and 2 and up is medium.
pub fn assess_risk(signals: &RiskSignals) -> (RiskLevel, u32) {
    let mut score = 0;
    match signals.absences {
        0 => {}
        1 => score += 1,
        _ => score += 3,
    }
    if signals.recent_goals == 0 && signals.sessions_recorded > 0 {
        score += 2;
    }
    if signals.stuck_detections >= 2 {
        score += 2;
    }

    let level = if signals.wins > 0 || signals.revenue > 0.0 {
        RiskLevel::CrushingIt
    } else if score >= 4 {
        RiskLevel::HighRisk
    } else if score >= 2 {
        RiskLevel::MediumRisk
    } else {
        RiskLevel::OnTrack
    };
    (level, score)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub total_sessions: usize,
    /// Percent of recorded sessions attended, one decimal.
    pub attendance_rate: f64,
    pub total_goals: usize,
    pub completed_goals: usize,
    pub vague_goals: usize,
    pub challenges: usize,
    pub stuck_detections: usize,
    pub marketing_activities: usize,
    pub wins: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAnalytics {
    pub member_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub role: MemberRole,
    pub stats: MemberStats,
    pub risk_level: RiskLevel,
    pub risk_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAnalytics {
    pub group_id: i64,
    pub total_sessions: i64,
    pub members: Vec<MemberAnalytics>,
}

/// Store timestamps are either RFC 3339 or SQLite's `datetime('now')`.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn goals_since(goals: &[DbGoal], since: DateTime<Utc>) -> usize {
    goals
        .iter()
        .filter(|g| parse_timestamp(&g.created_at).is_some_and(|at| at > since))
        .count()
}

fn rate(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Analytics for every active member of a group, as of `now`.
pub fn group_analytics(
    db: &SessionDb,
    group_id: i64,
    now: DateTime<Utc>,
) -> Result<GroupAnalytics, PipelineError> {
    if db.get_group(group_id)?.is_none() {
        return Err(PipelineError::FatalPrecondition(format!(
            "Group {} not found",
            group_id
        )));
    }
    let since = now - Duration::days(RECENT_GOAL_DAYS);

    let mut members = Vec::new();
    for gm in db.active_members(group_id)? {
        let goals = db.get_member_goals(gm.member_id, HISTORY_LIMIT)?;
        let challenges = db.get_member_challenges(gm.member_id, HISTORY_LIMIT)?;
        let stucks = db.get_member_stucks(gm.member_id, HISTORY_LIMIT)?;
        let marketing = db.get_member_marketing(gm.member_id, HISTORY_LIMIT)?;
        let attendance = db.member_attendance_in_group(gm.member_id, group_id)?;
        let email = db.get_member(gm.member_id)?.and_then(|m| m.email);

        let present = attendance.iter().filter(|s| s.as_str() == "present").count();
        let wins = marketing.iter().filter(|a| a.is_win).count();
        let signals = RiskSignals {
            sessions_recorded: attendance.len(),
            absences: attendance.len() - present,
            recent_goals: goals_since(&goals, since),
            stuck_detections: stucks.len(),
            wins,
            revenue: marketing.iter().filter_map(|a| a.revenue).sum(),
        };
        let (risk_level, risk_score) = assess_risk(&signals);

        members.push(MemberAnalytics {
            member_id: gm.member_id,
            name: gm.name,
            email,
            role: gm.role,
            stats: MemberStats {
                total_sessions: attendance.len(),
                attendance_rate: rate(present, attendance.len()),
                total_goals: goals.len(),
                completed_goals: goals.iter().filter(|g| g.is_completed).count(),
                vague_goals: goals.iter().filter(|g| g.is_vague).count(),
                challenges: challenges.len(),
                stuck_detections: stucks.len(),
                marketing_activities: marketing.len(),
                wins,
            },
            risk_level,
            risk_score,
        });
    }

    let total_sessions = db.count_group_sessions(group_id)?;
    log::info!(
        "Group {}: analytics for {} members over {} sessions",
        group_id,
        members.len(),
        total_sessions
    );
    Ok(GroupAnalytics {
        group_id,
        total_sessions,
        members,
    })
}
