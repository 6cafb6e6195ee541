//! peerlog: turn a session transcript into a reviewed, committed record.
//!
//! The review file is the JSON form of a review session. It is written by
//! `process`, updated in place by `correct` and `commit`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;

use peerlog_lib::db::{DbChallenge, DbGoal, DbMarketingActivity, DbStuck, SessionDb};
use peerlog_lib::draft::{Category, RefPath};
use peerlog_lib::error::{ErrorView, PipelineError};
use peerlog_lib::persist::{CommitPolicy, CommitScope};
use peerlog_lib::reconcile::Reconciler;
use peerlog_lib::review::ReviewSession;
use peerlog_lib::roster::RosterSource;
use peerlog_lib::services::analytics::group_analytics;
use peerlog_lib::services::sessions::TranscriptPipeline;
use peerlog_lib::state::load_config;

const HISTORY_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "peerlog")]
#[command(about = "Extract, review and commit peer-group session facts")]
struct Cli {
    /// Database file (defaults to the configured location)
    #[arg(long, env = "PEERLOG_DB", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and reconcile a transcript into a review file
    Process {
        session_id: i64,
        transcript: PathBuf,
        /// Where to write the review (stdout when omitted)
        out: Option<PathBuf>,
    },
    /// Ranked roster candidates for one reference
    Suggest { review: PathBuf, path: RefPath },
    /// Settle a reference to a member by hand
    Correct {
        review: PathBuf,
        path: RefPath,
        member_id: i64,
    },
    /// Write reviewed facts to the store
    Commit {
        review: PathBuf,
        /// Refuse to write anything while a reference is unsettled
        #[arg(long)]
        strict: bool,
        /// Only these categories
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<Category>,
    },
    /// Active members of a group
    Roster { group_id: i64 },
    /// Committed goals, challenges, stucks and marketing for a member
    History { member_id: i64 },
    /// Per-member stats and risk levels for a group
    Analytics { group_id: i64 },
    /// Mark a goal completed
    CompleteGoal {
        goal_id: i64,
        /// Mark it not completed instead
        #[arg(long)]
        undo: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberHistory {
    member_id: i64,
    goals: Vec<DbGoal>,
    challenges: Vec<DbChallenge>,
    stuck_detections: Vec<DbStuck>,
    marketing_activities: Vec<DbMarketingActivity>,
}

fn read_review(path: &Path) -> Result<ReviewSession, PipelineError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        PipelineError::Io(format!("{} is not a review file: {}", path.display(), e))
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(value).map_err(|e| PipelineError::Io(e.to_string()))
}

fn write_review(path: &Path, review: &ReviewSession) -> Result<(), PipelineError> {
    std::fs::write(path, to_json(review)?)?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = load_config()?;
    let open_db = || -> Result<SessionDb, PipelineError> {
        let db = match &cli.db {
            Some(path) => SessionDb::open_at(path.clone())?,
            None => SessionDb::open(&config)?,
        };
        Ok(db)
    };

    match cli.command {
        Command::Process {
            session_id,
            ref transcript,
            ref out,
        } => {
            let text = std::fs::read_to_string(transcript)?;
            let db = open_db()?;
            let pipeline = TranscriptPipeline::from_config(&config)?;
            let review = pipeline.process_transcript(&db, session_id, &text).await?;
            match out {
                Some(path) => {
                    write_review(path, &review)?;
                    println!("{}", path.display());
                }
                None => println!("{}", to_json(&review)?),
            }
        }
        Command::Suggest {
            ref review,
            ref path,
        } => {
            let session = read_review(review)?;
            let reconciler = Reconciler::new(config.matching);
            let candidates = session.suggestions(&reconciler, path)?;
            println!("{}", to_json(&candidates)?);
        }
        Command::Correct {
            ref review,
            ref path,
            member_id,
        } => {
            let mut session = read_review(review)?;
            session.apply_correction(path, member_id)?;
            write_review(review, &session)?;
            let unresolved: Vec<String> =
                session.draft.unresolved().iter().map(|p| p.to_string()).collect();
            println!("{}", to_json(&unresolved)?);
        }
        Command::Commit {
            ref review,
            strict,
            ref only,
        } => {
            let policy = if strict {
                CommitPolicy::Strict
            } else {
                CommitPolicy::Partial
            };
            let scope = if only.is_empty() {
                CommitScope::all(policy)
            } else {
                CommitScope::only(only.iter().copied(), policy)
            };
            let mut session = read_review(review)?;
            let db = open_db()?;
            let report = session.commit(&db, &scope)?.clone();
            write_review(review, &session)?;
            println!("{}", to_json(&report)?);
        }
        Command::Roster { group_id } => {
            let db = open_db()?;
            let roster = db.build_roster(group_id)?;
            for entry in roster.entries() {
                println!("{}\t{}", entry.member.id, entry.member.name);
            }
        }
        Command::History { member_id } => {
            let db = open_db()?;
            let history = MemberHistory {
                member_id,
                goals: db.get_member_goals(member_id, HISTORY_LIMIT)?,
                challenges: db.get_member_challenges(member_id, HISTORY_LIMIT)?,
                stuck_detections: db.get_member_stucks(member_id, HISTORY_LIMIT)?,
                marketing_activities: db.get_member_marketing(member_id, HISTORY_LIMIT)?,
            };
            println!("{}", to_json(&history)?);
        }
        Command::Analytics { group_id } => {
            let db = open_db()?;
            let analytics = group_analytics(&db, group_id, Utc::now())?;
            println!("{}", to_json(&analytics)?);
        }
        Command::CompleteGoal { goal_id, undo } => {
            let db = open_db()?;
            if !db.update_goal_completion(goal_id, !undo)? {
                return Err(PipelineError::FatalPrecondition(format!(
                    "Goal {} not found",
                    goal_id
                )));
            }
            log::info!("Goal {} marked {}", goal_id, if undo { "open" } else { "completed" });
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            let view = ErrorView::from(&e);
            match serde_json::to_string_pretty(&view) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", e),
            }
            ExitCode::FAILURE
        }
    }
}
