// Sessions service
// Turns a raw transcript for a stored session into a reconciled review.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{DbExtractionRun, SessionDb};
use crate::draft::{Category, Draft};
use crate::error::PipelineError;
use crate::extract::{CommandProvider, ExtractorSet};
use crate::orchestrator::ExtractionOrchestrator;
use crate::reconcile::Reconciler;
use crate::review::ReviewSession;
use crate::types::Config;
use crate::util::sha256_hex;

pub struct TranscriptPipeline {
    orchestrator: ExtractionOrchestrator,
    reconciler: Reconciler,
}

impl TranscriptPipeline {
    pub fn new(orchestrator: ExtractionOrchestrator, reconciler: Reconciler) -> Self {
        Self {
            orchestrator,
            reconciler,
        }
    }

    /// Command-backed extractors and thresholds from config.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let command = config.extraction.command.as_ref().ok_or_else(|| {
            PipelineError::Config(
                "extraction.command is not set; nothing can extract transcripts".to_string(),
            )
        })?;
        let provider = Arc::new(CommandProvider::from_config(command));
        let extractors = ExtractorSet::from_provider(provider, config.extraction.prompt_max_chars);
        Ok(Self::new(
            ExtractionOrchestrator::new(extractors, &config.extraction),
            Reconciler::new(config.matching),
        ))
    }

    /// Extract and reconcile a transcript for `session_id`.
    ///
    /// The transcript is stored on the session and the pass is logged in
    /// `extraction_runs`; no extracted facts are written. A session that
    /// already has committed facts can be extracted again (to retry failed
    /// categories) only from the same transcript.
    pub async fn process_transcript(
        &self,
        db: &SessionDb,
        session_id: i64,
        transcript: &str,
    ) -> Result<ReviewSession, PipelineError> {
        let session = db.get_session(session_id)?.ok_or_else(|| {
            PipelineError::FatalPrecondition(format!("Session {} not found", session_id))
        })?;
        let sha = sha256_hex(transcript);
        if session.is_committed() && session.transcript_sha256.as_deref() != Some(sha.as_str()) {
            return Err(PipelineError::FatalPrecondition(format!(
                "Session {} already has facts committed from a different transcript",
                session_id
            )));
        }

        let pass = self.orchestrator.run(transcript, session.group_id, db).await?;
        let roster_size = pass.roster.len();

        let mut review = ReviewSession::new(session_id, pass);
        let summary = review.reconcile(&self.reconciler)?;

        db.save_transcript(session_id, transcript, &sha)?;

        let run = DbExtractionRun {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            transcript_sha256: sha,
            category_status: category_status(&review.draft),
            roster_size: roster_size as i64,
            unresolved_count: (summary.flagged + summary.unmatched) as i64,
            created_at: Utc::now().to_rfc3339(),
        };
        db.insert_extraction_run(&run)?;
        review.run_id = Some(run.id.clone());

        log::info!(
            "Session {}: extraction run {} ready for review ({} failed categories, {} to review)",
            session_id,
            run.id,
            review.draft.failures().len(),
            run.unresolved_count
        );
        Ok(review)
    }
}

/// `{"attendance": "ok", "sentiment": "timeout", ...}`
fn category_status(draft: &Draft) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = Category::ALL
        .into_iter()
        .map(|c| {
            let status = draft.failure(c).map(|f| f.kind()).unwrap_or("ok");
            (c.as_str().to_string(), serde_json::Value::from(status))
        })
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_group, test_db};
    use crate::draft::fixtures::sample_draft;
    use crate::error::ExtractionFailure;
    use crate::extract::FactExtractor;
    use crate::persist::{CommitPolicy, CommitScope};
    use crate::review::ReviewState;
    use crate::types::ExtractionConfig;
    use async_trait::async_trait;

    struct Fixed<T>(T);

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> FactExtractor<T> for Fixed<T> {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            Ok(self.0.clone())
        }
    }

    struct Unavailable;

    #[async_trait]
    impl<T: Send + 'static> FactExtractor<T> for Unavailable {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            Err(ExtractionFailure::unavailable("model offline"))
        }
    }

    fn pipeline() -> TranscriptPipeline {
        let draft = sample_draft();
        let extractors = ExtractorSet {
            attendance: Arc::new(Fixed(draft.attendance.value().unwrap().clone())),
            goals: Arc::new(Fixed(draft.goals.value().unwrap().clone())),
            challenges: Arc::new(Fixed(draft.challenges.value().unwrap().clone())),
            marketing: Arc::new(Fixed(draft.marketing_activities.value().unwrap().clone())),
            stucks: Arc::new(Fixed(draft.stuck_detections.value().unwrap().clone())),
            sentiment: Arc::new(Unavailable),
        };
        TranscriptPipeline::new(
            ExtractionOrchestrator::new(extractors, &ExtractionConfig::default()),
            Reconciler::default(),
        )
    }

    fn transcript() -> String {
        "Jamie: Morning all. Pat, you're travelling this week? Pat: Yes, Lisbon. ".repeat(3)
    }

    #[tokio::test]
    async fn test_process_transcript_builds_review_and_logs_run() {
        let db = test_db();
        let seeded = seed_group(&db);

        let review = pipeline()
            .process_transcript(&db, seeded.session_id, &transcript())
            .await
            .unwrap();

        assert_eq!(review.session_id, seeded.session_id);
        assert_eq!(review.roster.len(), 3);
        assert_ne!(review.state(), ReviewState::Drafted);
        assert!(review.draft.failure(Category::Sentiment).is_some());

        // "Jaime Lin" is close enough to be settled on its own
        let first = &review.draft.attendance.value().unwrap()[0].extracted_name;
        assert_eq!(first.resolved_member(), Some(seeded.members[0]));

        let runs = db.get_extraction_runs(seeded.session_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].roster_size, 3);
        assert_eq!(runs[0].category_status["attendance"], "ok");
        assert_eq!(runs[0].category_status["sentiment"], "unavailable");
        assert_eq!(runs[0].transcript_sha256, sha256_hex(&transcript()));
        assert_eq!(review.run_id.as_deref(), Some(runs[0].id.as_str()));

        assert_eq!(
            db.get_transcript(seeded.session_id).unwrap(),
            Some(transcript())
        );
        // Nothing committed yet
        assert!(!db.is_committed(seeded.session_id).unwrap());
        assert!(db.committed_attendance(seeded.session_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reprocess_after_commit_needs_same_transcript() {
        let db = test_db();
        let seeded = seed_group(&db);
        let pipeline = pipeline();

        let mut first = pipeline
            .process_transcript(&db, seeded.session_id, &transcript())
            .await
            .unwrap();
        let attendance = CommitScope::only([Category::Attendance], CommitPolicy::Partial);
        first.commit(&db, &attendance).unwrap();
        assert!(db.is_committed(seeded.session_id).unwrap());

        // Same transcript: a fresh run to retry the failed sentiment category
        let second = pipeline
            .process_transcript(&db, seeded.session_id, &transcript())
            .await
            .unwrap();
        assert_ne!(second.run_id, first.run_id);
        assert_eq!(db.get_extraction_runs(seeded.session_id).unwrap().len(), 2);

        let other = format!("{} Sam: Different call entirely.", transcript());
        let err = pipeline
            .process_transcript(&db, seeded.session_id, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FatalPrecondition(_)));
        assert_eq!(db.get_transcript(seeded.session_id).unwrap(), Some(transcript()));
    }

    #[tokio::test]
    async fn test_unknown_session_is_fatal() {
        let db = test_db();
        let err = pipeline()
            .process_transcript(&db, 77, &transcript())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FatalPrecondition(_)));
    }

    #[tokio::test]
    async fn test_short_transcript_is_fatal_and_not_stored() {
        let db = test_db();
        let seeded = seed_group(&db);
        let err = pipeline()
            .process_transcript(&db, seeded.session_id, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FatalPrecondition(_)));
        assert!(db.get_transcript(seeded.session_id).unwrap().is_none());
        assert!(db.get_extraction_runs(seeded.session_id).unwrap().is_empty());
    }

    #[test]
    fn test_from_config_requires_command() {
        let err = TranscriptPipeline::from_config(&Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
