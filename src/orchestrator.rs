//! Extraction orchestrator.
//!
//! Validates the transcript, builds the roster once, then runs all six
//! extractors concurrently, each in its own task with its own deadline. A
//! category whose extractor fails, panics or runs past the deadline is recorded
//! as failed in the draft; the others are unaffected. Only an unusable
//! transcript or an unbuildable roster fails the whole pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::draft::{Category, CategoryResult, Draft, SessionSentiment};
use crate::error::{ExtractionFailure, PipelineError};
use crate::extract::{ExtractorSet, FactExtractor};
use crate::roster::{RosterIndex, RosterSource};
use crate::types::ExtractionConfig;

/// Draft plus the roster snapshot it was extracted against.
#[derive(Debug, Clone)]
pub struct ExtractionPass {
    pub roster: RosterIndex,
    pub draft: Draft,
}

/// Number of items an extractor produced, for logging.
trait ItemCount {
    fn item_count(&self) -> usize;
}

impl<T> ItemCount for Vec<T> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl ItemCount for SessionSentiment {
    fn item_count(&self) -> usize {
        self.statements.len()
    }
}

pub struct ExtractionOrchestrator {
    extractors: ExtractorSet,
    timeout: Duration,
    min_transcript_chars: usize,
    max_transcript_chars: usize,
}

impl ExtractionOrchestrator {
    pub fn new(extractors: ExtractorSet, config: &ExtractionConfig) -> Self {
        Self {
            extractors,
            timeout: Duration::from_secs(config.timeout_secs),
            min_transcript_chars: config.min_transcript_chars,
            max_transcript_chars: config.max_transcript_chars,
        }
    }

    /// Override the per-extractor deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate_transcript(&self, transcript: &str) -> Result<(), PipelineError> {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::FatalPrecondition(
                "transcript is empty".to_string(),
            ));
        }
        let len = trimmed.chars().count();
        if len < self.min_transcript_chars {
            return Err(PipelineError::FatalPrecondition(format!(
                "transcript is too short ({} characters, minimum {})",
                len, self.min_transcript_chars
            )));
        }
        let total = transcript.chars().count();
        if total > self.max_transcript_chars {
            return Err(PipelineError::FatalPrecondition(format!(
                "transcript is too long ({} characters, maximum {})",
                total, self.max_transcript_chars
            )));
        }
        Ok(())
    }

    /// Validate, build the roster for `group_id`, and extract every category.
    pub async fn run(
        &self,
        transcript: &str,
        group_id: i64,
        roster_source: &dyn RosterSource,
    ) -> Result<ExtractionPass, PipelineError> {
        self.validate_transcript(transcript)?;

        let roster = roster_source.build_roster(group_id)?;
        log::info!(
            "Built roster for group {} with {} active member(s)",
            group_id,
            roster.len()
        );
        if roster.is_empty() {
            log::warn!(
                "Group {} has no active members; every name will need review",
                group_id
            );
        }

        let draft = self.extract(transcript, &roster).await;
        Ok(ExtractionPass { roster, draft })
    }

    /// Run all extractors against an already validated transcript.
    pub async fn extract(&self, transcript: &str, roster: &RosterIndex) -> Draft {
        let transcript: Arc<str> = Arc::from(transcript);
        let names = Arc::new(roster.names());
        let set = &self.extractors;

        let (attendance, goals, challenges, marketing_activities, stuck_detections, sentiment) = tokio::join!(
            run_one(Category::Attendance, set.attendance.clone(), transcript.clone(), names.clone(), self.timeout),
            run_one(Category::Goals, set.goals.clone(), transcript.clone(), names.clone(), self.timeout),
            run_one(Category::Challenges, set.challenges.clone(), transcript.clone(), names.clone(), self.timeout),
            run_one(Category::Marketing, set.marketing.clone(), transcript.clone(), names.clone(), self.timeout),
            run_one(Category::Stucks, set.stucks.clone(), transcript.clone(), names.clone(), self.timeout),
            run_one(Category::Sentiment, set.sentiment.clone(), transcript, names, self.timeout),
        );

        let draft = Draft {
            attendance,
            goals,
            challenges,
            marketing_activities,
            stuck_detections,
            sentiment,
        };
        let failed = draft.failures().len();
        if failed > 0 {
            log::warn!("Extraction finished with {} failed categor(ies)", failed);
        }
        draft
    }
}

/// One extractor in its own task, bounded by `limit`. A stalled task is aborted.
async fn run_one<T>(
    category: Category,
    extractor: Arc<dyn FactExtractor<T>>,
    transcript: Arc<str>,
    names: Arc<Vec<String>>,
    limit: Duration,
) -> CategoryResult<T>
where
    T: ItemCount + Send + 'static,
{
    let started = Instant::now();
    let mut handle = tokio::spawn(async move { extractor.extract(&transcript, &names).await });

    let result = match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ExtractionFailure::unavailable(format!(
            "extractor task failed: {}",
            join_err
        ))),
        Err(_) => {
            handle.abort();
            Err(ExtractionFailure::Timeout {
                millis: limit.as_millis() as u64,
            })
        }
    };

    let elapsed = started.elapsed().as_millis();
    match &result {
        Ok(value) => log::info!(
            "{} extraction ok: {} item(s) in {}ms",
            category,
            value.item_count(),
            elapsed
        ),
        Err(ExtractionFailure::Timeout { millis }) => {
            log::warn!("{} extraction timed out after {}ms", category, millis)
        }
        Err(e) => log::warn!("{} extraction failed after {}ms: {}", category, elapsed, e),
    }
    result.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::fixtures::sample_draft;
    use crate::roster::Member;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Fixed<T>(T, Arc<AtomicUsize>);

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> FactExtractor<T> for Fixed<T> {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl<T: Send + 'static> FactExtractor<T> for Failing {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            Err(ExtractionFailure::malformed("unexpected token"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl<T: Send + 'static> FactExtractor<T> for Panicking {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            panic!("extractor bug");
        }
    }

    /// Sleeps far past any test deadline; flags when its future is dropped.
    struct Stalled(Arc<AtomicBool>);

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl<T: Send + 'static> FactExtractor<T> for Stalled {
        async fn extract(&self, _: &str, _: &[String]) -> Result<T, ExtractionFailure> {
            let _flag = DropFlag(self.0.clone());
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ExtractionFailure::unavailable("unreachable"))
        }
    }

    struct StaticRoster(Option<Vec<Member>>);

    impl RosterSource for StaticRoster {
        fn build_roster(&self, group_id: i64) -> Result<RosterIndex, PipelineError> {
            match &self.0 {
                Some(members) => Ok(RosterIndex::new(group_id, members.clone())),
                None => Err(PipelineError::FatalPrecondition(format!(
                    "group {} does not exist",
                    group_id
                ))),
            }
        }
    }

    fn members() -> StaticRoster {
        StaticRoster(Some(vec![
            Member { id: 1, name: "Jamie Lin".to_string() },
            Member { id: 2, name: "Pat Osei".to_string() },
        ]))
    }

    fn fixed_set(calls: &Arc<AtomicUsize>) -> ExtractorSet {
        let draft = sample_draft();
        ExtractorSet {
            attendance: Arc::new(Fixed(draft.attendance.value().unwrap().clone(), calls.clone())),
            goals: Arc::new(Fixed(draft.goals.value().unwrap().clone(), calls.clone())),
            challenges: Arc::new(Fixed(draft.challenges.value().unwrap().clone(), calls.clone())),
            marketing: Arc::new(Fixed(
                draft.marketing_activities.value().unwrap().clone(),
                calls.clone(),
            )),
            stucks: Arc::new(Fixed(
                draft.stuck_detections.value().unwrap().clone(),
                calls.clone(),
            )),
            sentiment: Arc::new(Fixed(draft.sentiment.value().unwrap().clone(), calls.clone())),
        }
    }

    fn transcript() -> String {
        "Jamie: Morning all. Pat, you're travelling this week? Pat: Yes, Lisbon. ".repeat(3)
    }

    fn orchestrator(set: ExtractorSet) -> ExtractionOrchestrator {
        ExtractionOrchestrator::new(set, &ExtractionConfig::default())
            .with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_all_categories_extracted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pass = orchestrator(fixed_set(&calls))
            .run(&transcript(), 1, &members())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(pass.draft.failures().is_empty());
        assert_eq!(pass.roster.len(), 2);
        assert_eq!(pass.draft, sample_draft());
    }

    /// Replace one category's extractor in `set`.
    fn fail_one(set: &mut ExtractorSet, category: Category, breaker: Breaker) {
        match category {
            Category::Attendance => set.attendance = breaker.into_extractor(),
            Category::Goals => set.goals = breaker.into_extractor(),
            Category::Challenges => set.challenges = breaker.into_extractor(),
            Category::Marketing => set.marketing = breaker.into_extractor(),
            Category::Stucks => set.stucks = breaker.into_extractor(),
            Category::Sentiment => set.sentiment = breaker.into_extractor(),
        }
    }

    enum Breaker {
        Fail,
        Panic,
    }

    impl Breaker {
        fn into_extractor<T: Send + 'static>(self) -> Arc<dyn FactExtractor<T>> {
            match self {
                Breaker::Fail => Arc::new(Failing),
                Breaker::Panic => Arc::new(Panicking),
            }
        }
    }

    /// Every category other than `failed` matches the fixture.
    fn assert_others_intact(draft: &Draft, failed: Category) {
        let expected = sample_draft();
        for category in Category::ALL.into_iter().filter(|c| *c != failed) {
            let intact = match category {
                Category::Attendance => draft.attendance == expected.attendance,
                Category::Goals => draft.goals == expected.goals,
                Category::Challenges => draft.challenges == expected.challenges,
                Category::Marketing => draft.marketing_activities == expected.marketing_activities,
                Category::Stucks => draft.stuck_detections == expected.stuck_detections,
                Category::Sentiment => draft.sentiment == expected.sentiment,
            };
            assert!(intact, "{} changed when {} failed", category, failed);
        }
    }

    #[tokio::test]
    async fn test_each_single_failure_leaves_other_five_intact() {
        for failed in Category::ALL {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut set = fixed_set(&calls);
            fail_one(&mut set, failed, Breaker::Fail);

            let pass = orchestrator(set).run(&transcript(), 1, &members()).await.unwrap();
            let failures = pass.draft.failures();
            assert_eq!(failures.len(), 1, "only {} should fail", failed);
            assert_eq!(failures[0].0, failed);
            assert!(matches!(failures[0].1, ExtractionFailure::Malformed { .. }));
            assert_eq!(calls.load(Ordering::SeqCst), 5);
            assert_others_intact(&pass.draft, failed);
        }
    }

    #[tokio::test]
    async fn test_panicking_extractor_is_isolated() {
        for failed in [Category::Challenges, Category::Sentiment] {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut set = fixed_set(&calls);
            fail_one(&mut set, failed, Breaker::Panic);

            let pass = orchestrator(set).run(&transcript(), 1, &members()).await.unwrap();
            assert!(matches!(
                pass.draft.failure(failed),
                Some(ExtractionFailure::Unavailable { .. })
            ));
            assert_eq!(pass.draft.failures().len(), 1);
            assert_others_intact(&pass.draft, failed);
        }
    }

    #[tokio::test]
    async fn test_stalled_extractor_times_out_and_is_cancelled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let mut set = fixed_set(&calls);
        set.marketing = Arc::new(Stalled(dropped.clone()));

        let started = Instant::now();
        let pass = orchestrator(set).run(&transcript(), 1, &members()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(
            pass.draft.failure(Category::Marketing),
            Some(&ExtractionFailure::Timeout { millis: 200 })
        );
        assert!(pass.draft.is_ok(Category::Attendance));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_fatal_before_extraction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator(fixed_set(&calls));
        for bad in ["", "   \n\t ", "too short"] {
            let err = orchestrator.run(bad, 1, &members()).await.unwrap_err();
            assert!(matches!(err, PipelineError::FatalPrecondition(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlong_transcript_is_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = ExtractionConfig {
            max_transcript_chars: 100,
            ..ExtractionConfig::default()
        };
        let orchestrator = ExtractionOrchestrator::new(fixed_set(&calls), &config);
        let err = orchestrator
            .run(&"a".repeat(101), 1, &members())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[tokio::test]
    async fn test_unknown_group_is_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = orchestrator(fixed_set(&calls))
            .run(&transcript(), 42, &StaticRoster(None))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FatalPrecondition(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_roster_still_extracts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pass = orchestrator(fixed_set(&calls))
            .run(&transcript(), 1, &StaticRoster(Some(Vec::new())))
            .await
            .unwrap();
        assert!(pass.roster.is_empty());
        assert!(pass.draft.failures().is_empty());
    }
}
