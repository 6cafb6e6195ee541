//! Fact extractors.
//!
//! One extractor per draft category. Each turns the transcript (plus roster
//! names as hints) into that category's items, or an [`ExtractionFailure`].
//! Extractors are independent of each other and share nothing mutable.
//!
//! The shipped implementation is [`PromptExtractor`]: a category prompt sent to
//! a [`CompletionProvider`] and the reply run through the category parser.

pub mod command;
pub mod parse;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::draft::{
    AttendanceRecord, Category, ChallengeGroup, Goal, MarketingGroup, SessionSentiment,
    StuckDetection,
};
use crate::error::ExtractionFailure;

pub use command::CommandProvider;

/// Produces one category of facts from a transcript.
#[async_trait]
pub trait FactExtractor<T>: Send + Sync {
    async fn extract(&self, transcript: &str, roster_names: &[String])
        -> Result<T, ExtractionFailure>;
}

/// Turns a prompt into raw model output.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, category: Category, prompt: &str) -> Result<String, ExtractionFailure>;
}

type PromptBuilder = fn(&str, &[String], usize) -> String;
type OutputParser<T> = fn(&str) -> Result<T, ExtractionFailure>;

pub struct PromptExtractor<T> {
    category: Category,
    provider: Arc<dyn CompletionProvider>,
    prompt_max_chars: usize,
    build_prompt: PromptBuilder,
    parse: OutputParser<T>,
}

impl<T> PromptExtractor<T> {
    pub fn new(
        category: Category,
        provider: Arc<dyn CompletionProvider>,
        prompt_max_chars: usize,
        build_prompt: PromptBuilder,
        parse: OutputParser<T>,
    ) -> Self {
        Self {
            category,
            provider,
            prompt_max_chars,
            build_prompt,
            parse,
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> FactExtractor<T> for PromptExtractor<T> {
    async fn extract(
        &self,
        transcript: &str,
        roster_names: &[String],
    ) -> Result<T, ExtractionFailure> {
        let prompt = (self.build_prompt)(transcript, roster_names, self.prompt_max_chars);
        let raw = self.provider.complete(self.category, &prompt).await?;
        log::debug!(
            "{} extractor returned {} bytes",
            self.category,
            raw.len()
        );
        (self.parse)(&raw)
    }
}

/// The six extractors a pass runs.
#[derive(Clone)]
pub struct ExtractorSet {
    pub attendance: Arc<dyn FactExtractor<Vec<AttendanceRecord>>>,
    pub goals: Arc<dyn FactExtractor<Vec<Goal>>>,
    pub challenges: Arc<dyn FactExtractor<Vec<ChallengeGroup>>>,
    pub marketing: Arc<dyn FactExtractor<Vec<MarketingGroup>>>,
    pub stucks: Arc<dyn FactExtractor<Vec<StuckDetection>>>,
    pub sentiment: Arc<dyn FactExtractor<SessionSentiment>>,
}

impl ExtractorSet {
    /// Prompt-based extractors for every category over one provider.
    pub fn from_provider(provider: Arc<dyn CompletionProvider>, prompt_max_chars: usize) -> Self {
        Self {
            attendance: Arc::new(PromptExtractor::new(
                Category::Attendance,
                provider.clone(),
                prompt_max_chars,
                prompts::attendance_prompt,
                parse::parse_attendance,
            )),
            goals: Arc::new(PromptExtractor::new(
                Category::Goals,
                provider.clone(),
                prompt_max_chars,
                prompts::goals_prompt,
                parse::parse_goals,
            )),
            challenges: Arc::new(PromptExtractor::new(
                Category::Challenges,
                provider.clone(),
                prompt_max_chars,
                prompts::challenges_prompt,
                parse::parse_challenges,
            )),
            marketing: Arc::new(PromptExtractor::new(
                Category::Marketing,
                provider.clone(),
                prompt_max_chars,
                prompts::marketing_prompt,
                parse::parse_marketing,
            )),
            stucks: Arc::new(PromptExtractor::new(
                Category::Stucks,
                provider.clone(),
                prompt_max_chars,
                prompts::stucks_prompt,
                parse::parse_stucks,
            )),
            sentiment: Arc::new(PromptExtractor::new(
                Category::Sentiment,
                provider,
                prompt_max_chars,
                prompts::sentiment_prompt,
                parse::parse_sentiment,
            )),
        }
    }
}
