//! Configuration types shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Contents of `~/.peerlog/config.json`. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Explicit database file. Defaults to `~/.peerlog/peerlog.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default)]
    pub matching: MatchThresholds,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.matching.validate()?;
        self.extraction.validate()
    }
}

/// Name-reconciliation policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchThresholds {
    /// Unique best match at or above this is auto-resolved.
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,
    /// Below this there is no candidate at all.
    #[serde(default = "default_review")]
    pub review: f64,
    /// Runner-up within this distance of the best makes the match ambiguous.
    #[serde(default = "default_tie_margin")]
    pub tie_margin: f64,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            high_confidence: default_high_confidence(),
            review: default_review(),
            tie_margin: default_tie_margin(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

impl MatchThresholds {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.high_confidence) || !in_unit(self.review) || !in_unit(self.tie_margin) {
            return Err(PipelineError::Config(
                "matching thresholds must be between 0 and 1".to_string(),
            ));
        }
        if self.review > self.high_confidence {
            return Err(PipelineError::Config(format!(
                "review threshold ({}) is above the high-confidence threshold ({})",
                self.review, self.high_confidence
            )));
        }
        Ok(())
    }
}

fn default_high_confidence() -> f64 {
    0.85
}

fn default_review() -> f64 {
    0.5
}

fn default_tie_margin() -> f64 {
    0.15
}

fn default_suggestion_limit() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Per-extractor wait before the category is marked failed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_transcript_chars")]
    pub min_transcript_chars: usize,
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,
    /// Transcript budget inside a single prompt; longer text is head+tail truncated.
    #[serde(default = "default_prompt_max_chars")]
    pub prompt_max_chars: usize,
    /// External program that turns a prompt (stdin) into JSON (stdout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ExtractorCommand>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            min_transcript_chars: default_min_transcript_chars(),
            max_transcript_chars: default_max_transcript_chars(),
            prompt_max_chars: default_prompt_max_chars(),
            command: None,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.timeout_secs == 0 {
            return Err(PipelineError::Config(
                "extraction.timeoutSecs must be greater than 0".to_string(),
            ));
        }
        if self.min_transcript_chars > self.max_transcript_chars {
            return Err(PipelineError::Config(format!(
                "extraction.minTranscriptChars ({}) exceeds maxTranscriptChars ({})",
                self.min_transcript_chars, self.max_transcript_chars
            )));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_min_transcript_chars() -> usize {
    50
}

fn default_max_transcript_chars() -> usize {
    100_000
}

fn default_prompt_max_chars() -> usize {
    60_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}
