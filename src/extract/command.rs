//! Extraction backed by an external command.
//!
//! The configured program is started once per category with the prompt on stdin
//! and must print the JSON document on stdout. The category name is exposed to
//! it as `PEERLOG_CATEGORY`. The child is killed if the extraction is cancelled.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::CompletionProvider;
use crate::draft::Category;
use crate::error::ExtractionFailure;
use crate::types::ExtractorCommand;

/// Longest stderr excerpt carried into a failure message.
const STDERR_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(command: &ExtractorCommand) -> Self {
        Self::new(command.program.clone(), command.args.clone())
    }
}

#[async_trait]
impl CompletionProvider for CommandProvider {
    async fn complete(&self, category: Category, prompt: &str) -> Result<String, ExtractionFailure> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("PEERLOG_CATEGORY", category.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExtractionFailure::unavailable(format!(
                    "failed to start '{}': {}",
                    self.program, e
                ))
            })?;

        let stdin = child.stdin.take();
        let write_prompt = async move {
            if let Some(mut stdin) = stdin {
                // A child that never reads stdin closes the pipe; that is its business
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    log::debug!("{} extractor did not take the full prompt: {}", category, e);
                }
            }
        };
        let (_, output) = tokio::join!(write_prompt, child.wait_with_output());
        let output = output.map_err(|e| {
            ExtractionFailure::unavailable(format!("'{}' did not complete: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(ExtractionFailure::unavailable(format!(
                "'{}' exited with {}: {}",
                self.program, output.status, excerpt
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ExtractionFailure::malformed("extractor output is not valid UTF-8"))
    }
}
