//! Thread summarization through a generative model.
//!
//! Summaries never fail loudly: problems come back as text starting with
//! [`SUMMARY_ERROR_MARKER`], which record assembly recognizes and leaves out.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use threadcard_core::config::SummaryConfig;
use tracing::{debug, warn};

use crate::gateway::HistoryMessage;

/// Prefix of summaries that report a failure instead of content.
pub const SUMMARY_ERROR_MARKER: &str = "Error:";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a thread given newest-first history. Empty when there is
    /// nothing human-written to summarize.
    async fn summarize(&self, history: &[HistoryMessage]) -> String;
}

/// Whether `summary` has content worth storing.
pub fn is_usable_summary(summary: &str) -> bool {
    let trimmed = summary.trim();
    !trimmed.is_empty() && !trimmed.starts_with(SUMMARY_ERROR_MARKER)
}

/// Transcript of newest-first `history` in chronological order, bots skipped.
pub fn format_conversation(history: &[HistoryMessage]) -> String {
    history
        .iter()
        .rev()
        .filter(|m| !m.author.is_bot)
        .map(|m| format!("{}: {}\n", m.author.display_name, m.content))
        .collect()
}

fn build_prompt(conversation: &str) -> String {
    format!(
        "You are an assistant that summarizes team discussions.\n\
         Read the transcript of a chat thread and write a concise, informative summary \
         in the language of the conversation.\n\n\
         The summary must:\n\
         1. Be organized for quick reading, using **Heading:** lines and - bullets.\n\
         2. Identify the main idea or problem discussed.\n\
         3. List the key points, decisions taken or actions suggested.\n\
         4. Include any important links shared in the conversation.\n\
         5. Be objective and direct.\n\n\
         Transcript:\n---\n{}---\n\nPlease write the summary.",
        conversation
    )
}

/// Summarizer backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiSummarizer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiSummarizer {
    /// Without an API key every summary is an error marker.
    pub fn new(config: &SummaryConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        }
    }

    async fn generate(&self, api_key: &str, prompt: String) -> Result<String, String> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| format!("request failed: {err}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(format!("{status}: {body_text}"));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| format!("failed to parse response: {err}"))?;
        extract_text(parsed).ok_or_else(|| "no text in the response candidates".to_string())
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, history: &[HistoryMessage]) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return format!("{SUMMARY_ERROR_MARKER} AI summarization is not configured (missing API key).");
        };
        let conversation = format_conversation(history);
        if conversation.trim().is_empty() {
            return String::new();
        }

        debug!(model = %self.model, chars = conversation.len(), "Requesting thread summary");
        match self.generate(api_key, build_prompt(&conversation)).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Summary generation failed");
                format!("{SUMMARY_ERROR_MARKER} failed to generate the summary: {err}")
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    (!text.is_empty()).then_some(text)
}
