//! Cross-page evaluation agent.
//!
//! Sends the accumulated per-page records to the LLM and returns its
//! reconciled document JSON untouched.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::openrouter::{Message, OpenRouterClient};
use crate::schema::PageRecord;

const SYSTEM_PROMPT: &str = r#"You are a document reconciliation agent. You receive the per-page layout
extraction of a single document as a JSON array of {"page no", "content"} records.
Clean and reconcile the extraction across pages: merge sections that continue
over a page boundary into the page where they start, normalize heading text,
drop repeated page headers and footers, and remove duplicate or empty regions.

Return ONLY a valid JSON array with the same record shape, one record per page,
in the same page order:

[
  {"page no": 1, "content": {"sections": [...]}},
  {"page no": 2, "content": {"sections": [...]}}
]

No commentary, no markdown."#;

pub struct EvaluationAgent {
    client: OpenRouterClient,
}

impl EvaluationAgent {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }

    /// Reconcile per-page extraction into the final document JSON.
    ///
    /// Whatever the model returns is passed through to the caller unmodified.
    pub async fn evaluate(&self, pages: &[PageRecord]) -> Result<Value> {
        info!(
            "EvaluationAgent: reconciling {} pages with {}",
            pages.len(),
            self.client.model()
        );

        let payload =
            serde_json::to_string(pages).context("Failed to serialize page records")?;
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(payload)];

        let response = self.client.chat(messages).await?;
        debug!("EvaluationAgent: raw response length: {} chars", response.len());

        parse_llm_json(&response).context("Failed to parse evaluation response")
    }
}

/// Parse the model reply, tolerating markdown code fences around the JSON.
fn parse_llm_json(response: &str) -> Result<Value> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    };

    serde_json::from_str(json_str).context(format!(
        "Invalid JSON in LLM reply: {}",
        &json_str.chars().take(200).collect::<String>()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let value = parse_llm_json(r#"{"title": "Report", "pages": 2}"#).unwrap();
        assert_eq!(value["pages"], 2);
    }

    #[test]
    fn strips_json_code_fence() {
        let reply = "Here is the result:\n```json\n{\"title\": null, \"pages\": 1}\n```\n";
        let value = parse_llm_json(reply).unwrap();
        assert_eq!(value["pages"], 1);
        assert!(value["title"].is_null());
    }

    #[test]
    fn strips_anonymous_code_fence() {
        let reply = "```\n{\"sections\": []}\n```";
        let value = parse_llm_json(reply).unwrap();
        assert!(value["sections"].as_array().unwrap().is_empty());
    }

    #[test]
    fn rejects_non_json_reply() {
        assert!(parse_llm_json("I could not process the document.").is_err());
    }
}
