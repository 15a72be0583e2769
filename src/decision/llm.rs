//! LLM-assisted coverage evaluation.
//!
//! The model sees the top retrieved chunks and the raw question and answers
//! with a JSON verdict. Anything that goes wrong here is a
//! [`GenerationError`]; the engine then falls back to the rule path.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::GenerationConfig;
use super::types::Decision;
use crate::vector::SearchHit;

/// Chunks included in the prompt.
pub const PROMPT_CHUNKS: usize = 3;

/// Context characters included in the prompt.
pub const MAX_CONTEXT_CHARS: usize = 2000;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Generation reply is malformed: {0}")]
    Malformed(String),
}

/// A text-completion collaborator.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the verdict prompt from the best `PROMPT_CHUNKS` hits.
pub fn build_prompt(query: &str, hits: &[SearchHit]) -> String {
    let context = hits
        .iter()
        .take(PROMPT_CHUNKS)
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let context: String = context.chars().take(MAX_CONTEXT_CHARS).collect();

    format!(
        "Analyze this insurance policy context and answer in JSON.\n\
         Context:\n{context}\n\n\
         Query: {query}\n\n\
         Respond with exactly one JSON object:\n\
         {{\"decision\": \"approved\" or \"rejected\", \"amount\": number, \
         \"justification\": \"string\", \"clauses_used\": [\"string\"]}}"
    )
}

#[derive(Debug, Deserialize)]
struct Verdict {
    decision: String,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    justification: String,
    #[serde(default)]
    clauses_used: Vec<String>,
}

/// Parse a model reply into a decision.
///
/// Models like to wrap JSON in prose or code fences, so the first balanced
/// `{...}` object in the reply is used.
pub fn parse_reply(reply: &str) -> Result<Decision, GenerationError> {
    let object = first_json_object(reply)
        .ok_or_else(|| GenerationError::Malformed("no JSON object in reply".to_string()))?;
    let verdict: Verdict =
        serde_json::from_str(object).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let justification = if verdict.justification.trim().is_empty() {
        "decision returned by the language model".to_string()
    } else {
        verdict.justification
    };

    let mut decision = match verdict.decision.trim().to_ascii_lowercase().as_str() {
        "approved" => Decision::approved(verdict.amount, justification),
        "rejected" => Decision::rejected(justification),
        other => {
            return Err(GenerationError::Malformed(format!(
                "unexpected decision '{other}'"
            )));
        }
    };
    for clause in verdict.clauses_used {
        decision.push_clause(clause);
    }
    Ok(decision)
}

fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// [`Generator`] for OpenAI-compatible `/chat/completions` endpoints.
pub struct HttpGenerator {
    client: Client,
    config: GenerationConfig,
}

impl std::fmt::Debug for HttpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerator")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl HttpGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

impl Generator for HttpGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Request(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.url())
            .headers(headers)
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Malformed("reply has no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionStatus;
    use crate::documents::Chunk;
    use crate::vector::EntryMetadata;

    fn hit(text: &str, chunk_id: usize) -> SearchHit {
        SearchHit {
            chunk: Chunk::new(text, None, "policy.txt", chunk_id),
            score: 0.9,
            metadata: EntryMetadata {
                filename: "policy.txt".to_string(),
                chunk_id,
            },
        }
    }

    #[test]
    fn test_prompt_uses_top_three_chunks() {
        let hits: Vec<SearchHit> = (0..5).map(|i| hit(&format!("clause number {i}"), i)).collect();
        let prompt = build_prompt("knee surgery?", &hits);

        assert!(prompt.contains("clause number 2"));
        assert!(!prompt.contains("clause number 3"));
        assert!(prompt.contains("Query: knee surgery?"));
    }

    #[test]
    fn test_prompt_truncates_context() {
        let long = "#".repeat(5000);
        let prompt = build_prompt("q", &[hit(&long, 0)]);
        assert_eq!(prompt.matches('#').count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_parse_reply_in_prose() {
        let reply = "Sure! ```json\n{\"decision\": \"approved\", \"amount\": 50000, \
                     \"justification\": \"covered {per} clause\", \
                     \"clauses_used\": [\"Clause 4.1\", \"Clause 7\"]}\n```";
        let decision = parse_reply(reply).unwrap();

        assert_eq!(decision.status(), DecisionStatus::Approved);
        assert_eq!(decision.amount(), 50000.0);
        assert_eq!(decision.clauses_used(), ["Clause 4.1", "Clause 7"]);
        assert_eq!(decision.justification_text(), "covered {per} clause");
    }

    #[test]
    fn test_parse_reply_rejected_never_carries_amount() {
        let reply = r#"{"decision": "rejected", "amount": 9000, "justification": "excluded"}"#;
        let decision = parse_reply(reply).unwrap();
        assert_eq!(decision.status(), DecisionStatus::Rejected);
        assert_eq!(decision.amount(), 0.0);
    }

    #[test]
    fn test_parse_reply_malformed() {
        assert!(matches!(
            parse_reply("I cannot help with that."),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"decision": "maybe"}"#),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"amount": 1}"#),
            Err(GenerationError::Malformed(_))
        ));
    }
}
