//! Decision settings: fallback policy terms used when retrieved text does
//! not state them, and the optional LLM collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Youngest insurable age when the policy text has no age limit
    #[serde(default = "default_min_age")]
    pub min_age: u32,

    /// Oldest insurable age when the policy text has no age limit
    #[serde(default = "default_max_age")]
    pub max_age: u32,

    /// Minimum policy duration before claims are payable
    #[serde(default = "default_waiting_period_months")]
    pub waiting_period_months: u32,
}

fn default_min_age() -> u32 {
    18
}

fn default_max_age() -> u32 {
    65
}

fn default_waiting_period_months() -> u32 {
    1
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_age: default_min_age(),
            max_age: default_max_age(),
            waiting_period_months: default_waiting_period_months(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_age > self.max_age {
            return Err(format!(
                "min_age ({}) must not exceed max_age ({})",
                self.min_age, self.max_age
            ));
        }
        Ok(())
    }
}

/// Optional LLM collaborator for coverage evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Use the LLM for coverage evaluation (rules remain the fallback)
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:8080/v1`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Bearer token; usually supplied as `CD_GENERATION__API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_generation_model() -> String {
    "mistral-7b-instruct".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_generation_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}
