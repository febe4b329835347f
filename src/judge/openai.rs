//! Judge backed by an OpenAI-compatible chat completions endpoint.
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::prompt::{
    CONSISTENCY_SYSTEM_PROMPT, RELEVANCE_SYSTEM_PROMPT, build_analyze_prompt,
    build_relevance_prompt, parse_relevant_indices, parse_verdict,
};
use super::{AnalyzeRequest, JudgeError, SemanticJudge, Verdict};
use crate::model::{ChangedSymbol, DocSegment};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const TEMPERATURE: f64 = 0.1;

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

pub struct OpenAiJudge {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiJudge {
    /// Build a judge; an empty `base_url` selects the public endpoint.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        if api_key.trim().is_empty() {
            return Err(JudgeError::Unavailable("missing API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(JudgeError::Unavailable("missing model name".to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docdrift/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url.trim()
        };
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat(&self, system: &str, user: &str) -> Result<String, JudgeError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {"type": "json_object"},
            "temperature": TEMPERATURE,
        });

        debug!("POST {} (model {})", self.endpoint(), self.model);
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(JudgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = resp
            .json()
            .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(JudgeError::EmptyResponse)
    }
}

impl SemanticJudge for OpenAiJudge {
    fn name(&self) -> &str {
        "openai"
    }

    fn analyze(&self, request: &AnalyzeRequest<'_>) -> Result<Verdict, JudgeError> {
        let reply = self.chat(CONSISTENCY_SYSTEM_PROMPT, &build_analyze_prompt(request))?;
        parse_verdict(&reply)
    }

    fn check_relevance_batch(
        &self,
        symbol: &ChangedSymbol,
        candidates: &[DocSegment],
    ) -> Result<Vec<usize>, JudgeError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.chat(
            RELEVANCE_SYSTEM_PROMPT,
            &build_relevance_prompt(symbol, candidates),
        )?;
        parse_relevant_indices(&reply, candidates.len())
    }
}
