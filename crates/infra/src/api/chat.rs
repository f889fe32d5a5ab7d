//! Natural-language questions about the register
//!
//! The backend turns a question into a query over the register and answers
//! in prose, optionally with the matching rows.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::commands::ApiCommands;
use super::errors::ApiError;

/// Model the backend uses when the request names none
pub const DEFAULT_CHAT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Longest question the backend accepts, in characters
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Body of `POST /chat/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub model: String,
    /// 0.0 to 1.0
    pub temperature: f64,
    /// Return the generated query code with the answer
    pub show_code: bool,
}

impl ChatRequest {
    /// Question with the backend's defaults for everything else
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.2,
            show_code: false,
        }
    }

    #[must_use]
    pub fn with_code(mut self) -> Self {
        self.show_code = true;
        self
    }

    /// # Errors
    /// Returns `ApiError::InvalidInput` for an empty or overlong question or
    /// a temperature outside 0.0 to 1.0
    pub fn validate(&self) -> Result<(), ApiError> {
        let chars = self.question.chars().count();
        if chars == 0 || chars > MAX_QUESTION_CHARS {
            return Err(ApiError::InvalidInput(format!(
                "question must be 1 to {MAX_QUESTION_CHARS} characters, got {chars}"
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ApiError::InvalidInput(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Answer from `POST /chat/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// `success`, `no_results`, `invalid_request` or `error`
    pub status: String,
    #[serde(default)]
    pub answer_rows: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_log: Option<String>,
}

impl ChatResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Body of `GET /chat/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHealth {
    pub status: String,
    pub service: String,
    pub message: String,
}

impl ApiCommands {
    /// Ask a question about the register
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the request fails validation,
    /// otherwise any error of the request pipeline
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        request.validate()?;

        let response: ChatResponse = self.client().post("/chat/", request).await?;

        debug!(
            status = %response.status,
            rows = response.answer_rows.as_ref().map_or(0, Vec::len),
            "Chat answered"
        );
        Ok(response)
    }

    /// # Errors
    /// Returns any error of the request pipeline
    #[instrument(skip(self))]
    pub async fn chat_health(&self) -> Result<ChatHealth, ApiError> {
        self.client().get("/chat/health").await
    }
}
