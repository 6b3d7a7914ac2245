use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::{Category, Question};

use crate::error::GatewayError;

/// What the user saw and picked, sent along with an explanation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainRequest {
    pub question: String,
    pub chosen_answer: String,
    pub correct_answer: String,
}

impl ExplainRequest {
    /// Build a request for `selected` on `question`. An out-of-range
    /// selection is sent as an empty answer.
    #[must_use]
    pub fn for_answer(question: &Question, selected: usize) -> Self {
        Self {
            question: question.text().to_owned(),
            chosen_answer: question.option(selected).unwrap_or_default().to_owned(),
            correct_answer: question.correct_option().to_owned(),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "You are a UK Driving Theory expert.\n\
             Question: \"{question}\"\n\
             User selected: \"{chosen}\"\n\
             The correct answer is: \"{correct}\"\n\n\
             Please explain in a friendly, encouraging way why \"{correct}\" is correct and \
             briefly why \"{chosen}\" is incorrect if it differs. Reference the UK Highway Code \
             where possible. Keep the explanation under 100 words.",
            question = self.question,
            chosen = self.chosen_answer,
            correct = self.correct_answer,
        )
    }
}

/// Remote text generation used for answer explanations and study tips.
#[async_trait]
pub trait ExplanationGateway: Send + Sync {
    /// # Errors
    ///
    /// Returns `GatewayError` when the text cannot be produced.
    async fn explain_answer(&self, request: &ExplainRequest) -> Result<String, GatewayError>;

    /// # Errors
    ///
    /// Returns `GatewayError` when the text cannot be produced.
    async fn study_tip(&self, category: Category) -> Result<String, GatewayError>;
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
}

/// `ExplanationGateway` over an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatGateway {
    client: Client,
    config: Option<GatewayConfig>,
}

impl ChatGateway {
    /// A gateway that is disabled when `config` is `None`.
    #[must_use]
    pub fn new(config: Option<GatewayConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` when the gateway is disabled, the request fails
    /// or times out, or the response is empty.
    pub async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GatewayError> {
        let config = self.config.as_ref().ok_or(GatewayError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .timeout(config.timeout)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GatewayError::EmptyResponse)?;

        Ok(content)
    }
}

#[async_trait]
impl ExplanationGateway for ChatGateway {
    async fn explain_answer(&self, request: &ExplainRequest) -> Result<String, GatewayError> {
        self.generate(&request.prompt(), 0.7).await
    }

    async fn study_tip(&self, category: Category) -> Result<String, GatewayError> {
        let prompt = format!(
            "Give me a unique, short, and actionable study tip for the UK Driving Theory \
             category: {category}."
        );
        self.generate(&prompt, 0.9).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionBank;

    #[test]
    fn request_quotes_chosen_and_correct_options() {
        let bank = QuestionBank::builtin();
        let question = &bank.all()[1];
        let request = ExplainRequest::for_answer(question, 0);

        assert_eq!(request.chosen_answer, "53 metres (175 feet)");
        assert_eq!(request.correct_answer, "96 metres (315 feet)");
        let prompt = request.prompt();
        assert!(prompt.contains("User selected: \"53 metres (175 feet)\""));
        assert!(prompt.contains("under 100 words"));
    }

    #[tokio::test]
    async fn disabled_gateway_fails_fast() {
        let gateway = ChatGateway::disabled();
        assert!(!gateway.enabled());
        let err = gateway
            .study_tip(Category::MotorwayRules)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Disabled));
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }
}
