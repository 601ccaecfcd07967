//! Chat-completion client for OpenAI-compatible providers

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::errors::TalentMatchError;

/// One completed chat call with reported token usage
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Client for a single chat-completion call type: (system instruction, user
/// content) in, JSON-parseable completion plus token usage out.
///
/// Works against any OpenAI-compatible endpoint (OpenAI itself, or Ollama's
/// `/v1` compatibility surface).
pub struct LlmClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl LlmClient {
    /// Create a new LLM client with a fixed per-call timeout
    pub fn new(endpoint: String, api_key: String, model: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| TalentMatchError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key,
            model,
            client,
        })
    }

    pub fn from_config(config: &crate::config::LlmConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.timeout_secs,
        )
    }

    /// Issue one chat-completion call requesting a JSON object response.
    ///
    /// # Errors
    /// - Network failures and timeouts
    /// - Non-success HTTP status from the provider
    /// - Responses without a completion choice
    pub async fn complete(&self, system: &str, user: &str) -> Result<LlmCompletion> {
        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f32,
            response_format: ResponseFormat<'a>,
        }

        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
            #[serde(default)]
            usage: Option<Usage>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        #[derive(Deserialize, Default)]
        struct Usage {
            #[serde(default)]
            prompt_tokens: u64,
            #[serde(default)]
            completion_tokens: u64,
        }

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {}", url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TalentMatchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TalentMatchError::Llm(format!(
                "Chat API error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| TalentMatchError::Llm(format!("Failed to parse response: {e}")))?;

        let usage = result.usage.unwrap_or_default();
        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| TalentMatchError::Llm("No completion in response".to_string()))?;

        Ok(LlmCompletion {
            content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires API key"]
    async fn test_chat_completion() {
        let client = LlmClient::new(
            "https://api.openai.com/v1".to_string(),
            std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            "gpt-4o-mini".to_string(),
            30,
        )
        .unwrap();

        let completion = client
            .complete("Answer with a JSON object {\"ok\": true}", "ping")
            .await
            .unwrap();
        assert!(completion.content.contains("ok"));
    }
}
