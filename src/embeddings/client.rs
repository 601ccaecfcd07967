//! Embedding API clients for supported providers

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::errors::TalentMatchError;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// `OpenAI` embeddings API
    OpenAI,
    /// Ollama local embeddings
    Ollama,
}

impl EmbeddingProvider {
    /// Parse the provider name from configuration
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "ollama" => Ok(EmbeddingProvider::Ollama),
            other => Err(TalentMatchError::Config(format!(
                "Unknown embedding provider: {other}"
            ))),
        }
    }
}

/// One embedding result with reported token usage.
///
/// Ollama does not report usage; tokens are estimated from input length so
/// cost accounting stays consistent across providers.
#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub vector: Vec<f32>,
    pub input_tokens: u64,
}

/// Client for generating embeddings
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(
        provider: EmbeddingProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| TalentMatchError::Http(e.to_string()))?;

        Ok(Self {
            provider,
            model,
            endpoint,
            api_key,
            client,
        })
    }

    pub fn from_config(config: &crate::config::EmbeddingsConfig) -> Result<Self> {
        Self::new(
            EmbeddingProvider::from_name(&config.provider)?,
            config.model.clone(),
            config.endpoint.clone(),
            config.api_key.clone(),
            config.timeout_secs,
        )
    }

    /// Generate an embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication failures)
    /// - Invalid API responses (malformed JSON, missing embedding data)
    pub async fn generate(&self, text: &str) -> Result<EmbeddingResponse> {
        match self.provider {
            EmbeddingProvider::OpenAI => self.generate_openai(text).await,
            EmbeddingProvider::Ollama => self.generate_ollama(text).await,
        }
    }

    /// Generate embedding using `OpenAI` API
    async fn generate_openai(&self, text: &str) -> Result<EmbeddingResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            TalentMatchError::Config("OpenAI API key not provided".to_string())
        })?;

        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
            #[serde(default)]
            usage: Option<Usage>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        #[derive(Deserialize, Default)]
        struct Usage {
            #[serde(default)]
            prompt_tokens: u64,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling OpenAI embeddings API: {}", url);

        let request = OpenAIRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
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
            return Err(TalentMatchError::Embedding(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| TalentMatchError::Embedding(format!("Failed to parse response: {e}")))?;

        let input_tokens = result.usage.unwrap_or_default().prompt_tokens;
        result
            .data
            .into_iter()
            .next()
            .map(|d| EmbeddingResponse {
                vector: d.embedding,
                input_tokens,
            })
            .ok_or_else(|| TalentMatchError::Embedding("No embedding in response".to_string()))
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<EmbeddingResponse> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
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
            return Err(TalentMatchError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| TalentMatchError::Embedding(format!("Failed to parse response: {e}")))?;

        // Rough estimate: no usage reporting from Ollama
        let input_tokens = (text.len() / 4) as u64;

        Ok(EmbeddingResponse {
            vector: result.embedding,
            input_tokens,
        })
    }
}
