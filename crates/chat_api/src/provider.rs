use std::sync::Arc;

use async_trait::async_trait;
use chat_provider::{
    ChatProvider, Message, ProviderError, ProviderInitError, ProviderProfile, ToolDefinition,
};
use tracing::debug;

use crate::anthropic::{self, MessagesResponse};
use crate::client::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
use crate::config::{ProviderConfig, ProviderType};
use crate::headers::{anthropic_headers, openai_headers};
use crate::openai::{self, ChatCompletionResponse};
use crate::url::{chat_completions_url, default_base_url, messages_url};

/// Adapter for every vendor speaking OpenAI Chat Completions.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    model: String,
    api_key: String,
    endpoint: String,
    client: HttpClient,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ProviderInitError> {
        let endpoint = chat_completions_url(base_url).map_err(init_error)?;
        let client = HttpClient::new(Some(DEFAULT_REQUEST_TIMEOUT)).map_err(init_error)?;
        Ok(Self {
            name: name.into(),
            model: model.into(),
            api_key: api_key.into(),
            endpoint,
            client,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: self.name.clone(),
            model_id: self.model.clone(),
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let request = openai::build_request(&self.model, messages, tools);
        let headers = openai_headers(&self.api_key)?;
        debug!(provider = %self.name, model = %self.model, messages = messages.len(), "chat completion request");

        let response: ChatCompletionResponse = self
            .client
            .post_json(&self.endpoint, headers, &request)
            .await?;
        Ok(openai::into_message(response)?)
    }
}

/// Adapter for the Anthropic Messages API and compatible proxies.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    name: String,
    model: String,
    api_key: String,
    endpoint: String,
    client: HttpClient,
}

impl AnthropicProvider {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ProviderInitError> {
        let endpoint = messages_url(base_url).map_err(init_error)?;
        let client = HttpClient::new(Some(DEFAULT_REQUEST_TIMEOUT)).map_err(init_error)?;
        Ok(Self {
            name: name.into(),
            model: model.into(),
            api_key: api_key.into(),
            endpoint,
            client,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: self.name.clone(),
            model_id: self.model.clone(),
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, ProviderError> {
        let request = anthropic::build_request(&self.model, messages, tools);
        let headers = anthropic_headers(&self.api_key)?;
        debug!(provider = %self.name, model = %self.model, messages = messages.len(), "messages request");

        let response: MessagesResponse = self
            .client
            .post_json(&self.endpoint, headers, &request)
            .await?;
        Ok(anthropic::into_message(response))
    }
}

/// Builds the adapter for one configured provider.
///
/// Fails when the API key is blank or a custom vendor has no endpoint.
pub fn provider_for_config(
    config: &ProviderConfig,
) -> Result<Arc<dyn ChatProvider>, ProviderInitError> {
    if config.api_key.trim().is_empty() {
        return Err(ProviderInitError::new(format!(
            "provider '{}' has no API key",
            config.name
        )));
    }
    if config.model.trim().is_empty() {
        return Err(ProviderInitError::new(format!(
            "provider '{}' has no model",
            config.name
        )));
    }

    let base_url = match (config.endpoint(), default_base_url(config.provider_type)) {
        (Some(endpoint), _) => endpoint,
        (None, Some(default)) => default,
        (None, None) => {
            return Err(ProviderInitError::new(format!(
                "provider '{}' of type {} requires an endpoint",
                config.name,
                config.provider_type.as_str()
            )));
        }
    };

    let provider: Arc<dyn ChatProvider> = match config.provider_type {
        ProviderType::Anthropic | ProviderType::CustomAnthropic => Arc::new(AnthropicProvider::new(
            &config.name,
            &config.api_key,
            &config.model,
            base_url,
        )?),
        ProviderType::OpenAi
        | ProviderType::OpenRouter
        | ProviderType::HuggingFace
        | ProviderType::CustomOpenAi => Arc::new(OpenAiCompatibleProvider::new(
            &config.name,
            &config.api_key,
            &config.model,
            base_url,
        )?),
    };
    Ok(provider)
}

fn init_error(error: crate::error::ApiError) -> ProviderInitError {
    ProviderInitError::new(error.to_string())
}
