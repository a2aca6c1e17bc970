use url::Url;

use crate::config::ProviderType;
use crate::error::ApiError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Built-in base URL for `provider_type`, if the vendor has one.
#[must_use]
pub fn default_base_url(provider_type: ProviderType) -> Option<&'static str> {
    match provider_type {
        ProviderType::OpenAi => Some(DEFAULT_OPENAI_BASE_URL),
        ProviderType::OpenRouter => Some(DEFAULT_OPENROUTER_BASE_URL),
        ProviderType::HuggingFace => Some(DEFAULT_HUGGINGFACE_BASE_URL),
        ProviderType::Anthropic => Some(DEFAULT_ANTHROPIC_BASE_URL),
        ProviderType::CustomOpenAi | ProviderType::CustomAnthropic => None,
    }
}

/// Normalize a base URL to an OpenAI-compatible chat completions endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/completions` unchanged
/// 2) append `/chat/completions` otherwise
pub fn chat_completions_url(base: &str) -> Result<String, ApiError> {
    let trimmed = base.trim().trim_end_matches('/');
    let endpoint = if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    };
    validate(endpoint)
}

/// Normalize a base URL to an Anthropic messages endpoint.
///
/// Normalization rules:
/// 1) keep `/v1/messages` unchanged
/// 2) append `/messages` when path ends in `/v1`
/// 3) append `/v1/messages` otherwise
pub fn messages_url(base: &str) -> Result<String, ApiError> {
    let trimmed = base.trim().trim_end_matches('/');
    let endpoint = if trimmed.ends_with("/v1/messages") {
        trimmed.to_string()
    } else if trimmed.ends_with("/v1") {
        format!("{trimmed}/messages")
    } else {
        format!("{trimmed}/v1/messages")
    };
    validate(endpoint)
}

fn validate(endpoint: String) -> Result<String, ApiError> {
    let parsed = Url::parse(&endpoint).map_err(|_| ApiError::InvalidBaseUrl(endpoint.clone()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(endpoint),
        _ => Err(ApiError::InvalidBaseUrl(endpoint)),
    }
}
