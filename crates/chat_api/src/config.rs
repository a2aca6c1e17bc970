use serde::{Deserialize, Serialize};

/// Vendor protocol family of a configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "custom-openai")]
    CustomOpenAi,
    #[serde(rename = "custom-anthropic")]
    CustomAnthropic,
}

impl ProviderType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::HuggingFace => "huggingface",
            Self::OpenRouter => "openrouter",
            Self::CustomOpenAi => "custom-openai",
            Self::CustomAnthropic => "custom-anthropic",
        }
    }

    /// True for vendors that speak the Anthropic Messages protocol.
    #[must_use]
    pub fn is_anthropic_protocol(self) -> bool {
        matches!(self, Self::Anthropic | Self::CustomAnthropic)
    }

    /// True for vendors with no default base URL.
    #[must_use]
    pub fn requires_endpoint(self) -> bool {
        matches!(self, Self::CustomOpenAi | Self::CustomAnthropic)
    }
}

/// One named provider credential as stored in `casabot.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub model: String,
    #[serde(default)]
    pub is_default: bool,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        provider_type: ProviderType,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_type,
            api_key: api_key.into(),
            endpoint: None,
            model: model.into(),
            is_default: false,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Configured endpoint, ignoring blank values.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
