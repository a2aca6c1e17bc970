//! HTTP transport and vendor adapters for the `chat_provider` contract.
//!
//! Two wire protocols are supported: OpenAI-compatible Chat Completions and
//! the Anthropic Messages API. Vendors that speak one of them differ only in
//! their default base URL, so each protocol has exactly one adapter type,
//! parameterised by base URL, and [`provider_for_config`] picks the URL.
//!
//! Adapters perform one request per `chat` call and never retry; transient
//! failures surface as retryable [`chat_provider::ProviderError`]s.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod openai;
pub mod provider;
pub mod url;

pub use client::HttpClient;
pub use config::{ProviderConfig, ProviderType};
pub use error::ApiError;
pub use provider::{provider_for_config, AnthropicProvider, OpenAiCompatibleProvider};
