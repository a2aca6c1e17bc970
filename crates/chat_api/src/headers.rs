use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

use crate::error::ApiError;

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_ANTHROPIC_VERSION: &str = "anthropic-version";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub fn default_user_agent() -> String {
    format!("casabot/{}", env!("CARGO_PKG_VERSION"))
}

/// Bearer-token headers for OpenAI-compatible endpoints.
pub fn openai_headers(api_key: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = base_headers()?;
    headers.insert(
        AUTHORIZATION,
        header_value("authorization", &format!("Bearer {}", api_key.trim()))?,
    );
    Ok(headers)
}

pub fn anthropic_headers(api_key: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = base_headers()?;
    headers.insert(
        HeaderName::from_static(HEADER_API_KEY),
        header_value(HEADER_API_KEY, api_key.trim())?,
    );
    headers.insert(
        HeaderName::from_static(HEADER_ANTHROPIC_VERSION),
        HeaderValue::from_static(ANTHROPIC_VERSION),
    );
    Ok(headers)
}

fn base_headers() -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value("user-agent", &default_user_agent())?);
    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader(name))
}
