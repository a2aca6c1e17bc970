use chat_provider::ProviderError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("response contained no choices")]
    EmptyResponse,
}

impl ApiError {
    /// Whether the fault looks transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(error: ApiError) -> Self {
        let retryable = error.is_retryable();
        let status = error.status();
        let converted = ProviderError::new(error.to_string()).with_retryable(retryable);
        match status {
            Some(status) => converted.with_status(status),
            None => converted,
        }
    }
}

/// Rate limits, timeouts, conflicts, and server-side faults.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || status >= 500
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

/// Extracts a human-readable message from a vendor error body.
///
/// Both OpenAI and Anthropic nest the message under `error.message`; any other
/// body is returned verbatim, and an empty body falls back to the status reason.
#[must_use]
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let nested = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|fields| fields.message)
        .filter(|message| !message.trim().is_empty());

    if let Some(message) = nested {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_vendor_message_is_preferred() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(
            parse_error_message(StatusCode::SERVICE_UNAVAILABLE, body),
            "Overloaded"
        );
    }

    #[test]
    fn empty_body_falls_back_to_status_reason() {
        assert_eq!(
            parse_error_message(StatusCode::TOO_MANY_REQUESTS, ""),
            "Too Many Requests"
        );
    }

    #[test]
    fn plain_text_body_is_kept() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream connect error\n"),
            "upstream connect error"
        );
    }

    #[test]
    fn status_classification_marks_transient_codes() {
        for status in [408, 409, 429, 500, 502, 503, 504, 529] {
            assert!(is_retryable_status(status), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!is_retryable_status(status), "{status} should not retry");
        }
    }

    #[test]
    fn conversion_to_provider_error_keeps_status_and_classification() {
        let error: ProviderError = ApiError::Status {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }
        .into();

        assert_eq!(error.status(), Some(401));
        assert!(!error.is_retryable());
        assert_eq!(error.message(), "HTTP 401 invalid x-api-key");
    }
}
