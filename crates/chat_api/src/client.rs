use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{parse_error_message, ApiError};

/// Upper bound on a single non-streaming completion request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Thin JSON-over-HTTP client shared by the vendor adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
}

impl HttpClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::from)?;
        Ok(Self { http })
    }

    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        headers: HeaderMap,
        body: &B,
    ) -> RequestBuilder {
        self.http.post(endpoint).headers(headers).json(body)
    }

    /// Posts `body` and decodes a successful JSON response.
    ///
    /// Non-2xx statuses become [`ApiError::Status`] with the vendor message.
    pub async fn post_json<B, R>(
        &self,
        endpoint: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.build_request(endpoint, headers, body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%endpoint, status = status.as_u16(), bytes = text.len(), "completion response");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: parse_error_message(status, &text),
            });
        }

        serde_json::from_str(&text).map_err(ApiError::Decode)
    }
}
