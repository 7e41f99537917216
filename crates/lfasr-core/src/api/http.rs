//! reqwest-backed transport.
//!
//! - Non-upload endpoints: `application/x-www-form-urlencoded` POST
//! - `upload`: multipart form with the signed fields and a `content` file part
//! - Every reply is parsed as an `Envelope`; HTTP failures become `ApiError::Status`

use async_trait::async_trait;

use super::{ApiRequest, Endpoint, Envelope, Transport};
use crate::config::ClientConfig;
use crate::error::{ApiError, LfasrError, Result};

/// HTTP transport with a pooled client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LfasrError::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client (shared connection pool)
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: Endpoint, request: ApiRequest) -> Result<Envelope, ApiError> {
        let url = self.config.endpoint_url(endpoint.path());
        let builder = self.client.post(&url);

        let builder = match request.content {
            Some(content) => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in request.fields {
                    form = form.text(name, value);
                }
                let part = reqwest::multipart::Part::bytes(content.bytes)
                    .file_name(content.file_name)
                    .mime_str("application/octet-stream")?;
                builder.multipart(form.part("content", part))
            }
            None => builder.form(&request.fields),
        };

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status { status, body });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{e} in response body {text:?}")))
    }
}
