use crate::config::RestApiConfig;
use crate::error::TransportError;
use crate::transport::model::ApiRequest;
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Executes HTTP exchanges and classifies their outcome.
///
/// Implementations run on whatever worker the runtime picks; callers apply the
/// result to their own state afterwards.
#[async_trait]
pub trait PhotoHttpClient: Send + Sync {
    /// Returns the body of a 2xx response. A 2xx without a body is a failure.
    async fn perform(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError>;

    /// Like [`perform`](Self::perform), then decodes the body as JSON.
    async fn perform_decoding<R>(&self, request: ApiRequest) -> Result<R, TransportError>
    where
        R: DeserializeOwned + Send,
    {
        let body = self.perform(request).await?;
        decode_body(&body)
    }
}

pub(crate) fn decode_body<R: DeserializeOwned>(body: &[u8]) -> Result<R, TransportError> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Failed to deserialize response body: {}", e);
        TransportError::DecodingFailed(e.to_string())
    })
}

/// `reqwest` backed client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new(config: &RestApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| {
                TransportError::InvalidRequest(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }

    async fn handle_response(response: Response) -> Result<Vec<u8>, TransportError> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!("Failed to read response body: {:?}", e);
            TransportError::Transport(e.to_string())
        })?;

        debug!("Response Status: {}", status);

        if !status.is_success() {
            let body_text = String::from_utf8_lossy(&body).into_owned();
            error!(
                "API request failed. Status: {}, Body: {}",
                status, body_text
            );
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: body_text,
            });
        }

        if body.is_empty() {
            error!("API request returned {} without a body", status);
            return Err(TransportError::EmptyBody);
        }

        Ok(body.to_vec())
    }
}

#[async_trait]
impl PhotoHttpClient for ReqwestHttpClient {
    #[instrument(skip(self, request), fields(request = %request))]
    async fn perform(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        debug!("Sending {} request", request.method);

        let mut headers = header::HeaderMap::new();
        for (name, value) in &request.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let response = match self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to send {} request: {:?}", request.method, e);
                return Err(TransportError::from(e));
            }
        };

        Self::handle_response(response).await
    }
}
