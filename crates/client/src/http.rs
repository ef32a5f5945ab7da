use std::sync::Arc;
use std::time::Duration;

use common::types::ApiResponse;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::headers::auth_headers;
use crate::token::{MemoryTokenStore, TokenStore};

/// HTTP client bound to one API base URL and one token store.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_token_store(base_url, Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_token_store(base_url: &str, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), tokens })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> { &self.tokens }

    /// Builder for `path` (relative to the base URL) with auth headers attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let token = self.tokens.get();
        self.http.request(method, url).headers(auth_headers(token.as_deref()))
    }

    /// Send and unwrap the envelope; a success without `data` is an error.
    pub async fn handle_request<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let envelope = self.send::<T>(req).await?;
        envelope.data.ok_or_else(|| ClientError::InvalidResponse("response carried no data".into()))
    }

    /// Send a call whose success carries only a message.
    pub async fn handle_empty(&self, req: RequestBuilder) -> ClientResult<Option<String>> {
        Ok(self.send::<serde_json::Value>(req).await?.message)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<ApiResponse<T>> {
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), "api_response");

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| if text.is_empty() { status.to_string() } else { text.clone() });
            return Err(ClientError::from_status(status.as_u16(), message));
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(format!("{e}: {text}")))?;
        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "request failed".into());
            return Err(ClientError::Api { status: status.as_u16(), message });
        }
        Ok(envelope)
    }
}
