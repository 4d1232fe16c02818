//! HTTP client for the admin order actions

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use shared::order::OrderStatus;

use crate::{ClientError, ClientResult, NotifierConfig};

/// `POST /admin/pedidos/{id}/aceitar` response body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcceptResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// New status when the order was accepted
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Order actions the notifier can trigger
#[async_trait]
pub trait OrderApi: Send + Sync + 'static {
    /// Accept a pending order
    ///
    /// `Ok` carries whatever the server answered, including explicit
    /// failures (`success: false`). `Err` means the call itself failed.
    async fn accept_order(&self, order_id: i64) -> ClientResult<AcceptResponse>;
}

/// HTTP client for the admin back office
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &NotifierConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ClientError::Config(format!("invalid SESSION_COOKIE: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url.clone(),
            csrf_token: config.csrf_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// The server answers JSON on both success and refusal (403 for a bad
    /// CSRF token), so the body is decoded regardless of the status code.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::debug!(%status, body = %text, "Unparseable response body");
            ClientError::InvalidResponse(format!("HTTP {status}: {e}"))
        })
    }
}

#[async_trait]
impl OrderApi for HttpClient {
    async fn accept_order(&self, order_id: i64) -> ClientResult<AcceptResponse> {
        #[derive(Serialize)]
        struct AcceptRequest<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            csrf_token: Option<&'a str>,
        }

        let url = self.url(&format!("admin/pedidos/{order_id}/aceitar"));
        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&AcceptRequest {
                csrf_token: self.csrf_token.as_deref(),
            });

        if let Some(token) = &self.csrf_token {
            request = request.header("X-CSRFToken", token);
        }

        tracing::debug!(order_id, %url, "Accepting order");
        let response = request.send().await?;
        Self::handle_response(response).await
    }
}
