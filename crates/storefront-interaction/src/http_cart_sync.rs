//! HttpCartSyncClient - cart synchronization with the storefront REST API.
//!
//! `POST {base}/cart/sync` sends `{ "items": [...] }` and receives the
//! authoritative `{ "items": [...] }`. `GET {base}/cart` fetches the server
//! cart alone.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use storefront_core::cart::{CartEnvelope, CartItem, CartSyncApi};
use storefront_core::config::ApiConfig;
use storefront_core::error::SyncError;
use storefront_core::session::Credentials;

/// Cart sync client that talks to the storefront REST API.
#[derive(Clone)]
pub struct HttpCartSyncClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCartSyncClient {
    /// Creates a client with explicit configuration.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn sync_url(&self) -> String {
        format!("{}/cart/sync", self.base_url)
    }

    pub fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }

    /// Makes an authenticated request to the API.
    fn auth_request(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request
            .header("Authorization", credentials.bearer())
            .timeout(self.timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<CartItem>, SyncError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[CartSyncClient] Request failed: {}", e);
            SyncError::Network(e.to_string())
        })?;
        read_envelope(response).await
    }
}

/// Maps an HTTP response to the authoritative item list.
async fn read_envelope(response: Response) -> Result<Vec<CartItem>, SyncError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(
            "[CartSyncClient] Server rejected cart ({}): {}",
            status.as_u16(),
            error_text
        );
        return Err(SyncError::Rejected {
            status: status.as_u16(),
            message: error_text,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| SyncError::Network(e.to_string()))?;
    parse_envelope(&body)
}

/// Decodes and validates a `{ "items": [...] }` body.
pub fn parse_envelope(body: &str) -> Result<Vec<CartItem>, SyncError> {
    let envelope: CartEnvelope =
        serde_json::from_str(body).map_err(|e| SyncError::InvalidResponse(e.to_string()))?;
    envelope.validate()?;
    Ok(envelope.items)
}

#[async_trait]
impl CartSyncApi for HttpCartSyncClient {
    async fn sync_cart(
        &self,
        credentials: &Credentials,
        items: Vec<CartItem>,
    ) -> Result<Vec<CartItem>, SyncError> {
        tracing::debug!(
            "[CartSyncClient] POST {} with {} items",
            self.sync_url(),
            items.len()
        );
        let request = self.auth_request(
            self.client
                .post(self.sync_url())
                .json(&CartEnvelope::new(items)),
            credentials,
        );
        self.send(request).await
    }

    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<CartItem>, SyncError> {
        tracing::debug!("[CartSyncClient] GET {}", self.cart_url());
        let request = self.auth_request(self.client.get(self.cart_url()), credentials);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let client = HttpCartSyncClient::new("https://shop.example.com/api/", Duration::from_secs(5));
        assert_eq!(client.sync_url(), "https://shop.example.com/api/cart/sync");
        assert_eq!(client.cart_url(), "https://shop.example.com/api/cart");
    }

    #[test]
    fn test_parse_envelope() {
        let items = parse_envelope(
            r#"{"items":[
                {"id":1,"productId":1,"name":"Mug","unitPrice":12.0,"quantity":2},
                {"id":2,"productId":2,"name":"Tee","unitPrice":20.0,"quantity":1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "2");
    }

    #[test]
    fn test_parse_envelope_rejects_garbage() {
        assert!(matches!(
            parse_envelope("<html>502</html>"),
            Err(SyncError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = HttpCartSyncClient::new("http://127.0.0.1:9", Duration::from_secs(2));
        let err = client
            .sync_cart(&Credentials::new("t"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }
}
