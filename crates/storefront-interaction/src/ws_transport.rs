//! WebSocket implementation of the channel transport seam.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use storefront_core::channel::{ChannelConnection, ChannelTransport, TransportEvent};
use storefront_core::config::ChannelConfig;
use storefront_core::error::ChannelError;
use storefront_core::session::Credentials;

/// Opens WebSocket connections to the notification endpoint.
///
/// The session token is sent as an `Authorization: Bearer` header on the
/// upgrade request.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(config.url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ChannelConnection>, ChannelError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Endpoint(format!("{}: {}", self.url, e)))?;
        let auth = HeaderValue::from_str(&credentials.bearer())
            .map_err(|e| ChannelError::Handshake(format!("invalid token header: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        tracing::debug!("[WsTransport] Connecting to {}", self.url);
        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        tracing::debug!(
            "[WsTransport] Handshake complete (status {})",
            response.status()
        );

        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl ChannelConnection for WsConnection {
    async fn recv(&mut self) -> Result<TransportEvent, ChannelError> {
        loop {
            match self.stream.next().await {
                None => {
                    return Ok(TransportEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    });
                }
                Some(Err(e)) => return Err(ChannelError::Receive(e.to_string())),
                Some(Ok(Message::Text(text))) => return Ok(TransportEvent::Text(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(TransportEvent::Text(text)),
                    Err(_) => {
                        tracing::warn!("[WsTransport] Dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (None, String::new()),
                    };
                    return Ok(TransportEvent::Closed { code, reason });
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_url_is_endpoint_error() {
        let transport = WsTransport::new("not a url");
        let result = transport.connect(&Credentials::new("t")).await;
        assert!(matches!(result, Err(ChannelError::Endpoint(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_handshake_error() {
        let transport = WsTransport::new("ws://127.0.0.1:9/ws");
        let result = transport.connect(&Credentials::new("t")).await;
        assert!(matches!(result, Err(ChannelError::Handshake(_))));
    }
}
