//! Network adapters for the storefront backend: REST cart sync and the
//! WebSocket notification transport.

pub mod http_cart_sync;
pub mod ws_transport;

pub use http_cart_sync::HttpCartSyncClient;
pub use ws_transport::WsTransport;
