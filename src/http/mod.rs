//! HTTP surface
//!
//! - GET /webhooks/answer - Call-control answer webhook
//! - GET /ws - Audio relay WebSocket
//! - GET /captions - Caption event stream for browsers
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ConnectAction, WebsocketEndpoint};
pub use routes::create_router;
pub use state::AppState;
