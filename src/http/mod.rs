//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → [security layer admits or rejects the client]
//!     → [routing layer picks the route and target URL]
//!     → request.rs (capture inbound request, build upstream request)
//!     → proxy.rs (send upstream, bounded by timeout)
//!     → response.rs (relay status, headers, streamed body)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::ProxyExecutor;
pub use request::{MakeGatewayRequestId, ProxyRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
