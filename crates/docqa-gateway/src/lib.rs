//! HTTP gateway: document upload, question answering, and document management.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;
