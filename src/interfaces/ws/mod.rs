//! WebSocket interfaces
//!
//! - `server`: hardware and dashboard socket listener
//! - `routes`: endpoint path parsing and subprotocol negotiation

pub mod routes;
pub mod server;

pub use routes::WsRoute;
pub use server::GatewayServer;
