//! Outer surfaces: the device/dashboard socket listener and the REST API

pub mod http;
pub mod ws;

pub use http::{create_api_router, ApiDependencies};
pub use ws::GatewayServer;
