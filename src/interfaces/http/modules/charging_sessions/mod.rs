//! Charging session module: issue, verify, deactivate and list

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
