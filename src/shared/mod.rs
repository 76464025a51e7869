//! Cross-cutting helpers shared by every layer

pub mod errors;
pub mod shutdown;

pub use errors::{DomainError, GatewayError, SessionError};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
