//! Domain layer: wire frames, persisted aggregates and repository ports

pub mod charging_session;
pub mod frame;
pub mod payment;
pub mod repositories;

pub use charging_session::{ChargingSession, ChargingSessionRepository, SessionVerdict};
pub use frame::{DecodeError, FrameCodec, FrameFormat, ProtocolFrame};
pub use payment::{Payment, PaymentRepository};
pub use repositories::{DomainResult, RepositoryProvider};

pub use crate::shared::errors::DomainError;
