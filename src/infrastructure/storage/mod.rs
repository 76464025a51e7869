//! In-process storage

mod memory;

pub use memory::{
    InMemoryChargingSessionRepository, InMemoryPaymentRepository, InMemoryRepositoryProvider,
};
