//! Charging session aggregate
//!
//! A charging session is the time-boxed authorization window minted when a
//! payment succeeds. Contains the entity, its verification verdict and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{ChargingSession, NewChargingSession, SessionVerdict};
pub use repository::ChargingSessionRepository;
