//! Database entities module

pub mod charging_session;
pub mod payment;

pub use charging_session::Entity as ChargingSession;
pub use payment::Entity as Payment;
