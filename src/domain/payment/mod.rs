//! Payment aggregate
//!
//! Payments are owned by the payment subsystem. The gateway only needs to
//! know whether one exists before it funds a charging session.

pub mod model;
pub mod repository;

pub use model::{NewPayment, Payment};
pub use repository::PaymentRepository;
