use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read projection of a payment recorded by the payment subsystem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: i32,
    pub user_id: Option<i32>,
    pub amount: f64,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    pub user_id: Option<i32>,
    pub amount: f64,
    pub reference_number: Option<String>,
}
