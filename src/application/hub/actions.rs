//! OCPP 1.6 actions answered by the gateway
//!
//! Payloads are parsed into `rust_ocpp::v1_6` types for logging only; a
//! payload that does not parse is still answered.

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::{debug, info};

use super::dispatcher::{ActionHandler, CallContext, DispatchTable};

/// Dispatch table for chargers speaking OCPP-J
pub fn ocpp_table(heartbeat_interval: u16) -> DispatchTable {
    DispatchTable::new()
        .register("BootNotification", BootNotificationHandler { heartbeat_interval })
        .register("MeterValues", handle_meter_values)
}

pub struct BootNotificationHandler {
    /// Seconds between heartbeats requested from the charger
    pub heartbeat_interval: u16,
}

impl ActionHandler for BootNotificationHandler {
    fn handle(&self, ctx: &CallContext<'_>, payload: &Value) -> Value {
        match serde_json::from_value::<BootNotificationRequest>(payload.clone()) {
            Ok(req) => info!(
                device_id = ctx.device_id,
                vendor = req.charge_point_vendor.as_str(),
                model = req.charge_point_model.as_str(),
                firmware = ?req.firmware_version,
                "BootNotification"
            ),
            Err(e) => info!(device_id = ctx.device_id, error = %e, "BootNotification with partial payload"),
        }

        let response = BootNotificationResponse {
            current_time: Utc::now(),
            interval: self.heartbeat_interval.into(),
            status: RegistrationStatus::Accepted,
        };

        serde_json::to_value(&response).unwrap_or_default()
    }
}

pub fn handle_meter_values(ctx: &CallContext<'_>, payload: &Value) -> Value {
    match serde_json::from_value::<MeterValuesRequest>(payload.clone()) {
        Ok(req) => debug!(
            device_id = ctx.device_id,
            connector_id = req.connector_id,
            transaction_id = ?req.transaction_id,
            samples = req.meter_value.len(),
            "MeterValues"
        ),
        Err(e) => debug!(device_id = ctx.device_id, error = %e, "MeterValues payload not parsed"),
    }

    serde_json::to_value(&MeterValuesResponse {}).unwrap_or_default()
}
