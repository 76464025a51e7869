//! Hub overview DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::HubStatus;

/// Live connection counts of one device class
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HubStatusResponse {
    pub class: String,
    /// Subprotocol echoed to hardware during the handshake, if any
    pub subprotocol: Option<String>,
    pub connected_devices: Vec<String>,
    pub device_count: usize,
    pub dashboard_count: usize,
}

impl From<HubStatus> for HubStatusResponse {
    fn from(s: HubStatus) -> Self {
        Self {
            class: s.class,
            subprotocol: s.subprotocol,
            device_count: s.connected_devices.len(),
            connected_devices: s.connected_devices,
            dashboard_count: s.dashboards,
        }
    }
}
