//! Per device-class hub configuration

use crate::domain::frame::FrameFormat;

use super::actions;
use super::dispatcher::DispatchTable;

/// Subprotocol chargers negotiate on the OCPP hub
pub const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

/// Heartbeat interval handed back in BootNotification replies
pub const BOOT_HEARTBEAT_INTERVAL: u16 = 30;

/// What distinguishes one device class from another
#[derive(Clone)]
pub struct HubProfile {
    pub class: String,
    pub format: FrameFormat,
    pub subprotocol: Option<&'static str>,
    pub table: DispatchTable,
}

impl HubProfile {
    /// OCPP-J chargers
    pub fn ocpp() -> Self {
        Self {
            class: "ocpp".into(),
            format: FrameFormat::OcppJ,
            subprotocol: Some(OCPP_SUBPROTOCOL),
            table: actions::ocpp_table(BOOT_HEARTBEAT_INTERVAL),
        }
    }

    /// Generic controllers sending JSON objects
    pub fn hardware() -> Self {
        Self::json_objects("hardware")
    }

    pub fn solar() -> Self {
        Self::json_objects("solar")
    }

    /// A class with no answered actions that relays plain JSON objects
    pub fn json_objects(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            format: FrameFormat::JsonObject,
            subprotocol: None,
            table: DispatchTable::new(),
        }
    }

    /// Built-in profile for a configured class name
    pub fn by_name(class: &str) -> Option<Self> {
        match class {
            "ocpp" => Some(Self::ocpp()),
            "hardware" => Some(Self::hardware()),
            "solar" => Some(Self::solar()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for HubProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubProfile")
            .field("class", &self.class)
            .field("format", &self.format)
            .field("subprotocol", &self.subprotocol)
            .field("actions", &self.table.actions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_profiles() {
        let ocpp = HubProfile::by_name("ocpp").unwrap();
        assert_eq!(ocpp.format, FrameFormat::OcppJ);
        assert_eq!(ocpp.subprotocol, Some("ocpp1.6"));
        assert_eq!(ocpp.table.actions(), vec!["BootNotification", "MeterValues"]);

        let solar = HubProfile::by_name("solar").unwrap();
        assert_eq!(solar.format, FrameFormat::JsonObject);
        assert!(solar.table.is_empty());

        assert!(HubProfile::by_name("frontend").is_none());
    }
}
