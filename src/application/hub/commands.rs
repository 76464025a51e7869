//! Dashboard → hardware commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"device_id": "...", "command": <any>}` sent by a dashboard
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardCommand {
    pub device_id: String,
    pub command: Value,
}

impl DashboardCommand {
    /// `None` for anything that is not a command object; dashboards may send
    /// other chatter which is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        // a missing `command` would otherwise deserialize as null
        value.get("command")?;
        serde_json::from_value(value).ok()
    }

    /// Text delivered to the hardware
    pub fn to_hardware_text(&self) -> String {
        let envelope = CommandEnvelope {
            kind: "command",
            payload: &self.command,
        };
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct CommandEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a Value,
}
