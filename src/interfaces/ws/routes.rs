//! Socket endpoint paths
//!
//! - `/{class}/{device_id}`: hardware of a device class
//! - `/frontend/{class}`: dashboards subscribed to a device class

/// Path segment reserved for dashboard endpoints
pub const DASHBOARD_SEGMENT: &str = "frontend";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsRoute {
    Hardware { class: String, device_id: String },
    Dashboard { class: String },
}

impl WsRoute {
    /// Parse a request path. Query strings and a trailing slash are ignored;
    /// anything else that is not exactly two non-empty segments is rejected.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or_default();
        let path = path.trim_start_matches('/').trim_end_matches('/');

        let mut segments = path.split('/');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let second = segments.next().filter(|s| !s.is_empty())?;
        if segments.next().is_some() {
            return None;
        }

        if first == DASHBOARD_SEGMENT {
            Some(Self::Dashboard {
                class: second.to_string(),
            })
        } else {
            Some(Self::Hardware {
                class: first.to_string(),
                device_id: second.to_string(),
            })
        }
    }

    pub fn class(&self) -> &str {
        match self {
            Self::Hardware { class, .. } | Self::Dashboard { class } => class,
        }
    }

    /// Device id for hardware, `"dashboard"` for subscribers
    pub fn label(&self) -> &str {
        match self {
            Self::Hardware { device_id, .. } => device_id,
            Self::Dashboard { .. } => "dashboard",
        }
    }
}

/// Pick `offered` if it appears in the comma separated
/// `Sec-WebSocket-Protocol` header value.
pub fn negotiate_subprotocol(requested: &str, offered: Option<&'static str>) -> Option<&'static str> {
    let offered = offered?;
    requested
        .split(',')
        .map(|s| s.trim())
        .any(|p| p == offered)
        .then_some(offered)
}
