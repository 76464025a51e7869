//! Realtime hubs
//!
//! A [`Hub`] owns everything the gateway tracks for one device class: the
//! connection registry, the frame codec, the dispatch table and the relay
//! to dashboards. Classes differ only in their [`HubProfile`].

pub mod actions;
pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod profile;
pub mod registry;
pub mod relay;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use commands::DashboardCommand;
pub use connection::{ConnectionHandle, ConnectionId, Outbound, OutboundQueue};
pub use dispatcher::{ActionHandler, CallContext, DispatchTable, ProtocolDispatcher};
pub use profile::HubProfile;
pub use registry::{ConnectionRegistry, SharedConnectionRegistry};
pub use relay::{BroadcastOutcome, BroadcastRelay};

use crate::domain::frame::FrameCodec;
use crate::shared::errors::GatewayError;

/// Liveness text written to hardware for every inbound message
pub const READY_ACK: &str = "ready";

/// What happened to one inbound hardware message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Decoded, optionally answered, and relayed
    Relayed { replied: bool, delivered: usize },
    /// Could not be decoded; nothing was relayed
    Dropped,
}

/// What happened to one dashboard message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardOutcome {
    Forwarded { device_id: String },
    DeviceOffline { device_id: String },
    Ignored,
}

pub struct Hub {
    profile: HubProfile,
    codec: FrameCodec,
    registry: SharedConnectionRegistry,
    dispatcher: ProtocolDispatcher,
    relay: BroadcastRelay,
    ready_ack: bool,
}

pub type SharedHub = Arc<Hub>;

impl Hub {
    pub fn new(profile: HubProfile, ready_ack: bool) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(profile.class.clone()));
        Self {
            codec: FrameCodec::new(profile.format),
            dispatcher: ProtocolDispatcher::new(profile.class.clone(), profile.table.clone()),
            relay: BroadcastRelay::new(registry.clone()),
            registry,
            profile,
            ready_ack,
        }
    }

    pub fn class(&self) -> &str {
        &self.profile.class
    }

    pub fn profile(&self) -> &HubProfile {
        &self.profile
    }

    pub fn registry(&self) -> &SharedConnectionRegistry {
        &self.registry
    }

    /// Handle one text message from `device_id`.
    ///
    /// An error means a write to `conn` failed and the connection should be
    /// torn down. The frame is still relayed when the ack or the reply failed.
    pub fn on_hardware_text(
        &self,
        device_id: &str,
        conn: &ConnectionHandle,
        text: &str,
    ) -> Result<InboundOutcome, GatewayError> {
        metrics::counter!("gateway_frames_received_total", "hub" => self.profile.class.clone())
            .increment(1);

        let ack = if self.ready_ack {
            conn.send_text(READY_ACK)
        } else {
            Ok(())
        };

        let frame = match self.codec.decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(hub = %self.profile.class, device_id = device_id, error = %e, "Dropping undecodable frame");
                metrics::counter!("gateway_decode_errors_total", "hub" => self.profile.class.clone())
                    .increment(1);
                ack?;
                return Ok(InboundOutcome::Dropped);
            }
        };

        let reply = self
            .dispatcher
            .dispatch(device_id, &frame)
            .map(|reply| conn.send_text(reply.encode()));

        let outcome = self.relay.broadcast(text);
        ack?;

        match reply {
            Some(Err(e)) => Err(e),
            replied => Ok(InboundOutcome::Relayed {
                replied: replied.is_some(),
                delivered: outcome.delivered,
            }),
        }
    }

    /// Handle one text message from a dashboard of this class.
    pub fn on_dashboard_text(&self, text: &str) -> DashboardOutcome {
        let Some(cmd) = DashboardCommand::parse(text) else {
            debug!(hub = %self.profile.class, "Ignoring dashboard message without command");
            return DashboardOutcome::Ignored;
        };

        match self
            .registry
            .send_to_hardware(&cmd.device_id, &cmd.to_hardware_text())
        {
            Ok(()) => {
                info!(hub = %self.profile.class, device_id = %cmd.device_id, "Command forwarded to device");
                DashboardOutcome::Forwarded {
                    device_id: cmd.device_id,
                }
            }
            Err(e) => {
                warn!(hub = %self.profile.class, device_id = %cmd.device_id, error = %e, "Command not delivered");
                DashboardOutcome::DeviceOffline {
                    device_id: cmd.device_id,
                }
            }
        }
    }
}

// ── HubDirectory ───────────────────────────────────────────────

/// Connection counts for one class
#[derive(Debug, Clone, PartialEq)]
pub struct HubStatus {
    pub class: String,
    pub subprotocol: Option<String>,
    pub connected_devices: Vec<String>,
    pub dashboards: usize,
}

/// The enabled hubs, keyed by class name
#[derive(Default)]
pub struct HubDirectory {
    hubs: BTreeMap<String, SharedHub>,
}

pub type SharedHubDirectory = Arc<HubDirectory>;

impl HubDirectory {
    pub fn new(profiles: impl IntoIterator<Item = HubProfile>, ready_ack: bool) -> Self {
        let hubs = profiles
            .into_iter()
            .map(|p| (p.class.clone(), Arc::new(Hub::new(p, ready_ack))))
            .collect();
        Self { hubs }
    }

    /// Built-in profiles for the given class names; unknown names are skipped.
    pub fn from_classes<S: AsRef<str>>(classes: &[S], ready_ack: bool) -> Self {
        let profiles = classes.iter().filter_map(|name| {
            let profile = HubProfile::by_name(name.as_ref());
            if profile.is_none() {
                warn!(class = name.as_ref(), "Unknown hub class, skipping");
            }
            profile
        });
        Self::new(profiles, ready_ack)
    }

    pub fn get(&self, class: &str) -> Option<SharedHub> {
        self.hubs.get(class).cloned()
    }

    pub fn classes(&self) -> Vec<&str> {
        self.hubs.keys().map(String::as_str).collect()
    }

    pub fn overview(&self) -> Vec<HubStatus> {
        self.hubs
            .values()
            .map(|hub| HubStatus {
                class: hub.class().to_string(),
                subprotocol: hub.profile.subprotocol.map(str::to_string),
                connected_devices: hub.registry.connected_devices(),
                dashboards: hub.registry.dashboard_count(),
            })
            .collect()
    }

    /// Close every connection of every hub
    pub fn close_all(&self) -> usize {
        self.hubs.values().map(|hub| hub.registry.close_all()).sum()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn drain(rx: &mut OutboundQueue) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn text(s: &str) -> Outbound {
        Outbound::Text(s.to_string())
    }

    struct Fixture {
        hub: Hub,
        hw: ConnectionHandle,
        hw_rx: OutboundQueue,
        dashboards: Vec<OutboundQueue>,
    }

    fn fixture(profile: HubProfile, ready_ack: bool, dashboards: usize) -> Fixture {
        let hub = Hub::new(profile, ready_ack);
        let (hw, hw_rx) = ConnectionHandle::channel(hub.registry().allocate_id(), "CP001");
        hub.registry().register_hardware("CP001", hw.clone());

        let dashboards = (0..dashboards)
            .map(|_| {
                let (d, rx) = ConnectionHandle::channel(hub.registry().allocate_id(), "dashboard");
                hub.registry().register_dashboard(d);
                rx
            })
            .collect();

        Fixture {
            hub,
            hw,
            hw_rx,
            dashboards,
        }
    }

    #[test]
    fn boot_notification_is_answered_and_relayed() {
        let mut f = fixture(HubProfile::ocpp(), true, 2);
        let frame = r#"[2, "abc123", "BootNotification", {}]"#;

        let outcome = f.hub.on_hardware_text("CP001", &f.hw, frame).unwrap();
        assert_eq!(
            outcome,
            InboundOutcome::Relayed {
                replied: true,
                delivered: 2
            }
        );

        let sent = drain(&mut f.hw_rx);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], text(READY_ACK));
        let Outbound::Text(reply) = &sent[1] else {
            panic!("expected reply text");
        };
        let reply: Value = serde_json::from_str(reply).unwrap();
        assert_eq!(reply[0], 3);
        assert_eq!(reply[1], "abc123");
        assert_eq!(reply[2]["status"], "Accepted");

        for rx in f.dashboards.iter_mut() {
            assert_eq!(drain(rx), vec![text(frame)]);
        }
    }

    #[test]
    fn unknown_action_is_relayed_without_reply() {
        let mut f = fixture(HubProfile::ocpp(), true, 3);
        let frame = r#"[2, "id1", "FooBar", {}]"#;

        let outcome = f.hub.on_hardware_text("CP001", &f.hw, frame).unwrap();
        assert_eq!(
            outcome,
            InboundOutcome::Relayed {
                replied: false,
                delivered: 3
            }
        );
        assert_eq!(drain(&mut f.hw_rx), vec![text(READY_ACK)]);
        for rx in f.dashboards.iter_mut() {
            assert_eq!(drain(rx), vec![text(frame)]);
        }
    }

    #[test]
    fn undecodable_frame_is_dropped_but_acknowledged() {
        let mut f = fixture(HubProfile::hardware(), true, 1);

        let outcome = f.hub.on_hardware_text("CP001", &f.hw, "not json").unwrap();
        assert_eq!(outcome, InboundOutcome::Dropped);
        assert_eq!(drain(&mut f.hw_rx), vec![text(READY_ACK)]);
        assert!(drain(&mut f.dashboards[0]).is_empty());
    }

    #[test]
    fn json_object_hub_relays_objects_only() {
        let mut f = fixture(HubProfile::solar(), false, 1);

        let telemetry = r#"{"pv_voltage": 48.2}"#;
        f.hub.on_hardware_text("CP001", &f.hw, telemetry).unwrap();
        f.hub.on_hardware_text("CP001", &f.hw, "[1,2,3]").unwrap();

        assert!(drain(&mut f.hw_rx).is_empty());
        assert_eq!(drain(&mut f.dashboards[0]), vec![text(telemetry)]);
    }

    #[test]
    fn dead_hardware_reports_error() {
        let f = fixture(HubProfile::ocpp(), true, 0);
        drop(f.hw_rx);
        assert!(f
            .hub
            .on_hardware_text("CP001", &f.hw, r#"[2, "a", "MeterValues", {}]"#)
            .is_err());
    }

    #[test]
    fn failed_ack_still_relays_the_frame() {
        let mut f = fixture(HubProfile::hardware(), true, 2);
        // hardware connection already torn down
        f.hw.close();

        let frame = r#"{"relay":"on"}"#;
        let err = f.hub.on_hardware_text("CP001", &f.hw, frame).unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionLost(_)));
        for rx in f.dashboards.iter_mut() {
            assert_eq!(drain(rx), vec![text(frame)]);
        }
    }

    #[test]
    fn dashboard_command_reaches_device() {
        let mut f = fixture(HubProfile::hardware(), true, 0);

        let outcome = f
            .hub
            .on_dashboard_text(r#"{"device_id":"CP001","command":{"relay":"off"}}"#);
        assert_eq!(
            outcome,
            DashboardOutcome::Forwarded {
                device_id: "CP001".into()
            }
        );

        let sent = drain(&mut f.hw_rx);
        let Outbound::Text(body) = &sent[0] else {
            panic!("expected text");
        };
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["type"], "command");
        assert_eq!(body["payload"]["relay"], "off");
    }

    #[test]
    fn dashboard_command_for_offline_device() {
        let f = fixture(HubProfile::hardware(), true, 0);
        assert_eq!(
            f.hub.on_dashboard_text(r#"{"device_id":"ghost","command":"x"}"#),
            DashboardOutcome::DeviceOffline {
                device_id: "ghost".into()
            }
        );
        assert_eq!(f.hub.on_dashboard_text("hello"), DashboardOutcome::Ignored);
    }

    #[test]
    fn directory_lists_enabled_hubs() {
        let dir = HubDirectory::from_classes(&["solar", "ocpp", "bogus"], true);
        assert_eq!(dir.classes(), vec!["ocpp", "solar"]);
        assert!(dir.get("hardware").is_none());

        let hub = dir.get("ocpp").unwrap();
        let (conn, _rx) = ConnectionHandle::channel(hub.registry().allocate_id(), "CP9");
        hub.registry().register_hardware("CP9", conn);

        let overview = dir.overview();
        assert_eq!(overview[0].class, "ocpp");
        assert_eq!(overview[0].subprotocol.as_deref(), Some("ocpp1.6"));
        assert_eq!(overview[0].connected_devices, vec!["CP9".to_string()]);
        assert_eq!(dir.close_all(), 1);
    }
}
