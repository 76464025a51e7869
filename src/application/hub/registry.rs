//! Connection registry - live hardware and dashboard sockets of one hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::connection::{ConnectionHandle, ConnectionId};
use crate::shared::errors::GatewayError;

/// Tracks which sockets are live for a device class.
///
/// Hardware is keyed by device id (at most one socket per id), dashboards
/// by connection id. All mutation is safe from any task.
pub struct ConnectionRegistry {
    class: String,
    hardware: DashMap<String, ConnectionHandle>,
    dashboards: DashMap<ConnectionId, ConnectionHandle>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            hardware: DashMap::new(),
            dashboards: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Hand out a fresh id for a socket about to be registered
    pub fn allocate_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // ── Hardware ───────────────────────────────────────────────

    /// Bind `device_id` to `conn`. A previous socket for the same id is
    /// closed and returned.
    pub fn register_hardware(
        &self,
        device_id: impl Into<String>,
        conn: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let device_id = device_id.into();
        let conn_id = conn.id();
        let previous = self.hardware.insert(device_id.clone(), conn);

        if let Some(old) = &previous {
            warn!(
                hub = %self.class,
                device_id = %device_id,
                old_connection = old.id(),
                new_connection = conn_id,
                "Device reconnected, closing superseded connection"
            );
            old.close();
        } else {
            info!(hub = %self.class, device_id = %device_id, connection = conn_id, "Device registered");
        }
        self.publish_gauges();
        previous
    }

    /// Remove `device_id` only while it is still bound to `conn_id`, so a
    /// superseded socket exiting late never evicts its replacement.
    pub fn unregister_hardware(&self, device_id: &str, conn_id: ConnectionId) -> bool {
        let removed = self
            .hardware
            .remove_if(device_id, |_, conn| conn.id() == conn_id)
            .is_some();
        if removed {
            info!(hub = %self.class, device_id = %device_id, connection = conn_id, "Device unregistered");
            self.publish_gauges();
        }
        removed
    }

    pub fn hardware(&self, device_id: &str) -> Option<ConnectionHandle> {
        self.hardware.get(device_id).map(|e| e.value().clone())
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        self.hardware.contains_key(device_id)
    }

    /// Deliver `text` to one device. A device whose socket is gone is
    /// pruned and reported as not connected.
    pub fn send_to_hardware(&self, device_id: &str, text: &str) -> Result<(), GatewayError> {
        let conn = self
            .hardware(device_id)
            .ok_or_else(|| GatewayError::DeviceNotConnected(device_id.to_string()))?;

        if let Err(e) = conn.send_text(text) {
            debug!(hub = %self.class, device_id = %device_id, error = %e, "Pruning dead hardware connection");
            conn.close();
            self.unregister_hardware(device_id, conn.id());
            return Err(GatewayError::DeviceNotConnected(device_id.to_string()));
        }
        Ok(())
    }

    pub fn connected_devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.hardware.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn hardware_count(&self) -> usize {
        self.hardware.len()
    }

    // ── Dashboards ─────────────────────────────────────────────

    pub fn register_dashboard(&self, conn: ConnectionHandle) {
        let conn_id = conn.id();
        self.dashboards.insert(conn_id, conn);
        info!(hub = %self.class, connection = conn_id, "Dashboard subscribed");
        self.publish_gauges();
    }

    pub fn unregister_dashboard(&self, conn_id: ConnectionId) -> bool {
        let removed = self.dashboards.remove(&conn_id).is_some();
        if removed {
            info!(hub = %self.class, connection = conn_id, "Dashboard unsubscribed");
            self.publish_gauges();
        }
        removed
    }

    /// Snapshot of the current subscribers
    pub fn dashboards(&self) -> Vec<ConnectionHandle> {
        self.dashboards.iter().map(|e| e.value().clone()).collect()
    }

    /// Drop every dashboard for which `keep` returns `false`, returning the
    /// removed handles.
    pub fn retain_dashboards<F>(&self, mut keep: F) -> Vec<ConnectionHandle>
    where
        F: FnMut(&ConnectionHandle) -> bool,
    {
        let mut removed = Vec::new();
        self.dashboards.retain(|_, conn| {
            if keep(conn) {
                true
            } else {
                removed.push(conn.clone());
                false
            }
        });
        if !removed.is_empty() {
            self.publish_gauges();
        }
        removed
    }

    pub fn dashboard_count(&self) -> usize {
        self.dashboards.len()
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Close and forget every socket. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for entry in self.hardware.iter() {
            if entry.value().close() {
                closed += 1;
            }
        }
        for entry in self.dashboards.iter() {
            if entry.value().close() {
                closed += 1;
            }
        }
        self.hardware.clear();
        self.dashboards.clear();
        self.publish_gauges();
        closed
    }

    fn publish_gauges(&self) {
        metrics::gauge!("gateway_hardware_connections", "hub" => self.class.clone())
            .set(self.hardware.len() as f64);
        metrics::gauge!("gateway_dashboard_connections", "hub" => self.class.clone())
            .set(self.dashboards.len() as f64);
    }
}

pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

// ── Tests ──────────────────────────────────────────────────────
