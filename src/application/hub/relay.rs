//! Broadcast relay - fans hardware frames out to dashboard subscribers

use tracing::{debug, trace};

use super::registry::SharedConnectionRegistry;

/// Result of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub pruned: usize,
}

pub struct BroadcastRelay {
    registry: SharedConnectionRegistry,
}

impl BroadcastRelay {
    pub fn new(registry: SharedConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Write `text` verbatim to every dashboard. Subscribers whose write
    /// fails are removed and closed; the rest still receive the frame.
    pub fn broadcast(&self, text: &str) -> BroadcastOutcome {
        let mut delivered = 0;
        let pruned = self
            .registry
            .retain_dashboards(|conn| match conn.send_text(text) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    debug!(hub = %self.registry.class(), connection = conn.id(), error = %e, "Dropping dead dashboard");
                    false
                }
            });

        for conn in &pruned {
            conn.close();
        }

        if !pruned.is_empty() {
            metrics::counter!("gateway_dashboards_pruned_total", "hub" => self.registry.class().to_string())
                .increment(pruned.len() as u64);
        }
        metrics::counter!("gateway_frames_relayed_total", "hub" => self.registry.class().to_string())
            .increment(1);
        trace!(hub = %self.registry.class(), delivered, pruned = pruned.len(), "Frame relayed");

        BroadcastOutcome {
            delivered,
            pruned: pruned.len(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
