//! Protocol dispatcher
//!
//! Maps the action of an inbound Call frame to a handler producing the
//! CallResult payload. Actions missing from the table are not answered.
//! Dispatch never affects relaying: every frame reaches dashboards whether
//! or not it is handled here.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::frame::ProtocolFrame;

/// Where a call came from
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub device_class: &'a str,
    pub device_id: &'a str,
    pub message_id: &'a str,
}

/// Produces the response payload for one action
pub trait ActionHandler: Send + Sync {
    fn handle(&self, ctx: &CallContext<'_>, payload: &Value) -> Value;
}

impl<F> ActionHandler for F
where
    F: Fn(&CallContext<'_>, &Value) -> Value + Send + Sync,
{
    fn handle(&self, ctx: &CallContext<'_>, payload: &Value) -> Value {
        self(ctx, payload)
    }
}

/// Action name → handler
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(mut self, action: impl Into<String>, handler: H) -> Self
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(action.into(), Arc::new(handler));
        self
    }

    pub fn lookup(&self, action: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(action)
    }

    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

pub struct ProtocolDispatcher {
    device_class: String,
    table: DispatchTable,
}

impl ProtocolDispatcher {
    pub fn new(device_class: impl Into<String>, table: DispatchTable) -> Self {
        Self {
            device_class: device_class.into(),
            table,
        }
    }

    /// Zero or one reply frame for `frame`, addressed to the sender only.
    pub fn dispatch(&self, device_id: &str, frame: &ProtocolFrame) -> Option<ProtocolFrame> {
        let ProtocolFrame::Call {
            message_id,
            action,
            payload,
        } = frame
        else {
            return None;
        };

        let Some(handler) = self.table.lookup(action) else {
            debug!(
                hub = %self.device_class,
                device_id = device_id,
                action = action.as_str(),
                "No handler for action, relaying only"
            );
            return None;
        };

        let ctx = CallContext {
            device_class: &self.device_class,
            device_id,
            message_id,
        };
        let response = handler.handle(&ctx, payload);

        metrics::counter!(
            "gateway_calls_answered_total",
            "hub" => self.device_class.clone(),
            "action" => action.clone()
        )
        .increment(1);

        Some(ProtocolFrame::result(message_id.as_str(), response))
    }
}

// ── Tests ──────────────────────────────────────────────────────
