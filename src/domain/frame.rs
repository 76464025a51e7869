//! Hardware frame codec
//!
//! OCPP-J style framing shared by every device class:
//!
//! - **Call**       `[2, "<messageId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<messageId>", {<payload>}]`
//! - **CallError**  `[4, "<messageId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Frames are decoded once at the socket boundary into [`ProtocolFrame`].
//! Anything that is valid JSON but not one of the shapes above becomes
//! [`ProtocolFrame::Unknown`]: it is still relayed to dashboards, it is just
//! never answered.

use serde_json::{Map, Value};
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

pub const MSG_TYPE_CALL: u8 = 2;
pub const MSG_TYPE_CALL_RESULT: u8 = 3;
pub const MSG_TYPE_CALL_ERROR: u8 = 4;

/// Minimum element count of an OCPP-J array frame.
const MIN_FRAME_LEN: usize = 3;

// ── ProtocolFrame ──────────────────────────────────────────────

/// A decoded hardware frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolFrame {
    /// `[2, messageId, action, payload]`
    Call {
        message_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, messageId, payload]`
    CallResult { message_id: String, payload: Value },
    /// `[4, messageId, errorCode, errorDescription, errorDetails]`
    CallError {
        message_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
    /// Valid JSON that is not a recognised call/result/error shape.
    Unknown(Value),
}

impl ProtocolFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Decode an OCPP-J array frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let Value::Array(arr) = value else {
            return Err(DecodeError::NotAnArray);
        };

        if arr.len() < MIN_FRAME_LEN {
            return Err(DecodeError::TooShort { got: arr.len() });
        }

        let Some(msg_type) = message_type(&arr[0]) else {
            return Ok(Self::Unknown(Value::Array(arr)));
        };

        let frame = match msg_type {
            MSG_TYPE_CALL => Self::decode_call(&arr),
            MSG_TYPE_CALL_RESULT => Self::decode_call_result(&arr),
            MSG_TYPE_CALL_ERROR => Self::decode_call_error(&arr),
            _ => None,
        };

        Ok(frame.unwrap_or(Self::Unknown(Value::Array(arr))))
    }

    fn decode_call(arr: &[Value]) -> Option<Self> {
        let message_id = arr[1].as_str()?.to_string();
        let action = arr[2].as_str()?.to_string();
        let payload = arr.get(3).cloned().unwrap_or_else(empty_object);

        Some(Self::Call {
            message_id,
            action,
            payload,
        })
    }

    fn decode_call_result(arr: &[Value]) -> Option<Self> {
        let message_id = arr[1].as_str()?.to_string();
        let payload = arr[2].clone();

        Some(Self::CallResult {
            message_id,
            payload,
        })
    }

    fn decode_call_error(arr: &[Value]) -> Option<Self> {
        let message_id = arr[1].as_str()?.to_string();
        let error_code = arr[2].as_str().unwrap_or("InternalError").to_string();
        let error_description = arr
            .get(3)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let error_details = arr.get(4).cloned().unwrap_or_else(empty_object);

        Some(Self::CallError {
            message_id,
            error_code,
            error_description,
            error_details,
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to its JSON wire form.
    pub fn encode(&self) -> String {
        let value = match self {
            Self::Call {
                message_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL),
                Value::String(message_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),

            Self::CallResult {
                message_id,
                payload,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_RESULT),
                Value::String(message_id.clone()),
                payload.clone(),
            ]),

            Self::CallError {
                message_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_ERROR),
                Value::String(message_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),

            Self::Unknown(value) => value.clone(),
        };

        value.to_string()
    }

    // ── Helpers ────────────────────────────────────────────

    /// Build a `CallResult` answering `message_id`.
    pub fn result(message_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            message_id: message_id.into(),
            payload,
        }
    }

}

/// Interpret the first array element as a small, finite, integral message type.
fn message_type(value: &Value) -> Option<u8> {
    if let Some(n) = value.as_u64() {
        return u8::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&f) {
        Some(f as u8)
    } else {
        None
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

// ── FrameCodec ─────────────────────────────────────────────────

/// Wire format accepted from a device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// OCPP-J arrays; calls are dispatched.
    OcppJ,
    /// Free-form JSON objects (telemetry only, relayed as `Unknown`).
    JsonObject,
}

/// Decoder bound to one device class's wire format.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    format: FrameFormat,
}

impl FrameCodec {
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }

    pub fn decode(&self, text: &str) -> Result<ProtocolFrame, DecodeError> {
        match self.format {
            FrameFormat::OcppJ => ProtocolFrame::decode(text),
            FrameFormat::JsonObject => {
                let value: Value = serde_json::from_str(text)
                    .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
                if value.is_object() {
                    Ok(ProtocolFrame::Unknown(value))
                } else {
                    Err(DecodeError::NotAnObject)
                }
            }
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// A malformed inbound frame. The frame is dropped; the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Frame is not a JSON array")]
    NotAnArray,
    #[error("Frame is not a JSON object")]
    NotAnObject,
    #[error("Expected at least 3 elements, got {got}")]
    TooShort { got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_call() {
        let text = r#"[2,"abc123","BootNotification",{"chargePointVendor":"Vendor"}]"#;
        match ProtocolFrame::decode(text).unwrap() {
            ProtocolFrame::Call {
                message_id,
                action,
                payload,
            } => {
                assert_eq!(message_id, "abc123");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "Vendor");
            }
            other => panic!("Expected Call frame, got {:?}", other),
        }
    }

    #[test]
    fn call_without_payload_defaults_to_empty_object() {
        let frame = ProtocolFrame::decode(r#"[2,"m1","Heartbeat"]"#).unwrap();
        assert_eq!(
            frame,
            ProtocolFrame::Call {
                message_id: "m1".into(),
                action: "Heartbeat".into(),
                payload: json!({}),
            }
        );
    }

    #[test]
    fn float_message_type_is_accepted_when_integral() {
        let frame = ProtocolFrame::decode(r#"[2.0,"m1","MeterValues",{}]"#).unwrap();
        assert!(matches!(frame, ProtocolFrame::Call { .. }));
    }

    #[test]
    fn non_numeric_message_type_is_unknown() {
        let frame = ProtocolFrame::decode(r#"["2","m1","BootNotification",{}]"#).unwrap();
        assert!(matches!(frame, ProtocolFrame::Unknown(_)));
    }

    #[test]
    fn fractional_or_huge_message_type_is_unknown() {
        for text in [r#"[2.5,"m","A",{}]"#, r#"[1e300,"m","A",{}]"#, r#"[-2,"m","A",{}]"#] {
            let frame = ProtocolFrame::decode(text).unwrap();
            assert!(matches!(frame, ProtocolFrame::Unknown(_)), "{}", text);
        }
    }

    #[test]
    fn unrecognised_message_type_is_unknown() {
        let frame = ProtocolFrame::decode(r#"[7,"m1","Foo",{}]"#).unwrap();
        assert!(matches!(frame, ProtocolFrame::Unknown(_)));
    }

    #[test]
    fn call_with_non_string_action_is_unknown() {
        let frame = ProtocolFrame::decode(r#"[2,"m1",42,{}]"#).unwrap();
        assert!(matches!(frame, ProtocolFrame::Unknown(_)));
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            ProtocolFrame::decode("not json"),
            Err(DecodeError::InvalidJson(_))
        ));
        assert_eq!(
            ProtocolFrame::decode(r#"{"a":1}"#),
            Err(DecodeError::NotAnArray)
        );
        assert_eq!(
            ProtocolFrame::decode(r#"[2,"m1"]"#),
            Err(DecodeError::TooShort { got: 2 })
        );
    }

    #[test]
    fn decode_call_error() {
        let text = r#"[4,"abc123","NotImplemented","Action not supported",{}]"#;
        match ProtocolFrame::decode(text).unwrap() {
            ProtocolFrame::CallError {
                message_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(message_id, "abc123");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(error_description, "Action not supported");
            }
            other => panic!("Expected CallError frame, got {:?}", other),
        }
    }

    #[test]
    fn call_result_encodes_as_array() {
        let text = ProtocolFrame::result("abc123", json!({"status": "Accepted"})).encode();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!([3, "abc123", {"status": "Accepted"}]));
    }

    #[test]
    fn json_object_codec_accepts_objects_only() {
        let codec = FrameCodec::new(FrameFormat::JsonObject);
        let frame = codec.decode(r#"{"voltage": 231.4}"#).unwrap();
        assert_eq!(frame, ProtocolFrame::Unknown(json!({"voltage": 231.4})));
        assert_eq!(codec.decode("[1,2,3]"), Err(DecodeError::NotAnObject));
        assert!(matches!(codec.decode("{"), Err(DecodeError::InvalidJson(_))));
    }
}
