//! Shared REST building blocks

pub mod validated_json;

pub use validated_json::{FieldViolation, ValidatedJson};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope for every JSON body the API returns.
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "data": null, "error": "nope"}));
    }

    #[test]
    fn success_envelope_omits_error() {
        let body = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 3}));
    }
}
