//! JSON body extractor that also runs the DTO's `validator` rules
//!
//! Rejections use the same [`ApiResponse`] envelope as every handler. A body
//! that is not JSON, or does not fit the DTO, is a 400. A body that breaks a
//! validation rule is a 422 whose `data` lists each [`FieldViolation`].

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use super::ApiResponse;

/// `axum::Json<T>` plus `Validate::validate()` on the decoded value.
pub struct ValidatedJson<T>(pub T);

/// One broken rule on one request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    /// Validator rule name, e.g. `range`
    pub code: String,
    pub message: Option<String>,
}

pub enum BodyRejection {
    Malformed(JsonRejection),
    Invalid(ValidationErrors),
}

/// Flatten validator output, ordered by field so responses are stable.
pub fn field_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldViolation {
                field: field.to_string(),
                code: e.code.to_string(),
                message: e.message.as_ref().map(|m| m.to_string()),
            })
        })
        .collect();
    violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    violations
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Malformed(rejection) => {
                let status = match rejection {
                    JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::BAD_REQUEST,
                };
                let body = ApiResponse::<()>::error(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ));
                (status, Json(body)).into_response()
            }
            Self::Invalid(errors) => {
                let violations = field_violations(&errors);
                debug!(violations = violations.len(), "Request body failed validation");

                let summary = violations
                    .iter()
                    .map(|v| {
                        v.message
                            .clone()
                            .unwrap_or_else(|| format!("{} failed {}", v.field, v.code))
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                let body = ApiResponse {
                    success: false,
                    data: Some(violations),
                    error: Some(summary),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = BodyRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(BodyRejection::Malformed)?;
        value.validate().map_err(BodyRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}
