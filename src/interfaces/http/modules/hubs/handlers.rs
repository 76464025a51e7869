//! Hub overview handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::HubStatusResponse;
use crate::application::SharedHubDirectory;
use crate::interfaces::http::common::ApiResponse;

#[derive(Clone)]
pub struct HubsState {
    pub hubs: SharedHubDirectory,
}

#[utoipa::path(
    get,
    path = "/api/v1/hubs",
    tag = "Hubs",
    responses(
        (status = 200, description = "Every enabled hub", body = ApiResponse<Vec<HubStatusResponse>>)
    )
)]
pub async fn list_hubs(State(state): State<HubsState>) -> Json<ApiResponse<Vec<HubStatusResponse>>> {
    let hubs = state.hubs.overview().into_iter().map(Into::into).collect();
    Json(ApiResponse::success(hubs))
}

#[utoipa::path(
    get,
    path = "/api/v1/hubs/{class}",
    tag = "Hubs",
    params(("class" = String, Path, description = "Device class, e.g. `ocpp`")),
    responses(
        (status = 200, description = "Hub status", body = ApiResponse<HubStatusResponse>),
        (status = 404, description = "Class not enabled")
    )
)]
pub async fn get_hub(
    State(state): State<HubsState>,
    Path(class): Path<String>,
) -> Result<Json<ApiResponse<HubStatusResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .hubs
        .overview()
        .into_iter()
        .find(|hub| hub.class == class)
        .map(|hub| Json(ApiResponse::success(hub.into())))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("Hub {} is not enabled", class))),
            )
        })
}
