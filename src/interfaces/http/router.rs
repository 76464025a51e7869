//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, FieldViolation};
use super::modules::{charging_sessions, health, hubs, metrics};
use crate::application::{SharedHubDirectory, SharedSessionTokenManager};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        metrics::handlers::prometheus_metrics,
        charging_sessions::issue_session,
        charging_sessions::verify_session,
        charging_sessions::deactivate_sessions,
        charging_sessions::list_user_sessions,
        hubs::list_hubs,
        hubs::get_hub,
    ),
    components(
        schemas(
            ApiResponse<String>,
            FieldViolation,
            health::HealthResponse,
            health::ComponentHealth,
            charging_sessions::IssueSessionRequest,
            charging_sessions::IssuedSessionResponse,
            charging_sessions::VerifyResponse,
            charging_sessions::DeactivateResponse,
            charging_sessions::ChargingSessionResponse,
            charging_sessions::SessionScope,
            hubs::HubStatusResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database ping"),
        (name = "Metrics", description = "Prometheus scrape endpoint"),
        (name = "Charging Sessions", description = "Payment-funded charging authorization tokens"),
        (name = "Hubs", description = "Live device and dashboard connections per device class"),
    ),
    info(
        title = "Charging Gateway API",
        version = "1.0.0",
        description = "Charging-session authorization and realtime hub status",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Everything the REST surface needs from the running gateway
#[derive(Clone)]
pub struct ApiDependencies {
    pub sessions: SharedSessionTokenManager,
    pub hubs: SharedHubDirectory,
    /// Pinged by `/health`; `None` when running on the in-memory store
    pub db: Option<DatabaseConnection>,
    pub prometheus: PrometheusHandle,
}

/// Create the API router with all routes
pub fn create_api_router(deps: ApiDependencies) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let session_state = charging_sessions::ChargingSessionState {
        manager: deps.sessions,
    };
    let session_routes = Router::new()
        .route("/charging-sessions", post(charging_sessions::issue_session))
        .route(
            "/charging-sessions/verify",
            get(charging_sessions::verify_session),
        )
        .route(
            "/payments/{payment_id}/charging-sessions/deactivate",
            post(charging_sessions::deactivate_sessions),
        )
        .route(
            "/users/{user_id}/charging-sessions",
            get(charging_sessions::list_user_sessions),
        )
        .with_state(session_state);

    let hub_routes = Router::new()
        .route("/", get(hubs::list_hubs))
        .route("/{class}", get(hubs::get_hub))
        .with_state(hubs::HubsState {
            hubs: deps.hubs.clone(),
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db: deps.db,
            hubs: deps.hubs,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics::MetricsState {
            handle: deps.prometheus,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1", session_routes)
        .nest("/api/v1/hubs", hub_routes)
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;
    use crate::application::{HubDirectory, SessionTokenManager};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn router() -> Router {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        create_api_router(ApiDependencies {
            sessions: Arc::new(SessionTokenManager::with_default_window(repos)),
            hubs: Arc::new(HubDirectory::from_classes(&["ocpp", "hardware", "solar"], true)),
            db: None,
            prometheus: PrometheusBuilder::new().build_recorder().handle(),
        })
    }

    async fn status_of(uri: &str) -> StatusCode {
        use tower::Service;
        let mut svc = router().into_service();
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        svc.call(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn mounts_every_surface() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
        assert_eq!(status_of("/metrics").await, StatusCode::OK);
        assert_eq!(status_of("/api/v1/hubs").await, StatusCode::OK);
        assert_eq!(status_of("/api/v1/hubs/solar").await, StatusCode::OK);
        assert_eq!(status_of("/api/v1/users/1/charging-sessions").await, StatusCode::OK);
        assert_eq!(status_of("/api-doc/openapi.json").await, StatusCode::OK);
        assert_eq!(status_of("/nope").await, StatusCode::NOT_FOUND);
    }

    #[test]
    fn openapi_lists_session_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/charging-sessions"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/v1/payments/{payment_id}/charging-sessions/deactivate"));
    }
}
