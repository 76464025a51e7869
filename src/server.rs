//! Reusable gateway runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database init and migrations,
//! the hub socket listener, the REST API, the session expiry sweeper,
//! metrics and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    start_session_expiry_task, HubDirectory, SessionTokenManager, SharedHubDirectory,
    SharedSessionTokenManager,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::{init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
use crate::interfaces::{create_api_router, ApiDependencies, GatewayServer};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub type StartError = Box<dyn std::error::Error + Send + Sync>;

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running gateway.
///
/// ```rust,no_run
/// use charging_gateway::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub sessions: SharedSessionTokenManager,
    pub hubs: SharedHubDirectory,
    pub config: AppConfig,
    /// Bound REST address; differs from the config when port 0 was requested
    pub api_addr: SocketAddr,
    /// Bound socket-listener address
    pub ws_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    ws_task: JoinHandle<()>,
    api_task: JoinHandle<()>,
    expiry_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and migrate
    /// 3. Build one hub per enabled device class
    /// 4. Start the socket listener, the REST API and the expiry sweeper
    pub async fn start(opts: ServerOptions) -> Result<Self, StartError> {
        let config = opts.config;
        config.validate()?;

        info!("Starting charging gateway...");
        let prometheus = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db = init_database(&DatabaseConfig {
            url: config.database.url.clone(),
        })
        .await?;
        if opts.auto_migrate {
            info!("Running database migrations...");
            run_migrations(&db).await?;
        }

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let sessions = Arc::new(SessionTokenManager::new(
            repos.clone(),
            config.sessions.window(),
        ));
        info!(window_minutes = config.sessions.window_minutes, "Session token manager ready");

        // ── Hubs ───────────────────────────────────────────────
        let hubs = Arc::new(HubDirectory::from_classes(
            config.hubs.enabled.as_slice(),
            config.hubs.ready_ack,
        ));
        if hubs.classes().is_empty() {
            return Err("no known device class enabled in [hubs].enabled".into());
        }
        info!(classes = ?hubs.classes(), ready_ack = config.hubs.ready_ack, "Hubs initialized");

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        let expiry_task = (config.sessions.expiry_sweep_secs > 0).then(|| {
            start_session_expiry_task(
                sessions.clone(),
                signal.clone(),
                config.sessions.expiry_sweep_secs,
            )
        });

        // ── Socket listener ────────────────────────────────────
        let ws_listener = TcpListener::bind(config.server.ws_addr()).await?;
        let ws_addr = ws_listener.local_addr()?;
        let gateway = GatewayServer::new(hubs.clone())
            .with_idle_timeout(config.hubs.idle_timeout())
            .with_shutdown(signal.clone());

        // ── REST API ───────────────────────────────────────────
        let router = create_api_router(ApiDependencies {
            sessions: sessions.clone(),
            hubs: hubs.clone(),
            db: Some(db.clone()),
            prometheus,
        });
        let api_listener = TcpListener::bind(config.server.api_addr()).await?;
        let api_addr = api_listener.local_addr()?;
        info!("REST API listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = signal.clone();
        let api_server = axum::serve(api_listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let ws_task = tokio::spawn(async move {
            if let Err(e) = gateway.serve(ws_listener).await {
                error!(error = %e, "Socket listener error");
            }
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!(error = %e, "REST API server error");
            }
        });

        info!("🚀 All servers started.");

        Ok(Self {
            repos,
            sessions,
            hubs,
            config,
            api_addr,
            ws_addr,
            db,
            shutdown,
            ws_task,
            api_task,
            expiry_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for every task to stop once shutdown has been triggered,
    /// bounded by `server.shutdown_timeout`, then close the database.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            ws_task,
            api_task,
            expiry_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(|| async move {
                let (ws, api) = tokio::join!(ws_task, api_task);
                if let Err(e) = ws {
                    error!(error = %e, "Socket listener task panicked");
                }
                if let Err(e) = api {
                    error!(error = %e, "REST API task panicked");
                }
                if let Some(task) = expiry_task {
                    let _ = task.await;
                }
            })
            .await;
        if !drained {
            warn!("Some tasks were still running at shutdown");
        }

        if let Err(e) = db.close().await {
            warn!(error = %e, "Error closing database connection");
        } else {
            info!("✅ Database connection closed");
        }
        info!("👋 Charging gateway shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down charging gateway...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.ws_task.is_finished() || !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The process-wide recorder can only be installed once. Later starts in
/// the same process reuse its handle.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            match metrics::set_global_recorder(recorder) {
                Ok(()) => info!("📊 Prometheus metrics recorder installed"),
                Err(e) => warn!(error = %e, "Another metrics recorder is already installed"),
            }
            handle
        })
        .clone()
}

/// Initialize tracing from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}
