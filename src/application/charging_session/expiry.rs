//! Background task that periodically closes overdue charging sessions.

use tokio::time::Duration;
use tracing::{info, warn};

use super::manager::SharedSessionTokenManager;
use crate::shared::shutdown::ShutdownSignal;

/// Start the session expiry sweeper.
///
/// Every `check_interval_secs` the task flips active sessions whose
/// `expires_at` has passed to inactive. Stops when `shutdown` fires.
pub fn start_session_expiry_task(
    manager: SharedSessionTokenManager,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(check_interval = check_interval_secs, "Session expiry task started");

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = manager.expire_overdue().await {
                        warn!(error = %e, "Session expiry check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("Session expiry task shutting down");
                    break;
                }
            }
        }

        info!("Session expiry task stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::application::charging_session::SessionTokenManager;
    use crate::domain::payment::NewPayment;
    use crate::domain::RepositoryProvider;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    #[tokio::test]
    async fn sweeps_on_first_tick_and_stops_on_shutdown() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let payment = repos.payments().record(NewPayment::default()).await.unwrap();
        let manager = Arc::new(SessionTokenManager::new(
            repos.clone(),
            ChronoDuration::minutes(-1),
        ));
        let issued = manager.issue(1, payment.id).await.unwrap();

        let shutdown = ShutdownSignal::new();
        let task = start_session_expiry_task(manager.clone(), shutdown.clone(), 3600);

        let mut swept = false;
        for _ in 0..50 {
            if !manager.verify(&issued.token).await.unwrap().status {
                swept = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(swept);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
