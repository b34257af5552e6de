//! Daemon runtime: dependency wiring and the housekeeping loop.

use anyhow::{Context, Result};
use overseer_application::{ApprovalEngine, NullNotifier, Supervisor};
use overseer_application::ports::notifier::Notifier;
use overseer_infrastructure::{
    ClaudeLauncher, CommandNotifier, ControlServer, FileConfig, HttpRiskEvaluator, SqliteStore,
    StdRngProbability,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the daemon until a shutdown signal or control command arrives.
pub async fn run(config: FileConfig, socket_override: Option<std::path::PathBuf>) -> Result<()> {
    let db_path = config.db_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open state store at {}", db_path.display()))?,
    );

    let mut engine = ApprovalEngine::new(store.clone(), Arc::new(StdRngProbability::from_entropy()))
        .with_risk_table(config.risk_table())
        .with_advisory_override(config.engine.advisory_overrides_rule);
    if let Some(url) = &config.risk_service.url {
        let advisory =
            HttpRiskEvaluator::new(url, Duration::from_secs(config.risk_service.timeout_secs))
                .context("failed to build advisory risk client")?;
        engine = engine.with_advisory(Arc::new(advisory));
        info!(url, "advisory risk service enabled");
    }

    let notifier: Arc<dyn Notifier> = match &config.notify.command {
        Some(command) => Arc::new(CommandNotifier::new(command)),
        None => Arc::new(NullNotifier),
    };

    let launcher = Arc::new(ClaudeLauncher::new(config.agent_command()));
    let supervisor = Arc::new(Supervisor::new(
        store,
        engine,
        launcher,
        notifier,
        config.supervisor_limits(),
    ));

    let shutdown = CancellationToken::new();
    let socket_path = socket_override.unwrap_or_else(|| config.socket_path());
    let server = ControlServer::new(socket_path, supervisor.clone(), shutdown.clone());
    let server_task = tokio::spawn(async move { server.run().await });

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    // Pick up any agents left idle by a previous run.
    if let Err(e) = supervisor.start_pending().await {
        warn!(error = %e, "initial scheduling pass failed");
    }

    let tick = Duration::from_secs(config.daemon.tick_secs.max(1));
    let archive_after = chrono::Duration::hours(config.daemon.archive_after_hours as i64);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(tick) => {
                if let Err(e) = supervisor.start_pending().await {
                    warn!(error = %e, "scheduling pass failed");
                }
                if let Err(e) = supervisor.archive_finished(archive_after) {
                    warn!(error = %e, "archive sweep failed");
                }
                if let Err(e) = supervisor.flag_overdue_approvals().await {
                    warn!(error = %e, "overdue approval check failed");
                }
            }
        }
    }

    info!("stopping agents");
    supervisor.shutdown().await;
    server_task.await.context("control server task panicked")??;
    info!("daemon stopped");
    Ok(())
}
