//! Subcommand handlers.
//!
//! Each handler receives the mirror and config built in `main`. Only `run`
//! starts the scheduler; the others do one pass and return.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use feedwatch_core::AppConfig;
use feedwatch_sync::SyncError;
use tokio::sync::mpsc;

use crate::scheduler;
use crate::SharedMirror;

/// Restores state, runs the scheduled jobs until a shutdown signal or a
/// strict-mode abort, then writes a final snapshot.
///
/// # Errors
///
/// Returns an error if the scheduler cannot start or a job escalated a
/// strict-mode failure.
pub(crate) async fn run_mirror(
    mirror: SharedMirror,
    config: Arc<AppConfig>,
) -> anyhow::Result<()> {
    restore_or_start_fresh(&mirror, &config.state_file).await;

    let (fatal_tx, mut fatal_rx) = mpsc::channel::<SyncError>(1);
    let mut jobs =
        scheduler::build_scheduler(Arc::clone(&mirror), Arc::clone(&config), fatal_tx).await?;

    let fatal = tokio::select! {
        () = shutdown_signal() => None,
        Some(err) = fatal_rx.recv() => Some(err),
    };

    if let Err(e) = jobs.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
    if let Err(e) = mirror.save_snapshot(&config.state_file).await {
        tracing::error!(error = %e, "final snapshot failed");
    }

    match fatal {
        Some(err) => {
            tracing::error!(error = %err, "aborting");
            Err(err.into())
        }
        None => {
            tracing::info!("shutdown complete");
            Ok(())
        }
    }
}

/// # Errors
///
/// Returns an error if a CSV file cannot be written or, in strict mode, a
/// live post's comment crawl fails.
pub(crate) async fn run_export(
    mirror: &SharedMirror,
    config: &AppConfig,
    posts: &Path,
    comments: &Path,
) -> anyhow::Result<()> {
    restore_or_start_fresh(mirror, &config.state_file).await;
    mirror.export_all(posts, comments).await?;
    // Comments fetched for the export are worth keeping.
    mirror.save_snapshot(&config.state_file).await?;
    println!("wrote {} and {}", posts.display(), comments.display());
    Ok(())
}

/// # Errors
///
/// Returns an error if any source fails to respond or returns no posts.
pub(crate) async fn run_check_sources(mirror: &SharedMirror) -> anyhow::Result<()> {
    let total = mirror.check_sources().await?;
    println!(
        "{total} posts from {} sources",
        mirror.settings().sources.len()
    );
    Ok(())
}

pub(crate) async fn run_requests(mirror: &SharedMirror, config: &AppConfig) {
    restore_or_start_fresh(mirror, &config.state_file).await;
    let count = mirror.report_requests(Utc::now()).await;
    println!("{count} requests in the last hour");
}

/// A missing snapshot is a normal first start; any other failure is logged
/// and the mirror starts empty.
async fn restore_or_start_fresh(mirror: &SharedMirror, path: &Path) {
    match mirror.restore_snapshot(path).await {
        Ok(()) => {}
        Err(SyncError::Persistence { ref source, .. }) if source.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no snapshot found; starting fresh");
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not restore state; starting fresh"
            );
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
