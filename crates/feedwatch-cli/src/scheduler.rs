//! Periodic jobs that drive the mirror.
//!
//! Five independent repeating jobs share one [`Mirror`](feedwatch_sync::Mirror).
//! A tick that finds its previous run still in progress is skipped. Errors
//! escalated by strict mode are forwarded on the `fatal` channel; the caller
//! decides when to stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use feedwatch_core::AppConfig;
use feedwatch_sync::SyncError;
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::SharedMirror;

/// Builds and starts the job scheduler.
///
/// The returned [`JobScheduler`] must be kept alive for as long as the jobs
/// should run.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub(crate) async fn build_scheduler(
    mirror: SharedMirror,
    config: Arc<AppConfig>,
    fatal: mpsc::Sender<SyncError>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_poll_job(&scheduler, Arc::clone(&mirror), &config, fatal.clone()).await?;
    register_prune_job(&scheduler, Arc::clone(&mirror), &config, fatal.clone()).await?;
    register_request_report_job(&scheduler, Arc::clone(&mirror), &config).await?;
    register_backup_job(&scheduler, Arc::clone(&mirror), Arc::clone(&config)).await?;
    register_export_job(&scheduler, mirror, config, fatal).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_poll_job(
    scheduler: &JobScheduler,
    mirror: SharedMirror,
    config: &AppConfig,
    fatal: mpsc::Sender<SyncError>,
) -> Result<(), JobSchedulerError> {
    register_repeated(scheduler, "poll", config.refresh_interval(), move || {
        let mirror = Arc::clone(&mirror);
        let fatal = fatal.clone();
        async move {
            match mirror.poll_all_sources().await {
                Ok(summary) => tracing::debug!(
                    polled = summary.sources_polled,
                    failed = summary.sources_failed,
                    live = summary.marked_live,
                    "scheduler: poll complete"
                ),
                Err(e) => escalate(&fatal, e).await,
            }
        }
    })
    .await
}

async fn register_prune_job(
    scheduler: &JobScheduler,
    mirror: SharedMirror,
    config: &AppConfig,
    fatal: mpsc::Sender<SyncError>,
) -> Result<(), JobSchedulerError> {
    register_repeated(scheduler, "prune", config.refresh_interval(), move || {
        let mirror = Arc::clone(&mirror);
        let fatal = fatal.clone();
        async move {
            if let Err(e) = mirror.prune_and_crawl(Utc::now()).await {
                escalate(&fatal, e).await;
            }
        }
    })
    .await
}

async fn register_request_report_job(
    scheduler: &JobScheduler,
    mirror: SharedMirror,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    register_repeated(scheduler, "requests", config.refresh_interval(), move || {
        let mirror = Arc::clone(&mirror);
        async move {
            mirror.report_requests(Utc::now()).await;
        }
    })
    .await
}

async fn register_backup_job(
    scheduler: &JobScheduler,
    mirror: SharedMirror,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let every = config.backup_interval();
    register_repeated(scheduler, "backup", every, move || {
        let mirror = Arc::clone(&mirror);
        let config = Arc::clone(&config);
        async move {
            if let Err(e) = mirror.save_snapshot(&config.state_file).await {
                tracing::error!(error = %e, "scheduler: snapshot failed");
            }
        }
    })
    .await
}

async fn register_export_job(
    scheduler: &JobScheduler,
    mirror: SharedMirror,
    config: Arc<AppConfig>,
    fatal: mpsc::Sender<SyncError>,
) -> Result<(), JobSchedulerError> {
    let every = config.export_interval();
    register_repeated(scheduler, "export", every, move || {
        let mirror = Arc::clone(&mirror);
        let config = Arc::clone(&config);
        let fatal = fatal.clone();
        async move {
            let result = mirror
                .export_all(&config.post_export_file, &config.comment_export_file)
                .await;
            if let Err(e) = result {
                escalate(&fatal, e).await;
            }
        }
    })
    .await
}

/// Registers `task` to run every `every`, skipping ticks that overlap a
/// run still in progress.
async fn register_repeated<F, Fut>(
    scheduler: &JobScheduler,
    name: &'static str,
    every: Duration,
    task: F,
) -> Result<(), JobSchedulerError>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task = Arc::new(task);
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_repeated_async(every, move |_uuid, _lock| {
        let task = Arc::clone(&task);
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!(
                    job = name,
                    "scheduler: previous run still in progress; skipping"
                );
                return;
            };
            tracing::debug!(job = name, "scheduler: tick");
            task().await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(job = name, every_secs = every.as_secs(), "scheduler: job registered");
    Ok(())
}

/// Strict-mode aborts go to the harness; anything else is only logged.
async fn escalate(fatal: &mpsc::Sender<SyncError>, err: SyncError) {
    if matches!(err, SyncError::Strict { .. }) {
        if fatal.send(err).await.is_err() {
            tracing::error!("scheduler: fatal error dropped; harness is gone");
        }
    } else {
        tracing::error!(error = %err, "scheduler: job failed");
    }
}
