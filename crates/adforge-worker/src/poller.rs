//! Background poller driving in-flight generation jobs.
//!
//! API poll requests advance jobs opportunistically; this loop is what
//! guarantees progress when no client is watching. Each sweep lists the
//! non-terminal rows and polls them through the orchestrator, so the same
//! transition rules apply no matter who polls first.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{watch, Semaphore};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use adforge_engine::Orchestrator;
use adforge_models::MediaKind;

use crate::config::PollerConfig;

const SWEEPS_TOTAL: &str = "poller_sweeps_total";
const JOBS_POLLED_TOTAL: &str = "poller_jobs_polled_total";

/// Periodically polls every active generation job.
pub struct JobPoller {
    orchestrator: Arc<Orchestrator>,
    config: PollerConfig,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobPoller {
    /// Create a new poller.
    pub fn new(orchestrator: Arc<Orchestrator>, config: PollerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_polls));
        let (shutdown, _) = watch::channel(false);

        Self {
            orchestrator,
            config,
            semaphore,
            shutdown,
        }
    }

    /// Signal the run loop to stop after the current sweep.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Run the polling loop until shutdown is signalled.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            max_concurrent = self.config.max_concurrent_polls,
            "Starting generation job poller"
        );

        let mut ticker = interval(self.config.poll_interval);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping poller");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        // Let in-flight polls drain before exiting.
        let _ = tokio::time::timeout(Duration::from_secs(30), self.wait_for_polls()).await;
        info!("Poller stopped");
    }

    /// One pass over both job tables.
    async fn sweep(&self) {
        counter!(SWEEPS_TOTAL).increment(1);

        for kind in [MediaKind::Video, MediaKind::Image] {
            let jobs = match self
                .orchestrator
                .list_active(kind, self.config.batch_size)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(kind = %kind, "Failed to list active jobs: {}", e);
                    continue;
                }
            };

            if jobs.is_empty() {
                continue;
            }
            debug!(kind = %kind, count = jobs.len(), "Polling active jobs");

            for job in jobs {
                let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return,
                };

                let orchestrator = Arc::clone(&self.orchestrator);
                let job_id = job.id.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    counter!(JOBS_POLLED_TOTAL, "kind" => kind.as_str()).increment(1);
                    match orchestrator.poll_job(kind, &job_id).await {
                        Ok(job) if job.is_terminal() => {
                            info!(job_id = %job.id, status = %job.status, "Job reached terminal state");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(job_id = %job_id, "Poll failed: {}", e);
                        }
                    }
                });
            }
        }
    }

    async fn wait_for_polls(&self) {
        // All permits back means no poll task is still running.
        while self.semaphore.available_permits() < self.config.max_concurrent_polls {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
