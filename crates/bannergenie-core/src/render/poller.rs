//! Completion poller with bounded attempts and a fixed interval.
//!
//! The poller never retries a failed status query: a transport or service
//! error ends the loop at once and the caller decides what to do next.

use std::time::Duration;

use bannergenie_types::config::PollingConfig;
use bannergenie_types::error::DesignError;
use bannergenie_types::render::{JobHandle, RemoteStatus};

use super::client::JobStatusSource;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// One non-terminal status observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    pub handle: JobHandle,
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: RemoteStatus,
}

/// Receives a [`PollProgress`] after every non-terminal status query.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &PollProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&PollProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &PollProgress) {
        self(progress)
    }
}

/// Observer that ignores everything.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: &PollProgress) {}
}

// ---------------------------------------------------------------------------
// PollOutcome
// ---------------------------------------------------------------------------

/// Terminal result of waiting on a job. `attempts` counts status queries sent.
#[derive(Debug)]
pub enum PollOutcome {
    Completed { image_url: String, attempts: u32 },
    Failed { reason: String, attempts: u32 },
    /// A status query itself failed.
    Errored { error: DesignError, attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Completed { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::Errored { attempts, .. }
            | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Waits on a pending render job until it reaches a terminal outcome.
pub trait Poller: Send + Sync {
    fn run<S: JobStatusSource>(
        &self,
        source: &S,
        handle: &JobHandle,
        observer: &dyn ProgressObserver,
    ) -> impl std::future::Future<Output = PollOutcome> + Send;
}

/// Polls at a fixed interval, at most `max_attempts` times.
#[derive(Debug, Clone)]
pub struct BoundedPoller {
    interval: Duration,
    max_attempts: u32,
}

impl BoundedPoller {
    /// `max_attempts` is clamped to at least one query.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(Duration::from_secs(config.interval_secs), config.max_attempts)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for BoundedPoller {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl Poller for BoundedPoller {
    #[tracing::instrument(
        name = "poll_render_job",
        skip(self, source, observer),
        fields(job = %handle, max_attempts = self.max_attempts)
    )]
    async fn run<S: JobStatusSource>(
        &self,
        source: &S,
        handle: &JobHandle,
        observer: &dyn ProgressObserver,
    ) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            let report = match source.job_status(handle).await {
                Ok(report) => report,
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "status query failed; stopping poll");
                    return PollOutcome::Errored {
                        error,
                        attempts: attempt,
                    };
                }
            };

            let status = match (report.status, report.image_url) {
                (RemoteStatus::Completed, Some(image_url)) => {
                    tracing::debug!(attempt, "render completed");
                    return PollOutcome::Completed {
                        image_url,
                        attempts: attempt,
                    };
                }
                // The URL fields can lag behind the status flip.
                (RemoteStatus::Completed, None) => {
                    tracing::debug!(attempt, "completed without an image URL yet");
                    RemoteStatus::Pending
                }
                (status, _) => status,
            };

            match status {
                RemoteStatus::Failed => {
                    let reason = report
                        .reason
                        .unwrap_or_else(|| "the service gave no reason".to_string());
                    tracing::debug!(attempt, reason = %reason, "render failed");
                    return PollOutcome::Failed {
                        reason,
                        attempts: attempt,
                    };
                }
                status => {
                    if let RemoteStatus::Unrecognized(raw) = &status {
                        tracing::debug!(
                            attempt,
                            status = %raw,
                            "unrecognized status; treating as pending"
                        );
                    }
                    observer.on_progress(&PollProgress {
                        handle: handle.clone(),
                        attempt,
                        max_attempts: self.max_attempts,
                        status,
                    });
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }

        tracing::warn!(attempts = self.max_attempts, "render still pending; giving up");
        PollOutcome::TimedOut {
            attempts: self.max_attempts,
        }
    }
}
