//! Render submission, remote job status and local render job tracking.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modification::Modification;

/// How the render service should answer a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Block server-side until the image is ready (may still come back pending).
    Synchronous,
    /// Return a job handle immediately.
    Asynchronous,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Synchronous => write!(f, "sync"),
            RenderMode::Asynchronous => write!(f, "async"),
        }
    }
}

/// Opaque handle of a remote render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immediate answer to a render submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed { image_url: String },
    Pending { job_handle: JobHandle },
    Failed { reason: String },
}

/// Status of a remote job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Completed,
    Pending,
    Failed,
    /// A status string the client does not know. Treated like `Pending`.
    Unrecognized(String),
}

impl From<&str> for RemoteStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" => RemoteStatus::Completed,
            "pending" => RemoteStatus::Pending,
            "failed" => RemoteStatus::Failed,
            other => RemoteStatus::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatus::Completed => write!(f, "completed"),
            RemoteStatus::Pending => write!(f, "pending"),
            RemoteStatus::Failed => write!(f, "failed"),
            RemoteStatus::Unrecognized(s) => write!(f, "{s}"),
        }
    }
}

/// One answer to a job status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    pub status: RemoteStatus,
    pub image_url: Option<String>,
    pub reason: Option<String>,
}

impl JobStatusReport {
    pub fn pending() -> Self {
        Self {
            status: RemoteStatus::Pending,
            image_url: None,
            reason: None,
        }
    }

    pub fn completed(image_url: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Completed,
            image_url: Some(image_url.into()),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            image_url: None,
            reason: Some(reason.into()),
        }
    }
}

/// Lifecycle state of a local render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderJobState {
    Submitted,
    Pending,
    Completed,
    Failed,
    TimedOut,
}

impl fmt::Display for RenderJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderJobState::Submitted => write!(f, "submitted"),
            RenderJobState::Pending => write!(f, "pending"),
            RenderJobState::Completed => write!(f, "completed"),
            RenderJobState::Failed => write!(f, "failed"),
            RenderJobState::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// One render request and everything learned about it.
///
/// The modification list is a snapshot taken at submission and cannot be
/// changed afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct RenderJob {
    pub id: Uuid,
    pub template_uid: String,
    modifications: Vec<Modification>,
    pub state: RenderJobState,
    pub job_handle: Option<JobHandle>,
    pub image_url: Option<String>,
    pub failure_reason: Option<String>,
    /// Status queries spent waiting on this job.
    pub poll_attempts: u32,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    pub fn submitted(template_uid: impl Into<String>, modifications: Vec<Modification>) -> Self {
        Self {
            id: Uuid::now_v7(),
            template_uid: template_uid.into(),
            modifications,
            state: RenderJobState::Submitted,
            job_handle: None,
            image_url: None,
            failure_reason: None,
            poll_attempts: 0,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// The modifications exactly as submitted.
    pub fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    /// Whether this job rendered the template with no overrides.
    pub fn uses_template_defaults(&self) -> bool {
        self.modifications.is_empty()
    }

    pub fn mark_pending(&mut self, handle: JobHandle) {
        self.state = RenderJobState::Pending;
        self.job_handle = Some(handle);
    }

    pub fn complete(&mut self, image_url: impl Into<String>) {
        self.state = RenderJobState::Completed;
        self.image_url = Some(image_url.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = RenderJobState::Failed;
        self.failure_reason = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn time_out(&mut self, attempts: u32) {
        self.state = RenderJobState::TimedOut;
        self.failure_reason = Some(format!("no result after {attempts} status checks"));
        self.finished_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RenderJobState::Completed | RenderJobState::Failed | RenderJobState::TimedOut
        )
    }
}
