use thiserror::Error;

/// Errors surfaced by design sessions and their collaborators.
///
/// Every variant renders as a message fit to show the user. Only [`Auth`]
/// is fatal; everything else leaves the session usable for a retry.
///
/// [`Auth`]: DesignError::Auth
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("render service credential missing or rejected: {0}")]
    Auth(String),

    #[error("could not reach the service: {0}")]
    Connection(String),

    #[error("service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("unexpected response from the service: {0}")]
    MalformedResponse(String),

    #[error("no layer named '{layer}' in this template (available: {})", available.join(", "))]
    UnknownLayer { layer: String, available: Vec<String> },

    #[error("no template selected")]
    NoTemplateSelected,

    #[error("nothing to render: stage a change first, or confirm rendering with template defaults")]
    NothingToRender,

    #[error("invalid value for layer '{layer}': {reason}")]
    InvalidValue { layer: String, reason: String },

    #[error("no layer is waiting for an uploaded image")]
    NoPendingUpload,

    #[error("image upload failed: {0}")]
    UploadFailed(String),

    #[error("render failed on the service: {reason}")]
    RenderFailed { reason: String },

    #[error("render did not finish after {attempts} status checks")]
    TimedOut { attempts: u32 },

    #[error("could not understand that change: {0}")]
    ParseFailure(String),
}

impl DesignError {
    /// Whether the error blocks render-capable commands until the
    /// configuration is fixed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DesignError::Auth(_))
    }

    /// Whether simply repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DesignError::Connection(_)
                | DesignError::Service { .. }
                | DesignError::TimedOut { .. }
                | DesignError::UploadFailed(_)
        )
    }
}
