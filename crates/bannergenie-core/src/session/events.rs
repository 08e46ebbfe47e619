//! Broadcast event bus for design session activity.
//!
//! Built on `tokio::sync::broadcast`. Front-ends subscribe to drive spinners
//! and progress lines; publishing with no subscribers is a no-op.

use tokio::sync::broadcast;
use uuid::Uuid;

use bannergenie_types::template::LayerKind;

/// Something observable that happened in a design session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignEvent {
    TemplateSelected {
        uid: String,
        name: String,
        layer_count: usize,
    },
    ModificationStaged {
        layer_name: String,
        kind: LayerKind,
        replaced: bool,
    },
    UploadRequested {
        layer_name: String,
    },
    UploadCancelled {
        layer_name: String,
    },
    RenderSubmitted {
        job_id: Uuid,
        template_uid: String,
        modification_count: usize,
    },
    /// The job is still pending after a status query.
    RenderProgress {
        job_id: Uuid,
        attempt: u32,
        max_attempts: u32,
        status: String,
    },
    RenderCompleted {
        job_id: Uuid,
        image_url: String,
    },
    RenderFailed {
        job_id: Uuid,
        reason: String,
    },
    RenderTimedOut {
        job_id: Uuid,
        attempts: u32,
    },
    SessionReset,
}

/// Multi-consumer bus for [`DesignEvent`]s. Cloning shares the sender.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DesignEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DesignEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: DesignEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
