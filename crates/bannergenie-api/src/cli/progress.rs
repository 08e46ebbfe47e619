//! Render progress display driven by design session events.

use indicatif::ProgressBar;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use bannergenie_core::session::DesignEvent;

/// Spinner text for an event, or `None` if the event does not change it.
pub fn progress_message(event: &DesignEvent) -> Option<String> {
    match event {
        DesignEvent::RenderSubmitted {
            modification_count: 0,
            ..
        } => Some("Rendering with template defaults...".to_string()),
        DesignEvent::RenderSubmitted {
            modification_count, ..
        } => Some(format!(
            "Rendering with {modification_count} change{}...",
            if *modification_count == 1 { "" } else { "s" }
        )),
        DesignEvent::RenderProgress {
            attempt,
            max_attempts,
            ..
        } => Some(format!("still working (attempt {attempt}/{max_attempts})")),
        _ => None,
    }
}

/// A spinner that follows one render through the session's event bus.
pub struct RenderSpinner {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl RenderSpinner {
    pub fn start(mut events: broadcast::Receiver<DesignEvent>, hidden: bool) -> Self {
        let bar = super::spinner("Submitting render...", hidden);
        let task_bar = bar.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(message) = progress_message(&event) {
                            task_bar.set_message(message);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "progress display lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { bar, task }
    }

    /// Stop following events and clear the spinner.
    pub async fn finish(self) {
        self.task.abort();
        let _ = self.task.await;
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bannergenie_core::session::EventBus;

    fn job_id() -> uuid::Uuid {
        uuid::Uuid::nil()
    }

    #[test]
    fn messages_for_render_events() {
        assert_eq!(
            progress_message(&DesignEvent::RenderSubmitted {
                job_id: job_id(),
                template_uid: "tpl_1".to_string(),
                modification_count: 2,
            })
            .as_deref(),
            Some("Rendering with 2 changes...")
        );
        assert_eq!(
            progress_message(&DesignEvent::RenderSubmitted {
                job_id: job_id(),
                template_uid: "tpl_1".to_string(),
                modification_count: 0,
            })
            .as_deref(),
            Some("Rendering with template defaults...")
        );
        assert_eq!(
            progress_message(&DesignEvent::RenderProgress {
                job_id: job_id(),
                attempt: 3,
                max_attempts: 20,
                status: "pending".to_string(),
            })
            .as_deref(),
            Some("still working (attempt 3/20)")
        );
        assert_eq!(progress_message(&DesignEvent::SessionReset), None);
    }

    #[tokio::test]
    async fn spinner_follows_events_and_finishes() {
        let bus = EventBus::new(8);
        let spinner = RenderSpinner::start(bus.subscribe(), true);
        bus.publish(DesignEvent::RenderProgress {
            job_id: job_id(),
            attempt: 1,
            max_attempts: 5,
            status: "pending".to_string(),
        });
        tokio::task::yield_now().await;
        spinner.finish().await;
    }
}
