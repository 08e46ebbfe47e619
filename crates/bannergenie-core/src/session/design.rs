//! Design session state machine.
//!
//! `Idle` -> `TemplateSelected` -> `Rendering` -> `TemplateSelected`.
//!
//! A session owns the selected template, the staged modifications, the last
//! render job and the pending-upload marker. Every mutating operation takes
//! `&mut self`, so a poll in flight can never interleave with an edit.
//!
//! An `Auth` error from the render service blocks every render-capable
//! operation for the rest of the session's life. The credential is process
//! configuration, so only a restart can fix it.

use bannergenie_types::error::DesignError;
use bannergenie_types::modification::{Modification, ModificationPayload, PENDING_UPLOAD};
use bannergenie_types::render::{RenderJob, RenderMode, RenderOutcome};
use bannergenie_types::template::{LayerKind, Template, TemplateSummary};

use crate::modification::ModificationSet;
use crate::nlu::ModificationParser;
use crate::render::client::RenderClient;
use crate::render::poller::{BoundedPoller, PollOutcome, PollProgress, Poller};
use crate::upload::ImageHost;

use super::events::{DesignEvent, EventBus};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TemplateSelected,
    Rendering,
}

/// What `stage_modification` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The change is in the modification set.
    Staged { layer_name: String, replaced: bool },
    /// Nothing staged yet: the layer waits for an uploaded image.
    AwaitingUpload { layer_name: String },
}

/// One user's banner design conversation.
pub struct DesignSession<C, P = BoundedPoller> {
    client: C,
    poller: P,
    render_mode: RenderMode,
    state: SessionState,
    template: Option<Template>,
    modifications: ModificationSet,
    last_job: Option<RenderJob>,
    pending_upload: Option<String>,
    auth_failure: Option<String>,
    events: EventBus,
}

impl<C: RenderClient, P: Poller> DesignSession<C, P> {
    pub fn new(client: C, poller: P) -> Self {
        Self {
            client,
            poller,
            render_mode: RenderMode::Synchronous,
            state: SessionState::Idle,
            template: None,
            modifications: ModificationSet::new(),
            last_job: None,
            pending_upload: None,
            auth_failure: None,
            events: EventBus::default(),
        }
    }

    /// Submit renders in `mode` instead of the default synchronous mode.
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DesignEvent> {
        self.events.subscribe()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn modifications(&self) -> &ModificationSet {
        &self.modifications
    }

    pub fn last_job(&self) -> Option<&RenderJob> {
        self.last_job.as_ref()
    }

    /// Layer waiting for an uploaded image, if any.
    pub fn pending_upload(&self) -> Option<&str> {
        self.pending_upload.as_deref()
    }

    pub fn layer_kind(&self, layer_name: &str) -> Option<LayerKind> {
        self.template.as_ref()?.layer(layer_name).map(|l| l.kind)
    }

    /// Whether an earlier `Auth` error has blocked render-capable commands.
    pub fn is_auth_blocked(&self) -> bool {
        self.auth_failure.is_some()
    }

    // -----------------------------------------------------------------------
    // Catalog and template selection
    // -----------------------------------------------------------------------

    pub async fn list_templates(&mut self) -> Result<Vec<TemplateSummary>, DesignError> {
        self.ensure_authorized()?;
        let result = self.client.list_templates().await;
        self.note_failure(result)
    }

    /// Load `uid` and make it the working template.
    ///
    /// On success the modification set, last job and upload marker are
    /// cleared. On failure nothing changes.
    #[tracing::instrument(name = "select_template", skip(self))]
    pub async fn select_template(&mut self, uid: &str) -> Result<&Template, DesignError> {
        self.ensure_authorized()?;
        let result = self.client.fetch_template_details(uid).await;
        let template = self.note_failure(result)?;

        tracing::info!(
            template = %template.uid,
            layers = template.layers.len(),
            "template selected"
        );
        self.modifications.clear();
        self.last_job = None;
        self.pending_upload = None;
        self.state = SessionState::TemplateSelected;
        self.events.publish(DesignEvent::TemplateSelected {
            uid: template.uid.clone(),
            name: template.name.clone(),
            layer_count: template.layers.len(),
        });
        Ok(&*self.template.insert(template))
    }

    /// Every catalog template with its layers.
    ///
    /// Templates whose details fail to load are skipped with a warning; an
    /// `Auth` error aborts the whole load.
    pub async fn catalog_details(&mut self) -> Result<Vec<Template>, DesignError> {
        let summaries = self.list_templates().await?;
        let mut templates = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let result = self.client.fetch_template_details(&summary.uid).await;
            match self.note_failure(result) {
                Ok(template) => templates.push(template),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => tracing::warn!(
                    template = %summary.uid,
                    error = %err,
                    "skipping template whose details failed to load"
                ),
            }
        }
        Ok(templates)
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Validate and stage one layer change.
    ///
    /// The layer must exist in the selected template (else `UnknownLayer`)
    /// and `kind` must be that layer's kind. Image values must be `http(s)`
    /// URLs, except [`PENDING_UPLOAD`], which marks the layer as waiting for
    /// an upload and stages nothing.
    pub fn stage_modification(
        &mut self,
        layer_name: &str,
        kind: LayerKind,
        value: &str,
    ) -> Result<StageResult, DesignError> {
        let layer_name = layer_name.trim();
        let layer = match self.template.as_ref() {
            Some(template) => match template.layer(layer_name) {
                Some(layer) => layer.clone(),
                None => {
                    return Err(DesignError::UnknownLayer {
                        layer: layer_name.to_string(),
                        available: template.layer_names(),
                    });
                }
            },
            None => {
                return Err(DesignError::UnknownLayer {
                    layer: layer_name.to_string(),
                    available: Vec::new(),
                });
            }
        };

        if layer.kind != kind {
            return Err(DesignError::InvalidValue {
                layer: layer.name,
                reason: format!("this is a {} layer, not {}", layer.kind, kind),
            });
        }

        let value = value.trim();
        if value.is_empty() {
            return Err(DesignError::InvalidValue {
                layer: layer.name,
                reason: "the value is empty".to_string(),
            });
        }

        if value == PENDING_UPLOAD {
            if kind != LayerKind::Image {
                return Err(DesignError::InvalidValue {
                    layer: layer.name,
                    reason: "only image layers take uploads".to_string(),
                });
            }
            tracing::debug!(layer = %layer.name, "layer awaiting upload");
            self.pending_upload = Some(layer.name.clone());
            self.events.publish(DesignEvent::UploadRequested {
                layer_name: layer.name.clone(),
            });
            return Ok(StageResult::AwaitingUpload {
                layer_name: layer.name,
            });
        }

        if kind == LayerKind::Image && !is_http_url(value) {
            return Err(DesignError::InvalidValue {
                layer: layer.name,
                reason: format!("'{value}' is not an http(s) URL"),
            });
        }

        let replaced = self
            .modifications
            .upsert(layer.name.clone(), ModificationPayload::for_kind(kind, value));
        if self.pending_upload.as_deref() == Some(layer.name.as_str()) {
            self.pending_upload = None;
        }
        tracing::debug!(layer = %layer.name, %kind, replaced, "modification staged");
        self.events.publish(DesignEvent::ModificationStaged {
            layer_name: layer.name.clone(),
            kind,
            replaced,
        });
        Ok(StageResult::Staged {
            layer_name: layer.name,
            replaced,
        })
    }

    /// Ask `parser` to interpret free text, then stage the result through the
    /// same validation as a direct edit.
    pub async fn interpret<M: ModificationParser>(
        &mut self,
        parser: &M,
        free_text: &str,
    ) -> Result<StageResult, DesignError> {
        let layers = match self.template.as_ref() {
            Some(template) => template.layers.clone(),
            None => return Err(DesignError::NoTemplateSelected),
        };
        let parsed = parser.parse(free_text, &layers).await?;
        self.stage_modification(&parsed.layer_name, parsed.kind, &parsed.value)
    }

    /// Stage `public_url` on the layer awaiting an upload and clear the marker.
    pub fn resolve_upload(&mut self, public_url: &str) -> Result<StageResult, DesignError> {
        let layer = self
            .pending_upload
            .clone()
            .ok_or(DesignError::NoPendingUpload)?;
        if public_url.trim() == PENDING_UPLOAD {
            return Err(DesignError::InvalidValue {
                layer,
                reason: "expected the uploaded image's URL".to_string(),
            });
        }
        let result = self.stage_modification(&layer, LayerKind::Image, public_url)?;
        self.pending_upload = None;
        Ok(result)
    }

    /// Publish `bytes` through `host` and stage the resulting URL on the
    /// layer awaiting an upload.
    pub async fn upload_image<H: ImageHost>(
        &mut self,
        host: &H,
        bytes: &[u8],
    ) -> Result<StageResult, DesignError> {
        if self.pending_upload.is_none() {
            return Err(DesignError::NoPendingUpload);
        }
        let public_url = host.upload(bytes).await?;
        tracing::info!(url = %public_url, "image uploaded");
        self.resolve_upload(&public_url)
    }

    /// Clear the pending-upload marker, returning the layer it named.
    pub fn cancel_upload(&mut self) -> Option<String> {
        let layer = self.pending_upload.take()?;
        self.events.publish(DesignEvent::UploadCancelled {
            layer_name: layer.clone(),
        });
        Some(layer)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Render the staged modifications.
    ///
    /// The submitted list is a snapshot; the staged set survives any outcome.
    /// Failed, timed-out and errored renders are still recorded as the last
    /// job.
    pub async fn request_render(&mut self) -> Result<RenderJob, DesignError> {
        if self.template.is_none() {
            return Err(DesignError::NoTemplateSelected);
        }
        if self.modifications.is_empty() {
            return Err(DesignError::NothingToRender);
        }
        let snapshot = self.modifications.to_ordered_list();
        self.render(snapshot).await
    }

    /// Render the template with no overrides, leaving staged changes alone.
    ///
    /// Callers must have confirmed this with the user.
    pub async fn request_render_with_defaults(&mut self) -> Result<RenderJob, DesignError> {
        if self.template.is_none() {
            return Err(DesignError::NoTemplateSelected);
        }
        self.render(Vec::new()).await
    }

    #[tracing::instrument(
        name = "render",
        skip(self, modifications),
        fields(modification_count = modifications.len(), mode = %self.render_mode)
    )]
    async fn render(&mut self, modifications: Vec<Modification>) -> Result<RenderJob, DesignError> {
        self.ensure_authorized()?;
        let template_uid = match self.template.as_ref() {
            Some(template) => template.uid.clone(),
            None => return Err(DesignError::NoTemplateSelected),
        };

        let mut job = RenderJob::submitted(template_uid, modifications);
        self.state = SessionState::Rendering;
        self.events.publish(DesignEvent::RenderSubmitted {
            job_id: job.id,
            template_uid: job.template_uid.clone(),
            modification_count: job.modifications().len(),
        });

        let result = self.drive(&mut job).await;

        self.state = SessionState::TemplateSelected;
        let event = match &result {
            Ok(()) => DesignEvent::RenderCompleted {
                job_id: job.id,
                image_url: job.image_url.clone().unwrap_or_default(),
            },
            Err(DesignError::TimedOut { attempts }) => DesignEvent::RenderTimedOut {
                job_id: job.id,
                attempts: *attempts,
            },
            Err(err) => DesignEvent::RenderFailed {
                job_id: job.id,
                reason: err.to_string(),
            },
        };
        self.events.publish(event);
        tracing::info!(
            job = %job.id,
            state = %job.state,
            attempts = job.poll_attempts,
            "render finished"
        );

        self.last_job = Some(job.clone());
        self.note_failure(result.map(|()| job))
    }

    async fn drive(&self, job: &mut RenderJob) -> Result<(), DesignError> {
        let outcome = match self
            .client
            .submit_render(&job.template_uid, job.modifications(), self.render_mode)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                job.fail(err.to_string());
                return Err(err);
            }
        };

        let handle = match outcome {
            RenderOutcome::Completed { image_url } => {
                job.complete(image_url);
                return Ok(());
            }
            RenderOutcome::Failed { reason } => {
                job.fail(reason.clone());
                return Err(DesignError::RenderFailed { reason });
            }
            RenderOutcome::Pending { job_handle } => job_handle,
        };

        job.mark_pending(handle.clone());
        let bus = self.events.clone();
        let job_id = job.id;
        let observer = move |p: &PollProgress| {
            bus.publish(DesignEvent::RenderProgress {
                job_id,
                attempt: p.attempt,
                max_attempts: p.max_attempts,
                status: p.status.to_string(),
            })
        };

        let outcome = self.poller.run(&self.client, &handle, &observer).await;
        job.poll_attempts = outcome.attempts();
        match outcome {
            PollOutcome::Completed { image_url, .. } => {
                job.complete(image_url);
                Ok(())
            }
            PollOutcome::Failed { reason, .. } => {
                job.fail(reason.clone());
                Err(DesignError::RenderFailed { reason })
            }
            PollOutcome::Errored { error, .. } => {
                job.fail(error.to_string());
                Err(error)
            }
            PollOutcome::TimedOut { attempts } => {
                job.time_out(attempts);
                Err(DesignError::TimedOut { attempts })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reset and auth bookkeeping
    // -----------------------------------------------------------------------

    /// Drop the template, staged changes, last job and upload marker.
    pub fn reset(&mut self) {
        self.template = None;
        self.modifications.clear();
        self.last_job = None;
        self.pending_upload = None;
        self.state = SessionState::Idle;
        self.events.publish(DesignEvent::SessionReset);
    }

    fn ensure_authorized(&self) -> Result<(), DesignError> {
        match &self.auth_failure {
            Some(message) => Err(DesignError::Auth(message.clone())),
            None => Ok(()),
        }
    }

    fn note_failure<T>(&mut self, result: Result<T, DesignError>) -> Result<T, DesignError> {
        if let Err(DesignError::Auth(message)) = &result {
            tracing::error!(
                error = %message,
                "render credential rejected; blocking render commands"
            );
            self.auth_failure = Some(message.clone());
        }
        result
    }
}

fn is_http_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !value.contains(char::is_whitespace)
}
