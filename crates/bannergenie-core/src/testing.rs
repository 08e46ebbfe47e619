//! In-memory collaborators shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use bannergenie_types::error::DesignError;
use bannergenie_types::modification::Modification;
use bannergenie_types::render::{JobHandle, JobStatusReport, RenderMode, RenderOutcome};
use bannergenie_types::template::{LayerDescriptor, LayerKind, Template, TemplateSummary};

use crate::render::client::{JobStatusSource, RenderClient};
use crate::upload::ImageHost;

/// Scripted render client with call counters.
///
/// Queued results are consumed in order. An empty status queue answers
/// `pending`; an empty submit queue answers `Completed` with a fixed URL.
#[derive(Default)]
pub(crate) struct MockRenderClient {
    templates: Mutex<Vec<Template>>,
    list_errors: Mutex<VecDeque<DesignError>>,
    details_errors: Mutex<VecDeque<DesignError>>,
    submit_results: Mutex<VecDeque<Result<RenderOutcome, DesignError>>>,
    statuses: Mutex<VecDeque<Result<JobStatusReport, DesignError>>>,
    submitted: Mutex<Vec<(String, Vec<Modification>, RenderMode)>>,
    list_calls: AtomicU32,
    details_calls: AtomicU32,
    submit_calls: AtomicU32,
    status_calls: AtomicU32,
}

impl MockRenderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(self, template: Template) -> Self {
        self.templates.lock().unwrap().push(template);
        self
    }

    pub fn push_list_error(&self, error: DesignError) {
        self.list_errors.lock().unwrap().push_back(error);
    }

    pub fn push_details_error(&self, error: DesignError) {
        self.details_errors.lock().unwrap().push_back(error);
    }

    pub fn push_submit(&self, result: Result<RenderOutcome, DesignError>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, result: Result<JobStatusReport, DesignError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn submitted(&self) -> Vec<(String, Vec<Modification>, RenderMode)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> u32 {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl JobStatusSource for MockRenderClient {
    async fn job_status(&self, _handle: &JobHandle) -> Result<JobStatusReport, DesignError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatusReport::pending()))
    }
}

impl RenderClient for MockRenderClient {
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DesignError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .map(Template::summary)
            .collect())
    }

    async fn fetch_template_details(&self, uid: &str) -> Result<Template, DesignError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.details_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.uid == uid)
            .cloned()
            .ok_or_else(|| DesignError::Service {
                status: 404,
                message: format!("template {uid} not found"),
            })
    }

    async fn submit_render(
        &self,
        template_uid: &str,
        modifications: &[Modification],
        mode: RenderMode,
    ) -> Result<RenderOutcome, DesignError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push((
            template_uid.to_string(),
            modifications.to_vec(),
            mode,
        ));
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(RenderOutcome::Completed {
                    image_url: "https://cdn.example/render.png".to_string(),
                })
            })
    }

    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, DesignError> {
        Ok(image_url.as_bytes().to_vec())
    }
}

/// Image host that always hands back the same public URL.
pub(crate) struct MockImageHost {
    pub url: String,
    pub uploads: AtomicU32,
}

impl MockImageHost {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            uploads: AtomicU32::new(0),
        }
    }
}

impl ImageHost for MockImageHost {
    async fn upload(&self, _bytes: &[u8]) -> Result<String, DesignError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

/// Template with a text layer `title` and an image layer `photo`.
pub(crate) fn sale_template() -> Template {
    Template {
        uid: "tpl_sale".to_string(),
        name: "Summer Sale".to_string(),
        layers: vec![
            LayerDescriptor::new("title", LayerKind::Text),
            LayerDescriptor::new("photo", LayerKind::Image),
        ],
    }
}

/// Template with a text layer `headline` and a color layer `background`.
pub(crate) fn event_template() -> Template {
    Template {
        uid: "tpl_event".to_string(),
        name: "Event Launch".to_string(),
        layers: vec![
            LayerDescriptor::new("headline", LayerKind::Text),
            LayerDescriptor::new("background", LayerKind::Color),
        ],
    }
}
