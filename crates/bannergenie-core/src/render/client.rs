//! RenderClient trait definition.
//!
//! Implementations live in bannergenie-infra (e.g., `BannerbearClient`). The
//! status query is split into its own trait so the poller only needs that
//! one capability.

use bannergenie_types::error::DesignError;
use bannergenie_types::modification::Modification;
use bannergenie_types::render::{JobHandle, JobStatusReport, RenderMode, RenderOutcome};
use bannergenie_types::template::{Template, TemplateSummary};

/// Anything that can report the status of a remote render job.
pub trait JobStatusSource: Send + Sync {
    fn job_status(
        &self,
        handle: &JobHandle,
    ) -> impl std::future::Future<Output = Result<JobStatusReport, DesignError>> + Send;
}

/// Port to the remote render service.
///
/// Every call carries the configured credential. A client built without one
/// fails each call with `DesignError::Auth` before sending anything.
pub trait RenderClient: JobStatusSource {
    /// Templates visible to the credential.
    fn list_templates(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<TemplateSummary>, DesignError>> + Send;

    /// Full template with its editable layers. Never cached.
    fn fetch_template_details(
        &self,
        uid: &str,
    ) -> impl std::future::Future<Output = Result<Template, DesignError>> + Send;

    /// Submit a render. An empty `modifications` list renders template defaults.
    fn submit_render(
        &self,
        template_uid: &str,
        modifications: &[Modification],
        mode: RenderMode,
    ) -> impl std::future::Future<Output = Result<RenderOutcome, DesignError>> + Send;

    /// Fetch the bytes of a finished image.
    fn download_image(
        &self,
        image_url: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, DesignError>> + Send;
}
