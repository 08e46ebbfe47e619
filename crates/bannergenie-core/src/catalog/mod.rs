//! Template catalog: cached listings and identifier resolution.

pub mod cache;

use std::sync::Arc;

use secrecy::SecretString;

use bannergenie_types::error::DesignError;
use bannergenie_types::modification::Modification;
use bannergenie_types::render::{JobHandle, JobStatusReport, RenderMode, RenderOutcome};
use bannergenie_types::template::{Template, TemplateSummary};

use crate::render::client::{JobStatusSource, RenderClient};

pub use cache::{CachedCatalog, TemplateCatalogCache, credential_fingerprint};

/// Resolve what a user typed to pick a template.
///
/// Tried in order: a 1-based position in `listing`, an exact uid, then a
/// case-insensitive name.
pub fn resolve_identifier<'a>(
    listing: &'a [TemplateSummary],
    ident: &str,
) -> Option<&'a TemplateSummary> {
    let ident = ident.trim();
    if ident.is_empty() {
        return None;
    }
    if let Ok(n) = ident.parse::<usize>() {
        if let Some(t) = n.checked_sub(1).and_then(|i| listing.get(i)) {
            return Some(t);
        }
    }
    listing
        .iter()
        .find(|t| t.uid == ident)
        .or_else(|| listing.iter().find(|t| t.name.eq_ignore_ascii_case(ident)))
}

/// Render client decorator that serves `list_templates` from a shared
/// [`TemplateCatalogCache`]. Everything else passes straight through.
pub struct CachedCatalogClient<C> {
    inner: C,
    cache: Arc<TemplateCatalogCache>,
    fingerprint: String,
}

impl<C: RenderClient> CachedCatalogClient<C> {
    pub fn new(inner: C, cache: Arc<TemplateCatalogCache>, credential: &SecretString) -> Self {
        Self {
            inner,
            cache,
            fingerprint: credential_fingerprint(credential),
        }
    }

    /// Drop the cached listing for this credential and fetch a new one.
    pub async fn refresh_templates(&self) -> Result<Vec<TemplateSummary>, DesignError> {
        self.cache.invalidate(&self.fingerprint);
        self.list_templates().await
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: RenderClient> JobStatusSource for CachedCatalogClient<C> {
    async fn job_status(&self, handle: &JobHandle) -> Result<JobStatusReport, DesignError> {
        self.inner.job_status(handle).await
    }
}

impl<C: RenderClient> RenderClient for CachedCatalogClient<C> {
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DesignError> {
        if let Some(cached) = self.cache.get(&self.fingerprint) {
            tracing::debug!(count = cached.templates.len(), "template catalog served from cache");
            return Ok(cached.templates.clone());
        }
        let templates = self.inner.list_templates().await?;
        tracing::debug!(count = templates.len(), "template catalog cached");
        self.cache.put(&self.fingerprint, templates.clone());
        Ok(templates)
    }

    async fn fetch_template_details(&self, uid: &str) -> Result<Template, DesignError> {
        self.inner.fetch_template_details(uid).await
    }

    async fn submit_render(
        &self,
        template_uid: &str,
        modifications: &[Modification],
        mode: RenderMode,
    ) -> Result<RenderOutcome, DesignError> {
        self.inner.submit_render(template_uid, modifications, mode).await
    }

    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, DesignError> {
        self.inner.download_image(image_url).await
    }
}
