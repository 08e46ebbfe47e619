//! Application state: configuration, credentials and the shared catalog
//! cache, plus factories for everything a command needs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};

use bannergenie_core::assist::LlmDecisionMaker;
use bannergenie_core::catalog::{CachedCatalogClient, TemplateCatalogCache};
use bannergenie_core::llm::box_provider::BoxLlmProvider;
use bannergenie_core::nlu::LlmModificationParser;
use bannergenie_core::render::poller::BoundedPoller;
use bannergenie_core::session::DesignSession;
use bannergenie_infra::bannerbear::BannerbearClient;
use bannergenie_infra::config::load_app_config;
use bannergenie_infra::credentials::{Credentials, llm_key_var};
use bannergenie_infra::filesystem::resolve_data_dir;
use bannergenie_infra::freeimage::FreeImageHost;
use bannergenie_infra::llm::create_provider;
use bannergenie_types::config::AppConfig;
use bannergenie_types::render::{RenderJob, RenderMode};

/// Render client used by every session: Bannerbear behind the catalog cache.
pub type ConcreteClient = CachedCatalogClient<BannerbearClient>;

pub type ConcreteSession = DesignSession<ConcreteClient, BoundedPoller>;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub credentials: Credentials,
    render_key: SecretString,
    catalog_cache: Arc<TemplateCatalogCache>,
}

impl AppState {
    /// Load configuration and credentials.
    ///
    /// Fails when `BANNERBEAR_API_KEY` is missing; nothing works without it.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_app_config(&data_dir).await;
        let credentials = Credentials::from_env();
        let render_key = credentials.require_render()?;

        let catalog_cache = Arc::new(TemplateCatalogCache::new(Duration::from_secs(
            config.bannerbear.catalog_ttl_secs,
        )));

        tracing::debug!(data_dir = %data_dir.display(), "application state ready");
        Ok(Self {
            data_dir,
            config,
            credentials,
            render_key,
            catalog_cache,
        })
    }

    pub fn render_client(&self) -> ConcreteClient {
        let key = SecretString::from(self.render_key.expose_secret().to_string());
        let bannerbear = BannerbearClient::new(Some(key), &self.config.bannerbear);
        CachedCatalogClient::new(bannerbear, Arc::clone(&self.catalog_cache), &self.render_key)
    }

    pub fn new_session(&self, mode: RenderMode) -> ConcreteSession {
        DesignSession::new(
            self.render_client(),
            BoundedPoller::from_config(&self.config.polling),
        )
        .with_render_mode(mode)
    }

    /// The free-text parser, or an explanation of why it is unavailable.
    pub fn parser(&self) -> Result<LlmModificationParser, String> {
        let provider = self.llm_provider("free-text edits")?;
        Ok(LlmModificationParser::new(provider, self.config.llm.model.clone()))
    }

    /// The assistant's decision maker, or why it is unavailable.
    pub fn decider(&self) -> Result<LlmDecisionMaker, String> {
        let provider = self.llm_provider("the design assistant")?;
        Ok(LlmDecisionMaker::new(provider, self.config.llm.model.clone()))
    }

    fn llm_provider(&self, feature: &str) -> Result<BoxLlmProvider, String> {
        let provider_name = self.config.llm.provider.as_str();
        let key = self.credentials.llm_key(provider_name).ok_or_else(|| {
            format!("{feature} is disabled ({} is not set)", llm_key_var(provider_name))
        })?;
        create_provider(&self.config.llm, &key).map_err(|e| format!("{feature} is disabled ({e})"))
    }

    /// Where `/save` puts a render when no path is given.
    pub fn default_render_path(&self, job: &RenderJob) -> PathBuf {
        render_path_in(&self.data_dir, job)
    }

    /// The image host, or `None` when `FREEIMAGE_API_KEY` is not set.
    pub fn image_host(&self) -> Option<FreeImageHost> {
        self.credentials
            .image_host_key()
            .map(|key| FreeImageHost::new(key, &self.config.upload))
    }

    pub fn require_image_host(&self) -> anyhow::Result<FreeImageHost> {
        self.image_host()
            .context("image uploads are disabled (FREEIMAGE_API_KEY is not set)")
    }
}

fn render_path_in(data_dir: &Path, job: &RenderJob) -> PathBuf {
    data_dir.join("renders").join(format!("{}.png", job.id))
}
