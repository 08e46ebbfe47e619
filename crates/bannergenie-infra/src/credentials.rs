//! Credentials from the environment.
//!
//! Read once at startup. Empty values count as missing. Nothing here is
//! ever logged; only presence is reported.

use secrecy::{ExposeSecret, SecretString};

use bannergenie_types::error::DesignError;

pub const BANNERBEAR_API_KEY: &str = "BANNERBEAR_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const FREEIMAGE_API_KEY: &str = "FREEIMAGE_API_KEY";

/// Every credential BannerGenie knows about.
#[derive(Default)]
pub struct Credentials {
    pub bannerbear: Option<SecretString>,
    pub google: Option<SecretString>,
    pub openai: Option<SecretString>,
    pub freeimage: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| match std::env::var(name) {
            Ok(value) => Some(value),
            // Present but not valid Unicode: treat as missing.
            Err(std::env::VarError::NotPresent | std::env::VarError::NotUnicode(_)) => None,
        })
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };
        let credentials = Self {
            bannerbear: read(BANNERBEAR_API_KEY),
            google: read(GOOGLE_API_KEY),
            openai: read(OPENAI_API_KEY),
            freeimage: read(FREEIMAGE_API_KEY),
        };
        tracing::debug!(
            bannerbear = credentials.bannerbear.is_some(),
            google = credentials.google.is_some(),
            openai = credentials.openai.is_some(),
            freeimage = credentials.freeimage.is_some(),
            "credentials loaded"
        );
        credentials
    }

    /// The render credential, required before any session starts.
    pub fn require_render(&self) -> Result<SecretString, DesignError> {
        self.bannerbear.as_ref().map(duplicate).ok_or_else(|| {
            DesignError::Auth(format!(
                "{BANNERBEAR_API_KEY} is not set; export it and try again"
            ))
        })
    }

    /// Key for the named LLM provider, if configured.
    pub fn llm_key(&self, provider: &str) -> Option<SecretString> {
        match provider {
            "gemini" => self.google.as_ref().map(duplicate),
            "openai" => self.openai.as_ref().map(duplicate),
            _ => None,
        }
    }

    pub fn image_host_key(&self) -> Option<SecretString> {
        self.freeimage.as_ref().map(duplicate)
    }
}

/// Name of the environment variable holding a provider's key.
pub fn llm_key_var(provider: &str) -> &'static str {
    match provider {
        "openai" => OPENAI_API_KEY,
        _ => GOOGLE_API_KEY,
    }
}

fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
