//! freeimage.host implementation of [`ImageHost`].
//!
//! Uploads are a urlencoded form `{key, source, format}` with the image as
//! standard base64. The host answers 200 with a JSON body whose own
//! `status_code` says whether the upload worked.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use bannergenie_core::upload::ImageHost;
use bannergenie_types::config::UploadConfig;
use bannergenie_types::error::DesignError;

pub struct FreeImageHost {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    image: Option<UploadedImage>,
    #[serde(default)]
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    #[serde(default)]
    message: Option<String>,
}

impl FreeImageHost {
    pub fn new(api_key: SecretString, config: &UploadConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("bannergenie/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key,
            endpoint: config.endpoint.clone(),
        }
    }
}

/// Pull the public URL out of a host response body.
pub(crate) fn interpret_upload_response(body: &str) -> Result<String, DesignError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|e| {
        DesignError::UploadFailed(format!("unreadable response from image host: {e}"))
    })?;

    if parsed.status_code == Some(200) {
        if let Some(url) = parsed.image.and_then(|i| i.url).filter(|u| !u.is_empty()) {
            return Ok(url);
        }
    }

    let message = parsed
        .error
        .and_then(|e| e.message)
        .unwrap_or_else(|| "unknown error from image host".to_string());
    Err(DesignError::UploadFailed(message))
}

impl ImageHost for FreeImageHost {
    #[tracing::instrument(name = "freeimage.upload", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: &[u8]) -> Result<String, DesignError> {
        if bytes.is_empty() {
            return Err(DesignError::UploadFailed("the file is empty".to_string()));
        }
        let source = STANDARD.encode(bytes);

        let response = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("key", self.api_key.expose_secret()),
                ("source", source.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| DesignError::UploadFailed(format!("could not reach image host: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "image host rejected upload");
            // The host still sends its JSON error body on most failures.
            return match interpret_upload_response(&body) {
                Err(err) => Err(err),
                Ok(_) => Err(DesignError::UploadFailed(format!("image host returned {status}"))),
            };
        }

        let url = interpret_upload_response(&body)?;
        tracing::info!(%url, "image uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_response_yields_url() {
        let body = r#"{"status_code":200,"success":{"message":"image uploaded"},"image":{"url":"https://iili.io/abc.png"}}"#;
        assert_eq!(interpret_upload_response(body).unwrap(), "https://iili.io/abc.png");
    }

    #[test]
    fn error_response_carries_host_message() {
        let body = r#"{"status_code":400,"error":{"message":"Invalid API v1 key.","code":100}}"#;
        let err = interpret_upload_response(body).unwrap_err();
        assert!(matches!(err, DesignError::UploadFailed(ref m) if m == "Invalid API v1 key."));
    }

    #[test]
    fn success_status_without_url_is_failure() {
        let err = interpret_upload_response(r#"{"status_code":200,"image":{}}"#).unwrap_err();
        assert!(matches!(err, DesignError::UploadFailed(ref m) if m.contains("unknown error")));
    }

    #[test]
    fn non_json_body_is_failure() {
        assert!(matches!(
            interpret_upload_response("<html>503</html>"),
            Err(DesignError::UploadFailed(_))
        ));
    }

    #[tokio::test]
    async fn empty_file_is_rejected_locally() {
        let host = FreeImageHost::new(
            SecretString::from("fi_key"),
            &UploadConfig {
                endpoint: "http://127.0.0.1:1/upload".to_string(),
            },
        );
        assert!(matches!(host.upload(&[]).await, Err(DesignError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_upload_failure() {
        let host = FreeImageHost::new(
            SecretString::from("fi_key"),
            &UploadConfig {
                endpoint: "http://127.0.0.1:1/upload".to_string(),
            },
        );
        let err = host.upload(b"\x89PNG").await.unwrap_err();
        assert!(matches!(err, DesignError::UploadFailed(ref m) if m.contains("could not reach")));
    }
}
