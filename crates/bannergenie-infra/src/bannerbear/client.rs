//! BannerbearClient -- concrete [`RenderClient`] over the Bannerbear v2 REST API.
//!
//! The API key is a bearer token wrapped in [`SecretString`]; it is only
//! exposed when building the `Authorization` header.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use bannergenie_core::render::client::{JobStatusSource, RenderClient};
use bannergenie_types::config::BannerbearConfig;
use bannergenie_types::error::DesignError;
use bannergenie_types::modification::Modification;
use bannergenie_types::render::{JobHandle, JobStatusReport, RenderMode, RenderOutcome};
use bannergenie_types::template::{Template, TemplateSummary};

use super::types::{CreateImageRequest, ImageObject, TemplateDetail, TemplateListEntry};

/// HTTP client for the Bannerbear render service.
pub struct BannerbearClient {
    http: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl BannerbearClient {
    /// Build a client. A `None` key yields a client whose every call fails
    /// with [`DesignError::Auth`] without touching the network.
    pub fn new(api_key: Option<SecretString>, config: &BannerbearConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("bannergenie/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn key(&self) -> Result<&SecretString, DesignError> {
        self.api_key.as_ref().ok_or_else(|| {
            DesignError::Auth("BANNERBEAR_API_KEY is not set".to_string())
        })
    }

    /// `base_url` plus `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, DesignError> {
        let invalid =
            || DesignError::Connection(format!("invalid render service URL {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DesignError> {
        let key = self.key()?;
        let response = request
            .bearer_auth(key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "bannerbear request rejected");
            return Err(classify_status(status, body));
        }

        let body = response.text().await.map_err(|e| transport_error(&e))?;
        serde_json::from_str(&body).map_err(|e| {
            DesignError::MalformedResponse(format!("unexpected response body: {e}"))
        })
    }
}

/// Map a non-2xx status to the error taxonomy. 401/403 are credential
/// problems; everything else carries the body verbatim.
pub(crate) fn classify_status(status: StatusCode, body: String) -> DesignError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DesignError::Auth(if body.is_empty() {
            format!("the render service rejected the API key ({status})")
        } else {
            body
        }),
        _ => DesignError::Service {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn transport_error(err: &reqwest::Error) -> DesignError {
    if err.is_decode() {
        DesignError::MalformedResponse(err.to_string())
    } else {
        DesignError::Connection(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// RenderClient
// ---------------------------------------------------------------------------

impl JobStatusSource for BannerbearClient {
    #[tracing::instrument(
        name = "bannerbear.job_status",
        skip(self, handle),
        fields(job = %handle)
    )]
    async fn job_status(&self, handle: &JobHandle) -> Result<JobStatusReport, DesignError> {
        let image: ImageObject = self
            .send_json(self.http.get(self.url(&["images", handle.as_str()])?))
            .await?;
        let report = image.into_status_report();
        tracing::debug!(status = %report.status, "job status");
        Ok(report)
    }
}

impl RenderClient for BannerbearClient {
    #[tracing::instrument(name = "bannerbear.list_templates", skip(self))]
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DesignError> {
        let entries: Vec<TemplateListEntry> =
            self.send_json(self.http.get(self.url(&["templates"])?)).await?;
        let templates: Vec<_> = entries
            .into_iter()
            .filter_map(TemplateListEntry::into_summary)
            .collect();
        tracing::debug!(count = templates.len(), "listed templates");
        Ok(templates)
    }

    #[tracing::instrument(name = "bannerbear.template_details", skip(self))]
    async fn fetch_template_details(&self, uid: &str) -> Result<Template, DesignError> {
        let detail: TemplateDetail = self
            .send_json(self.http.get(self.url(&["templates", uid])?))
            .await?;
        Ok(detail.into_template())
    }

    #[tracing::instrument(
        name = "bannerbear.submit_render",
        skip(self, modifications),
        fields(modification_count = modifications.len())
    )]
    async fn submit_render(
        &self,
        template_uid: &str,
        modifications: &[Modification],
        mode: RenderMode,
    ) -> Result<RenderOutcome, DesignError> {
        let mut request = self.http.post(self.url(&["images"])?).json(&CreateImageRequest {
            template: template_uid,
            modifications,
        });
        if mode == RenderMode::Synchronous {
            request = request.query(&[("sync", "true")]);
        }
        let image: ImageObject = self.send_json(request).await?;
        tracing::info!(image = %image.uid, status = ?image.status, "render submitted");
        Ok(image.into_outcome())
    }

    /// Finished images live on a public CDN, so no credential is attached.
    async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, DesignError> {
        let response = self
            .http
            .get(image_url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DesignError::Service {
                status: status.as_u16(),
                message: body,
            });
        }
        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn config(base_url: &str) -> BannerbearConfig {
        BannerbearConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
            ..BannerbearConfig::default()
        }
    }

    fn keyed(base_url: &str) -> BannerbearClient {
        BannerbearClient::new(Some(SecretString::from("bb_test_key")), &config(base_url))
    }

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    /// Headers received and, if announced, the whole body.
    fn request_complete(raw: &[u8]) -> bool {
        let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&raw[..end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + body_len
    }

    #[test]
    fn unauthorized_and_forbidden_are_auth_errors() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key".to_string()),
            DesignError::Auth(ref m) if m == "bad key"
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            DesignError::Auth(_)
        ));
    }

    #[test]
    fn other_statuses_keep_body_verbatim() {
        let err = classify_status(StatusCode::NOT_FOUND, "{\"message\":\"Not found\"}".to_string());
        assert!(matches!(
            err,
            DesignError::Service { status: 404, ref message } if message == "{\"message\":\"Not found\"}"
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let client = BannerbearClient::new(None, &config("http://127.0.0.1:1"));
        let err = client.list_templates().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unreachable_service_is_connection_error() {
        let client = keyed("http://127.0.0.1:1");
        let err = client.fetch_template_details("tpl_1").await.unwrap_err();
        assert!(matches!(err, DesignError::Connection(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn list_templates_sends_bearer_token() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"uid":"tpl_1","name":"Summer Sale"},{"uid":"tpl_2","name":"Event"}]"#,
        )
        .await;

        let templates = keyed(&base).list_templates().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name, "Summer Sale");
        assert!(request.starts_with("GET /templates "));
        assert!(request.to_lowercase().contains("authorization: bearer bb_test_key"));
    }

    #[tokio::test]
    async fn template_uid_is_encoded_as_one_path_segment() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"uid":"tpl_1","name":"Sale","available_modifications":[]}"#,
        )
        .await;

        keyed(&base)
            .fetch_template_details("../images/img_1")
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(
            request.starts_with("GET /templates/..%2Fimages%2Fimg_1 "),
            "got {request}"
        );
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let client = keyed("https://api.bannerbear.com/v2/");
        let url = client.url(&["images", "img 1"]).unwrap();
        assert_eq!(url.as_str(), "https://api.bannerbear.com/v2/images/img%201");
    }

    #[tokio::test]
    async fn rejected_key_maps_to_auth() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"message":"Unauthorized"}"#).await;
        let err = keyed(&base).list_templates().await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, DesignError::Auth(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_service() {
        let (base, server) = serve_once("500 Internal Server Error", "boom").await;
        let err = keyed(&base).job_status(&JobHandle("img_1".to_string())).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, DesignError::Service { status: 500, ref message } if message == "boom"));
    }

    #[tokio::test]
    async fn synchronous_submit_adds_sync_query() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"uid":"img_9","status":"completed","image_url_png":"https://cdn/img_9.png"}"#,
        )
        .await;

        let outcome = keyed(&base)
            .submit_render("tpl_1", &[Modification::text("title", "Hi")], RenderMode::Synchronous)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /images?sync=true "));
        assert_eq!(
            outcome,
            RenderOutcome::Completed {
                image_url: "https://cdn/img_9.png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn garbage_body_is_malformed_response() {
        let (base, server) = serve_once("200 OK", "<html>").await;
        let err = keyed(&base).list_templates().await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, DesignError::MalformedResponse(_)));
    }
}
