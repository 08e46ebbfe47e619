//! Bannerbear wire types.
//!
//! Only the fields the client reads are modeled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use bannergenie_types::modification::Modification;
use bannergenie_types::render::{JobHandle, JobStatusReport, RemoteStatus, RenderOutcome};
use bannergenie_types::template::{LayerDescriptor, Template, TemplateSummary};

/// Entry of `GET /templates`.
#[derive(Debug, Deserialize)]
pub struct TemplateListEntry {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl TemplateListEntry {
    /// `None` for entries without a uid. A missing name falls back to the uid.
    pub fn into_summary(self) -> Option<TemplateSummary> {
        let uid = self.uid.filter(|u| !u.trim().is_empty())?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| uid.clone());
        Some(TemplateSummary { uid, name })
    }
}

/// Body of `GET /templates/{uid}`.
#[derive(Debug, Deserialize)]
pub struct TemplateDetail {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub available_modifications: Vec<Value>,
}

impl TemplateDetail {
    /// Resolve every raw layer into a typed descriptor, skipping (with a
    /// warning) those that reveal no kind.
    pub fn into_template(self) -> Template {
        let mut layers = Vec::with_capacity(self.available_modifications.len());
        for raw in &self.available_modifications {
            match raw.as_object().and_then(LayerDescriptor::from_raw) {
                Some(descriptor) => layers.push(descriptor),
                None => tracing::warn!(
                    template = %self.uid,
                    layer = %raw_layer_name(raw),
                    "skipping layer with no recognizable kind"
                ),
            }
        }
        Template {
            name: self.name.unwrap_or_else(|| self.uid.clone()),
            uid: self.uid,
            layers,
        }
    }
}

fn raw_layer_name(raw: &Value) -> &str {
    raw.get("name").and_then(Value::as_str).unwrap_or("<unnamed>")
}

/// Body of `POST /images`.
#[derive(Debug, Serialize)]
pub struct CreateImageRequest<'a> {
    pub template: &'a str,
    pub modifications: &'a [Modification],
}

/// Image object returned by `POST /images` and `GET /images/{uid}`.
#[derive(Debug, Deserialize)]
pub struct ImageObject {
    pub uid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_url_png: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Anything else; searched for a failure message.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageObject {
    pub fn remote_status(&self) -> RemoteStatus {
        RemoteStatus::from(self.status.as_deref().unwrap_or(""))
    }

    /// PNG URL, falling back to the generic image URL.
    pub fn result_url(&self) -> Option<String> {
        self.image_url_png
            .clone()
            .or_else(|| self.image_url.clone())
            .filter(|u| !u.is_empty())
    }

    fn failure_reason(&self) -> String {
        ["error", "error_message", "message"]
            .iter()
            .find_map(|key| self.extra.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("image {} failed to render", self.uid))
    }

    /// Interpret a submission response.
    ///
    /// Anything that is neither failed nor completed-with-a-URL is pending
    /// under this object's uid.
    pub fn into_outcome(self) -> RenderOutcome {
        match self.remote_status() {
            RemoteStatus::Failed => RenderOutcome::Failed {
                reason: self.failure_reason(),
            },
            RemoteStatus::Completed => match self.result_url() {
                Some(image_url) => RenderOutcome::Completed { image_url },
                None => RenderOutcome::Pending {
                    job_handle: JobHandle(self.uid),
                },
            },
            RemoteStatus::Pending | RemoteStatus::Unrecognized(_) => RenderOutcome::Pending {
                job_handle: JobHandle(self.uid),
            },
        }
    }

    /// Interpret a status query. A completed image whose URL fields are not
    /// filled in yet is reported as pending.
    pub fn into_status_report(self) -> JobStatusReport {
        let image_url = self.result_url();
        let status = match self.remote_status() {
            RemoteStatus::Completed if image_url.is_none() => RemoteStatus::Pending,
            status => status,
        };
        let reason = matches!(status, RemoteStatus::Failed).then(|| self.failure_reason());
        JobStatusReport {
            image_url,
            status,
            reason,
        }
    }
}
