//! Template and layer types.
//!
//! The render service describes a template's editable layers as loose JSON
//! objects whose kind is only revealed by which payload key is present.
//! [`LayerDescriptor::from_raw`] resolves that once, at parse time, into an
//! explicit [`LayerKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of an editable template layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Text,
    Image,
    Color,
}

impl LayerKind {
    /// Infer the kind from a raw layer object.
    ///
    /// Key presence decides, not the value: the service reports unset
    /// payloads as `null`. When several keys are present the first match in
    /// the order `text`, `image_url`, `color` wins.
    pub fn infer(raw: &Map<String, Value>) -> Option<Self> {
        if raw.contains_key("text") {
            Some(LayerKind::Text)
        } else if raw.contains_key("image_url") {
            Some(LayerKind::Image)
        } else if raw.contains_key("color") {
            Some(LayerKind::Color)
        } else {
            None
        }
    }

    /// Name of the wire field carrying a payload of this kind.
    pub fn payload_field(&self) -> &'static str {
        match self {
            LayerKind::Text => "text",
            LayerKind::Image => "image_url",
            LayerKind::Color => "color",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Text => write!(f, "text"),
            LayerKind::Image => write!(f, "image"),
            LayerKind::Color => write!(f, "color"),
        }
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LayerKind::Text),
            "image" | "image_url" => Ok(LayerKind::Image),
            "color" | "colour" => Ok(LayerKind::Color),
            other => Err(format!("invalid layer kind: '{other}'")),
        }
    }
}

/// A named, independently editable region of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub kind: LayerKind,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Build a descriptor from a raw layer object.
    ///
    /// Returns `None` when the object has no string `name` or reveals no kind.
    pub fn from_raw(raw: &Map<String, Value>) -> Option<Self> {
        let name = raw.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }
        let kind = LayerKind::infer(raw)?;
        Some(Self::new(name, kind))
    }
}

/// Catalog entry for a template: just enough to list and pick one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub uid: String,
    pub name: String,
}

/// A remotely hosted banner layout with its editable layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub uid: String,
    pub name: String,
    pub layers: Vec<LayerDescriptor>,
}

impl Template {
    /// Look up a layer by exact name.
    pub fn layer(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Layer names in template order.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            uid: self.uid.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_infer_kind_from_null_valued_keys() {
        assert_eq!(
            LayerKind::infer(&raw(json!({"name": "title", "text": null}))),
            Some(LayerKind::Text)
        );
        assert_eq!(
            LayerKind::infer(&raw(json!({"name": "photo", "image_url": null}))),
            Some(LayerKind::Image)
        );
        assert_eq!(
            LayerKind::infer(&raw(json!({"name": "bg", "color": "#FFFFFF"}))),
            Some(LayerKind::Color)
        );
    }

    #[test]
    fn test_infer_kind_first_match_wins() {
        let both = raw(json!({"name": "x", "color": null, "image_url": null, "text": null}));
        assert_eq!(LayerKind::infer(&both), Some(LayerKind::Text));

        let image_and_color = raw(json!({"name": "x", "color": null, "image_url": null}));
        assert_eq!(LayerKind::infer(&image_and_color), Some(LayerKind::Image));
    }

    #[test]
    fn test_descriptor_from_raw_requires_name_and_kind() {
        assert!(LayerDescriptor::from_raw(&raw(json!({"text": "hi"}))).is_none());
        assert!(LayerDescriptor::from_raw(&raw(json!({"name": "shape"}))).is_none());
        assert!(LayerDescriptor::from_raw(&raw(json!({"name": "  ", "text": null}))).is_none());

        let desc = LayerDescriptor::from_raw(&raw(json!({"name": "title", "text": null}))).unwrap();
        assert_eq!(desc, LayerDescriptor::new("title", LayerKind::Text));
    }

    #[test]
    fn test_layer_kind_from_str_accepts_wire_names() {
        assert_eq!("image_url".parse::<LayerKind>().unwrap(), LayerKind::Image);
        assert_eq!(" Text ".parse::<LayerKind>().unwrap(), LayerKind::Text);
        assert_eq!("COLOR".parse::<LayerKind>().unwrap(), LayerKind::Color);
        assert!("font".parse::<LayerKind>().is_err());
    }

    #[test]
    fn test_template_layer_lookup() {
        let template = Template {
            uid: "tpl_1".to_string(),
            name: "Sale".to_string(),
            layers: vec![
                LayerDescriptor::new("title", LayerKind::Text),
                LayerDescriptor::new("photo", LayerKind::Image),
            ],
        };
        assert_eq!(template.layer("photo").unwrap().kind, LayerKind::Image);
        assert!(template.layer("Photo").is_none());
        assert_eq!(template.layer_names(), vec!["title", "photo"]);
    }
}
