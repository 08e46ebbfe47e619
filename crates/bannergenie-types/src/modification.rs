//! Per-layer modification types.
//!
//! A [`Modification`] overrides exactly one layer with a payload matching the
//! layer's kind. On the wire it is a flat object whose payload key depends on
//! the kind: `{"name": "title", "text": "Sale"}`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::template::LayerKind;

/// Value a user (or the parser) supplies for an image layer to say "I will
/// upload a file for this" instead of giving a URL.
pub const PENDING_UPLOAD: &str = "USER_UPLOAD_PENDING";

/// Override value for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationPayload {
    Text(String),
    ImageUrl(String),
    Color(String),
}

impl ModificationPayload {
    /// Wrap a raw value in the payload variant for `kind`.
    pub fn for_kind(kind: LayerKind, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            LayerKind::Text => ModificationPayload::Text(value),
            LayerKind::Image => ModificationPayload::ImageUrl(value),
            LayerKind::Color => ModificationPayload::Color(value),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            ModificationPayload::Text(_) => LayerKind::Text,
            ModificationPayload::ImageUrl(_) => LayerKind::Image,
            ModificationPayload::Color(_) => LayerKind::Color,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ModificationPayload::Text(v)
            | ModificationPayload::ImageUrl(v)
            | ModificationPayload::Color(v) => v,
        }
    }
}

/// A user-specified override for a single named layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub layer_name: String,
    pub payload: ModificationPayload,
}

impl Modification {
    pub fn new(layer_name: impl Into<String>, payload: ModificationPayload) -> Self {
        Self {
            layer_name: layer_name.into(),
            payload,
        }
    }

    pub fn text(layer_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(layer_name, ModificationPayload::Text(value.into()))
    }

    pub fn image_url(layer_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(layer_name, ModificationPayload::ImageUrl(value.into()))
    }

    pub fn color(layer_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(layer_name, ModificationPayload::Color(value.into()))
    }
}

impl Serialize for Modification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.layer_name)?;
        map.serialize_entry(self.payload.kind().payload_field(), self.payload.value())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modification_serializes_flat_with_kind_field() {
        let mods = vec![
            Modification::text("title", "Sale"),
            Modification::image_url("photo", "https://img/x.png"),
            Modification::color("bg", "#FF0000"),
        ];
        let value = serde_json::to_value(&mods).unwrap();
        assert_eq!(
            value,
            json!([
                {"name": "title", "text": "Sale"},
                {"name": "photo", "image_url": "https://img/x.png"},
                {"name": "bg", "color": "#FF0000"},
            ])
        );
    }

    #[test]
    fn test_payload_for_kind() {
        let payload = ModificationPayload::for_kind(LayerKind::Image, "https://a/b.png");
        assert_eq!(payload, ModificationPayload::ImageUrl("https://a/b.png".to_string()));
        assert_eq!(payload.kind(), LayerKind::Image);
        assert_eq!(payload.value(), "https://a/b.png");
    }
}
