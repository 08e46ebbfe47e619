//! Ordered, upsert-by-layer modification set.
//!
//! Templates have a handful of layers, so a linear scan beats a map here and
//! keeps insertion order for free.

use bannergenie_types::modification::{Modification, ModificationPayload};

/// Pending edits to a template, at most one per layer name.
///
/// New layers are appended; replacing a layer's payload keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationSet {
    entries: Vec<Modification>,
}

impl ModificationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a modification, or replace the payload of an existing one.
    ///
    /// Returns `true` when an existing entry for the layer was replaced.
    pub fn upsert(&mut self, layer_name: impl Into<String>, payload: ModificationPayload) -> bool {
        let layer_name = layer_name.into();
        match self.entries.iter_mut().find(|m| m.layer_name == layer_name) {
            Some(existing) => {
                existing.payload = payload;
                true
            }
            None => {
                self.entries.push(Modification::new(layer_name, payload));
                false
            }
        }
    }

    /// Owned snapshot in insertion order. Later changes to the set do not
    /// affect it.
    pub fn to_ordered_list(&self) -> Vec<Modification> {
        self.entries.clone()
    }

    pub fn get(&self, layer_name: &str) -> Option<&Modification> {
        self.entries.iter().find(|m| m.layer_name == layer_name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modification> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ModificationSet {
    type Item = &'a Modification;
    type IntoIter = std::slice::Iter<'a, Modification>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
