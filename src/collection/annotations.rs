//! Per-image annotation side tables, keyed by [`ImageId`].

use std::collections::HashMap;

use super::tags::{AccidentTag, AccidentTags};
use super::ImageId;

/// Free-text annotation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    /// Free description (criminal-case sheets only).
    Description,
    /// Overrides the computed display date.
    CustomDate,
    /// Overrides the shared case address.
    CustomAddress,
}

/// Side store holding every per-image annotation.
///
/// Each kind lives in its own map. An id present in the owning collection
/// has an entry in every map (possibly the default value); `clear` drops
/// all of them at once.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    descriptions: HashMap<ImageId, String>,
    dates: HashMap<ImageId, String>,
    addresses: HashMap<ImageId, String>,
    accident_tags: HashMap<ImageId, AccidentTags>,
    rotations: HashMap<ImageId, u16>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate default entries for `id`, leaving existing values alone.
    pub fn ensure(&mut self, id: ImageId) {
        self.descriptions.entry(id).or_default();
        self.dates.entry(id).or_default();
        self.addresses.entry(id).or_default();
        self.accident_tags.entry(id).or_default();
        self.rotations.entry(id).or_insert(0);
    }

    /// Remove every annotation kind for `id`.
    pub fn clear(&mut self, id: ImageId) {
        self.descriptions.remove(&id);
        self.dates.remove(&id);
        self.addresses.remove(&id);
        self.accident_tags.remove(&id);
        self.rotations.remove(&id);
    }

    fn text_map(&self, field: TextField) -> &HashMap<ImageId, String> {
        match field {
            TextField::Description => &self.descriptions,
            TextField::CustomDate => &self.dates,
            TextField::CustomAddress => &self.addresses,
        }
    }

    fn text_map_mut(&mut self, field: TextField) -> &mut HashMap<ImageId, String> {
        match field {
            TextField::Description => &mut self.descriptions,
            TextField::CustomDate => &mut self.dates,
            TextField::CustomAddress => &mut self.addresses,
        }
    }

    /// Text value for `id`, empty when unset.
    pub fn text(&self, field: TextField, id: ImageId) -> &str {
        self.text_map(field).get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn set_text(&mut self, field: TextField, id: ImageId, value: impl Into<String>) {
        self.text_map_mut(field).insert(id, value.into());
    }

    pub fn description(&self, id: ImageId) -> &str {
        self.text(TextField::Description, id)
    }

    pub fn custom_date(&self, id: ImageId) -> &str {
        self.text(TextField::CustomDate, id)
    }

    pub fn custom_address(&self, id: ImageId) -> &str {
        self.text(TextField::CustomAddress, id)
    }

    /// Checklist selection for `id`, empty when unset.
    pub fn accident_tags(&self, id: ImageId) -> AccidentTags {
        self.accident_tags.get(&id).cloned().unwrap_or_default()
    }

    pub fn set_accident_tag(&mut self, id: ImageId, tag: AccidentTag, checked: bool) {
        self.accident_tags.entry(id).or_default().set(tag, checked);
    }

    pub fn set_other_text(&mut self, id: ImageId, text: impl Into<String>) {
        self.accident_tags.entry(id).or_default().other_text = text.into();
    }

    /// Cumulative rotation in degrees, in `[0, 360)`.
    pub fn rotation(&self, id: ImageId) -> u16 {
        self.rotations.get(&id).copied().unwrap_or(0)
    }

    /// Add `degrees` to the stored rotation and return the normalized result.
    pub fn add_rotation(&mut self, id: ImageId, degrees: i32) -> u16 {
        let current = self.rotation(id) as i32;
        let next = (current + degrees.rem_euclid(360)).rem_euclid(360) as u16;
        self.rotations.insert(id, next);
        next
    }

    /// Whether every annotation kind has an entry for `id`.
    pub fn is_populated(&self, id: ImageId) -> bool {
        self.descriptions.contains_key(&id)
            && self.dates.contains_key(&id)
            && self.addresses.contains_key(&id)
            && self.accident_tags.contains_key(&id)
            && self.rotations.contains_key(&id)
    }

    /// Whether any annotation kind still has an entry for `id`.
    pub fn has_any(&self, id: ImageId) -> bool {
        self.descriptions.contains_key(&id)
            || self.dates.contains_key(&id)
            || self.addresses.contains_key(&id)
            || self.accident_tags.contains_key(&id)
            || self.rotations.contains_key(&id)
    }

    /// Number of ids with a description entry; all maps are kept in step.
    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}
