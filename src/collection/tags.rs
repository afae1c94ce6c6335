//! Accident-scene checklist vocabulary and its one-line text encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Placeholder written in place of the free text of an unfilled `other` tag.
pub const OTHER_PLACEHOLDER: &str = "___________";

/// One entry of the fixed accident-description checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccidentTag {
    Scene,
    CarDamage,
    ScratchMark,
    MotorcycleFall,
    BrakeMark,
    ScrapeMark,
    DragMark,
    RoadFacility,
    PersonFall,
    InjuryPart,
    FallenSoil,
    Debris,
    Other,
}

impl AccidentTag {
    /// Vocabulary in display order.
    pub const ALL: [AccidentTag; 13] = [
        AccidentTag::Scene,
        AccidentTag::CarDamage,
        AccidentTag::ScratchMark,
        AccidentTag::MotorcycleFall,
        AccidentTag::BrakeMark,
        AccidentTag::ScrapeMark,
        AccidentTag::DragMark,
        AccidentTag::RoadFacility,
        AccidentTag::PersonFall,
        AccidentTag::InjuryPart,
        AccidentTag::FallenSoil,
        AccidentTag::Debris,
        AccidentTag::Other,
    ];

    /// Stable key, as used in manifests.
    pub fn id(&self) -> &'static str {
        match self {
            AccidentTag::Scene => "scene",
            AccidentTag::CarDamage => "carDamage",
            AccidentTag::ScratchMark => "scratchMark",
            AccidentTag::MotorcycleFall => "motorcycleFall",
            AccidentTag::BrakeMark => "brakeMark",
            AccidentTag::ScrapeMark => "scrapeMark",
            AccidentTag::DragMark => "dragMark",
            AccidentTag::RoadFacility => "roadFacility",
            AccidentTag::PersonFall => "personFall",
            AccidentTag::InjuryPart => "injuryPart",
            AccidentTag::FallenSoil => "fallenSoil",
            AccidentTag::Debris => "debris",
            AccidentTag::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccidentTag::Scene => "現場全景",
            AccidentTag::CarDamage => "車損",
            AccidentTag::ScratchMark => "車體擦痕",
            AccidentTag::MotorcycleFall => "機車倒地",
            AccidentTag::BrakeMark => "煞車痕",
            AccidentTag::ScrapeMark => "刮地痕",
            AccidentTag::DragMark => "拖痕",
            AccidentTag::RoadFacility => "道路設施",
            AccidentTag::PersonFall => "人倒地",
            AccidentTag::InjuryPart => "人受傷部位",
            AccidentTag::FallenSoil => "落土",
            AccidentTag::Debris => "碎片",
            AccidentTag::Other => "其他：",
        }
    }

    /// Whether this option carries a free-text companion field.
    pub fn has_free_text(&self) -> bool {
        matches!(self, AccidentTag::Other)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.id() == id)
    }
}

/// Checked/unchecked glyph pair. The two renderers draw different glyphs
/// for the same boolean state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckGlyphs {
    pub checked: char,
    pub unchecked: char,
}

impl CheckGlyphs {
    pub const DOCUMENT: CheckGlyphs = CheckGlyphs { checked: '▓', unchecked: '□' };
    pub const PRINT: CheckGlyphs = CheckGlyphs { checked: '■', unchecked: '□' };

    fn mark(&self, checked: bool) -> char {
        if checked {
            self.checked
        } else {
            self.unchecked
        }
    }
}

/// Checklist selection for one photograph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccidentTags {
    #[serde(default)]
    checked: BTreeSet<AccidentTag>,
    #[serde(default)]
    pub other_text: String,
}

impl AccidentTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_checked(&self, tag: AccidentTag) -> bool {
        self.checked.contains(&tag)
    }

    pub fn set(&mut self, tag: AccidentTag, checked: bool) {
        if checked {
            self.checked.insert(tag);
        } else {
            self.checked.remove(&tag);
        }
    }

    pub fn with(mut self, tag: AccidentTag) -> Self {
        self.set(tag, true);
        self
    }

    pub fn with_other_text(mut self, text: impl Into<String>) -> Self {
        self.other_text = text.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty() && self.other_text.is_empty()
    }

    /// Render the whole vocabulary as one description line.
    ///
    /// Every option appears in vocabulary order as `<glyph><label>`; the
    /// `other` option shows its free text only when checked and non-empty,
    /// otherwise a run of underscores. Fragments are joined by one space.
    pub fn encode(&self, glyphs: CheckGlyphs) -> String {
        AccidentTag::ALL
            .iter()
            .map(|&tag| {
                let checked = self.is_checked(tag);
                let mark = glyphs.mark(checked);
                if tag.has_free_text() {
                    let text = if checked && !self.other_text.is_empty() {
                        self.other_text.as_str()
                    } else {
                        OTHER_PLACEHOLDER
                    };
                    format!("{}其他:{}", mark, text)
                } else {
                    format!("{}{}", mark, tag.label())
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_order_and_ids() {
        assert_eq!(AccidentTag::ALL.len(), 13);
        assert_eq!(AccidentTag::ALL[0].id(), "scene");
        assert_eq!(AccidentTag::ALL[12].id(), "other");
        for tag in AccidentTag::ALL {
            assert_eq!(AccidentTag::from_id(tag.id()), Some(tag));
        }
        assert_eq!(AccidentTag::from_id("nope"), None);
    }

    #[test]
    fn test_encode_scene_and_other_text() {
        let tags = AccidentTags::new()
            .with(AccidentTag::Scene)
            .with(AccidentTag::Other)
            .with_other_text("闖紅燈");

        let line = tags.encode(CheckGlyphs::PRINT);
        let fragments: Vec<&str> = line.split(' ').collect();

        assert_eq!(fragments.len(), 13);
        assert_eq!(fragments[0], "■現場全景");
        assert_eq!(fragments[12], "■其他:闖紅燈");
        for (fragment, tag) in fragments[1..12].iter().zip(&AccidentTag::ALL[1..12]) {
            assert_eq!(*fragment, format!("□{}", tag.label()));
        }
    }

    #[test]
    fn test_encode_other_placeholder() {
        // Checked without text
        let tags = AccidentTags::new().with(AccidentTag::Other);
        assert!(tags
            .encode(CheckGlyphs::DOCUMENT)
            .ends_with(&format!("▓其他:{}", OTHER_PLACEHOLDER)));

        // Text present but unchecked
        let tags = AccidentTags::new().with_other_text("酒駕");
        let line = tags.encode(CheckGlyphs::DOCUMENT);
        assert!(line.ends_with(&format!("□其他:{}", OTHER_PLACEHOLDER)));
        assert!(!line.contains("酒駕"));
    }

    #[test]
    fn test_glyphs_differ_but_agree_on_state() {
        let tags = AccidentTags::new().with(AccidentTag::Debris);
        let doc = tags.encode(CheckGlyphs::DOCUMENT);
        let print = tags.encode(CheckGlyphs::PRINT);
        assert!(doc.contains("▓碎片"));
        assert!(print.contains("■碎片"));
        assert_eq!(doc.replace('▓', "■"), print);
    }

    #[test]
    fn test_tags_deserialize_camel_case() {
        let tags: AccidentTags =
            serde_json::from_str(r#"{"checked":["carDamage","other"],"other_text":"x"}"#).unwrap();
        assert!(tags.is_checked(AccidentTag::CarDamage));
        assert!(tags.is_checked(AccidentTag::Other));
        assert_eq!(tags.other_text, "x");
    }
}
