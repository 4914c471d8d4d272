//! Composite anchor keys.
//!
//! Every renderable text unit gets a key; the code that renders a unit and
//! the code that jumps to it build the key through the same constructors,
//! so the two always agree. Ids are normalized to their display form, which
//! makes `3` and `"3"` the same location.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use scilit_common::models::{IdValue, SentenceLocation, TextField};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "field_name", rename_all = "snake_case")]
pub enum AnchorKey {
    /// The paper's card header.
    #[serde(rename = "paper")]
    PaperHeader { paper_idx: usize },
    /// An extracted highlight, by position in the paper's highlight list.
    #[serde(rename = "highlights")]
    Highlight { paper_idx: usize, highlight_idx: usize },
    /// A sentence of the abstract or full body.
    #[serde(rename = "sentence")]
    Sentence {
        paper_idx: usize,
        field: TextField,
        section_id: String,
        paragraph_id: String,
        sentence_id: String,
    },
    /// An entry of the reference list.
    #[serde(rename = "references")]
    Reference { paper_idx: usize, reference_id: String },
}

impl AnchorKey {
    pub fn paper_header(paper_idx: usize) -> Self {
        AnchorKey::PaperHeader { paper_idx }
    }

    pub fn highlight(paper_idx: usize, highlight_idx: usize) -> Self {
        AnchorKey::Highlight { paper_idx, highlight_idx }
    }

    pub fn sentence(
        paper_idx: usize,
        field: TextField,
        section_id: &IdValue,
        paragraph_id: &IdValue,
        sentence_id: &IdValue,
    ) -> Self {
        AnchorKey::Sentence {
            paper_idx,
            field,
            section_id: section_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            sentence_id: sentence_id.to_string(),
        }
    }

    /// Key of the sentence a highlight was matched to.
    pub fn from_location(paper_idx: usize, location: &SentenceLocation) -> Self {
        Self::sentence(
            paper_idx,
            location.field_name,
            &location.section_id,
            &location.paragraph_id,
            &location.sentence_id,
        )
    }

    /// Reference by the id a citation marker carries.
    pub fn reference(paper_idx: usize, ref_id: &IdValue) -> Self {
        AnchorKey::Reference { paper_idx, reference_id: ref_id.to_string() }
    }

    /// Reference by its position in the reference list.
    pub fn reference_at(paper_idx: usize, index: usize) -> Self {
        AnchorKey::Reference { paper_idx, reference_id: index.to_string() }
    }

    pub fn paper_idx(&self) -> usize {
        match self {
            AnchorKey::PaperHeader { paper_idx }
            | AnchorKey::Highlight { paper_idx, .. }
            | AnchorKey::Sentence { paper_idx, .. }
            | AnchorKey::Reference { paper_idx, .. } => *paper_idx,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            AnchorKey::PaperHeader { .. } => "paper",
            AnchorKey::Highlight { .. } => "highlights",
            AnchorKey::Sentence { field, .. } => field.as_str(),
            AnchorKey::Reference { .. } => "references",
        }
    }
}

/// Element id form, e.g. `paper-0/fullbody/s1/p0/3`. Field order is fixed.
impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorKey::PaperHeader { paper_idx } => write!(f, "paper-{paper_idx}"),
            AnchorKey::Highlight { paper_idx, highlight_idx } => {
                write!(f, "paper-{paper_idx}/highlights/{highlight_idx}")
            }
            AnchorKey::Sentence { paper_idx, field, section_id, paragraph_id, sentence_id } => write!(
                f,
                "paper-{paper_idx}/{}/s{section_id}/p{paragraph_id}/{sentence_id}",
                field.as_str()
            ),
            AnchorKey::Reference { paper_idx, reference_id } => {
                write!(f, "paper-{paper_idx}/references/{reference_id}")
            }
        }
    }
}

/// Maps anchor keys to whatever handle the front end scrolls to.
#[derive(Debug, Clone)]
pub struct AnchorRegistry<H> {
    handles: HashMap<AnchorKey, H>,
}

impl<H> Default for AnchorRegistry<H> {
    fn default() -> Self {
        Self { handles: HashMap::new() }
    }
}

impl<H> AnchorRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle previously registered under `key`, if any.
    pub fn register(&mut self, key: AnchorKey, handle: H) -> Option<H> {
        self.handles.insert(key, handle)
    }

    pub fn resolve(&self, key: &AnchorKey) -> Option<&H> {
        self.handles.get(key)
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
