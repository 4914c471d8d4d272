//! Data model shared by the client, renderer and pipeline.
//!
//! Field names follow the backend's paper schema (`Title`, `Content`,
//! `Abstract_Parsed`, …). Fields this crate does not interpret are kept in
//! `extra` so a record can be sent back to the backend unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::wire;

// ── Identifiers ─────────────────────────────────────────────────────────────

/// An id as stored by the backend: numeric in some collections, textual in
/// others. Two ids that print the same denote the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Int(n) => write!(f, "{n}"),
            IdValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for IdValue {
    fn from(n: i64) -> Self {
        IdValue::Int(n)
    }
}

impl From<&str> for IdValue {
    fn from(s: &str) -> Self {
        IdValue::Text(s.to_string())
    }
}

impl Default for IdValue {
    fn default() -> Self {
        IdValue::Int(0)
    }
}

/// Opaque reference to a paper in the backend's store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaperIdentifier {
    pub collection: String,
    pub id_field: String,
    pub id_type: String,
    pub id_value: IdValue,
}

impl fmt::Display for PaperIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.collection, self.id_value)
    }
}

// ── Spans ───────────────────────────────────────────────────────────────────

/// Half-open character range `[start, end)` marking a keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    #[serde(deserialize_with = "wire::offset")]
    pub start: usize,
    #[serde(deserialize_with = "wire::offset")]
    pub end: usize,
}

impl HighlightSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// What the renderer does with one slice of a full-text sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpanAction {
    None,
    Highlight,
    CitationMarker { ref_id: IdValue },
}

/// One piece of a sentence partition. The spans of a sentence cover
/// `[0, len)` contiguously: each span starts where the previous one ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRenderSpan", into = "RawRenderSpan")]
pub struct RenderSpan {
    pub start: usize,
    pub end: usize,
    pub action: SpanAction,
}

impl RenderSpan {
    pub fn new(start: usize, end: usize, action: SpanAction) -> Self {
        Self { start, end, action }
    }
}

#[derive(Serialize, Deserialize)]
struct RawRenderSpan {
    #[serde(deserialize_with = "wire::offset")]
    start: usize,
    #[serde(deserialize_with = "wire::offset")]
    end: usize,
    action: String,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    param: RawSpanParam,
}

#[derive(Default, Serialize, Deserialize)]
struct RawSpanParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ref_id: Option<IdValue>,
}

impl TryFrom<RawRenderSpan> for RenderSpan {
    type Error = String;

    fn try_from(raw: RawRenderSpan) -> Result<Self, Self::Error> {
        let action = match raw.action.as_str() {
            "none" => SpanAction::None,
            "highlight" => SpanAction::Highlight,
            "citation_marker" => match raw.param.ref_id {
                Some(ref_id) => SpanAction::CitationMarker { ref_id },
                None => return Err("citation_marker span without ref_id".to_string()),
            },
            other => return Err(format!("unknown span action {other:?}")),
        };
        Ok(RenderSpan { start: raw.start, end: raw.end, action })
    }
}

impl From<RenderSpan> for RawRenderSpan {
    fn from(span: RenderSpan) -> Self {
        let (action, ref_id) = match span.action {
            SpanAction::None => ("none", None),
            SpanAction::Highlight => ("highlight", None),
            SpanAction::CitationMarker { ref_id } => ("citation_marker", Some(ref_id)),
        };
        RawRenderSpan {
            start: span.start,
            end: span.end,
            action: action.to_string(),
            param: RawSpanParam { ref_id },
        }
    }
}

// ── Structured text ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceRecord {
    #[serde(default)]
    pub sentence_id: IdValue,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub sentence_text: String,
    /// Filled in by the full-text highlighter; empty on raw content.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "wire::null_as_default")]
    pub spans: Vec<RenderSpan>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    #[serde(default)]
    pub paragraph_id: IdValue,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub paragraph_text: Vec<SentenceRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    #[serde(default)]
    pub section_id: IdValue,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub section_title: String,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub section_text: Vec<ParagraphRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectionRecord {
    /// Sentences of this section in reading order.
    pub fn sentences(&self) -> impl Iterator<Item = &SentenceRecord> {
        self.section_text.iter().flat_map(|p| p.paragraph_text.iter())
    }
}

/// Which parsed text field of a paper a sentence lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    Abstract,
    Fullbody,
}

impl TextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Abstract => "abstract",
            TextField::Fullbody => "fullbody",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperContent {
    #[serde(rename = "Abstract", default, deserialize_with = "wire::lenient_string")]
    pub abstract_text: String,
    #[serde(rename = "Abstract_Parsed", default, deserialize_with = "wire::null_as_default")]
    pub abstract_parsed: Vec<SectionRecord>,
    #[serde(rename = "Fullbody", default, deserialize_with = "wire::lenient_string")]
    pub fullbody_text: String,
    #[serde(rename = "Fullbody_Parsed", default, deserialize_with = "wire::null_as_default")]
    pub fullbody_parsed: Vec<SectionRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaperContent {
    pub fn sections(&self, field: TextField) -> &[SectionRecord] {
        match field {
            TextField::Abstract => &self.abstract_parsed,
            TextField::Fullbody => &self.fullbody_parsed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorName {
    #[serde(rename = "GivenName", default, deserialize_with = "wire::lenient_string")]
    pub given_name: String,
    #[serde(rename = "FamilyName", default, deserialize_with = "wire::lenient_string")]
    pub family_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "ReferenceText", default, deserialize_with = "wire::lenient_string")]
    pub reference_text: String,
    #[serde(rename = "Title", default, deserialize_with = "wire::lenient_string")]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full paper record as returned by `get-papers`, and (after the full-text
/// highlighter has run) with span-annotated sentences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentInfo {
    #[serde(rename = "Title", default, deserialize_with = "wire::lenient_string")]
    pub title: String,
    #[serde(rename = "Author", default, deserialize_with = "wire::null_as_default")]
    pub authors: Vec<AuthorName>,
    #[serde(rename = "Venue", default, deserialize_with = "wire::lenient_string")]
    pub venue: String,
    #[serde(rename = "PublicationDate", default)]
    pub publication_date: Value,
    #[serde(rename = "URL", default, deserialize_with = "wire::lenient_string")]
    pub url: String,
    #[serde(rename = "Content", default, deserialize_with = "wire::null_as_default")]
    pub content: PaperContent,
    #[serde(rename = "Reference", default, deserialize_with = "wire::null_as_default")]
    pub references: Vec<ReferenceEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentInfo {
    /// Publication year as display text (`""` when unknown).
    pub fn year(&self) -> String {
        match self.publication_date.get("Year") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Abstract passed to citation generation: a top-level `Abstract` field
    /// when the record carries one, else the content abstract.
    pub fn abstract_for_generation(&self) -> String {
        match self.extra.get("Abstract") {
            Some(Value::String(s)) => s.clone(),
            _ => self.content.abstract_text.clone(),
        }
    }
}

// ── Aggregated paper state ──────────────────────────────────────────────────

/// Location of a sentence inside a paper's parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenceLocation {
    pub field_name: TextField,
    pub section_id: IdValue,
    pub paragraph_id: IdValue,
    pub sentence_id: IdValue,
}

/// One extracted highlight sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightInfo {
    pub text: String,
    pub highlight_spans: Vec<HighlightSpan>,
    /// `None` when the sentence could not be aligned to the full text.
    #[serde(default)]
    pub matched_sen_id_info: Option<SentenceLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCitationInfo {
    pub text: String,
    pub highlight_spans: Vec<HighlightSpan>,
}

/// A fully aggregated paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id_info: PaperIdentifier,
    pub is_showing_fulltext: bool,
    pub content_info: ContentInfo,
    pub highlights_info: Vec<HighlightInfo>,
    pub generated_citation_info: GeneratedCitationInfo,
}

// ── Endpoint payloads ───────────────────────────────────────────────────────

/// Payload of the `highlight_paper_given_ref_sentences` text-processing mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedPaper {
    pub highlighted_paper: ContentInfo,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub ref_sentences_with_matched_sen_ids: Vec<MatchedRefSentence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRefSentence {
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub text: String,
    #[serde(default)]
    pub matched_sen_id_info: Option<SentenceLocation>,
}

/// One result of `title-generic-search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleMatch {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub id_type: Option<String>,
    #[serde(default)]
    pub id_value: Option<IdValue>,
}

impl TitleMatch {
    /// Identifier of the matched paper; `None` unless the lookup found one.
    pub fn into_identifier(self) -> Option<PaperIdentifier> {
        if !self.found {
            return None;
        }
        Some(PaperIdentifier {
            collection: self.collection?,
            id_field: self.id_field.unwrap_or_else(|| "id_int".to_string()),
            id_type: self.id_type.unwrap_or_else(|| "int".to_string()),
            id_value: self.id_value?,
        })
    }
}

/// Formatted citation for one paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationExport {
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub bibtex: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub mla: String,
}
