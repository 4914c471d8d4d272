//! Splitting text into styled segments.
//!
//! Offsets are character (Unicode scalar) offsets. Out-of-range offsets are
//! clamped to the text, and an inverted range yields an empty slice.

use serde::Serialize;
use tracing::debug;

use scilit_common::models::{HighlightSpan, RenderSpan, SpanAction};

use crate::anchor::AnchorKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    Plain,
    Highlighted,
    /// Cross-reference; activating it scrolls to `target`.
    CitationMarker { target: AnchorKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    #[serde(flatten)]
    pub kind: SegmentKind,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: SegmentKind::Plain }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: SegmentKind::Highlighted }
    }

    pub fn is_highlighted(&self) -> bool {
        matches!(self.kind, SegmentKind::Highlighted)
    }
}

/// Characters `[start, end)` of `text`.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let len = text.chars().count();
    let start = start.min(len);
    let end = end.min(len);
    if start >= end {
        return "";
    }
    let byte_at = |idx: usize| text.char_indices().nth(idx).map_or(text.len(), |(b, _)| b);
    &text[byte_at(start)..byte_at(end)]
}

/// Segments for keyword highlights. Spans are taken in the order given.
/// Gaps become plain segments (empty gaps are dropped) and the remainder
/// after the last span is always emitted, followed by one space.
pub fn segment_highlights(text: &str, spans: &[HighlightSpan]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut pos = 0;
    for span in spans {
        let gap = slice_chars(text, pos, span.start);
        if !gap.is_empty() {
            segments.push(Segment::plain(gap));
        }
        segments.push(Segment::highlighted(slice_chars(text, span.start, span.end)));
        pos = span.end;
    }
    let tail = slice_chars(text, pos, usize::MAX);
    segments.push(Segment::plain(format!("{tail} ")));
    segments
}

/// One segment per render span. `paper_idx` scopes citation-marker targets.
pub fn segment_render_spans(text: &str, spans: &[RenderSpan], paper_idx: usize) -> Vec<Segment> {
    if spans.is_empty() {
        return vec![Segment::plain(text)];
    }
    let mut expected = 0;
    spans
        .iter()
        .map(|span| {
            if span.start != expected {
                debug!(expected, start = span.start, "Render spans do not partition sentence");
            }
            expected = span.end;
            let piece = slice_chars(text, span.start, span.end);
            let kind = match &span.action {
                SpanAction::None => SegmentKind::Plain,
                SpanAction::Highlight => SegmentKind::Highlighted,
                SpanAction::CitationMarker { ref_id } => SegmentKind::CitationMarker {
                    target: AnchorKey::reference(paper_idx, ref_id),
                },
            };
            Segment { text: piece.to_string(), kind }
        })
        .collect()
}

/// Concatenated segment text.
pub fn join_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
