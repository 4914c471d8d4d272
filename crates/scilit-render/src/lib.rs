//! Text model for displaying aggregated papers: span segmentation,
//! composite anchor keys for jump-to navigation, and per-paper views.

pub mod anchor;
pub mod spans;
pub mod view;

pub use anchor::{AnchorKey, AnchorRegistry};
pub use spans::{join_segments, segment_highlights, segment_render_spans, slice_chars, Segment, SegmentKind};
pub use view::{author_line, byline, truncate_words, PaperView};
