//! scilit-common: shared types and errors used across all SciLit crates.

pub mod error;
pub mod models;
pub mod wire;

// Re-export commonly used types
pub use error::{NetworkError, Result, ScilitError};
pub use models::{
    CitationExport, ContentInfo, GeneratedCitationInfo, HighlightInfo, HighlightSpan,
    HighlightedPaper, IdValue, PaperIdentifier, PaperRecord, RenderSpan, SentenceLocation,
    SpanAction, TextField, TitleMatch,
};
