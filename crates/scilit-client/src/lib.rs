//! Clients for the SciLit NLP backend.
//!
//! `NlpBackend` is the seam the pipeline talks to; `HttpNlpBackend` is the
//! production implementation over JSON-over-HTTP.

pub mod backend;
pub mod client;
pub mod http;

pub use backend::{CitationPaper, NlpBackend};
pub use client::BackendClient;
pub use http::{Endpoint, HttpNlpBackend};
