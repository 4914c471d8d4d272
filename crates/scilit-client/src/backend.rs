//! The backend trait the aggregation pipeline is written against.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use scilit_common::error::NetworkError;
use scilit_common::models::{
    CitationExport, ContentInfo, HighlightSpan, HighlightedPaper, PaperIdentifier, TitleMatch,
};

/// What citation generation needs to know about one paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationPaper {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
}

impl From<&ContentInfo> for CitationPaper {
    fn from(info: &ContentInfo) -> Self {
        Self {
            title: info.title.clone(),
            abstract_text: info.abstract_for_generation(),
        }
    }
}

/// Typed access to the NLP/search backend. Every call either returns a
/// fully decoded payload or a `NetworkError`.
#[async_trait]
pub trait NlpBackend: Send + Sync {
    /// Ranked identifiers for a query. `keywords` is `;`-separated.
    async fn search(
        &self,
        context: &str,
        keywords: &str,
        n_results: usize,
    ) -> Result<Vec<PaperIdentifier>, NetworkError>;

    /// Full records for `ids`, in the same order.
    async fn fetch_content(&self, ids: &[PaperIdentifier]) -> Result<Vec<ContentInfo>, NetworkError>;

    /// Top sentences of one paper.
    async fn summarize(&self, sentences: &[String]) -> Result<Vec<String>, NetworkError>;

    /// One `summarize` per paper, run concurrently; fails if any call fails.
    async fn extract_highlights(
        &self,
        sentence_lists: &[Vec<String>],
    ) -> Result<Vec<Vec<String>>, NetworkError> {
        try_join_all(sentence_lists.iter().map(|sentences| self.summarize(sentences))).await
    }

    /// One citation sentence per paper, trimmed.
    async fn generate_citations(
        &self,
        papers: &[CitationPaper],
        context: &str,
        keywords: &str,
    ) -> Result<Vec<String>, NetworkError>;

    async fn compute_highlight_spans(
        &self,
        text: &str,
        keywords: &str,
    ) -> Result<Vec<HighlightSpan>, NetworkError>;

    /// Annotate a paper's parsed text with render spans and locate each
    /// reference sentence in it.
    async fn highlight_full_paper(
        &self,
        content: &ContentInfo,
        ref_sentences: &[String],
    ) -> Result<HighlightedPaper, NetworkError>;

    async fn title_search(&self, titles: &[String]) -> Result<Vec<TitleMatch>, NetworkError>;

    async fn export_citation(&self, id: &PaperIdentifier) -> Result<CitationExport, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoSummarizer {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl NlpBackend for EchoSummarizer {
        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<PaperIdentifier>, NetworkError> {
            Ok(vec![])
        }
        async fn fetch_content(&self, _: &[PaperIdentifier]) -> Result<Vec<ContentInfo>, NetworkError> {
            Ok(vec![])
        }
        async fn summarize(&self, sentences: &[String]) -> Result<Vec<String>, NetworkError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_on {
                return Err(NetworkError::Timeout { endpoint: "extractive-summarize".into(), timeout_ms: 1 });
            }
            Ok(sentences.iter().take(1).cloned().collect())
        }
        async fn generate_citations(&self, _: &[CitationPaper], _: &str, _: &str) -> Result<Vec<String>, NetworkError> {
            Ok(vec![])
        }
        async fn compute_highlight_spans(&self, _: &str, _: &str) -> Result<Vec<HighlightSpan>, NetworkError> {
            Ok(vec![])
        }
        async fn highlight_full_paper(&self, _: &ContentInfo, _: &[String]) -> Result<HighlightedPaper, NetworkError> {
            Err(NetworkError::MissingResponse { endpoint: "process".into() })
        }
        async fn title_search(&self, _: &[String]) -> Result<Vec<TitleMatch>, NetworkError> {
            Ok(vec![])
        }
        async fn export_citation(&self, _: &PaperIdentifier) -> Result<CitationExport, NetworkError> {
            Ok(CitationExport::default())
        }
    }

    #[tokio::test]
    async fn test_extract_highlights_keeps_paper_order() {
        let backend = EchoSummarizer { calls: AtomicUsize::new(0), fail_on: None };
        let lists = vec![
            vec!["a1".to_string(), "a2".to_string()],
            vec![],
            vec!["c1".to_string()],
        ];
        let out = backend.extract_highlights(&lists).await.unwrap();
        assert_eq!(out, vec![vec!["a1".to_string()], vec![], vec!["c1".to_string()]]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_extract_highlights_is_all_or_nothing() {
        let backend = EchoSummarizer { calls: AtomicUsize::new(0), fail_on: Some(1) };
        let lists = vec![vec!["a".to_string()], vec!["b".to_string()]];
        let err = backend.extract_highlights(&lists).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_citation_paper_serializes_backend_names() {
        let paper = CitationPaper { title: "T".into(), abstract_text: "A".into() };
        assert_eq!(serde_json::to_value(&paper).unwrap(), serde_json::json!({"Title": "T", "Abstract": "A"}));
    }
}
