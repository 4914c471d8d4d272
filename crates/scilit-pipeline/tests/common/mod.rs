//! Scripted in-memory backend for session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use scilit_client::{CitationPaper, NlpBackend};
use scilit_common::error::NetworkError;
use scilit_common::models::{
    CitationExport, ContentInfo, HighlightSpan, HighlightedPaper, IdValue, MatchedRefSentence,
    PaperIdentifier, SentenceLocation, TextField, TitleMatch,
};
use scilit_config::Config;
use scilit_pipeline::Session;

pub fn id(n: i64) -> PaperIdentifier {
    PaperIdentifier {
        collection: "S2ORC".into(),
        id_field: "id_int".into(),
        id_type: "int".into(),
        id_value: IdValue::Int(n),
    }
}

pub fn title_of(id: &PaperIdentifier) -> String {
    format!("Paper {}", id.id_value)
}

fn content_for(id: &PaperIdentifier) -> ContentInfo {
    let n = id.id_value.to_string();
    serde_json::from_value(json!({
        "Title": title_of(id),
        "Author": [{"GivenName": "Ada", "FamilyName": "Lovelace"}],
        "Venue": "Journal",
        "PublicationDate": {"Year": 2020},
        "URL": format!("https://papers.example/{n}.pdf"),
        "Content": {
            "Abstract": format!("Abstract of {n}."),
            "Abstract_Parsed": [],
            "Fullbody_Parsed": [{
                "section_id": 0,
                "section_title": "Introduction",
                "section_text": [{"paragraph_id": 0, "paragraph_text": [
                    {"sentence_id": 0, "sentence_text": format!("First finding of {n}.")},
                    {"sentence_id": 1, "sentence_text": format!("Second finding of {n}.")},
                    {"sentence_id": 2, "sentence_text": "Filler."}
                ]}]
            }]
        },
        "Reference": [{"ReferenceText": "Someone 2019", "Title": "Cited Work"}]
    }))
    .expect("valid fixture")
}

/// Endpoint names used as call-counter keys and failure switches.
pub const SEARCH: &str = "doc-search";
pub const GET_PAPERS: &str = "get-papers";
pub const SUMMARIZE: &str = "extractive-summarize";
pub const GENERATE: &str = "generate-citation";
pub const PROCESS: &str = "process";
pub const TITLE_SEARCH: &str = "title-generic-search";
pub const EXPORT: &str = "citation-formatting-service";

/// Pause point for the next `fetch_content` call: `entered` fires when the
/// call starts, the call then waits for `release`.
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct MockBackend {
    ids: Mutex<Vec<PaperIdentifier>>,
    titles: Mutex<HashMap<String, PaperIdentifier>>,
    failing: Mutex<HashSet<&'static str>>,
    short: Mutex<HashSet<&'static str>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    hold: Mutex<Option<Hold>>,
}

impl MockBackend {
    pub fn with_results(n: i64) -> Arc<Self> {
        let backend = Self::default();
        backend.set_results((1..=n).map(id).collect());
        Arc::new(backend)
    }

    pub fn set_results(&self, ids: Vec<PaperIdentifier>) {
        *self.ids.lock().unwrap() = ids;
    }

    pub fn add_title(&self, title: &str, id: PaperIdentifier) {
        self.titles.lock().unwrap().insert(title.to_string(), id);
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().remove(endpoint);
    }

    /// Make batched replies from `endpoint` drop their last entry.
    pub fn shorten(&self, endpoint: &'static str) {
        self.short.lock().unwrap().insert(endpoint);
    }

    pub fn hold_next_fetch(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Hold { entered: entered.clone(), release: release.clone() });
        (entered, release)
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn truncate<T>(&self, endpoint: &'static str, mut items: Vec<T>) -> Vec<T> {
        if self.short.lock().unwrap().contains(endpoint) {
            items.pop();
        }
        items
    }

    fn hit(&self, endpoint: &'static str) -> Result<(), NetworkError> {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(NetworkError::Timeout { endpoint: endpoint.into(), timeout_ms: 5000 });
        }
        Ok(())
    }
}

#[async_trait]
impl NlpBackend for MockBackend {
    async fn search(&self, _: &str, _: &str, n_results: usize) -> Result<Vec<PaperIdentifier>, NetworkError> {
        self.hit(SEARCH)?;
        Ok(self.ids.lock().unwrap().iter().take(n_results).cloned().collect())
    }

    async fn fetch_content(&self, ids: &[PaperIdentifier]) -> Result<Vec<ContentInfo>, NetworkError> {
        let hold = self.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        self.hit(GET_PAPERS)?;
        Ok(self.truncate(GET_PAPERS, ids.iter().map(content_for).collect()))
    }

    async fn summarize(&self, sentences: &[String]) -> Result<Vec<String>, NetworkError> {
        self.hit(SUMMARIZE)?;
        Ok(sentences.iter().take(2).cloned().collect())
    }

    async fn generate_citations(
        &self,
        papers: &[CitationPaper],
        context: &str,
        _: &str,
    ) -> Result<Vec<String>, NetworkError> {
        self.hit(GENERATE)?;
        let generated = papers
            .iter()
            .map(|p| format!("  {} supports {}.  ", p.title, context))
            .collect();
        Ok(self.truncate(GENERATE, generated))
    }

    async fn compute_highlight_spans(&self, text: &str, _: &str) -> Result<Vec<HighlightSpan>, NetworkError> {
        self.hit(PROCESS)?;
        Ok(vec![HighlightSpan::new(0, text.chars().count().min(4))])
    }

    async fn highlight_full_paper(
        &self,
        content: &ContentInfo,
        ref_sentences: &[String],
    ) -> Result<HighlightedPaper, NetworkError> {
        self.hit(PROCESS)?;
        let matched = ref_sentences
            .iter()
            .enumerate()
            .map(|(i, text)| MatchedRefSentence {
                text: text.clone(),
                matched_sen_id_info: (i == 0).then(|| SentenceLocation {
                    field_name: TextField::Fullbody,
                    section_id: IdValue::Int(0),
                    paragraph_id: IdValue::Int(0),
                    sentence_id: IdValue::Int(0),
                }),
            })
            .collect();
        Ok(HighlightedPaper {
            highlighted_paper: content.clone(),
            ref_sentences_with_matched_sen_ids: self.truncate(PROCESS, matched),
        })
    }

    async fn title_search(&self, titles: &[String]) -> Result<Vec<TitleMatch>, NetworkError> {
        self.hit(TITLE_SEARCH)?;
        let known = self.titles.lock().unwrap();
        Ok(titles
            .iter()
            .map(|title| match known.get(title) {
                Some(id) => TitleMatch {
                    found: true,
                    collection: Some(id.collection.clone()),
                    id_field: Some(id.id_field.clone()),
                    id_type: Some(id.id_type.clone()),
                    id_value: Some(id.id_value.clone()),
                },
                None => TitleMatch::default(),
            })
            .collect())
    }

    async fn export_citation(&self, id: &PaperIdentifier) -> Result<CitationExport, NetworkError> {
        self.hit(EXPORT)?;
        Ok(CitationExport {
            bibtex: format!("@article{{p{}, title={{{}}}}}", id.id_value, title_of(id)),
            mla: format!("Lovelace, Ada. \"{}.\" Journal, 2020.", title_of(id)),
        })
    }
}

/// Session with page size 2 over `backend`.
pub fn session(backend: Arc<MockBackend>) -> Session {
    Session::new(backend, &Config::default())
}
