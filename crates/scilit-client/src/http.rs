//! JSON-over-HTTP implementation of [`NlpBackend`].
//!
//! Every endpoint is a POST to `{base}{prefix}/{name}/v1.0` answering with a
//! `{"response": …}` envelope. Each call runs under its own deadline; when
//! the deadline passes the request future is dropped, which aborts the
//! in-flight request.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use scilit_common::error::NetworkError;
use scilit_common::models::{
    CitationExport, ContentInfo, HighlightSpan, HighlightedPaper, PaperIdentifier, TitleMatch,
};
use scilit_config::{BackendConfig, Config, TimeoutConfig};

use crate::backend::{CitationPaper, NlpBackend};
use crate::client::BackendClient;

const RERANKING_METHOD: &str = "scibert";
const PREFETCH_PER_COLLECTION: usize = 100;

const MODE_HIGHLIGHT_TEXT: &str = "highlight_text_given_keywords";
const MODE_HIGHLIGHT_PAPER: &str = "highlight_paper_given_ref_sentences";

// ── Endpoints ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DocSearch,
    GetPapers,
    ExtractiveSummarize,
    GenerateCitation,
    Process,
    TitleSearch,
    CitationExport,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::DocSearch => "doc-search",
            Endpoint::GetPapers => "get-papers",
            Endpoint::ExtractiveSummarize => "extractive-summarize",
            Endpoint::GenerateCitation => "generate-citation",
            Endpoint::Process => "process",
            Endpoint::TitleSearch => "title-generic-search",
            Endpoint::CitationExport => "citation-formatting-service",
        }
    }

    pub fn timeout_ms(&self, timeouts: &TimeoutConfig) -> u64 {
        match self {
            Endpoint::DocSearch => timeouts.search_ms,
            Endpoint::GetPapers => timeouts.get_papers_ms,
            Endpoint::ExtractiveSummarize => timeouts.summarize_ms,
            Endpoint::GenerateCitation => timeouts.generate_ms,
            Endpoint::Process => timeouts.process_ms,
            Endpoint::TitleSearch => timeouts.title_search_ms,
            Endpoint::CitationExport => timeouts.export_ms,
        }
    }
}

/// Keyword lists are `;`-separated in the UI; the ranking services expect
/// the two characters `\t` between keywords instead.
pub fn escape_keywords(keywords: &str) -> String {
    keywords.replace(';', "\\t")
}

// ── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DocSearchRequest<'a> {
    ranking_variable: &'a str,
    keywords: String,
    paper_list: &'static str,
    #[serde(rename = "prefetch_nResults_per_collection")]
    prefetch_n_results_per_collection: usize,
    #[serde(rename = "nResults")]
    n_results: usize,
    requires_removing_duplicates: bool,
    requires_additional_prefetching: bool,
    requires_reranking: bool,
    reranking_method: &'static str,
}

#[derive(Debug, Serialize)]
struct GetPapersRequest<'a> {
    paper_list: &'a [PaperIdentifier],
    projection: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    sentence_list: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateCitationRequest<'a> {
    context_list: Vec<&'a str>,
    keywords_list: Vec<String>,
    papers: &'a [CitationPaper],
}

#[derive(Debug, Serialize)]
struct ProcessRequest<D> {
    data: D,
    mode: &'static str,
}

#[derive(Debug, Serialize)]
struct HighlightTextData<'a> {
    text: &'a str,
    keywords: &'a str,
}

#[derive(Debug, Serialize)]
struct HighlightPaperData<'a> {
    paper: &'a ContentInfo,
    ref_sentences: &'a [String],
}

#[derive(Debug, Serialize)]
struct TitleSearchRequest<'a> {
    titles: &'a [String],
    projection: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct CitationExportRequest<'a> {
    paper_list: &'a [PaperIdentifier],
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Option<Value>,
}

fn decode_envelope<T: DeserializeOwned>(endpoint: Endpoint, body: &[u8]) -> Result<T, NetworkError> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(|source| NetworkError::Decode {
        endpoint: endpoint.name().to_string(),
        source,
    })?;
    match envelope.response {
        None | Some(Value::Null) => Err(NetworkError::MissingResponse {
            endpoint: endpoint.name().to_string(),
        }),
        Some(payload) => serde_json::from_value(payload).map_err(|source| NetworkError::Decode {
            endpoint: endpoint.name().to_string(),
            source,
        }),
    }
}

// ── Backend ─────────────────────────────────────────────────────────────────

pub struct HttpNlpBackend {
    client: BackendClient,
    backend: BackendConfig,
    timeouts: TimeoutConfig,
}

impl HttpNlpBackend {
    pub fn new(config: &Config) -> Result<Self, NetworkError> {
        let client = BackendClient::new(&config.backend)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: BackendClient, config: &Config) -> Self {
        Self {
            client,
            backend: config.backend.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        self.backend.endpoint_url(endpoint.name())
    }

    /// POST `body`, enforce the endpoint deadline and unwrap the envelope.
    async fn call<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, NetworkError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint);
        let timeout_ms = endpoint.timeout_ms(&self.timeouts);
        let request = self.client.post(&url)?.json(body);

        let exchange = async {
            let resp = request.send().await.map_err(|source| NetworkError::Transport {
                endpoint: endpoint.name().to_string(),
                source,
            })?;
            let status = resp.status();
            if !status.is_success() {
                return Err(NetworkError::Status {
                    endpoint: endpoint.name().to_string(),
                    status: status.as_u16(),
                });
            }
            resp.bytes().await.map_err(|source| NetworkError::Transport {
                endpoint: endpoint.name().to_string(),
                source,
            })
        };

        let body = match tokio::time::timeout(TimeoutConfig::duration(timeout_ms), exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(endpoint = endpoint.name(), timeout_ms, "Backend call timed out");
                return Err(NetworkError::Timeout {
                    endpoint: endpoint.name().to_string(),
                    timeout_ms,
                });
            }
        };
        debug!(endpoint = endpoint.name(), bytes = body.len(), "Backend call complete");
        decode_envelope(endpoint, &body)
    }
}

#[async_trait]
impl NlpBackend for HttpNlpBackend {
    #[instrument(skip(self, context))]
    async fn search(
        &self,
        context: &str,
        keywords: &str,
        n_results: usize,
    ) -> Result<Vec<PaperIdentifier>, NetworkError> {
        let body = DocSearchRequest {
            ranking_variable: context,
            keywords: escape_keywords(keywords),
            paper_list: "",
            prefetch_n_results_per_collection: PREFETCH_PER_COLLECTION,
            n_results,
            requires_removing_duplicates: true,
            requires_additional_prefetching: false,
            requires_reranking: true,
            reranking_method: RERANKING_METHOD,
        };
        let ids: Vec<PaperIdentifier> = self.call(Endpoint::DocSearch, &body).await?;
        debug!(n = ids.len(), "doc-search results");
        Ok(ids)
    }

    #[instrument(skip(self, ids), fields(n = ids.len()))]
    async fn fetch_content(&self, ids: &[PaperIdentifier]) -> Result<Vec<ContentInfo>, NetworkError> {
        let body = GetPapersRequest { paper_list: ids, projection: None };
        self.call(Endpoint::GetPapers, &body).await
    }

    #[instrument(skip(self, sentences), fields(n = sentences.len()))]
    async fn summarize(&self, sentences: &[String]) -> Result<Vec<String>, NetworkError> {
        let body = SummarizeRequest { sentence_list: sentences };
        let payload: SummaryPayload = self.call(Endpoint::ExtractiveSummarize, &body).await?;
        Ok(payload.summary)
    }

    #[instrument(skip(self, papers, context), fields(n = papers.len()))]
    async fn generate_citations(
        &self,
        papers: &[CitationPaper],
        context: &str,
        keywords: &str,
    ) -> Result<Vec<String>, NetworkError> {
        let escaped = escape_keywords(keywords);
        let body = GenerateCitationRequest {
            context_list: vec![context; papers.len()],
            keywords_list: vec![escaped; papers.len()],
            papers,
        };
        let generated: Vec<String> = self.call(Endpoint::GenerateCitation, &body).await?;
        Ok(generated.into_iter().map(|text| text.trim().to_string()).collect())
    }

    #[instrument(skip(self, text))]
    async fn compute_highlight_spans(
        &self,
        text: &str,
        keywords: &str,
    ) -> Result<Vec<HighlightSpan>, NetworkError> {
        let body = ProcessRequest {
            data: HighlightTextData { text, keywords },
            mode: MODE_HIGHLIGHT_TEXT,
        };
        self.call(Endpoint::Process, &body).await
    }

    #[instrument(skip(self, content, ref_sentences), fields(title = %content.title, n = ref_sentences.len()))]
    async fn highlight_full_paper(
        &self,
        content: &ContentInfo,
        ref_sentences: &[String],
    ) -> Result<HighlightedPaper, NetworkError> {
        let body = ProcessRequest {
            data: HighlightPaperData { paper: content, ref_sentences },
            mode: MODE_HIGHLIGHT_PAPER,
        };
        self.call(Endpoint::Process, &body).await
    }

    #[instrument(skip(self))]
    async fn title_search(&self, titles: &[String]) -> Result<Vec<TitleMatch>, NetworkError> {
        let body = TitleSearchRequest { titles, projection: Map::new() };
        self.call(Endpoint::TitleSearch, &body).await
    }

    #[instrument(skip(self), fields(paper = %id))]
    async fn export_citation(&self, id: &PaperIdentifier) -> Result<CitationExport, NetworkError> {
        let body = CitationExportRequest { paper_list: std::slice::from_ref(id) };
        let mut entries: Vec<CitationExport> = self.call(Endpoint::CitationExport, &body).await?;
        if entries.is_empty() {
            return Err(NetworkError::MissingResponse {
                endpoint: Endpoint::CitationExport.name().to_string(),
            });
        }
        Ok(entries.swap_remove(0))
    }
}
