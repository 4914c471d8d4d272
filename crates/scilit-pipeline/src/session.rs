//! Search session: owns the active result list, the one-slot jump buffer,
//! the citation selection and the current query draft.
//!
//! Operations take `&self` and may run concurrently (a page load and a
//! citation refinement, say). Each one snapshots what it needs, runs its
//! backend calls without holding the state lock, then commits under the
//! lock. Every wholesale replacement of the result list bumps a generation
//! counter; a page load that finishes after its list was replaced is dropped.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scilit_client::NlpBackend;
use scilit_common::error::{Result, ScilitError};
use scilit_common::models::{PaperIdentifier, TitleMatch};
use scilit_config::{Config, DisplayConfig, PagingConfig};
use scilit_render::{AnchorKey, PaperView};

use crate::aggregate::aggregate_papers;
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::results::ResultSet;
use crate::selection::SelectionState;

/// Context and keywords as currently entered. Page loads, title jumps and
/// citation refinement read the draft, so edits after a search apply to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDraft {
    pub context: String,
    pub keywords: String,
}

impl QueryDraft {
    pub fn new(context: impl Into<String>, keywords: impl Into<String>) -> Self {
        Self { context: context.into(), keywords: keywords.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.keywords.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) results: ResultSet,
    pub(crate) generation: u64,
    /// Result list (with its offset) to return to after a title jump.
    pub(crate) buffer: Option<ResultSet>,
    pub(crate) selection: Option<SelectionState>,
    pub(crate) citation_draft: String,
    pub(crate) query: QueryDraft,
}

pub struct Session {
    pub(crate) backend: Arc<dyn NlpBackend>,
    pub(crate) paging: PagingConfig,
    pub(crate) display: DisplayConfig,
    pub(crate) progress: ProgressReporter,
    pub(crate) state: RwLock<SessionState>,
}

impl Session {
    pub fn new(backend: Arc<dyn NlpBackend>, config: &Config) -> Self {
        Self {
            backend,
            paging: config.paging.clone(),
            display: config.display.clone(),
            progress: ProgressReporter::new(),
            state: RwLock::new(SessionState::default()),
        }
    }

    // ── Read access ─────────────────────────────────────────────────────────

    pub fn page_size(&self) -> usize {
        self.paging.page_size
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Current phase label; empty when idle.
    pub fn progress_label(&self) -> &'static str {
        self.progress.label()
    }

    pub async fn results(&self) -> ResultSet {
        self.state.read().await.results.clone()
    }

    pub async fn page_offset(&self) -> usize {
        self.state.read().await.results.page_offset()
    }

    pub async fn page_count(&self) -> usize {
        self.state.read().await.results.page_count(self.paging.page_size)
    }

    pub async fn current_page(&self) -> usize {
        self.state.read().await.results.current_page(self.paging.page_size)
    }

    pub async fn has_buffer(&self) -> bool {
        self.state.read().await.buffer.is_some()
    }

    pub async fn query(&self) -> QueryDraft {
        self.state.read().await.query.clone()
    }

    /// Edit the query draft without searching.
    pub async fn set_query(&self, draft: QueryDraft) {
        self.state.write().await.query = draft;
    }

    /// Views of the loaded papers on the current page.
    pub async fn page_views(&self) -> Vec<PaperView> {
        let state = self.state.read().await;
        state
            .results
            .current_window(self.paging.page_size)
            .filter_map(|idx| {
                state
                    .results
                    .loaded(idx)
                    .map(|record| PaperView::build(idx, record, &self.display))
            })
            .collect()
    }

    pub async fn view(&self, index: usize) -> Option<PaperView> {
        let state = self.state.read().await;
        state
            .results
            .loaded(index)
            .map(|record| PaperView::build(index, record, &self.display))
    }

    // ── Search and paging ───────────────────────────────────────────────────

    /// New search. Clears the selection and citation draft. An empty query
    /// resets to an empty list without touching the backend; a failed search
    /// also resets to an empty list.
    #[instrument(skip(self, context, keywords))]
    pub async fn run_search(&self, context: &str, keywords: &str) -> Result<()> {
        let draft = QueryDraft::new(context, keywords);
        let ticket = {
            let mut state = self.state.write().await;
            state.selection = None;
            state.citation_draft.clear();
            state.query = draft.clone();
            state.generation += 1;
            if draft.is_empty() {
                debug!("Empty query, clearing results");
                state.results = ResultSet::empty();
                return Ok(());
            }
            state.generation
        };

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, keywords = %keywords, "Starting search");
        self.progress.enter(run_id, Phase::Searching);
        let outcome = self.search_first_page(&draft, run_id).await;

        let mut state = self.state.write().await;
        if state.generation != ticket {
            debug!(run_id = %run_id, "Search superseded; discarding its result");
            return outcome.map(|_| ());
        }
        match outcome {
            Ok(results) => {
                info!(run_id = %run_id, total = results.len(), "Search complete");
                state.results = results;
                Ok(())
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Search failed");
                self.progress.report(run_id, Phase::SearchFailed, e.to_string());
                state.results = ResultSet::empty();
                Err(e)
            }
        }
    }

    async fn search_first_page(&self, draft: &QueryDraft, run_id: Uuid) -> Result<ResultSet> {
        let ids = self
            .backend
            .search(&draft.context, &draft.keywords, self.paging.n_results)
            .await?;
        info!(run_id = %run_id, n = ids.len(), "Search returned identifiers");

        let window: Vec<PaperIdentifier> = ids.iter().take(self.paging.page_size).cloned().collect();
        if window.is_empty() {
            self.progress.report(run_id, Phase::Idle, "no results");
            return Ok(ResultSet::empty());
        }
        let loaded = aggregate_papers(
            self.backend.as_ref(),
            &window,
            &draft.context,
            &draft.keywords,
            run_id,
            &self.progress,
        )
        .await?;
        Ok(ResultSet::from_search(ids, 0, loaded))
    }

    /// Show the page starting at `offset`, aggregating any placeholders in
    /// it first. A failed load leaves the list as it was.
    #[instrument(skip(self))]
    pub async fn load_page(&self, offset: usize) -> Result<()> {
        let page_size = self.paging.page_size;
        let (ids, ticket, draft) = {
            let mut state = self.state.write().await;
            if offset > 0 && offset >= state.results.len() {
                return Err(ScilitError::InvalidIndex(offset));
            }
            if state.results.window_is_loaded(offset, page_size) {
                state.results.set_page_offset(offset);
                return Ok(());
            }
            (
                state.results.window_ids(offset, page_size),
                state.generation,
                state.query.clone(),
            )
        };

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, offset, n = ids.len(), "Loading page");
        let records = aggregate_papers(
            self.backend.as_ref(),
            &ids,
            &draft.context,
            &draft.keywords,
            run_id,
            &self.progress,
        )
        .await?;

        let mut state = self.state.write().await;
        if state.generation != ticket {
            warn!(run_id = %run_id, offset, "Result list replaced while the page was loading; dropping page");
            return Ok(());
        }
        state.results.splice(offset, records);
        state.results.set_page_offset(offset);
        Ok(())
    }

    /// Go to 1-based `page`. Going to the page already shown does nothing.
    pub async fn go_to_page(&self, page: usize) -> Result<()> {
        let offset = ResultSet::offset_for_page(page, self.paging.page_size);
        if offset == self.page_offset().await {
            return Ok(());
        }
        self.load_page(offset).await
    }

    // ── Title jumps ─────────────────────────────────────────────────────────

    /// Look a paper up by title and show it on its own, keeping the current
    /// list in the buffer. A second jump overwrites the buffer.
    #[instrument(skip(self))]
    pub async fn jump_to_paper_by_title(&self, title: &str) -> Result<()> {
        let run_id = Uuid::new_v4();
        self.progress.enter(run_id, Phase::Searching);

        let found = match self.backend.title_search(&[title.to_string()]).await {
            Ok(matches) => matches.into_iter().next().and_then(TitleMatch::into_identifier),
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Title lookup failed; treating as not found");
                None
            }
        };
        let Some(id) = found else {
            info!(run_id = %run_id, "Paper not found");
            self.progress.report(run_id, Phase::Idle, "Paper not found");
            return Err(ScilitError::NotFound(title.to_string()));
        };

        let draft = self.query().await;
        let records = aggregate_papers(
            self.backend.as_ref(),
            std::slice::from_ref(&id),
            &draft.context,
            &draft.keywords,
            run_id,
            &self.progress,
        )
        .await?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| ScilitError::PipelineAborted(format!("no content returned for {id}")))?;

        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut state.results, ResultSet::single(record));
        if state.buffer.replace(previous).is_some() {
            debug!("Jump buffer overwritten");
        }
        state.generation += 1;
        state.selection = None;
        state.citation_draft.clear();
        info!(run_id = %run_id, paper = %id, "Jumped to paper");
        Ok(())
    }

    /// Swap the buffered list back in. Returns `false` when nothing is
    /// buffered.
    pub async fn restore_from_buffer(&self) -> bool {
        let mut state = self.state.write().await;
        let Some(buffered) = state.buffer.take() else {
            return false;
        };
        state.results = buffered;
        state.generation += 1;

        let still_valid = state.selection.as_ref().is_some_and(|sel| {
            state
                .results
                .loaded(sel.paper_index)
                .is_some_and(|record| record.id_info == sel.paper_record.id_info)
        });
        if !still_valid {
            state.selection = None;
            state.citation_draft.clear();
        }
        true
    }

    // ── Full-text display ───────────────────────────────────────────────────

    /// Flip full-text display of a loaded paper; returns the new state.
    pub async fn toggle_fulltext(&self, index: usize) -> Result<bool> {
        let mut state = self.state.write().await;
        let record = state
            .results
            .loaded_mut(index)
            .ok_or(ScilitError::InvalidIndex(index))?;
        record.is_showing_fulltext = !record.is_showing_fulltext;
        Ok(record.is_showing_fulltext)
    }

    /// Open the paper's full text and return the sentence the highlight was
    /// matched to, or `None` when it has no matched location.
    pub async fn open_highlight_in_fulltext(
        &self,
        index: usize,
        highlight_idx: usize,
    ) -> Result<Option<AnchorKey>> {
        let mut state = self.state.write().await;
        let record = state
            .results
            .loaded_mut(index)
            .ok_or(ScilitError::InvalidIndex(index))?;
        let highlight = record
            .highlights_info
            .get(highlight_idx)
            .ok_or(ScilitError::InvalidIndex(highlight_idx))?;
        let Some(location) = &highlight.matched_sen_id_info else {
            return Ok(None);
        };
        let target = AnchorKey::from_location(index, location);
        record.is_showing_fulltext = true;
        Ok(Some(target))
    }

    /// Collapse every open full text on the current page. Returns the header
    /// of the first paper that was open.
    pub async fn fold_page(&self) -> Option<AnchorKey> {
        let mut state = self.state.write().await;
        let window = state.results.current_window(self.paging.page_size);
        let mut first_open = None;
        for idx in window {
            if let Some(record) = state.results.loaded_mut(idx) {
                if record.is_showing_fulltext {
                    record.is_showing_fulltext = false;
                    first_open.get_or_insert(AnchorKey::paper_header(idx));
                }
            }
        }
        first_open
    }
}
