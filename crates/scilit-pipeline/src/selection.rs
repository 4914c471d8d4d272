//! The paper picked for citation, its editable citation draft, refinement
//! and export.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scilit_client::CitationPaper;
use scilit_common::error::{NetworkError, Result, ScilitError};
use scilit_common::models::{CitationExport, GeneratedCitationInfo, PaperRecord};

use crate::progress::Phase;
use crate::session::{QueryDraft, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    /// Index in the result list the paper was selected from.
    pub paper_index: usize,
    pub paper_record: PaperRecord,
    pub generated_citation_info: GeneratedCitationInfo,
    pub citation_export: Option<CitationExport>,
}

impl SelectionState {
    fn new(paper_index: usize, record: PaperRecord) -> Self {
        Self {
            paper_index,
            generated_citation_info: record.generated_citation_info.clone(),
            paper_record: record,
            citation_export: None,
        }
    }
}

impl Session {
    /// Select the loaded paper at `index`, or clear the selection when it is
    /// already selected. Returns whether a paper is selected afterwards.
    /// Selecting seeds the citation draft with the paper's generated citation.
    pub async fn select_for_citation(&self, index: usize) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.selection.as_ref().is_some_and(|sel| sel.paper_index == index) {
            state.selection = None;
            state.citation_draft.clear();
            return Ok(false);
        }
        let record = state
            .results
            .loaded(index)
            .cloned()
            .ok_or(ScilitError::InvalidIndex(index))?;
        state.citation_draft = record.generated_citation_info.text.clone();
        state.selection = Some(SelectionState::new(index, record));
        Ok(true)
    }

    pub async fn clear_selection(&self) {
        let mut state = self.state.write().await;
        state.selection = None;
        state.citation_draft.clear();
    }

    pub async fn selection(&self) -> Option<SelectionState> {
        self.state.read().await.selection.clone()
    }

    pub async fn citation_draft(&self) -> String {
        self.state.read().await.citation_draft.clone()
    }

    /// Replace the draft with the user's own edit.
    pub async fn edit_citation_draft(&self, text: impl Into<String>) -> Result<()> {
        let mut state = self.state.write().await;
        if state.selection.is_none() {
            return Err(ScilitError::NoSelection);
        }
        state.citation_draft = text.into();
        Ok(())
    }

    /// Regenerate the selected paper's citation from the current query draft.
    /// The new citation replaces the draft and is written back to both the
    /// selection and the paper in the result list.
    #[instrument(skip(self))]
    pub async fn refine_citation(&self) -> Result<GeneratedCitationInfo> {
        let (index, record_id, paper, draft) = {
            let state = self.state.read().await;
            let sel = state.selection.as_ref().ok_or(ScilitError::NoSelection)?;
            (
                sel.paper_index,
                sel.paper_record.id_info.clone(),
                CitationPaper::from(&sel.paper_record.content_info),
                state.query.clone(),
            )
        };

        let run_id = Uuid::new_v4();
        self.progress.enter(run_id, Phase::GeneratingCitations);
        let info = match self.regenerate(&paper, &draft).await {
            Ok(info) => info,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Citation refinement failed");
                self.progress.report(run_id, Phase::PipelineFailed, e.to_string());
                return Err(e.into());
            }
        };

        let mut state = self.state.write().await;
        let still_selected = state
            .selection
            .as_ref()
            .is_some_and(|sel| sel.paper_index == index && sel.paper_record.id_info == record_id);
        if !still_selected {
            debug!(run_id = %run_id, "Selection changed during refinement; result dropped");
            self.progress.report(run_id, Phase::Idle, "selection changed");
            return Ok(info);
        }
        if let Some(sel) = state.selection.as_mut() {
            sel.generated_citation_info = info.clone();
            sel.paper_record.generated_citation_info = info.clone();
        }
        if let Some(record) = state
            .results
            .loaded_mut(index)
            .filter(|record| record.id_info == record_id)
        {
            record.generated_citation_info = info.clone();
        }
        state.citation_draft = info.text.clone();
        info!(run_id = %run_id, paper = %record_id, "Citation refined");
        self.progress.report(run_id, Phase::Idle, "citation refined");
        Ok(info)
    }

    async fn regenerate(
        &self,
        paper: &CitationPaper,
        draft: &QueryDraft,
    ) -> std::result::Result<GeneratedCitationInfo, NetworkError> {
        let text = self
            .backend
            .generate_citations(std::slice::from_ref(paper), &draft.context, &draft.keywords)
            .await?
            .into_iter()
            .next()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| NetworkError::MissingResponse { endpoint: "generate-citation".into() })?;
        let highlight_spans = self.backend.compute_highlight_spans(&text, &draft.keywords).await?;
        Ok(GeneratedCitationInfo { text, highlight_spans })
    }

    /// Fetch BibTeX and MLA for the selected paper. A failed export yields
    /// empty strings rather than an error; the result is kept on the
    /// selection.
    #[instrument(skip(self))]
    pub async fn export_selected(&self) -> Result<CitationExport> {
        let (index, id) = {
            let state = self.state.read().await;
            let sel = state.selection.as_ref().ok_or(ScilitError::NoSelection)?;
            (sel.paper_index, sel.paper_record.id_info.clone())
        };

        let run_id = Uuid::new_v4();
        self.progress.enter(run_id, Phase::ExportingCitation);
        let export = match self.backend.export_citation(&id).await {
            Ok(export) => export,
            Err(e) => {
                warn!(run_id = %run_id, paper = %id, error = %e, "Citation export failed; using empty formats");
                CitationExport::default()
            }
        };

        let mut state = self.state.write().await;
        if let Some(sel) = state
            .selection
            .as_mut()
            .filter(|sel| sel.paper_index == index && sel.paper_record.id_info == id)
        {
            sel.citation_export = Some(export.clone());
        }
        self.progress.report(run_id, Phase::Idle, "citation exported");
        Ok(export)
    }
}
