//! Paper aggregation pipeline.
//!
//! Turns a slice of identifiers into display-ready records:
//!   1. Fetch content for all papers (one batched call)
//!   2. Extract top sentences per paper (concurrent, one call per paper)
//!   3. Keyword spans for every extracted sentence (concurrent, nested)
//!   4. Generate one citation sentence per paper (one batched call)
//!   5. Keyword spans for every generated citation (concurrent)
//!   6. Assemble the records
//!   7. Annotate each paper's full text and locate its highlights (concurrent)
//!
//! Stages run strictly in order; within a stage all sub-calls must succeed
//! and batched replies must have one entry per input. Any failure aborts the
//! run and no partial result is returned.

use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scilit_client::{CitationPaper, NlpBackend};
use scilit_common::error::{NetworkError, Result, ScilitError};
use scilit_common::models::{
    ContentInfo, GeneratedCitationInfo, HighlightInfo, HighlightSpan, PaperIdentifier, PaperRecord,
    TextField,
};

use crate::progress::{Phase, ProgressReporter};

/// Prefix of every extracted highlight sentence.
pub const HIGHLIGHT_BULLET: &str = "• ";

/// Sentences to summarize: the parsed full body when it has any sections,
/// else the parsed abstract, flattened section → paragraph → sentence.
pub fn sentence_list(info: &ContentInfo) -> Vec<String> {
    let field = if info.content.fullbody_parsed.is_empty() {
        TextField::Abstract
    } else {
        TextField::Fullbody
    };
    info.content
        .sections(field)
        .iter()
        .flat_map(|section| section.sentences())
        .map(|sentence| sentence.sentence_text.clone())
        .collect()
}

/// Runs the pipeline for `ids`. Failures are reported on `progress` and
/// surface as `ScilitError::PipelineAborted`.
#[instrument(skip(backend, ids, context, keywords, run_id, progress), fields(run_id = %run_id, n = ids.len()))]
pub async fn aggregate_papers(
    backend: &dyn NlpBackend,
    ids: &[PaperIdentifier],
    context: &str,
    keywords: &str,
    run_id: Uuid,
    progress: &ProgressReporter,
) -> Result<Vec<PaperRecord>> {
    let t0 = std::time::Instant::now();
    match run_stages(backend, ids, context, keywords, run_id, progress).await {
        Ok(records) => {
            info!(
                run_id = %run_id,
                papers = records.len(),
                duration_ms = t0.elapsed().as_millis() as u64,
                "Aggregation complete"
            );
            progress.report(run_id, Phase::Idle, format!("{} papers ready", records.len()));
            Ok(records)
        }
        Err(e) => {
            warn!(run_id = %run_id, error = %e, "Aggregation aborted");
            progress.report(run_id, Phase::PipelineFailed, e.to_string());
            Err(ScilitError::PipelineAborted(e.to_string()))
        }
    }
}

async fn run_stages(
    backend: &dyn NlpBackend,
    ids: &[PaperIdentifier],
    context: &str,
    keywords: &str,
    run_id: Uuid,
    progress: &ProgressReporter,
) -> std::result::Result<Vec<PaperRecord>, NetworkError> {
    // ── 1. Content ──────────────────────────────────────────────────────────
    let contents = backend.fetch_content(ids).await?;
    ensure_count("get-papers", ids.len(), contents.len())?;
    debug!(run_id = %run_id, n = contents.len(), "Fetched paper content");

    // ── 2. Extractive highlights ────────────────────────────────────────────
    progress.enter(run_id, Phase::ExtractingHighlights);
    let sentence_lists: Vec<Vec<String>> = contents.iter().map(sentence_list).collect();
    let extracted = backend.extract_highlights(&sentence_lists).await?;
    ensure_count("extractive-summarize", sentence_lists.len(), extracted.len())?;

    // ── 3. Spans for extracted sentences ────────────────────────────────────
    let bulleted: Vec<Vec<String>> = extracted
        .into_iter()
        .map(|sentences| {
            sentences
                .into_iter()
                .map(|s| format!("{HIGHLIGHT_BULLET}{s}"))
                .collect()
        })
        .collect();
    let highlight_spans: Vec<Vec<Vec<HighlightSpan>>> = try_join_all(bulleted.iter().map(|sentences| {
        try_join_all(
            sentences
                .iter()
                .map(|text| backend.compute_highlight_spans(text, keywords)),
        )
    }))
    .await?;
    let highlights: Vec<Vec<HighlightInfo>> = bulleted
        .into_iter()
        .zip(highlight_spans)
        .map(|(texts, spans)| {
            texts
                .into_iter()
                .zip(spans)
                .map(|(text, highlight_spans)| HighlightInfo {
                    text,
                    highlight_spans,
                    matched_sen_id_info: None,
                })
                .collect()
        })
        .collect();

    // ── 4. Citation generation ──────────────────────────────────────────────
    progress.enter(run_id, Phase::GeneratingCitations);
    let papers: Vec<CitationPaper> = contents.iter().map(CitationPaper::from).collect();
    let generated: Vec<String> = backend
        .generate_citations(&papers, context, keywords)
        .await?
        .into_iter()
        .map(|text| text.trim().to_string())
        .collect();
    ensure_count("generate-citation", papers.len(), generated.len())?;

    // ── 5. Spans for generated citations ────────────────────────────────────
    let citation_spans = try_join_all(
        generated
            .iter()
            .map(|text| backend.compute_highlight_spans(text, keywords)),
    )
    .await?;
    let citations: Vec<GeneratedCitationInfo> = generated
        .into_iter()
        .zip(citation_spans)
        .map(|(text, highlight_spans)| GeneratedCitationInfo { text, highlight_spans })
        .collect();

    // ── 6. Assemble ─────────────────────────────────────────────────────────
    let records: Vec<PaperRecord> = ids
        .iter()
        .cloned()
        .zip(contents)
        .zip(highlights)
        .zip(citations)
        .map(|(((id_info, content_info), highlights_info), generated_citation_info)| PaperRecord {
            id_info,
            is_showing_fulltext: false,
            content_info,
            highlights_info,
            generated_citation_info,
        })
        .collect();

    // ── 7. Full-text annotation ─────────────────────────────────────────────
    progress.enter(run_id, Phase::Rendering);
    try_join_all(records.into_iter().map(|record| annotate_full_text(backend, record))).await
}

/// Batched replies must answer every input; a short or long reply aborts
/// the run rather than misaligning papers.
fn ensure_count(endpoint: &str, expected: usize, got: usize) -> std::result::Result<(), NetworkError> {
    if expected == got {
        return Ok(());
    }
    Err(NetworkError::CountMismatch { endpoint: endpoint.to_string(), expected, got })
}

/// Replace the record's content with the span-annotated version and attach
/// each highlight's matched location.
async fn annotate_full_text(
    backend: &dyn NlpBackend,
    mut record: PaperRecord,
) -> std::result::Result<PaperRecord, NetworkError> {
    let ref_sentences: Vec<String> = record.highlights_info.iter().map(|h| h.text.clone()).collect();
    let highlighted = backend
        .highlight_full_paper(&record.content_info, &ref_sentences)
        .await?;

    ensure_count(
        "process",
        record.highlights_info.len(),
        highlighted.ref_sentences_with_matched_sen_ids.len(),
    )?;
    for (info, matched) in record
        .highlights_info
        .iter_mut()
        .zip(highlighted.ref_sentences_with_matched_sen_ids)
    {
        info.matched_sen_id_info = matched.matched_sen_id_info;
    }
    record.content_info = highlighted.highlighted_paper;
    Ok(record)
}
