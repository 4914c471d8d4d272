//! Terminal rendering of paper views.

use console::style;

use scilit_common::models::CitationExport;
use scilit_render::view::FullTextView;
use scilit_render::{join_segments, AnchorKey, AnchorRegistry, PaperView, Segment, SegmentKind};

/// Styled text of a segment run. Citation markers carry the id of the
/// reference they point at.
pub fn segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match &segment.kind {
            SegmentKind::Plain => segment.text.clone(),
            SegmentKind::Highlighted => style(&segment.text).yellow().bold().to_string(),
            SegmentKind::CitationMarker { target } => format!(
                "{}{}",
                style(&segment.text).cyan().underlined(),
                style(format!("→{}", reference_number(target))).dim()
            ),
        })
        .collect()
}

fn reference_number(target: &AnchorKey) -> String {
    match target {
        AnchorKey::Reference { reference_id, .. } => reference_id.clone(),
        other => other.to_string(),
    }
}

pub fn page_status(current: usize, pages: usize, total: usize) -> String {
    if total == 0 {
        return style("no results").dim().to_string();
    }
    style(format!("page {current}/{pages} ({total} results)")).dim().to_string()
}

pub fn print_paper(view: &PaperView) {
    println!();
    println!("{} {}", style(format!("[{}]", view.paper_idx + 1)).bold(), style(&view.title).bold());
    println!("    {}", style(&view.byline).dim());
    if let Some(url) = &view.url {
        println!("    {}", style(url).blue().underlined());
    }
    for (idx, highlight) in view.highlights.iter().enumerate() {
        let marker = if highlight.fulltext_target.is_some() { " ↗" } else { "" };
        println!("  {idx:>2} {}{}", segments(&highlight.segments), style(marker).green());
    }
    println!("  {} {}", style("cite:").magenta(), segments(&view.citation));
    if let Some(full) = &view.fulltext {
        print_fulltext(full);
    }
}

fn print_fulltext(full: &FullTextView) {
    for section in full.abstract_sections.iter().chain(&full.fullbody_sections) {
        if !section.title.is_empty() {
            println!("\n    {}", style(&section.title).underlined());
        }
        for paragraph in &section.paragraphs {
            let text: String = paragraph.iter().map(|s| segments(&s.segments)).collect();
            println!("    {}", text.trim_end());
        }
    }
    if !full.references.is_empty() {
        println!("\n    {}", style("References").underlined());
        for (idx, reference) in full.references.iter().enumerate() {
            println!("    [{idx}] {}", reference.text);
        }
    }
}

/// Plain text of every sentence and reference the view renders, keyed by
/// anchor.
pub fn anchor_lines(view: &PaperView) -> AnchorRegistry<String> {
    let mut registry = AnchorRegistry::new();
    if let Some(full) = &view.fulltext {
        for section in full.abstract_sections.iter().chain(&full.fullbody_sections) {
            for sentence in section.paragraphs.iter().flatten() {
                registry.register(sentence.anchor.clone(), join_segments(&sentence.segments));
            }
        }
        for reference in &full.references {
            registry.register(reference.anchor.clone(), reference.text.clone());
        }
    }
    registry
}

pub fn print_target(view: &PaperView, target: &AnchorKey) {
    match anchor_lines(view).resolve(target) {
        Some(line) => println!("{} {}", style(format!("{target} →")).green(), line.trim_end()),
        None => println!("{}", style(format!("{target} is not rendered")).dim()),
    }
}

pub fn print_export(export: &CitationExport) {
    println!("{}", style("BibTeX").bold());
    println!("{}", export.bibtex);
    println!("{}", style("MLA").bold());
    println!("{}", export.mla);
}
