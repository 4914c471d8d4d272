//! Display-ready view of one aggregated paper.

use serde::Serialize;

use scilit_common::models::{AuthorName, ContentInfo, PaperRecord, SectionRecord, TextField};
use scilit_config::DisplayConfig;

use crate::anchor::AnchorKey;
use crate::spans::{segment_highlights, segment_render_spans, Segment};

const MAX_LISTED_AUTHORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperView {
    pub paper_idx: usize,
    pub anchor: AnchorKey,
    pub title: String,
    /// `"<authors>. <venue>, <year>"`
    pub byline: String,
    /// `None` disables the PDF link.
    pub url: Option<String>,
    pub highlights: Vec<HighlightView>,
    pub citation: Vec<Segment>,
    pub fulltext: Option<FullTextView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightView {
    pub anchor: AnchorKey,
    pub segments: Vec<Segment>,
    /// Sentence to scroll to for "read in fulltext".
    pub fulltext_target: Option<AnchorKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullTextView {
    pub abstract_sections: Vec<SectionView>,
    pub fullbody_sections: Vec<SectionView>,
    pub references: Vec<ReferenceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub title: String,
    pub paragraphs: Vec<Vec<SentenceView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceView {
    pub anchor: AnchorKey,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceView {
    pub anchor: AnchorKey,
    pub text: String,
    /// Title used for the "look this paper up" action.
    pub title: String,
}

impl PaperView {
    pub fn build(paper_idx: usize, record: &PaperRecord, display: &DisplayConfig) -> Self {
        let info = &record.content_info;

        let highlights = record
            .highlights_info
            .iter()
            .enumerate()
            .map(|(idx, highlight)| {
                let text = truncate_words(&highlight.text, display.max_words_in_highlights);
                HighlightView {
                    anchor: AnchorKey::highlight(paper_idx, idx),
                    segments: segment_highlights(&text, &highlight.highlight_spans),
                    fulltext_target: highlight
                        .matched_sen_id_info
                        .as_ref()
                        .map(|loc| AnchorKey::from_location(paper_idx, loc)),
                }
            })
            .collect();

        let citation = segment_highlights(
            &record.generated_citation_info.text,
            &record.generated_citation_info.highlight_spans,
        );

        let fulltext = record.is_showing_fulltext.then(|| FullTextView {
            abstract_sections: sections(paper_idx, TextField::Abstract, info.content.sections(TextField::Abstract)),
            fullbody_sections: sections(paper_idx, TextField::Fullbody, info.content.sections(TextField::Fullbody)),
            references: info
                .references
                .iter()
                .enumerate()
                .map(|(idx, reference)| ReferenceView {
                    anchor: AnchorKey::reference_at(paper_idx, idx),
                    text: reference.reference_text.clone(),
                    title: reference.title.clone(),
                })
                .collect(),
        });

        Self {
            paper_idx,
            anchor: AnchorKey::paper_header(paper_idx),
            title: info.title.clone(),
            byline: byline(info),
            url: (!info.url.is_empty()).then(|| info.url.clone()),
            highlights,
            citation,
            fulltext,
        }
    }

    /// Every key this view renders, in document order.
    pub fn anchors(&self) -> Vec<&AnchorKey> {
        let mut keys = vec![&self.anchor];
        keys.extend(self.highlights.iter().map(|h| &h.anchor));
        if let Some(full) = &self.fulltext {
            for section in full.abstract_sections.iter().chain(&full.fullbody_sections) {
                keys.extend(section.paragraphs.iter().flatten().map(|s| &s.anchor));
            }
            keys.extend(full.references.iter().map(|r| &r.anchor));
        }
        keys
    }
}

fn sections(paper_idx: usize, field: TextField, records: &[SectionRecord]) -> Vec<SectionView> {
    records
        .iter()
        .map(|section| SectionView {
            title: section.section_title.clone(),
            paragraphs: section
                .section_text
                .iter()
                .map(|paragraph| {
                    paragraph
                        .paragraph_text
                        .iter()
                        .map(|sentence| SentenceView {
                            anchor: AnchorKey::sentence(
                                paper_idx,
                                field,
                                &section.section_id,
                                &paragraph.paragraph_id,
                                &sentence.sentence_id,
                            ),
                            segments: segment_render_spans(&sentence.sentence_text, &sentence.spans, paper_idx),
                        })
                        .collect()
                })
                .collect(),
        })
        .collect()
}

/// First three authors as `"J Devlin"`, comma separated, `", et al"` beyond.
pub fn author_line(authors: &[AuthorName]) -> String {
    let mut line = authors
        .iter()
        .take(MAX_LISTED_AUTHORS)
        .map(|a| {
            let initial: String = a.given_name.chars().take(1).collect();
            format!("{initial} {}", a.family_name)
        })
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > MAX_LISTED_AUTHORS {
        line.push_str(", et al");
    }
    line
}

pub fn byline(info: &ContentInfo) -> String {
    format!("{}. {}, {}", author_line(&info.authors), info.venue, info.year())
}

/// Keep the first `max_words` space-separated words, appending `...` when
/// anything was cut.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let mut kept = words[..max_words].to_vec();
    kept.push("...");
    kept.join(" ")
}
