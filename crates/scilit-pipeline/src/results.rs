//! The active result list and its paging arithmetic.

use scilit_common::models::{PaperIdentifier, PaperRecord};

/// One slot of a result list: either a fully aggregated paper or just its
/// identifier, waiting for its page to be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperEntry {
    Placeholder(PaperIdentifier),
    Loaded(Box<PaperRecord>),
}

impl PaperEntry {
    pub fn id(&self) -> &PaperIdentifier {
        match self {
            PaperEntry::Placeholder(id) => id,
            PaperEntry::Loaded(record) => &record.id_info,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PaperEntry::Loaded(_))
    }

    pub fn as_loaded(&self) -> Option<&PaperRecord> {
        match self {
            PaperEntry::Loaded(record) => Some(record.as_ref()),
            PaperEntry::Placeholder(_) => None,
        }
    }

    pub fn as_loaded_mut(&mut self) -> Option<&mut PaperRecord> {
        match self {
            PaperEntry::Loaded(record) => Some(record.as_mut()),
            PaperEntry::Placeholder(_) => None,
        }
    }
}

impl From<PaperRecord> for PaperEntry {
    fn from(record: PaperRecord) -> Self {
        PaperEntry::Loaded(Box::new(record))
    }
}

/// Ordered result list plus the offset of the page being shown. Only the
/// entries of the shown page are guaranteed to be loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<PaperEntry>,
    page_offset: usize,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Full ranked list where the first `loaded.len()` ids starting at
    /// `offset` are replaced by their aggregated records.
    pub fn from_search(ids: Vec<PaperIdentifier>, offset: usize, loaded: Vec<PaperRecord>) -> Self {
        let mut set = Self {
            entries: ids.into_iter().map(PaperEntry::Placeholder).collect(),
            page_offset: offset,
        };
        set.splice(offset, loaded);
        set
    }

    /// A one-paper list at offset 0.
    pub fn single(record: PaperRecord) -> Self {
        Self { entries: vec![record.into()], page_offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PaperEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PaperEntry> {
        self.entries.get(index)
    }

    pub fn loaded(&self, index: usize) -> Option<&PaperRecord> {
        self.entries.get(index).and_then(PaperEntry::as_loaded)
    }

    pub fn loaded_mut(&mut self, index: usize) -> Option<&mut PaperRecord> {
        self.entries.get_mut(index).and_then(PaperEntry::as_loaded_mut)
    }

    pub fn page_offset(&self) -> usize {
        self.page_offset
    }

    pub fn set_page_offset(&mut self, offset: usize) {
        self.page_offset = offset;
    }

    /// Index range `[offset, offset + page_size)` clamped to the list.
    pub fn window(&self, offset: usize, page_size: usize) -> std::ops::Range<usize> {
        let start = offset.min(self.entries.len());
        let end = offset.saturating_add(page_size).min(self.entries.len());
        start..end
    }

    pub fn current_window(&self, page_size: usize) -> std::ops::Range<usize> {
        self.window(self.page_offset, page_size)
    }

    pub fn window_is_loaded(&self, offset: usize, page_size: usize) -> bool {
        self.entries[self.window(offset, page_size)]
            .iter()
            .all(PaperEntry::is_loaded)
    }

    pub fn window_ids(&self, offset: usize, page_size: usize) -> Vec<PaperIdentifier> {
        self.entries[self.window(offset, page_size)]
            .iter()
            .map(|entry| entry.id().clone())
            .collect()
    }

    /// Put `records` at `offset, offset + 1, …`. Positions past the end of
    /// `records` (or of the list) are left as they are.
    pub fn splice(&mut self, offset: usize, records: Vec<PaperRecord>) {
        for (slot, record) in self.entries.iter_mut().skip(offset).zip(records) {
            *slot = record.into();
        }
    }

    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.entries.len().div_ceil(page_size)
    }

    /// 1-based page shown.
    pub fn current_page(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 1;
        }
        self.page_offset / page_size + 1
    }

    /// Offset of 1-based `page`; page 0 is treated as page 1.
    pub fn offset_for_page(page: usize, page_size: usize) -> usize {
        page.saturating_sub(1) * page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scilit_common::models::{ContentInfo, GeneratedCitationInfo, IdValue};

    fn id(n: i64) -> PaperIdentifier {
        PaperIdentifier {
            collection: "S2ORC".into(),
            id_field: "id_int".into(),
            id_type: "int".into(),
            id_value: IdValue::Int(n),
        }
    }

    fn record(n: i64) -> PaperRecord {
        PaperRecord {
            id_info: id(n),
            is_showing_fulltext: false,
            content_info: ContentInfo::default(),
            highlights_info: vec![],
            generated_citation_info: GeneratedCitationInfo::default(),
        }
    }

    #[test]
    fn test_from_search_loads_first_window_only() {
        let set = ResultSet::from_search((1..=5).map(id).collect(), 0, vec![record(1), record(2)]);
        let loaded: Vec<bool> = set.entries().iter().map(PaperEntry::is_loaded).collect();
        assert_eq!(loaded, vec![true, true, false, false, false]);
        assert!(set.window_is_loaded(0, 2));
        assert!(!set.window_is_loaded(2, 2));
        assert_eq!(set.window_ids(4, 2), vec![id(5)]);
    }

    #[test]
    fn test_short_splice_leaves_rest_untouched() {
        let mut set = ResultSet::from_search((1..=4).map(id).collect(), 0, vec![]);
        set.splice(2, vec![record(3)]);
        assert!(set.get(2).unwrap().is_loaded());
        assert!(!set.get(3).unwrap().is_loaded());

        // Records past the end of the list are dropped.
        set.splice(3, vec![record(4), record(99)]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.loaded(3).unwrap().id_info, id(4));
    }

    #[test]
    fn test_paging_arithmetic() {
        let set = ResultSet::from_search((1..=5).map(id).collect(), 0, vec![]);
        assert_eq!(set.page_count(2), 3);
        assert_eq!(set.current_page(2), 1);
        assert_eq!(ResultSet::offset_for_page(3, 2), 4);
        assert_eq!(ResultSet::offset_for_page(0, 2), 0);
        assert_eq!(ResultSet::empty().page_count(2), 0);
        assert_eq!(set.window(4, 2), 4..5);
        assert_eq!(set.window(9, 2), 5..5);
    }

    #[test]
    fn test_single_is_at_offset_zero() {
        let set = ResultSet::single(record(7));
        assert_eq!(set.page_offset(), 0);
        assert_eq!(set.loaded(0).unwrap().id_info, id(7));
        assert!(set.loaded(1).is_none());
    }
}
