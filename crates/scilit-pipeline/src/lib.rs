//! Search orchestration for SciLit.
//!
//! `aggregate` turns paper identifiers into fully displayable records,
//! `session` owns the result list, paging, the one-slot jump buffer and the
//! citation selection.

pub mod aggregate;
pub mod progress;
pub mod results;
pub mod selection;
pub mod session;

pub use aggregate::{aggregate_papers, sentence_list, HIGHLIGHT_BULLET};
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use results::{PaperEntry, ResultSet};
pub use selection::SelectionState;
pub use session::{QueryDraft, Session};
