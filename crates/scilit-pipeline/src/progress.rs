use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// What the session is doing right now. Each phase has the short label the
/// front end shows next to its spinner; an empty label means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Searching,
    ExtractingHighlights,
    GeneratingCitations,
    Rendering,
    ExportingCitation,
    /// Aggregation of a page failed.
    PipelineFailed,
    /// The initial search failed.
    SearchFailed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "",
            Phase::Searching => "searching for documents ...",
            Phase::ExtractingHighlights => "extracting highlights ...",
            Phase::GeneratingCitations => "generating citations ...",
            Phase::Rendering => "rendering ...",
            Phase::ExportingCitation => "exporting citation",
            Phase::PipelineFailed => "Error: please refresh the page and try again.",
            Phase::SearchFailed => "Timeout: please refresh the page and try again.",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Phase::PipelineFailed | Phase::SearchFailed)
    }
}

/// Progress event emitted during a run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub phase: Phase,
    pub message: String,
}

/// Fans phase changes out to subscribers and remembers the latest one.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    events: broadcast::Sender<ProgressEvent>,
    current: Arc<watch::Sender<Phase>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (current, _) = watch::channel(Phase::Idle);
        Self { events, current: Arc::new(current) }
    }

    pub fn report(&self, run_id: Uuid, phase: Phase, message: impl Into<String>) {
        self.current.send_replace(phase);
        // No subscribers is fine.
        let _ = self.events.send(ProgressEvent { run_id, phase, message: message.into() });
    }

    /// Report `phase` with its own label as the message.
    pub fn enter(&self, run_id: Uuid, phase: Phase) {
        self.report(run_id, phase, phase.label());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *self.current.borrow()
    }

    /// Non-empty while something is running or after a failure.
    pub fn label(&self) -> &'static str {
        self.phase().label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Phase::Idle.label(), "");
        assert_eq!(Phase::Rendering.label(), "rendering ...");
        assert!(Phase::SearchFailed.is_failure());
        assert!(!Phase::ExportingCitation.is_failure());
    }

    #[tokio::test]
    async fn test_events_reach_subscribers_in_order() {
        let reporter = ProgressReporter::new();
        let mut rx = reporter.subscribe();
        let run_id = Uuid::new_v4();

        reporter.enter(run_id, Phase::Searching);
        reporter.report(run_id, Phase::Idle, "2 papers");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.phase, Phase::Searching);
        assert_eq!(first.message, "searching for documents ...");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.run_id, run_id);
        assert_eq!(second.message, "2 papers");
        assert_eq!(reporter.label(), "");
    }

    #[test]
    fn test_latest_phase_without_subscribers() {
        let reporter = ProgressReporter::new();
        reporter.enter(Uuid::new_v4(), Phase::PipelineFailed);
        assert_eq!(reporter.label(), "Error: please refresh the page and try again.");
        assert_eq!(reporter.clone().phase(), Phase::PipelineFailed);
    }
}
