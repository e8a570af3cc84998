//! Non-fatal diagnostic events.
//!
//! Nothing in the engine fails a query. Recovered problems are reported here
//! instead: every event is logged through `tracing` and, when the host has
//! subscribed, forwarded on an unbounded channel.

use serde::Serialize;
use tokio::sync::mpsc;

/// Which query facet a rejected value belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    DatePreset,
    SizeUnit,
    SizeMin,
    SizeMax,
    SortKey,
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DatePreset => "date preset",
            Self::SizeUnit => "size unit",
            Self::SizeMin => "minimum size",
            Self::SizeMax => "maximum size",
            Self::SortKey => "sort key",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A record field was present but unusable; the default was substituted.
    #[error("malformed record {id:?}: field {field} ({detail})")]
    MalformedRecord {
        id: String,
        field: &'static str,
        detail: String,
    },

    /// A query facet value outside the accepted set; the facet was ignored.
    #[error("invalid {facet} value {value:?}, ignoring facet")]
    InvalidFacetValue { facet: Facet, value: String },

    #[error("recent-search persistence failed during {operation} of {key:?}: {detail}")]
    PersistenceFailure {
        operation: &'static str,
        key: String,
        detail: String,
    },

    /// A search run finished after a newer submission superseded it.
    #[error("discarded search run {run}, latest is {latest}")]
    SchedulerOverrun { run: u64, latest: u64 },

    #[error("search run {run} failed: {detail}")]
    ExecutionFailed { run: u64, detail: String },
}

/// Cloneable handle that logs diagnostics and forwards them to a subscriber.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    tx: Option<mpsc::UnboundedSender<Diagnostic>>,
}

impl DiagnosticSink {
    /// A sink that only logs.
    pub fn log_only() -> Self {
        Self { tx: None }
    }

    /// A sink plus the receiving end of its event stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Diagnostic>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        tracing::warn!(diagnostic = %diagnostic, "docvault diagnostic");
        if let Some(tx) = &self.tx {
            // Receiver dropped means nobody is listening anymore.
            let _ = tx.send(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_events() {
        let (sink, mut rx) = DiagnosticSink::channel();
        sink.emit(Diagnostic::SchedulerOverrun { run: 1, latest: 2 });
        assert_eq!(
            rx.try_recv().unwrap(),
            Diagnostic::SchedulerOverrun { run: 1, latest: 2 }
        );
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let (sink, rx) = DiagnosticSink::channel();
        drop(rx);
        sink.emit(Diagnostic::ExecutionFailed {
            run: 3,
            detail: "boom".into(),
        });
        DiagnosticSink::log_only().emit(Diagnostic::SchedulerOverrun { run: 1, latest: 2 });
    }

    #[test]
    fn messages_name_the_facet() {
        let d = Diagnostic::InvalidFacetValue {
            facet: Facet::DatePreset,
            value: "Last decade".into(),
        };
        assert_eq!(
            d.to_string(),
            "invalid date preset value \"Last decade\", ignoring facet"
        );
    }
}
