//! Event sinks and error reporters.
//!
//! The orchestrator publishes a short notice for every completed step
//! through an [`EventSink`] and surfaces the error that halts a run through
//! an [`ErrorReporter`].

mod reporter;
mod sink;

pub use reporter::{CollectingErrorReporter, ErrorReporter, LoggingErrorReporter};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
