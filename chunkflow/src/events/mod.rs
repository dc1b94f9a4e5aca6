//! Observability events emitted by stages and the pipe controller.

mod event;
mod sink;

pub use event::PipeEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
