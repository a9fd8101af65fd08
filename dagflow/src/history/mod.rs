//! Best-effort job history: events are queued without blocking the scheduler and
//! shipped in batches to a timeline client.

pub mod event;
pub mod service;

pub use event::{HistoryEvent, HistoryEventType};
pub use service::{HistoryHandler, HistoryLoggingService, LoggingTimelineClient, TimelineClient};
