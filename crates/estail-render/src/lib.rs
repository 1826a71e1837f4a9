//! Terminal rendering for estail
//!
//! Formats log documents as colored one-line events and hands them to an
//! [`EventSink`].

mod renderer;
mod sink;
mod theme;

pub use renderer::{EventRenderer, RenderOptions, TRUNCATE_CHARS, format_timestamp};
pub use sink::{CaptureSink, EVENTS_TARGET, EventSink, TracingSink};
pub use theme::Theme;
