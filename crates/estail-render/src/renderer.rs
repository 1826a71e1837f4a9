use chrono::{Local, TimeZone};

use crate::sink::EventSink;
use crate::theme::Theme;
use estail_logs::DocumentSink;
use estail_types::LogDocument;

/// Messages longer than this are cut unless rendering in full
pub const TRUNCATE_CHARS: usize = 200;

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Rendering switches fixed for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Disable message truncation
    pub full: bool,
}

/// Turns log documents into colored one-line events
pub struct EventRenderer<S> {
    theme: Theme,
    options: RenderOptions,
    sink: S,
}

impl<S: EventSink> EventRenderer<S> {
    pub fn new(theme: Theme, options: RenderOptions, sink: S) -> Self {
        Self {
            theme,
            options,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// `<date> <LEVEL>(id) program >> message`
    pub fn format_line(&self, doc: &LogDocument) -> String {
        let style = self.theme.level(doc.severity());

        let mut line = format!("{} ", self.theme.timestamp().apply(format_timestamp(doc.timestamp)));
        if let Some(level) = &doc.level {
            line.push_str(&style.apply(format!("<{}>", level)).to_string());
        }
        line.push_str(&format!("({}) {} >> ", doc.id, doc.program));

        let message = if self.options.full {
            doc.message.as_str()
        } else {
            truncate_chars(&doc.message, TRUNCATE_CHARS)
        };
        line.push_str(&style.apply(message).to_string());

        line
    }

    /// Format and emit one document
    pub fn render(&mut self, doc: &LogDocument) {
        let line = self.format_line(doc);
        self.sink.emit(doc.severity(), &line);
    }
}

impl<S: EventSink> DocumentSink for EventRenderer<S> {
    fn accept(&mut self, doc: &LogDocument) {
        self.render(doc);
    }
}

/// Local time, or the raw epoch value if it is out of range
pub fn format_timestamp(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(time) => time.format(DATE_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// At most `max` characters of `text`, never splitting a character
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
