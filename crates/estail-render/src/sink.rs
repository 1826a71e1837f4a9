use estail_types::Severity;

/// Tracing target rendered documents are logged under
pub const EVENTS_TARGET: &str = "events";

/// Destination for rendered lines
pub trait EventSink {
    fn emit(&mut self, severity: Severity, line: &str);
}

/// Forwards each line to `tracing` on the [`EVENTS_TARGET`] target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, severity: Severity, line: &str) {
        match severity {
            Severity::Critical | Severity::Error => tracing::error!(target: EVENTS_TARGET, "{}", line),
            Severity::Warning => tracing::warn!(target: EVENTS_TARGET, "{}", line),
            Severity::Info => tracing::info!(target: EVENTS_TARGET, "{}", line),
            Severity::Debug => tracing::debug!(target: EVENTS_TARGET, "{}", line),
        }
    }
}

/// Keeps every emitted line in memory
#[derive(Clone, Debug, Default)]
pub struct CaptureSink {
    events: Vec<(Severity, String)>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(Severity, String)] {
        &self.events
    }

    pub fn lines(&self) -> Vec<&str> {
        self.events.iter().map(|(_, line)| line.as_str()).collect()
    }
}

impl EventSink for CaptureSink {
    fn emit(&mut self, severity: Severity, line: &str) {
        self.events.push((severity, line.to_string()));
    }
}
