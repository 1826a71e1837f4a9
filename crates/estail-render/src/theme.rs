use crossterm::style::{Color, ContentStyle, Stylize};

use estail_types::Severity;

/// Color theme for rendered log lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    timestamp: ContentStyle,
    debug: ContentStyle,
    info: ContentStyle,
    warning: ContentStyle,
    error: ContentStyle,
    critical: ContentStyle,
}

impl Theme {
    // Log level colors
    pub const LOG_DEBUG: Color = Color::White;
    pub const LOG_INFO: Color = Color::Cyan;
    pub const LOG_WARN: Color = Color::Yellow;
    pub const LOG_ERROR: Color = Color::White;
    pub const LOG_CRITICAL: Color = Color::Yellow;
    pub const LOG_CRITICAL_BG: Color = Color::Red;

    // Timestamp colors
    pub const TIMESTAMP: Color = Color::White;
    pub const TIMESTAMP_BG: Color = Color::Blue;

    /// The standard severity palette
    pub fn colored() -> Self {
        Self {
            timestamp: ContentStyle::new()
                .with(Self::TIMESTAMP)
                .on(Self::TIMESTAMP_BG)
                .bold(),
            debug: ContentStyle::new().with(Self::LOG_DEBUG).dim(),
            info: ContentStyle::new().with(Self::LOG_INFO),
            warning: ContentStyle::new().with(Self::LOG_WARN).bold(),
            error: ContentStyle::new().with(Self::LOG_ERROR).bold(),
            critical: ContentStyle::new()
                .with(Self::LOG_CRITICAL)
                .on(Self::LOG_CRITICAL_BG)
                .bold(),
        }
    }

    /// No styling at all, for output that is not a terminal
    pub fn plain() -> Self {
        Self {
            timestamp: ContentStyle::new(),
            debug: ContentStyle::new(),
            info: ContentStyle::new(),
            warning: ContentStyle::new(),
            error: ContentStyle::new(),
            critical: ContentStyle::new(),
        }
    }

    pub fn timestamp(&self) -> ContentStyle {
        self.timestamp
    }

    /// Style for a severity bucket
    pub fn level(&self, severity: Severity) -> ContentStyle {
        match severity {
            Severity::Debug => self.debug,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Critical => self.critical,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::colored()
    }
}
