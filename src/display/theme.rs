//! Terminal color theme.

use std::sync::LazyLock;

use console::{Style, Term};

/// Shared theme for build reports, tables, and error messages.
pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

const SUCCESS_ICON: &str = "✓";
const ERROR_ICON: &str = "✗";
const WARNING_ICON: &str = "⚠";

/// Color theme for terminal output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Success/positive indicators
    pub success: Style,
    /// Error/failure indicators
    pub error: Style,
    /// Warning/caution indicators
    pub warning: Style,
    /// Index and file paths
    pub path: Style,
    /// Counts
    pub number: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style::new().green().bright(),
            error: Style::new().red().bright(),
            warning: Style::new().yellow().bright(),
            path: Style::new().magenta(),
            number: Style::new().cyan(),
        }
    }
}

impl Theme {
    pub fn success_with_icon(&self, text: &str) -> String {
        self.with_icon(SUCCESS_ICON, &self.success, text)
    }

    pub fn error_with_icon(&self, text: &str) -> String {
        self.with_icon(ERROR_ICON, &self.error, text)
    }

    pub fn warning_with_icon(&self, text: &str) -> String {
        self.with_icon(WARNING_ICON, &self.warning, text)
    }

    fn with_icon(&self, icon: &str, style: &Style, text: &str) -> String {
        if Self::should_disable_colors() {
            format!("{icon} {text}")
        } else {
            format!("{} {}", style.apply_to(icon), style.apply_to(text))
        }
    }

    /// Plain output when `NO_COLOR` is set or either stream is redirected.
    pub fn should_disable_colors() -> bool {
        std::env::var_os("NO_COLOR").is_some()
            || !Term::stdout().is_term()
            || !Term::stderr().is_term()
    }

    /// Apply theme styling conditionally based on terminal support.
    pub fn apply<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if Self::should_disable_colors() {
            text.to_string()
        } else {
            style.apply_to(text).to_string()
        }
    }
}
