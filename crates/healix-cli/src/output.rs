//! Styled terminal output

use console::{style, Term};

/// Status line writer
///
/// Results go to stdout so they can be piped; status lines go to stderr.
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("✓", "OK", |s| s.green()), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        self.line(self.prefix("✗", "FAIL", |s| s.red()), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("⚠", "WARN", |s| s.yellow()), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("ℹ", "INFO", |s| s.blue()), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line(&styled);
    }

    fn prefix(
        &self,
        symbol: &'static str,
        plain: &'static str,
        paint: impl Fn(console::StyledObject<&'static str>) -> console::StyledObject<&'static str>,
    ) -> String {
        if self.use_color {
            paint(style(symbol)).bold().to_string()
        } else {
            plain.to_string()
        }
    }

    fn line(&self, prefix: String, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}
