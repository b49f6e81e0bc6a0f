// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Consistent error formatting for trackhaul.
//!
//! Provides utilities to format fatal errors with actionable information
//! including possible causes and suggested fixes.

use std::fmt;

/// Footer appended to every formatted error.
pub const HELP_FOOTER: &str = "Run again with -v (or RUST_LOG=trackhaul=debug) for details.";

/// Formats an error message with title, causes, fixes, and the help footer.
///
/// # Arguments
///
/// * `title` - The error title (e.g., "Catalog API unreachable")
/// * `causes` - List of possible causes
/// * `fixes` - List of suggested fixes (should be actionable commands or steps)
///
/// # Example
///
/// ```
/// use trackhaul::error::format_error;
///
/// let error = format_error(
///     "Transfer daemon unreachable",
///     &["aria2c is not running", "RPC listens on another port"],
///     &["Start it: aria2c --enable-rpc", "Pass --rpc-url"],
/// );
/// println!("{}", error);
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = String::new();

    output.push_str(&format!("[✗] {}\n\n", title));

    if !causes.is_empty() {
        output.push_str("Possible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
        output.push('\n');
    }

    if !fixes.is_empty() {
        output.push_str("Try these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
        output.push('\n');
    }

    output.push_str(HELP_FOOTER);

    output
}

/// Formats a simple error with just a title and the help footer.
pub fn format_simple_error(title: &str) -> String {
    format!("[✗] {}\n\n{}", title, HELP_FOOTER)
}

/// Builder for constructing formatted error messages.
///
/// # Example
///
/// ```
/// use trackhaul::error::ErrorBuilder;
///
/// let error = ErrorBuilder::new("Catalog returned malformed data")
///     .cause("Package id does not exist")
///     .fix("Double-check the package id")
///     .build();
/// println!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    title: String,
    detail: Option<String>,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    /// Create a new error builder with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: None,
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    /// Attach the underlying error text, shown after the title.
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Add a possible cause.
    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a suggested fix.
    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    /// Build the formatted error message.
    pub fn build(self) -> String {
        let title = match &self.detail {
            Some(detail) => format!("{}\n\n{}", self.title, detail),
            None => self.title.clone(),
        };
        let causes: Vec<&str> = self.causes.iter().map(|s| s.as_str()).collect();
        let fixes: Vec<&str> = self.fixes.iter().map(|s| s.as_str()).collect();
        format_error(&title, &causes, &fixes)
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clone().build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        let error = format_error(
            "Test Error",
            &["Cause 1", "Cause 2"],
            &["Fix 1", "Fix 2"],
        );

        assert!(error.contains("[✗] Test Error"));
        assert!(error.contains("Possible causes:"));
        assert!(error.contains("  - Cause 1"));
        assert!(error.contains("  - Cause 2"));
        assert!(error.contains("Try these fixes:"));
        assert!(error.contains("  1. Fix 1"));
        assert!(error.contains("  2. Fix 2"));
        assert!(error.ends_with(HELP_FOOTER));
    }

    #[test]
    fn test_format_simple_error() {
        let error = format_simple_error("Simple error");
        assert!(error.contains("[✗] Simple error"));
        assert!(error.contains(HELP_FOOTER));
    }

    #[test]
    fn test_error_builder_with_detail() {
        let error = ErrorBuilder::new("Builder test")
            .detail("connection refused")
            .cause("Test cause")
            .fix("Test fix")
            .build();

        assert!(error.contains("[✗] Builder test\n\nconnection refused"));
        assert!(error.contains("Test cause"));
        assert!(error.contains("Test fix"));
    }

    #[test]
    fn test_error_builder_display() {
        let builder = ErrorBuilder::new("Display test")
            .cause("Cause")
            .fix("Fix");

        let error = format!("{}", builder);
        assert!(error.contains("[✗] Display test"));
    }

    #[test]
    fn test_empty_causes_and_fixes() {
        let error = format_error("Empty test", &[], &[]);
        assert!(error.contains("[✗] Empty test"));
        assert!(!error.contains("Possible causes:"));
        assert!(!error.contains("Try these fixes:"));
    }
}
