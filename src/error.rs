// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! User-facing error messages for ctxpin.
//!
//! Failures that reach the user are rendered as one message: a title, the
//! likely causes, and the fixes worth trying. Inside the library, missing
//! data degrades to empty state instead (see [`crate::files::IndexState`]).

use std::fmt;

/// Formats an error message with title, causes, and fixes.
///
/// # Example
///
/// ```
/// use ctxpin::error::format_error;
///
/// let error = format_error(
///     "Could not open project 'web'",
///     &["Project root was moved or deleted"],
///     &["Re-register it: ctxpin config add-project web <path>"],
/// );
/// assert!(error.contains("Possible causes:"));
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = format!("[✗] {}\n\n", title);

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

    output.truncate(output.trim_end().len());
    output
}

/// Formats an error with just a title.
pub fn format_simple_error(title: &str) -> String {
    format!("[✗] {}", title)
}

/// Builder for constructing formatted error messages.
///
/// ```
/// use ctxpin::error::ErrorBuilder;
///
/// let error = ErrorBuilder::new("No project selected")
///     .cause("No default project configured")
///     .fix("Pass --project <name>")
///     .build();
/// assert!(error.contains("No project selected"));
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    title: String,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    pub fn build(self) -> String {
        let causes: Vec<&str> = self.causes.iter().map(|s| s.as_str()).collect();
        let fixes: Vec<&str> = self.fixes.iter().map(|s| s.as_str()).collect();
        format_error(&self.title, &causes, &fixes)
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clone().build())
    }
}

/// No project given and none could be inferred from the config.
pub fn no_project_error(known: &[&str]) -> ErrorBuilder {
    let builder = ErrorBuilder::new("No project selected");
    if known.is_empty() {
        builder
            .cause("No projects are configured")
            .fix("Register one: ctxpin config add-project <name> <path>")
    } else {
        builder
            .cause(format!("Several projects configured: {}", known.join(", ")))
            .fix("Pass --project <name>")
            .fix("Set a default: ctxpin config set-default <name>")
    }
}

/// A project name that is not in the config.
pub fn unknown_project_error(name: &str) -> ErrorBuilder {
    ErrorBuilder::new(format!("Unknown project '{}'", name))
        .cause("The project is not registered in the config")
        .fix("List projects: ctxpin projects")
        .fix(format!("Register it: ctxpin config add-project {} <path>", name))
}

/// The file listing of a project could not be produced.
pub fn files_unavailable_error(project: &str, reason: &str) -> ErrorBuilder {
    ErrorBuilder::new(format!("Files of project '{}' are unavailable", project))
        .cause(reason.to_string())
        .fix("Check the project root: ctxpin projects")
        .fix(format!("Re-register it: ctxpin config add-project {} <path>", project))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        let error = format_error("Test Error", &["Cause 1", "Cause 2"], &["Fix 1", "Fix 2"]);

        assert!(error.contains("[✗] Test Error"));
        assert!(error.contains("  - Cause 1"));
        assert!(error.contains("  - Cause 2"));
        assert!(error.contains("  1. Fix 1"));
        assert!(error.contains("  2. Fix 2"));
        assert!(error.ends_with("  2. Fix 2"));
        assert!(!error.contains("http"));
    }

    #[test]
    fn test_empty_causes_and_fixes() {
        let error = format_error("Empty test", &[], &[]);
        assert!(!error.contains("Possible causes:"));
        assert!(!error.contains("Try these fixes:"));
        assert_eq!(error, "[✗] Empty test");
    }

    #[test]
    fn test_format_simple_error() {
        let error = format_simple_error("Simple error");
        assert_eq!(error, "[✗] Simple error");
    }

    #[test]
    fn test_no_project_error_lists_known() {
        let error = no_project_error(&["web", "api"]).build();
        assert!(error.contains("web, api"));
        assert!(error.contains("--project"));

        let error = no_project_error(&[]).build();
        assert!(error.contains("add-project"));
    }

    #[test]
    fn test_unknown_project_error() {
        let error = unknown_project_error("docs").build();
        assert!(error.contains("Unknown project 'docs'"));
        assert!(error.contains("add-project docs"));
    }

    #[test]
    fn test_files_unavailable_display() {
        let error = files_unavailable_error("web", "Project root is not a directory").to_string();
        assert!(error.contains("Files of project 'web' are unavailable"));
        assert!(error.contains("Project root is not a directory"));
    }
}
