// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Project file index for `@` mentions.
//!
//! A project's raw path listing is narrowed down to files that are useful as
//! chat context (source, markup, and build manifests), then searched with a
//! case-insensitive substring match on the file name and the relative path.
//!
//! # Modules
//!
//! - [`source`] - Where raw path listings come from
//! - [`loader`] - Per-project asynchronous loading with stale-response discard
//!
//! # Example
//!
//! ```
//! use ctxpin::files::{FileFilter, FileIndex};
//!
//! let index = FileIndex::from_paths(
//!     ["src/App.tsx", "src/logo.png", "package.json"],
//!     &FileFilter::default(),
//! );
//! assert_eq!(index.len(), 2);
//! assert_eq!(index.search("app").len(), 1);
//! ```

pub mod loader;
pub mod source;

pub use loader::{FileIndexLoader, IndexState, LoadOutcome};
pub use source::{DirectoryProjectSource, ProjectSource};

use serde::{Deserialize, Serialize};

use crate::types::ProjectFile;

/// File extensions that are relevant for context.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    ".mjs",
    ".cjs",
    ".mts",
    ".cts",
    ".css",
    ".html",
    ".md",
    ".astro",
    ".vue",
    ".svelte",
    ".scss",
    ".sass",
    ".less",
    ".yml",
    ".yaml",
    ".xml",
    ".plist",
    ".entitlements",
    ".kt",
    ".java",
    ".gradle",
    ".swift",
    ".rs",
    ".toml",
];

/// Files to always include regardless of extension.
pub const ALWAYS_INCLUDE_FILES: &[&str] = &["package.json", "Cargo.toml"];

/// Which paths of a project listing make it into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Extensions with the leading dot (e.g. ".ts")
    pub allowed_extensions: Vec<String>,
    /// Exact file names kept regardless of extension
    pub always_include: Vec<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            always_include: ALWAYS_INCLUDE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileFilter {
    /// Check whether a project file should be offered as context.
    pub fn accepts(&self, file: &ProjectFile) -> bool {
        let by_extension = file
            .extension()
            .map_or(false, |ext| self.allowed_extensions.iter().any(|a| a == ext));

        by_extension || self.always_include.iter().any(|n| *n == file.name)
    }
}

/// Searchable, ordered set of files for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    files: Vec<ProjectFile>,
}

impl FileIndex {
    /// Build an index from a raw listing, keeping listing order.
    pub fn from_paths<I, S>(paths: I, filter: &FileFilter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = paths
            .into_iter()
            .map(|p| ProjectFile::from_relative(p.as_ref()))
            .filter(|f| filter.accepts(f))
            .collect();

        Self { files }
    }

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a file by its relative path.
    pub fn get(&self, relative_path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }

    /// Case-insensitive substring search over name and relative path.
    ///
    /// An empty term returns every file. Results keep index order.
    pub fn search(&self, term: &str) -> Vec<ProjectFile> {
        let term_lower = term.to_lowercase();

        self.files
            .iter()
            .filter(|f| {
                f.name.to_lowercase().contains(&term_lower)
                    || f.relative_path.to_lowercase().contains(&term_lower)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileIndex {
        FileIndex::from_paths(
            [
                "src/App.tsx",
                "src/components/Button.tsx",
                "src/assets/logo.png",
                "AI_RULES.md",
                "package.json",
                "README",
                "src/main.rs",
            ],
            &FileFilter::default(),
        )
    }

    #[test]
    fn test_filter_drops_irrelevant_files() {
        let index = sample();
        let paths: Vec<_> = index.files().iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "src/App.tsx",
                "src/components/Button.tsx",
                "AI_RULES.md",
                "package.json",
                "src/main.rs",
            ]
        );
    }

    #[test]
    fn test_always_include_matches_file_name_only() {
        let filter = FileFilter {
            allowed_extensions: vec![],
            always_include: vec!["package.json".to_string()],
        };
        let index = FileIndex::from_paths(["package.json", "web/package.json", "x.json"], &filter);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_search_empty_term_returns_all() {
        let index = sample();
        assert_eq!(index.search("").len(), index.len());
    }

    #[test]
    fn test_search_case_insensitive() {
        let index = sample();
        let results = index.search("BUTTON");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Button.tsx");
    }

    #[test]
    fn test_search_matches_path_segments() {
        let index = sample();
        let results = index.search("components/");
        assert_eq!(results.len(), 1);

        let results = index.search("src/");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].relative_path, "src/App.tsx");
    }

    #[test]
    fn test_search_no_match() {
        assert!(sample().search("nothing-here").is_empty());
    }

    #[test]
    fn test_get_by_relative_path() {
        let index = sample();
        assert!(index.get("AI_RULES.md").is_some());
        assert!(index.get("src/assets/logo.png").is_none());
    }
}
