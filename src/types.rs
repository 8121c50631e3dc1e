// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Canonical types used across ctxpin.
//!
//! This module provides unified type definitions to avoid duplication.

use serde::{Deserialize, Serialize};

/// A file that belongs to a project and can be pinned as context.
///
/// `relative_path` is the identity key within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub name: String,
    pub relative_path: String,
}

impl ProjectFile {
    /// Build a file entry from a project-relative path.
    ///
    /// The display name is the last `/`-separated segment.
    pub fn from_relative(relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(relative_path.as_str())
            .to_string();

        Self {
            path: relative_path.clone(),
            name,
            relative_path,
        }
    }

    /// Extension of the file name including the leading dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.name.rfind('.').map(|i| &self.name[i..])
    }
}

/// A file uploaded alongside the message (not a project file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub path: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What an accepted submit hands to the message-send pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPayload {
    pub attachments: Vec<Attachment>,
    pub context_files: Vec<ProjectFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_relative_name() {
        let file = ProjectFile::from_relative("src/components/App.tsx");
        assert_eq!(file.name, "App.tsx");
        assert_eq!(file.relative_path, "src/components/App.tsx");
        assert_eq!(file.path, "src/components/App.tsx");

        let root = ProjectFile::from_relative("package.json");
        assert_eq!(root.name, "package.json");
    }

    #[test]
    fn test_extension() {
        assert_eq!(ProjectFile::from_relative("a/b.test.ts").extension(), Some(".ts"));
        assert_eq!(ProjectFile::from_relative("Makefile").extension(), None);
        assert_eq!(ProjectFile::from_relative(".env").extension(), Some(".env"));
    }
}
