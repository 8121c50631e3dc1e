// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Project file listings.
//!
//! [`ProjectSource`] is the seam to whatever knows a project's files (a
//! backend, an IPC bridge, or the local filesystem). [`DirectoryProjectSource`]
//! walks configured project roots on disk.

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Directories never descended into.
const IGNORE_DIRS: &[&str] = &[
    "node_modules", "target", ".git", "__pycache__", ".venv",
    "venv", "dist", "build", ".idea", ".vscode", "coverage",
];

/// Maximum directory depth walked below a project root.
const MAX_WALK_DEPTH: usize = 12;

/// Maximum number of paths returned for one project.
const MAX_LISTED_FILES: usize = 20_000;

/// Lists the files of a project as `/`-separated relative paths.
pub trait ProjectSource: Send + Sync {
    fn list_files(&self, project_id: &str) -> Result<Vec<String>>;
}

/// Project source backed by directories on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct DirectoryProjectSource {
    projects: IndexMap<String, PathBuf>,
}

impl DirectoryProjectSource {
    pub fn new(projects: IndexMap<String, PathBuf>) -> Self {
        Self { projects }
    }

    /// Register (or replace) a project root.
    pub fn insert(&mut self, project_id: impl Into<String>, root: impl Into<PathBuf>) {
        self.projects.insert(project_id.into(), root.into());
    }

    pub fn project_ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(|k| k.as_str())
    }

    pub fn root(&self, project_id: &str) -> Option<&Path> {
        self.projects.get(project_id).map(|p| p.as_path())
    }
}

impl ProjectSource for DirectoryProjectSource {
    fn list_files(&self, project_id: &str) -> Result<Vec<String>> {
        let root = self
            .root(project_id)
            .ok_or_else(|| anyhow!("Unknown project: {}", project_id))?;

        if !root.is_dir() {
            return Err(anyhow!("Project root is not a directory: {}", root.display()));
        }

        let mut files = Vec::new();
        walk_dir(root, root, 0, &mut files)
            .with_context(|| format!("Failed to list files of project {}", project_id))?;
        files.sort();
        Ok(files)
    }
}

fn walk_dir(root: &Path, dir: &Path, depth: usize, files: &mut Vec<String>) -> Result<()> {
    if depth > MAX_WALK_DEPTH || files.len() >= MAX_LISTED_FILES {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if path.is_dir() {
            if name_str.starts_with('.') || IGNORE_DIRS.contains(&name_str.as_ref()) {
                continue;
            }
            // Unreadable subdirectories are skipped, only the root must be readable
            if let Err(e) = walk_dir(root, &path, depth + 1, files) {
                tracing::debug!("Skipping {}: {:#}", path.display(), e);
            }
        } else if let Ok(rel) = path.strip_prefix(root) {
            if files.len() >= MAX_LISTED_FILES {
                break;
            }
            let rel_str = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(rel_str);
        }
    }

    Ok(())
}
