// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Context tags: the files pinned to the message being composed.
//!
//! Tags are keyed by the file's relative path, so a file can be pinned at
//! most once at a time. Each tag gets an id unique to the attachment event,
//! which lets a file be removed and pinned again later.
//!
//! # Rules file
//!
//! When a project has a rules file (a coding-convention manifest such as
//! `AI_RULES.md`), pinning any other file pins the rules file too. The
//! synthetic tag's id ends in [`AUTO_TAG_SUFFIX`].
//!
//! ```
//! use ctxpin::tags::ContextTagStore;
//! use ctxpin::types::ProjectFile;
//!
//! let known = vec![
//!     ProjectFile::from_relative("src/a.ts"),
//!     ProjectFile::from_relative("AI_RULES.md"),
//! ];
//! let mut tags = ContextTagStore::default();
//! tags.add(known[0].clone(), &known);
//!
//! let files = tags.materialize();
//! assert_eq!(files.len(), 2);
//! assert_eq!(files[1].relative_path, "AI_RULES.md");
//! ```

use chrono::Utc;
use indexmap::IndexMap;

use crate::types::ProjectFile;

/// Rules file pinned automatically alongside user-picked files.
pub const DEFAULT_RULES_FILE: &str = "AI_RULES.md";

/// Id suffix marking tags added by the store rather than the user.
pub const AUTO_TAG_SUFFIX: &str = "-auto";

/// A file pinned as context for the outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTag {
    pub file: ProjectFile,
    pub id: String,
}

impl ContextTag {
    /// Whether the store added this tag on its own.
    pub fn is_auto(&self) -> bool {
        self.id.ends_with(AUTO_TAG_SUFFIX)
    }
}

/// What [`ContextTagStore::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The file was already pinned; nothing changed
    AlreadyPresent,
    /// The file was pinned
    Added,
    /// The file was pinned and the rules file came along with it
    AddedWithRules,
}

/// Ordered set of context tags for one compose session.
#[derive(Debug, Clone)]
pub struct ContextTagStore {
    /// Keyed by relative path, in insertion order
    tags: IndexMap<String, ContextTag>,
    rules_file: Option<String>,
    last_stamp: i64,
}

impl Default for ContextTagStore {
    fn default() -> Self {
        Self::new(Some(DEFAULT_RULES_FILE.to_string()))
    }
}

impl ContextTagStore {
    /// Create a store; `rules_file` of `None` disables auto-linking.
    pub fn new(rules_file: Option<String>) -> Self {
        Self {
            tags: IndexMap::new(),
            rules_file,
            last_stamp: 0,
        }
    }

    pub fn rules_file(&self) -> Option<&str> {
        self.rules_file.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.tags.contains_key(relative_path)
    }

    pub fn tags(&self) -> impl Iterator<Item = &ContextTag> {
        self.tags.values()
    }

    /// Pin `file`. Pinning an already-pinned path is a silent no-op.
    ///
    /// `known_files` is the project's file list (empty when unknown); the
    /// rules file is only auto-pinned when it appears there.
    pub fn add(&mut self, file: ProjectFile, known_files: &[ProjectFile]) -> AddOutcome {
        if self.contains(&file.relative_path) {
            tracing::debug!("{} already pinned", file.relative_path);
            return AddOutcome::AlreadyPresent;
        }

        let id = format!("{}-{}", file.relative_path, self.next_stamp());
        self.tags
            .insert(file.relative_path.clone(), ContextTag { file, id });

        if self.link_rules_file(known_files) {
            AddOutcome::AddedWithRules
        } else {
            AddOutcome::Added
        }
    }

    fn link_rules_file(&mut self, known_files: &[ProjectFile]) -> bool {
        let Some(rules) = self.rules_file.clone() else {
            return false;
        };

        let has_user_files = self.tags.keys().any(|path| *path != rules);
        if !has_user_files || self.tags.contains_key(&rules) {
            return false;
        }

        let Some(rules_file) = known_files.iter().find(|f| f.relative_path == rules).cloned() else {
            return false;
        };

        let id = format!("{}-{}{}", rules, self.next_stamp(), AUTO_TAG_SUFFIX);
        tracing::debug!("Auto-pinning rules file {}", rules);
        self.tags.insert(
            rules_file.relative_path.clone(),
            ContextTag { file: rules_file, id },
        );
        true
    }

    /// Remove the tag with the given id. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<ContextTag> {
        let key = self.tags.iter().find(|(_, t)| t.id == id).map(|(k, _)| k.clone())?;
        self.tags.shift_remove(&key)
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    /// Pinned files in the order they were pinned.
    pub fn materialize(&self) -> Vec<ProjectFile> {
        self.tags.values().map(|t| t.file.clone()).collect()
    }

    /// Milliseconds since the epoch, bumped so every id in this store differs.
    fn next_stamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ProjectFile {
        ProjectFile::from_relative(path)
    }

    fn known() -> Vec<ProjectFile> {
        vec![file("src/a.ts"), file("src/b.ts"), file("AI_RULES.md")]
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut tags = ContextTagStore::new(None);
        assert_eq!(tags.add(file("src/index.ts"), &[]), AddOutcome::Added);
        assert_eq!(tags.add(file("src/index.ts"), &[]), AddOutcome::AlreadyPresent);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_auto_link_rules_file() {
        let known = known();
        let mut tags = ContextTagStore::default();

        assert_eq!(tags.add(file("src/a.ts"), &known), AddOutcome::AddedWithRules);

        let all: Vec<_> = tags.tags().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].file.relative_path, "AI_RULES.md");
        assert!(all[1].is_auto());
        assert!(!all[0].is_auto());
    }

    #[test]
    fn test_auto_link_fires_once() {
        let known = known();
        let mut tags = ContextTagStore::default();
        tags.add(file("src/a.ts"), &known);
        assert_eq!(tags.add(file("src/b.ts"), &known), AddOutcome::Added);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_no_auto_link_without_known_files() {
        let mut tags = ContextTagStore::default();
        tags.add(file("src/a.ts"), &[]);
        assert_eq!(tags.len(), 1);

        let without_rules = vec![file("src/a.ts")];
        tags.add(file("src/b.ts"), &without_rules);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_adding_rules_file_alone_does_not_duplicate() {
        let known = known();
        let mut tags = ContextTagStore::default();
        assert_eq!(tags.add(file("AI_RULES.md"), &known), AddOutcome::Added);
        assert_eq!(tags.len(), 1);
        assert!(!tags.tags().next().unwrap().is_auto());
    }

    #[test]
    fn test_removed_rules_file_relinks_on_next_add() {
        let known = known();
        let mut tags = ContextTagStore::default();
        tags.add(file("src/a.ts"), &known);

        let rules_id = tags
            .tags()
            .find(|t| t.file.relative_path == "AI_RULES.md")
            .map(|t| t.id.clone())
            .unwrap();
        assert!(tags.remove(&rules_id).is_some());
        assert!(!tags.contains("AI_RULES.md"));

        tags.add(file("src/b.ts"), &known);
        assert!(tags.contains("AI_RULES.md"));
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_disabled_rules_file() {
        let known = known();
        let mut tags = ContextTagStore::new(None);
        tags.add(file("src/a.ts"), &known);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_ids_unique_after_readd() {
        let mut tags = ContextTagStore::new(None);
        tags.add(file("src/a.ts"), &[]);
        let first = tags.tags().next().unwrap().id.clone();
        tags.remove(&first);
        tags.add(file("src/a.ts"), &[]);
        let second = tags.tags().next().unwrap().id.clone();

        assert_ne!(first, second);
        assert!(second.starts_with("src/a.ts-"));
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut tags = ContextTagStore::new(None);
        tags.add(file("src/a.ts"), &[]);
        assert!(tags.remove("nope").is_none());
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_materialize_keeps_insertion_order() {
        let mut tags = ContextTagStore::new(None);
        tags.add(file("z.ts"), &[]);
        tags.add(file("a.ts"), &[]);
        tags.add(file("m.ts"), &[]);

        let id = tags.tags().nth(1).unwrap().id.clone();
        tags.remove(&id);

        let paths: Vec<_> = tags.materialize().into_iter().map(|f| f.relative_path).collect();
        assert_eq!(paths, vec!["z.ts", "m.ts"]);
    }

    #[test]
    fn test_clear() {
        let known = known();
        let mut tags = ContextTagStore::default();
        tags.add(file("src/a.ts"), &known);
        tags.clear();
        assert!(tags.is_empty());
        assert!(tags.materialize().is_empty());
    }
}
