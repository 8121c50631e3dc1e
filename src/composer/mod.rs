// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chat input controller.
//!
//! Ties the mention scanner, the popup placer, the project file index and the
//! context tag store into one input surface:
//!
//! - every text change re-scans for an `@` mention and moves the popup
//! - picking a file from the popup pins it and removes the typed `@term`
//! - submitting hands attachments and pinned files to a [`SubmitSink`]
//!
//! The controller owns no terminal or window; callers feed it text changes
//! and keys, and render from its accessors.
//!
//! ## Keys
//!
//! While the popup is visible, Up/Down move the highlight, Enter picks the
//! highlighted file and Escape closes the popup. None of these reach the
//! submit path. With the popup hidden, Enter submits and Shift+Enter is left
//! to the caller (newline).

use crate::files::IndexState;
use crate::mention::{self, MentionScan, MentionState};
use crate::popup::{InputSurface, PopupPlacer, TextMeasure};
use crate::tags::{AddOutcome, ContextTag, ContextTagStore};
use crate::types::{Attachment, ProjectFile, SubmitPayload};

/// Receives accepted submissions.
pub trait SubmitSink {
    fn submit(&mut self, payload: SubmitPayload);
}

impl<F> SubmitSink for F
where
    F: FnMut(SubmitPayload),
{
    fn submit(&mut self, payload: SubmitPayload) {
        self(payload)
    }
}

/// Keys the controller cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKey {
    ArrowUp,
    ArrowDown,
    Enter { shift: bool },
    Escape,
    /// Any other key; never handled here
    Other,
}

/// What happened to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not for the controller; the caller applies its default behavior
    NotHandled,
    /// Highlight moved (or stayed at a bound)
    Navigated,
    /// A popup key was consumed without effect (e.g. Enter with no results)
    Consumed,
    /// The highlighted file was pinned
    Selected(ProjectFile),
    /// Popup closed without picking
    Closed,
    /// The message was handed to the sink
    Submitted,
    /// Enter pressed but the submit guard rejected it
    SubmitIgnored,
}

/// Header line of the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStatus {
    Loading,
    Files(usize),
    NoFiles,
}

/// State of one chat input surface.
pub struct ChatInputController {
    draft: String,
    /// Char offset of the cursor in `draft`
    cursor: usize,
    attachments: Vec<Attachment>,
    mention: MentionState,
    highlighted: usize,
    results: Vec<ProjectFile>,
    index: IndexState,
    tags: ContextTagStore,
    placer: PopupPlacer,
}

impl ChatInputController {
    pub fn new(placer: PopupPlacer, tags: ContextTagStore) -> Self {
        Self {
            draft: String::new(),
            cursor: 0,
            attachments: Vec::new(),
            mention: MentionState::default(),
            highlighted: 0,
            results: Vec::new(),
            index: IndexState::Unset,
            tags,
            placer,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn mention(&self) -> &MentionState {
        &self.mention
    }

    pub fn is_popup_visible(&self) -> bool {
        self.mention.is_visible
    }

    /// Files matching the current search term.
    pub fn results(&self) -> &[ProjectFile] {
        &self.results
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn tags(&self) -> impl Iterator<Item = &ContextTag> {
        self.tags.tags()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn index_state(&self) -> &IndexState {
        &self.index
    }

    pub fn placer(&self) -> &PopupPlacer {
        &self.placer
    }

    /// Replace the file index snapshot (after a project switch or reload).
    pub fn set_index(&mut self, index: IndexState) {
        self.index = index;
        if self.mention.is_visible {
            self.refresh_results();
        }
    }

    pub fn popup_status(&self) -> PopupStatus {
        if self.index.is_loading() {
            PopupStatus::Loading
        } else if self.results.is_empty() {
            PopupStatus::NoFiles
        } else {
            PopupStatus::Files(self.results.len())
        }
    }

    /// Record an edit of the input: new text and cursor (char offset).
    pub fn on_text_change(
        &mut self,
        text: String,
        cursor: usize,
        surface: &InputSurface,
        measure: &dyn TextMeasure,
    ) {
        self.cursor = cursor.min(text.chars().count());
        self.draft = text;

        match mention::scan(&self.draft, self.cursor) {
            MentionScan::Active {
                search_term,
                at_sign_offset,
            } => {
                let before = &self.draft[..mention::byte_offset(&self.draft, self.cursor)];
                let position = self.placer.place(measure, surface, before);
                let term_changed = !self.mention.is_visible || self.mention.search_term != search_term;

                self.mention.show(search_term, at_sign_offset, position);
                if term_changed {
                    self.refresh_results();
                }
            }
            MentionScan::Inactive => self.mention.hide(),
        }
    }

    fn refresh_results(&mut self) {
        let results = self
            .index
            .index()
            .map(|index| index.search(&self.mention.search_term))
            .unwrap_or_default();

        if results != self.results {
            self.highlighted = 0;
        }
        self.results = results;
    }

    /// Move a visible popup after the surface changed (resize, scroll).
    ///
    /// Does not re-scan, so a popup closed with Escape stays closed.
    pub fn reposition(&mut self, surface: &InputSurface, measure: &dyn TextMeasure) {
        if !self.mention.is_visible {
            return;
        }
        let before = &self.draft[..mention::byte_offset(&self.draft, self.cursor)];
        self.mention.position = self.placer.place(measure, surface, before);
    }

    /// Hide the popup (escape, click outside, focus lost).
    pub fn close_popup(&mut self) {
        self.mention.hide();
    }

    /// Route a key press. Popup keys are consumed while the popup is open.
    pub fn handle_key(
        &mut self,
        key: ComposerKey,
        is_streaming: bool,
        sink: &mut dyn SubmitSink,
    ) -> KeyOutcome {
        if self.mention.is_visible {
            return match key {
                ComposerKey::ArrowDown => {
                    if self.highlighted + 1 < self.results.len() {
                        self.highlighted += 1;
                    }
                    KeyOutcome::Navigated
                }
                ComposerKey::ArrowUp => {
                    self.highlighted = self.highlighted.saturating_sub(1);
                    KeyOutcome::Navigated
                }
                ComposerKey::Enter { .. } => match self.results.get(self.highlighted).cloned() {
                    Some(file) => {
                        self.select_file(file.clone());
                        KeyOutcome::Selected(file)
                    }
                    None => KeyOutcome::Consumed,
                },
                ComposerKey::Escape => {
                    self.close_popup();
                    KeyOutcome::Closed
                }
                ComposerKey::Other => KeyOutcome::NotHandled,
            };
        }

        match key {
            ComposerKey::Enter { shift: false } => {
                if self.submit(is_streaming, sink) {
                    KeyOutcome::Submitted
                } else {
                    KeyOutcome::SubmitIgnored
                }
            }
            _ => KeyOutcome::NotHandled,
        }
    }

    /// Pin `file` and remove the typed `@term` from the draft.
    pub fn select_file(&mut self, file: ProjectFile) -> AddOutcome {
        let outcome = self.tags.add(file, self.index.files());

        if let Some(at) = self.mention.at_sign_offset {
            self.draft = mention::splice_out(&self.draft, at, self.cursor);
            self.cursor = at.min(self.cursor);
        }
        self.mention.hide();
        outcome
    }

    pub fn remove_tag(&mut self, id: &str) -> Option<ContextTag> {
        self.tags.remove(id)
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Clear the draft; submitting leaves this to the caller.
    pub fn clear_draft(&mut self) {
        self.draft.clear();
        self.cursor = 0;
        self.mention.hide();
    }

    /// Whether a submit would currently be accepted.
    pub fn can_send(&self, is_streaming: bool) -> bool {
        let has_content = !self.draft.trim().is_empty()
            || !self.attachments.is_empty()
            || !self.tags.is_empty();
        has_content && !is_streaming
    }

    /// Submit attachments and pinned files.
    ///
    /// Returns `false` without side effects when there is nothing to send or a
    /// response is still streaming.
    pub fn submit(&mut self, is_streaming: bool, sink: &mut dyn SubmitSink) -> bool {
        if !self.can_send(is_streaming) {
            tracing::debug!(
                "Submit ignored (streaming: {}, attachments: {}, tags: {})",
                is_streaming,
                self.attachments.len(),
                self.tags.len()
            );
            return false;
        }

        let payload = SubmitPayload {
            attachments: std::mem::take(&mut self.attachments),
            context_files: self.tags.materialize(),
        };
        tracing::info!(
            "Submitting message with {} attachments and {} context files",
            payload.attachments.len(),
            payload.context_files.len()
        );
        sink.submit(payload);
        self.tags.clear();
        true
    }
}
