// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! ctxpin - pin project files to a chat message with `@` mentions
//!
//! Type `@` in the chat input, pick a file from the popup, and it rides
//! along as context when the message is sent.
//!
//! **Keystroke** -> **Mention scan** -> **Popup** -> **Context tag** -> **Submit**
//!
//! # Core Modules
//!
//! - [`mention`] - Detects the `@term` being typed at the cursor
//! - [`files`] - Project file index, its sources, and async loading
//! - [`popup`] - Where the file popup goes on screen
//! - [`tags`] - Pinned files, including rules-file auto-pinning
//! - [`composer`] - The chat input controller tying it all together
//! - [`terminal`] - Raw-mode terminal front end
//! - [`config`] - `~/.ctxpin/config.json`
//! - [`error`] - Consistent error formatting utilities

pub mod composer;
pub mod config;
pub mod error;
pub mod files;
pub mod mention;
pub mod popup;
pub mod tags;
pub mod terminal;
pub mod types;

// Re-export commonly used types
pub use types::{Attachment, ProjectFile, SubmitPayload};

pub use composer::{ChatInputController, ComposerKey, KeyOutcome, PopupStatus, SubmitSink};

pub use files::{
    DirectoryProjectSource, FileFilter, FileIndex, FileIndexLoader, IndexState, LoadOutcome,
    ProjectSource,
};

pub use mention::{scan, MentionScan, MentionState};

pub use popup::{CellMeasure, InputSurface, PlacementConfig, PopupPlacer, Position, TextMeasure};

pub use tags::{AddOutcome, ContextTag, ContextTagStore};

pub use config::{load_config, save_config, Config};
