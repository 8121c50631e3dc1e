// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Placement of the file-mention popup next to the cursor.
//!
//! The popup opens just below and to the right of the cursor glyph. It is
//! shifted left when it would run off the right edge, flipped above the input
//! when it would run off the bottom edge, and always kept `edge_margin` away
//! from the top and left edges.
//!
//! Units are whatever the surface uses: pixels for a graphical surface,
//! character cells for a terminal. Text width comes from an injected
//! [`TextMeasure`] so placement can be computed without a rendering surface.
//!
//! ```
//! use ctxpin::popup::{CellMeasure, InputSurface, PlacementConfig, PopupPlacer, Rect, Viewport};
//!
//! let placer = PopupPlacer::new(PlacementConfig::default());
//! let surface = InputSurface {
//!     rect: Rect { left: 0, top: 0, width: 800, height: 100 },
//!     line_height: Some(20),
//!     font: String::new(),
//!     viewport: Viewport { width: 1024, height: 768 },
//! };
//! let pos = placer.place(&CellMeasure, &surface, "@src");
//! assert!(pos.left >= 10 && pos.top >= 10);
//! ```

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// Default popup width (pixels).
pub const DEFAULT_POPUP_WIDTH: i32 = 320;

/// Default popup height (pixels).
pub const DEFAULT_POPUP_HEIGHT: i32 = 256;

/// Minimum distance kept between the popup and the viewport edges.
pub const DEFAULT_EDGE_MARGIN: i32 = 10;

/// Gap between the cursor glyph and the popup.
pub const DEFAULT_CURSOR_GAP: i32 = 5;

/// Line height used when the surface cannot report one.
pub const DEFAULT_LINE_HEIGHT: i32 = 20;

/// Measures rendered text width for a given font.
pub trait TextMeasure {
    fn measure(&self, font: &str, text: &str) -> i32;
}

/// Terminal measurement: one unit per display column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellMeasure;

impl TextMeasure for CellMeasure {
    fn measure(&self, _font: &str, text: &str) -> i32 {
        i32::try_from(UnicodeWidthStr::width(text)).unwrap_or(i32::MAX)
    }
}

impl<F> TextMeasure for F
where
    F: Fn(&str, &str) -> i32,
{
    fn measure(&self, font: &str, text: &str) -> i32 {
        self(font, text)
    }
}

/// Top-left anchor of the popup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub top: i32,
    pub left: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

/// Everything the placer needs to know about the input being typed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSurface {
    /// Bounding rectangle of the input, in viewport coordinates
    pub rect: Rect,
    /// Line height, `None` when the surface cannot report one
    pub line_height: Option<i32>,
    /// Font handed to the measurer
    pub font: String,
    pub viewport: Viewport,
}

/// Popup dimensions and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub popup_width: i32,
    pub popup_height: i32,
    pub edge_margin: i32,
    pub cursor_gap: i32,
    pub default_line_height: i32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            popup_width: DEFAULT_POPUP_WIDTH,
            popup_height: DEFAULT_POPUP_HEIGHT,
            edge_margin: DEFAULT_EDGE_MARGIN,
            cursor_gap: DEFAULT_CURSOR_GAP,
            default_line_height: DEFAULT_LINE_HEIGHT,
        }
    }
}

impl PlacementConfig {
    /// Spacing suited to a character-cell terminal.
    pub fn terminal(popup_width: i32, popup_height: i32) -> Self {
        Self {
            popup_width,
            popup_height,
            edge_margin: 1,
            cursor_gap: 0,
            default_line_height: 1,
        }
    }
}

/// Stateless popup placement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopupPlacer {
    config: PlacementConfig,
}

impl PopupPlacer {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Compute the popup anchor for a cursor placed after `text_before_cursor`.
    pub fn place(
        &self,
        measure: &dyn TextMeasure,
        surface: &InputSurface,
        text_before_cursor: &str,
    ) -> Position {
        let cfg = &self.config;
        let line_height = surface
            .line_height
            .filter(|h| *h > 0)
            .unwrap_or(cfg.default_line_height);

        let current_line = text_before_cursor.rsplit('\n').next().unwrap_or("");
        let line_index = i32::try_from(text_before_cursor.matches('\n').count()).unwrap_or(i32::MAX);
        let text_width = measure.measure(&surface.font, current_line);

        let mut top = surface
            .rect
            .top
            .saturating_add(line_index.saturating_mul(line_height))
            .saturating_add(line_height)
            .saturating_add(cfg.cursor_gap);
        let mut left = surface
            .rect
            .left
            .saturating_add(text_width)
            .saturating_add(cfg.cursor_gap);

        if left.saturating_add(cfg.popup_width) > surface.viewport.width {
            left = (surface.viewport.width - cfg.popup_width - cfg.edge_margin).max(cfg.edge_margin);
        }

        if top.saturating_add(cfg.popup_height) > surface.viewport.height {
            top = surface.rect.top - cfg.popup_height - cfg.cursor_gap;
        }

        Position {
            top: top.max(cfg.edge_margin),
            left: left.max(cfg.edge_margin),
        }
    }
}
