// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal composer.
//!
//! A raw-mode chat input drawn on stderr with crossterm. Typing `@` opens the
//! file popup under the cursor; every accepted submit is handed to the caller
//! as a [`SentMessage`].
//!
//! ## Keys
//!
//! - `Enter` - pick the highlighted file (popup open) or send
//! - `Shift+Enter` / `Alt+Enter` / `Ctrl+J` - newline
//! - `Up` / `Down` / `Esc` - navigate / close the popup
//! - `Ctrl+X`, or `Backspace` on an empty draft - unpin the last file
//! - `Ctrl+R` - reload the project's file list
//! - `Ctrl+C` / `Ctrl+D` - quit

pub mod buffer;

pub use buffer::EditBuffer;

use anyhow::{Context, Result};
use colored::Colorize;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

use crate::composer::{ChatInputController, ComposerKey, KeyOutcome, PopupStatus};
use crate::files::{FileIndexLoader, IndexState, LoadOutcome};
use crate::popup::{CellMeasure, InputSurface, Rect, Viewport};
use crate::types::SubmitPayload;

const PROMPT: &str = "> ";
const PROMPT_WIDTH: u16 = 2;

/// First screen row of the draft.
const DRAFT_TOP: u16 = 3;

/// How long to wait for input before checking the loader again.
const TICK: Duration = Duration::from_millis(50);

/// One accepted submit, as written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMessage {
    pub draft: String,
    #[serde(flatten)]
    pub payload: SubmitPayload,
}

/// Terminal size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub cols: u16,
    pub rows: u16,
}

impl Screen {
    pub fn current() -> Result<Self> {
        let (cols, rows) = terminal::size().context("Failed to read terminal size")?;
        Ok(Self { cols, rows })
    }
}

/// Raw mode plus alternate screen, restored on drop.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let guard = Self;
        execute!(io::stderr(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stderr(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Interactive compose session over one project.
pub struct Composer {
    controller: ChatInputController,
    loader: FileIndexLoader,
    buffer: EditBuffer,
    sent: usize,
    notice: Option<String>,
}

impl Composer {
    pub fn new(mut controller: ChatInputController, loader: FileIndexLoader) -> Self {
        controller.set_index(loader.state().clone());
        Self {
            controller,
            loader,
            buffer: EditBuffer::default(),
            sent: 0,
            notice: None,
        }
    }

    pub fn controller(&self) -> &ChatInputController {
        &self.controller
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    fn surface(&self, screen: Screen) -> InputSurface {
        let lines = self.buffer.lines().count();
        InputSurface {
            rect: Rect {
                left: i32::from(PROMPT_WIDTH),
                top: i32::from(DRAFT_TOP),
                width: i32::from(screen.cols.saturating_sub(PROMPT_WIDTH)),
                height: i32::try_from(lines).unwrap_or(i32::MAX),
            },
            line_height: Some(1),
            font: String::new(),
            viewport: Viewport {
                width: i32::from(screen.cols),
                height: i32::from(screen.rows),
            },
        }
    }

    fn sync_text(&mut self, screen: Screen) {
        let surface = self.surface(screen);
        self.controller.on_text_change(
            self.buffer.text().to_string(),
            self.buffer.cursor(),
            &surface,
            &CellMeasure,
        );
    }

    /// Follow a terminal resize without reopening a closed popup.
    fn resize(&mut self, screen: Screen) {
        let surface = self.surface(screen);
        self.controller.reposition(&surface, &CellMeasure);
    }

    /// Apply finished file listings. Returns true when anything changed.
    fn poll_loader(&mut self) -> bool {
        let outcomes = self.loader.poll_outcomes();
        if outcomes.is_empty() {
            return false;
        }
        for outcome in &outcomes {
            if let LoadOutcome::Failed { project } = outcome {
                self.notice = Some(format!("Files of {} unavailable", project));
            }
        }
        self.controller.set_index(self.loader.state().clone());
        true
    }

    fn unpin_last(&mut self) {
        let last = self.controller.tags().last().map(|t| t.id.clone());
        if let Some(id) = last {
            if let Some(tag) = self.controller.remove_tag(&id) {
                self.notice = Some(format!("Unpinned {}", tag.file.relative_path));
            }
        }
    }

    fn handle_key(
        &mut self,
        key: KeyEvent,
        screen: Screen,
        on_sent: &mut dyn FnMut(SentMessage) -> Result<()>,
    ) -> Result<Flow> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return Ok(Flow::Quit),
            KeyCode::Char('x') if ctrl => {
                self.unpin_last();
                return Ok(Flow::Continue);
            }
            KeyCode::Char('r') if ctrl => {
                self.loader.refresh();
                self.controller.set_index(self.loader.state().clone());
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let mut submitted = Vec::new();
        let outcome = {
            let mut sink = |payload: SubmitPayload| submitted.push(payload);
            self.controller.handle_key(composer_key(&key), false, &mut sink)
        };

        match outcome {
            KeyOutcome::Selected(file) => {
                self.buffer.set(self.controller.draft(), self.controller.cursor());
                self.notice = Some(format!("Pinned {}", file.relative_path));
            }
            KeyOutcome::Submitted => {
                for payload in submitted {
                    on_sent(SentMessage {
                        draft: self.buffer.text().to_string(),
                        payload,
                    })?;
                    self.sent += 1;
                }
                self.buffer.clear();
                self.controller.clear_draft();
                self.notice = None;
            }
            KeyOutcome::SubmitIgnored => {
                self.notice = Some("Nothing to send".to_string());
            }
            KeyOutcome::NotHandled => {
                if self.edit(&key) {
                    self.sync_text(screen);
                }
            }
            KeyOutcome::Navigated | KeyOutcome::Consumed | KeyOutcome::Closed => {}
        }
        Ok(Flow::Continue)
    }

    /// Apply an editing key to the buffer. Returns true when text or cursor moved.
    fn edit(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let ctrl_or_alt = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);

        match key.code {
            // Plain Enter never gets here; the controller owns it
            KeyCode::Enter => {
                self.buffer.insert_newline();
                true
            }
            KeyCode::Char('j') if ctrl => {
                self.buffer.insert_newline();
                true
            }
            KeyCode::Char(c) if !ctrl_or_alt => {
                self.buffer.insert_char(c);
                true
            }
            KeyCode::Backspace => {
                if self.buffer.is_empty() {
                    self.unpin_last();
                    false
                } else {
                    self.buffer.backspace()
                }
            }
            KeyCode::Delete => self.buffer.delete(),
            KeyCode::Left => {
                self.buffer.move_left();
                true
            }
            KeyCode::Right => {
                self.buffer.move_right();
                true
            }
            KeyCode::Home => {
                self.buffer.move_home();
                true
            }
            KeyCode::End => {
                self.buffer.move_end();
                true
            }
            _ => false,
        }
    }

    fn header_line(&self) -> String {
        let state = self.loader.state();
        let project = state.project().unwrap_or("(no project)");
        let files = match state {
            IndexState::Unset => "no project selected".to_string(),
            IndexState::Loading { .. } => "loading files...".to_string(),
            IndexState::Ready { index, .. } => format!("{} files", index.len()),
            IndexState::Unavailable { .. } => "files unavailable".to_string(),
        };

        let mut line = format!("ctxpin | {} | {} | sent: {}", project, files, self.sent);
        if let Some(ref notice) = self.notice {
            line.push_str(" | ");
            line.push_str(notice);
        }
        line
    }

    fn tags_line(&self) -> String {
        if self.controller.tag_count() == 0 {
            return "Context: (none, type @ to pin a file)".to_string();
        }
        let tags: Vec<String> = self
            .controller
            .tags()
            .map(|t| {
                if t.is_auto() {
                    format!("[{} (auto)]", t.file.relative_path)
                } else {
                    format!("[{}]", t.file.relative_path)
                }
            })
            .collect();
        format!("Context: {}", tags.join(" "))
    }

    fn attachments_line(&self) -> Option<String> {
        let attachments = self.controller.attachments();
        if attachments.is_empty() {
            return None;
        }
        let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
        Some(format!("Attached: {}", names.join(", ")))
    }

    fn draw<W: Write>(&self, out: &mut W, screen: Screen) -> Result<()> {
        let cols = usize::from(screen.cols);

        queue!(out, Hide, Clear(ClearType::All))?;
        queue!(out, MoveTo(0, 0), Print(fit(&self.header_line(), cols).bold()))?;
        queue!(out, MoveTo(0, 1), Print(fit(&self.tags_line(), cols).cyan()))?;
        if let Some(line) = self.attachments_line() {
            queue!(out, MoveTo(0, 2), Print(fit(&line, cols).dimmed()))?;
        }

        let last_row = screen.rows.saturating_sub(1);
        let draft_width = usize::from(screen.cols.saturating_sub(PROMPT_WIDTH));
        for (i, line) in self.buffer.lines().enumerate() {
            let row = DRAFT_TOP.saturating_add(u16::try_from(i).unwrap_or(u16::MAX));
            if row >= last_row {
                break;
            }
            let prefix = if i == 0 { PROMPT } else { "  " };
            queue!(out, MoveTo(0, row), Print(prefix), Print(fit(line, draft_width)))?;
        }

        let footer = "Enter send | Shift+Enter newline | Ctrl+X unpin | Ctrl+R reload | Ctrl+C quit";
        queue!(out, MoveTo(0, last_row), Print(fit(footer, cols).dimmed()))?;

        if self.controller.is_popup_visible() {
            self.draw_popup(out, screen)?;
        }

        let (line, col) = self.buffer.cursor_line_col();
        let cursor_col = PROMPT_WIDTH.saturating_add(u16::try_from(col).unwrap_or(u16::MAX));
        let cursor_row = DRAFT_TOP.saturating_add(u16::try_from(line).unwrap_or(u16::MAX));
        queue!(out, MoveTo(cursor_col.min(screen.cols.saturating_sub(1)), cursor_row.min(last_row)), Show)?;
        out.flush()?;
        Ok(())
    }

    fn draw_popup<W: Write>(&self, out: &mut W, screen: Screen) -> Result<()> {
        let config = self.controller.placer().config();
        let position = self.controller.mention().position;
        let left = u16::try_from(position.left.max(0)).unwrap_or(u16::MAX);
        let top = u16::try_from(position.top.max(0)).unwrap_or(u16::MAX);
        if left >= screen.cols {
            return Ok(());
        }
        // Never wider than the space right of the anchor; wrapped rows garble raw mode
        let width = usize::try_from(config.popup_width.max(1))
            .unwrap_or(1)
            .min(usize::from(screen.cols - left));
        let height = usize::try_from(config.popup_height.max(1)).unwrap_or(1);

        let header = match self.controller.popup_status() {
            PopupStatus::Loading => "Loading files...".to_string(),
            PopupStatus::Files(1) => "1 file".to_string(),
            PopupStatus::Files(n) => format!("{} files", n),
            PopupStatus::NoFiles => "No files found".to_string(),
        };

        let mut rows = vec![fit_padded(&header, width).bold().reversed().to_string()];

        let results = self.controller.results();
        let visible = height.saturating_sub(1);
        let highlighted = self.controller.highlighted();
        let start = if highlighted >= visible && visible > 0 {
            highlighted + 1 - visible
        } else {
            0
        };
        for (i, file) in results.iter().enumerate().skip(start).take(visible) {
            let text = fit_padded(&format!("{}  {}", file.name, file.relative_path), width);
            if i == highlighted {
                rows.push(text.reversed().to_string());
            } else {
                rows.push(text);
            }
        }

        for (i, row) in rows.iter().enumerate() {
            let y = top.saturating_add(u16::try_from(i).unwrap_or(u16::MAX));
            if y >= screen.rows {
                break;
            }
            queue!(out, MoveTo(left, y), Print(row))?;
        }
        Ok(())
    }
}

fn composer_key(key: &KeyEvent) -> ComposerKey {
    match key.code {
        KeyCode::Up => ComposerKey::ArrowUp,
        KeyCode::Down => ComposerKey::ArrowDown,
        KeyCode::Enter => ComposerKey::Enter {
            shift: key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT),
        },
        KeyCode::Esc => ComposerKey::Escape,
        _ => ComposerKey::Other,
    }
}

/// Truncate `text` to `width` display columns.
fn fit(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

/// Truncate or pad `text` to exactly `width` display columns.
fn fit_padded(text: &str, width: usize) -> String {
    let mut out = fit(text, width);
    let used: usize = out.chars().map(|c| c.width().unwrap_or(0)).sum();
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

/// Run the composer until the user quits.
///
/// Must be called inside a tokio runtime context (see
/// [`tokio::runtime::Runtime::enter`]) so project listings can load while the
/// input loop runs. `on_sent` receives every accepted submit.
pub fn run<F>(mut composer: Composer, mut on_sent: F) -> Result<Composer>
where
    F: FnMut(SentMessage) -> Result<()>,
{
    let guard = RawModeGuard::enter()?;
    let mut out = io::stderr();
    let mut screen = Screen::current()?;
    tracing::info!("Composer started ({}x{})", screen.cols, screen.rows);

    composer.draw(&mut out, screen)?;
    loop {
        let mut dirty = composer.poll_loader();

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if composer.handle_key(key, screen, &mut on_sent)? == Flow::Quit {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(cols, rows) => {
                    screen = Screen { cols, rows };
                    composer.resize(screen);
                    dirty = true;
                }
                _ => {}
            }
        }

        if dirty {
            composer.draw(&mut out, screen)?;
        }
    }

    drop(guard);
    tracing::info!("Composer closed after {} messages", composer.sent);
    Ok(composer)
}
