// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ctxpin configuration.
//!
//! Stored as JSON at `~/.ctxpin/config.json`. Every field has a default, so a
//! missing file or a partial file both load.
//!
//! ```json
//! {
//!   "projects": { "web": "/home/me/src/web" },
//!   "default_project": "web",
//!   "rules_file": "AI_RULES.md",
//!   "popup_width": 48,
//!   "popup_height": 10
//! }
//! ```

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::files::{DirectoryProjectSource, FileFilter, ALLOWED_EXTENSIONS, ALWAYS_INCLUDE_FILES};
use crate::tags::DEFAULT_RULES_FILE;

/// Config directory name under the home directory.
const CONFIG_DIR_NAME: &str = ".ctxpin";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project name -> root directory
    #[serde(default)]
    pub projects: IndexMap<String, PathBuf>,
    /// Project opened when none is given on the command line
    #[serde(default)]
    pub default_project: Option<String>,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_always_include")]
    pub always_include: Vec<String>,
    /// Pinned automatically with any other file; `null` disables
    #[serde(default = "default_rules_file")]
    pub rules_file: Option<String>,
    /// Popup width in terminal columns
    #[serde(default = "default_popup_width")]
    pub popup_width: u16,
    /// Popup height in terminal rows (including the header line)
    #[serde(default = "default_popup_height")]
    pub popup_height: u16,
}

fn default_allowed_extensions() -> Vec<String> {
    ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_always_include() -> Vec<String> {
    ALWAYS_INCLUDE_FILES.iter().map(|s| s.to_string()).collect()
}

fn default_rules_file() -> Option<String> {
    Some(DEFAULT_RULES_FILE.to_string())
}

fn default_popup_width() -> u16 {
    48
}

fn default_popup_height() -> u16 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: IndexMap::new(),
            default_project: None,
            allowed_extensions: default_allowed_extensions(),
            always_include: default_always_include(),
            rules_file: default_rules_file(),
            popup_width: default_popup_width(),
            popup_height: default_popup_height(),
        }
    }
}

impl Config {
    pub fn file_filter(&self) -> FileFilter {
        FileFilter {
            allowed_extensions: self.allowed_extensions.clone(),
            always_include: self.always_include.clone(),
        }
    }

    pub fn project_source(&self) -> DirectoryProjectSource {
        DirectoryProjectSource::new(self.projects.clone())
    }

    /// Pick the project to open: explicit name, then the configured default,
    /// then the only configured project.
    pub fn resolve_project(&self, requested: Option<&str>) -> Option<String> {
        if let Some(name) = requested {
            return Some(name.to_string());
        }
        if let Some(ref name) = self.default_project {
            return Some(name.clone());
        }
        if self.projects.len() == 1 {
            return self.projects.keys().next().cloned();
        }
        None
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

/// `~/.ctxpin`, created on first use.
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    let config_dir = home.join(CONFIG_DIR_NAME);
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config() -> Result<Config> {
    Config::load_from(&config_path()?)
}

pub fn save_config(config: &Config) -> Result<()> {
    config.save_to(&config_path()?)
}
