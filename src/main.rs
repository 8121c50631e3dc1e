// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ctxpin::config::{config_path, get_config_dir, load_config, save_config, Config};
use ctxpin::error::{
    files_unavailable_error, format_simple_error, no_project_error, unknown_project_error, ErrorBuilder,
};
use ctxpin::files::{FileIndexLoader, IndexState};
use ctxpin::mention::{self, MentionScan};
use ctxpin::popup::{PlacementConfig, PopupPlacer};
use ctxpin::tags::ContextTagStore;
use ctxpin::terminal::{self, Composer, SentMessage};
use ctxpin::types::Attachment;
use ctxpin::ChatInputController;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_FILE_NAME: &str = "ctxpin.log";

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// General error - unspecified error
    pub const ERROR: i32 = 1;
    /// Usage error - invalid command line arguments
    pub const USAGE: i32 = 64;
    /// I/O error - file operation failed
    pub const IO_ERR: i32 = 74;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

/// ctxpin - pin project files to a chat message with @ mentions
#[derive(Parser)]
#[command(name = "ctxpin")]
#[command(version = VERSION)]
#[command(about = "Pin project files to a chat message with @ mentions.")]
#[command(long_about = "ctxpin - pin project files to a chat message\n\n\
    Register a project:  ctxpin config add-project web ~/src/web\n\
    Compose a message:   ctxpin compose\n\
    Browse files:        ctxpin files --search App\n\
    Try the scanner:     ctxpin scan \"fix the @App\"\n\n\
    Each sent message is printed to stdout as one JSON line.")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose mode: debug-level logging to ~/.ctxpin/ctxpin.log
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive composer
    ///
    /// Examples:
    ///   ctxpin compose
    ///   ctxpin compose --project web --attach screenshot.png
    #[command(alias = "c")]
    Compose {
        /// Project to pick files from (defaults to the configured default)
        #[arg(short, long)]
        project: Option<String>,
        /// Files to upload with the first message
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },

    /// List the files a project offers for @ mentions
    ///
    /// Examples:
    ///   ctxpin files
    ///   ctxpin files --project web --search button
    Files {
        #[arg(short, long)]
        project: Option<String>,
        /// Case-insensitive filter on file name and path
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show what the mention scanner sees
    ///
    /// Examples:
    ///   ctxpin scan "fix the @App"
    ///   ctxpin scan "fix the @App file" --cursor 12
    Scan {
        text: String,
        /// Cursor position in chars (defaults to the end of the text)
        #[arg(short, long)]
        cursor: Option<usize>,
    },

    /// List configured projects
    Projects,

    /// Configure settings
    ///
    /// Examples:
    ///   ctxpin config show
    ///   ctxpin config add-project web ~/src/web
    ///   ctxpin config set-rules-file CONVENTIONS.md
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Register a project root
    AddProject {
        name: String,
        path: PathBuf,
    },

    /// Project used when --project is not given
    SetDefault {
        name: String,
    },

    /// File pinned automatically with any other file ("none" disables)
    SetRulesFile {
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{} Failed to initialize logging: {:#}", "[!]".yellow(), e);
    }

    let result = match cli.command {
        Commands::Compose { project, attach } => compose(project, attach),
        Commands::Files { project, search } => list_files(project, search),
        Commands::Scan { text, cursor } => {
            show_scan(&text, cursor);
            Ok(())
        }
        Commands::Projects => list_projects(),
        Commands::Config { command } => handle_config(command),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        eprintln!("{}", format_simple_error(&format!("{:#}", e)));
        std::process::exit(ERROR);
    }
}

/// Log to a file; the composer owns the terminal.
fn init_logging(verbose: bool) -> Result<()> {
    let path = get_config_dir()?.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn fail(message: String, code: i32) -> ! {
    eprintln!("{}", message);
    std::process::exit(code);
}

/// Resolve the project to open, exiting with a helpful message when none fits.
fn require_project(config: &Config, requested: Option<String>) -> String {
    let Some(name) = config.resolve_project(requested.as_deref()) else {
        let known: Vec<&str> = config.projects.keys().map(|k| k.as_str()).collect();
        fail(no_project_error(&known).build(), USAGE);
    };

    if !config.projects.contains_key(&name) {
        fail(unknown_project_error(&name).build(), CONFIG);
    }
    name
}

fn new_loader(config: &Config) -> FileIndexLoader {
    FileIndexLoader::new(Arc::new(config.project_source()), config.file_filter())
}

fn compose(project: Option<String>, attach: Vec<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let project = require_project(&config, project);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let _enter = runtime.enter();

    let mut loader = new_loader(&config);
    loader.select_project(Some(project));

    let placement = PlacementConfig::terminal(i32::from(config.popup_width), i32::from(config.popup_height));
    let mut controller = ChatInputController::new(
        PopupPlacer::new(placement),
        ContextTagStore::new(config.rules_file.clone()),
    );
    for path in &attach {
        controller.add_attachment(attachment_for(path));
    }

    // Piped output gets each message immediately; a terminal gets them on exit
    let live = !io::stdout().is_terminal();
    let mut held: Vec<SentMessage> = Vec::new();

    terminal::run(Composer::new(controller, loader), |message| {
        if live {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", serde_json::to_string(&message)?)?;
            stdout.flush()?;
        } else {
            held.push(message);
        }
        Ok(())
    })?;

    for message in &held {
        println!("{}", serde_json::to_string(message)?);
    }
    Ok(())
}

fn attachment_for(path: &Path) -> Attachment {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Attachment::new(name, path.display().to_string())
}

fn list_files(project: Option<String>, search: Option<String>) -> Result<()> {
    let config = load_config()?;
    let project = require_project(&config, project);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let state = runtime.block_on(async {
        let mut loader = new_loader(&config);
        loader.select_project(Some(project.clone()));
        loader.next_outcome().await;
        loader.state().clone()
    });

    let index = match state {
        IndexState::Ready { index, .. } => index,
        IndexState::Unavailable { reason, .. } => {
            fail(files_unavailable_error(&project, &reason).build(), IO_ERR)
        }
        IndexState::Unset | IndexState::Loading { .. } => {
            fail(files_unavailable_error(&project, "Listing did not complete").build(), IO_ERR)
        }
    };

    let files = index.search(search.as_deref().unwrap_or(""));
    for file in &files {
        println!("{}", file.relative_path);
    }
    eprintln!(
        "{}",
        format!("{} of {} files in {}", files.len(), index.len(), project).dimmed()
    );
    Ok(())
}

fn show_scan(text: &str, cursor: Option<usize>) {
    let cursor = cursor.unwrap_or_else(|| text.chars().count());
    match mention::scan(text, cursor) {
        MentionScan::Active {
            search_term,
            at_sign_offset,
        } => {
            println!("{} mention", "active".green().bold());
            println!("  search term: {:?}", search_term);
            println!("  @ offset:    {}", at_sign_offset);
        }
        MentionScan::Inactive => println!("{} (no mention at cursor {})", "inactive".dimmed(), cursor),
    }
}

fn list_projects() -> Result<()> {
    let config = load_config()?;

    if config.projects.is_empty() {
        println!("No projects configured.");
        println!("Register one: ctxpin config add-project <name> <path>");
        return Ok(());
    }

    for (name, root) in &config.projects {
        let marker = if config.default_project.as_deref() == Some(name.as_str()) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        let root_display = if root.is_dir() {
            root.display().to_string()
        } else {
            format!("{} {}", root.display(), "(missing)".red())
        };
        println!("{} {:<16} {}", marker, name.bold(), root_display);
    }
    Ok(())
}

fn handle_config(command: Option<ConfigCommands>) -> Result<()> {
    let mut config = load_config()?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", "=== ctxpin Configuration ===".bright_cyan().bold());
            println!();
            println!("  Projects:        {}", config.projects.len());
            for (name, root) in &config.projects {
                println!("    {:<14} {}", name, root.display());
            }
            println!(
                "  Default project: {}",
                config.default_project.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  Rules file:      {}",
                config.rules_file.as_deref().unwrap_or("(disabled)")
            );
            println!("  Popup size:      {}x{}", config.popup_width, config.popup_height);
            println!("  Extensions:      {}", config.allowed_extensions.join(" "));
            println!("  Always include:  {}", config.always_include.join(" "));
            println!();
            println!("Config file: {}", config_path()?.display());
            println!();
        }
        Some(ConfigCommands::AddProject { name, path }) => {
            let root = path
                .canonicalize()
                .with_context(|| format!("Project root {} not found", path.display()))?;
            if !root.is_dir() {
                fail(
                    ErrorBuilder::new(format!("{} is not a directory", root.display()))
                        .fix("Pass the project's root directory")
                        .build(),
                    USAGE,
                );
            }
            config.projects.insert(name.clone(), root.clone());
            if config.default_project.is_none() {
                config.default_project = Some(name.clone());
            }
            save_config(&config)?;
            tracing::info!("Registered project {} at {}", name, root.display());
            println!("{} Project {} -> {}", "[✓]".green(), name.bold(), root.display());
        }
        Some(ConfigCommands::SetDefault { name }) => {
            if !config.projects.contains_key(&name) {
                fail(unknown_project_error(&name).build(), CONFIG);
            }
            config.default_project = Some(name.clone());
            save_config(&config)?;
            println!("{} Default project: {}", "[✓]".green(), name.bold());
        }
        Some(ConfigCommands::SetRulesFile { name }) => {
            config.rules_file = if name.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(name)
            };
            save_config(&config)?;
            println!(
                "{} Rules file: {}",
                "[✓]".green(),
                config.rules_file.as_deref().unwrap_or("(disabled)")
            );
        }
    }

    Ok(())
}
