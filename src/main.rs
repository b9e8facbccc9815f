mod app;
mod config;
mod error;
mod input;
mod media;
mod models;
mod network;
mod page;
mod prompts;
mod reveal;
mod theme;
mod thumbnail;
mod ui;
mod utils;
mod viewport;

use std::{fs, io, path::PathBuf, sync::{Arc, Mutex}, time::{Duration, Instant}};
use anyhow::Context;
use chrono::{Datelike, Local};
use clap::Parser;
use crossterm::{event::{self, Event, KeyEventKind}, execute, terminal};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Settings;
use crate::media::MediaBoard;
use crate::network::{GeminiGenerator, Generator, OfflineGenerator};
use crate::page::Page;

#[derive(Parser, Debug)]
#[command(version, about = "Empire Strength & Fitness, in your terminal")]
struct Cli {
    /// Gemini API key for this run
    #[arg(long)]
    api_key: Option<String>,

    /// Store the given --api-key in the user config
    #[arg(long, requires = "api_key")]
    save_api_key: bool,

    /// Image model override
    #[arg(long)]
    model: Option<String>,

    /// Skip image generation and show placeholders
    #[arg(long)]
    offline: bool,

    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone())?;

    if cli.save_api_key {
        if let Some(key) = &cli.api_key {
            config::save_api_key(key)?;
            tracing::info!("api key saved to user config");
        }
    }

    let mut settings = Settings::new().context("loading settings")?;
    if let Some(key) = cli.api_key {
        settings.gemini_api_key = Some(key);
    }
    if let Some(model) = cli.model {
        settings.gemini_model = model;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let generator: Arc<dyn Generator> = if cli.offline {
        Arc::new(OfflineGenerator)
    } else {
        if settings.gemini_api_key.is_none() {
            tracing::warn!("no Gemini API key configured, images will show as offline");
        }
        Arc::new(GeminiGenerator::new(
            &settings.gemini_endpoint,
            &settings.gemini_model,
            settings.gemini_api_key.clone(),
        ))
    };
    tracing::info!(model = %settings.gemini_model, offline = cli.offline, "starting");

    let board = MediaBoard::new(generator, rt.handle().clone(), settings.generation_timeout());
    let page = Page::empire(Local::now().year());
    let mut app = App::new(page, board, settings.timings(), utils::current_page_area()?, Instant::now());

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stdout(), terminal::LeaveAlternateScreen);
        tracing::error!(%info, "panic");
        default_hook(info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    app.teardown();
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    loop {
        let now = Instant::now();
        app.tick(now);
        terminal.draw(|f| ui::render(f, app, now))?;

        if event::poll(Duration::from_millis(40))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !input::handle_key(key.code, app) {
                        return Ok(());
                    }
                }
                Event::Resize(width, height) => {
                    app.resize(utils::page_area(Rect::new(0, 0, width, height)));
                }
                _ => {}
            }
        }
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("empire")
            .join("empire.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
