//! MyBro terminal companion.
//!
//! A vim-style TUI for talking things through with a supportive AI companion.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a plain line-oriented chat, useful for scripts
//! and screen readers:
//!
//! ```bash
//! cargo run -p mybro -- --headless --name Alex
//! ```

mod app;
mod commands;
mod events;
mod headless;
mod logging;
mod ui;
mod worker;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mybro_core::profile::new_user_id;
use mybro_core::{ChatSession, CompanionConfig, ProfileStore};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;
use worker::WorkerRequest;

#[derive(Parser, Debug)]
#[command(name = "mybro", version, about = "A supportive chat companion for the terminal")]
struct Cli {
    /// Profile id to use (profiles live under <data dir>/profiles)
    #[arg(short, long)]
    user: Option<String>,

    /// Your name; finds your profile by name, or sets it on a new one
    #[arg(short, long)]
    name: Option<String>,

    /// Gemini model name
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens per reply
    #[arg(long)]
    max_tokens: Option<usize>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where profiles, transcripts and logs are kept
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Plain stdin/stdout chat instead of the TUI
    #[arg(long)]
    headless: bool,

    /// Don't save or restore the conversation itself
    #[arg(long)]
    no_transcript: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn companion_config(&self) -> Result<CompanionConfig> {
        let mut config = CompanionConfig::load(self.config.as_deref())?;
        if let Some(model) = &self.model {
            config = config.with_model(model.as_str());
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if self.no_transcript {
            config = config.with_transcripts(false);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.companion_config()?;

    if cli.headless {
        logging::init_stderr(&cli.log_level);
    } else {
        logging::init_file(&cli.log_level, &config.data_dir)
            .with_context(|| format!("can't open log file in {}", config.data_dir.display()))?;
    }

    if !api_key_configured(|name| std::env::var(name).ok()) {
        bail!(
            "GEMINI_API_KEY (or GOOGLE_API_KEY) is not set. Put it in a .env file or run: export GEMINI_API_KEY=your_key_here"
        );
    }

    let user_id = resolve_user(&cli, &config).await;
    info!(user_id = %user_id, model = %config.model, headless = cli.headless, "Starting");

    let mut session = ChatSession::open_with_gemini(config, &user_id).await?;
    if let Some(name) = &cli.name {
        if session.profile().name.is_none() {
            session.companion_mut().set_name(name.as_str());
        }
    }

    if cli.headless {
        let stdin = io::stdin();
        headless::run(session, stdin.lock(), stdout()).await?;
        return Ok(());
    }

    run_tui(session).await
}

/// The client accepts either variable.
fn api_key_configured(var: impl Fn(&str) -> Option<String>) -> bool {
    ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .into_iter()
        .any(|name| var(name).is_some_and(|key| !key.trim().is_empty()))
}

/// Pick the profile to talk as: explicit id, then a name match, then the most
/// recently active profile, then a fresh id.
async fn resolve_user(cli: &Cli, config: &CompanionConfig) -> String {
    if let Some(user) = &cli.user {
        return user.clone();
    }

    let store = ProfileStore::new(config.profiles_dir());
    if let Some(name) = &cli.name {
        match store.find_by_name(name).await {
            Ok(Some(profile)) => return profile.user_id,
            Ok(None) => return new_user_id(),
            Err(e) => warn!(error = %e, "Profile lookup by name failed"),
        }
    }

    match store.list().await {
        Ok(profiles) => profiles
            .into_iter()
            .max_by_key(|p| p.last_interaction)
            .map(|p| p.user_id)
            .unwrap_or_else(new_user_id),
        Err(e) => {
            warn!(error = %e, "Listing profiles failed");
            new_user_id()
        }
    }
}

async fn run_tui(session: ChatSession) -> Result<()> {
    let (request_tx, request_rx) = mpsc::channel(8);
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(worker::run(session, request_rx, response_tx));

    // Greet with the day's check-in before anything is typed.
    request_tx.send(WorkerRequest::CheckIn).await?;
    let mut app = App::new(request_tx, response_rx);
    app.waiting = true;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result?;
    worker.await.context("worker task failed")?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain_responses();
        if app.finished {
            return Ok(());
        }

        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            match handle_event(app, event::read()?) {
                EventResult::Quit => app.request_shutdown(),
                EventResult::Submit(line) => app.submit_line(&line),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            app.tick();
        }
    }
}
