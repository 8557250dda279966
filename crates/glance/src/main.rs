//! `glance` - notmuch mail triage driven by a Lua script
//!
//! Reads key names (or prompt text) line by line from standard input, runs the
//! script's bindings and prints the resulting screen to standard output.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod app;
mod message;
mod settings;
mod view;

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use glance_core::{Notmuch, Queries, Runtime, Script, SpawnExecutor};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, GlanceHost, State};
use message::Message;
use settings::Settings;

const DEFAULT_FILTER: &str = "glance=info,glance_core=info";

/// Command line options.
#[derive(Debug, Parser)]
#[command(
    version,
    about = "Triage notmuch mail with a Lua script",
    after_help = "The script is read from $XDG_CONFIG_HOME/glance/init.lua, then \
                  <config dir>/glance/init.lua. Without one the built-in script is used.\n\
                  Logging is controlled with RUST_LOG."
)]
struct Cli {
    /// Script to load instead of the one on the search path.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of standard error.
    #[arg(short, long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Settings file to read instead of `<config dir>/glance/settings.json`.
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    let stderr_layer = log_file
        .is_none()
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    info!("Starting glance");

    // The interpreter is not Send, so everything runs on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start the async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.settings.as_deref()).await?;
    let notmuch = Notmuch::new(settings.notmuch_binary.clone());

    let saved = match notmuch.saved_queries().await {
        Ok(saved) => saved,
        Err(e) => {
            warn!(error = %e, "cannot read saved queries");
            Vec::new()
        }
    };
    let state = Rc::new(RefCell::new(State::new(Queries::new(saved))));
    let host = Rc::new(GlanceHost::new(Rc::clone(&state), notmuch.clone()));

    let script = Script::locate(cli.config.as_deref())?;
    info!(script = %script.name, "loading script");
    let lua = Runtime::new(host, &script).context("cannot start the script")?;

    let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel();
    let mut executor = SpawnExecutor::new(spawn_tx);
    if let Some(limit) = settings.max_concurrent_spawns {
        executor = executor.with_limit(limit);
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut app = App::new(lua, state, notmuch, executor, events_tx);
    app.start();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    draw(&app, &settings, &mut stdout).await?;

    while app.is_running() {
        let message = tokio::select! {
            line = lines.next_line() => match line.context("cannot read standard input")? {
                Some(line) => app.line_message(&line),
                None => Message::InputClosed,
            },
            Some(result) = spawn_rx.recv() => Message::SpawnFinished(result),
            Some(event) = events_rx.recv() => event,
        };
        app.update(message);
        draw(&app, &settings, &mut stdout).await?;
    }

    info!("Exiting glance");
    Ok(())
}

async fn draw(app: &App, settings: &Settings, stdout: &mut tokio::io::Stdout) -> anyhow::Result<()> {
    let screen = {
        let pending = app.pending_input();
        view::render(&app.state().borrow(), pending.as_ref(), settings.list_rows)
    };
    stdout.write_all(screen.as_bytes()).await?;
    if !screen.ends_with('\n') && app.pending_input().is_none() {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}
