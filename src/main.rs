mod cli;

use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use aristotle::app::{self, App};
use aristotle::config;
use aristotle::display::renderer::Renderer;
use aristotle::session::state::DEFAULT_FILE;
use aristotle::terminal::{self, TerminalGuard};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let mut config = config::load(cli.config.as_deref(), &cwd)?;
    if let Some(ndpc) = cli.ndpc {
        config.ndpc = Some(ndpc);
    }

    let _log_guard = configure_logging(&config.log_file());
    install_panic_hook();

    let file = cli.file.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE));
    let mut app = App::new(&config, file, terminal::size());
    app.open_initial();

    let _terminal = TerminalGuard::acquire().context("failed to set up terminal")?;
    let events = terminal::spawn_event_reader();
    let mut renderer = Renderer::new();
    app::run(app, events, &mut renderer).await
}

/// Log to a file; the terminal belongs to the editor.
///
/// `RUST_LOG` overrides the default `info` level. Returns `None` if the log
/// file cannot be opened or a subscriber is already installed.
fn configure_logging(path: &Path) -> Option<WorkerGuard> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty())?;
    let name = path.file_name()?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    info!(target: "runtime", log_file = %path.display(), "startup");
    Some(guard)
}

/// Install a panic hook that restores terminal state and logs the panic.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            terminal::restore();
            tracing::error!(target: "runtime.panic", %info, "panic");
            default_hook(info);
        }));
    });
}
