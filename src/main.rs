use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod decode;
mod handler;
mod tui;
mod ui;

use api::ApiClient;
use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    init_logging();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let api = ApiClient::new(config.server_url());
    let mut app = App::new(api, config.download_dir());
    app.bootstrap();

    let mut events = tui::EventHandler::new();
    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        handler::poll_tasks(app).await;

        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

/// Logs go to a file under the config dir; the terminal belongs to the TUI.
/// Logging is best-effort: a missing config dir just means no logs.
fn init_logging() {
    let Ok(dir) = Config::data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(dir.join("economia.log")) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!("economia-cli started");
}
