pub mod api;
pub mod app;
pub mod config;
pub mod event;
pub mod logging;
pub mod notify;
pub mod tui;
pub mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use app::App;
use config::AppConfig;
use crossterm::event::{Event as CrosstermEvent, EventStream};
use event::Event;
use futures_util::StreamExt;
use log::{error, info};
use notify::ToastNotifier;
use tui::{Tui, init, restore};
use ui::render;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    logging::init(&config.logging).context("failed to initialize logging")?;
    info!("Starting acuerdos against {}", config.api_base_url);

    let api = api::HttpApi::new(&config).context("failed to build the API client")?;
    let mut app = App::new(
        Arc::new(api),
        Box::new(ToastNotifier::default()),
        config.page_size,
    );

    let mut tui = init().context("failed to initialize the terminal")?;
    let result = run(&mut tui, &mut app).await;
    restore().context("failed to restore the terminal")?;
    if let Err(err) = &result {
        error!("Application error: {:#}", err);
    }
    info!("Exiting acuerdos");
    result
}

async fn run(tui: &mut Tui, app: &mut App) -> Result<()> {
    app.load_page();

    let mut stream = EventStream::new();
    let mut interval = tokio::time::interval(app.tick_rate());

    while !app.should_quit {
        tui.draw(|frame| render(frame, app))?;

        let event = tokio::select! {
            _ = interval.tick() => Event::Tick,
            Some(result) = app.next_task() => Event::Task(result),
            maybe_event = stream.next() => {
                match maybe_event {
                    Some(Ok(CrosstermEvent::Key(key))) => Event::Key(key),
                    Some(Ok(CrosstermEvent::Resize(_, _))) => Event::Resize,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Err(err).context("failed to read terminal events"),
                    None => break,
                }
            }
        };

        match event {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.handle_key(key),
            Event::Task(result) => app.apply_task(result),
            Event::Resize => {}
        }
    }
    Ok(())
}
