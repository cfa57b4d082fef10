//! Interactive job dashboard.
//!
//! Queries the batch server on a fixed interval and renders occupancy and the
//! job list. Querying and rendering happen on one task: the loop waits on the
//! next tick, the next terminal event, or SIGTERM, and handles exactly one of
//! them at a time.

mod app;
mod input;
mod ui;

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::client::JobSource;
use app::TuiApp;

/// Run the dashboard until the user quits or a query fails.
pub async fn run(source: Box<dyn JobSource>, refresh: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = TuiApp::new(source);
    let result = run_app(&mut terminal, &mut app, refresh).await;

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    refresh: Duration,
) -> Result<()> {
    let mut events = spawn_event_reader();
    let mut terminate = signal(SignalKind::terminate()).context("Failed to watch SIGTERM")?;

    // First tick completes immediately.
    let mut ticks = tokio::time::interval(refresh);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?refresh, "Dashboard started");
    terminal.draw(|frame| ui::render(frame, app))?;

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                app.refresh().await.context("Status query failed")?;
            }
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    if let Some(action) = input::handle_event(event) {
                        debug!(?action, "Input");
                        app.handle_action(action).await.context("Status query failed")?;
                    }
                }
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
            _ = terminate.recv() => {
                info!("Received SIGTERM");
                break;
            }
        }

        if !app.running {
            break;
        }

        terminal.draw(|frame| ui::render(frame, app))?;
    }

    Ok(())
}

/// Forward terminal events from a blocking reader thread.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<io::Result<event::Event>> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });

    rx
}
