// src/bin/dashboard/main.rs - Terminal backtest panel entry point
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tokio::time::Duration;
use tracing::info;

use backtest_panel::api::BacktestClient;
use backtest_panel::config::{setup_file_logging, ConnectionArgs};

mod app;
mod types;
mod ui;

use app::App;
use types::InputMode;
use ui::ui;

#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Configure, submit and inspect strategy backtests from the terminal")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Returns false when the user asked to quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.alert.is_some() {
        app.dismiss_alert();
        return true;
    }

    if app.input_mode == InputMode::Editing {
        match key.code {
            KeyCode::Enter => app.commit_edit(),
            KeyCode::Esc => app.cancel_edit(),
            KeyCode::Backspace => app.handle_edit_backspace(),
            KeyCode::Char(c) => app.handle_edit_char(c),
            _ => {}
        }
        return true;
    }

    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Char('r') | KeyCode::F(5) => app.submit(),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => app.select_next_row(),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => app.select_previous_row(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => app.cycle_selected(1),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => app.cycle_selected(-1),
        KeyCode::Enter => app.start_editing(),
        KeyCode::PageDown => app.scroll_results(5),
        KeyCode::PageUp => app.scroll_results(-5),
        _ => {}
    }
    true
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        app.drain_events();
        terminal.draw(|f| ui(f, &app))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !handle_key(&mut app, key) {
                    return Ok(());
                }
            }
        }

        // Let background request tasks make progress between frames
        tokio::task::yield_now().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = args.connection.into_config()?;
    let _log_guard = setup_file_logging(&config.log_dir, config.debug)?;
    info!("Starting backtest panel against {}", config.base);

    let client = BacktestClient::new(&config)?;
    let app = App::new(client);
    app.start_symbol_fetch();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    info!("Backtest panel stopped");
    Ok(())
}
