use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use anyhow::{Result, bail};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use chico_core::{logger, orchestrator, settings::Settings};
use chico_core::book::MacroBook;
use chico_core::platform::create_platform;
use chico_core::runner::RunnerContext;
use chico_core::session::Session;
use chico_core::types::{Command, Region};

/// Value following `flag` on the command line, if any.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    logger::init(&cwd.join("logs"))?;
    // The terminal is in raw mode while the TUI runs; send panic text to the log.
    std::panic::set_hook(Box::new(|info| logger::error(&format!("panic: {}", info))));

    let settings_path = cwd.join("settings.json");
    let mut settings = Settings::load(&settings_path);
    if let Some(profile) = arg_value(&args, "--profile") {
        settings.profile = PathBuf::from(profile);
    }
    if let Some(title) = arg_value(&args, "--window") {
        settings.window_title = Some(title);
    }
    let region = match arg_value(&args, "--region") {
        Some(s) => match Region::parse(&s) {
            Some(r) => Some(r),
            None => bail!("--region expects x,y,width,height, got \"{}\"", s),
        },
        None => None,
    };

    let provider = create_platform();
    let session = Arc::new(Session::new());
    if let Some(title) = &settings.window_title {
        match session.select_window_by_title(provider.as_ref(), title) {
            Ok(target) => logger::info(&format!("targeting \"{}\"", target.title)),
            Err(e) => logger::warn(&e.to_string()),
        }
    }

    let ctx = RunnerContext::new(provider, Arc::clone(&session)).with_color_poll(settings.color_poll());
    let mut book = MacroBook::new(ctx);
    if let Err(e) = book.load_profile(&settings.profile) {
        logger::error(&e.to_string());
    }
    // Command line region wins over the profile's.
    if region.is_some() {
        session.set_region(region);
    }
    orchestrator::restore_autostart(&mut book, &settings);

    let book = Arc::new(Mutex::new(book));

    // Channels
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    // Wire logger to TUI
    logger::set_tui_sender(log_tx);
    logger::info("chico started");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = chico_tui::App::new(Arc::clone(&book), log_rx, cmd_tx);

    // Control loop on a background thread
    let control = {
        let book = Arc::clone(&book);
        thread::spawn(move || orchestrator::orchestrate(book, settings, settings_path, cmd_rx))
    };

    let result = chico_tui::event::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the app hangs up the command channel if the TUI bailed out early.
    drop(app);
    if control.join().is_err() {
        logger::error("control thread panicked");
    }

    result
}
