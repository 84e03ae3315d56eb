use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::App;
use crate::ui;

pub fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.should_quit {
            return Ok(());
        }

        app.drain_logs();
        app.clamp_selection();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with 100ms timeout (keeps TUI responsive)
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_log_up(3),
                    MouseEventKind::ScrollDown => app.scroll_log_down(3),
                    _ => {}
                },
                _ => {}
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if let Some(dialog) = app.confirm.as_mut() {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                dialog.toggle();
            }
            KeyCode::Enter => {
                let yes = dialog.yes;
                app.answer_confirm(yes);
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_confirm(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.answer_confirm(false),
            _ => {}
        }
        return;
    }

    if let Some(prompt) = app.area.as_mut() {
        match key.code {
            KeyCode::Char(c) => prompt.push(c),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Enter => app.submit_area(),
            KeyCode::Esc => app.area = None,
            _ => {}
        }
        return;
    }

    if let Some(picker) = app.picker.as_mut() {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => picker.move_up(),
            KeyCode::Down | KeyCode::Char('j') => picker.move_down(),
            KeyCode::Enter => app.pick_window(),
            KeyCode::Esc | KeyCode::Char('q') => app.picker = None,
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => app.move_up(),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => app.move_down(),
        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('w') | KeyCode::Char('W') => app.open_picker(),
        KeyCode::Char('a') | KeyCode::Char('A') => app.open_area(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.save(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.reload(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.snapshot(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.stop_all(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_log(),
        _ => {}
    }
}
