use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use chico_core::types::MacroState;
use crate::App;

const HELP: &[(&str, &str)] = &[
    ("space", "run/stop"),
    ("d", "delete"),
    ("w", "window"),
    ("a", "region"),
    ("s", "save"),
    ("r", "reload"),
    ("p", "snapshot"),
    ("x", "stop all"),
    ("q", "quit"),
];

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // -- Left panel: target banner + macro list --

    let (banner_label, banner_bg, rows) = {
        let book = app.book();
        let session = book.session();
        let window = session
            .window()
            .map(|w| w.title)
            .unwrap_or_else(|| "no window (press w)".into());
        let region = session
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "whole window".into());
        let bg = if session.window().is_some() { Color::Green } else { Color::Red };
        (format!("{} | {}", window, region), bg, book.list())
    }; // book lock dropped here

    let mut help = vec![Span::raw(" ")];
    for (key, what) in HELP {
        help.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        help.push(Span::raw(format!(" {}  ", what)));
    }
    let mut lines: Vec<Line> = vec![Line::from(help), Line::from("")];

    if rows.is_empty() {
        lines.push(Line::from(Span::styled(
            "  no macros, reload a profile with r",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (i, row) in rows.iter().enumerate() {
        let prefix = if i == app.selected { "> " } else { "  " };
        let (checkbox, check_color) = match row.state {
            MacroState::Running => ("[●]", Color::Green),
            MacroState::Stopped => ("[ ]", Color::DarkGray),
        };

        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(checkbox, Style::default().fg(check_color)),
            Span::raw(" "),
            Span::styled(
                row.name.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled(format!("      when {}", row.condition), Style::default().fg(Color::Cyan)),
            Span::styled(format!(" -> {}", row.action), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    // Full-width centered banner
    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.chars().count());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let macro_list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(macro_list, left_chunks[1]);

    // -- Right panel: logs --
    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end]
            .iter()
            .map(|m| parse_log_line(m))
            .collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(picker) = &app.picker {
        picker.render(f);
    }
    if let Some(prompt) = &app.area {
        prompt.render(f);
    }
    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line for TUI rendering.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let color = match color_idx {
        1 => Color::DarkGray,   // COLOR_GRAY
        2 => Color::LightBlue,  // COLOR_BLUE
        3 => Color::LightGreen, // COLOR_GREEN
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {} // INFO: no tag
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled(message, Style::default().fg(color)));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_line_splits_into_spans() {
        let line = parse_log_line("WARN\x1fheal\x1f3\x1f12:00:01\x1fno window selected");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "12:00:01 warn heal no window selected");
    }

    #[test]
    fn unstructured_line_passes_through() {
        let line = parse_log_line("plain");
        assert_eq!(line.spans.len(), 1);
    }
}
