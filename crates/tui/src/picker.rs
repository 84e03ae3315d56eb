use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use chico_core::types::WindowId;

use crate::popup;

/// List of open windows to choose the macro target from. Rows keep the
/// window id, so windows sharing a title stay distinct.
pub struct WindowPicker {
    pub windows: Vec<(WindowId, String)>,
    pub selected: usize,
}

impl WindowPicker {
    pub fn new(mut windows: Vec<(WindowId, String)>) -> Self {
        windows.retain(|(_, t)| !t.trim().is_empty());
        Self { windows, selected: 0 }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.windows.len() {
            self.selected += 1;
        }
    }

    pub fn chosen(&self) -> Option<&(WindowId, String)> {
        self.windows.get(self.selected)
    }

    pub fn render(&self, f: &mut Frame) {
        let width = self.windows.iter().map(|(_, t)| t.chars().count()).max().unwrap_or(0) as u16 + 8;
        let height = self.windows.len().max(1) as u16 + 2;
        let inner = popup::open(f, width.max(36), height, "Select window (enter / esc)", Color::Cyan);

        let lines: Vec<Line> = if self.windows.is_empty() {
            vec![Line::from(Span::styled(" no windows found", Style::default().fg(Color::DarkGray)))]
        } else {
            self.windows
                .iter()
                .enumerate()
                .map(|(i, (_, title))| {
                    if i == self.selected {
                        Line::from(Span::styled(
                            format!("> {}", title),
                            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(format!("  {}", title))
                    }
                })
                .collect()
        };
        f.render_widget(Paragraph::new(lines), inner);
    }
}
