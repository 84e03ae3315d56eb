use ratatui::{
    Frame,
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::popup;

/// Yes/No question asked before deleting a macro. No is preselected.
pub struct ConfirmDialog {
    pub message: String,
    pub yes: bool,
    /// Row of the macro the answer applies to.
    pub target: usize,
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>, target: usize) -> Self {
        Self { message: message.into(), yes: false, target }
    }

    pub fn toggle(&mut self) {
        self.yes = !self.yes;
    }

    fn button(label: &str, active: bool, color: Color) -> Span<'_> {
        let style = if active {
            Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(label, style)
    }

    pub fn render(&self, f: &mut Frame) {
        let width = (self.message.chars().count() as u16 + 6).max(40);
        let inner = popup::open(f, width, 7, "Delete macro", Color::Yellow);

        let body = vec![
            Line::from(""),
            Line::from(Span::styled(self.message.as_str(), Style::default().fg(Color::White))),
            Line::from(""),
            Line::from(vec![
                Self::button("  [Yes] y  ", self.yes, Color::Green),
                Span::raw("   "),
                Self::button("  [No] n  ", !self.yes, Color::Red),
            ]),
        ];
        f.render_widget(Paragraph::new(body).alignment(Alignment::Center), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_and_toggles() {
        let mut dialog = ConfirmDialog::new("Delete \"heal\"?", 3);
        assert!(!dialog.yes);
        dialog.toggle();
        assert!(dialog.yes);
        assert_eq!(dialog.target, 3);
    }
}
