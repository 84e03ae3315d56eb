use ratatui::{
    Frame,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use chico_core::types::Region;

use crate::popup;

/// Text prompt for the captured region, typed as `x,y,w,h` relative to the
/// targeted window. An empty answer clears the region.
#[derive(Default)]
pub struct AreaPrompt {
    pub input: String,
    pub error: Option<String>,
}

impl AreaPrompt {
    pub fn new(current: Option<Region>) -> Self {
        let input = current
            .map(|r| format!("{},{},{},{}", r.x, r.y, r.w, r.h))
            .unwrap_or_default();
        Self { input, error: None }
    }

    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() || c == ',' || c == '-' || c == ' ' {
            self.input.push(c);
            self.error = None;
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.error = None;
    }

    /// Parsed answer: `Ok(None)` clears the region. On bad input the prompt
    /// also keeps the error to show.
    pub fn answer(&mut self) -> Result<Option<Region>, String> {
        let text = self.input.trim();
        if text.is_empty() {
            return Ok(None);
        }
        match Region::parse(text) {
            Some(r) => Ok(Some(r)),
            None => {
                let err = String::from("expected x,y,width,height with width and height > 0");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let inner = popup::open(f, 60, 6, "Captured region, window-relative (enter / esc)", Color::Magenta);
        let mut lines = vec![
            Line::from(vec![
                Span::styled(" x,y,w,h: ", Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{}_", self.input), Style::default().fg(Color::White)),
            ]),
            Line::from(Span::styled(
                " leave empty for the whole window",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        if let Some(err) = &self.error {
            lines.push(Line::from(Span::styled(format!(" {}", err), Style::default().fg(Color::Red))));
        }
        f.render_widget(Paragraph::new(lines), inner);
    }
}
