use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear},
};

/// Return a centered `Rect` of `width` columns and `height` rows inside `area`.
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Clear a centered box, draw its border and title, and return the inside.
pub(crate) fn open(f: &mut Frame, width: u16, height: u16, title: &str, border: Color) -> Rect {
    let area = centered_rect(width, height, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {} ", title));
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}
