use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};

use crate::types::*;
use crate::logger;
use super::CaptureProvider;

/// Something the simulated platform was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubEvent {
    Activate(WindowId),
    Click(Point),
    MoveTo(Point),
}

#[derive(Debug, Clone, Copy)]
pub struct Recorded {
    pub at: Instant,
    pub event: StubEvent,
}

struct StubWindow {
    id: WindowId,
    title: String,
    bounds: Region,
}

struct StubState {
    cursor: Point,
    background: Rgb,
    canvas: HashMap<Point, Rgb>,
    events: Vec<Recorded>,
}

/// In-memory desktop: a fixed set of windows, a paintable screen and a log
/// of every activation, click and pointer move.
pub struct StubPlatform {
    windows: Vec<StubWindow>,
    state: Mutex<StubState>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::with_windows(vec![
            (10001, "Chico Target".into(), Region::new(100, 100, 800, 600)),
            (10002, "Notepad".into(), Region::new(0, 0, 640, 480)),
        ])
    }

    pub fn with_windows(windows: Vec<(WindowId, String, Region)>) -> Self {
        Self {
            windows: windows
                .into_iter()
                .map(|(id, title, bounds)| StubWindow { id, title, bounds })
                .collect(),
            state: Mutex::new(StubState {
                cursor: Point::new(0, 0),
                background: Rgb(0, 0, 0),
                canvas: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_pixel(&self, at: Point, color: Rgb) {
        self.state().canvas.insert(at, color);
    }

    pub fn set_background(&self, color: Rgb) {
        self.state().background = color;
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.state().events.clone()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.click_log().into_iter().map(|(_, p)| p).collect()
    }

    pub fn click_log(&self) -> Vec<(Instant, Point)> {
        self.state()
            .events
            .iter()
            .filter_map(|r| match r.event {
                StubEvent::Click(p) => Some((r.at, p)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    fn record(&self, event: StubEvent) {
        self.state().events.push(Recorded { at: Instant::now(), event });
    }

    fn window(&self, id: WindowId) -> Option<&StubWindow> {
        self.windows.iter().find(|w| w.id == id)
    }
}

impl CaptureProvider for StubPlatform {
    fn list_windows(&self) -> Vec<(WindowId, String)> {
        self.windows.iter().map(|w| (w.id, w.title.clone())).collect()
    }

    fn activate(&self, id: WindowId) -> Result<()> {
        let win = self.window(id).ok_or_else(|| anyhow!("no window {}", id))?;
        logger::info_p("stub", &format!("activate(\"{}\")", win.title));
        self.record(StubEvent::Activate(id));
        Ok(())
    }

    fn bounds_of(&self, id: WindowId) -> Option<Region> {
        self.window(id).map(|w| w.bounds)
    }

    // Polled by every color runner; not logged.
    fn capture_region(&self, region: Region) -> Result<RgbaImage> {
        if region.w <= 0 || region.h <= 0 {
            return Err(anyhow!("empty capture region {}", region));
        }
        let st = self.state();
        let bg = st.background;
        let img = RgbaImage::from_fn(region.w as u32, region.h as u32, |x, y| {
            let at = region.origin().offset(x as i32, y as i32);
            let Rgb(r, g, b) = st.canvas.get(&at).copied().unwrap_or(bg);
            Rgba([r, g, b, 255])
        });
        Ok(img)
    }

    fn click(&self, at: Point) -> Result<()> {
        logger::info_p("stub", &format!("click{}", at));
        self.state().cursor = at;
        self.record(StubEvent::Click(at));
        Ok(())
    }

    fn move_cursor_to(&self, at: Point) -> Result<()> {
        self.state().cursor = at;
        self.record(StubEvent::MoveTo(at));
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(self.state().cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::pixel_color;

    #[test]
    fn capture_reflects_painted_pixels() {
        let p = StubPlatform::new();
        p.set_background(Rgb(1, 1, 1));
        p.set_pixel(Point::new(12, 13), Rgb(200, 100, 50));
        let img = p.capture_region(Region::new(10, 10, 5, 5)).unwrap();
        assert_eq!(img.dimensions(), (5, 5));
        assert_eq!(pixel_color(&img, 2, 3), Some(Rgb(200, 100, 50)));
        assert_eq!(pixel_color(&img, 0, 0), Some(Rgb(1, 1, 1)));
    }

    #[test]
    fn empty_capture_is_an_error() {
        let p = StubPlatform::new();
        assert!(p.capture_region(Region::new(0, 0, 0, 5)).is_err());
    }

    #[test]
    fn click_moves_cursor_and_is_recorded() {
        let p = StubPlatform::new();
        p.click(Point::new(5, 6)).unwrap();
        assert_eq!(p.cursor_position().unwrap(), Point::new(5, 6));
        assert_eq!(p.clicks(), vec![Point::new(5, 6)]);
    }

    #[test]
    fn find_window_and_activate() {
        let p = StubPlatform::new();
        let (id, title) = p.find_window("chico").unwrap();
        assert_eq!(title, "Chico Target");
        assert_eq!(p.bounds_of(id), Some(Region::new(100, 100, 800, 600)));
        p.activate(id).unwrap();
        assert!(p.activate(42).is_err());
        assert_eq!(p.events()[0].event, StubEvent::Activate(id));
        assert!(p.find_window("nothing like it").is_none());
    }
}
