pub mod stub;

use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;
use regex::{Regex, RegexBuilder};

use crate::types::*;
use crate::logger;

/// OS-level automation used by the runners and the front-end:
/// window lookup, screen capture, pointer control.
pub trait CaptureProvider: Send + Sync {
    fn list_windows(&self) -> Vec<(WindowId, String)>;
    fn activate(&self, id: WindowId) -> Result<()>;
    fn bounds_of(&self, id: WindowId) -> Option<Region>;
    fn capture_region(&self, region: Region) -> Result<RgbaImage>;
    fn click(&self, at: Point) -> Result<()>;
    fn move_cursor_to(&self, at: Point) -> Result<()>;
    fn cursor_position(&self) -> Result<Point>;

    /// Window whose title equals `pattern` ignoring case, else the first one
    /// matching it as a case-insensitive regex (or literal substring if the
    /// pattern does not compile).
    fn find_window(&self, pattern: &str) -> Option<(WindowId, String)> {
        let windows = self.list_windows();
        if let Some(exact) = windows.iter().find(|(_, title)| title.eq_ignore_ascii_case(pattern)) {
            return Some(exact.clone());
        }
        let re = title_matcher(pattern)?;
        windows.into_iter().find(|(_, title)| re.is_match(title))
    }
}

pub fn title_matcher(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
        })
        .ok()
}

/// Color of the pixel at (`x`, `y`) in `image`, if inside it.
pub fn pixel_color(image: &RgbaImage, x: u32, y: u32) -> Option<Rgb> {
    image.get_pixel_checked(x, y).map(|p| Rgb(p[0], p[1], p[2]))
}

/// Create the capture provider for this build. Only the simulated backend
/// ships; native backends plug in behind the same trait.
pub fn create_platform() -> Arc<dyn CaptureProvider> {
    logger::register_prefix("stub", logger::COLOR_GRAY);
    Arc::new(stub::StubPlatform::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn pixel_color_reads_rgb_and_checks_bounds() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        assert_eq!(pixel_color(&img, 1, 0), Some(Rgb(10, 20, 30)));
        assert_eq!(pixel_color(&img, 0, 0), Some(Rgb(0, 0, 0)));
        assert_eq!(pixel_color(&img, 2, 0), None);
    }

    #[test]
    fn exact_title_wins_over_regex_match() {
        let p = stub::StubPlatform::with_windows(vec![
            (1, "Game 1".into(), Region::new(0, 0, 10, 10)),
            (2, "Game (1)".into(), Region::new(0, 0, 10, 10)),
        ]);
        assert_eq!(p.find_window("game (1)").map(|w| w.0), Some(2));
        assert_eq!(p.find_window("game \\d").map(|w| w.0), Some(1));
    }

    #[test]
    fn title_matcher_falls_back_to_literal() {
        let matches = |pat: &str, title: &str| title_matcher(pat).unwrap().is_match(title);
        assert!(matches("note.*pad", "Notepad++"));
        assert!(matches("[broken", "a [broken title"));
        assert!(matches("CHICO", "chico stub"));
    }
}
