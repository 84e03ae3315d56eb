use std::fmt;

use serde::{Deserialize, Serialize};

/// Window identifier handed out by the capture provider
pub type WindowId = u64;

/// Screen point in absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Screen rectangle (x, y, width, height) in absolute coordinates.
/// Used both for window bounds and for the captured region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.w && p.y < self.y + self.h
    }

    /// Parse "x,y,w,h" as given on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<_>>()?;
        match parts[..] {
            [x, y, w, h] if w > 0 && h > 0 => Some(Self::new(x, y, w, h)),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// Trigger kind tag, as written in profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Time,
    Color,
}

/// Action kind tag, as written in profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Clicks,
    Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Fire every `interval_seconds`.
    Time { interval_seconds: f64 },
    /// Fire whenever the pixel at `sample_point` equals `rgb`.
    Color { rgb: Rgb, sample_point: Point },
}

impl Condition {
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Time { .. } => ConditionKind::Time,
            Condition::Color { .. } => ConditionKind::Color,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Time { interval_seconds } => write!(f, "every {}s", interval_seconds),
            Condition::Color { rgb, sample_point } => write!(f, "{} at {}", rgb, sample_point),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SingleClick { point: Point },
    RepeatedClicks { point: Point, frequency_hz: f64, duration_seconds: f64 },
    Sequence { points: Vec<Point>, delay_seconds: f64 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SingleClick { .. } => ActionKind::Click,
            Action::RepeatedClicks { .. } => ActionKind::Clicks,
            Action::Sequence { .. } => ActionKind::Sequence,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SingleClick { point } => write!(f, "click {}", point),
            Action::RepeatedClicks { point, frequency_hz, duration_seconds } => {
                write!(f, "{}/s for {}s at {}", frequency_hz, duration_seconds, point)
            }
            Action::Sequence { points, delay_seconds } => {
                write!(f, "{} points, {}s apart", points.len(), delay_seconds)
            }
        }
    }
}

/// A named trigger + action pair. All points are absolute screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroSpec {
    pub name: String,
    pub condition: Condition,
    pub action: Action,
}

/// Process-local handle for a macro in the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacroId(pub u64);

impl fmt::Display for MacroId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroState {
    Stopped,
    Running,
}

/// Snapshot of one book entry for presentation
#[derive(Debug, Clone)]
pub struct MacroRow {
    pub id: MacroId,
    pub name: String,
    pub condition: String,
    pub action: String,
    pub state: MacroState,
}

/// Command from the front-end to the control loop
#[derive(Debug, Clone)]
pub enum Command {
    Toggle(usize),
    Delete(usize),
    StopAll,
    Save,
    Reload,
    /// Target a window picked from `list_windows`.
    SelectWindow { id: WindowId, title: String },
    /// Set the captured region from a rectangle relative to the targeted
    /// window; `None` goes back to the whole window.
    SelectArea(Option<Region>),
    Snapshot,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_parse_accepts_four_fields() {
        assert_eq!(Region::parse("10, 20,300,400"), Some(Region::new(10, 20, 300, 400)));
        assert_eq!(Region::parse("10,20,300"), None);
        assert_eq!(Region::parse("10,20,0,400"), None);
        assert_eq!(Region::parse("a,b,c,d"), None);
    }

    #[test]
    fn region_contains_is_half_open() {
        let r = Region::new(10, 10, 5, 5);
        assert!(r.contains(Point::new(10, 10)));
        assert!(r.contains(Point::new(14, 14)));
        assert!(!r.contains(Point::new(15, 14)));
        assert!(!r.contains(Point::new(9, 12)));
    }

    #[test]
    fn kinds_follow_variants() {
        let c = Condition::Color { rgb: Rgb(1, 2, 3), sample_point: Point::new(0, 0) };
        assert_eq!(c.kind(), ConditionKind::Color);
        let a = Action::Sequence { points: vec![Point::new(1, 1)], delay_seconds: 0.1 };
        assert_eq!(a.kind(), ActionKind::Sequence);
        assert_eq!(Rgb(255, 0, 16).to_string(), "#ff0010");
    }
}
