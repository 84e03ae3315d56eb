//! Editor-side macro model.
//!
//! The editor works in coordinates relative to the displayed crop (the
//! captured region, or the whole window when no region is set). Stored
//! macros always hold absolute screen coordinates. [`CropView`] converts
//! between the two, and [`MacroDraft`] is the form state that validates
//! into a [`MacroSpec`].

use crate::error::{ChicoError, Result};
use crate::types::*;

/// Mapping between crop-relative and absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropView {
    window: Region,
    region: Option<Region>,
}

impl CropView {
    pub fn new(window: Region, region: Option<Region>) -> Self {
        Self { window, region }
    }

    /// Absolute position of the crop's top-left pixel.
    pub fn origin(&self) -> Point {
        self.region.unwrap_or(self.window).origin()
    }

    pub fn to_absolute(&self, local: Point) -> Point {
        let o = self.origin();
        local.offset(o.x, o.y)
    }

    pub fn to_local(&self, absolute: Point) -> Point {
        let o = self.origin();
        absolute.offset(-o.x, -o.y)
    }

    /// Turn a rectangle drawn on the window preview into an absolute region.
    pub fn region_from_window_rect(&self, rect: Region) -> Region {
        let o = self.window.origin();
        Region::new(rect.x + o.x, rect.y + o.y, rect.w, rect.h)
    }
}

/// Macro as the editor form holds it: every field present, kinds chosen by
/// tag, points relative to the crop. Fields not used by the chosen kinds are
/// ignored on save.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDraft {
    pub name: String,
    pub condition: ConditionKind,
    pub interval_seconds: f64,
    pub color: Option<Rgb>,
    pub color_point: Option<Point>,
    pub action: ActionKind,
    pub click_point: Option<Point>,
    pub frequency_hz: f64,
    pub duration_seconds: f64,
    pub sequence: Vec<Point>,
    pub delay_seconds: f64,
}

impl Default for MacroDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            condition: ConditionKind::Time,
            interval_seconds: 1.0,
            color: None,
            color_point: None,
            action: ActionKind::Click,
            click_point: None,
            frequency_hz: 1.0,
            duration_seconds: 1.0,
            sequence: Vec::new(),
            delay_seconds: 0.5,
        }
    }
}

fn invalid(msg: &str) -> ChicoError {
    ChicoError::Validation(msg.to_string())
}

fn positive(value: f64, what: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ChicoError::Validation(format!("{} must be greater than zero", what)))
    }
}

impl MacroSpec {
    /// Check the rules every macro must satisfy before it can run: a name,
    /// finite positive timings, a non-empty sequence and a non-negative delay.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if let Condition::Time { interval_seconds } = self.condition {
            positive(interval_seconds, "interval")?;
        }
        match &self.action {
            Action::SingleClick { .. } => {}
            Action::RepeatedClicks { frequency_hz, duration_seconds, .. } => {
                positive(*frequency_hz, "frequency")?;
                positive(*duration_seconds, "duration")?;
            }
            Action::Sequence { points, delay_seconds } => {
                if points.is_empty() {
                    return Err(invalid("select the sequence positions"));
                }
                if !delay_seconds.is_finite() || *delay_seconds < 0.0 {
                    return Err(invalid("delay cannot be negative"));
                }
            }
        }
        Ok(())
    }
}

impl MacroDraft {
    /// Validate and convert to an absolute-coordinate macro.
    pub fn build(&self, view: &CropView) -> Result<MacroSpec> {
        let condition = match self.condition {
            ConditionKind::Time => Condition::Time { interval_seconds: self.interval_seconds },
            ConditionKind::Color => {
                let (Some(rgb), Some(at)) = (self.color, self.color_point) else {
                    return Err(invalid("select both a color and its position"));
                };
                Condition::Color { rgb, sample_point: view.to_absolute(at) }
            }
        };

        let action = match self.action {
            ActionKind::Click | ActionKind::Clicks => {
                let at = self.click_point.ok_or_else(|| invalid("select a click position"))?;
                let point = view.to_absolute(at);
                if self.action == ActionKind::Click {
                    Action::SingleClick { point }
                } else {
                    Action::RepeatedClicks {
                        point,
                        frequency_hz: self.frequency_hz,
                        duration_seconds: self.duration_seconds,
                    }
                }
            }
            ActionKind::Sequence => Action::Sequence {
                points: self.sequence.iter().map(|p| view.to_absolute(*p)).collect(),
                delay_seconds: self.delay_seconds,
            },
        };

        let spec = MacroSpec { name: self.name.trim().to_string(), condition, action };
        spec.validate()?;
        Ok(spec)
    }

    /// Load a stored macro back into form state relative to `view`.
    pub fn from_spec(spec: &MacroSpec, view: &CropView) -> Self {
        let mut draft = MacroDraft { name: spec.name.clone(), ..Default::default() };

        match &spec.condition {
            Condition::Time { interval_seconds } => {
                draft.condition = ConditionKind::Time;
                draft.interval_seconds = *interval_seconds;
            }
            Condition::Color { rgb, sample_point } => {
                draft.condition = ConditionKind::Color;
                draft.color = Some(*rgb);
                draft.color_point = Some(view.to_local(*sample_point));
            }
        }

        match &spec.action {
            Action::SingleClick { point } => {
                draft.action = ActionKind::Click;
                draft.click_point = Some(view.to_local(*point));
            }
            Action::RepeatedClicks { point, frequency_hz, duration_seconds } => {
                draft.action = ActionKind::Clicks;
                draft.click_point = Some(view.to_local(*point));
                draft.frequency_hz = *frequency_hz;
                draft.duration_seconds = *duration_seconds;
            }
            Action::Sequence { points, delay_seconds } => {
                draft.action = ActionKind::Sequence;
                draft.sequence = points.iter().map(|p| view.to_local(*p)).collect();
                draft.delay_seconds = *delay_seconds;
            }
        }

        draft
    }
}
