use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChicoError, Result};
use crate::logger;
use crate::types::*;

/// On-disk profile: flat macro records plus the captured region.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub tasks: Vec<MacroRecord>,
    pub selected_area: Option<[i32; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Interval(f64),
    Color([u8; 3]),
}

/// One macro, flattened. Which optional fields are meaningful depends on
/// `condition_type` and `action_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub name: String,
    pub condition_type: ConditionKind,
    pub condition_value: ConditionValue,
    pub condition_position: Option<[i32; 2]>,
    pub action_type: ActionKind,
    pub action_position: Option<[i32; 2]>,
    pub frequency: Option<f64>,
    pub duration: Option<f64>,
    pub sequence: Option<Vec<[i32; 2]>>,
    pub delay: Option<f64>,
}

fn pair(p: Point) -> [i32; 2] {
    [p.x, p.y]
}

fn point([x, y]: [i32; 2]) -> Point {
    Point::new(x, y)
}

impl From<&MacroSpec> for MacroRecord {
    fn from(spec: &MacroSpec) -> Self {
        let (condition_value, condition_position) = match &spec.condition {
            Condition::Time { interval_seconds } => (ConditionValue::Interval(*interval_seconds), None),
            Condition::Color { rgb, sample_point } => {
                (ConditionValue::Color([rgb.0, rgb.1, rgb.2]), Some(pair(*sample_point)))
            }
        };

        let mut record = MacroRecord {
            name: spec.name.clone(),
            condition_type: spec.condition.kind(),
            condition_value,
            condition_position,
            action_type: spec.action.kind(),
            action_position: None,
            frequency: None,
            duration: None,
            sequence: None,
            delay: None,
        };

        match &spec.action {
            Action::SingleClick { point } => {
                record.action_position = Some(pair(*point));
            }
            Action::RepeatedClicks { point, frequency_hz, duration_seconds } => {
                record.action_position = Some(pair(*point));
                record.frequency = Some(*frequency_hz);
                record.duration = Some(*duration_seconds);
            }
            Action::Sequence { points, delay_seconds } => {
                record.sequence = Some(points.iter().copied().map(pair).collect());
                record.delay = Some(*delay_seconds);
            }
        }

        record
    }
}

impl TryFrom<&MacroRecord> for MacroSpec {
    type Error = String;

    fn try_from(r: &MacroRecord) -> std::result::Result<Self, String> {
        let condition = match (r.condition_type, &r.condition_value) {
            (ConditionKind::Time, ConditionValue::Interval(secs)) => {
                Condition::Time { interval_seconds: *secs }
            }
            (ConditionKind::Color, ConditionValue::Color([red, green, blue])) => {
                let at = r.condition_position.ok_or("color condition without position")?;
                Condition::Color { rgb: Rgb(*red, *green, *blue), sample_point: point(at) }
            }
            (kind, value) => return Err(format!("{:?} condition with value {:?}", kind, value)),
        };

        let action = match r.action_type {
            ActionKind::Click => Action::SingleClick {
                point: point(r.action_position.ok_or("click without position")?),
            },
            ActionKind::Clicks => Action::RepeatedClicks {
                point: point(r.action_position.ok_or("clicks without position")?),
                frequency_hz: r.frequency.ok_or("clicks without frequency")?,
                duration_seconds: r.duration.ok_or("clicks without duration")?,
            },
            ActionKind::Sequence => Action::Sequence {
                points: r
                    .sequence
                    .as_ref()
                    .ok_or("sequence without points")?
                    .iter()
                    .copied()
                    .map(point)
                    .collect(),
                delay_seconds: r.delay.unwrap_or(0.0),
            },
        };

        let spec = MacroSpec { name: r.name.clone(), condition, action };
        spec.validate().map_err(|e| e.to_string())?;
        Ok(spec)
    }
}

/// Write `macros` and `region` to `path` as a JSON profile.
pub fn save<'a>(
    macros: impl IntoIterator<Item = &'a MacroSpec>,
    region: Option<Region>,
    path: &Path,
) -> Result<()> {
    let doc = ProfileDocument {
        tasks: macros.into_iter().map(MacroRecord::from).collect(),
        selected_area: region.map(|r| [r.x, r.y, r.w, r.h]),
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|source| ChicoError::ProfileFormat { path: path.to_path_buf(), source })?;

    let io_err = |source| ChicoError::ProfileIo { path: path.to_path_buf(), source };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    fs::write(path, json).map_err(io_err)?;

    logger::info(&format!("saved {} macro(s) to {}", doc.tasks.len(), path.display()));
    Ok(())
}

/// Read a profile. A missing file is an empty profile. Records that do not
/// make sense for their kind tags, or that would not pass editor
/// validation, are skipped with a warning.
pub fn load(path: &Path) -> Result<(Vec<MacroSpec>, Option<Region>)> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            logger::info(&format!("no profile at {}, starting empty", path.display()));
            return Ok((Vec::new(), None));
        }
        Err(source) => return Err(ChicoError::ProfileIo { path: path.to_path_buf(), source }),
    };

    let doc: ProfileDocument = serde_json::from_str(&text)
        .map_err(|source| ChicoError::ProfileFormat { path: path.to_path_buf(), source })?;

    let mut macros = Vec::with_capacity(doc.tasks.len());
    for record in &doc.tasks {
        match MacroSpec::try_from(record) {
            Ok(spec) => macros.push(spec),
            Err(why) => logger::warn(&format!("skipping macro \"{}\": {}", record.name, why)),
        }
    }

    let region = doc.selected_area.map(|[x, y, w, h]| Region::new(x, y, w, h));
    Ok((macros, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<MacroSpec> {
        vec![
            MacroSpec {
                name: "every second".into(),
                condition: Condition::Time { interval_seconds: 1.0 },
                action: Action::SingleClick { point: Point::new(10, 20) },
            },
            MacroSpec {
                name: "red burst".into(),
                condition: Condition::Color { rgb: Rgb(255, 0, 0), sample_point: Point::new(5, 6) },
                action: Action::RepeatedClicks { point: Point::new(7, 8), frequency_hz: 2.0, duration_seconds: 1.5 },
            },
            MacroSpec {
                name: "walk".into(),
                condition: Condition::Time { interval_seconds: 0.25 },
                action: Action::Sequence {
                    points: vec![Point::new(1, 1), Point::new(2, 2), Point::new(3, 3)],
                    delay_seconds: 0.1,
                },
            },
        ]
    }

    #[test]
    fn round_trip_preserves_macros_and_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");
        let region = Some(Region::new(10, 20, 300, 200));

        save(&sample(), region, &path).unwrap();
        let (macros, loaded_region) = load(&path).unwrap();

        assert_eq!(macros, sample());
        assert_eq!(loaded_region, region);
    }

    #[test]
    fn missing_file_is_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let (macros, region) = load(&dir.path().join("nope.json")).unwrap();
        assert!(macros.is_empty());
        assert!(region.is_none());
    }

    #[test]
    fn records_use_flat_field_names() {
        let value = serde_json::to_value(MacroRecord::from(&sample()[1])).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "red burst",
                "condition_type": "color",
                "condition_value": [255, 0, 0],
                "condition_position": [5, 6],
                "action_type": "clicks",
                "action_position": [7, 8],
                "frequency": 2.0,
                "duration": 1.5,
                "sequence": null,
                "delay": null
            })
        );
    }

    #[test]
    fn accepts_integer_numbers_and_null_area() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let doc = json!({
            "tasks": [{
                "name": "t",
                "condition_type": "time",
                "condition_value": 3,
                "condition_position": null,
                "action_type": "clicks",
                "action_position": [1, 2],
                "frequency": 5,
                "duration": 2,
                "sequence": null,
                "delay": null
            }],
            "selected_area": null
        });
        fs::write(&path, doc.to_string()).unwrap();

        let (macros, region) = load(&path).unwrap();
        assert!(region.is_none());
        assert_eq!(macros[0].condition, Condition::Time { interval_seconds: 3.0 });
        assert_eq!(
            macros[0].action,
            Action::RepeatedClicks { point: Point::new(1, 2), frequency_hz: 5.0, duration_seconds: 2.0 }
        );
    }

    #[test]
    fn inconsistent_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut bad = MacroRecord::from(&sample()[0]);
        bad.name = "broken".into();
        bad.condition_type = ConditionKind::Color;
        let doc = ProfileDocument {
            tasks: vec![bad, MacroRecord::from(&sample()[2])],
            selected_area: None,
        };
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let (macros, _) = load(&path).unwrap();
        assert_eq!(macros, vec![sample()[2].clone()]);
    }

    #[test]
    fn records_with_unusable_numbers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let base = json!({
            "name": "ok",
            "condition_type": "time",
            "condition_value": 0.05,
            "condition_position": null,
            "action_type": "clicks",
            "action_position": [1, 2],
            "frequency": 2,
            "duration": 1,
            "sequence": null,
            "delay": null
        });
        let with = |name: &str, changes: serde_json::Value| {
            let mut record = base.clone();
            record["name"] = json!(name);
            for (key, value) in changes.as_object().unwrap() {
                record[key] = value.clone();
            }
            record
        };
        let walk = json!({ "action_type": "sequence", "action_position": null, "sequence": [[1, 1]], "delay": 0 });
        let tasks = vec![
            with("zero frequency", json!({ "frequency": 0 })),
            with("negative frequency", json!({ "frequency": -4 })),
            with("zero duration", json!({ "duration": 0 })),
            with("zero interval", json!({ "condition_value": 0 })),
            with("negative interval", json!({ "condition_value": -1.5 })),
            with("empty sequence", json!({ "action_type": "sequence", "sequence": [], "delay": 0.1 })),
            with("negative delay", json!({ "action_type": "sequence", "sequence": [[1, 1]], "delay": -0.1 })),
            with("   ", json!({})),
            with("walk", walk),
            base.clone(),
        ];
        fs::write(&path, json!({ "tasks": tasks, "selected_area": null }).to_string()).unwrap();

        let (macros, _) = load(&path).unwrap();
        let names: Vec<&str> = macros.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["walk", "ok"]);
        assert_eq!(
            macros[0].action,
            Action::Sequence { points: vec![Point::new(1, 1)], delay_seconds: 0.0 }
        );
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(ChicoError::ProfileFormat { .. })));
    }
}
