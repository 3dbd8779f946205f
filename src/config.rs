use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::category::{Category, ClassMap};
use crate::crossing::DEFAULT_MARGIN;
use crate::error::Error;
use crate::manager::{DEFAULT_GATING_DISTANCE, DEFAULT_HISTORY_LEN};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Greedy nearest-centroid matcher, no external dependency.
    Builtin,
    /// Confirmed tracks come from an external multi-object tracker.
    External,
}

/// Where the counting happens. Entered by hand; nothing is looked up.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Location {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Relative x of the counting line, clamped to [0.1, 0.9].
    pub line_position: f64,
    /// Distance in px a track must move away from the line before it can count again.
    pub crossing_margin: f32,
    /// Max centroid distance in px for the built-in matcher.
    pub gating_distance: f32,
    pub history_len: usize,
    pub confidence_threshold: f32,
    pub categories: Vec<Category>,
    pub default_category: Category,
    pub tracker: TrackerKind,
    /// Age out never-crossed tracks after this many frames without an update.
    pub max_idle_frames: Option<u64>,
    pub class_map: Vec<(String, Category)>,
    pub location: Location,
    pub event_capacity: usize,
    pub idle_sleep_ms: u64,
    pub frame_sleep_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            line_position: 0.5,
            crossing_margin: DEFAULT_MARGIN,
            gating_distance: DEFAULT_GATING_DISTANCE,
            history_len: DEFAULT_HISTORY_LEN,
            confidence_threshold: 0.5,
            categories: Category::ALL.to_vec(),
            default_category: Category::Adult,
            tracker: TrackerKind::Builtin,
            max_idle_frames: None,
            class_map: default_class_map(),
            location: Location::default(),
            event_capacity: 256,
            idle_sleep_ms: 100,
            frame_sleep_ms: 10,
        }
    }
}

fn default_class_map() -> Vec<(String, Category)> {
    [
        ("person", Category::Adult),
        ("pedestrian", Category::Adult),
        ("child", Category::Child),
        ("children", Category::Child),
        ("wheelchair", Category::Wheelchair),
        ("bicycle", Category::Bicycle),
        ("bike", Category::Bicycle),
        ("mobility aid", Category::ReducedMobility),
        ("walker", Category::ReducedMobility),
        ("crutches", Category::ReducedMobility),
    ]
    .iter()
    .map(|(label, cat)| (label.to_string(), *cat))
    .collect()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.crossing_margin > 0.0) {
            return Err(Error::Config("crossing_margin must be positive".into()));
        }

        if !(self.gating_distance > 0.0) {
            return Err(Error::Config("gating_distance must be positive".into()));
        }

        if self.history_len < 2 {
            return Err(Error::Config("history_len must be at least 2".into()));
        }

        if !self.line_position.is_finite() {
            return Err(Error::Config("line_position must be finite".into()));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(
                "confidence_threshold must be within [0, 1]".into(),
            ));
        }

        if self.categories.is_empty() {
            return Err(Error::Config("at least one category is required".into()));
        }

        if !self.categories.contains(&self.default_category) {
            return Err(Error::Config(format!(
                "default category `{}` is not enabled",
                self.default_category
            )));
        }

        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }

        Ok(())
    }

    pub fn class_map(&self) -> ClassMap {
        ClassMap::new(
            self.class_map.iter().cloned(),
            self.categories.clone(),
            self.confidence_threshold,
        )
    }
}
