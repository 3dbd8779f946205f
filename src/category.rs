use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bbox::{BBox, Ltrb};
use crate::detection::{Detection, RawDetection};

/// Semantic class a track is counted under.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Adult,
    Child,
    Bicycle,
    Wheelchair,
    ReducedMobility,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Adult,
        Category::Child,
        Category::Bicycle,
        Category::Wheelchair,
        Category::ReducedMobility,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Adult => "adult",
            Category::Child => "child",
            Category::Bicycle => "bicycle",
            Category::Wheelchair => "wheelchair",
            Category::ReducedMobility => "reduced_mobility",
        }
    }

    /// Human readable label used in journal rows.
    #[inline]
    pub fn title(&self) -> &'static str {
        match self {
            Category::Adult => "Adult",
            Category::Child => "Child",
            Category::Bicycle => "Bicycle",
            Category::Wheelchair => "Wheelchair",
            Category::ReducedMobility => "Reduced_Mobility",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category `{}`", s))
    }
}

/// Maps free-form detector labels onto counted categories and drops everything else.
#[derive(Debug, Clone)]
pub struct ClassMap {
    entries: Vec<(String, Category)>,
    enabled: Vec<Category>,
    confidence_threshold: f32,
}

impl ClassMap {
    pub fn new(
        entries: impl IntoIterator<Item = (String, Category)>,
        enabled: Vec<Category>,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(label, cat)| (label.to_lowercase(), cat))
                .collect(),
            enabled,
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        if threshold.is_finite() {
            self.confidence_threshold = threshold.clamp(0.0, 1.0);
            tracing::info!("confidence threshold set to {:.2}", self.confidence_threshold);
        }
    }

    /// Exact match first, then substring containment either way.
    pub fn lookup(&self, label: &str) -> Option<Category> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }

        let found = self
            .entries
            .iter()
            .find(|(key, _)| *key == label)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| key.contains(&label) || label.contains(key.as_str()))
            })
            .map(|(_, cat)| *cat)?;

        if self.enabled.contains(&found) {
            Some(found)
        } else {
            None
        }
    }

    pub fn classify(&self, raw: &RawDetection) -> Option<Detection> {
        if !raw.bbox.is_finite() || raw.bbox.is_degenerate() {
            tracing::debug!("dropping malformed detection {:?}", raw.bbox);
            return None;
        }

        if !(raw.confidence >= self.confidence_threshold) {
            return None;
        }

        match self.lookup(&raw.label) {
            Some(category) => Some(Detection::new(raw.bbox, category, raw.confidence)),
            None => {
                tracing::debug!("dropping unmapped label `{}`", raw.label);
                None
            }
        }
    }

    pub fn classify_all(&self, raw: &[RawDetection]) -> Vec<Detection> {
        raw.iter().filter_map(|r| self.classify(r)).collect()
    }
}

/// Rough child/adult split for generic "person" detections: boxes shorter than 30% of
/// the frame height are taken to be children.
pub fn estimate_age(bbox: &BBox<Ltrb>, frame_height: u32) -> Category {
    if frame_height == 0 {
        return Category::Adult;
    }

    if bbox.height() / (frame_height as f32) < 0.3 {
        Category::Child
    } else {
        Category::Adult
    }
}
