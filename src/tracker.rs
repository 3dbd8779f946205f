use std::collections::{BTreeMap, HashSet};

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::category::Category;
use crate::error::Error;
use crate::track::{Track, TrackId};
use crate::{Association, Detection, Tracking};

/// Built-in association: greedy nearest centroid within a gating distance, same category only.
#[derive(Debug, Clone)]
pub struct CentroidTracker {
    gating_distance: f32,
}

impl CentroidTracker {
    pub fn new(gating_distance: f32) -> Self {
        Self { gating_distance }
    }

    fn nearest(
        &self,
        det: &Detection,
        tracks: &BTreeMap<TrackId, Track>,
        claimed: &HashSet<TrackId>,
    ) -> Option<TrackId> {
        let pos = det.centroid();
        let mut best: Option<(TrackId, f32)> = None;

        for (&id, track) in tracks {
            if track.category != det.category || claimed.contains(&id) {
                continue;
            }

            let last = match track.position() {
                Some(p) => p,
                None => continue,
            };

            let dist = na::distance(&last, &pos);
            if dist < self.gating_distance && best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }

        best.map(|(id, _)| id)
    }
}

impl Tracking for CentroidTracker {
    fn update(
        &mut self,
        detections: &[Detection],
        tracks: &BTreeMap<TrackId, Track>,
    ) -> Vec<Association> {
        let mut claimed = HashSet::with_capacity(detections.len());

        detections
            .iter()
            .map(|det| {
                let track_id = self.nearest(det, tracks, &claimed);
                if let Some(id) = track_id {
                    claimed.insert(id);
                }

                Association {
                    track_id,
                    detection: *det,
                }
            })
            .collect()
    }
}

/// A track confirmed by an external multi-object tracker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedTrack {
    pub id: TrackId,
    pub bbox: BBox<Ltrb>,
    pub category: Option<Category>,
}

/// Interface of an appearance/motion tracker (DeepSORT and the like). Implementations are
/// expected to apply their own age/hit confirmation and only return confirmed tracks.
pub trait MotTracker {
    fn update_tracks(&mut self, detections: &[Detection]) -> Result<Vec<ConfirmedTrack>, Error>;

    fn reset(&mut self) {}
}

/// Adapts a [`MotTracker`] to [`Tracking`]. Tracker failures are logged and turned into an
/// empty frame.
pub struct ExternalTracker<T> {
    inner: T,
    default_category: Category,
}

impl<T: MotTracker> ExternalTracker<T> {
    pub fn new(inner: T, default_category: Category) -> Self {
        Self {
            inner,
            default_category,
        }
    }
}

impl<T: MotTracker> Tracking for ExternalTracker<T> {
    fn update(
        &mut self,
        detections: &[Detection],
        _tracks: &BTreeMap<TrackId, Track>,
    ) -> Vec<Association> {
        let confirmed = match self.inner.update_tracks(detections) {
            Ok(confirmed) => confirmed,
            Err(err) => {
                tracing::warn!("external tracker failed, skipping frame: {}", err);
                return Vec::new();
            }
        };

        confirmed
            .into_iter()
            .filter(|t| t.bbox.is_finite())
            .map(|t| Association {
                track_id: Some(t.id),
                detection: Detection::new(
                    t.bbox,
                    t.category.unwrap_or(self.default_category),
                    0.0,
                ),
            })
            .collect()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
