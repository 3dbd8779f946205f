use std::collections::{BTreeMap, BTreeSet};

use crate::track::{Track, TrackId, TrackView};
use crate::tracker::CentroidTracker;
use crate::{Detection, Tracking};

pub const DEFAULT_HISTORY_LEN: usize = 50;
pub const DEFAULT_GATING_DISTANCE: f32 = 100.0;

/// Owns every live track and turns per-frame detections into track updates through the
/// configured association strategy.
pub struct TrackManager {
    strategy: Box<dyn Tracking + Send>,
    tracks: BTreeMap<TrackId, Track>,
    next_id: TrackId,
    frame: u64,
    history_len: usize,
    max_idle_frames: Option<u64>,
}

impl TrackManager {
    pub fn new() -> Self {
        Self::with_strategy(Box::new(CentroidTracker::new(DEFAULT_GATING_DISTANCE)))
    }

    pub fn with_strategy(strategy: Box<dyn Tracking + Send>) -> Self {
        Self {
            strategy,
            tracks: BTreeMap::new(),
            next_id: 1,
            frame: 0,
            history_len: DEFAULT_HISTORY_LEN,
            max_idle_frames: None,
        }
    }

    pub fn history_len(mut self, len: usize) -> Self {
        self.history_len = len.max(2);
        self
    }

    /// Age out never-crossed tracks not updated for more than `frames` frames.
    pub fn max_idle_frames(mut self, frames: Option<u64>) -> Self {
        self.max_idle_frames = frames;
        self
    }

    pub fn update(&mut self, detections: &[Detection]) -> Vec<(TrackId, Detection)> {
        self.frame += 1;

        let detections: Vec<Detection> = detections
            .iter()
            .filter(|d| d.is_finite())
            .copied()
            .collect();

        if detections.is_empty() {
            self.evict_idle();
            return Vec::new();
        }

        let associations = self.strategy.update(&detections, &self.tracks);

        let mut seen = BTreeSet::new();
        let mut matched = Vec::with_capacity(associations.len());

        for assoc in associations {
            let id = match assoc.track_id.or_else(|| self.allocate_id()) {
                Some(id) => id,
                None => {
                    tracing::warn!("track ids exhausted, dropping detection");
                    continue;
                }
            };

            if !seen.insert(id) {
                tracing::debug!("track {} reported twice in frame {}", id, self.frame);
                continue;
            }

            match self.tracks.get_mut(&id) {
                Some(track) => track.update(&assoc.detection, self.frame),
                None => {
                    self.next_id = self.next_id.max(id.checked_add(1).unwrap_or(TrackId::MAX));
                    self.tracks.insert(
                        id,
                        Track::new(id, &assoc.detection, self.frame, self.history_len),
                    );
                }
            }

            matched.push((id, assoc.detection));
        }

        self.tracks
            .retain(|id, track| seen.contains(id) || !track.has_crossed);
        self.evict_idle();

        matched
    }

    fn evict_idle(&mut self) {
        if let Some(max_idle) = self.max_idle_frames {
            let frame = self.frame;

            self.tracks.retain(|id, track| {
                let keep = frame - track.last_seen <= max_idle;
                if !keep {
                    tracing::debug!("track {} idle for {} frames, evicted", id, frame - track.last_seen);
                }
                keep
            });
        }
    }

    /// `None` once the id space is used up; `TrackId::MAX` is never handed out.
    #[inline]
    fn allocate_id(&mut self) -> Option<TrackId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;
        Some(id)
    }

    /// Drops all tracks and restarts ids at 1.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
        self.frame = 0;
        self.strategy.reset();
    }

    #[inline]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn views(&self) -> Vec<TrackView> {
        self.tracks.values().map(Into::into).collect()
    }
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new()
    }
}
