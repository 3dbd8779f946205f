use nalgebra as na;
use serde_derive::Serialize;

use crate::bbox::{BBox, Ltrb};
use crate::category::Category;
use crate::circular_queue::CircularQueue;
use crate::Detection;

pub type TrackId = u32;

/// Side of the counting line a track was last resolved to.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub category: Category,
    pub history: CircularQueue<na::Point2<f32>>,
    pub bbox: BBox<Ltrb>,

    // at least one crossing registered since creation
    pub has_crossed: bool,
    // armed; cleared by a crossing, re-armed once beyond the margin
    pub can_cross: bool,
    pub last_side: Side,

    pub frames_seen: u32,
    // frame index of the last update
    pub last_seen: u64,
}

impl Track {
    pub fn new(id: TrackId, det: &Detection, frame: u64, history_len: usize) -> Self {
        let mut history = CircularQueue::with_capacity(history_len);
        history.push(det.centroid());

        Self {
            id,
            category: det.category,
            history,
            bbox: det.bbox(),
            has_crossed: false,
            can_cross: true,
            last_side: Side::None,
            frames_seen: 1,
            last_seen: frame,
        }
    }

    pub fn update(&mut self, det: &Detection, frame: u64) {
        self.category = det.category;
        self.bbox = det.bbox();
        self.history.push(det.centroid());
        self.frames_seen += 1;
        self.last_seen = frame;
    }

    #[inline]
    pub fn position(&self) -> Option<na::Point2<f32>> {
        self.history.latest().copied()
    }

    /// `(previous x, current x)` once two samples exist.
    #[inline]
    pub fn last_step_x(&self) -> Option<(f32, f32)> {
        Some((self.history.previous()?.x, self.history.latest()?.x))
    }
}

/// Read-only view of a track handed to presentation code.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackView {
    pub id: TrackId,
    pub category: Category,
    pub x: f32,
    pub y: f32,
    pub bbox: BBox<Ltrb>,
    pub has_crossed: bool,
    pub last_side: Side,
    pub frames_seen: u32,
}

impl From<&Track> for TrackView {
    fn from(t: &Track) -> TrackView {
        let pos = t.position().unwrap_or_else(na::Point2::origin);

        TrackView {
            id: t.id,
            category: t.category,
            x: pos.x,
            y: pos.y,
            bbox: t.bbox,
            has_crossed: t.has_crossed,
            last_side: t.last_side,
            frames_seen: t.frames_seen,
        }
    }
}
