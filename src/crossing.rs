use crossbeam_channel::{Sender, TrySendError};
use serde_derive::Serialize;

use crate::category::Category;
use crate::counters::{Counters, Direction, DirectionCounts, Totals};
use crate::track::{Side, Track, TrackId};

pub const DEFAULT_MARGIN: f32 = 30.0;

/// Emitted once per counted crossing, in the order crossings are found within a frame.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub category: Category,
    pub direction: Direction,
    pub frame: u64,
    // counts of `category` right after this crossing
    pub counts: DirectionCounts,
    pub totals: Totals,
}

pub trait CrossingObserver {
    fn on_crossing(&mut self, event: &CrossingEvent);
}

impl<F> CrossingObserver for F
where
    F: FnMut(&CrossingEvent),
{
    #[inline]
    fn on_crossing(&mut self, event: &CrossingEvent) {
        self(event)
    }
}

impl CrossingObserver for Sender<CrossingEvent> {
    fn on_crossing(&mut self, event: &CrossingEvent) {
        match self.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                tracing::warn!("crossing channel full, dropping event for track {}", ev.track_id)
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("crossing channel closed")
            }
        }
    }
}

/// Decides when a track's centroid passes the counting line and keeps the directional
/// counters. A pass is counted once; the track is re-armed only after it moves more than
/// `margin` pixels away from the line.
pub struct CrossingDetector {
    margin: f32,
    counters: Counters,
    observers: Vec<Box<dyn CrossingObserver + Send>>,
}

impl CrossingDetector {
    pub fn new(margin: f32, categories: &[Category]) -> Self {
        Self {
            margin,
            counters: Counters::new(categories),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn CrossingObserver + Send>) {
        self.observers.push(observer);
    }

    #[inline]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn reset(&mut self) {
        self.counters.reset();
    }

    /// Evaluates the last step of `track` against `line_x`. `None` for a track that no longer
    /// exists is a no-op.
    pub fn check(
        &mut self,
        id: TrackId,
        track: Option<&mut Track>,
        line_x: f32,
        frame: u64,
    ) -> Option<CrossingEvent> {
        let track = match track {
            Some(t) => t,
            None => {
                tracing::debug!("crossing check for unknown track {}", id);
                return None;
            }
        };

        let (prev_x, cur_x) = track.last_step_x()?;

        if prev_x < line_x && cur_x >= line_x {
            if track.can_cross {
                track.can_cross = false;
                track.last_side = Side::Right;
                return self.register(track, Direction::LeftToRight, frame);
            }
        } else if prev_x > line_x && cur_x <= line_x {
            if track.can_cross {
                track.can_cross = false;
                track.last_side = Side::Left;
                return self.register(track, Direction::RightToLeft, frame);
            }
        } else if !track.can_cross && (cur_x - line_x).abs() > self.margin {
            track.can_cross = true;
        }

        None
    }

    /// Crossings of a category without a counter mark the track but are not reported.
    fn register(
        &mut self,
        track: &mut Track,
        direction: Direction,
        frame: u64,
    ) -> Option<CrossingEvent> {
        track.has_crossed = true;

        let counts = match self.counters.increment(track.category, direction) {
            Some(counts) => counts,
            None => {
                tracing::debug!(
                    "track {} crossed as disabled category {}, not counted",
                    track.id,
                    track.category
                );
                return None;
            }
        };
        let event = CrossingEvent {
            track_id: track.id,
            category: track.category,
            direction,
            frame,
            counts,
            totals: self.counters.totals(),
        };

        tracing::info!(
            "crossing: {} {:?} (track {})",
            event.category,
            event.direction,
            event.track_id
        );

        for obs in &mut self.observers {
            obs.on_crossing(&event);
        }

        Some(event)
    }
}
