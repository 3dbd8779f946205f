use crossbeam_channel::Receiver;
use serde_derive::Serialize;

use crate::category::Category;
use crate::config::{Config, TrackerKind};
use crate::counters::{Counters, DirectionCounts, Totals};
use crate::crossing::{CrossingDetector, CrossingEvent, CrossingObserver};
use crate::error::Error;
use crate::line::CountingLine;
use crate::manager::TrackManager;
use crate::track::{TrackId, TrackView};
use crate::tracker::{CentroidTracker, ExternalTracker, MotTracker};
use crate::{Detection, Tracking};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stats {
    pub counters: Counters,
    pub totals: Totals,
    pub active_tracks: usize,
    pub crossed_tracks: usize,
    pub line_x: f32,
}

/// Track manager, counting line and crossing detector driven together once per frame.
pub struct BidirectionalCounter {
    tracks: TrackManager,
    line: CountingLine,
    crossing: CrossingDetector,
    event_capacity: usize,
}

impl BidirectionalCounter {
    /// Counter with the built-in centroid matcher. Fails if the config asks for an external
    /// tracker, use [`BidirectionalCounter::with_external`] for that.
    pub fn new(config: &Config) -> Result<Self, Error> {
        if config.tracker == TrackerKind::External {
            return Err(Error::Config(
                "external tracker selected but none was supplied".into(),
            ));
        }

        Self::with_strategy(config, Box::new(CentroidTracker::new(config.gating_distance)))
    }

    pub fn with_external<T>(config: &Config, tracker: T) -> Result<Self, Error>
    where
        T: MotTracker + Send + 'static,
    {
        Self::with_strategy(
            config,
            Box::new(ExternalTracker::new(tracker, config.default_category)),
        )
    }

    pub fn with_strategy(
        config: &Config,
        strategy: Box<dyn Tracking + Send>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let line = CountingLine::new(
            config.frame_width,
            config.frame_height,
            config.line_position,
        );

        tracing::info!(
            "bidirectional counter ready, line at x={} ({:?} tracker)",
            line.x(),
            config.tracker
        );

        Ok(Self {
            tracks: TrackManager::with_strategy(strategy)
                .history_len(config.history_len)
                .max_idle_frames(config.max_idle_frames),
            line,
            crossing: CrossingDetector::new(config.crossing_margin, &config.categories),
            event_capacity: config.event_capacity,
        })
    }

    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: CrossingObserver + Send + 'static,
    {
        self.crossing.add_observer(Box::new(observer));
    }

    /// Bounded feed of crossing events; once `event_capacity` events are pending further
    /// ones are dropped with a warning.
    pub fn subscribe(&mut self) -> Receiver<CrossingEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.event_capacity);
        self.crossing.add_observer(Box::new(tx));
        rx
    }

    /// Runs one frame: associate detections, then check every updated track for a crossing.
    /// Returns the active tracks paired with the detection that updated them.
    pub fn process(&mut self, detections: &[Detection]) -> Vec<(TrackId, Detection)> {
        self.process_with_events(detections).0
    }

    pub fn process_with_events(
        &mut self,
        detections: &[Detection],
    ) -> (Vec<(TrackId, Detection)>, Vec<CrossingEvent>) {
        let matched = self.tracks.update(detections);
        let frame = self.tracks.frame();
        let line_x = self.line.x();

        let events = matched
            .iter()
            .filter_map(|&(id, _)| {
                self.crossing
                    .check(id, self.tracks.get_mut(id), line_x, frame)
            })
            .collect();

        (matched, events)
    }

    /// Stale ids are ignored.
    pub fn check_track(&mut self, id: TrackId) -> Option<CrossingEvent> {
        let frame = self.tracks.frame();
        let line_x = self.line.x();

        self.crossing.check(id, self.tracks.get_mut(id), line_x, frame)
    }

    #[inline]
    pub fn counters(&self) -> Counters {
        self.crossing.counters().clone()
    }

    #[inline]
    pub fn category_counts(&self, category: Category) -> DirectionCounts {
        self.crossing.counters().get(category)
    }

    #[inline]
    pub fn totals(&self) -> Totals {
        self.crossing.counters().totals()
    }

    /// Zeroes every counter, forgets all tracks and restarts ids at 1.
    pub fn reset(&mut self) {
        self.crossing.reset();
        self.tracks.clear();
        tracing::info!("counters reset");
    }

    pub fn set_line_position(&mut self, relative: f64) {
        self.line.set_position(relative);
    }

    pub fn set_frame_dimensions(&mut self, width: u32, height: u32) {
        self.line.set_frame_dimensions(width, height);
    }

    #[inline]
    pub fn line(&self) -> &CountingLine {
        &self.line
    }

    #[inline]
    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    pub fn track_views(&self) -> Vec<TrackView> {
        self.tracks.views()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            counters: self.counters(),
            totals: self.totals(),
            active_tracks: self.tracks.len(),
            crossed_tracks: self.tracks.iter().filter(|t| t.has_crossed).count(),
            line_x: self.line.x(),
        }
    }
}
