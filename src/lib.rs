pub mod bbox;
pub mod category;
pub mod config;
pub mod counter;
pub mod counters;
pub mod crossing;
pub mod detection;
pub mod error;
pub mod journal;
pub mod line;
pub mod manager;
pub mod pipeline;
pub mod track;
pub mod tracker;

mod circular_queue;

pub use category::{Category, ClassMap};
pub use config::Config;
pub use counter::{BidirectionalCounter, Stats};
pub use counters::{Counters, Direction, DirectionCounts, Totals};
pub use crossing::{CrossingEvent, CrossingObserver};
pub use detection::{Detection, RawDetection};
pub use error::Error;
pub use track::{Track, TrackId};

use std::collections::BTreeMap;

/// One detection of the current frame together with the track it belongs to. `None` asks
/// the manager to open a new track.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub track_id: Option<TrackId>,
    pub detection: Detection,
}

/// Association step: decides, for every detection of a frame, which existing track (if any)
/// it continues.
pub trait Tracking {
    fn update(
        &mut self,
        detections: &[Detection],
        tracks: &BTreeMap<TrackId, Track>,
    ) -> Vec<Association>;

    /// Drops any state kept between frames.
    fn reset(&mut self) {}
}
