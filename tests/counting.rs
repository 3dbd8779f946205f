use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use linecount::bbox::BBox;
use linecount::pipeline::{Captured, Detector, FrameSource, Pipeline, PipelineHandle, Snapshot};
use linecount::tracker::{ConfirmedTrack, MotTracker};
use linecount::{
    BidirectionalCounter, Category, Config, CrossingEvent, Detection, Direction, Error,
    RawDetection,
};

fn config() -> Config {
    Config {
        frame_width: 300,
        frame_height: 200,
        line_position: 0.5,
        idle_sleep_ms: 1,
        frame_sleep_ms: 0,
        ..Config::default()
    }
}

fn counter() -> BidirectionalCounter {
    BidirectionalCounter::new(&config()).unwrap()
}

fn adult(x: f32) -> Detection {
    Detection::at(x, 100.0, Category::Adult)
}

fn walk(c: &mut BidirectionalCounter, xs: &[f32]) -> Vec<CrossingEvent> {
    xs.iter()
        .flat_map(|&x| c.process_with_events(&[adult(x)]).1)
        .collect()
}

#[test]
fn crossing_left_to_right() {
    let mut c = counter();
    assert_eq!(c.line().x(), 150.0);

    c.process(&[adult(100.0)]);
    assert_eq!(c.totals().total, 0);

    let (matched, events) = c.process_with_events(&[adult(190.0)]);
    assert_eq!(matched[0].0, 1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::LeftToRight);
    assert_eq!(events[0].track_id, 1);

    let counts = c.category_counts(Category::Adult);
    assert_eq!(counts.left_to_right, 1);
    assert_eq!(counts.right_to_left, 0);
    assert_eq!(c.totals().total, 1);
}

#[test]
fn crossing_right_to_left() {
    let mut c = counter();
    let events = walk(&mut c, &[200.0, 120.0]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::RightToLeft);
    assert_eq!(c.category_counts(Category::Adult).right_to_left, 1);
}

#[test]
fn jitter_at_the_line_counts_once() {
    let mut c = counter();
    let events = walk(&mut c, &[140.0, 150.0, 145.0, 155.0, 148.0, 152.0]);

    assert_eq!(events.len(), 1);
    assert_eq!(c.totals().total, 1);
}

#[test]
fn leaving_the_margin_rearms() {
    let mut c = counter();
    let events = walk(&mut c, &[100.0, 190.0, 200.0, 120.0]);

    let dirs: Vec<_> = events.iter().map(|e| e.direction).collect();
    assert_eq!(dirs, vec![Direction::LeftToRight, Direction::RightToLeft]);
    assert_eq!(c.totals().left_to_right, 1);
    assert_eq!(c.totals().right_to_left, 1);
    assert_eq!(c.totals().total, 2);
}

#[test]
fn totals_add_up_across_categories() {
    let mut c = counter();

    c.process(&[
        adult(100.0),
        Detection::at(200.0, 20.0, Category::Bicycle),
        Detection::at(100.0, 180.0, Category::Wheelchair),
    ]);
    c.process(&[
        adult(170.0),
        Detection::at(110.0, 20.0, Category::Bicycle),
        Detection::at(180.0, 180.0, Category::Wheelchair),
    ]);

    let totals = c.totals();
    let sum: u64 = c.counters().iter().map(|(_, d)| d.total()).sum();

    assert_eq!(totals.total, 3);
    assert_eq!(totals.left_to_right + totals.right_to_left, totals.total);
    assert_eq!(sum, totals.total);
    assert_eq!(c.category_counts(Category::Bicycle).right_to_left, 1);
}

#[test]
fn reset_clears_counts_and_ids() {
    let mut c = counter();
    walk(&mut c, &[100.0, 190.0]);

    c.reset();
    let first = c.stats();
    c.reset();

    assert_eq!(c.stats(), first);
    assert_eq!(first.totals.total, 0);
    assert_eq!(first.active_tracks, 0);
    assert_eq!(first.counters.iter().count(), Category::ALL.len());

    let matched = c.process(&[adult(20.0)]);
    assert_eq!(matched[0].0, 1);
}

#[test]
fn crossed_tracks_leave_when_unmatched() {
    let mut c = counter();
    walk(&mut c, &[100.0, 190.0]);

    // an empty frame keeps everything
    c.process(&[]);
    assert_eq!(c.tracks().len(), 1);

    let matched = c.process(&[Detection::at(20.0, 20.0, Category::Bicycle)]);
    assert_eq!(matched[0].0, 2);
    assert!(c.tracks().get(1).is_none());
    assert_eq!(c.tracks().len(), 1);
}

#[test]
fn uncrossed_tracks_persist_by_default() {
    let mut c = counter();
    c.process(&[adult(20.0)]);

    for _ in 0..20 {
        c.process(&[Detection::at(280.0, 20.0, Category::Bicycle)]);
    }

    assert!(c.tracks().get(1).is_some());
    assert_eq!(c.tracks().len(), 2);
}

#[test]
fn idle_tracks_age_out_when_configured() {
    let mut c = BidirectionalCounter::new(&Config {
        max_idle_frames: Some(2),
        ..config()
    })
    .unwrap();

    c.process(&[adult(20.0)]);
    c.process(&[Detection::at(280.0, 20.0, Category::Bicycle)]);
    c.process(&[Detection::at(280.0, 20.0, Category::Bicycle)]);
    assert!(c.tracks().get(1).is_some());

    c.process(&[Detection::at(280.0, 20.0, Category::Bicycle)]);
    assert!(c.tracks().get(1).is_none());
}

#[test]
fn line_position_is_clamped() {
    let mut c = counter();

    c.set_line_position(0.95);
    assert_eq!(c.line().relative(), 0.9);
    assert_eq!(c.line().x(), 270.0);

    c.set_line_position(0.05);
    assert_eq!(c.line().x(), 30.0);

    c.set_frame_dimensions(600, 400);
    assert_eq!(c.line().x(), 60.0);
}

#[test]
fn observers_see_every_crossing() {
    let (tx, rx) = crossbeam_channel::bounded(8);
    let mut c = counter();
    c.add_observer(tx);

    walk(&mut c, &[100.0, 190.0, 200.0, 120.0]);

    let got: Vec<_> = rx.try_iter().map(|e| (e.track_id, e.direction)).collect();
    assert_eq!(
        got,
        vec![(1, Direction::LeftToRight), (1, Direction::RightToLeft)]
    );
}

struct Scripted {
    frames: std::vec::IntoIter<Vec<ConfirmedTrack>>,
}

impl MotTracker for Scripted {
    fn update_tracks(&mut self, _: &[Detection]) -> Result<Vec<ConfirmedTrack>, Error> {
        Ok(self.frames.next().unwrap_or_default())
    }

    fn reset(&mut self) {
        self.frames = Vec::new().into_iter();
    }
}

fn confirmed(id: u32, cx: f32, category: Option<Category>) -> ConfirmedTrack {
    ConfirmedTrack {
        id,
        bbox: BBox::ltrb(cx - 10.0, 80.0, cx + 10.0, 120.0),
        category,
    }
}

#[test]
fn external_tracker_ids_drive_counting() {
    let tracker = Scripted {
        frames: vec![
            vec![confirmed(7, 100.0, None)],
            vec![confirmed(7, 190.0, None), confirmed(9, 20.0, Some(Category::Bicycle))],
        ]
        .into_iter(),
    };

    let mut c = BidirectionalCounter::with_external(&config(), tracker).unwrap();

    // detections only need to be non-empty; the tracker decides the tracks
    c.process(&[adult(0.0)]);
    let (matched, events) = c.process_with_events(&[adult(0.0)]);

    assert_eq!(matched.len(), 2);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, 7);
    assert_eq!(events[0].category, Category::Adult);
    assert_eq!(c.category_counts(Category::Adult).left_to_right, 1);

    c.reset();
    assert!(c.tracks().is_empty());
    assert!(c.process(&[adult(0.0)]).is_empty());
}

#[test]
fn external_tracker_disabled_category_is_not_counted() {
    let tracker = Scripted {
        frames: vec![
            vec![confirmed(3, 100.0, Some(Category::Bicycle)), confirmed(4, 100.0, None)],
            vec![confirmed(3, 190.0, Some(Category::Bicycle)), confirmed(4, 190.0, None)],
        ]
        .into_iter(),
    };

    let cfg = Config {
        categories: vec![Category::Adult],
        ..config()
    };
    let mut c = BidirectionalCounter::with_external(&cfg, tracker).unwrap();
    let (tx, rx) = crossbeam_channel::bounded(8);
    c.add_observer(tx);

    c.process(&[adult(0.0)]);
    let (_, events) = c.process_with_events(&[adult(0.0)]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, 4);
    assert_eq!(rx.try_iter().count(), 1);

    assert_eq!(c.category_counts(Category::Bicycle).total(), 0);
    assert_eq!(c.totals().total, 1);
    assert_eq!(c.counters().iter().count(), 1);
    assert!(c.tracks().get(3).map_or(false, |t| t.has_crossed));
}

struct Feed(Receiver<Vec<RawDetection>>);

impl FrameSource for Feed {
    type Frame = Vec<RawDetection>;

    fn read(&mut self) -> Result<Option<Captured<Self::Frame>>, Error> {
        Ok(self.0.recv().ok().map(|frame| Captured {
            frame,
            width: 300,
            height: 200,
        }))
    }
}

struct Passthrough;

impl Detector<Vec<RawDetection>> for Passthrough {
    fn detect(&mut self, frame: &Vec<RawDetection>) -> Result<Vec<RawDetection>, Error> {
        if frame.iter().any(|d| d.label == "boom") {
            return Err(Error::Detector("inference failed".into()));
        }
        Ok(frame.clone())
    }
}

fn raw(label: &str, cx: f32, confidence: f32) -> RawDetection {
    RawDetection {
        bbox: BBox::ltrb(cx - 10.0, 50.0, cx + 10.0, 150.0),
        label: label.into(),
        confidence,
    }
}

fn wait_for(handle: &PipelineHandle, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        if let Some(s) = handle.snapshot() {
            if pred(&s) {
                return s;
            }
        }

        assert!(Instant::now() < deadline, "pipeline did not reach expected state");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn pipeline_counts_and_takes_commands() {
    let cfg = config();
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = Pipeline::spawn(&cfg, Feed(rx), Passthrough, counter()).unwrap();

    tx.send(vec![raw("person", 100.0, 0.9), raw("bike", 200.0, 0.9)]).unwrap();
    tx.send(vec![raw("person", 190.0, 0.9), raw("bike", 120.0, 0.9)]).unwrap();

    let s = wait_for(&handle, |s| s.frame == 2);
    assert_eq!(s.totals.total, 2);
    assert_eq!(s.counters.get(Category::Bicycle).right_to_left, 1);
    assert_eq!(s.tracks.len(), 2);

    // a failing detector yields an empty frame, not a dead loop
    tx.send(vec![raw("boom", 0.0, 1.0)]).unwrap();
    wait_for(&handle, |s| s.frame == 3);

    handle.reset_counters();
    handle.set_line_position(0.2);
    tx.send(vec![]).unwrap();

    let s = wait_for(&handle, |s| s.totals.total == 0 && s.line_x == 60.0);
    assert!(s.tracks.is_empty());

    // below the confidence threshold nothing is tracked
    tx.send(vec![raw("person", 100.0, 0.2)]).unwrap();
    wait_for(&handle, |s| s.frame == 5);
    assert!(handle.snapshot().unwrap().tracks.is_empty());

    drop(tx);
    let stats = handle.join().unwrap();
    assert_eq!(stats.totals.total, 0);
    assert_eq!(stats.line_x, 60.0);
}

#[test]
fn pipeline_pause_toggles() {
    let (tx, rx) = crossbeam_channel::unbounded::<Vec<RawDetection>>();
    let handle = Pipeline::spawn(&config(), Feed(rx), Passthrough, counter()).unwrap();

    assert!(!handle.is_paused());
    assert!(handle.toggle_pause());
    assert!(handle.is_paused());
    assert!(!handle.toggle_pause());

    handle.pause();
    handle.resume();
    assert!(!handle.is_paused());

    drop(tx);
    let stats = handle.join().unwrap();
    assert_eq!(stats.totals.total, 0);
}
