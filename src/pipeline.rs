//! Threaded driver: capture, detect, track and count on one worker thread, with a
//! snapshot of the results handed to whoever is presenting them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde_derive::Serialize;

use crate::category::ClassMap;
use crate::config::Config;
use crate::counter::{BidirectionalCounter, Stats};
use crate::counters::{Counters, Totals};
use crate::detection::RawDetection;
use crate::error::Error;
use crate::track::TrackView;

/// A captured frame together with its pixel dimensions.
pub struct Captured<F> {
    pub frame: F,
    pub width: u32,
    pub height: u32,
}

pub trait FrameSource: Send {
    type Frame;

    /// `Ok(None)` means the stream is over.
    ///
    /// Stop requests are only seen between reads, so a source that can block for long
    /// should time out and return an error now and then.
    fn read(&mut self) -> Result<Option<Captured<Self::Frame>>, Error>;
}

pub trait Detector<F>: Send {
    fn detect(&mut self, frame: &F) -> Result<Vec<RawDetection>, Error>;
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub frame: u64,
    pub counters: Counters,
    pub totals: Totals,
    pub line_x: f32,
    pub tracks: Vec<TrackView>,
    pub fps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Reset,
    SetLinePosition(f64),
    SetConfidence(f32),
}

/// Frames per second, refreshed once a second.
#[derive(Debug)]
pub struct FpsMeter {
    frames: u32,
    since: Instant,
    fps: f64,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
            fps: 0.0,
        }
    }

    pub fn tick(&mut self) -> f64 {
        self.frames += 1;

        let elapsed = self.since.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.fps = self.frames as f64 / elapsed;
            self.frames = 0;
            self.since = Instant::now();
        }

        self.fps
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    paused: AtomicBool,
    stop: AtomicBool,
    snapshot: Mutex<Option<Snapshot>>,
}

struct Worker<S: FrameSource, D> {
    source: S,
    detector: D,
    counter: BidirectionalCounter,
    class_map: ClassMap,
    shared: Arc<Shared>,
    commands: Receiver<Command>,
    fps: FpsMeter,
    frames: u64,
    idle: Duration,
    pace: Duration,
}

impl<S, D> Worker<S, D>
where
    S: FrameSource,
    D: Detector<S::Frame>,
{
    fn run(mut self) -> Stats {
        tracing::info!("processing loop started");

        while !self.shared.stop.load(Ordering::SeqCst) {
            if self.apply_commands() {
                self.publish();
            }

            if self.shared.paused.load(Ordering::SeqCst) {
                thread::sleep(self.idle);
                continue;
            }

            let captured = match self.source.read() {
                Ok(Some(captured)) => captured,
                Ok(None) => {
                    tracing::info!("frame source exhausted");
                    break;
                }
                Err(err) => {
                    tracing::warn!("failed to read frame: {}", err);
                    thread::sleep(self.idle);
                    continue;
                }
            };

            self.process(captured);

            if !self.pace.is_zero() {
                thread::sleep(self.pace);
            }
        }

        tracing::info!("processing loop finished after {} frames", self.frames);
        self.counter.stats()
    }

    fn process(&mut self, captured: Captured<S::Frame>) {
        if self.counter.line().dims() != (captured.width, captured.height) {
            self.counter
                .set_frame_dimensions(captured.width, captured.height);
        }

        let raw = match self.detector.detect(&captured.frame) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!("detector failed on frame {}: {}", self.frames + 1, err);
                Vec::new()
            }
        };

        let detections = self.class_map.classify_all(&raw);
        self.counter.process(&detections);

        self.frames += 1;
        self.fps.tick();
        self.publish();
    }

    fn apply_commands(&mut self) -> bool {
        let mut applied = false;

        for cmd in self.commands.try_iter() {
            match cmd {
                Command::Reset => self.counter.reset(),
                Command::SetLinePosition(pos) => self.counter.set_line_position(pos),
                Command::SetConfidence(th) => self.class_map.set_confidence_threshold(th),
            }
            applied = true;
        }

        applied
    }

    fn publish(&self) {
        let snapshot = Snapshot {
            frame: self.frames,
            counters: self.counter.counters(),
            totals: self.counter.totals(),
            line_x: self.counter.line().x(),
            tracks: self.counter.track_views(),
            fps: self.fps.fps(),
        };

        *self.shared.snapshot.lock() = Some(snapshot);
    }
}

pub struct Pipeline;

impl Pipeline {
    pub fn spawn<S, D>(
        config: &Config,
        source: S,
        detector: D,
        counter: BidirectionalCounter,
    ) -> Result<PipelineHandle, Error>
    where
        S: FrameSource + 'static,
        D: Detector<S::Frame> + 'static,
    {
        config.validate()?;

        let shared = Arc::new(Shared {
            paused: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            snapshot: Mutex::new(None),
        });

        let (tx, rx) = crossbeam_channel::unbounded();

        let worker = Worker {
            source,
            detector,
            counter,
            class_map: config.class_map(),
            shared: shared.clone(),
            commands: rx,
            fps: FpsMeter::new(),
            frames: 0,
            idle: Duration::from_millis(config.idle_sleep_ms),
            pace: Duration::from_millis(config.frame_sleep_ms),
        };

        let handle = thread::Builder::new()
            .name("linecount-worker".into())
            .spawn(move || worker.run())?;

        Ok(PipelineHandle {
            shared,
            commands: tx,
            worker: Some(handle),
        })
    }
}

/// Control surface of a running [`Pipeline`]. Dropping it asks the worker to stop; the
/// worker is joined only if it has already finished, otherwise it is left to wind down on
/// its own. Use [`PipelineHandle::join`] to wait.
pub struct PipelineHandle {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<Stats>>,
}

impl PipelineHandle {
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
        tracing::info!("processing paused");
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
        tracing::info!("processing resumed");
    }

    /// Returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.shared.paused.fetch_xor(true, Ordering::SeqCst);
        tracing::info!("processing {}", if paused { "paused" } else { "resumed" });
        paused
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.send(Command::Reset);
    }

    pub fn set_line_position(&self, relative: f64) {
        self.send(Command::SetLinePosition(relative));
    }

    pub fn set_confidence_threshold(&self, threshold: f32) {
        self.send(Command::SetConfidence(threshold));
    }

    fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            tracing::debug!("worker gone, dropping {:?}", cmd);
        }
    }

    /// Latest published state, `None` until the first frame is processed.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.shared.snapshot.lock().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Asks the worker to stop after the frame it is on.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the worker and returns the final counts.
    pub fn join(mut self) -> Result<Stats, Error> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| Error::Worker("processing thread panicked".into())),
            None => Err(Error::Worker("already joined".into())),
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop();

            if worker.is_finished() {
                let _ = worker.join();
            } else {
                tracing::debug!("worker still busy, detaching");
            }
        }
    }
}
