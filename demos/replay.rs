//! Replays a dump of detections (`<ts>:<json array>` per line) through the counter and
//! prints the final counts. Crossings are journaled as JSON lines.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use linecount::journal::Journal;
use linecount::pipeline::{Captured, Detector, FrameSource, Pipeline};
use linecount::{BidirectionalCounter, Config, RawDetection};

#[derive(Parser, Debug)]
#[command(about = "Count line crossings in a recorded detection dump")]
struct Args {
    /// Detections file, one `<ts>:<json>` line per frame
    input: PathBuf,

    /// YAML config, defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to append crossing records, stdout when omitted
    #[arg(short, long)]
    journal: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Relative line position in [0.1, 0.9]
    #[arg(long)]
    line: Option<f64>,
}

struct DumpSource {
    lines: Lines<BufReader<File>>,
    width: u32,
    height: u32,
}

impl FrameSource for DumpSource {
    type Frame = Vec<RawDetection>;

    fn read(&mut self) -> Result<Option<Captured<Self::Frame>>, linecount::Error> {
        loop {
            let line = match self.lines.next() {
                Some(line) => line?,
                None => return Ok(None),
            };

            let Some((ts, vector)) = line.split_once(':') else {
                tracing::warn!("wrong file format: expected `:`");
                continue;
            };

            if ts.trim().parse::<u64>().is_err() {
                tracing::warn!("wrong file format: bad timestamp `{}`", ts);
                continue;
            }

            let frame = serde_json::from_str(vector)?;

            return Ok(Some(Captured {
                frame,
                width: self.width,
                height: self.height,
            }));
        }
    }
}

/// Detections are already in the dump.
struct Recorded;

impl Detector<Vec<RawDetection>> for Recorded {
    fn detect(&mut self, frame: &Vec<RawDetection>) -> Result<Vec<RawDetection>, linecount::Error> {
        Ok(frame.clone())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(w) = args.width {
        config.frame_width = w;
    }
    if let Some(h) = args.height {
        config.frame_height = h;
    }
    if let Some(l) = args.line {
        config.line_position = l;
    }
    config.frame_sleep_ms = 0;

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    let source = DumpSource {
        lines: BufReader::new(file).lines(),
        width: config.frame_width,
        height: config.frame_height,
    };

    let sink: Box<dyn Write + Send> = match &args.journal {
        Some(path) => Box::new(
            File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open journal {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };

    let journal = Journal::new(sink, config.location.clone());
    tracing::info!("session {}", journal.session_id());

    let mut counter = BidirectionalCounter::new(&config)?;
    counter.add_observer(journal);

    let handle = Pipeline::spawn(&config, source, Recorded, counter)?;
    let stats = handle.join()?;

    let mut summary = Journal::new(io::stderr(), config.location.clone());
    summary.write_summary(&stats.counters)?;

    eprintln!(
        "line x={} active={} crossed={} total={} (L->R {}, R->L {})",
        stats.line_x,
        stats.active_tracks,
        stats.crossed_tracks,
        stats.totals.total,
        stats.totals.left_to_right,
        stats.totals.right_to_left,
    );

    Ok(())
}
