//! Persistence glue for crossing events: one JSON line per crossing plus summary rows,
//! tagged with the configured location.

use std::io::Write;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde_derive::Serialize;

use crate::config::Location;
use crate::counters::Counters;
use crate::crossing::{CrossingEvent, CrossingObserver};
use crate::error::Error;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CrossingRecord {
    pub date: String,
    pub time: String,
    pub category: &'static str,
    // 0 = left-to-right, 1 = right-to-left
    pub direction: u8,
    pub category_total: u64,
    pub total_dir0: u64,
    pub total_dir1: u64,
    pub session_total: u64,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub session_id: String,
    pub track_id: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub date: String,
    pub time: String,
    pub category: String,
    pub total_dir0: u64,
    pub total_dir1: u64,
    pub category_total: u64,
    pub session_total: u64,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub session_id: String,
    pub notes: String,
}

/// `<name>_<lat>_<lon>_<date>` with filesystem-hostile characters removed; negative
/// coordinates are written with an `n` prefix.
pub fn session_id(location: &Location, date: NaiveDate) -> String {
    let coord = |v: Option<f64>| format!("{:.4}", v.unwrap_or(0.0)).replace('-', "n");
    let name = sanitize(&location.name);
    let prefix = if name.is_empty() { "session".to_string() } else { name };

    format!(
        "{}_{}_{}_{}",
        prefix,
        coord(location.latitude),
        coord(location.longitude),
        date.format("%Y-%m-%d")
    )
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch.is_whitespace() || ch == ',' {
            pending_sep = !out.is_empty();
        } else if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(ch);
        }
    }

    out.chars().take(50).collect()
}

pub fn summary_rows(
    counters: &Counters,
    location: &Location,
    session_id: &str,
    now: NaiveDateTime,
) -> Vec<SummaryRow> {
    let totals = counters.totals();
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M:%S").to_string();

    let row = |category: String, dir0: u64, dir1: u64, cat_total: u64, notes: &str| SummaryRow {
        date: date.clone(),
        time: time.clone(),
        category,
        total_dir0: dir0,
        total_dir1: dir1,
        category_total: cat_total,
        session_total: totals.total,
        location: location.name.clone(),
        latitude: location.latitude,
        longitude: location.longitude,
        session_id: session_id.to_string(),
        notes: notes.to_string(),
    };

    let mut rows: Vec<SummaryRow> = counters
        .iter()
        .map(|(cat, c)| {
            row(
                cat.title().to_string(),
                c.left_to_right,
                c.right_to_left,
                c.total(),
                "",
            )
        })
        .collect();

    rows.push(row(
        "TOTAL".to_string(),
        totals.left_to_right,
        totals.right_to_left,
        totals.total,
        "dir0=left->right | dir1=right->left",
    ));

    rows
}

/// Appends crossing records as JSON lines to `W`.
pub struct Journal<W: Write> {
    writer: W,
    location: Location,
    session_id: String,
    written: usize,
}

impl<W: Write> Journal<W> {
    pub fn new(writer: W, location: Location) -> Self {
        let session_id = session_id(&location, Local::now().date_naive());

        Self {
            writer,
            location,
            session_id,
            written: 0,
        }
    }

    #[inline]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn record(&mut self, event: &CrossingEvent) -> Result<CrossingRecord, Error> {
        self.record_at(event, Local::now().naive_local())
    }

    pub fn record_at(
        &mut self,
        event: &CrossingEvent,
        now: NaiveDateTime,
    ) -> Result<CrossingRecord, Error> {
        let record = CrossingRecord {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            category: event.category.title(),
            direction: event.direction.code(),
            category_total: event.counts.total(),
            total_dir0: event.totals.left_to_right,
            total_dir1: event.totals.right_to_left,
            session_total: event.totals.total,
            location: self.location.name.clone(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            session_id: self.session_id.clone(),
            track_id: event.track_id,
        };

        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;

        Ok(record)
    }

    pub fn write_summary(&mut self, counters: &Counters) -> Result<Vec<SummaryRow>, Error> {
        let rows = summary_rows(
            counters,
            &self.location,
            &self.session_id,
            Local::now().naive_local(),
        );

        for row in &rows {
            serde_json::to_writer(&mut self.writer, row)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;

        Ok(rows)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CrossingObserver for Journal<W> {
    fn on_crossing(&mut self, event: &CrossingEvent) {
        if let Err(err) = self.record(event) {
            tracing::error!("failed to journal crossing of track {}: {}", event.track_id, err);
        }
    }
}
