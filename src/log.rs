use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

#[derive(Serialize)]
pub struct SessionLog {
    pub event: &'static str,
    pub timestamp: String,
    pub source: String,
    pub min_area: f64,
    pub history: i32,
    pub var_threshold: f64,
    pub detect_shadows: bool,
    pub max_disappeared: u32,
}

#[derive(Serialize)]
pub struct FrameLog {
    pub event: &'static str,
    pub timestamp: String,
    pub frame_index: u64,
    pub detections: usize,
    pub active_tracks: usize,
    pub total_unique: usize,
}

#[derive(Serialize)]
pub struct SummaryLog {
    pub event: &'static str,
    pub timestamp: String,
    pub frame_index: u64,
    pub interval_seconds: u64,
    pub active_tracks: usize,
    pub total_unique: usize,
    pub fps: f64,
}

/// Newline-delimited JSON event sink.
pub struct JsonLogger {
    writer: BufWriter<File>,
}

impl JsonLogger {
    pub fn new(path: &Path) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
