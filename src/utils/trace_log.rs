//! Trace Log Module
//!
//! Plain-text record of every sample taken during one monitoring session,
//! one `<timestamp> <watts>` line per sample. The file is created or
//! truncated when the session starts and every line is flushed as soon as
//! it is written, so a hard kill loses at most the line being written.

use crate::utils::errors::MonitoringError;
use chrono::{DateTime, Local};
use log::info;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub struct TraceLog {
    path: PathBuf,
    writer: LineWriter<File>,
    lines: u64,
}

impl TraceLog {
    /// Create (or truncate) the trace log at `path`
    pub fn create(path: &Path) -> Result<Self, MonitoringError> {
        let file = File::create(path)?;
        info!("Writing power trace to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
            lines: 0,
        })
    }

    /// Number of lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Append one sample line and flush it
    pub fn append(
        &mut self,
        timestamp: &DateTime<Local>,
        power_watts: f64,
    ) -> Result<(), MonitoringError> {
        writeln!(self.writer, "{}", format_line(timestamp, power_watts))?;
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and close the file
    pub fn close(mut self) -> Result<(), MonitoringError> {
        self.writer.flush()?;
        info!(
            "Closed power trace {} after {} lines",
            self.path.display(),
            self.lines
        );
        Ok(())
    }
}

pub fn format_line(timestamp: &DateTime<Local>, power_watts: f64) -> String {
    format!("{} {:.3}", timestamp.format(TIMESTAMP_FORMAT), power_watts)
}
