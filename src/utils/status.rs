use chrono::{DateTime, Local};
use std::io::{self, Write};

/// Destination of a session's status line, stdout unless a watcher overrides it
pub type StatusWriter = Box<dyn Write + Send>;

/// Single overwritten terminal line showing the running energy total
pub struct StatusLine<W: Write> {
    out: W,
    dirty: bool,
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W) -> Self {
        Self { out, dirty: false }
    }

    pub fn update(&mut self, now: &DateTime<Local>, total_kwh: f64) -> io::Result<()> {
        write!(self.out, "\r{}", format_status(now, total_kwh))?;
        self.dirty = true;
        self.out.flush()
    }

    /// Terminate the status line once monitoring stops
    pub fn finish(&mut self) -> io::Result<()> {
        if self.dirty {
            writeln!(self.out)?;
            self.dirty = false;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_status(now: &DateTime<Local>, total_kwh: f64) -> String {
    format!("{} {:.5} kWh so far", now.format("%H:%M:%S"), total_kwh)
}
