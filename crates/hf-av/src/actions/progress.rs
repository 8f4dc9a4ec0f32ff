//! Parsing of ffmpeg `-progress` output.

use std::time::{Duration, Instant};

/// Progress stats from an ffmpeg encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    /// 0.0..1.0, when the source duration is known.
    pub pct: Option<f64>,
    /// Encoded media time in seconds.
    pub out_time_secs: f64,
    pub fps: Option<f64>,
    pub speed: Option<String>,
    pub frame: Option<u64>,
    /// Whether this is the final block (`progress=end`).
    pub done: bool,
}

/// Accumulates `key=value` lines and yields one [`EncodeProgress`] per
/// `progress=` block, throttled to `interval` except for the final block.
#[derive(Debug)]
pub struct ProgressParser {
    duration_secs: Option<f64>,
    interval: Duration,
    last_emit: Option<Instant>,
    out_time_us: Option<i64>,
    fps: Option<f64>,
    speed: Option<String>,
    frame: Option<u64>,
}

impl ProgressParser {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs,
            interval: Duration::from_secs(2),
            last_emit: None,
            out_time_us: None,
            fps: None,
            speed: None,
            frame: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Feed one stderr line. Returns a progress update at block ends.
    pub fn feed(&mut self, line: &str) -> Option<EncodeProgress> {
        let (key, val) = line.trim().split_once('=')?;
        let val = val.trim();
        match key {
            "out_time_us" | "out_time_ms" => self.out_time_us = val.parse().ok(),
            "fps" => self.fps = val.parse().ok(),
            "frame" => self.frame = val.parse().ok(),
            "speed" if val != "N/A" => self.speed = Some(val.to_string()),
            "progress" => return self.emit(val == "end"),
            _ => {}
        }
        None
    }

    fn emit(&mut self, done: bool) -> Option<EncodeProgress> {
        let now = Instant::now();
        let due = self
            .last_emit
            .map_or(true, |t| now.duration_since(t) >= self.interval);
        if !done && !due {
            return None;
        }
        self.last_emit = Some(now);

        // ffmpeg reports out_time_ms in microseconds as well.
        let out_time_secs = self.out_time_us.unwrap_or(0).max(0) as f64 / 1_000_000.0;
        let pct = self
            .duration_secs
            .filter(|d| *d > 0.0)
            .map(|d| if done { 1.0 } else { (out_time_secs / d).clamp(0.0, 1.0) });

        Some(EncodeProgress {
            pct,
            out_time_secs,
            fps: self.fps,
            speed: self.speed.clone(),
            frame: self.frame,
            done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &[&str] = &[
        "frame=240",
        "fps=48.00",
        "out_time_us=15000000",
        "speed=2.01x",
        "progress=continue",
    ];

    #[test]
    fn block_yields_fraction_of_duration() {
        let mut parser = ProgressParser::new(Some(30.0));
        let updates: Vec<_> = BLOCK.iter().filter_map(|l| parser.feed(l)).collect();
        assert_eq!(updates.len(), 1);
        let p = &updates[0];
        assert_eq!(p.pct, Some(0.5));
        assert_eq!(p.frame, Some(240));
        assert_eq!(p.speed.as_deref(), Some("2.01x"));
        assert!(!p.done);
    }

    #[test]
    fn updates_are_throttled_but_end_always_emits() {
        let mut parser = ProgressParser::new(Some(30.0)).with_interval(Duration::from_secs(3600));
        assert!(parser.feed("progress=continue").is_some());
        assert!(parser.feed("progress=continue").is_none());
        let last = parser.feed("progress=end").unwrap();
        assert!(last.done);
        assert_eq!(last.pct, Some(1.0));
    }

    #[test]
    fn unknown_duration_has_no_fraction() {
        let mut parser = ProgressParser::new(None);
        parser.feed("out_time_us=6000000");
        let p = parser.feed("progress=continue").unwrap();
        assert_eq!(p.pct, None);
        assert!((p.out_time_secs - 6.0).abs() < 1e-9);
    }

    #[test]
    fn non_progress_lines_are_ignored() {
        let mut parser = ProgressParser::new(Some(10.0));
        assert!(parser.feed("[hls @ 0x55] Opening 'segment_000.ts' for writing").is_none());
        assert!(parser.feed("speed=N/A").is_none());
    }
}
