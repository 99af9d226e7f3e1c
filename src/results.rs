//! Results reporting: console progress, the results table, and the results
//! file.
//!
//! All I/O triggered from the simulation hot path goes through a
//! [`ResultsSink`], entered only under the driver's critical section. The
//! results file is rewritten in full on every update so it stays consistent
//! if the process dies mid-sweep.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Statistics of one sweep point, updated on every error event and finalized
/// when the point completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStats {
    /// Channel parameter (Eb/N0 in dB or crossover probability).
    pub param: f64,
    pub frames: u64,
    pub bit_errors: u64,
    pub frame_errors: u64,
    /// Sum of decoder iteration counts over all frames.
    pub iterations: u64,
    pub ber: f64,
    pub fer: f64,
    pub avg_iterations: f64,
    pub seconds_per_frame: f64,
    pub elapsed: Duration,
}

impl PointStats {
    /// Derives the rates from raw counters. `n` is the code length.
    pub fn compute(
        param: f64,
        frames: u64,
        bit_errors: u64,
        frame_errors: u64,
        iterations: u64,
        n: u64,
        elapsed: Duration,
    ) -> Self {
        let frames_f = frames as f64;
        let (ber, fer, avg_iterations, seconds_per_frame) = if frames > 0 {
            (
                bit_errors as f64 / (frames_f * n as f64),
                frame_errors as f64 / frames_f,
                iterations as f64 / frames_f,
                elapsed.as_secs_f64() / frames_f,
            )
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };
        Self {
            param,
            frames,
            bit_errors,
            frame_errors,
            iterations,
            ber,
            fer,
            avg_iterations,
            seconds_per_frame,
            elapsed,
        }
    }
}

/// Formats one results-file row. Kept standalone so a parsed row can be
/// reserialized to identical bytes.
pub fn format_row(stats: &PointStats, log_frame_time: bool) -> String {
    if log_frame_time {
        format!(
            "{:.6} {:.3e} {:.3e} {} {:.3e} {:.6}",
            stats.param,
            stats.fer,
            stats.ber,
            stats.frames,
            stats.avg_iterations,
            stats.seconds_per_frame,
        )
    } else {
        format!(
            "{:.6} {:.3e} {:.3e} {} {:.3e}",
            stats.param, stats.fer, stats.ber, stats.frames, stats.avg_iterations,
        )
    }
}

/// Owns every reporting concern of a sweep: the progress line, the results
/// table, the output file, and the in-memory per-point snapshots.
#[derive(Debug)]
pub struct ResultsSink {
    path: PathBuf,
    log_frame_time: bool,
    min_fec: u64,
    /// Header plus one row per sweep point, empty until the point reports.
    rows: Vec<String>,
    snapshots: Vec<Option<PointStats>>,
}

impl ResultsSink {
    /// Creates the sink and writes the initial (empty) results file, so an
    /// unwritable output path fails before the sweep starts.
    pub fn new(
        path: impl Into<PathBuf>,
        points: usize,
        min_fec: u64,
        log_frame_time: bool,
    ) -> io::Result<Self> {
        let header = if log_frame_time {
            "snr fer ber frames avg_iter frame_time"
        } else {
            "snr fer ber frames avg_iter"
        };
        let mut rows = vec![String::new(); points + 1];
        rows[0] = header.to_string();
        let sink = Self {
            path: path.into(),
            log_frame_time,
            min_fec,
            rows,
            snapshots: vec![None; points],
        };
        fs::write(&sink.path, sink.render())?;
        Ok(sink)
    }

    /// Records an error event: updates the point's row and snapshot,
    /// overwrites the console progress line, and rewrites the results file.
    /// File failures are logged and swallowed.
    pub fn record_error_event(&mut self, point: usize, stats: &PointStats) {
        self.rows[point + 1] = format_row(stats, self.log_frame_time);
        self.snapshots[point] = Some(*stats);
        self.print_progress(stats);
        self.rewrite_file();
    }

    /// Final update for a completed point; also emits the row for points that
    /// never saw an error frame, and terminates the progress line.
    pub fn finish_point(&mut self, point: usize, stats: &PointStats) {
        self.rows[point + 1] = format_row(stats, self.log_frame_time);
        self.snapshots[point] = Some(*stats);
        self.print_progress(stats);
        self.rewrite_file();
        println!();
    }

    /// Per-point snapshots in sweep order; `None` for points never reached.
    pub fn snapshots(&self) -> &[Option<PointStats>] {
        &self.snapshots
    }

    pub fn print_banner(&self) {
        println!(
            "========================================================================================"
        );
        println!(
            "  FEC   |      FRAME     |  PARAM  |    BER     |    FER     | AVGITERS  |  TIME/FRAME"
        );
        println!(
            "========+================+=========+============+============+===========+============="
        );
    }

    fn print_progress(&self, stats: &PointStats) {
        print!(
            "\r {:2}/{:2}  |  {:12}  |  {:.3}  |  {:.2e}  |  {:.2e}  |  {:.1e}  |  {:.3}ms",
            stats.frame_errors,
            self.min_fec,
            stats.frames,
            stats.param,
            stats.ber,
            stats.fer,
            stats.avg_iterations,
            stats.seconds_per_frame * 1e3,
        );
        let _ = io::stdout().flush();
    }

    fn render(&self) -> String {
        let mut text = String::new();
        for row in &self.rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    fn rewrite_file(&self) {
        if let Err(e) = fs::write(&self.path, self.render()) {
            warn!(path = %self.path.display(), error = %e, "could not write results file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(param: f64, frames: u64) -> PointStats {
        PointStats::compute(param, frames, 37, 5, 320, 1024, Duration::from_millis(250))
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ldpc_sim_results_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_file_layout() {
        let path = temp_path("layout");
        let mut sink = ResultsSink::new(&path, 3, 10, false).unwrap();

        let initial = fs::read_to_string(&path).unwrap();
        assert_eq!(initial, "snr fer ber frames avg_iter\n\n\n\n");

        sink.record_error_event(1, &stats(2.0, 100));
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].is_empty());
        assert!(!lines[2].is_empty());
        assert!(lines[3].is_empty());
        assert_eq!(lines[2].split_whitespace().count(), 5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_frame_time_column() {
        let path = temp_path("frame_time");
        let mut sink = ResultsSink::new(&path, 1, 10, true).unwrap();
        sink.finish_point(0, &stats(1.0, 200));
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "snr fer ber frames avg_iter frame_time");
        assert_eq!(lines[1].split_whitespace().count(), 6);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_row_reserialization_is_identical() {
        for log_frame_time in [false, true] {
            let row = format_row(&stats(3.5, 12345), log_frame_time);
            let fields: Vec<&str> = row.split_whitespace().collect();
            let parsed = PointStats {
                param: fields[0].parse().unwrap(),
                fer: fields[1].parse().unwrap(),
                ber: fields[2].parse().unwrap(),
                frames: fields[3].parse().unwrap(),
                avg_iterations: fields[4].parse().unwrap(),
                seconds_per_frame: if log_frame_time {
                    fields[5].parse().unwrap()
                } else {
                    0.0
                },
                bit_errors: 0,
                frame_errors: 0,
                iterations: 0,
                elapsed: Duration::ZERO,
            };
            assert_eq!(format_row(&parsed, log_frame_time), row);
        }
    }

    #[test]
    fn test_snapshots_track_updates() {
        let path = temp_path("snapshots");
        let mut sink = ResultsSink::new(&path, 2, 10, false).unwrap();
        assert!(sink.snapshots().iter().all(Option::is_none));
        sink.finish_point(0, &stats(1.0, 10));
        assert!(sink.snapshots()[0].is_some());
        assert!(sink.snapshots()[1].is_none());
        fs::remove_file(&path).unwrap();
    }
}
