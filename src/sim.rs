//! Monte-Carlo sweep driver.
//!
//! One fork-join worker pool per sweep point. Each worker owns its
//! channel/decoder pair; the parity-check code is the only shared immutable
//! resource. `frames` and the iteration sum are atomics touched on every
//! frame; bit/frame error folding, the results table and all reporting I/O
//! sit behind a single mutex entered only when a decoded frame contained
//! errors.

use crate::channel::{Channel, DomainError};
use crate::code::ParityCheckCode;
use crate::config::SimConfig;
use crate::decoder::{BpDecoder, DecoderConfig};
use crate::results::{PointStats, ResultsSink};
use crate::SimError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::info;

struct Worker {
    channel: Channel,
    decoder: BpDecoder,
}

/// State owned by the per-point critical section.
struct CriticalState<'a> {
    bit_errors: u64,
    /// Pushed forward by the duration of each critical section so per-frame
    /// timing excludes reporting I/O.
    time_start: Instant,
    sink: &'a mut ResultsSink,
}

/// Drives the full sweep. Constructed once from a validated configuration,
/// run once with [`start`](Self::start), then discarded.
pub struct SimDriver {
    code: Arc<ParityCheckCode>,
    config: SimConfig,
    params: Vec<f64>,
    workers: Vec<Worker>,
    sink: ResultsSink,
}

impl SimDriver {
    /// Validates the configuration, allocates one channel/decoder pair per
    /// worker (worker `i` seeded with `seed + i`), and creates the results
    /// file. Configuration and startup I/O failures are fatal here, before
    /// any frame is simulated.
    pub fn new(code: Arc<ParityCheckCode>, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let params = config.sweep.params();

        // Reject out-of-domain sweep parameters up front rather than from a
        // worker thread mid-sweep.
        let mut probe = Channel::new(config.channel, &code, config.seed);
        for &param in &params {
            probe.set_parameter(param)?;
        }

        let decoder_config = DecoderConfig {
            max_iterations: config.max_iterations,
            early_termination: config.early_termination,
            update_rule: config.update_rule,
        };
        let workers = (0..config.threads)
            .map(|i| Worker {
                channel: Channel::new(config.channel, &code, config.seed + i as u64),
                decoder: BpDecoder::new(Arc::clone(&code), decoder_config.clone()),
            })
            .collect();

        let sink = ResultsSink::new(
            &config.output,
            params.len(),
            config.min_fec,
            config.log_frame_time,
        )?;

        Ok(Self { code, config, params, workers, sink })
    }

    pub fn code(&self) -> &ParityCheckCode {
        &self.code
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Runs the sweep until every point has finished or `stop` becomes true,
    /// and returns the per-point statistics gathered so far.
    pub fn start(&mut self, stop: &AtomicBool) -> Result<Vec<PointStats>, SimError> {
        info!(
            points = self.params.len(),
            threads = self.config.threads,
            channel = %self.config.channel,
            "starting sweep"
        );
        self.sink.print_banner();

        let mut all_stats = Vec::with_capacity(self.params.len());
        for (point, &param) in self.params.iter().enumerate() {
            let stats = run_point(
                &self.code,
                &self.config,
                &mut self.workers,
                &mut self.sink,
                point,
                param,
                stop,
            )?;
            all_stats.push(stats);
            if stop.load(Ordering::Relaxed) {
                info!(completed = all_stats.len(), "sweep cancelled");
                break;
            }
        }
        Ok(all_stats)
    }
}

fn run_point(
    code: &ParityCheckCode,
    config: &SimConfig,
    workers: &mut [Worker],
    sink: &mut ResultsSink,
    point: usize,
    param: f64,
    stop: &AtomicBool,
) -> Result<PointStats, DomainError> {
    let n = code.n() as u64;
    let min_fec = config.min_fec;
    let max_frames = config.max_frames;

    let frames = AtomicU64::new(0);
    let iterations = AtomicU64::new(0);
    // Written only inside the critical section; read from the loop predicate,
    // where a lag of a few frames is acceptable (overshoot of at most one
    // error frame per worker).
    let frame_errors = AtomicU64::new(0);
    let critical = Mutex::new(CriticalState {
        bit_errors: 0,
        time_start: Instant::now(),
        sink,
    });

    let frames_ref = &frames;
    let iterations_ref = &iterations;
    let frame_errors_ref = &frame_errors;
    let critical_ref = &critical;

    thread::scope(|scope| {
        let handles: Vec<_> = workers
            .iter_mut()
            .map(|worker| {
                scope.spawn(move || -> Result<(), DomainError> {
                    worker.channel.set_parameter(param)?;
                    loop {
                        worker.channel.simulate();
                        worker.channel.compute_llrs();
                        let iters = worker.decoder.decode(worker.channel.llrs());
                        iterations_ref.fetch_add(iters as u64, Ordering::Relaxed);

                        if frame_errors_ref.load(Ordering::Relaxed) < min_fec {
                            frames_ref.fetch_add(1, Ordering::Relaxed);
                            let frame_bit_errors = worker
                                .decoder
                                .llr_out()
                                .iter()
                                .filter(|&&llr| llr <= 0.0)
                                .count() as u64;
                            if frame_bit_errors > 0 {
                                let mut state = critical_ref.lock().unwrap();
                                let entered = Instant::now();
                                state.bit_errors += frame_bit_errors;
                                let fec = frame_errors_ref.load(Ordering::Relaxed) + 1;
                                frame_errors_ref.store(fec, Ordering::Relaxed);
                                let stats = PointStats::compute(
                                    param,
                                    frames_ref.load(Ordering::Relaxed),
                                    state.bit_errors,
                                    fec,
                                    iterations_ref.load(Ordering::Relaxed),
                                    n,
                                    entered - state.time_start,
                                );
                                state.sink.record_error_event(point, &stats);
                                // Reporting time must not count against the
                                // per-frame average
                                state.time_start += entered.elapsed();
                            }
                        }

                        if frame_errors_ref.load(Ordering::Relaxed) >= min_fec
                            || frames_ref.load(Ordering::Relaxed) >= max_frames
                            || stop.load(Ordering::Relaxed)
                        {
                            return Ok(());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(())
    })?;

    let state = critical.into_inner().unwrap();
    let stats = PointStats::compute(
        param,
        frames.load(Ordering::Relaxed),
        state.bit_errors,
        frame_errors.load(Ordering::Relaxed),
        iterations.load(Ordering::Relaxed),
        n,
        state.time_start.elapsed(),
    );
    state.sink.finish_point(point, &stats);
    Ok(stats)
}
