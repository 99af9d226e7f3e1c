//! Simulation configuration and sweep definition.

use crate::channel::ChannelKind;
use crate::decoder::UpdateRule;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid sweep: start {start} stop {stop} step {step}")]
    InvalidSweep { start: f64, stop: f64, step: f64 },
    #[error("unknown channel kind {0:?}")]
    UnknownChannel(String),
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("iteration cap must be at least 1")]
    ZeroIterations,
    #[error("frame cap must be at least 1")]
    ZeroFrames,
    #[error("frame-error target must be at least 1")]
    ZeroFec,
}

/// Arithmetic sweep over the channel parameter: `start` inclusive, `stop`
/// exclusive, positive `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl SweepRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, ConfigError> {
        let range = Self { start, stop, step };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step > 0.0) || !(self.start < self.stop) {
            return Err(ConfigError::InvalidSweep {
                start: self.start,
                stop: self.stop,
                step: self.step,
            });
        }
        Ok(())
    }

    /// The strictly increasing parameter list.
    pub fn params(&self) -> Vec<f64> {
        let mut params = Vec::new();
        let mut value = self.start;
        while value < self.stop {
            params.push(value);
            value += self.step;
        }
        params
    }

    pub fn len(&self) -> usize {
        self.params().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat simulation configuration consumed by the driver.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Results file path, rewritten in full on every update.
    pub output: PathBuf,
    pub sweep: SweepRange,
    /// Number of parallel workers.
    pub threads: usize,
    /// Base seed; worker `i` uses `seed + i`.
    pub seed: u64,
    pub channel: ChannelKind,
    /// Belief-propagation iteration cap.
    pub max_iterations: usize,
    /// Hard cap on simulated frames per sweep point.
    pub max_frames: u64,
    /// Frame-error count at which a sweep point stops.
    pub min_fec: u64,
    pub early_termination: bool,
    pub update_rule: UpdateRule,
    /// Append a seconds-per-frame column to results rows.
    pub log_frame_time: bool,
}

impl SimConfig {
    /// A configuration with conventional defaults for the given output path,
    /// sweep, and channel.
    pub fn new(output: impl Into<PathBuf>, sweep: SweepRange, channel: ChannelKind) -> Self {
        Self {
            output: output.into(),
            sweep,
            threads: 1,
            seed: 0,
            channel,
            max_iterations: 50,
            max_frames: 10_000_000,
            min_fec: 100,
            early_termination: true,
            update_rule: UpdateRule::SumProduct,
            log_frame_time: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sweep.validate()?;
        if self.threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.max_frames == 0 {
            return Err(ConfigError::ZeroFrames);
        }
        if self.min_fec == 0 {
            return Err(ConfigError::ZeroFec);
        }
        Ok(())
    }
}
