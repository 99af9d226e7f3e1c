//! Stochastic channels producing per-bit LLRs for the all-zero codeword.
//!
//! Each worker owns one [`Channel`]. The channel owns its PRNG, so the draw
//! sequence is deterministic for a fixed seed regardless of what other
//! workers do.

use crate::code::ParityCheckCode;
use crate::config::ConfigError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("BSC crossover probability {0} outside [0, 1]")]
    CrossoverOutOfRange(f64),
    #[error("nonpositive AWGN linear scale {scale} (code rate {rate})")]
    NonpositiveScale { scale: f64, rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Binary-input AWGN; the sweep parameter is an Eb/N0 in dB.
    Awgn,
    /// Binary symmetric channel; the sweep parameter is the crossover
    /// probability.
    Bsc,
}

impl FromStr for ChannelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "awgn" => Ok(ChannelKind::Awgn),
            "bsc" => Ok(ChannelKind::Bsc),
            _ => Err(ConfigError::UnknownChannel(s.to_string())),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Awgn => write!(f, "awgn"),
            ChannelKind::Bsc => write!(f, "bsc"),
        }
    }
}

#[derive(Debug, Clone)]
enum ChannelState {
    Awgn { sigma: f64 },
    Bsc { p: f64, magnitude: f64 },
}

/// Per-worker channel: draws a received vector for the all-zero codeword and
/// converts it to LLRs.
#[derive(Debug, Clone)]
pub struct Channel {
    kind: ChannelKind,
    state: ChannelState,
    rate: f64,
    rng: ChaCha8Rng,
    received: Vec<f64>,
    llrs: Vec<f64>,
}

impl Channel {
    /// Creates a channel for `code`, seeded with `seed`. Workers are expected
    /// to pass `base_seed + worker_index`.
    pub fn new(kind: ChannelKind, code: &ParityCheckCode, seed: u64) -> Self {
        let state = match kind {
            ChannelKind::Awgn => ChannelState::Awgn { sigma: 1.0 },
            ChannelKind::Bsc => ChannelState::Bsc { p: 0.0, magnitude: f64::INFINITY },
        };
        Self {
            kind,
            state,
            rate: code.rate(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            received: vec![0.0; code.n()],
            llrs: vec![0.0; code.n()],
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Replaces the channel parameter.
    ///
    /// AWGN: `x` is an Eb/N0 in dB; the noise deviation becomes
    /// `sigma = sqrt(1 / (2 * R * 10^(x/10)))` with `R = (n - m) / n`.
    /// BSC: `x` is the crossover probability; values above one half clamp to
    /// one half.
    pub fn set_parameter(&mut self, x: f64) -> Result<(), DomainError> {
        match &mut self.state {
            ChannelState::Awgn { sigma } => {
                let scale = 2.0 * self.rate * 10f64.powf(x / 10.0);
                if !(scale > 0.0) {
                    return Err(DomainError::NonpositiveScale { scale, rate: self.rate });
                }
                *sigma = (1.0 / scale).sqrt();
            }
            ChannelState::Bsc { p, magnitude } => {
                if !(0.0..=1.0).contains(&x) {
                    return Err(DomainError::CrossoverOutOfRange(x));
                }
                *p = x.min(0.5);
                *magnitude = ((1.0 - *p) / *p).ln();
            }
        }
        Ok(())
    }

    /// Draws a fresh received vector for the all-zero codeword.
    pub fn simulate(&mut self) {
        match &self.state {
            ChannelState::Awgn { sigma } => {
                let sigma = *sigma;
                for r in self.received.iter_mut() {
                    let noise: f64 = self.rng.sample(StandardNormal);
                    *r = 1.0 + sigma * noise;
                }
            }
            ChannelState::Bsc { p, .. } => {
                let p = *p;
                for r in self.received.iter_mut() {
                    *r = if self.rng.gen_bool(p) { 1.0 } else { 0.0 };
                }
            }
        }
    }

    /// Converts the last received vector into per-bit LLRs, one per variable
    /// node.
    pub fn compute_llrs(&mut self) {
        match &self.state {
            ChannelState::Awgn { sigma } => {
                let scale = 2.0 / (sigma * sigma);
                for (llr, r) in self.llrs.iter_mut().zip(self.received.iter()) {
                    *llr = scale * r;
                }
            }
            ChannelState::Bsc { magnitude, .. } => {
                let magnitude = *magnitude;
                for (llr, r) in self.llrs.iter_mut().zip(self.received.iter()) {
                    *llr = magnitude * (1.0 - 2.0 * r);
                }
            }
        }
    }

    pub fn received(&self) -> &[f64] {
        &self.received
    }

    pub fn llrs(&self) -> &[f64] {
        &self.llrs
    }
}
