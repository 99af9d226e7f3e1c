//! Monte-Carlo simulation engine for LDPC codes.
//!
//! Drives an iterative belief-propagation decoder over a noisy channel (AWGN
//! or BSC) and accumulates bit/frame error statistics across a sweep of
//! channel-quality parameters. The all-zero codeword is transmitted; each
//! sweep point stops once enough frame errors have been observed, a frame cap
//! is reached, or an external stop flag is raised.

pub mod alist;
pub mod channel;
pub mod code;
pub mod config;
pub mod construction;
pub mod decoder;
pub mod results;
pub mod sim;

// Re-export main types
pub use alist::{parse_alist, read_alist, AlistError};
pub use channel::{Channel, ChannelKind, DomainError};
pub use code::{CodeError, EdgeRef, ParityCheckCode};
pub use config::{ConfigError, SimConfig, SweepRange};
pub use construction::{CodeBuilder, ConstructionError, DegreeDistribution, PlacementMethod};
pub use decoder::{BpDecoder, DecoderConfig, UpdateRule};
pub use results::{PointStats, ResultsSink};
pub use sim::SimDriver;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("channel parameter error: {0}")]
    Domain(#[from] DomainError),
    #[error("code error: {0}")]
    Code(#[from] CodeError),
    #[error("alist error: {0}")]
    Alist(#[from] AlistError),
    #[error("construction error: {0}")]
    Construction(#[from] ConstructionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
