//! Command-line front end for the LDPC simulation engine.

use clap::Parser;
use ldpc_sim::{
    read_alist, ChannelKind, CodeBuilder, ConstructionError, ParityCheckCode, SimConfig,
    SimDriver, SimError, SweepRange, UpdateRule,
};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "ldpcsim",
    about = "Monte-Carlo BER/FER simulation of LDPC codes under belief propagation"
)]
struct Cli {
    /// Parity-check code in alist format
    #[arg(long, required_unless_present = "random", conflicts_with = "random")]
    code: Option<PathBuf>,
    /// Random code spec CHECKS:BITS:DISTRIBUTION (e.g. 512:1024:0.5x3/0.5x6)
    #[arg(long)]
    random: Option<String>,
    /// Seed for random code construction
    #[arg(long, default_value_t = 0)]
    construction_seed: u64,
    /// Results file, rewritten on every update
    #[arg(short, long)]
    output: PathBuf,
    /// Sweep of the channel parameter: Eb/N0 in dB (AWGN) or crossover
    /// probability (BSC); stop is exclusive
    #[arg(long, num_args = 3, required = true, value_names = ["START", "STOP", "STEP"])]
    sweep: Vec<f64>,
    /// Number of worker threads
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,
    /// Base seed; worker i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Channel kind: awgn or bsc
    #[arg(long, default_value = "awgn")]
    channel: String,
    /// Belief-propagation iteration cap
    #[arg(long, default_value_t = 50)]
    iterations: usize,
    /// Hard cap on frames per sweep point
    #[arg(long, default_value_t = 10_000_000)]
    max_frames: u64,
    /// Frame-error count at which a sweep point stops
    #[arg(long, default_value_t = 100)]
    min_fec: u64,
    /// Run the full iteration budget even after reaching a codeword
    #[arg(long)]
    no_early_term: bool,
    /// Use the scaled min-sum check update instead of sum-product
    #[arg(long)]
    min_sum: bool,
    /// Scaling factor for the min-sum update
    #[arg(long, default_value_t = 0.75)]
    min_sum_scale: f64,
    /// Append a seconds-per-frame column to results rows
    #[arg(long)]
    log_frame_time: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ldpc_sim=info"));
    fmt().with_env_filter(filter).with_target(true).init();
}

fn load_code(cli: &Cli) -> Result<ParityCheckCode, SimError> {
    if let Some(path) = &cli.code {
        return Ok(read_alist(path)?);
    }
    // clap guarantees exactly one of --code / --random is present
    let spec = cli.random.as_deref().unwrap_or_default();
    let invalid = || ConstructionError::InvalidDistribution(spec.to_string());
    let mut parts = spec.splitn(3, ':');
    let checks: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;
    let bits: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)?;
    let distribution = parts.next().ok_or_else(invalid)?.parse()?;
    let code = CodeBuilder::new(checks, bits, distribution)
        .seed(cli.construction_seed)
        .build()?;
    Ok(code)
}

fn run() -> Result<(), SimError> {
    let cli = Cli::parse();

    let code = load_code(&cli)?;
    let sweep = SweepRange::new(cli.sweep[0], cli.sweep[1], cli.sweep[2])?;
    let channel: ChannelKind = cli.channel.parse()?;

    let config = SimConfig {
        output: cli.output.clone(),
        sweep,
        threads: cli.threads,
        seed: cli.seed,
        channel,
        max_iterations: cli.iterations,
        max_frames: cli.max_frames,
        min_fec: cli.min_fec,
        early_termination: !cli.no_early_term,
        update_rule: if cli.min_sum {
            UpdateRule::MinSum { scale: cli.min_sum_scale }
        } else {
            UpdateRule::SumProduct
        },
        log_frame_time: cli.log_frame_time,
    };

    let mut driver = SimDriver::new(Arc::new(code), config)?;
    // Embedders toggle this from a signal handler; the CLI runs to completion.
    let stop = Arc::new(AtomicBool::new(false));
    driver.start(&stop)?;
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
