//! Practical proof-of-work CLI
//!
//! # Commands
//!
//! - `mine` - Search for the smallest qualifying nonce, optionally sign it
//! - `sign` - Sign arbitrary content with a fresh RSA key
//! - `verify` - Verify a signature against a PEM public key
//! - `check` - Check that content meets a difficulty
//! - `benchmark` - Run performance benchmark

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use ppow::algorithm::{
    digest_hex, hex_meets_difficulty, Miner, MiningRequest, MiningResult, SearchControl,
    SearchOptions,
};
use ppow::config::MinerConfig;
use ppow::report::{outcome, signature_text, MiningReport, ReportFormat};
use ppow::signer::{self, KeyPair};

#[derive(Parser)]
#[command(name = "ppow")]
#[command(author = "Cyberia")]
#[command(version = "0.1.0")]
#[command(about = "SHA-256 proof-of-work miner with RSA signing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/ppow/config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. info, debug)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine the smallest nonce whose digest has the required leading zeros
    Mine(MineArgs),

    /// Sign content with a fresh RSA key and verify the signature
    Sign {
        /// Content to sign
        #[arg(long)]
        content: String,

        /// RSA key size in bits
        #[arg(long)]
        key_bits: Option<usize>,

        /// Write the public key (PEM) to this file
        #[arg(long)]
        public_key_out: Option<PathBuf>,

        /// Output format (default: from config, else text)
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,
    },

    /// Verify a hex signature over content
    Verify {
        #[arg(long)]
        content: String,

        /// Hex-encoded signature
        #[arg(long)]
        signature: String,

        /// PEM file holding the public key
        #[arg(long)]
        public_key: PathBuf,
    },

    /// Check whether content hashes to the required leading zeros
    Check {
        #[arg(long)]
        content: String,

        #[arg(short, long)]
        difficulty: u32,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of hashes to compute
        #[arg(
            short,
            long,
            default_value = "1000000",
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        count: u64,
    },
}

#[derive(Args)]
struct MineArgs {
    /// Fixed prefix of the hashed content
    #[arg(short, long)]
    prefix: Option<String>,

    /// Number of leading zero hex characters required
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// Number of threads to use (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Only try nonces below this value
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Sign the winning content with a fresh RSA key
    #[arg(long, overrides_with = "no_sign")]
    sign: bool,

    /// Don't sign, even when the config file enables signing
    #[arg(long, overrides_with = "sign")]
    no_sign: bool,

    /// RSA key size in bits
    #[arg(long)]
    key_bits: Option<usize>,

    /// Report format (default: from config, else text)
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,
}

impl MineArgs {
    /// Overlay command-line flags on the loaded config
    fn apply(self, mut config: MinerConfig) -> MinerConfig {
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.max_attempts.is_some() {
            config.max_attempts = self.max_attempts;
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        if let Some(bits) = self.key_bits {
            config.key_bits = bits;
        }
        if self.sign {
            config.sign = true;
        } else if self.no_sign {
            config.sign = false;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MinerConfig::load_or_default(cli.config.as_deref())?;
    ppow::log::init_log(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Commands::Mine(args) => cmd_mine(args.apply(config)),
        Commands::Sign {
            content,
            key_bits,
            public_key_out,
            format,
        } => cmd_sign(
            &content,
            key_bits.unwrap_or(config.key_bits),
            public_key_out,
            format.unwrap_or(config.format),
        ),
        Commands::Verify {
            content,
            signature,
            public_key,
        } => cmd_verify(&content, &signature, &public_key),
        Commands::Check {
            content,
            difficulty,
        } => cmd_check(&content, difficulty),
        Commands::Benchmark { count } => cmd_benchmark(count),
    }
}

fn cmd_mine(config: MinerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let threads = config.threads.unwrap_or_else(num_cpus::get);
    let request = MiningRequest::new(config.prefix.clone(), config.difficulty);
    let options = config.search_options();
    let control = SearchControl::new();

    info!(
        prefix = %request.prefix,
        difficulty = request.difficulty,
        threads,
        max_attempts = ?options.max_attempts,
        timeout_secs = ?config.timeout_secs,
        "starting mining"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run_search(
        request,
        threads,
        options,
        control,
        Duration::from_secs(config.progress_interval_secs),
    ))?;

    info!(
        nonce = result.nonce,
        attempts = result.attempts,
        elapsed_secs = result.elapsed_secs,
        "found valid nonce"
    );

    let signature = if config.sign {
        let key = KeyPair::generate(config.key_bits)?;
        Some(signer::sign_and_verify_with(result.content.as_bytes(), &key)?)
    } else {
        None
    };

    let report = MiningReport::new(result, signature);
    print!("{}", report.render(config.format)?);
    if config.format == ReportFormat::Json {
        println!();
    }

    if report.signature.as_ref().is_some_and(|s| !s.is_valid) {
        anyhow::bail!("Signature verification failed");
    }

    Ok(())
}

/// Run the blocking search, logging hashrate and cancelling on Ctrl-C
async fn run_search(
    request: MiningRequest,
    threads: usize,
    options: SearchOptions,
    control: SearchControl,
    progress_interval: Duration,
) -> anyhow::Result<MiningResult> {
    let search = {
        let control = control.clone();
        tokio::task::spawn_blocking(move || search_blocking(&request, threads, &options, &control))
    };
    tokio::pin!(search);

    let start = Instant::now();
    let mut ticker = tokio::time::interval(progress_interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            joined = &mut search => {
                return Ok(joined??);
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received, stopping search");
                control.cancel();
            }
            _ = ticker.tick() => {
                let hashes = control.hashes();
                let elapsed = start.elapsed().as_secs_f64();
                let hashrate = if elapsed > 0.0 { hashes as f64 / elapsed } else { 0.0 };
                info!("Hashrate: {:.0} H/s | Hashes: {} | Time: {:.0}s", hashrate, hashes, elapsed);
            }
        }
    }
}

#[cfg(feature = "parallel")]
fn search_blocking(
    request: &MiningRequest,
    threads: usize,
    options: &SearchOptions,
    control: &SearchControl,
) -> Result<MiningResult, ppow::MineError> {
    ppow::algorithm::mine_parallel(request, threads, options, control)
}

#[cfg(not(feature = "parallel"))]
fn search_blocking(
    request: &MiningRequest,
    _threads: usize,
    options: &SearchOptions,
    control: &SearchControl,
) -> Result<MiningResult, ppow::MineError> {
    ppow::mine_with(request, options, control)
}

fn cmd_sign(
    content: &str,
    key_bits: usize,
    public_key_out: Option<PathBuf>,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let key = KeyPair::generate(key_bits)?;
    let artifact = signer::sign_and_verify_with(content.as_bytes(), &key)?;

    if let Some(path) = &public_key_out {
        std::fs::write(path, &artifact.public_key_pem)
            .with_context(|| format!("Failed to write public key to {}", path.display()))?;
        info!(path = %path.display(), "saved public key");
    }

    if format == ReportFormat::Json {
        let out = serde_json::json!({
            "content": content,
            "signature": artifact,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Content: {}", content);
        print!("{}", signature_text(&artifact));
        println!("\n{}", artifact.public_key_pem.trim_end());
    }

    if !artifact.is_valid {
        anyhow::bail!("Signature verification failed");
    }

    Ok(())
}

fn cmd_verify(content: &str, signature: &str, public_key: &Path) -> anyhow::Result<()> {
    let pem = std::fs::read_to_string(public_key)
        .with_context(|| format!("Failed to read public key from {}", public_key.display()))?;
    let key = signer::public_key_from_pem(&pem)?;

    let valid = signer::verify(content.as_bytes(), signature, &key)?;
    println!("Verified: {}", outcome(valid));

    if !valid {
        anyhow::bail!("Signature does not match content and public key");
    }

    Ok(())
}

fn cmd_check(content: &str, difficulty: u32) -> anyhow::Result<()> {
    let digest = digest_hex(content.as_bytes());
    let meets = hex_meets_difficulty(&digest, difficulty);

    println!("Content: {}", content);
    println!("Digest:  {}", digest);
    println!(
        "Result:  {} {} leading zeros",
        if meets { "meets" } else { "does not meet" },
        difficulty
    );

    if !meets {
        anyhow::bail!("Digest does not meet difficulty {}", difficulty);
    }

    Ok(())
}

fn cmd_benchmark(count: u64) -> anyhow::Result<()> {
    println!("Running benchmark with {} hashes...", count);

    let mut miner = Miner::new("benchmark input data");
    let mut qualifying: u64 = 0;

    let start = Instant::now();

    for nonce in 0..count {
        let result = miner.attempt(nonce);
        if ppow::algorithm::meets_difficulty(&result, 1) {
            qualifying += 1;
        }
    }

    let elapsed = start.elapsed();
    let hashrate = count as f64 / elapsed.as_secs_f64();

    println!("\nResults:");
    println!("  Total hashes: {}", count);
    println!("  Time elapsed: {:.2}s", elapsed.as_secs_f64());
    println!("  Hashrate: {:.2} H/s", hashrate);
    println!("  Digests with a leading zero: {}", qualifying);

    // Expected search cost per difficulty at this rate
    println!("\nExpected time per difficulty:");
    for difficulty in 1..=8u32 {
        let expected = 16f64.powi(difficulty as i32) / hashrate;
        println!("  {}: {:.2}s", difficulty, expected);
    }

    Ok(())
}
