//! Sequential nonce search
//!
//! Nonces are tried strictly in ascending order starting at 0, so the first
//! hit is the minimum nonce meeting the difficulty. Bounds, timeout and
//! cancellation are checked every `CHECK_INTERVAL` attempts to keep the hot
//! loop down to one SHA-256 and one predicate test per nonce.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::digest::{digest, hex_meets_difficulty, meets_difficulty};
use crate::params::*;

/// What to mine: a fixed prefix and the required number of leading hex zeros
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningRequest {
    pub prefix: String,
    pub difficulty: u32,
}

impl MiningRequest {
    pub fn new(prefix: impl Into<String>, difficulty: u32) -> Self {
        Self {
            prefix: prefix.into(),
            difficulty,
        }
    }
}

/// A successful search
///
/// `content` is exactly `prefix + decimal(nonce)` and `digest_hex` its
/// lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    pub nonce: u64,
    pub content: String,
    pub digest_hex: String,
    pub difficulty: u32,
    /// Digests computed during the search (summed over workers when parallel)
    pub attempts: u64,
    /// Wall-clock search time, for reporting only
    pub elapsed_secs: f64,
}

impl MiningResult {
    pub(crate) fn new(
        request: &MiningRequest,
        nonce: u64,
        digest: [u8; DIGEST_SIZE],
        attempts: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            nonce,
            content: format!("{}{}", request.prefix, nonce),
            digest_hex: hex::encode(digest),
            difficulty: request.difficulty,
            attempts,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Re-hash `content` and check it against `nonce`, `digest_hex` and
    /// `difficulty`
    pub fn verify(&self) -> bool {
        if !self.content.ends_with(&self.nonce.to_string()) {
            return false;
        }
        let expected = hex::encode(digest(self.content.as_bytes()));
        expected == self.digest_hex && hex_meets_difficulty(&self.digest_hex, self.difficulty)
    }
}

/// Caller-supplied limits on a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Only nonces in `0..max_attempts` are tried
    pub max_attempts: Option<u64>,
    pub timeout: Option<Duration>,
}

impl SearchOptions {
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn limit(&self) -> u64 {
        self.max_attempts.unwrap_or(u64::MAX)
    }

    pub(crate) fn deadline(&self, start: Instant) -> Option<Instant> {
        self.timeout.and_then(|t| start.checked_add(t))
    }
}

/// Shared handle for cancelling a running search and reading its progress
///
/// Clones share state, so one clone can be moved into the mining thread
/// while another stays with the caller.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    stop: Arc<AtomicBool>,
    hashes: Arc<AtomicU64>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every search using this control to stop
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Digests computed so far (updated every `CHECK_INTERVAL` attempts)
    pub fn hashes(&self) -> u64 {
        self.hashes.load(Ordering::Relaxed)
    }

    pub(crate) fn add_hashes(&self, count: u64) {
        if count > 0 {
            self.hashes.fetch_add(count, Ordering::Relaxed);
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MineError {
    #[error("difficulty {difficulty} can never be met (maximum is {max})")]
    DifficultyTooHigh { difficulty: u32, max: u32 },

    #[error("no nonce among the first {attempts} meets the difficulty")]
    Exhausted { attempts: u64 },

    #[error("search timed out after {attempts} attempts ({elapsed_secs:.2}s)")]
    TimedOut { attempts: u64, elapsed_secs: f64 },

    #[error("search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("failed to start worker threads: {0}")]
    ThreadPool(String),
}

pub(crate) fn check_difficulty(difficulty: u32) -> Result<(), MineError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(MineError::DifficultyTooHigh {
            difficulty,
            max: MAX_DIFFICULTY,
        });
    }
    Ok(())
}

/// Reusable search state for one prefix
///
/// Keeps `prefix || decimal(nonce)` in a single buffer and only rewrites
/// the nonce digits between attempts.
pub struct Miner {
    content: Vec<u8>,
    prefix_len: usize,
}

impl Miner {
    pub fn new(prefix: &str) -> Self {
        let mut content = Vec::with_capacity(prefix.len() + 20);
        content.extend_from_slice(prefix.as_bytes());
        Self {
            content,
            prefix_len: prefix.len(),
        }
    }

    /// Hash `prefix || decimal(nonce)`
    #[inline(always)]
    pub fn attempt(&mut self, nonce: u64) -> [u8; DIGEST_SIZE] {
        self.content.truncate(self.prefix_len);
        push_decimal(&mut self.content, nonce);
        digest(&self.content)
    }

    /// Bytes hashed by the most recent `attempt`
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

#[inline(always)]
fn push_decimal(buf: &mut Vec<u8>, mut n: u64) {
    // u64::MAX has 20 digits
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

/// Find the smallest nonce whose digest meets `difficulty`
///
/// The search is unbounded; only an impossible difficulty is an error.
/// Use [`mine_with`] to bound or cancel it.
///
/// ```rust
/// let result = ppow_core::mine("abc", 0).unwrap();
/// assert_eq!(result.nonce, 0);
/// assert_eq!(result.content, "abc0");
/// ```
pub fn mine(prefix: &str, difficulty: u32) -> Result<MiningResult, MineError> {
    mine_with(
        &MiningRequest::new(prefix, difficulty),
        &SearchOptions::default(),
        &SearchControl::new(),
    )
}

/// Bounded, cancellable sequential search
pub fn mine_with(
    request: &MiningRequest,
    options: &SearchOptions,
    control: &SearchControl,
) -> Result<MiningResult, MineError> {
    check_difficulty(request.difficulty)?;

    debug!(
        prefix = %request.prefix,
        difficulty = request.difficulty,
        max_attempts = ?options.max_attempts,
        "starting sequential search"
    );

    if control.is_cancelled() {
        warn!(attempts = 0, "search cancelled before start");
        return Err(MineError::Cancelled { attempts: 0 });
    }

    let limit = options.limit();
    let mut miner = Miner::new(&request.prefix);
    let mut pending: u64 = 0;
    let mut nonce: u64 = 0;

    let start = Instant::now();
    let deadline = options.deadline(start);

    loop {
        if nonce >= limit {
            control.add_hashes(pending);
            warn!(attempts = nonce, "attempt limit reached without a qualifying nonce");
            return Err(MineError::Exhausted { attempts: nonce });
        }

        let result = miner.attempt(nonce);
        pending += 1;

        if meets_difficulty(&result, request.difficulty) {
            let elapsed = start.elapsed();
            control.add_hashes(pending);
            debug!(nonce, elapsed_secs = elapsed.as_secs_f64(), "found nonce");
            return Ok(MiningResult::new(request, nonce, result, nonce + 1, elapsed));
        }

        if pending == CHECK_INTERVAL {
            control.add_hashes(pending);
            pending = 0;

            if control.is_cancelled() {
                warn!(attempts = nonce + 1, "search cancelled");
                return Err(MineError::Cancelled { attempts: nonce + 1 });
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let elapsed_secs = start.elapsed().as_secs_f64();
                warn!(attempts = nonce + 1, elapsed_secs, "search timed out");
                return Err(MineError::TimedOut {
                    attempts: nonce + 1,
                    elapsed_secs,
                });
            }
        }

        nonce += 1;
    }
}
