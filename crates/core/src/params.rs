//! Proof-of-work parameters
//!
//! The digest is SHA-256 rendered as lowercase hex, so difficulty is
//! counted in hex characters (4 bits each).

/// SHA-256 output size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Length of the lowercase hex rendering of a digest
pub const DIGEST_HEX_LEN: usize = DIGEST_SIZE * 2;

/// Highest difficulty a digest can satisfy (every hex character zero)
pub const MAX_DIFFICULTY: u32 = DIGEST_HEX_LEN as u32;

/// Attempts between cancellation, timeout and progress-counter checks
pub const CHECK_INTERVAL: u64 = 4096;

/// Name of the digest algorithm, used in reports
pub const HASH_ALGORITHM: &str = "sha256";
