//! # Proof-of-work core
//!
//! Brute-force search for the smallest nonce such that
//! `SHA-256(prefix || decimal(nonce))`, written as lowercase hex, starts
//! with `difficulty` zero characters.
//!
//! ## Properties
//!
//! - **Minimal**: nonces are tried in ascending order from 0, so the reported
//!   nonce is the smallest one that qualifies
//! - **Deterministic**: the same prefix always yields the same nonce and digest,
//!   sequential or parallel
//! - **Bounded on request**: attempt ceiling, timeout and cancellation via
//!   [`SearchOptions`] and [`SearchControl`]
//!
//! Expected cost is about `16^difficulty` digests.
//!
//! ## Example
//!
//! ```rust
//! use ppow_core::{mine, meets_difficulty, digest};
//!
//! let result = mine("abc", 1).unwrap();
//! assert_eq!(result.nonce, 26);
//! assert!(result.digest_hex.starts_with('0'));
//!
//! // Anyone can re-check the proof from the content alone
//! assert!(meets_difficulty(&digest(result.content.as_bytes()), 1));
//! ```
//!
//! ## Parallel search
//!
//! With the `parallel` feature (default), [`mine_parallel`] spreads the nonce
//! space over a rayon pool and still reports the global minimum.

mod digest;
mod miner;
#[cfg(feature = "parallel")]
mod parallel;
mod params;

pub use digest::{digest, digest_hex, hex_meets_difficulty, leading_zero_nibbles, meets_difficulty};
pub use miner::{
    MineError, Miner, MiningRequest, MiningResult, SearchControl, SearchOptions, mine, mine_with,
};
#[cfg(feature = "parallel")]
pub use parallel::mine_parallel;
pub use params::*;
