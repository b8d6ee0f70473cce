//! Practical proof-of-work
//!
//! Mines the smallest nonce such that `SHA-256(prefix || nonce)` starts with
//! a given number of hex zeros, then optionally signs the winning content
//! with a fresh RSA key and verifies the signature.
//!
//! # Example
//!
//! ```rust
//! use ppow::algorithm::mine;
//! use ppow::signer::{sign, verify, KeyPair};
//!
//! let result = mine("abc", 1).unwrap();
//! assert_eq!(result.content, "abc26");
//!
//! let key = KeyPair::generate(2048).unwrap();
//! let signature = sign(result.content.as_bytes(), &key).unwrap();
//! assert!(verify(result.content.as_bytes(), &signature, key.public_key()).unwrap());
//! ```

// Re-export the core algorithm
pub use ppow_core as algorithm;

pub mod config;
pub mod log;
pub mod report;
pub mod signer;

// Convenience re-exports
pub use algorithm::{mine, mine_with, MineError, MiningRequest, MiningResult};
pub use signer::{sign_and_verify, SignedArtifact};
