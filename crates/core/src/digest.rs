//! Digest helpers and the hex-prefix difficulty predicate

use sha2::{Digest, Sha256};

use crate::params::DIGEST_SIZE;

/// SHA-256 of `content`
#[inline(always)]
pub fn digest(content: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(content).into()
}

/// Lowercase hex SHA-256 of `content`
pub fn digest_hex(content: &[u8]) -> String {
    hex::encode(digest(content))
}

/// Number of leading `'0'` characters in the hex rendering of `digest`
///
/// Each byte contributes two hex characters; a byte below `0x10` still
/// counts its high nibble.
#[inline(always)]
pub fn leading_zero_nibbles(digest: &[u8; DIGEST_SIZE]) -> u32 {
    let mut nibbles = 0u32;

    for byte in digest.iter() {
        if *byte == 0 {
            nibbles += 2;
        } else {
            if *byte < 0x10 {
                nibbles += 1;
            }
            break;
        }
    }

    nibbles
}

/// Check if a digest meets the required difficulty
///
/// Difficulty is the number of leading `'0'` characters required in the
/// lowercase hex form of the digest. Difficulty 0 is always met.
///
/// # Example
///
/// ```rust
/// use ppow_core::meets_difficulty;
///
/// // hex: "000fff..." has three leading zeros
/// let mut digest = [0xFFu8; 32];
/// digest[0] = 0x00;
/// digest[1] = 0x0F;
/// assert!(meets_difficulty(&digest, 3));
/// assert!(!meets_difficulty(&digest, 4));
/// ```
#[inline(always)]
pub fn meets_difficulty(digest: &[u8; DIGEST_SIZE], difficulty: u32) -> bool {
    leading_zero_nibbles(digest) >= difficulty
}

/// Same check on an already hex-encoded digest
pub fn hex_meets_difficulty(digest_hex: &str, difficulty: u32) -> bool {
    let zeros = digest_hex.bytes().take_while(|b| *b == b'0').count();
    zeros >= difficulty as usize
}
