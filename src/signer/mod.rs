//! RSA signing of mined content
//!
//! Keys are explicit values owned by the caller; nothing is stored or
//! cached between calls. The private key zeroizes itself when dropped.

use pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Key size used when the caller does not pick one
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest key size accepted
pub const MIN_KEY_BITS: usize = 2048;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("RSA key size {bits} is below the minimum of {min} bits")]
    KeyTooSmall { bits: usize, min: usize },

    #[error("Failed to generate RSA key: {0}")]
    KeyGeneration(String),

    #[error("RSA signing failed: {0}")]
    Signing(String),

    #[error("Signature is not valid hex: {0}")]
    InvalidSignatureEncoding(#[from] hex::FromHexError),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// An RSA keypair held in memory for the lifetime of a signing session
pub struct KeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyPair {
    /// Generate a fresh keypair of `bits` bits (at least 2048)
    pub fn generate(bits: usize) -> Result<Self, SignerError> {
        if bits < MIN_KEY_BITS {
            return Err(SignerError::KeyTooSmall {
                bits,
                min: MIN_KEY_BITS,
            });
        }

        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| SignerError::KeyGeneration(e.to_string()))?;
        let public_key = private_key.to_public_key();

        debug!(bits, "generated RSA keypair");

        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Key size in bits
    pub fn bits(&self) -> usize {
        self.public_key.size() * 8
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Public key in SPKI PEM format
    pub fn public_key_pem(&self) -> Result<String, SignerError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignerError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// Import a public key from SPKI PEM
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, SignerError> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| SignerError::InvalidPublicKey(e.to_string()))
}

/// Sign `content` with PKCS#1 v1.5 over SHA-256, returning the signature as hex
///
/// PKCS#1 v1.5 is deterministic: the same key and content always give the
/// same signature.
pub fn sign(content: &[u8], key: &KeyPair) -> Result<String, SignerError> {
    let mut rng = rand::thread_rng();
    let hashed = Sha256::digest(content);
    let signature = key
        .private_key
        .sign_with_rng(&mut rng, Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    Ok(hex::encode(signature))
}

/// Verify a hex signature over `content`
///
/// A signature that does not match is `Ok(false)`; only a signature that
/// is not hex at all is an error.
pub fn verify(
    content: &[u8],
    signature_hex: &str,
    public_key: &RsaPublicKey,
) -> Result<bool, SignerError> {
    let signature = hex::decode(signature_hex.trim())?;
    let hashed = Sha256::digest(content);
    Ok(public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &signature)
        .is_ok())
}

/// Signature over mined content plus the outcome of checking it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedArtifact {
    pub public_key_pem: String,
    pub key_bits: usize,
    pub signature: String,
    pub is_valid: bool,
}

impl SignedArtifact {
    /// Check this artifact's signature against `content`
    pub fn verify_content(&self, content: &[u8]) -> Result<bool, SignerError> {
        let public_key = public_key_from_pem(&self.public_key_pem)?;
        verify(content, &self.signature, &public_key)
    }
}

/// Sign `content` with a caller-owned key and verify the result
pub fn sign_and_verify_with(content: &[u8], key: &KeyPair) -> Result<SignedArtifact, SignerError> {
    let signature = sign(content, key)?;
    let is_valid = verify(content, &signature, key.public_key())?;

    debug!(is_valid, "signed content");

    Ok(SignedArtifact {
        public_key_pem: key.public_key_pem()?,
        key_bits: key.bits(),
        signature,
        is_valid,
    })
}

/// Generate a fresh RSA-2048 key, sign `content`, verify, and drop the key
pub fn sign_and_verify(content: &[u8]) -> Result<SignedArtifact, SignerError> {
    let key = KeyPair::generate(DEFAULT_KEY_BITS)?;
    sign_and_verify_with(content, &key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn test_key() -> &'static KeyPair {
        static KEY: OnceLock<KeyPair> = OnceLock::new();
        KEY.get_or_init(|| KeyPair::generate(DEFAULT_KEY_BITS).unwrap())
    }

    fn other_key() -> &'static KeyPair {
        static KEY: OnceLock<KeyPair> = OnceLock::new();
        KEY.get_or_init(|| KeyPair::generate(DEFAULT_KEY_BITS).unwrap())
    }

    #[test]
    fn test_key_generation() {
        let key = test_key();
        assert_eq!(key.bits(), 2048);

        let pem = key.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_rejects_small_keys() {
        let err = KeyPair::generate(1024).unwrap_err();
        assert!(matches!(
            err,
            SignerError::KeyTooSmall {
                bits: 1024,
                min: 2048
            }
        ));
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = test_key();
        let content = "果糖酱91476".as_bytes();

        let signature = sign(content, key).unwrap();

        // 2048-bit signature is 256 bytes
        assert_eq!(signature.len(), 512);
        assert!(verify(content, &signature, key.public_key()).unwrap());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let key = test_key();
        let first = sign(b"abc26", key).unwrap();
        let second = sign(b"abc26", key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tampered_content_fails() {
        let key = test_key();
        let signature = sign(b"abc26", key).unwrap();

        assert!(!verify(b"abc27", &signature, key.public_key()).unwrap());
        assert!(!verify(b"abc26 ", &signature, key.public_key()).unwrap());
    }

    #[test]
    fn test_foreign_public_key_fails() {
        let signature = sign(b"abc26", test_key()).unwrap();
        assert!(!verify(b"abc26", &signature, other_key().public_key()).unwrap());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let key = test_key();
        let mut signature = hex::decode(sign(b"abc26", key).unwrap()).unwrap();
        signature[10] ^= 0x01;

        assert!(!verify(b"abc26", &hex::encode(&signature), key.public_key()).unwrap());

        // Wrong length is a mismatch, not an error
        assert!(!verify(b"abc26", "abcd", key.public_key()).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let err = verify(b"abc26", "not hex", test_key().public_key()).unwrap_err();
        assert!(matches!(err, SignerError::InvalidSignatureEncoding(_)));
    }

    #[test]
    fn test_public_key_pem_round_trip() {
        let key = test_key();
        let pem = key.public_key_pem().unwrap();
        let imported = public_key_from_pem(&pem).unwrap();

        assert_eq!(&imported, key.public_key());
        assert!(public_key_from_pem("-----BEGIN PUBLIC KEY-----\nnope\n").is_err());
    }

    #[test]
    fn test_sign_and_verify_with() {
        let artifact = sign_and_verify_with(b"abc26", test_key()).unwrap();

        assert!(artifact.is_valid);
        assert_eq!(artifact.key_bits, 2048);
        assert!(artifact.verify_content(b"abc26").unwrap());
        assert!(!artifact.verify_content(b"abc2").unwrap());
    }

    #[test]
    fn test_sign_and_verify_fresh_key() {
        let artifact = sign_and_verify(b"hello10284").unwrap();

        assert!(artifact.is_valid);
        assert_ne!(
            artifact.public_key_pem,
            test_key().public_key_pem().unwrap()
        );
        assert!(artifact.verify_content(b"hello10284").unwrap());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let rendered = format!("{:?}", test_key());
        assert!(rendered.contains("2048"));
        assert!(!rendered.contains("private"));
    }
}
