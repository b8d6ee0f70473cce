//! Human-readable and JSON reports of a mining run

use serde::{Deserialize, Serialize};

use crate::algorithm::{MiningResult, HASH_ALGORITHM};
use crate::signer::SignedArtifact;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// A completed mining run, optionally with a signature over its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningReport {
    pub algorithm: String,
    pub result: MiningResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignedArtifact>,
}

impl MiningReport {
    pub fn new(result: MiningResult, signature: Option<SignedArtifact>) -> Self {
        Self {
            algorithm: HASH_ALGORITHM.to_string(),
            result,
            signature,
        }
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    /// Plain-text report; elapsed time is fixed to two decimals
    pub fn to_text(&self) -> String {
        let r = &self.result;
        let mut out = format!("Result for digest with {} leading zeros:\n", r.difficulty);
        out.push_str(&format!("  Elapsed:   {:.2} s\n", r.elapsed_secs));
        out.push_str(&format!("  Nonce:     {}\n", r.nonce));
        out.push_str(&format!("  Content:   {}\n", r.content));
        out.push_str(&format!("  Digest:    {}\n", r.digest_hex));
        out.push_str(&format!("  Attempts:  {}\n", r.attempts));

        if let Some(artifact) = &self.signature {
            out.push_str(&signature_text(artifact));
        }

        out
    }
}

/// Text block describing a signature and its verification outcome
pub fn signature_text(artifact: &SignedArtifact) -> String {
    format!(
        "  Key:       RSA-{}\n  Signature: {}\n  Verified:  {}\n",
        artifact.key_bits,
        artifact.signature,
        outcome(artifact.is_valid)
    )
}

/// `success` or `failure`
pub fn outcome(valid: bool) -> &'static str {
    if valid {
        "success"
    } else {
        "failure"
    }
}
