//! Probe failure taxonomy.
//!
//! Every variant is fatal and nothing is retried. The split between
//! `Submission` and `ConfirmationTimeout` lets an operator tell "never sent"
//! from "sent but unconfirmed".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The configured endpoint cannot be reached at all.
    #[error("cannot reach RPC endpoint: {0}")]
    Connectivity(String),

    /// A read-only query (network info, gas price, balance) failed.
    #[error("RPC query failed: {0}")]
    Query(String),

    /// No signer is configured at the requested index.
    #[error("no signer configured at index {index}")]
    SignerUnavailable { index: usize },

    /// Balance too low to cover the transfer value plus fee.
    #[error("insufficient funds for transfer: {0}")]
    InsufficientFunds(String),

    /// The node rejected the submitted transfer.
    #[error("transfer submission rejected: {0}")]
    Submission(String),

    /// The transfer was submitted but not mined within the deadline.
    #[error("transfer not confirmed within {timeout_secs}s")]
    ConfirmationTimeout { timeout_secs: u64 },

    /// The report output stream failed.
    #[error("failed to write report output")]
    Report(#[from] std::io::Error),
}

/// Classify a read-path provider error by message content. ethers flattens
/// transport and node errors into strings, so content matching is the only
/// signal available.
pub fn classify_rpc_error(message: &str) -> ProbeError {
    let lower = message.to_lowercase();

    let unreachable = lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("error sending request")
        || lower.contains("dns error")
        || lower.contains("timed out")
        || lower.contains("network is unreachable");

    if unreachable {
        ProbeError::Connectivity(message.to_string())
    } else {
        ProbeError::Query(message.to_string())
    }
}

/// Classify an error returned while broadcasting the transfer.
pub fn classify_submission_error(message: &str) -> ProbeError {
    if message.to_lowercase().contains("insufficient funds") {
        ProbeError::InsufficientFunds(message.to_string())
    } else {
        ProbeError::Submission(message.to_string())
    }
}
