//! Plain-text journal of probe runs, one entry per invocation.

use crate::probe::ProbeSummary;
use crate::utils;
use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

const OPERATION_LOG_FILE: &str = "probe_runs.txt";

/// Get the directory where app data is stored (same as settings)
fn app_data_dir() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join("provider-probe");
        if !app_dir.exists() {
            let _ = fs::create_dir_all(&app_dir);
        }
        app_dir
    } else {
        // Fall back to current directory
        PathBuf::from(".")
    }
}

fn log_path() -> PathBuf {
    app_data_dir().join(OPERATION_LOG_FILE)
}

/// Get the full path to the operation log file as a string for display
pub fn log_file_path() -> String {
    log_path().display().to_string()
}

/// Render the details block of a run entry.
fn summary_lines(summary: &ProbeSummary, native_token: &str) -> String {
    let mut lines = vec![
        format!("network={} ({})", summary.network.name, summary.network.chain_id),
        format!("endpoint={}", summary.endpoint),
        format!("gas_price={}", summary.gas_price),
    ];
    if let Some(ref account) = summary.account {
        lines.push(format!(
            "signer[{}]={} balance={} {}",
            account.index,
            utils::short_address(account.address),
            utils::format_ether(account.balance),
            native_token,
        ));
    }
    if let Some(tx_hash) = summary.tx_hash {
        lines.push(format!("nonce_bump_tx={:?}", tx_hash));
    }
    lines.join("\n")
}

/// Append one entry for a completed run.
pub fn record_run(summary: &ProbeSummary, native_token: &str, outcome: &str) -> Result<()> {
    append_entry(summary.network.chain_id, outcome, summary_lines(summary, native_token))
}

/// Append one entry for a run that failed before producing a summary.
pub fn record_failure(chain_id: u64, error: &str) -> Result<()> {
    append_entry(chain_id, "failed", format!("error={}", error))
}

fn append_entry(chain_id: u64, outcome: &str, details: String) -> Result<()> {
    let path = log_path();

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let timestamp = Utc::now().to_rfc3339();
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

    writeln!(
        file,
        "[{}] chain_id={} outcome={}",
        timestamp, chain_id, outcome
    )?;
    for line in details.lines() {
        writeln!(file, "  {}", line)?;
    }
    writeln!(file)?;
    Ok(())
}

/// Read the entire log file content
pub fn read_log() -> Result<String> {
    let path = log_path();
    if path.exists() {
        Ok(fs::read_to_string(&path)?)
    } else {
        Ok(String::new())
    }
}
