use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "provider_probe_settings.json";

fn default_confirmation_timeout() -> u64 {
    crate::config::DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_run_deadline() -> u64 {
    crate::config::DEFAULT_RUN_DEADLINE_SECS
}

/// Probe defaults that persist between runs, so operators can point the tool
/// at their QA network once instead of repeating flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Selected network chain ID
    pub selected_chain_id: u64,
    /// Custom RPC overrides per chain ID
    #[serde(default)]
    pub custom_rpcs: HashMap<u64, String>,
    /// Recipient override for the nonce-bump transfer
    #[serde(default)]
    pub recipient_override: Option<String>,
    /// Confirmation deadline for the transfer (seconds)
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    /// Deadline for the whole run (seconds)
    #[serde(default = "default_run_deadline")]
    pub run_deadline_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            selected_chain_id: 1337, // local dev chain by default
            custom_rpcs: HashMap::new(),
            recipient_override: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            run_deadline_secs: default_run_deadline(),
        }
    }
}

impl ProbeSettings {
    /// Get the settings file path
    fn settings_path() -> PathBuf {
        // Try to use the app data directory, fall back to current directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("provider-probe");
            if !app_dir.exists() {
                let _ = fs::create_dir_all(&app_dir);
            }
            app_dir.join(SETTINGS_FILE)
        } else {
            PathBuf::from(SETTINGS_FILE)
        }
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let path = Self::settings_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => {
                        tracing::info!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse settings file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read settings file: {}", e);
                }
            }
        }
        tracing::info!("Using default settings");
        Self::default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get custom RPC for a chain, or None if using default
    pub fn get_custom_rpc(&self, chain_id: u64) -> Option<&String> {
        self.custom_rpcs.get(&chain_id).filter(|s| !s.is_empty())
    }

    /// Set custom RPC for a chain (empty string removes the override)
    pub fn set_custom_rpc(&mut self, chain_id: u64, rpc: String) {
        if rpc.trim().is_empty() {
            self.custom_rpcs.remove(&chain_id);
        } else {
            self.custom_rpcs.insert(chain_id, rpc.trim().to_string());
        }
    }

    /// Get the settings file path for display
    pub fn settings_path_display() -> String {
        Self::settings_path().display().to_string()
    }
}
