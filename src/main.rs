use anyhow::{anyhow, Context, Result};
use clap::Parser;
use provider_probe::client::RpcChainClient;
use provider_probe::config::{self, ProbeConfig};
use provider_probe::settings::ProbeSettings;
use provider_probe::{operation_log, probe};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(version, about = "One-shot JSON-RPC diagnostic for EVM QA networks")]
struct Args {
    /// RPC endpoint to probe (overrides RPC_URL and saved settings)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Chain ID; selects a built-in network and its default RPC
    #[arg(long)]
    chain_id: Option<u64>,

    /// Signer set index used for the nonce-bump transfer
    #[arg(long, default_value_t = 0)]
    signer_index: usize,

    /// Recipient of the nonce-bump transfer
    #[arg(long)]
    recipient: Option<String>,

    /// Also resolve the signer and submit the 1-wei nonce-bump transfer
    #[arg(long)]
    nonce_bump: bool,

    /// Seconds to wait for the transfer to be mined
    #[arg(long)]
    confirmation_timeout: Option<u64>,

    /// Seconds allowed for the whole run
    #[arg(long)]
    run_deadline: Option<u64>,

    /// Persist the selected chain, RPC, recipient and deadlines as defaults
    #[arg(long)]
    save_defaults: bool,

    /// Print past probe runs and exit
    #[arg(long)]
    show_log: bool,
}

/// Layer the configuration sources: built-in defaults, then the settings
/// file, then the environment, then CLI flags.
fn build_config(args: &Args, settings: &ProbeSettings) -> Result<ProbeConfig> {
    let chain_id = args.chain_id.unwrap_or(settings.selected_chain_id);

    let rpc_url = args
        .rpc_url
        .clone()
        .or_else(|| env::var("RPC_URL").ok())
        .or_else(|| settings.get_custom_rpc(chain_id).cloned())
        .or_else(|| {
            config::find_network_by_chain_id(chain_id).map(|n| n.default_rpc.to_string())
        })
        .ok_or_else(|| {
            anyhow!(
                "no RPC endpoint known for chain {}: pass --rpc-url or set RPC_URL",
                chain_id
            )
        })?;

    // ProbeConfig::new applies environment overrides on top of built-ins
    let mut config = ProbeConfig::new(rpc_url, chain_id);
    config.signer_index = args.signer_index;
    config.nonce_bump = args.nonce_bump;

    // Settings file fills anything the environment left alone
    if env::var("CONFIRMATION_TIMEOUT_SECS").is_err() {
        config.confirmation_timeout_secs = settings.confirmation_timeout_secs;
    }
    if env::var("RUN_DEADLINE_SECS").is_err() {
        config.run_deadline_secs = settings.run_deadline_secs;
    }
    if env::var("NONCE_BUMP_RECIPIENT").is_err() {
        if let Some(ref recipient) = settings.recipient_override {
            config.recipient = recipient
                .parse()
                .context("invalid recipient in settings file")?;
        }
    }

    // CLI flags win over everything
    if let Some(timeout) = args.confirmation_timeout {
        config.confirmation_timeout_secs = timeout;
    }
    if let Some(deadline) = args.run_deadline {
        config.run_deadline_secs = deadline;
    }
    if let Some(ref recipient) = args.recipient {
        config.recipient = recipient.parse().context("invalid --recipient address")?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if args.show_log {
        info!("Operation log at {}", operation_log::log_file_path());
        print!("{}", operation_log::read_log()?);
        return Ok(());
    }

    let mut settings = ProbeSettings::load();
    let config = build_config(&args, &settings)?;

    if args.save_defaults {
        settings.selected_chain_id = config.chain_id;
        settings.set_custom_rpc(config.chain_id, config.rpc_url.clone());
        settings.recipient_override = Some(format!("{:?}", config.recipient));
        settings.confirmation_timeout_secs = config.confirmation_timeout_secs;
        settings.run_deadline_secs = config.run_deadline_secs;
        settings.save()?;
        info!("Saved defaults to {}", ProbeSettings::settings_path_display());
    }

    info!(
        "Probing {} ({}, chain {}) as signer {}",
        config.rpc_url,
        config.network_label(),
        config.chain_id,
        config.signer_index
    );

    let client = RpcChainClient::connect(&config).await?;

    let mut stdout = std::io::stdout();
    let deadline = Duration::from_secs(config.run_deadline_secs);
    match tokio::time::timeout(deadline, probe::run(&client, &config, &mut stdout)).await {
        Ok(Ok(summary)) => {
            let outcome = if config.nonce_bump {
                "ok (nonce-bump)"
            } else {
                "ok (read-only)"
            };
            if let Err(e) = operation_log::record_run(&summary, config.native_token(), outcome) {
                warn!("Failed to append operation log: {}", e);
            }
            Ok(())
        }
        Ok(Err(e)) => {
            let _ = operation_log::record_failure(config.chain_id, &e.to_string());
            Err(e.into())
        }
        Err(_) => {
            let message = format!("probe run exceeded the {}s deadline", config.run_deadline_secs);
            let _ = operation_log::record_failure(config.chain_id, &message);
            Err(anyhow!(message))
        }
    }
}
