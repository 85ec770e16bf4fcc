//! Staking command line.
//!
//! Runs one lifecycle operation for a vault account and prints the
//! resulting operation hash.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xtz_staker::{HttpLedgerClient, StakerConfig, Staker, StakingError};
use xtz_vault::{HttpVaultClient, Network};

/// Delegate and stake Tezos held in a custodial vault.
#[derive(Parser, Debug)]
#[command(name = "xtz-staker")]
#[command(about = "Custodial-signed Tezos delegation and staking")]
#[command(version)]
struct Args {
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tezos node RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// Vault API base URL
    #[arg(long)]
    vault_url: Option<String>,

    /// Vault API key (or use XTZ_STAKER_API_KEY env var)
    #[arg(long, env = "XTZ_STAKER_API_KEY")]
    api_key: Option<String>,

    /// Path to the vault API secret key in PEM (or use XTZ_STAKER_API_SECRET env var)
    #[arg(long, env = "XTZ_STAKER_API_SECRET")]
    api_secret: Option<PathBuf>,

    /// Vault account ID
    #[arg(long)]
    account: String,

    /// Use the testnet asset
    #[arg(long)]
    testnet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delegate to a baker
    Delegate {
        baker: String,
        /// Reveal the account public key in the same batch
        #[arg(long)]
        reveal: bool,
        /// Wait for this operation to be included first
        #[arg(long)]
        await_hash: Option<String>,
    },
    /// Remove the current delegate
    Undelegate {
        #[arg(long)]
        await_hash: Option<String>,
    },
    /// Stake an amount of tez
    Stake {
        amount: String,
        #[arg(long)]
        await_hash: Option<String>,
    },
    /// Unstake an amount of tez
    Unstake {
        amount: String,
        #[arg(long)]
        await_hash: Option<String>,
    },
    /// Finalize unstaked tez
    FinalizeUnstake {
        #[arg(long)]
        await_hash: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    info!("Node RPC: {}", config.rpc_url);
    info!("Vault API: {}", config.vault.base_url);

    let vault = match HttpVaultClient::new(&config.vault) {
        Ok(vault) => vault,
        Err(e) => {
            error!("Failed to create vault client: {}", e);
            std::process::exit(1);
        }
    };
    let ledger = HttpLedgerClient::new(&config.rpc_url);
    let staker = Staker::new(vault, ledger, config);

    match run(&staker, &args) {
        Ok(operation_hash) => println!("{}", operation_hash),
        Err(e) => {
            error!("{} failed ({}): {}", command_name(&args.command), e.kind(), e);
            std::process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<StakerConfig, String> {
    let mut config = match &args.config {
        Some(path) => StakerConfig::load(path).map_err(|e| format!("{:?}: {}", path, e))?,
        None => StakerConfig::default(),
    };
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(vault_url) = &args.vault_url {
        config.vault.base_url = vault_url.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.vault.api_key = api_key.clone();
    }
    if let Some(api_secret) = &args.api_secret {
        config.vault.api_secret_path = Some(api_secret.clone());
    }
    Ok(config)
}

fn run(
    staker: &Staker<HttpVaultClient, HttpLedgerClient>,
    args: &Args,
) -> Result<String, StakingError> {
    let account = args.account.as_str();
    let network = Network::from_testnet_flag(args.testnet);

    match &args.command {
        Command::Delegate {
            baker,
            reveal,
            await_hash,
        } => staker.delegate(
            account,
            Some(baker.as_str()),
            *reveal,
            network,
            await_hash.as_deref(),
        ),
        Command::Undelegate { await_hash } => {
            staker.undelegate(account, network, await_hash.as_deref())
        }
        Command::Stake { amount, await_hash } => {
            staker.stake(account, amount, network, await_hash.as_deref())
        }
        Command::Unstake { amount, await_hash } => {
            staker.unstake(account, amount, network, await_hash.as_deref())
        }
        Command::FinalizeUnstake { await_hash } => {
            staker.finalize_unstake(account, network, await_hash.as_deref())
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Delegate { .. } => "delegate",
        Command::Undelegate { .. } => "undelegate",
        Command::Stake { .. } => "stake",
        Command::Unstake { .. } => "unstake",
        Command::FinalizeUnstake { .. } => "finalize-unstake",
    }
}
