use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use weil_client::config::{ClientConfig, CONFIG_FILE_NAME};
use weil_client::{Account, ClientError, ContractCall, WeilClient};
use weil_crypto::hd::MnemonicWallet;
use weil_crypto::keys::verify;
use weil_types::contract::{decode_pod_counter, ContractId};

#[derive(Parser)]
#[command(
    name = "weil",
    about = "WeilChain wallet: sign and submit applet transactions",
    version
)]
pub struct Cli {
    /// Path to config file (defaults to ./weil.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Private key file, overriding the config
    #[arg(long, global = true)]
    pub key: Option<PathBuf>,
    /// Sentinel host or URL, overriding the config and SENTINEL_HOST
    #[arg(long, global = true)]
    pub sentinel: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the public key and address of the key file
    Address,
    /// Decode the pod counter embedded in a contract id
    PodCounter {
        contract_id: String,
    },
    /// Sign a message with the key file
    Sign {
        message: String,
    },
    /// Verify a hex signature over a message
    Verify {
        message: String,
        #[arg(long)]
        signature: String,
        /// Hex SEC1 public key (compressed or uncompressed)
        #[arg(long)]
        public_key: String,
    },
    /// Execute a contract method
    Execute {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        method: String,
        /// JSON-encoded method arguments
        #[arg(long, default_value = "{}")]
        args: String,
        /// Return once the sentinel accepts the transaction
        #[arg(long)]
        non_blocking: bool,
        /// Publish the arguments on the ledger (hidden by default)
        #[arg(long)]
        show_args: bool,
    },
    /// Write a log entry to the audit applet
    Audit {
        log: String,
    },
    /// Mnemonic wallet operations
    Mnemonic {
        #[command(subcommand)]
        command: MnemonicCommand,
    },
    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum MnemonicCommand {
    /// Generate a new 24-word mnemonic wallet
    New {
        /// Store the wallet to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Derive an account from a stored wallet
    Derive {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
}

/// Resolve the effective configuration: file, then `SENTINEL_HOST`, then
/// command-line flags.
pub fn load_config(cli: &Cli) -> Result<ClientConfig, ClientError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None if Path::new(CONFIG_FILE_NAME).exists() => ClientConfig::load(CONFIG_FILE_NAME)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();

    if let Some(sentinel) = &cli.sentinel {
        config.apply_sentinel_host(sentinel);
    }
    if let Some(key) = &cli.key {
        config.key_path = key.clone();
    }
    Ok(config)
}

fn load_account(config: &ClientConfig) -> Result<Account, ClientError> {
    Ok(Account::load(&config.key_path)?)
}

pub async fn run(cli: Cli, config: ClientConfig) -> Result<(), ClientError> {
    match cli.command {
        Command::Address => {
            let account = load_account(&config)?;
            println!("public key: {}", account.public_key_hex());
            println!("address:    {}", account.address());
        }
        Command::PodCounter { contract_id } => {
            println!("{}", decode_pod_counter(&contract_id)?);
        }
        Command::Sign { message } => {
            let account = load_account(&config)?;
            println!("{}", account.sign(message.as_bytes())?);
        }
        Command::Verify {
            message,
            signature,
            public_key,
        } => {
            let public_key = hex::decode(public_key.trim()).map_err(|e| ClientError::Config {
                reason: format!("public key is not valid hex: {}", e),
            })?;
            verify(message.as_bytes(), &signature, &public_key)?;
            println!("signature is valid");
        }
        Command::Execute {
            contract,
            method,
            args,
            non_blocking,
            show_args,
        } => {
            let client = WeilClient::new(load_account(&config)?, &config)?;
            let call = ContractCall::new(ContractId::parse(&contract)?, method, args)
                .hide_args(!show_args);
            let result = client.call(&call, !non_blocking).await?;
            if non_blocking {
                println!("transaction accepted");
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Command::Audit { log } => {
            let client = WeilClient::new(load_account(&config)?, &config)?;
            client.audit(&log).await?;
            println!("audit log submitted");
        }
        Command::Mnemonic { command } => run_mnemonic(command)?,
        Command::Init { dir } => {
            let path = ClientConfig::init(&dir)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn run_mnemonic(command: MnemonicCommand) -> Result<(), ClientError> {
    match command {
        MnemonicCommand::New { out } => {
            let mut wallet = MnemonicWallet::generate()?;
            let account = wallet.derive_account(0)?;
            println!("mnemonic: {}", wallet.mnemonic());
            println!("address:  {}", account.address);
            println!("Write the mnemonic down; it is the only way to recover this wallet.");
            if let Some(path) = out {
                wallet.store(&path)?;
                println!("wallet saved to {}", path.display());
            }
        }
        MnemonicCommand::Derive { wallet, index } => {
            let mut wallet = MnemonicWallet::load(&wallet)?;
            let account = wallet.derive_account(index)?;
            println!("path:       {}/{}", wallet.derivation_path(), index);
            println!("public key: {}", hex::encode(account.public_key));
            println!("address:    {}", account.address);
        }
    }
    Ok(())
}
