// Block-lattice ledger node
// Command line entry point for creating and inspecting a ledger database

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lattice_ledger::{Account, BlockHash, Genesis, KeyPair, Ledger, NodeConfig, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "lattice-node")]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the data directory from the configuration
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger and write the genesis open block
    Init {
        /// Hex private key of the genesis account; a fresh key is generated when omitted
        #[arg(long)]
        key: Option<String>,
        /// Total supply credited to the genesis account
        #[arg(long, default_value = "340282366920938463463374607431768211455")]
        supply: u128,
    },
    /// Inspect ledger data
    Inspect {
        /// What to inspect: stats, account, block, representatives
        #[arg(short, long, default_value = "stats")]
        target: String,
        /// Account or block hash in hex
        #[arg(short, long)]
        id: Option<String>,
    },
    /// Print the XOR checksum of all account heads
    Checksum,
    /// Generate an account key pair
    Keygen,
    /// Print the effective configuration, or write it to a file
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Init { key, supply } => init_ledger(&config, key, supply),
        Commands::Inspect { target, id } => inspect_ledger(&config, &target, id),
        Commands::Checksum => print_checksum(&config),
        Commands::Keygen => generate_keys(),
        Commands::Config { output } => write_config(&config, output),
    }
}

fn open_ledger(config: &NodeConfig) -> anyhow::Result<Arc<Ledger>> {
    let store = Store::open(&config.data_dir, config.database.clone())
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;
    Ok(Arc::new(Ledger::new(store, config.ledger.clone())))
}

fn init_ledger(config: &NodeConfig, key: Option<String>, supply: u128) -> anyhow::Result<()> {
    let keys = match key {
        Some(text) => KeyPair::from_hex(&text)?,
        None => {
            let keys = KeyPair::generate()?;
            println!("🔑 Genesis private key: {}", keys.private_hex());
            keys
        }
    };
    let ledger = open_ledger(config)?;
    let genesis = Genesis::new(&keys, supply);

    let txn = ledger.store().tx_begin_write()?;
    ledger.initialize(&txn, &genesis)?;
    txn.commit().context("committing genesis")?;

    info!(data_dir = %config.data_dir.display(), "✅ Ledger ready");
    println!("🌱 Genesis account: {}", genesis.account());
    println!("   Genesis block:   {}", genesis.hash());
    println!("   Supply:          {}", supply);
    Ok(())
}

fn inspect_ledger(config: &NodeConfig, target: &str, id: Option<String>) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    let txn = ledger.store().tx_begin_read()?;

    match target {
        "stats" => {
            let stats = ledger.store().stats(&txn)?;
            println!("📊 Ledger statistics");
            println!("   Genesis:         {}", ledger.genesis_hash(&txn)?);
            println!("   Supply:          {}", ledger.supply(&txn)?);
            println!("   Blocks:          {}", stats.blocks);
            println!("   Accounts:        {}", stats.accounts);
            println!("   Receivable:      {}", stats.pending);
            println!("   Representatives: {}", stats.representatives);
        }
        "account" => {
            let Some(id) = id else {
                bail!("--id <account> is required");
            };
            let account = Account::from_hex(&id).context("parsing account")?;
            match ledger.account_info(&txn, &account)? {
                Some(info) => {
                    println!("👤 Account {}", account);
                    println!("   Head:         {}", info.head);
                    println!("   Open block:   {}", info.open_block);
                    println!("   Rep block:    {}", info.rep_block);
                    println!("   Balance:      {}", info.balance);
                    println!("   Receivable:   {}", ledger.account_pending(&txn, &account)?);
                    println!("   Block count:  {}", info.block_count);
                    println!("   Epoch:        {}", info.epoch);
                    println!("   Weight:       {}", ledger.weight(&txn, &account)?);
                }
                None => println!("❌ Account {} not found", account),
            }
        }
        "block" => {
            let Some(id) = id else {
                bail!("--id <hash> is required");
            };
            let hash = BlockHash::from_hex(&id).context("parsing block hash")?;
            match ledger.store().block_get_stored(&txn, &hash)? {
                Some(stored) => {
                    println!("📦 Block {}", hash);
                    println!("{}", serde_json::to_string_pretty(&stored.block)?);
                    println!("   Account:   {}", stored.sideband.account);
                    println!("   Height:    {}", stored.sideband.height);
                    println!("   Balance:   {}", stored.sideband.balance);
                    println!("   Successor: {}", stored.sideband.successor);
                    println!("   Epoch:     {}", stored.sideband.epoch);
                }
                None => println!("❌ Block {} not found", hash),
            }
        }
        "representatives" => {
            println!("🗳️  Representatives");
            for (representative, weight) in ledger.store().representation_all(&txn)? {
                println!("   {} {}", representative, weight);
            }
        }
        other => bail!("unknown target {}; use stats, account, block or representatives", other),
    }
    Ok(())
}

fn print_checksum(config: &NodeConfig) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    let txn = ledger.store().tx_begin_read()?;
    println!("{}", ledger.checksum(&txn, ..)?);
    Ok(())
}

fn generate_keys() -> anyhow::Result<()> {
    let keys = KeyPair::generate()?;
    println!("✅ Key pair generated");
    println!("   Account:     {}", keys.account());
    println!("   Private key: {}", keys.private_hex());
    Ok(())
}

fn write_config(config: &NodeConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            config.save(&path)?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
