use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser as _, Subcommand};
use serde_json::json;

use ln_wallet_core::Wallet;
use ln_wallet_core::credentials::FileCredentialStore;
use ln_wallet_core::engine::sandbox::{SandboxConfig, SandboxEngine};
use ln_wallet_core::engine::{PaymentFilter, RefundableSwap};
use ln_wallet_core::payment::PaymentRail;

#[derive(Debug, clap::Parser)]
struct Args {
    /// Directory holding the sandbox ledger and connection secret.
    #[arg(long, default_value = ".wallet-sandbox")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a connection secret and seed the sandbox ledger.
    Init {
        #[arg(long, default_value = "sandbox-secret")]
        secret: String,

        /// Refundable swaps to seed, as swap_address:amount_sat pairs.
        #[arg(long)]
        refundable: Vec<String>,
    },
    /// Classify a raw payment input without touching the engine.
    Classify { input: String },
    Balance,
    /// Classify, prepare and execute an outbound payment.
    Send {
        input: String,

        /// Amount for open-amount destinations; ignored when the
        /// destination fixes one.
        #[arg(long)]
        amount_sat: Option<u64>,
    },
    /// Prepare and materialize an inbound payment artifact.
    Receive {
        #[arg(long, default_value = "lightning")]
        rail: String,

        #[arg(long)]
        amount_sat: Option<u64>,

        #[arg(long)]
        description: Option<String>,
    },
    Payments,
    Refundables,
    FeeTiers,
    Refund {
        #[arg(long)]
        swap_address: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        fee_rate_sat_per_vb: u32,
    },
    /// Settle pending sandbox payments (stand-in for engine callbacks).
    Settle,
}

#[tokio::main]
async fn main() -> Result<()> {
    ln_wallet_core::logging::init().ok();
    let args = Args::parse();

    let secret_path = args.data_dir.join("connection.secret");
    let ledger_path = args.data_dir.join("sandbox.sqlite3");

    if let Command::Init {
        secret,
        refundable,
    } = &args.command
    {
        std::fs::create_dir_all(&args.data_dir)
            .with_context(|| format!("create data dir {}", args.data_dir.display()))?;
        std::fs::write(&secret_path, secret)
            .with_context(|| format!("write {}", secret_path.display()))?;

        let cfg = SandboxConfig {
            seed_refundables: refundable
                .iter()
                .map(|s| parse_refundable(s))
                .collect::<Result<Vec<_>>>()?,
            ..SandboxConfig::default()
        };
        SandboxEngine::open(ledger_path, cfg).context("open sandbox ledger")?;

        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "data_dir": args.data_dir,
            }))?
        );
        return Ok(());
    }

    let engine = Arc::new(
        SandboxEngine::open(ledger_path, SandboxConfig::default())
            .context("open sandbox ledger")?,
    );
    let credentials = Arc::new(FileCredentialStore::new(secret_path));
    let wallet = Wallet::new(engine.clone(), credentials, bitcoin::Network::Regtest);

    let out = match args.command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::Classify { input } => {
            let intent = wallet.classify(&input).context("classify input")?;
            serde_json::to_value(&intent)?
        }
        Command::Balance => {
            wallet.connect().await.context("connect wallet")?;
            serde_json::to_value(wallet.balance().await.context("get balance")?)?
        }
        Command::Send { input, amount_sat } => {
            wallet.connect().await.context("connect wallet")?;
            let intent = wallet.classify(&input).context("classify input")?;
            let prepared = wallet
                .prepare_send(&intent, amount_sat)
                .await
                .context("prepare send")?;
            let record = wallet.send(&prepared).await.context("execute send")?;
            json!({
                "prepared": prepared,
                "record": record,
            })
        }
        Command::Receive {
            rail,
            amount_sat,
            description,
        } => {
            wallet.connect().await.context("connect wallet")?;
            let rail: PaymentRail = rail.parse().context("parse rail")?;
            let prepared = wallet
                .prepare_receive(amount_sat, rail)
                .await
                .context("prepare receive")?;
            let artifact = wallet
                .receive(&prepared, description.as_deref())
                .await
                .context("execute receive")?;
            json!({
                "prepared": prepared,
                "artifact": artifact,
            })
        }
        Command::Payments => {
            wallet.connect().await.context("connect wallet")?;
            serde_json::to_value(
                wallet
                    .list_payments(&PaymentFilter::default())
                    .await
                    .context("list payments")?,
            )?
        }
        Command::Refundables => {
            wallet.connect().await.context("connect wallet")?;
            serde_json::to_value(wallet.list_refundable().await.context("list refundables")?)?
        }
        Command::FeeTiers => {
            wallet.connect().await.context("connect wallet")?;
            serde_json::to_value(wallet.fee_tiers().await.context("fetch fee tiers")?)?
        }
        Command::Refund {
            swap_address,
            to,
            fee_rate_sat_per_vb,
        } => {
            wallet.connect().await.context("connect wallet")?;
            let resp = wallet
                .refund(&swap_address, &to, fee_rate_sat_per_vb)
                .await
                .context("execute refund")?;
            serde_json::to_value(resp)?
        }
        Command::Settle => {
            let settled = engine.settle_pending().context("settle pending")?;
            json!({ "settled": settled })
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn parse_refundable(s: &str) -> Result<RefundableSwap> {
    let (swap_address, amount) = s
        .rsplit_once(':')
        .with_context(|| format!("expected swap_address:amount_sat, got {s}"))?;
    Ok(RefundableSwap {
        swap_address: swap_address.to_string(),
        amount_sat: amount
            .parse()
            .with_context(|| format!("invalid amount_sat in {s}"))?,
    })
}
