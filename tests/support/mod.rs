#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context as _, Result};
use bitcoin::hashes::{Hash as _, sha256};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};
use tempfile::TempDir;

use ln_wallet_core::Wallet;
use ln_wallet_core::credentials::MemoryCredentialStore;
use ln_wallet_core::engine::sandbox::{SandboxConfig, SandboxEngine};

pub struct TestWallet {
    pub wallet: Wallet,
    pub engine: Arc<SandboxEngine>,
    _dir: TempDir,
}

pub fn wallet_with(cfg: SandboxConfig) -> Result<TestWallet> {
    let dir = tempfile::tempdir().context("create tempdir")?;
    let engine = Arc::new(
        SandboxEngine::open(dir.path().join("ledger.sqlite3"), cfg)
            .context("open sandbox engine")?,
    );
    let credentials = Arc::new(MemoryCredentialStore::new("test-secret"));
    let wallet = Wallet::new(engine.clone(), credentials, bitcoin::Network::Bitcoin);
    Ok(TestWallet {
        wallet,
        engine,
        _dir: dir,
    })
}

pub async fn connected_wallet(cfg: SandboxConfig) -> Result<TestWallet> {
    let tw = wallet_with(cfg)?;
    tw.wallet.connect().await.context("connect wallet")?;
    Ok(tw)
}

/// Mints a signed regtest BOLT11 invoice so classification and send tests
/// run against real invoice grammar.
pub fn test_invoice(amount_msat: Option<u64>, description: &str) -> Result<String> {
    let secp = Secp256k1::new();
    let key = SecretKey::from_slice(&[0x42; 32]).expect("valid secret key bytes");
    let payment_hash = sha256::Hash::hash(description.as_bytes());

    let mut builder = InvoiceBuilder::new(Currency::Regtest)
        .description(description.to_string())
        .payment_hash(payment_hash)
        .payment_secret(PaymentSecret([43u8; 32]))
        .current_timestamp()
        .min_final_cltv_expiry_delta(144);
    if let Some(msat) = amount_msat {
        builder = builder.amount_milli_satoshis(msat);
    }

    let invoice = builder
        .build_signed(|hash| secp.sign_ecdsa_recoverable(hash, &key))
        .map_err(|e| anyhow::anyhow!("sign test invoice: {e}"))?;
    Ok(invoice.to_string())
}

/// A valid Liquid mainnet P2WPKH address.
pub fn liquid_address() -> String {
    use lwk_wollet::elements::bitcoin::PublicKey;
    use lwk_wollet::elements::bitcoin::secp256k1::{Secp256k1, SecretKey};
    use lwk_wollet::elements::{Address, AddressParams};

    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[0x11; 32]).expect("valid secret key bytes");
    let pk = PublicKey::new(sk.public_key(&secp));
    Address::p2wpkh(&pk, None, &AddressParams::LIQUID).to_string()
}
