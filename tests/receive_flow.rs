mod support;

use anyhow::Result;

use ln_wallet_core::PaymentError;
use ln_wallet_core::engine::PaymentFilter;
use ln_wallet_core::engine::sandbox::SandboxConfig;
use ln_wallet_core::payment::{PaymentDirection, PaymentRail, PaymentStatus};

#[tokio::test]
async fn zero_amount_is_rejected() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let err = tw
        .wallet
        .prepare_receive(Some(0), PaymentRail::Lightning)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn amount_above_policy_maximum_is_rejected() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    // default lightning maximum is 25_000_000 sat
    let err = tw
        .wallet
        .prepare_receive(Some(25_000_001), PaymentRail::Lightning)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn amount_below_rail_minimum_is_rejected() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    // default on-chain minimum is 546 sat
    let err = tw
        .wallet
        .prepare_receive(Some(100), PaymentRail::Onchain)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn open_amount_skips_the_bounds_check() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;

    let prepared = tw.wallet.prepare_receive(None, PaymentRail::Lightning).await?;
    assert_eq!(prepared.amount_sat, None);

    let artifact = tw.wallet.receive(&prepared, Some("open tab")).await?;
    assert!(artifact.destination.starts_with("lnsandbox"));
    assert_eq!(artifact.fee_sat, prepared.fee_sat);
    Ok(())
}

#[tokio::test]
async fn receive_round_trip_settles_and_credits_balance() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;

    let prepared = tw
        .wallet
        .prepare_receive(Some(50_000), PaymentRail::Lightning)
        .await?;
    let artifact = tw.wallet.receive(&prepared, Some("invoice for tests")).await?;
    assert!(!artifact.destination.is_empty());

    let balance = tw.wallet.balance().await?;
    assert_eq!(balance.pending_receive_sat, 50_000);
    assert_eq!(balance.total_sat, 1_000_000);

    let filter = PaymentFilter {
        direction: Some(PaymentDirection::Receive),
        status: None,
    };
    let pending = tw.wallet.list_payments(&filter).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, PaymentStatus::Pending);

    assert_eq!(tw.engine.settle_pending()?, 1);

    let balance = tw.wallet.balance().await?;
    assert_eq!(balance.pending_receive_sat, 0);
    assert_eq!(balance.total_sat, 1_050_000);
    Ok(())
}

#[tokio::test]
async fn prepared_receive_is_consumed_once() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let prepared = tw
        .wallet
        .prepare_receive(Some(10_000), PaymentRail::Liquid)
        .await?;

    tw.wallet.receive(&prepared, None).await?;
    let err = tw.wallet.receive(&prepared, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::ReceiveExecutionFailed(_)));
    Ok(())
}

#[tokio::test]
async fn receive_fails_fast_when_not_connected() -> Result<()> {
    let tw = support::wallet_with(SandboxConfig::default())?;
    let err = tw
        .wallet
        .prepare_receive(Some(1_000), PaymentRail::Lightning)
        .await
        .unwrap_err();
    assert_eq!(err, PaymentError::NotConnected);
    Ok(())
}
