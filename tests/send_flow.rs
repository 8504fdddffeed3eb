mod support;

use anyhow::Result;

use ln_wallet_core::PaymentError;
use ln_wallet_core::engine::PaymentFilter;
use ln_wallet_core::engine::sandbox::SandboxConfig;
use ln_wallet_core::payment::{PaymentDirection, PaymentStatus};

#[tokio::test]
async fn classify_prepare_execute_round_trip() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let raw = support::test_invoice(Some(250_000_000), "round trip")?;

    let intent = tw.wallet.classify(&raw)?;
    let prepared = tw.wallet.prepare_send(&intent, None).await?;
    assert_eq!(prepared.amount_sat, 250_000);
    // 2000 ppm of 250_000 sat
    assert_eq!(prepared.fee_sat, 500);

    let record = tw.wallet.send(&prepared).await?;
    assert!(matches!(
        record.status,
        PaymentStatus::Pending | PaymentStatus::Complete
    ));
    assert_eq!(record.direction, PaymentDirection::Send);
    assert_eq!(record.amount_sat, 250_000);
    assert_eq!(record.fee_sat, 500);

    let payments = tw.wallet.list_payments(&PaymentFilter::default()).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].id, prepared.id);
    Ok(())
}

#[tokio::test]
async fn coarse_check_reports_amount_against_balance() -> Result<()> {
    let cfg = SandboxConfig {
        starting_balance_sat: 1_000,
        ..SandboxConfig::default()
    };
    let tw = support::connected_wallet(cfg).await?;
    let raw = support::test_invoice(None, "too big")?;
    let intent = tw.wallet.classify(&raw)?;

    let err = tw.wallet.prepare_send(&intent, Some(5_000)).await.unwrap_err();
    assert_eq!(
        err,
        PaymentError::InsufficientFunds {
            required: 5_000,
            available: 1_000,
        }
    );
    Ok(())
}

#[tokio::test]
async fn exact_check_includes_quoted_fee() -> Result<()> {
    // 1_000_000 sat at 2000 ppm quotes a 2_000 sat fee; leave the balance
    // one sat short of amount + fee.
    let cfg = SandboxConfig {
        starting_balance_sat: 1_001_999,
        ..SandboxConfig::default()
    };
    let tw = support::connected_wallet(cfg).await?;
    let raw = support::test_invoice(None, "fee inclusive")?;
    let intent = tw.wallet.classify(&raw)?;

    let err = tw
        .wallet
        .prepare_send(&intent, Some(1_000_000))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PaymentError::InsufficientFunds {
            required: 1_002_000,
            available: 1_001_999,
        }
    );
    Ok(())
}

#[tokio::test]
async fn limits_are_checked_before_balance() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let raw = support::test_invoice(None, "over the cap")?;
    let intent = tw.wallet.classify(&raw)?;

    // Above both the lightning maximum and the balance; the policy maximum
    // must win.
    let err = tw
        .wallet
        .prepare_send(&intent, Some(26_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn invoice_amount_wins_over_caller_override() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let raw = support::test_invoice(Some(20_000_000), "fixed amount")?;
    let intent = tw.wallet.classify(&raw)?;

    let prepared = tw.wallet.prepare_send(&intent, Some(7)).await?;
    assert_eq!(prepared.amount_sat, 20_000);
    Ok(())
}

#[tokio::test]
async fn open_amount_destination_needs_an_amount() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let raw = support::test_invoice(None, "no amount anywhere")?;
    let intent = tw.wallet.classify(&raw)?;

    let err = tw.wallet.prepare_send(&intent, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidAmount(_)));
    Ok(())
}

#[tokio::test]
async fn second_execute_never_reaches_the_engine() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let raw = support::test_invoice(Some(10_000_000), "once only")?;
    let intent = tw.wallet.classify(&raw)?;
    let prepared = tw.wallet.prepare_send(&intent, None).await?;

    tw.wallet.send(&prepared).await?;
    let err = tw.wallet.send(&prepared).await.unwrap_err();
    assert!(matches!(err, PaymentError::ExecutionFailed(_)));

    // The balance moved exactly once.
    let payments = tw.wallet.list_payments(&PaymentFilter::default()).await?;
    assert_eq!(payments.len(), 1);
    Ok(())
}

#[tokio::test]
async fn expired_quote_is_rejected_not_requoted() -> Result<()> {
    let cfg = SandboxConfig {
        quote_ttl_secs: 0,
        ..SandboxConfig::default()
    };
    let tw = support::connected_wallet(cfg).await?;
    let raw = support::test_invoice(Some(10_000_000), "stale quote")?;
    let intent = tw.wallet.classify(&raw)?;
    let prepared = tw.wallet.prepare_send(&intent, None).await?;

    let err = tw.wallet.send(&prepared).await.unwrap_err();
    match err {
        PaymentError::PreparationFailed(detail) => assert!(detail.contains("expired")),
        other => panic!("expected PreparationFailed, got {other:?}"),
    }

    let payments = tw.wallet.list_payments(&PaymentFilter::default()).await?;
    assert!(payments.is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_execute_never_consumes_the_artifact_id() -> Result<()> {
    let cfg = SandboxConfig {
        quote_ttl_secs: 0,
        ..SandboxConfig::default()
    };
    let tw = support::connected_wallet(cfg).await?;
    let raw = support::test_invoice(Some(10_000_000), "stays expired")?;
    let intent = tw.wallet.classify(&raw)?;
    let prepared = tw.wallet.prepare_send(&intent, None).await?;

    // Every attempt reports the expiry, never a duplicate submission: the
    // id was dropped before it ever reached the consumed set.
    for _ in 0..2 {
        let err = tw.wallet.send(&prepared).await.unwrap_err();
        assert!(matches!(err, PaymentError::PreparationFailed(_)));
    }
    Ok(())
}

#[tokio::test]
async fn unpayable_intents_are_unsupported() -> Result<()> {
    let tw = support::connected_wallet(SandboxConfig::default()).await?;
    let intent = tw
        .wallet
        .classify("lnurlw://withdraw.example.com/api?k1=abc")?;

    let err = tw.wallet.prepare_send(&intent, Some(1_000)).await.unwrap_err();
    assert_eq!(err, PaymentError::UnsupportedPaymentType);
    Ok(())
}

#[tokio::test]
async fn prepare_fails_fast_when_not_connected() -> Result<()> {
    let tw = support::wallet_with(SandboxConfig::default())?;
    let raw = support::test_invoice(Some(1_000_000), "offline")?;
    let intent = tw.wallet.classify(&raw)?;

    let err = tw.wallet.prepare_send(&intent, None).await.unwrap_err();
    assert_eq!(err, PaymentError::NotConnected);
    Ok(())
}
