use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::engine::{EngineHandle, FeeTiers, RefundResponse, RefundableSwap};
use crate::error::{PaymentError, translate};
use crate::validate;

/// Refund Recovery Manager: lists swaps stuck in a refundable failure state
/// and drives their resolution.
///
/// Per swap: `refundable -> (refund requested) -> refund pending -> gone
/// from the refundable set`. At most one refund execution is in flight per
/// swap address; a failed execution leaves the swap refundable and the
/// caller may retry.
pub struct RefundManager {
    conn: Arc<EngineHandle>,
    network: bitcoin::Network,
    in_flight: Mutex<HashSet<String>>,
}

impl RefundManager {
    pub fn new(conn: Arc<EngineHandle>, network: bitcoin::Network) -> Self {
        Self {
            conn,
            network,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Idempotent read of the refundable set through the engine.
    pub async fn list_refundable(&self) -> Result<Vec<RefundableSwap>, PaymentError> {
        let engine = self.conn.engine()?;
        engine
            .list_refundable_swaps()
            .await
            .map_err(translate::engine_read)
    }

    /// Fee tiers from the engine's estimator. The manager never invents fee
    /// values; an estimator result violating `fastest >= normal >= slow >=
    /// economy` is rejected outright.
    pub async fn fee_tiers(&self) -> Result<FeeTiers, PaymentError> {
        let engine = self.conn.engine()?;
        let tiers = engine.fee_tiers().await.map_err(translate::fee_tiers)?;
        if !tiers.is_ordered() {
            return Err(PaymentError::FeeEstimationFailed(format!(
                "estimator returned unordered tiers: {tiers:?}"
            )));
        }
        Ok(tiers)
    }

    pub async fn execute_refund(
        &self,
        swap_address: &str,
        refund_address: &str,
        fee_rate_sat_per_vb: u32,
    ) -> Result<RefundResponse, PaymentError> {
        let engine = self.conn.engine()?;

        validate::refund_address(refund_address, self.network)?;
        validate::refund_fee_rate(fee_rate_sat_per_vb)?;

        {
            let mut in_flight = self.in_flight.lock().expect("in-flight set mutex poisoned");
            if !in_flight.insert(swap_address.to_string()) {
                return Err(PaymentError::ExecutionFailed(format!(
                    "a refund is already in flight for {swap_address}"
                )));
            }
        }

        let result = engine
            .refund(swap_address, refund_address, fee_rate_sat_per_vb)
            .await;

        self.in_flight
            .lock()
            .expect("in-flight set mutex poisoned")
            .remove(swap_address);

        match result {
            Ok(resp) => {
                tracing::info!(
                    %swap_address,
                    refund_txid = %resp.refund_txid,
                    fee_rate_sat_per_vb,
                    "refund submitted"
                );
                Ok(resp)
            }
            Err(err) => Err(translate::refund(err)),
        }
    }
}
