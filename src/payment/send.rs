use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::engine::EngineHandle;
use crate::error::{PaymentError, translate};
use crate::input::PaymentIntent;
use crate::payment::{PaymentRecord, PreparedSend, unix_now};
use crate::validate;

/// Payment Preparer/Executor for the outbound flow.
///
/// `prepare` quotes and validates; `execute` commits. A prepared artifact is
/// consumed by exactly one execute call: replays are rejected before the
/// engine is reached.
pub struct SendService {
    conn: Arc<EngineHandle>,
    // Submitted ids keyed by quote expiry, so the set can be pruned once an
    // artifact can no longer pass the expiry check anyway.
    consumed: Mutex<HashMap<String, u64>>,
}

impl SendService {
    pub fn new(conn: Arc<EngineHandle>) -> Self {
        Self {
            conn,
            consumed: Mutex::new(HashMap::new()),
        }
    }

    /// Quotes the fee for an intent and validates amount, limits and
    /// balance. The amount fixed by the destination wins; the caller-supplied
    /// amount only applies to open-amount destinations.
    pub async fn prepare(
        &self,
        intent: &PaymentIntent,
        amount_sat: Option<u64>,
    ) -> Result<PreparedSend, PaymentError> {
        let engine = self.conn.engine()?;

        let rail = intent.rail().ok_or(PaymentError::UnsupportedPaymentType)?;
        let destination = intent
            .destination()
            .ok_or(PaymentError::UnsupportedPaymentType)?
            .to_string();
        let amount_sat = intent.amount_sat().or(amount_sat).ok_or_else(|| {
            PaymentError::InvalidAmount("destination carries no amount and none was given".into())
        })?;

        let limits = engine
            .limits(rail)
            .await
            .map_err(translate::prepare_send)?;
        let info = engine.node_info().await.map_err(translate::prepare_send)?;
        // Coarse check before quoting; required == amount at this point.
        validate::payment_amount(amount_sat, 0, info.balance.total_sat, &limits)?;

        let quote = engine
            .quote_send(intent, amount_sat)
            .await
            .map_err(translate::prepare_send)?;
        // Exact check with the quoted fee included.
        validate::spendable(amount_sat, quote.fee_sat, info.balance.total_sat)?;

        tracing::info!(
            %rail,
            amount_sat,
            fee_sat = quote.fee_sat,
            expires_at = quote.expires_at,
            "prepared send"
        );

        Ok(PreparedSend {
            id: Uuid::new_v4().to_string(),
            rail,
            destination,
            amount_sat,
            fee_sat: quote.fee_sat,
            expires_at: quote.expires_at,
        })
    }

    /// Commits a prepared send. Expired quotes fail instead of being
    /// silently re-quoted. A submitted id stays consumed even when the
    /// engine rejects it: the engine may have seen the submission, so a
    /// retry needs a fresh quote.
    pub async fn execute(&self, prepared: &PreparedSend) -> Result<PaymentRecord, PaymentError> {
        let engine = self.conn.engine()?;

        let now = unix_now();
        if now >= prepared.expires_at {
            return Err(PaymentError::PreparationFailed(
                "fee quote expired; prepare the payment again".into(),
            ));
        }

        {
            let mut consumed = self.consumed.lock().expect("consumed set mutex poisoned");
            // Expired ids cannot get past the check above again.
            consumed.retain(|_, expires_at| *expires_at > now);
            if consumed
                .insert(prepared.id.clone(), prepared.expires_at)
                .is_some()
            {
                return Err(PaymentError::ExecutionFailed(
                    "prepared payment was already submitted".into(),
                ));
            }
        }

        let record = engine
            .send(prepared)
            .await
            .map_err(translate::execute_send)?;
        tracing::info!(payment_id = %record.id, status = ?record.status, "submitted send");
        Ok(record)
    }
}
