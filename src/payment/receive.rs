use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::engine::EngineHandle;
use crate::error::{PaymentError, translate};
use crate::payment::{PaymentRail, PreparedReceive, ReceiveArtifact};
use crate::validate;

/// Receive Preparer/Executor, the inbound mirror of
/// [`SendService`](crate::payment::send::SendService), parameterized by rail.
pub struct ReceiveService {
    conn: Arc<EngineHandle>,
    // Receive artifacts carry no expiry, so executed ids are kept for the
    // lifetime of the service (one id per executed receive in a session).
    consumed: Mutex<HashSet<String>>,
}

impl ReceiveService {
    pub fn new(conn: Arc<EngineHandle>) -> Self {
        Self {
            conn,
            consumed: Mutex::new(HashSet::new()),
        }
    }

    /// Validates the requested amount and quotes the receive fee.
    /// `amount_sat: None` is an open-amount invoice and skips the bounds
    /// check.
    pub async fn prepare(
        &self,
        amount_sat: Option<u64>,
        rail: PaymentRail,
    ) -> Result<PreparedReceive, PaymentError> {
        let engine = self.conn.engine()?;

        let limits = engine
            .limits(rail)
            .await
            .map_err(translate::prepare_receive)?;
        validate::receive_amount(amount_sat, &limits)?;

        let fee_sat = engine
            .quote_receive(rail, amount_sat)
            .await
            .map_err(translate::prepare_receive)?;

        tracing::info!(%rail, ?amount_sat, fee_sat, "prepared receive");

        Ok(PreparedReceive {
            id: Uuid::new_v4().to_string(),
            rail,
            amount_sat,
            fee_sat,
        })
    }

    /// Asks the engine to materialize the receivable (invoice string or
    /// address). Consumed-once, like the outbound executor.
    pub async fn execute(
        &self,
        prepared: &PreparedReceive,
        description: Option<&str>,
    ) -> Result<ReceiveArtifact, PaymentError> {
        let engine = self.conn.engine()?;

        {
            let mut consumed = self.consumed.lock().expect("consumed set mutex poisoned");
            if !consumed.insert(prepared.id.clone()) {
                return Err(PaymentError::ReceiveExecutionFailed(
                    "prepared receive was already executed".into(),
                ));
            }
        }

        let artifact = engine
            .receive(prepared, description)
            .await
            .map_err(translate::execute_receive)?;
        tracing::info!(rail = %prepared.rail, fee_sat = artifact.fee_sat, "materialized receive");
        Ok(artifact)
    }
}
