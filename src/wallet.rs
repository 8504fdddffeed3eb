use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::engine::{
    BalanceSnapshot, ConnectionState, EngineHandle, FeeTiers, PaymentFilter, RefundResponse,
    RefundableSwap, SettlementEngine,
};
use crate::error::{PaymentError, translate};
use crate::input::{self, PaymentIntent};
use crate::payment::receive::ReceiveService;
use crate::payment::send::SendService;
use crate::payment::{PaymentRail, PaymentRecord, PreparedReceive, PreparedSend, ReceiveArtifact};
use crate::refund::RefundManager;

/// Application root of the orchestration layer.
///
/// Owns the one [`EngineHandle`] and hands it to each service explicitly;
/// nothing in this crate reaches for a global. This is the surface the UI
/// layer consumes, and [`PaymentError`] is the only error type it ever sees.
pub struct Wallet {
    conn: Arc<EngineHandle>,
    credentials: Arc<dyn CredentialStore>,
    send: SendService,
    receive: ReceiveService,
    refunds: RefundManager,
}

impl Wallet {
    pub fn new(
        engine: Arc<dyn SettlementEngine>,
        credentials: Arc<dyn CredentialStore>,
        network: bitcoin::Network,
    ) -> Self {
        let conn = Arc::new(EngineHandle::new(engine));
        Self {
            send: SendService::new(conn.clone()),
            receive: ReceiveService::new(conn.clone()),
            refunds: RefundManager::new(conn.clone(), network),
            conn,
            credentials,
        }
    }

    pub async fn connect(&self) -> Result<(), PaymentError> {
        self.conn.connect(self.credentials.as_ref()).await
    }

    pub async fn disconnect(&self) -> Result<(), PaymentError> {
        self.conn.disconnect().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn classify(&self, raw: &str) -> Result<PaymentIntent, PaymentError> {
        input::classify(raw)
    }

    pub async fn balance(&self) -> Result<BalanceSnapshot, PaymentError> {
        let engine = self.conn.engine()?;
        let info = engine.node_info().await.map_err(translate::engine_read)?;
        Ok(info.balance)
    }

    pub async fn list_payments(
        &self,
        filter: &PaymentFilter,
    ) -> Result<Vec<PaymentRecord>, PaymentError> {
        let engine = self.conn.engine()?;
        engine
            .list_payments(filter)
            .await
            .map_err(translate::engine_read)
    }

    pub async fn prepare_send(
        &self,
        intent: &PaymentIntent,
        amount_sat: Option<u64>,
    ) -> Result<PreparedSend, PaymentError> {
        self.send.prepare(intent, amount_sat).await
    }

    pub async fn send(&self, prepared: &PreparedSend) -> Result<PaymentRecord, PaymentError> {
        self.send.execute(prepared).await
    }

    pub async fn prepare_receive(
        &self,
        amount_sat: Option<u64>,
        rail: PaymentRail,
    ) -> Result<PreparedReceive, PaymentError> {
        self.receive.prepare(amount_sat, rail).await
    }

    pub async fn receive(
        &self,
        prepared: &PreparedReceive,
        description: Option<&str>,
    ) -> Result<ReceiveArtifact, PaymentError> {
        self.receive.execute(prepared, description).await
    }

    pub async fn list_refundable(&self) -> Result<Vec<RefundableSwap>, PaymentError> {
        self.refunds.list_refundable().await
    }

    pub async fn fee_tiers(&self) -> Result<FeeTiers, PaymentError> {
        self.refunds.fee_tiers().await
    }

    pub async fn refund(
        &self,
        swap_address: &str,
        refund_address: &str,
        fee_rate_sat_per_vb: u32,
    ) -> Result<RefundResponse, PaymentError> {
        self.refunds
            .execute_refund(swap_address, refund_address, fee_rate_sat_per_vb)
            .await
    }
}
