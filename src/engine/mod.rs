//! Settlement-engine boundary: the trait the orchestration layer consumes,
//! the engine-side data types, and the single shared connection handle.

pub mod sandbox;
pub mod store;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::{ConnectionSecret, CredentialStore};
use crate::error::{PaymentError, translate};
use crate::input::PaymentIntent;
use crate::payment::{
    PaymentDirection, PaymentRail, PaymentRecord, PaymentStatus, PreparedReceive, PreparedSend,
    ReceiveArtifact,
};

/// Failure surface of the settlement engine. Translated into the domain
/// taxonomy at every component boundary; never shown to the UI as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("insufficient funds: {required} sat required, {available} sat available")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Read-mostly balance view. Refreshed from the engine on demand; a send
/// validation never reuses a snapshot across calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total_sat: u64,
    pub pending_receive_sat: u64,
    pub pending_send_sat: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub balance: BalanceSnapshot,
    pub tip_height: u32,
}

/// Fee quote for one prepared send. `expires_at` is unix seconds and is
/// propagated to the prepared artifact verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendQuote {
    pub fee_sat: u64,
    pub expires_at: u64,
}

/// On-chain fee tiers in sat/vB, sourced from the engine's estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTiers {
    pub fastest: u32,
    pub normal: u32,
    pub slow: u32,
    pub economy: u32,
}

impl FeeTiers {
    pub fn is_ordered(&self) -> bool {
        self.fastest >= self.normal && self.normal >= self.slow && self.slow >= self.economy
    }
}

/// Per-rail amount bounds: network-defined minimum, policy-defined maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLimits {
    pub min_sat: u64,
    pub max_sat: u64,
}

/// Locked funds from a failed swap. Exists only while the swap is
/// refundable; gone from the set once a refund is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundableSwap {
    pub swap_address: String,
    pub amount_sat: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResponse {
    pub refund_txid: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub direction: Option<PaymentDirection>,
    pub status: Option<PaymentStatus>,
}

/// The external settlement engine, as consumed by this layer. The engine
/// owns connectivity, routing, chain interaction and all persisted state
/// (payment history, refundable-swap set).
#[async_trait]
pub trait SettlementEngine: Send + Sync {
    async fn connect(&self, secret: &ConnectionSecret) -> Result<(), EngineError>;
    async fn disconnect(&self) -> Result<(), EngineError>;
    async fn node_info(&self) -> Result<NodeInfo, EngineError>;
    async fn quote_send(
        &self,
        intent: &PaymentIntent,
        amount_sat: u64,
    ) -> Result<SendQuote, EngineError>;
    async fn send(&self, prepared: &PreparedSend) -> Result<PaymentRecord, EngineError>;
    async fn quote_receive(
        &self,
        rail: PaymentRail,
        amount_sat: Option<u64>,
    ) -> Result<u64, EngineError>;
    async fn receive(
        &self,
        prepared: &PreparedReceive,
        description: Option<&str>,
    ) -> Result<ReceiveArtifact, EngineError>;
    async fn list_payments(&self, filter: &PaymentFilter)
    -> Result<Vec<PaymentRecord>, EngineError>;
    async fn list_refundable_swaps(&self) -> Result<Vec<RefundableSwap>, EngineError>;
    async fn refund(
        &self,
        swap_address: &str,
        refund_address: &str,
        fee_rate_sat_per_vb: u32,
    ) -> Result<RefundResponse, EngineError>;
    async fn fee_tiers(&self) -> Result<FeeTiers, EngineError>;
    async fn limits(&self, rail: PaymentRail) -> Result<PaymentLimits, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// The one shared connection handle to the settlement engine.
///
/// Connect/disconnect are serialized through the state machine: a second
/// state change while one is in flight fails fast instead of queueing, and
/// every operation goes through [`EngineHandle::engine`], which requires
/// `Connected`.
pub struct EngineHandle {
    engine: Arc<dyn SettlementEngine>,
    state: Mutex<ConnectionState>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn SettlementEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state mutex poisoned")
    }

    /// Returns the engine when connected, `NotConnected` otherwise.
    pub fn engine(&self) -> Result<Arc<dyn SettlementEngine>, PaymentError> {
        match self.state() {
            ConnectionState::Connected => Ok(self.engine.clone()),
            _ => Err(PaymentError::NotConnected),
        }
    }

    pub async fn connect(&self, credentials: &dyn CredentialStore) -> Result<(), PaymentError> {
        {
            let mut state = self.state.lock().expect("connection state mutex poisoned");
            match *state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Disconnecting => {
                    return Err(PaymentError::ValidationFailed(
                        "connection state change already in progress".into(),
                    ));
                }
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
            }
        }

        let secret = match credentials.connection_secret().await {
            Ok(secret) => secret,
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(PaymentError::ValidationFailed(format!(
                    "no connection credential available: {err}"
                )));
            }
        };

        match self.engine.connect(&secret).await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                tracing::info!("connected to settlement engine");
                Ok(())
            }
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                Err(translate::connect(err))
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), PaymentError> {
        {
            let mut state = self.state.lock().expect("connection state mutex poisoned");
            match *state {
                ConnectionState::Disconnected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Disconnecting => {
                    return Err(PaymentError::ValidationFailed(
                        "connection state change already in progress".into(),
                    ));
                }
                ConnectionState::Connected => *state = ConnectionState::Disconnecting,
            }
        }

        // Land in Disconnected whatever the engine says; the handle must not
        // get stuck half-open.
        let result = self.engine.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        match result {
            Ok(()) => {
                tracing::info!("disconnected from settlement engine");
                Ok(())
            }
            Err(err) => Err(translate::connect(err)),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().expect("connection state mutex poisoned") = next;
    }
}
