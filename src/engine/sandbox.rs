//! Deterministic in-process settlement engine.
//!
//! The production engine is an external service; this one is its regtest
//! analogue for the CLI and the integration tests. Fees, limits and tiers
//! come from [`SandboxConfig`]; payment history and the refundable-swap set
//! persist in SQLite, because the engine, not the orchestration layer, owns
//! that state.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::credentials::ConnectionSecret;
use crate::input::PaymentIntent;
use crate::payment::{
    PaymentDirection, PaymentRail, PaymentRecord, PaymentStatus, PreparedReceive, PreparedSend,
    ReceiveArtifact, unix_now,
};

use super::store::SqliteStore;
use super::{
    BalanceSnapshot, EngineError, FeeTiers, NodeInfo, PaymentFilter, PaymentLimits,
    RefundResponse, RefundableSwap, SendQuote, SettlementEngine,
};

const SANDBOX_TIP_HEIGHT: u32 = 800_000;

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub starting_balance_sat: u64,
    pub quote_ttl_secs: u64,
    pub lightning_fee_ppm: u64,
    pub onchain_fee_sat: u64,
    pub liquid_fee_sat: u64,
    pub lightning_limits: PaymentLimits,
    pub onchain_limits: PaymentLimits,
    pub liquid_limits: PaymentLimits,
    pub fee_tiers: FeeTiers,
    pub seed_refundables: Vec<RefundableSwap>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            starting_balance_sat: 1_000_000,
            quote_ttl_secs: 300,
            lightning_fee_ppm: 2_000,
            onchain_fee_sat: 400,
            liquid_fee_sat: 100,
            lightning_limits: PaymentLimits {
                min_sat: 1,
                max_sat: 25_000_000,
            },
            onchain_limits: PaymentLimits {
                min_sat: 546,
                max_sat: 100_000_000,
            },
            liquid_limits: PaymentLimits {
                min_sat: 100,
                max_sat: 100_000_000,
            },
            fee_tiers: FeeTiers {
                fastest: 40,
                normal: 20,
                slow: 10,
                economy: 1,
            },
            seed_refundables: Vec::new(),
        }
    }
}

pub struct SandboxEngine {
    cfg: SandboxConfig,
    store: Mutex<SqliteStore>,
}

impl SandboxEngine {
    pub fn open(path: PathBuf, cfg: SandboxConfig) -> Result<Self, EngineError> {
        let mut store = SqliteStore::open(path).map_err(storage_err)?;
        for swap in &cfg.seed_refundables {
            store.upsert_refundable(swap).map_err(storage_err)?;
        }
        Ok(Self {
            cfg,
            store: Mutex::new(store),
        })
    }

    /// Settles every pending record, standing in for the engine callbacks
    /// that drive the status machine in production.
    pub fn settle_pending(&self) -> Result<usize, EngineError> {
        self.store
            .lock()
            .expect("store mutex poisoned")
            .complete_pending()
            .map_err(storage_err)
    }

    fn fee_for(&self, rail: PaymentRail, amount_sat: u64) -> u64 {
        match rail {
            PaymentRail::Lightning => std::cmp::max(
                1,
                amount_sat.saturating_mul(self.cfg.lightning_fee_ppm) / 1_000_000,
            ),
            PaymentRail::Onchain => self.cfg.onchain_fee_sat,
            PaymentRail::Liquid => self.cfg.liquid_fee_sat,
        }
    }

    fn balance_from(&self, payments: &[PaymentRecord]) -> BalanceSnapshot {
        let mut total = self.cfg.starting_balance_sat;
        let mut pending_receive = 0u64;
        let mut pending_send = 0u64;

        for p in payments {
            let moved = p.amount_sat.saturating_add(p.fee_sat);
            match (p.direction, p.status) {
                (
                    PaymentDirection::Send,
                    PaymentStatus::Created | PaymentStatus::Pending | PaymentStatus::Complete,
                ) => total = total.saturating_sub(moved),
                (PaymentDirection::Receive, PaymentStatus::Complete) => {
                    total = total.saturating_add(p.amount_sat);
                }
                _ => {}
            }
            match (p.direction, p.status) {
                (PaymentDirection::Send, PaymentStatus::Created | PaymentStatus::Pending) => {
                    pending_send = pending_send.saturating_add(moved);
                }
                (PaymentDirection::Receive, PaymentStatus::Pending) => {
                    pending_receive = pending_receive.saturating_add(p.amount_sat);
                }
                _ => {}
            }
        }

        BalanceSnapshot {
            total_sat: total,
            pending_receive_sat: pending_receive,
            pending_send_sat: pending_send,
        }
    }
}

#[async_trait]
impl SettlementEngine for SandboxEngine {
    async fn connect(&self, secret: &ConnectionSecret) -> Result<(), EngineError> {
        if secret.is_empty() {
            return Err(EngineError::Connection("empty connection secret".into()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn node_info(&self) -> Result<NodeInfo, EngineError> {
        let store = self.store.lock().expect("store mutex poisoned");
        let payments = store.list_payments().map_err(storage_err)?;
        Ok(NodeInfo {
            balance: self.balance_from(&payments),
            tip_height: SANDBOX_TIP_HEIGHT,
        })
    }

    async fn quote_send(
        &self,
        intent: &PaymentIntent,
        amount_sat: u64,
    ) -> Result<SendQuote, EngineError> {
        let rail = intent
            .rail()
            .ok_or_else(|| EngineError::Rejected("intent is not payable".into()))?;
        Ok(SendQuote {
            fee_sat: self.fee_for(rail, amount_sat),
            expires_at: unix_now() + self.cfg.quote_ttl_secs,
        })
    }

    async fn send(&self, prepared: &PreparedSend) -> Result<PaymentRecord, EngineError> {
        let mut store = self.store.lock().expect("store mutex poisoned");

        if store
            .get_payment(&prepared.id)
            .map_err(storage_err)?
            .is_some()
        {
            return Err(EngineError::Rejected(format!(
                "duplicate submission of prepared payment {}",
                prepared.id
            )));
        }

        let payments = store.list_payments().map_err(storage_err)?;
        let balance = self.balance_from(&payments);
        let required = prepared.total_sat();
        if required > balance.total_sat {
            return Err(EngineError::InsufficientFunds {
                required,
                available: balance.total_sat,
            });
        }

        // Lightning settles synchronously here; the slower rails stay
        // pending until a settle callback.
        let status = match prepared.rail {
            PaymentRail::Lightning => PaymentStatus::Complete,
            PaymentRail::Onchain | PaymentRail::Liquid => PaymentStatus::Pending,
        };

        let record = PaymentRecord {
            id: prepared.id.clone(),
            direction: PaymentDirection::Send,
            rail: prepared.rail,
            amount_sat: prepared.amount_sat,
            fee_sat: prepared.fee_sat,
            status,
            created_at: unix_now(),
            counterparty: prepared.destination.clone(),
        };
        store.insert_payment(&record).map_err(storage_err)?;
        Ok(record)
    }

    async fn quote_receive(
        &self,
        rail: PaymentRail,
        amount_sat: Option<u64>,
    ) -> Result<u64, EngineError> {
        Ok(self.fee_for(rail, amount_sat.unwrap_or(0)))
    }

    async fn receive(
        &self,
        prepared: &PreparedReceive,
        description: Option<&str>,
    ) -> Result<ReceiveArtifact, EngineError> {
        let mut store = self.store.lock().expect("store mutex poisoned");

        if store
            .get_payment(&prepared.id)
            .map_err(storage_err)?
            .is_some()
        {
            return Err(EngineError::Rejected(format!(
                "duplicate submission of prepared receive {}",
                prepared.id
            )));
        }

        let token = Uuid::new_v4().simple().to_string();
        let destination = match prepared.rail {
            PaymentRail::Lightning => format!("lnsandbox{token}"),
            PaymentRail::Onchain => format!("sandboxbtc{token}"),
            PaymentRail::Liquid => format!("sandboxlq{token}"),
        };

        let record = PaymentRecord {
            id: prepared.id.clone(),
            direction: PaymentDirection::Receive,
            rail: prepared.rail,
            amount_sat: prepared.amount_sat.unwrap_or(0),
            fee_sat: prepared.fee_sat,
            status: PaymentStatus::Pending,
            created_at: unix_now(),
            counterparty: description
                .map(str::to_string)
                .unwrap_or_else(|| destination.clone()),
        };
        store.insert_payment(&record).map_err(storage_err)?;

        Ok(ReceiveArtifact {
            destination,
            fee_sat: prepared.fee_sat,
        })
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
    ) -> Result<Vec<PaymentRecord>, EngineError> {
        let store = self.store.lock().expect("store mutex poisoned");
        let mut payments = store.list_payments().map_err(storage_err)?;
        if let Some(direction) = filter.direction {
            payments.retain(|p| p.direction == direction);
        }
        if let Some(status) = filter.status {
            payments.retain(|p| p.status == status);
        }
        Ok(payments)
    }

    async fn list_refundable_swaps(&self) -> Result<Vec<RefundableSwap>, EngineError> {
        self.store
            .lock()
            .expect("store mutex poisoned")
            .list_refundable_swaps()
            .map_err(storage_err)
    }

    async fn refund(
        &self,
        swap_address: &str,
        _refund_address: &str,
        _fee_rate_sat_per_vb: u32,
    ) -> Result<RefundResponse, EngineError> {
        let moved = self
            .store
            .lock()
            .expect("store mutex poisoned")
            .mark_refund_pending(swap_address)
            .map_err(storage_err)?;
        if !moved {
            return Err(EngineError::NotFound(format!(
                "swap not refundable: {swap_address}"
            )));
        }

        let refund_txid = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        Ok(RefundResponse { refund_txid })
    }

    async fn fee_tiers(&self) -> Result<FeeTiers, EngineError> {
        Ok(self.cfg.fee_tiers)
    }

    async fn limits(&self, rail: PaymentRail) -> Result<PaymentLimits, EngineError> {
        Ok(match rail {
            PaymentRail::Lightning => self.cfg.lightning_limits,
            PaymentRail::Onchain => self.cfg.onchain_limits,
            PaymentRail::Liquid => self.cfg.liquid_limits,
        })
    }
}

fn storage_err(err: anyhow::Error) -> EngineError {
    EngineError::Storage(format!("{err:#}"))
}
