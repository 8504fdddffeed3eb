pub mod receive;
pub mod send;

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// A settlement path through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRail {
    Lightning,
    Onchain,
    Liquid,
}

impl fmt::Display for PaymentRail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentRail::Lightning => "lightning",
            PaymentRail::Onchain => "onchain",
            PaymentRail::Liquid => "liquid",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentRail {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lightning" => Ok(PaymentRail::Lightning),
            "onchain" => Ok(PaymentRail::Onchain),
            "liquid" => Ok(PaymentRail::Liquid),
            other => Err(PaymentError::InvalidInput(format!(
                "unknown payment rail: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Send,
    Receive,
}

/// Record status machine: `Created -> Pending -> {Complete | Failed |
/// TimedOut}`, plus the two swap-recovery states `Refundable` and
/// `RefundPending` for Bitcoin-backed swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Pending,
    Complete,
    Failed,
    TimedOut,
    Refundable,
    RefundPending,
}

/// Historical payment entry. Created by the executor, mutated only by engine
/// callbacks, never by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub direction: PaymentDirection,
    pub rail: PaymentRail,
    pub amount_sat: u64,
    pub fee_sat: u64,
    pub status: PaymentStatus,
    pub created_at: u64,
    pub counterparty: String,
}

/// A fee quote ready for execution. Valid until `expires_at` (unix seconds,
/// propagated verbatim from the engine quote) and consumed by exactly one
/// execute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedSend {
    pub id: String,
    pub rail: PaymentRail,
    pub destination: String,
    pub amount_sat: u64,
    pub fee_sat: u64,
    pub expires_at: u64,
}

impl PreparedSend {
    pub fn total_sat(&self) -> u64 {
        self.amount_sat.saturating_add(self.fee_sat)
    }
}

/// Inbound counterpart of [`PreparedSend`]. `amount_sat: None` is an
/// open-amount invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedReceive {
    pub id: String,
    pub rail: PaymentRail,
    pub amount_sat: Option<u64>,
    pub fee_sat: u64,
}

/// The materialized destination for an executed receive: an invoice string
/// or an address, plus the final fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiveArtifact {
    pub destination: String,
    pub fee_sat: u64,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
