use serde::Serialize;
use thiserror::Error;

/// Closed error taxonomy exposed to the UI layer.
///
/// Every public contract in this crate returns one of these cases; raw
/// settlement-engine errors never cross a component boundary. `NotConnected`
/// and `NetworkError` are the only cases expected to resolve by retrying the
/// same action later.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported payment type")]
    UnsupportedPaymentType,

    #[error("insufficient funds: {required} sat required, {available} sat available")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("payment preparation failed: {0}")]
    PreparationFailed(String),

    #[error("payment execution failed: {0}")]
    ExecutionFailed(String),

    #[error("receive preparation failed: {0}")]
    ReceivePreparationFailed(String),

    #[error("receive execution failed: {0}")]
    ReceiveExecutionFailed(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("not connected to the settlement engine")]
    NotConnected,

    #[error("fee estimation failed: {0}")]
    FeeEstimationFailed(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

/// One translation function per engine boundary.
///
/// Each converts an [`EngineError`](crate::engine::EngineError) into exactly
/// one taxonomy case, keeping the engine message as detail. Transient
/// transport failures always surface as `NetworkError` and an engine-side
/// balance rejection always surfaces as `InsufficientFunds`, whichever
/// boundary it crossed. Taxonomy cases raised by inner components are
/// propagated with `?` and never pass through here.
pub(crate) mod translate {
    use super::PaymentError;
    use crate::engine::EngineError;

    pub fn connect(err: EngineError) -> PaymentError {
        PaymentError::NetworkError(err.to_string())
    }

    pub fn engine_read(err: EngineError) -> PaymentError {
        PaymentError::NetworkError(err.to_string())
    }

    pub fn prepare_send(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            EngineError::InsufficientFunds {
                required,
                available,
            } => PaymentError::InsufficientFunds {
                required,
                available,
            },
            other => PaymentError::PreparationFailed(other.to_string()),
        }
    }

    pub fn execute_send(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            EngineError::InsufficientFunds {
                required,
                available,
            } => PaymentError::InsufficientFunds {
                required,
                available,
            },
            other => PaymentError::ExecutionFailed(other.to_string()),
        }
    }

    pub fn prepare_receive(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            other => PaymentError::ReceivePreparationFailed(other.to_string()),
        }
    }

    pub fn execute_receive(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            other => PaymentError::ReceiveExecutionFailed(other.to_string()),
        }
    }

    pub fn refund(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            other => PaymentError::ExecutionFailed(other.to_string()),
        }
    }

    pub fn fee_tiers(err: EngineError) -> PaymentError {
        match err {
            EngineError::Network(detail) => PaymentError::NetworkError(detail),
            other => PaymentError::FeeEstimationFailed(other.to_string()),
        }
    }
}
