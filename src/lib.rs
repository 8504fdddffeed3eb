//! Payment orchestration and validation layer for a mobile Lightning /
//! on-chain Bitcoin wallet.
//!
//! Sits between a UI and an external settlement engine: classifies raw
//! payment strings into typed intents, validates fees and balances before
//! committing funds, prepares and executes sends and receives across rails,
//! and recovers funds from swaps that failed mid-flight. All money-safety
//! invariants (no double submission of a prepared artifact, no execution
//! without sufficient balance, no refund executed twice) live here.

pub mod credentials;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod payment;
pub mod refund;
pub mod validate;
pub mod wallet;

pub use error::PaymentError;
pub use input::{PaymentIntent, classify};
pub use wallet::Wallet;
