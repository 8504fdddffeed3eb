//! Pure validation rules over amounts, limits and balance.
//!
//! Stateless; called both before preparation (coarse check, fee 0) and after
//! fee quoting (exact check with the quoted fee included). Rules apply in a
//! fixed order: network minimum, policy maximum, then balance.

use crate::engine::PaymentLimits;
use crate::error::PaymentError;

pub fn amount_within_limits(amount_sat: u64, limits: &PaymentLimits) -> Result<(), PaymentError> {
    if amount_sat < limits.min_sat {
        return Err(PaymentError::InvalidAmount(format!(
            "amount {amount_sat} sat is below the {} sat minimum",
            limits.min_sat
        )));
    }
    if amount_sat > limits.max_sat {
        return Err(PaymentError::InvalidAmount(format!(
            "amount {amount_sat} sat is above the {} sat maximum",
            limits.max_sat
        )));
    }
    Ok(())
}

pub fn spendable(amount_sat: u64, fee_sat: u64, balance_sat: u64) -> Result<(), PaymentError> {
    let required = amount_sat
        .checked_add(fee_sat)
        .ok_or_else(|| PaymentError::InvalidAmount("amount plus fee overflows".into()))?;
    if required > balance_sat {
        return Err(PaymentError::InsufficientFunds {
            required,
            available: balance_sat,
        });
    }
    Ok(())
}

/// Composed outbound check: limits first, then `amount + fee` against the
/// available balance.
pub fn payment_amount(
    amount_sat: u64,
    fee_sat: u64,
    balance_sat: u64,
    limits: &PaymentLimits,
) -> Result<(), PaymentError> {
    amount_within_limits(amount_sat, limits)?;
    spendable(amount_sat, fee_sat, balance_sat)
}

/// Inbound amount check. `None` is an open-amount invoice and skips the
/// bounds check entirely; a specified amount must be positive and within
/// policy bounds.
pub fn receive_amount(
    amount_sat: Option<u64>,
    limits: &PaymentLimits,
) -> Result<(), PaymentError> {
    match amount_sat {
        None => Ok(()),
        Some(0) => Err(PaymentError::InvalidAmount(
            "receive amount must be greater than zero".into(),
        )),
        Some(amount) => amount_within_limits(amount, limits),
    }
}

pub fn refund_fee_rate(rate_sat_per_vb: u32) -> Result<(), PaymentError> {
    if rate_sat_per_vb == 0 {
        return Err(PaymentError::InvalidAmount(
            "refund fee rate must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Address-format validation for the chain in use.
pub fn refund_address(
    address: &str,
    network: bitcoin::Network,
) -> Result<bitcoin::Address, PaymentError> {
    address
        .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
        .map_err(|e| PaymentError::InvalidInput(format!("invalid refund address: {e}")))?
        .require_network(network)
        .map_err(|e| PaymentError::InvalidInput(format!("refund address network mismatch: {e}")))
}
