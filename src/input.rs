use std::str::FromStr as _;

use bitcoin::hashes::Hash as _;
use lightning_invoice::{Bolt11Invoice, Bolt11InvoiceDescriptionRef};
use serde::Serialize;

use crate::error::PaymentError;
use crate::payment::PaymentRail;

/// Typed result of classifying a raw destination string. Immutable;
/// consumed once by the payment preparer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentIntent {
    Bolt11Invoice {
        invoice: String,
        payment_hash: String,
        amount_sat: Option<u64>,
        expiry_secs: u64,
        description: String,
    },
    LightningAddress {
        address: String,
    },
    OnchainAddress {
        address: String,
        amount_sat: Option<u64>,
        label: Option<String>,
    },
    LiquidAddress {
        address: String,
        amount_sat: Option<u64>,
    },
    Bolt12Offer {
        offer: String,
    },
    WithdrawRequest {
        url: String,
    },
    AuthRequest {
        url: String,
    },
    Unsupported {
        kind: String,
    },
}

impl PaymentIntent {
    /// Rail a send over this intent settles on, `None` when the intent is
    /// not payable (withdraw/auth/unsupported).
    pub fn rail(&self) -> Option<PaymentRail> {
        match self {
            PaymentIntent::Bolt11Invoice { .. }
            | PaymentIntent::LightningAddress { .. }
            | PaymentIntent::Bolt12Offer { .. } => Some(PaymentRail::Lightning),
            PaymentIntent::OnchainAddress { .. } => Some(PaymentRail::Onchain),
            PaymentIntent::LiquidAddress { .. } => Some(PaymentRail::Liquid),
            PaymentIntent::WithdrawRequest { .. }
            | PaymentIntent::AuthRequest { .. }
            | PaymentIntent::Unsupported { .. } => None,
        }
    }

    /// Amount fixed by the destination itself, if any.
    pub fn amount_sat(&self) -> Option<u64> {
        match self {
            PaymentIntent::Bolt11Invoice { amount_sat, .. }
            | PaymentIntent::OnchainAddress { amount_sat, .. }
            | PaymentIntent::LiquidAddress { amount_sat, .. } => *amount_sat,
            _ => None,
        }
    }

    /// The raw destination handed to the engine on send.
    pub fn destination(&self) -> Option<&str> {
        match self {
            PaymentIntent::Bolt11Invoice { invoice, .. } => Some(invoice),
            PaymentIntent::LightningAddress { address } => Some(address),
            PaymentIntent::OnchainAddress { address, .. } => Some(address),
            PaymentIntent::LiquidAddress { address, .. } => Some(address),
            PaymentIntent::Bolt12Offer { offer } => Some(offer),
            PaymentIntent::WithdrawRequest { .. }
            | PaymentIntent::AuthRequest { .. }
            | PaymentIntent::Unsupported { .. } => None,
        }
    }
}

/// Classifies a raw destination string into a typed payment intent.
///
/// Pure function over text; no network access. Ambiguous strings resolve via
/// a fixed precedence: invoice formats, then generic address formats, then
/// alias formats (lightning address last).
pub fn classify(raw: &str) -> Result<PaymentIntent, PaymentError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(PaymentError::InvalidInput("empty payment input".into()));
    }

    if let Some(rest) = strip_scheme(input, "lightning:") {
        return classify_lightning_uri(rest);
    }

    let lower = input.to_ascii_lowercase();
    if is_bolt11(&lower) {
        return bolt11_intent(input);
    }
    if lower.starts_with("lno1") {
        return Ok(PaymentIntent::Bolt12Offer {
            offer: input.to_string(),
        });
    }
    if lower.starts_with("lnr1") || lower.starts_with("lni1") {
        return Ok(PaymentIntent::Unsupported {
            kind: "bolt12 invoice".into(),
        });
    }

    if let Some(rest) = strip_scheme(input, "bitcoin:") {
        return bip21_intent(rest);
    }
    if input
        .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
        .is_ok()
    {
        return Ok(PaymentIntent::OnchainAddress {
            address: input.to_string(),
            amount_sat: None,
            label: None,
        });
    }

    if let Some(rest) = strip_scheme(input, "liquidnetwork:") {
        return liquid_uri_intent(rest);
    }
    if lwk_wollet::elements::Address::from_str(input).is_ok() {
        return Ok(PaymentIntent::LiquidAddress {
            address: input.to_string(),
            amount_sat: None,
        });
    }

    if strip_scheme(input, "lnurlw://").is_some() {
        return Ok(PaymentIntent::WithdrawRequest {
            url: input.to_string(),
        });
    }
    if strip_scheme(input, "keyauth://").is_some() {
        return Ok(PaymentIntent::AuthRequest {
            url: input.to_string(),
        });
    }
    if lower.starts_with("lnurl1") {
        // Resolving a bare LNURL tag takes a network fetch this classifier
        // must not perform.
        return Ok(PaymentIntent::Unsupported {
            kind: "bech32 lnurl".into(),
        });
    }

    if is_lightning_address(input) {
        return Ok(PaymentIntent::LightningAddress {
            address: input.to_string(),
        });
    }

    Err(PaymentError::InvalidInput(
        "input matches no known payment format".into(),
    ))
}

fn classify_lightning_uri(rest: &str) -> Result<PaymentIntent, PaymentError> {
    let lower = rest.to_ascii_lowercase();
    if is_bolt11(&lower) {
        return bolt11_intent(rest);
    }
    if lower.starts_with("lno1") {
        return Ok(PaymentIntent::Bolt12Offer {
            offer: rest.to_string(),
        });
    }
    Err(PaymentError::InvalidInput(
        "lightning: URI carries neither a BOLT11 invoice nor a BOLT12 offer".into(),
    ))
}

fn is_bolt11(lower: &str) -> bool {
    // lnbc covers lnbcrt, lntb covers lntbs
    lower.starts_with("lnbc") || lower.starts_with("lntb")
}

fn bolt11_intent(raw: &str) -> Result<PaymentIntent, PaymentError> {
    let invoice = Bolt11Invoice::from_str(raw)
        .map_err(|e| PaymentError::InvalidInput(format!("invalid BOLT11 invoice: {e:?}")))?;

    let description = match invoice.description() {
        Bolt11InvoiceDescriptionRef::Direct(d) => d.to_string(),
        Bolt11InvoiceDescriptionRef::Hash(_) => String::new(),
    };

    Ok(PaymentIntent::Bolt11Invoice {
        invoice: raw.to_string(),
        payment_hash: hex::encode(invoice.payment_hash().to_byte_array()),
        amount_sat: invoice.amount_milli_satoshis().map(|msat| msat / 1000),
        expiry_secs: invoice.expiry_time().as_secs(),
        description,
    })
}

fn bip21_intent(rest: &str) -> Result<PaymentIntent, PaymentError> {
    let (address, query) = match rest.split_once('?') {
        Some((a, q)) => (a, q),
        None => (rest, ""),
    };

    // Unified QR: an embedded BOLT11 invoice takes precedence over the
    // on-chain fallback address.
    if let Some(invoice) = query_param(query, "lightning") {
        if is_bolt11(&invoice.to_ascii_lowercase()) {
            return bolt11_intent(&invoice);
        }
    }

    if address
        .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
        .is_err()
    {
        return Err(PaymentError::InvalidInput(format!(
            "bitcoin: URI carries an invalid address: {address}"
        )));
    }

    let amount_sat = match query_param(query, "amount") {
        Some(v) => Some(parse_btc_amount(&v)?),
        None => None,
    };

    Ok(PaymentIntent::OnchainAddress {
        address: address.to_string(),
        amount_sat,
        label: query_param(query, "label"),
    })
}

fn liquid_uri_intent(rest: &str) -> Result<PaymentIntent, PaymentError> {
    let (address, query) = match rest.split_once('?') {
        Some((a, q)) => (a, q),
        None => (rest, ""),
    };

    if lwk_wollet::elements::Address::from_str(address).is_err() {
        return Err(PaymentError::InvalidInput(format!(
            "liquidnetwork: URI carries an invalid address: {address}"
        )));
    }

    let amount_sat = match query_param(query, "amount") {
        Some(v) => Some(parse_btc_amount(&v)?),
        None => None,
    };

    Ok(PaymentIntent::LiquidAddress {
        address: address.to_string(),
        amount_sat,
    })
}

/// Exact BTC-denominated amount parse; URI amounts never round-trip through
/// floats.
fn parse_btc_amount(value: &str) -> Result<u64, PaymentError> {
    bitcoin::Amount::from_str_in(value, bitcoin::Denomination::Bitcoin)
        .map(|a| a.to_sat())
        .map_err(|e| PaymentError::InvalidInput(format!("invalid amount {value}: {e}")))
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.to_string())
}

fn strip_scheme<'a>(input: &'a str, scheme: &str) -> Option<&'a str> {
    if input.len() <= scheme.len() {
        return None;
    }
    // get() refuses a split inside a multi-byte character.
    let head = input.get(..scheme.len())?;
    if head.eq_ignore_ascii_case(scheme) {
        Some(&input[scheme.len()..])
    } else {
        None
    }
}

fn is_lightning_address(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    local_ok && domain_ok
}
