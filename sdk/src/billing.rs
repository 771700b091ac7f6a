//! Billing value types
//!
//! All currency amounts are `rust_decimal::Decimal` so that discount stacking
//! and rounding are exact. Amounts are rounded half-up (midpoint away from
//! zero) to two decimal places.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{EngineError, ErrorExt};

/// Currency every price is quoted in
pub const CURRENCY: &str = "USD";

/// Round a currency amount to cents, half-up
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Named billing category with a fixed per-document price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub unit_price: Decimal,
    pub description: String,
}

/// Customer class driving the loyalty discount
///
/// Unrecognized classes are preserved verbatim and earn no discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerClass {
    Standard,
    Premium,
    Enterprise,
    Unrecognized(String),
}

impl CustomerClass {
    /// Parse a class name; never fails
    pub fn parse(name: &str) -> Self {
        match name {
            "standard" => Self::Standard,
            "premium" => Self::Premium,
            "enterprise" => Self::Enterprise,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
            Self::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for CustomerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the billing calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRequest {
    pub tier_name: String,
    pub document_count: i64,
    #[serde(default = "default_customer_class")]
    pub customer_class: String,
}

fn default_customer_class() -> String {
    "standard".to_string()
}

/// Itemized price breakdown
///
/// Invariant: `final_total == subtotal - total_discount_amount` and
/// `final_total >= 0`.
///
/// The two discount amounts are each rounded on their own, so their sum can
/// differ from `total_discount_amount` by a cent (batch, 11 documents,
/// premium: 0.06 + 0.03 against 0.08).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingResult {
    pub tier: String,
    pub document_count: u64,
    pub customer_class: String,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub volume_discount_rate: Decimal,
    pub customer_discount_rate: Decimal,
    pub volume_discount_amount: Decimal,
    pub customer_discount_amount: Decimal,
    pub total_discount_amount: Decimal,
    pub final_total: Decimal,
    pub currency: String,
    pub computed_at: DateTime<Utc>,
}

impl BillingResult {
    /// Final total in minor currency units (cents), as sent to a payment service
    pub fn final_total_minor_units(&self) -> i64 {
        (self.final_total * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(0)
    }
}

/// Structured error object rendered to API callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub hint: String,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            hint: err.user_hint().to_string(),
        }
    }
}

/// Result-level rendering of a billing computation
///
/// Billing failures are values, not faults, so API layers can serialize
/// either branch uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BillingOutcome {
    Billed(BillingResult),
    Rejected { error: ErrorBody },
}

impl BillingOutcome {
    pub fn is_billed(&self) -> bool {
        matches!(self, Self::Billed(_))
    }
}

impl From<Result<BillingResult, EngineError>> for BillingOutcome {
    fn from(result: Result<BillingResult, EngineError>) -> Self {
        match result {
            Ok(billing) => Self::Billed(billing),
            Err(err) => Self::Rejected {
                error: ErrorBody::from(&err),
            },
        }
    }
}
