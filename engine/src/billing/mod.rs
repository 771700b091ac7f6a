//! Billing: tier registry and discount calculator

pub mod calculator;
pub mod tiers;

pub use calculator::{calculate_billing, BillingCalculator};
pub use tiers::TierRegistry;
