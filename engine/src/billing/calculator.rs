//! Billing calculator
//!
//! Pure pricing: `subtotal = unit_price * n`, then a volume rate and a
//! customer rate are summed and applied once to the subtotal. Reported
//! amounts are rounded half-up to cents and `final_total` is derived from
//! the rounded figures.

use chrono::Utc;
use rust_decimal::Decimal;
use sdk::billing::{round_currency, BillingOutcome, BillingResult, CustomerClass, CURRENCY};
use sdk::errors::EngineError;
use std::sync::Arc;
use tracing::debug;

use super::tiers::TierRegistry;

/// Tier that earns the volume discount
pub const VOLUME_TIER: &str = "batch";

/// Volume discount applies strictly above this many documents
pub const VOLUME_THRESHOLD: u64 = 10;

/// Volume discount rate (10%)
pub fn volume_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Loyalty discount rate for a customer class
pub fn customer_rate(class: &CustomerClass) -> Decimal {
    match class {
        CustomerClass::Standard => Decimal::ZERO,
        CustomerClass::Premium => Decimal::new(5, 2),
        CustomerClass::Enterprise => Decimal::new(15, 2),
        CustomerClass::Unrecognized(_) => Decimal::ZERO,
    }
}

/// Prices requests against a shared tier registry
#[derive(Debug, Clone)]
pub struct BillingCalculator {
    registry: Arc<TierRegistry>,
}

impl BillingCalculator {
    pub fn new(registry: Arc<TierRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    /// Price `document_count` documents of `tier_name` for `customer_class`
    ///
    /// # Errors
    ///
    /// - `UnknownTier` if the tier is not registered
    /// - `InvalidInput` if `document_count` is negative
    pub fn calculate(
        &self,
        tier_name: &str,
        document_count: i64,
        customer_class: &str,
    ) -> Result<BillingResult, EngineError> {
        let tier = self
            .registry
            .get(tier_name)
            .ok_or_else(|| EngineError::UnknownTier {
                tier: tier_name.to_string(),
                available: self.registry.names(),
            })?;

        let count = u64::try_from(document_count).map_err(|_| {
            EngineError::InvalidInput(format!(
                "document_count must not be negative, got {}",
                document_count
            ))
        })?;

        let class = CustomerClass::parse(customer_class);
        let subtotal = tier.unit_price * Decimal::from(count);

        let volume_discount_rate = if tier.name == VOLUME_TIER && count > VOLUME_THRESHOLD {
            volume_rate()
        } else {
            Decimal::ZERO
        };
        let customer_discount_rate = customer_rate(&class);
        let total_rate = volume_discount_rate + customer_discount_rate;

        let subtotal_rounded = round_currency(subtotal);
        let total_discount_amount = round_currency(total_rate * subtotal);
        let final_total = (subtotal_rounded - total_discount_amount).max(Decimal::ZERO);

        debug!(
            tier = %tier.name,
            count,
            class = %class,
            %final_total,
            "Calculated billing"
        );

        Ok(BillingResult {
            tier: tier.name.clone(),
            document_count: count,
            customer_class: class.as_str().to_string(),
            unit_price: tier.unit_price,
            subtotal: subtotal_rounded,
            volume_discount_rate,
            customer_discount_rate,
            volume_discount_amount: round_currency(volume_discount_rate * subtotal),
            customer_discount_amount: round_currency(customer_discount_rate * subtotal),
            total_discount_amount,
            final_total,
            currency: CURRENCY.to_string(),
            computed_at: Utc::now(),
        })
    }

    /// Query interface: never fails, errors become an `{error}` object
    pub fn calculate_billing(
        &self,
        tier_name: &str,
        document_count: i64,
        customer_class: &str,
    ) -> BillingOutcome {
        self.calculate(tier_name, document_count, customer_class)
            .into()
    }
}

impl Default for BillingCalculator {
    fn default() -> Self {
        Self::new(Arc::new(TierRegistry::reference()))
    }
}

/// Query interface against the reference tiers
pub fn calculate_billing(
    tier_name: &str,
    document_count: i64,
    customer_class: &str,
) -> BillingOutcome {
    BillingCalculator::default().calculate_billing(tier_name, document_count, customer_class)
}
