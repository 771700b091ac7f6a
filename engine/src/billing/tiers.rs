//! Billing tier registry

use rust_decimal::Decimal;
use sdk::billing::Tier;

/// Immutable set of named tiers, in configuration order
#[derive(Debug, Clone)]
pub struct TierRegistry {
    tiers: Vec<Tier>,
}

impl TierRegistry {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    /// basic 0.10, comprehensive 0.50, batch 0.05
    pub fn reference() -> Self {
        Self::new(vec![
            Tier {
                name: "basic".to_string(),
                unit_price: Decimal::new(10, 2),
                description: "Basic SOAP analysis - vital signs, medications, basic conditions"
                    .to_string(),
            },
            Tier {
                name: "comprehensive".to_string(),
                unit_price: Decimal::new(50, 2),
                description: "Full medical record analysis - detailed insights, recommendations"
                    .to_string(),
            },
            Tier {
                name: "batch".to_string(),
                unit_price: Decimal::new(5, 2),
                description: "Bulk processing per document - optimized for multiple files"
                    .to_string(),
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tiers.iter().map(|tier| tier.name.clone()).collect()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::reference()
    }
}
