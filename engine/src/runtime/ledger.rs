//! In-memory usage ledger standing in for the payment service

use crate::orchestrator::UsageEvent;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Default)]
pub struct UsageLedger {
    events: Mutex<Vec<UsageEvent>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: UsageEvent) {
        info!(
            customer = %event.customer_id,
            quantity = event.quantity,
            amount = event.amount_minor_units,
            "Usage recorded: {}",
            event.description
        );
        self.events.lock().await.push(event);
    }

    /// Snapshot of all recorded events, oldest first
    pub async fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    /// Sum of recorded amounts for one customer, in cents
    pub async fn total_for(&self, customer_id: &str) -> i64 {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.customer_id == customer_id)
            .map(|e| e.amount_minor_units)
            .sum()
    }
}
