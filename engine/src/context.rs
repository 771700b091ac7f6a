//! Shared engine components
//!
//! Everything is built once at startup from [`Config`] and shared via `Arc`.

use crate::billing::{BillingCalculator, TierRegistry};
use crate::config::Config;
use crate::guidance::GuidanceCatalog;
use crate::orchestrator::{AnalysisOrchestrator, CapabilitySet};
use crate::prompts::PromptStore;
use crate::protocol::ProtocolHandler;
use crate::runtime::{LocalRuntime, UsageLedger};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct EngineContext {
    pub config: Arc<Config>,
    pub catalog: Arc<GuidanceCatalog>,
    pub prompts: Arc<PromptStore>,
    pub calculator: Arc<BillingCalculator>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub ledger: Arc<UsageLedger>,
}

impl EngineContext {
    pub async fn load(config: Config) -> Result<Self> {
        let catalog = Arc::new(GuidanceCatalog::reference());
        let prompts = Arc::new(
            PromptStore::load(&config.prompts.dir)
                .await
                .context("Failed to load prompt templates")?,
        );
        let calculator = Arc::new(BillingCalculator::new(Arc::new(TierRegistry::new(
            config.tiers(),
        ))));

        let runtime = LocalRuntime::from_config(&config.orchestrator)
            .context("Failed to initialize local capability runtime")?;
        let ledger = runtime.ledger();

        let capabilities: CapabilitySet = config.orchestrator.capabilities.iter().copied().collect();
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::clone(&catalog),
            Arc::clone(&prompts),
            Arc::clone(&calculator),
            capabilities,
            Arc::new(runtime),
        ));

        info!(
            prompts = prompts.len(),
            tiers = calculator.registry().tiers().len(),
            workspace = %config.orchestrator.workspace.display(),
            "Engine components ready"
        );

        Ok(Self {
            config: Arc::new(config),
            catalog,
            prompts,
            calculator,
            orchestrator,
            ledger,
        })
    }

    pub fn protocol_handler(&self) -> ProtocolHandler {
        ProtocolHandler::new(Arc::clone(&self.catalog), Arc::clone(&self.prompts))
    }
}
