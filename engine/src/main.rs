// MedMeter medical analysis engine
// Main entry point for the medmeter binary

use anyhow::Context;
use clap::Parser;
use medmeter_engine::cli::{BillingAction, Cli, Command, PromptsAction};
use medmeter_engine::config::Config;
use medmeter_engine::context::EngineContext;
use medmeter_engine::handlers::{
    handle_analyze, handle_billing_calculate, handle_billing_tiers, handle_doctor,
    handle_guidance, handle_prompts_get, handle_prompts_list, handle_protocol, handle_serve,
    OutputFormat,
};
use medmeter_engine::orchestrator::AnalysisRequest;
use medmeter_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load_or_create(),
    }
    .context("Failed to load configuration")?;

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));
    tracing::debug!("MedMeter v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Doctor = cli.command {
        return handle_doctor(&config, format).await;
    }

    let ctx = EngineContext::load(config).await?;

    match cli.command {
        Command::Protocol => handle_protocol(&ctx).await,

        Command::Serve => handle_serve(ctx).await,

        Command::Billing { action } => match action {
            BillingAction::Calculate { tier, count, class } => {
                handle_billing_calculate(&ctx.calculator, &tier, count, &class, format)
            }
            BillingAction::Tiers => handle_billing_tiers(&ctx.calculator, format),
        },

        Command::Guidance { task } => handle_guidance(&ctx.catalog, &task, format),

        Command::Prompts { action } => match action {
            PromptsAction::List => handle_prompts_list(&ctx.prompts, format),
            PromptsAction::Get { name, context } => {
                handle_prompts_get(&ctx.prompts, &name, &context, format)
            }
        },

        Command::Analyze {
            customer,
            tier,
            class,
            count,
            file,
            query,
            patient,
            task,
        } => {
            let request = AnalysisRequest {
                customer_id: customer,
                analysis_type: tier,
                customer_class: class,
                query,
                file_ref: file,
                patient_id: patient,
                document_count: count,
                task,
            };
            handle_analyze(&ctx.orchestrator, request, format).await
        }

        Command::Doctor => Ok(()),
    }
}
