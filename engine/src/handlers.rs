//! Command handlers for CLI operations
//!
//! Every handler prints either human-readable text or a single JSON
//! document, depending on [`OutputFormat`].

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::billing::BillingCalculator;
use crate::config::Config;
use crate::context::EngineContext;
use crate::guidance::GuidanceCatalog;
use crate::orchestrator::{AnalysisOrchestrator, AnalysisRequest, AnalysisResult};
use crate::prompts::{self, PromptStore};
use sdk::billing::{BillingOutcome, BillingResult};
use sdk::guidance::GuidanceEntry;
use tokio::sync::watch;
use tracing::warn;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Serve the orchestration protocol until stdin closes
pub async fn handle_protocol(ctx: &EngineContext) -> Result<()> {
    crate::protocol::serve_stdio(&ctx.protocol_handler()).await?;
    Ok(())
}

pub async fn handle_serve(ctx: EngineContext) -> Result<()> {
    crate::api::serve(ctx).await
}

pub fn handle_billing_calculate(
    calculator: &BillingCalculator,
    tier: &str,
    count: i64,
    class: &str,
    format: OutputFormat,
) -> Result<()> {
    let outcome = calculator.calculate_billing(tier, count, class);

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => {
            if let BillingOutcome::Billed(result) = &outcome {
                print_billing(result);
            }
        }
    }

    match outcome {
        BillingOutcome::Billed(_) => Ok(()),
        BillingOutcome::Rejected { error } => bail!("{}. {}", error.message, error.hint),
    }
}

fn print_billing(result: &BillingResult) {
    println!("Billing for {} x {} ({})", result.document_count, result.tier, result.customer_class);
    println!("  {:<20} {}", "Unit price:", result.unit_price);
    println!("  {:<20} {}", "Subtotal:", result.subtotal);
    if !result.volume_discount_amount.is_zero() {
        println!("  {:<20} -{}", "Volume discount:", result.volume_discount_amount);
    }
    if !result.customer_discount_amount.is_zero() {
        println!("  {:<20} -{}", "Customer discount:", result.customer_discount_amount);
    }
    println!("  {:<20} {} {}", "Total:", result.final_total, result.currency);
}

pub fn handle_billing_tiers(calculator: &BillingCalculator, format: OutputFormat) -> Result<()> {
    let tiers = calculator.registry().tiers();

    match format {
        OutputFormat::Json => print_json(&tiers),
        OutputFormat::Text => {
            println!("Billing tiers:");
            for tier in tiers {
                println!("  {:<15} {:>6}  {}", tier.name, tier.unit_price, tier.description);
            }
            Ok(())
        }
    }
}

pub fn handle_guidance(catalog: &GuidanceCatalog, task: &str, format: OutputFormat) -> Result<()> {
    let entry = catalog.get_guidance(task);

    match format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            print_guidance(&entry);
            Ok(())
        }
    }
}

fn print_guidance(entry: &GuidanceEntry) {
    println!("Guidance for {}", entry.task_kind);
    if entry.is_fallback() {
        println!("  (no specific guidance)");
    }
    let capabilities: Vec<&str> = entry
        .required_capabilities
        .iter()
        .map(|c| c.as_str())
        .collect();
    if !capabilities.is_empty() {
        println!("  Requires: {}", capabilities.join(", "));
    }
    for (i, step) in entry.ordered_steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    if let Some(prompt) = &entry.prompt_ref {
        println!("  Prompt: {}", prompt);
    }
}

pub fn handle_prompts_list(store: &PromptStore, format: OutputFormat) -> Result<()> {
    let names = store.list();

    match format {
        OutputFormat::Json => {
            let prompts: Vec<Value> = names
                .iter()
                .map(|name| json!({"name": name, "description": prompts::describe(name)}))
                .collect();
            print_json(&json!({ "prompts": prompts }))
        }
        OutputFormat::Text => {
            if names.is_empty() {
                println!("No prompts found in {}", store.prompts_dir().display());
            } else {
                for name in names {
                    println!("  {:<25} {}", name, prompts::describe(&name));
                }
            }
            Ok(())
        }
    }
}

pub fn handle_prompts_get(
    store: &PromptStore,
    name: &str,
    context: &[String],
    format: OutputFormat,
) -> Result<()> {
    let arguments = parse_context(context)?;
    let content = store.get(name, &arguments);

    match format {
        OutputFormat::Json => print_json(&json!({ "prompt": content })),
        OutputFormat::Text => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Parse `key=value` pairs into a template context
pub fn parse_context(pairs: &[String]) -> Result<Map<String, Value>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected key=value, got '{}'", pair))?;
            if key.is_empty() {
                bail!("Empty key in '{}'", pair);
            }
            Ok((key.to_string(), Value::String(value.to_string())))
        })
        .collect()
}

pub async fn handle_analyze(
    orchestrator: &AnalysisOrchestrator,
    request: AnalysisRequest,
    format: OutputFormat,
) -> Result<()> {
    // Ctrl-C fails the run before usage is recorded
    let (abort, abort_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting analysis");
            let _ = abort.send(true);
        }
    });
    let result = orchestrator.run_until(request, abort_rx).await;
    interrupt.abort();

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_analysis(&result),
    }

    if result.is_success() {
        Ok(())
    } else {
        bail!(
            "Analysis failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

fn print_analysis(result: &AnalysisResult) {
    if let Some(task) = &result.task_kind {
        println!("Task: {}", task);
    }
    for (i, step) in result.steps_completed.iter().enumerate() {
        println!("  ✓ {}. {}", i + 1, step);
    }
    if let Some(text) = &result.analysis_text {
        println!();
        println!("{}", text);
    }
    if let Some(billing) = &result.billing {
        println!();
        print_billing(billing);
    }
}

/// Validate configuration and check the directories the engine reads from
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));
    checks.push((
        "Billing tiers".to_string(),
        format!("{} configured", config.billing.tiers.len()),
    ));

    let capabilities: Vec<&str> = config
        .orchestrator
        .capabilities
        .iter()
        .map(|c| c.as_str())
        .collect();
    checks.push((
        "Capabilities".to_string(),
        if capabilities.is_empty() {
            "none".to_string()
        } else {
            capabilities.join(", ")
        },
    ));

    if config.prompts.dir.is_dir() {
        match PromptStore::load(&config.prompts.dir).await {
            Ok(store) if store.is_empty() => {
                checks.push(("Prompt directory".to_string(), "Empty".to_string()));
                issues.push(format!(
                    "No .{} files in {}",
                    prompts::PROMPT_EXTENSION,
                    config.prompts.dir.display()
                ));
            }
            Ok(store) => {
                checks.push((
                    "Prompt directory".to_string(),
                    format!("{} template(s)", store.len()),
                ));
            }
            Err(e) => {
                checks.push(("Prompt directory".to_string(), "Unreadable".to_string()));
                issues.push(format!("Cannot read prompt directory: {:#}", e));
            }
        }
    } else {
        checks.push(("Prompt directory".to_string(), "Missing".to_string()));
        issues.push(format!(
            "Prompt directory does not exist: {}",
            config.prompts.dir.display()
        ));
    }

    let workspace = &config.orchestrator.workspace;
    if workspace.is_dir() {
        checks.push(("Workspace".to_string(), "Exists".to_string()));
        let patients = workspace.join(crate::runtime::documents::PATIENTS_DIR);
        if !patients.is_dir() {
            checks.push(("Patient records".to_string(), "Missing".to_string()));
        } else {
            checks.push(("Patient records".to_string(), "Exists".to_string()));
        }
    } else {
        checks.push(("Workspace".to_string(), "Missing".to_string()));
        issues.push(format!(
            "Workspace directory does not exist: {}",
            workspace.display()
        ));
    }

    match format {
        OutputFormat::Text => {
            println!("MedMeter System Diagnostics");
            println!("===========================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({"name": name, "status": status})
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty(),
            });
            print_json(&output)?;
        }
    }

    Ok(())
}
