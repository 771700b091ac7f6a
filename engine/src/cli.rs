//! CLI interface for MedMeter
//!
//! Defines all commands and global flags using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MedMeter medical analysis engine
///
/// Serves tool guidance and prompt templates to orchestrating agents,
/// runs guided document analyses and prices them per document.
#[derive(Parser, Debug)]
#[command(name = "medmeter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the orchestration protocol on stdin/stdout
    Protocol,

    /// Start the HTTP API
    Serve,

    /// Price analyses
    Billing {
        #[command(subcommand)]
        action: BillingAction,
    },

    /// Show tool guidance for a task kind
    Guidance {
        /// Task kind, e.g. analyze_file
        task: String,
    },

    /// Inspect prompt templates
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },

    /// Run one guided analysis
    Analyze {
        /// Customer identifier
        #[arg(long)]
        customer: String,

        /// Billing tier
        #[arg(long, default_value = "basic")]
        tier: String,

        /// Customer class (standard, premium, enterprise)
        #[arg(long, default_value = "standard")]
        class: String,

        /// Number of documents billed
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        count: i64,

        /// Document path inside the workspace, or an http(s) URL
        #[arg(long)]
        file: Option<String>,

        /// Free-text clinical query
        #[arg(long)]
        query: Option<String>,

        /// Patient identifier
        #[arg(long)]
        patient: Option<String>,

        /// Explicit task kind
        #[arg(long)]
        task: Option<String>,
    },

    /// Run system diagnostics
    Doctor,
}

/// Billing actions
#[derive(Subcommand, Debug)]
pub enum BillingAction {
    /// Calculate the price of an analysis
    Calculate {
        /// Billing tier
        tier: String,

        /// Number of documents
        #[arg(allow_negative_numbers = true)]
        count: i64,

        /// Customer class
        #[arg(long, default_value = "standard")]
        class: String,
    },

    /// List billing tiers
    Tiers,
}

/// Prompt template actions
#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List loaded templates
    List,

    /// Render a template
    Get {
        /// Template name
        name: String,

        /// Template argument as key=value (repeatable)
        #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },
}
