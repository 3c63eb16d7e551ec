use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Conduit LLM gateway client
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Send chat completions through an OpenAI-compatible LLM gateway")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Log filter directive, e.g. `conduit_client=debug`
    #[arg(long, env = "CONDUIT_LOG")]
    pub log_filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask for a plain text answer
    Chat {
        #[command(flatten)]
        prompt: PromptArgs,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },
    /// Ask for a JSON answer matching a schema
    Json {
        #[command(flatten)]
        prompt: PromptArgs,

        /// File holding the JSON Schema the answer must satisfy
        #[arg(long)]
        schema: PathBuf,

        /// Name sent with the schema
        #[arg(long, default_value = "response")]
        schema_name: String,
    },
}

#[derive(Debug, clap::Args)]
pub struct PromptArgs {
    /// User message
    pub prompt: String,

    /// Optional system message sent before the prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Model to use instead of the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,
}
