use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dar",
    about = "Digital Asset Registry — content-addressed assets on an external ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute the content digest of a file
    Digest(DigestArgs),
    /// Run the full asset lifecycle against a simulated ledger
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct DigestArgs {
    /// File to digest
    pub path: String,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Simulated confirmation latency in milliseconds
    #[arg(long, default_value = "150")]
    pub latency_ms: u64,
    /// Confirmation timeout budget in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,
}
