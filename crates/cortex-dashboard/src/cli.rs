use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cortex", version, about = "AI-assisted package installer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan and install a package via the natural-language interpreter.
    Install {
        /// Package name, e.g. "nginx"
        package: String,

        /// Skip confirmation and actually run the plan.
        #[arg(long)]
        execute: bool,

        /// Plan only; never execute (default when neither flag is given).
        #[arg(long)]
        dry_run: bool,

        /// Verbose interpreter/executor logging.
        #[arg(long)]
        verbose: bool,
    },
}
