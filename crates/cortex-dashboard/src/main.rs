mod action_map;
mod app;
mod cli;
mod config;
mod engine;
mod input;
mod planner;
mod render;
mod samplers;
mod scheduler;
mod store;

use std::sync::Arc;

use clap::Parser;
use cortex_audit::{AuditSink, JsonlAuditSink};
use cortex_core::{AuditAction, AuditOutcome, AuditRecord};
use cortex_executor::{needs_elevation, SandboxExecutor, ShellExecutor};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use planner::{is_valid_package_name, InterpreterPlanner, Planner};

const DEFAULT_INTERPRETER: &str = "cortex-interpreter";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Some(Commands::Install { package, execute, dry_run, verbose }) => {
            run_install_command(package, execute, dry_run, verbose).await
        }
        None => run_dashboard().await,
    };

    std::process::exit(exit_code);
}

async fn run_dashboard() -> i32 {
    let interpreter = std::env::var("CORTEX_INTERPRETER_PATH").unwrap_or_else(|_| DEFAULT_INTERPRETER.to_string());
    match app::run(interpreter).await {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            tracing::error!(error = %err, "dashboard exited with an error");
            eprintln!("cortex: {err}");
            1
        }
    }
}

/// Non-interactive one-shot `cortex install <package>` (§6): plans and,
/// unless `--dry-run`, executes without opening the dashboard.
async fn run_install_command(package: String, execute: bool, dry_run: bool, verbose: bool) -> i32 {
    if verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    if !is_valid_package_name(&package) {
        eprintln!("cortex: invalid package name: {package}");
        return 1;
    }
    if !config::has_llm_credentials() {
        eprintln!("cortex: {}", cortex_core::AppError::MissingCredentials);
        return 1;
    }

    let audit_path = config::history_db_path().unwrap_or_else(|| std::path::PathBuf::from(".cortex/history.db"));
    let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditSink::new(audit_path));
    audit
        .record(AuditRecord::new(AuditAction::Install, package.clone(), AuditOutcome::Started))
        .await;

    let interpreter = std::env::var("CORTEX_INTERPRETER_PATH").unwrap_or_else(|_| DEFAULT_INTERPRETER.to_string());
    let planner = InterpreterPlanner::new(interpreter);
    let plan = match planner.plan(&package).await {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("cortex: {err}");
            audit
                .record(AuditRecord::new(AuditAction::Install, package, AuditOutcome::Failed))
                .await;
            return 1;
        }
    };

    println!("Plan for {package}:");
    for command in &plan.commands {
        println!("  {command}");
    }

    let should_execute = execute && !dry_run;
    if !should_execute {
        return 0;
    }

    audit
        .record(AuditRecord::new(AuditAction::InstallConfirmed, package.clone(), AuditOutcome::Started))
        .await;

    let executor = ShellExecutor::new();
    for command in &plan.commands {
        let stdin = if needs_elevation(command) {
            eprintln!("cortex: {command} requires sudo; re-run from the dashboard to supply a password");
            audit
                .record(AuditRecord::new(AuditAction::InstallExecute, package.clone(), AuditOutcome::Failed))
                .await;
            return 1;
        } else {
            None
        };
        match executor.execute(command, stdin).await {
            Ok(result) if result.success => println!("ok: {command}"),
            Ok(_) => {
                eprintln!("cortex: command failed: {command}");
                audit
                    .record(AuditRecord::new(AuditAction::InstallExecute, package.clone(), AuditOutcome::Failed))
                    .await;
                return 1;
            }
            Err(err) => {
                eprintln!("cortex: {err}");
                audit
                    .record(AuditRecord::new(AuditAction::InstallExecute, package.clone(), AuditOutcome::Failed))
                    .await;
                return 1;
            }
        }
    }

    audit
        .record(AuditRecord::new(AuditAction::InstallExecute, package, AuditOutcome::Succeeded))
        .await;
    0
}
