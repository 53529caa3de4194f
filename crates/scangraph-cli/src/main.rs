mod commands;
mod logging;
mod progress;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use scangraph_core::{
    open_store, pipeline, AppConfig, CommitResult, CommitStatus, GraphStore, IngestEngine, Label,
};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match scangraph_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    if let Commands::PrintConfig = command {
        println!("Configuration: {:#?}", config);
        return Ok(());
    }

    let store = open_store(&config.graph);
    if args.ingest && !matches!(command, Commands::Ingest) {
        run_ingest(&config, store.clone())?;
    }

    let outcome = match command {
        Commands::Ingest => run_ingest(&config, store.clone()),
        Commands::Schema { limit } => {
            print_schema(store.as_ref(), limit.unwrap_or(config.graph.schema_triple_limit))
        }
        Commands::Summary => print_summary(store.as_ref()),
        Commands::List { label } => print_instances(store.as_ref(), &label),
        Commands::DeleteScan { scan_id } => delete_scan(store.as_ref(), &scan_id),
        Commands::Verify { scan_id } => {
            let result = pipeline::reverify(store.as_ref(), &scan_id);
            report_commit(&result)
        }
        Commands::PrintConfig => Ok(()),
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
    Ok(())
}

fn run_ingest(config: &AppConfig, store: Arc<dyn GraphStore>) -> Result<()> {
    let engine = IngestEngine::new(config.clone(), store);
    let reporter = CliReporter::new();
    let report = engine.run(&reporter).context("ingest failed")?;

    println!();
    info!(
        "Scan: {}, Upsert: {}, Interpret: {}, Commit: {}",
        format!("{:.2}s", report.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.upsert_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.interpret_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.commit_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files, {} folders, {} unreadable, {} shared checksums, {} interpretations",
        format!("{}", report.files).cyan(),
        format!("{}", report.folders).cyan(),
        format!("{}", report.unreadable).red(),
        format!("{}", report.duplicate_checksums).yellow(),
        format!("{}", report.interpretations).cyan(),
    );
    report_commit(&report.commit)
}

fn report_commit(result: &CommitResult) -> Result<()> {
    match result.status() {
        CommitStatus::Verified => {
            println!(
                "{} scan {}: {} files, {} folders linked",
                "verified".green().bold(),
                result.scan_id,
                result.files_linked,
                result.folders_linked
            );
            Ok(())
        }
        CommitStatus::Unconfirmed => {
            warn!(
                "Scan {} accepted but durability is unconfirmed; retry `verify {}`",
                result.scan_id, result.scan_id
            );
            println!(
                "{} scan {}: exists={}, {} files, {} folders linked",
                "unconfirmed".yellow().bold(),
                result.scan_id,
                result.scan_exists,
                result.files_linked,
                result.folders_linked
            );
            Ok(())
        }
        CommitStatus::Failed => anyhow::bail!(
            "commit of scan '{}' failed: {}",
            result.scan_id,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn print_schema(store: &dyn GraphStore, limit: usize) -> Result<()> {
    let triples = store.schema_triples(limit)?;
    println!("{}", "Nodes".bold());
    for node in &triples.nodes {
        println!("  {:<16} {}", node.label.cyan(), node.count);
    }
    println!("{}", "Edges".bold());
    for edge in &triples.edges {
        println!(
            "  ({})-[{}]->({}) {}",
            edge.start_label.cyan(),
            edge.rel_type.yellow(),
            edge.end_label.cyan(),
            edge.count
        );
    }
    if triples.truncated {
        println!("  {}", format!("(truncated at {})", limit).dimmed());
    }
    Ok(())
}

fn print_summary(store: &dyn GraphStore) -> Result<()> {
    let summary = store.schema_summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn print_instances(store: &dyn GraphStore, label: &str) -> Result<()> {
    let label: Label = label.parse().map_err(anyhow::Error::msg)?;
    let rows = store.list_instances(label)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn delete_scan(store: &dyn GraphStore, scan_id: &str) -> Result<()> {
    if store.delete_scan(scan_id)? {
        println!("Deleted scan {}", scan_id);
    } else {
        warn!("No scan with id {}", scan_id);
    }
    Ok(())
}
