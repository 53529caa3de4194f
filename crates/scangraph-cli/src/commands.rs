use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scangraph")]
#[command(about = "Catalog scanned files into a graph", long_about = None)]
pub struct Cli {
    /// Ingest the configured roots before running the command. The local
    /// backend keeps no state between runs, so read commands need this.
    #[arg(long, global = true)]
    pub ingest: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan configured roots and commit the scan to the graph
    Ingest,
    /// Print per-label node counts and edge triples
    Schema {
        /// Maximum number of edge triples to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print node and relation totals
    Summary,
    /// Print all instances of a label as JSON
    List {
        /// File, Folder, Scan, ResearchObject or Interpreter
        label: String,
    },
    /// Delete a scan node without touching its files or folders
    DeleteScan { scan_id: String },
    /// Re-verify a committed scan
    Verify { scan_id: String },
    /// Print configuration values
    PrintConfig,
}
