pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod interpret;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod scanner;
pub mod schema;
pub mod store;

pub use config::AppConfig;
pub use engine::{IngestEngine, IngestReport};
pub use error::{Error, Result};
pub use model::{Dataset, FileRow, FolderRow, Interpretation, Label, ResearchObject, ScanMeta};
pub use pipeline::{CommitResult, CommitStatus};
pub use progress::{ProgressReporter, SilentReporter};
pub use store::{open_store, GraphStore, LocalGraphStore};
