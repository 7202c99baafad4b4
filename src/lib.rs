pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod state;
pub mod syncer;
pub mod watcher;

pub use config::{ConfigLoader, ExporterConfig};
pub use error::{Error, Result};
pub use metrics::ClientMetrics;
pub use state::{ClientState, FileStateReader, StateReader};
pub use syncer::StateSyncer;
pub use watcher::LogEventWatcher;
