use boinc_exporter::config::ConfigLoader;
use boinc_exporter::metrics::ClientMetrics;
use boinc_exporter::server::{self, AppState};
use boinc_exporter::state::{FileStateReader, StateReader};
use boinc_exporter::syncer::StateSyncer;
use boinc_exporter::watcher::LogEventWatcher;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "boinc-exporter")]
#[command(version = "0.1.0")]
#[command(about = "Prometheus exporter for the BOINC client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exporter
    Run {
        /// Path to an optional configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Read the client state file once and print a summary
    Check {
        /// Path to an optional configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = ConfigLoader::load(config.as_deref())?;
            log::info!("state file: {}", config.client_state_path.display());

            let metrics = Arc::new(ClientMetrics::new()?);
            let reader = Arc::new(FileStateReader::new(
                &config.client_state_path,
                Duration::from_millis(config.read_timeout_ms),
            ));
            let syncer = Arc::new(StateSyncer::new(
                reader,
                metrics.clone(),
                Duration::from_millis(config.cache_ttl_ms),
            ));

            match &config.log_file_path {
                Some(path) => {
                    log::info!("following logfile: {}", path.display());
                    LogEventWatcher::new(
                        path,
                        Duration::from_millis(config.poll_interval_ms),
                        metrics.clone(),
                    )
                    .spawn();
                }
                None => log::info!("no logfile configured, task event counters disabled"),
            }

            server::serve(&config, AppState { syncer, metrics }).await?;
        }
        Commands::Check { config } => {
            let config = ConfigLoader::load(config.as_deref())?;
            let reader = FileStateReader::new(
                &config.client_state_path,
                Duration::from_millis(config.read_timeout_ms),
            );
            match reader.fetch().await {
                Ok(state) => {
                    println!("✅ Parsed {}:", config.client_state_path.display());
                    println!("   Domain: {}", state.host_info.domain_name);
                    println!("   Results: {}", state.results.len());
                    for result in &state.results {
                        println!(
                            "     {} v{} due {}",
                            result.name,
                            result.version_num,
                            format_timestamp(result.report_deadline)
                        );
                    }
                    let tasks = &state.active_task_set.active_tasks;
                    println!("   Active tasks: {}", tasks.len());
                    for task in tasks {
                        println!(
                            "     {} {:.1}% ({:.0}s elapsed)",
                            task.name,
                            task.fraction_done * 100.0,
                            task.elapsed_time
                        );
                    }
                }
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn format_timestamp(unix: f64) -> String {
    DateTime::from_timestamp(unix as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("{}", unix))
}
