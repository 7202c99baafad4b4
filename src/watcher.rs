use crate::error::{Error, Result};
use crate::metrics::ClientMetrics;
use futures::stream::StreamExt;
use regex::Regex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::sleep;

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCounter {
    Assigned,
    Started,
    Completed,
    Uploaded,
    Downloaded,
}

#[derive(Debug, Clone, Copy)]
enum Extract {
    /// First integer in the rest of the line, e.g. "got 3 new tasks".
    FirstInt,
    One,
}

struct LogPattern {
    substring: &'static str,
    counter: EventCounter,
    extract: Extract,
}

// Checked in order; the first match wins and later patterns are not tried.
const PATTERNS: &[LogPattern] = &[
    LogPattern {
        substring: "Scheduler request complete: got",
        counter: EventCounter::Assigned,
        extract: Extract::FirstInt,
    },
    LogPattern {
        substring: "Starting task",
        counter: EventCounter::Started,
        extract: Extract::One,
    },
    LogPattern {
        substring: "Computation for task",
        counter: EventCounter::Completed,
        extract: Extract::One,
    },
    LogPattern {
        substring: "Finished upload of",
        counter: EventCounter::Uploaded,
        extract: Extract::One,
    },
    LogPattern {
        substring: "Finished download of",
        counter: EventCounter::Downloaded,
        extract: Extract::One,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEvent {
    pub counter: EventCounter,
    pub amount: u64,
}

/// Classifies one log line against the pattern table. `Ok(None)` means the
/// line matched nothing; an `Extraction` error means it matched a counting
/// pattern but carried no integer, and no counter should move.
pub fn classify(line: &str) -> Result<Option<LogEvent>> {
    for pattern in PATTERNS {
        let Some(idx) = line.find(pattern.substring) else {
            continue;
        };
        let amount = match pattern.extract {
            Extract::One => 1,
            Extract::FirstInt => {
                let rest = &line[idx + pattern.substring.len()..];
                match INT_RE.find(rest).and_then(|m| m.as_str().parse().ok()) {
                    Some(n) => n,
                    None => return Err(Error::Extraction(pattern.substring.to_string())),
                }
            }
        };
        return Ok(Some(LogEvent {
            counter: pattern.counter,
            amount,
        }));
    }
    Ok(None)
}

/// Tails the client log for the lifetime of the process, incrementing task
/// event counters. Runs independently of scrape requests; if the log cannot
/// be opened at startup the watcher stops and the counters simply stop
/// advancing, without affecting the rest of the exporter.
pub struct LogEventWatcher {
    path: PathBuf,
    poll_interval: Duration,
    metrics: Arc<ClientMetrics>,
}

impl LogEventWatcher {
    pub fn new(
        path: impl AsRef<Path>,
        poll_interval: Duration,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            poll_interval,
            metrics,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let (lines_tx, lines_rx) = mpsc::channel(256);

        let path = self.path.clone();
        let poll_interval = self.poll_interval;
        let follower = tokio::spawn(async move {
            if let Err(e) = follow(&path, poll_interval, lines_tx).await {
                log::error!("failed to tail logfile, no metrics will be collected: {}", e);
            }
        });

        let metrics = self.metrics;
        tokio_stream::wrappers::ReceiverStream::new(lines_rx)
            .for_each(|line| {
                let metrics = metrics.clone();
                async move {
                    apply(&metrics, &line);
                }
            })
            .await;

        let _ = follower.await;
    }
}

fn apply(metrics: &ClientMetrics, line: &str) {
    match classify(line) {
        Ok(Some(event)) => {
            let counter = match event.counter {
                EventCounter::Assigned => &metrics.task_assigned,
                EventCounter::Started => &metrics.task_started,
                EventCounter::Completed => &metrics.task_completed,
                EventCounter::Uploaded => &metrics.task_uploaded,
                EventCounter::Downloaded => &metrics.task_downloaded,
            };
            counter.inc_by(event.amount);
        }
        Ok(None) => {}
        Err(e) => log::warn!("{}", e),
    }
}

/// Follow-mode tail: starts at the current end of the file, polls for
/// appended lines, and reopens from the start when the file is truncated or
/// rotated out from under us.
async fn follow(path: &Path, poll_interval: Duration, lines_tx: mpsc::Sender<String>) -> Result<()> {
    let mut file = File::open(path).await.map_err(|e| Error::StreamOpen {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut pos = file
        .seek(SeekFrom::End(0))
        .await
        .map_err(|e| Error::StreamOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut reader = BufReader::new(file);
    let mut pending = String::new();
    let mut chunk = String::new();

    loop {
        chunk.clear();
        match reader.read_line(&mut chunk).await {
            Ok(0) => {
                if let Some(reopened) = reopen_if_rotated(path, reader.get_ref(), pos).await {
                    reader = BufReader::new(reopened);
                    pos = 0;
                    pending.clear();
                    continue;
                }
                if lines_tx.is_closed() {
                    return Ok(());
                }
                sleep(poll_interval).await;
            }
            Ok(n) => {
                pos += n as u64;
                pending.push_str(&chunk);
                // A chunk without a newline is a line still being written;
                // hold it until the rest arrives.
                if pending.ends_with('\n') {
                    let line = pending.trim_end().to_string();
                    pending.clear();
                    if lines_tx.send(line).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                sleep(poll_interval).await;
            }
        }
    }
}

async fn reopen_if_rotated(path: &Path, open: &File, pos: u64) -> Option<File> {
    let disk = tokio::fs::metadata(path).await.ok()?;
    let current = open.metadata().await.ok()?;
    let rotated = disk.len() < pos || file_id(&disk) != file_id(&current);
    if !rotated {
        return None;
    }
    match File::open(path).await {
        Ok(file) => {
            log::info!("log stream {} rotated, reopening", path.display());
            Some(file)
        }
        Err(e) => {
            log::warn!("failed to reopen {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> u64 {
    0
}
