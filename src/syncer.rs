use crate::error::Result;
use crate::metrics::ClientMetrics;
use crate::state::{ClientState, StateReader};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Republishes the state-derived gauges from a fresh snapshot. Runs once
/// per scrape request, before the registry is encoded.
pub struct StateSyncer {
    reader: Arc<dyn StateReader>,
    metrics: Arc<ClientMetrics>,
    cache_ttl: Duration,
    last_sync: Mutex<Option<Instant>>,
}

impl StateSyncer {
    pub fn new(
        reader: Arc<dyn StateReader>,
        metrics: Arc<ClientMetrics>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            reader,
            metrics,
            cache_ttl,
            last_sync: Mutex::new(None),
        }
    }

    /// A failed read or parse leaves every gauge as it was: nothing is
    /// pruned or published until a whole snapshot is in hand. With a cache
    /// TTL configured, scrapes inside the window serve the previous
    /// snapshot's values without touching the file.
    pub async fn sync(&self) -> Result<()> {
        if !self.cache_ttl.is_zero() {
            let last = self.last_sync.lock().unwrap();
            if let Some(at) = *last {
                if at.elapsed() < self.cache_ttl {
                    return Ok(());
                }
            }
        }

        let start = Instant::now();
        let state = match self.reader.fetch().await {
            Ok(state) => state,
            Err(e) => {
                self.metrics.scrape_errors.inc();
                return Err(e);
            }
        };
        self.publish(&state);
        self.metrics.scrape_duration.set(start.elapsed().as_secs_f64());
        *self.last_sync.lock().unwrap() = Some(Instant::now());
        Ok(())
    }

    fn publish(&self, state: &ClientState) {
        self.metrics.prune_task_series();

        if !state.host_info.domain_name.is_empty() {
            self.metrics
                .hostinfo_domainname
                .with_label_values(&[&state.host_info.domain_name])
                .set(1);
        }

        for result in &state.results {
            self.metrics
                .result_deadline
                .with_label_values(&[&result.name])
                .set(result.report_deadline);
            self.metrics
                .result_received_time
                .with_label_values(&[&result.name])
                .set(result.received_time);
        }

        let tasks = &state.active_task_set.active_tasks;
        self.metrics.active_task_count.set(tasks.len() as f64);
        for task in tasks {
            self.metrics
                .active_task_fraction_done
                .with_label_values(&[&task.name])
                .set(task.fraction_done);
            self.metrics
                .active_task_elapsed_time
                .with_label_values(&[&task.name])
                .set(task.elapsed_time);
        }
    }
}
