use crate::error::Result;
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Every metric the exporter publishes, registered against one shared
/// registry. Created once at startup and handed by Arc to both the state
/// syncer and the log watcher.
pub struct ClientMetrics {
    registry: Registry,

    pub hostinfo_domainname: IntGaugeVec,
    pub result_deadline: GaugeVec,
    pub result_received_time: GaugeVec,
    pub active_task_count: Gauge,
    pub active_task_fraction_done: GaugeVec,
    pub active_task_elapsed_time: GaugeVec,

    pub task_assigned: IntCounter,
    pub task_started: IntCounter,
    pub task_completed: IntCounter,
    pub task_uploaded: IntCounter,
    pub task_downloaded: IntCounter,

    pub scrape_duration: Gauge,
    pub scrape_errors: IntCounter,
}

impl ClientMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let hostinfo_domainname = IntGaugeVec::new(
            Opts::new("boinc_hostinfo_domainname", "Name of the boinc client domain"),
            &["domainname"],
        )?;
        let result_deadline = GaugeVec::new(
            Opts::new("boinc_result_deadline", "unix time to deadline"),
            &["name"],
        )?;
        let result_received_time = GaugeVec::new(
            Opts::new("boinc_result_received_time", "unix time received"),
            &["name"],
        )?;
        let active_task_count = Gauge::new("boinc_active_task_count", "current number of tasks")?;
        let active_task_fraction_done = GaugeVec::new(
            Opts::new(
                "boinc_active_task_fraction_done",
                "percentage of task completed",
            ),
            &["name"],
        )?;
        let active_task_elapsed_time = GaugeVec::new(
            Opts::new(
                "boinc_active_task_elapsed_time",
                "time spent working on active task",
            ),
            &["name"],
        )?;

        let task_assigned = IntCounter::new("boinc_task_assigned", "task assignments")?;
        let task_started = IntCounter::new("boinc_task_started", "task starting")?;
        let task_completed = IntCounter::new("boinc_task_completed", "task completed")?;
        let task_uploaded = IntCounter::new("boinc_task_uploaded", "task uploaded")?;
        let task_downloaded = IntCounter::new("boinc_task_downloaded", "task downloaded")?;

        let scrape_duration = Gauge::new(
            "boinc_scrape_duration_seconds",
            "duration of the last state file sync",
        )?;
        let scrape_errors = IntCounter::new(
            "boinc_scrape_errors_total",
            "state file syncs that failed",
        )?;

        registry.register(Box::new(hostinfo_domainname.clone()))?;
        registry.register(Box::new(result_deadline.clone()))?;
        registry.register(Box::new(result_received_time.clone()))?;
        registry.register(Box::new(active_task_count.clone()))?;
        registry.register(Box::new(active_task_fraction_done.clone()))?;
        registry.register(Box::new(active_task_elapsed_time.clone()))?;
        registry.register(Box::new(task_assigned.clone()))?;
        registry.register(Box::new(task_started.clone()))?;
        registry.register(Box::new(task_completed.clone()))?;
        registry.register(Box::new(task_uploaded.clone()))?;
        registry.register(Box::new(task_downloaded.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(scrape_errors.clone()))?;

        Ok(Self {
            registry,
            hostinfo_domainname,
            result_deadline,
            result_received_time,
            active_task_count,
            active_task_fraction_done,
            active_task_elapsed_time,
            task_assigned,
            task_started,
            task_completed,
            task_uploaded,
            task_downloaded,
            scrape_duration,
            scrape_errors,
        })
    }

    /// Drops every per-name series so labels absent from the next snapshot
    /// disappear instead of reporting their last value forever.
    pub fn prune_task_series(&self) {
        self.hostinfo_domainname.reset();
        self.result_deadline.reset();
        self.result_received_time.reset();
        self.active_task_fraction_done.reset();
        self.active_task_elapsed_time.reset();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::Error::Server(format!("non-utf8 exposition: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_registered_families() {
        let metrics = ClientMetrics::new().unwrap();
        metrics.task_started.inc();
        metrics
            .result_deadline
            .with_label_values(&["wu_1"])
            .set(1700000000.0);

        let body = metrics.encode().unwrap();
        assert!(body.contains("# TYPE boinc_task_started counter"));
        assert!(body.contains("boinc_task_started 1"));
        assert!(body.contains("boinc_result_deadline{name=\"wu_1\"} 1700000000"));
    }

    #[test]
    fn prune_drops_per_name_series() {
        let metrics = ClientMetrics::new().unwrap();
        metrics
            .result_deadline
            .with_label_values(&["wu_1"])
            .set(1.0);
        assert!(metrics.encode().unwrap().contains("wu_1"));

        metrics.prune_task_series();
        assert!(!metrics.encode().unwrap().contains("wu_1"));
    }
}
