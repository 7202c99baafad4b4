use serde::Deserialize;

/// Parsed view of the client state file. Rebuilt from scratch on every
/// scrape; only the fields the exporter publishes are extracted, anything
/// else in the document is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientState {
    #[serde(default)]
    pub host_info: HostInfo,

    #[serde(default, rename = "result")]
    pub results: Vec<TaskResult>,

    #[serde(default)]
    pub active_task_set: ActiveTaskSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostInfo {
    #[serde(default)]
    pub domain_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub name: String,

    /// Unix time the result must be reported by.
    #[serde(default)]
    pub report_deadline: f64,

    /// Unix time the result was received from the scheduler.
    #[serde(default)]
    pub received_time: f64,

    #[serde(default)]
    pub version_num: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveTaskSet {
    #[serde(default, rename = "active_task")]
    pub active_tasks: Vec<ActiveTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveTask {
    /// Matches the `name` of a result in the same snapshot.
    #[serde(default, rename = "result_name")]
    pub name: String,

    #[serde(default, rename = "checkpoint_fraction_done")]
    pub fraction_done: f64,

    #[serde(default, rename = "checkpoint_elapsed_time")]
    pub elapsed_time: f64,
}
