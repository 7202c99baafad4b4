pub mod reader;
pub mod schema;

pub use reader::{FileStateReader, StateReader};
pub use schema::{ActiveTask, ActiveTaskSet, ClientState, HostInfo, TaskResult};
