use crate::error::{Error, Result};
use crate::state::schema::ClientState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[async_trait]
pub trait StateReader: Send + Sync {
    async fn fetch(&self) -> Result<ClientState>;
}

pub struct FileStateReader {
    path: PathBuf,
    read_timeout: Duration,
}

impl FileStateReader {
    pub fn new(path: impl AsRef<Path>, read_timeout: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_timeout,
        }
    }

    pub fn parse(content: &str) -> Result<ClientState> {
        let state: ClientState = quick_xml::de::from_str(content)?;
        Ok(state)
    }

    fn read_error(&self, source: std::io::Error) -> Error {
        Error::Read {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StateReader for FileStateReader {
    async fn fetch(&self) -> Result<ClientState> {
        let read = tokio::fs::read_to_string(&self.path);
        let content = tokio::time::timeout(self.read_timeout, read)
            .await
            .map_err(|_| {
                self.read_error(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "state file read timed out",
                ))
            })?
            .map_err(|e| self.read_error(e))?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_STATE: &str = r#"<client_state>
    <host_info>
        <domain_name>crunchbox</domain_name>
    </host_info>
    <result>
        <name>wu_1</name>
        <report_deadline>1700000000.000000</report_deadline>
        <received_time>1690000000.000000</received_time>
        <version_num>817</version_num>
    </result>
    <result>
        <name>wu_2</name>
        <report_deadline>1700500000.000000</report_deadline>
        <received_time>1690500000.000000</received_time>
        <version_num>817</version_num>
    </result>
    <active_task_set>
        <active_task>
            <result_name>wu_1</result_name>
            <checkpoint_fraction_done>0.420000</checkpoint_fraction_done>
            <checkpoint_elapsed_time>120.500000</checkpoint_elapsed_time>
        </active_task>
    </active_task_set>
</client_state>"#;

    #[test]
    fn parse_full_document() {
        let state = FileStateReader::parse(FULL_STATE).unwrap();

        assert_eq!(state.host_info.domain_name, "crunchbox");
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.results[0].name, "wu_1");
        assert_eq!(state.results[0].report_deadline, 1700000000.0);
        assert_eq!(state.results[0].received_time, 1690000000.0);
        assert_eq!(state.results[0].version_num, 817);

        let tasks = &state.active_task_set.active_tasks;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "wu_1");
        assert_eq!(tasks[0].fraction_done, 0.42);
        assert_eq!(tasks[0].elapsed_time, 120.5);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let state = FileStateReader::parse(
            "<client_state><result><name>wu_3</name></result></client_state>",
        )
        .unwrap();

        assert_eq!(state.host_info.domain_name, "");
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].report_deadline, 0.0);
        assert_eq!(state.results[0].received_time, 0.0);
        assert_eq!(state.results[0].version_num, 0);
        assert!(state.active_task_set.active_tasks.is_empty());
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let state = FileStateReader::parse(
            "<client_state><platform>x86_64-pc-linux-gnu</platform>\
             <result><name>wu_4</name></result></client_state>",
        )
        .unwrap();
        assert_eq!(state.results[0].name, "wu_4");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = FileStateReader::parse("<client_state><result>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn malformed_value_is_a_parse_error() {
        let err = FileStateReader::parse(
            "<client_state><result><report_deadline>soon</report_deadline></result></client_state>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn fetch_missing_file_is_a_read_error() {
        let reader = FileStateReader::new("/nonexistent/client_state.xml", Duration::from_secs(1));
        let err = reader.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[tokio::test]
    async fn fetch_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_STATE.as_bytes()).unwrap();

        let reader = FileStateReader::new(file.path(), Duration::from_secs(1));
        let state = reader.fetch().await.unwrap();
        assert_eq!(state.results.len(), 2);
    }
}
