use crate::config::schema::ExporterConfig;
use crate::error::{Error, Result};
use config::{Config, Environment};
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the optional config file, then applies environment overrides
    /// (the variable names the exporter has always honored), then validates.
    pub fn load(path: Option<&Path>) -> Result<ExporterConfig> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => ExporterConfig::default(),
        };
        Self::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<ExporterConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config: ExporterConfig = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some("yaml") | Some("yml") => {
                let config: ExporterConfig = serde_yaml::from_str(&content)?;
                Ok(config)
            }
            Some("toml") => {
                let config: ExporterConfig = toml::from_str(&content)?;
                Ok(config)
            }
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn apply_env(config: &mut ExporterConfig) -> Result<()> {
        let env = Config::builder()
            .add_source(Environment::default())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        if let Ok(path) = env.get_string("boinc_client_state_xml") {
            config.client_state_path = PathBuf::from(path);
        }
        if let Ok(path) = env.get_string("metrics_http_path") {
            config.metrics_path = path;
        }
        if let Ok(port) = env.get_int("metrics_http_port") {
            config.metrics_port = u16::try_from(port)
                .map_err(|_| Error::Config(format!("invalid metrics port: {}", port)))?;
        }
        if let Ok(path) = env.get_string("boinc_logfile_path") {
            config.log_file_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}
