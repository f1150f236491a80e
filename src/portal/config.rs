use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PortalError;

pub const CONFIG_FILE_NAME: &str = "qcportal_config.yaml";

fn default_verify() -> bool {
    true
}

/// Connection settings for a QCFractal server, read from
/// `qcportal_config.yaml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub address: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl ClientConfig {
    pub fn from_yaml(content: &str) -> Result<Self, PortalError> {
        let config: Self = serde_yaml::from_str(content)?;
        if config.address.trim().is_empty() {
            return Err(PortalError::Config("address must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Read the configuration from `path`, which may also name the directory
    /// holding `qcportal_config.yaml`. Without a path the working directory is
    /// searched first, then `~/.qca`.
    pub fn from_file(path: Option<&Path>) -> Result<Self, PortalError> {
        let path = match path {
            Some(p) if p.is_dir() => p.join(CONFIG_FILE_NAME),
            Some(p) => p.to_path_buf(),
            None => Self::search_default_locations()?,
        };

        log::info!("reading client configuration from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| {
            PortalError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    fn search_default_locations() -> Result<PathBuf, PortalError> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".qca").join(CONFIG_FILE_NAME));
        }

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or(PortalError::Config(format!(
                "no {} in the working directory or ~/.qca",
                CONFIG_FILE_NAME
            )))
    }

    /// The address with a scheme and a trailing slash, ready for joining
    /// endpoint names.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}/", address)
        } else {
            format!("https://{}/", address)
        }
    }
}
