use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use crate::errors::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Client settings, usually read from a JSON file.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Upper bound on requests in flight at once.
    pub max_parallel: usize,
    /// Request deadline. `None` waits for as long as the server takes.
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_parallel: 1,
            timeout_secs: None,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<ClientConfig> {
        let file = File::open(path)?;
        let config: ClientConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if self.max_parallel == 0 {
            return Err(Error::Config("max_parallel must be at least 1".to_string()));
        }
        Ok(())
    }
}
