use crate::errors::StoreError;
use crate::gateway::{FileStore, Gateway, RestGateway};
use std::{env, path::PathBuf, sync::Arc};
use tracing::info;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/habits.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    File(PathBuf),
    Rest { url: String, api_key: Option<String> },
}

impl StoreConfig {
    pub async fn connect(&self) -> Result<Arc<dyn Gateway>, StoreError> {
        match self {
            StoreConfig::File(path) => {
                info!("using file store at {}", path.display());
                Ok(Arc::new(FileStore::open(path.clone()).await?))
            }
            StoreConfig::Rest { url, api_key } => {
                info!("using rest store at {url}");
                Ok(Arc::new(RestGateway::new(url.clone(), api_key.clone())))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let store = match lookup("HABITS_STORE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => StoreConfig::Rest {
                url,
                api_key: lookup("HABITS_STORE_KEY").filter(|key| !key.is_empty()),
            },
            None => StoreConfig::File(
                lookup("HABITS_DATA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            ),
        };

        Self { port, store }
    }
}
