//! Template retrieval

use crate::{Result, TemplateError};
use std::collections::HashMap;

/// Source of template bytes
pub trait TemplateFetcher {
    /// Fetch the bytes stored at `location`
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Serves templates registered in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    templates: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: Vec<u8>) {
        self.templates.insert(location.into(), bytes);
    }

    pub fn with(mut self, location: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(location, bytes);
        self
    }
}

impl TemplateFetcher for MemoryFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.templates
            .get(location)
            .cloned()
            .ok_or_else(|| TemplateError::Download {
                location: location.to_string(),
                reason: "no template registered at this location".to_string(),
            })
    }
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use super::TemplateFetcher;
    use crate::config::DownloadConfig;
    use crate::{Result, TemplateError};
    use std::time::Duration;
    use tracing::{debug, info};
    use ureq::Agent;

    /// Downloads templates with a single blocking `GET`
    ///
    /// Non-success statuses and transport failures become
    /// [`TemplateError::Download`]. There is no retry.
    pub struct HttpFetcher {
        agent: Agent,
        max_bytes: u64,
    }

    impl HttpFetcher {
        pub fn new(config: &DownloadConfig) -> Self {
            let agent: Agent = Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
                .http_status_as_error(true)
                .build()
                .into();
            Self {
                agent,
                max_bytes: config.max_bytes,
            }
        }
    }

    impl TemplateFetcher for HttpFetcher {
        fn fetch(&self, location: &str) -> Result<Vec<u8>> {
            let download_error = |reason: String| TemplateError::Download {
                location: location.to_string(),
                reason,
            };

            debug!(location, "downloading template");
            let mut response = self
                .agent
                .get(location)
                .call()
                .map_err(|err| download_error(err.to_string()))?;

            let bytes = response
                .body_mut()
                .with_config()
                .limit(self.max_bytes)
                .read_to_vec()
                .map_err(|err| download_error(format!("failed reading response body: {err}")))?;

            info!(location, bytes = bytes.len(), "downloaded template");
            Ok(bytes)
        }
    }
}
