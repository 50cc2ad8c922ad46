use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::content::{BlobRegistry, ContentType, ContentTypes};
use crate::export::{Exporter, DEFAULT_ROOT_PREFIX};
use crate::media::classify::{DEFAULT_ASSET_FOLDERS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::media::materialize::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
use crate::media::{AssetMaterializer, ClassifierRules, FetchError, FsFetcher, HttpFetcher, SiteFetcher};
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub export: ExportConfig,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
    /// Content type overrides per document
    pub content_types: ContentTypes,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Assets materialized at once
    pub concurrency: usize,
    /// Namespace resolved paths are rooted at
    pub root_prefix: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory holding the built site
    pub static_root: Option<PathBuf>,
    /// Prefix for site-relative URLs when nothing local serves them
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_asset_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub asset_folders: Vec<String>,
    pub media_extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlExportConfig {
    pub concurrency: Option<usize>,
    pub root_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlFetchConfig {
    pub static_root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_asset_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlClassifierConfig {
    pub asset_folders: Option<Vec<String>>,
    pub media_extensions: Option<Vec<String>>,
}

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub export: Option<TomlExportConfig>,
    #[serde(default)]
    pub fetch: Option<TomlFetchConfig>,
    #[serde(default)]
    pub classifier: Option<TomlClassifierConfig>,
    #[serde(default)]
    pub documents: Option<HashMap<String, ContentType>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            export: ExportConfig {
                concurrency: DEFAULT_CONCURRENCY,
                root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            },
            fetch: FetchConfig {
                static_root: None,
                base_url: None,
                timeout: DEFAULT_FETCH_TIMEOUT,
                max_asset_bytes: None,
            },
            classifier: ClassifierConfig {
                asset_folders: DEFAULT_ASSET_FOLDERS.iter().map(|s| s.to_string()).collect(),
                media_extensions: IMAGE_EXTENSIONS
                    .iter()
                    .chain(VIDEO_EXTENSIONS)
                    .map(|s| s.to_string())
                    .collect(),
            },
            content_types: ContentTypes::new(),
        }
    }
}

impl Config {
    /// Load `~/.sitepack/config.toml`, merging with defaults
    ///
    /// Writes the bundled example on first run. An unreadable or invalid
    /// file is logged and ignored.
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        match Self::load_from(&config_file) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring config file");
                Config::default()
            }
        }
    }

    /// Load a specific config file; errors are returned
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let toml_config =
            toml::from_str::<TomlConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Config::default();
        config.merge(toml_config);
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(export) = toml_config.export {
            if let Some(concurrency) = export.concurrency {
                self.export.concurrency = concurrency.max(1);
            }
            if let Some(root_prefix) = export.root_prefix {
                let trimmed = root_prefix.trim().trim_matches('/');
                if !trimmed.is_empty() {
                    self.export.root_prefix = trimmed.to_string();
                }
            }
        }

        if let Some(fetch) = toml_config.fetch {
            if fetch.static_root.is_some() {
                self.fetch.static_root = fetch.static_root;
            }
            if fetch.base_url.is_some() {
                self.fetch.base_url = fetch.base_url;
            }
            if let Some(secs) = fetch.timeout_secs {
                self.fetch.timeout = Duration::from_secs(secs.max(1));
            }
            if fetch.max_asset_bytes.is_some() {
                self.fetch.max_asset_bytes = fetch.max_asset_bytes;
            }
        }

        if let Some(classifier) = toml_config.classifier {
            if let Some(folders) = classifier.asset_folders {
                self.classifier.asset_folders = folders;
            }
            if let Some(extensions) = classifier.media_extensions {
                self.classifier.media_extensions = extensions;
            }
        }

        if let Some(documents) = toml_config.documents {
            for (document, content_type) in documents {
                self.content_types.set(document, content_type);
            }
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write default config");
        }
    }

    pub fn with_static_root(mut self, dir: PathBuf) -> Self {
        self.fetch.static_root = Some(dir);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.fetch.base_url = Some(base_url.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.export.concurrency = concurrency.max(1);
        self
    }

    pub fn classifier_rules(&self) -> ClassifierRules {
        ClassifierRules::new(
            self.classifier.asset_folders.iter().cloned(),
            self.classifier.media_extensions.iter().cloned(),
        )
    }

    /// Fetcher for the configured static root and base URL
    pub fn site_fetcher(&self) -> Result<SiteFetcher, FetchError> {
        let mut http = HttpFetcher::new(self.fetch.timeout)?;
        if let Some(base_url) = &self.fetch.base_url {
            http = http.with_base_url(base_url.as_str());
        }
        let local = self.fetch.static_root.as_ref().map(FsFetcher::new);
        Ok(SiteFetcher::new(http, local))
    }

    /// Exporter wired from this configuration
    pub fn exporter(&self, blobs: BlobRegistry) -> Result<Exporter, FetchError> {
        let materializer = AssetMaterializer::new(Arc::new(self.site_fetcher()?))
            .with_registry(blobs)
            .with_timeout(self.fetch.timeout)
            .with_max_bytes(self.fetch.max_asset_bytes);
        Ok(Exporter::new(materializer)
            .with_classifier(self.classifier_rules())
            .with_concurrency(self.export.concurrency)
            .with_root_prefix(self.export.root_prefix.as_str()))
    }
}
