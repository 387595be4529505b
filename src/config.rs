use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Length of one sampling window (seconds).
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Extra receive slack past the window so the last in-flight message is drained.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    /// Server-side collection filter; empty means the full firehose.
    #[serde(default)]
    pub wanted_collections: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_samples_dir")]
    pub samples_dir: String,
    #[serde(default = "default_report_path")]
    pub report_path: String,
}

fn default_feed_url() -> String {
    "wss://jetstream2.us-east.bsky.network/subscribe".into()
}

fn default_duration_secs() -> u64 {
    60
}

fn default_grace_ms() -> u64 {
    1000
}

fn default_samples_dir() -> String {
    "data/samples".into()
}

fn default_report_path() -> String {
    "stats.json".into()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            duration_secs: default_duration_secs(),
            grace_ms: default_grace_ms(),
            wanted_collections: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            samples_dir: default_samples_dir(),
            report_path: default_report_path(),
        }
    }
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (or `config.toml`). Falls back to defaults only when no
    /// path was given and the default file is absent.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)?;
                Self::load_from_str(&s)
            }
            Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::debug!("no config file; using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(_) => {
                let s = std::fs::read_to_string(DEFAULT_CONFIG_PATH)?;
                Self::load_from_str(&s)
            }
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.feed.url)
            .map_err(|e| anyhow::anyhow!("feed.url is not a valid URL ({}): {}", self.feed.url, e))?;
        anyhow::ensure!(
            matches!(url.scheme(), "ws" | "wss"),
            "feed.url must use ws:// or wss://, got {}",
            url.scheme()
        );
        anyhow::ensure!(
            self.feed.duration_secs > 0,
            "feed.duration_secs must be > 0, got {}",
            self.feed.duration_secs
        );
        anyhow::ensure!(
            self.feed.wanted_collections.iter().all(|c| !c.is_empty()),
            "feed.wanted_collections must not contain empty entries"
        );
        anyhow::ensure!(
            !self.storage.samples_dir.is_empty(),
            "storage.samples_dir must be non-empty"
        );
        anyhow::ensure!(
            !self.storage.report_path.is_empty(),
            "storage.report_path must be non-empty"
        );
        Ok(())
    }
}
