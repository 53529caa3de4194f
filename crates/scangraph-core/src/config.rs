use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub root_paths: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            provider: default_provider(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default = "default_triple_limit")]
    pub schema_triple_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            remote: None,
            schema_triple_limit: default_triple_limit(),
        }
    }
}

/// Connection parameters for the networked graph database.
#[derive(Clone, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub no_auth: bool,
    #[serde(default = "default_database")]
    pub database: String,
    /// Host identifier in the path+host natural key of Folder nodes, also
    /// recorded on File nodes. Falls back to the machine hostname.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_base_timeout")]
    pub base_timeout_secs: u64,
    #[serde(default = "default_per_row_timeout")]
    pub per_row_timeout_ms: u64,
    /// Connections opened lazily and used round-robin.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl RemoteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: None,
            password: None,
            no_auth: true,
            database: default_database(),
            host: None,
            connect_timeout_secs: default_connect_timeout(),
            base_timeout_secs: default_base_timeout(),
            per_row_timeout_ms: default_per_row_timeout(),
            pool_size: default_pool_size(),
        }
    }

    /// Credentials to send with `AUTH`, or `None` in no-auth mode.
    pub fn credentials(&self) -> Option<(Option<&str>, &str)> {
        if self.no_auth {
            return None;
        }
        self.password
            .as_deref()
            .map(|password| (self.username.as_deref(), password))
    }
}

// Keeps the password out of `print-config` output.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("no_auth", &self.no_auth)
            .field("database", &self.database)
            .field("host", &self.host)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("base_timeout_secs", &self.base_timeout_secs)
            .field("per_row_timeout_ms", &self.per_row_timeout_ms)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

fn default_provider() -> String {
    "local-fs".to_string()
}

fn default_triple_limit() -> usize {
    50
}

fn default_database() -> String {
    "scangraph".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_base_timeout() -> u64 {
    30
}

fn default_per_row_timeout() -> u64 {
    5
}

fn default_pool_size() -> usize {
    4
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("SCANGRAPH")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.root_paths")
                .with_list_parse_key("scan.ignore_patterns")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        let mut should_add = true;
        let result_clone = result.clone();

        for res_dir in &result_clone {
            let res_dir_path = Path::new(res_dir);

            if dir_path.starts_with(res_dir_path) {
                should_add = false;
                break;
            }

            if res_dir_path.starts_with(dir_path) {
                result.retain(|x| x != res_dir);
                break;
            }
        }

        if should_add {
            result.push(dir);
        }
    }

    result
}
