use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::fixtures::RootPairing;
use crate::services::openfga::MAX_BATCH_SIZE;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
pub struct BenchConfig {
    #[garde(dive)]
    #[serde(default)]
    pub openfga: OpenFgaConfig,

    #[garde(dive)]
    #[serde(default)]
    pub workloads: WorkloadConfig,

    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Checks that span more than one field
    pub fn check_consistency(&self) -> Result<(), String> {
        let chunk = self.workloads.hierarchy_batch_tuples();
        if chunk > MAX_BATCH_SIZE {
            return Err(format!(
                "workloads.hierarchies_per_batch x workloads.hierarchy_depth = {chunk} exceeds the \
                 {MAX_BATCH_SIZE} tuple write limit"
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize, Serialize, Validate)]
pub struct OpenFgaConfig {
    #[garde(length(min = 1), custom(validate_api_url))]
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[garde(skip)]
    #[serde(default)]
    pub api_token: Option<String>,

    #[garde(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64, // seconds

    #[garde(range(min = 1, max = 60))]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64, // seconds

    /// Random UUID when unset
    #[garde(skip)]
    #[serde(default)]
    pub store_name: Option<String>,

    #[garde(skip)]
    #[serde(default = "default_delete_store_on_exit")]
    pub delete_store_on_exit: bool,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_delete_store_on_exit() -> bool {
    true
}

impl Default for OpenFgaConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            store_name: None,
            delete_store_on_exit: default_delete_store_on_exit(),
        }
    }
}

impl std::fmt::Debug for OpenFgaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFgaConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("store_name", &self.store_name)
            .field("delete_store_on_exit", &self.delete_store_on_exit)
            .finish()
    }
}

/// Pool sizes and batching for the four workloads.
///
/// Each pool is filled once during setup and drained one tuple per
/// invocation. A run that needs more invocations than a pool holds fails
/// with `PoolExhausted` instead of blocking.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct WorkloadConfig {
    /// Tuples per write call
    #[garde(range(min = 1, max = 1000))]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[garde(range(min = 1))]
    #[serde(default = "default_create_pool_size")]
    pub create_pool_size: usize,

    #[garde(range(min = 1))]
    #[serde(default = "default_delete_pool_size")]
    pub delete_pool_size: usize,

    /// Size of each of the existent and non-existent lookup pools
    #[garde(range(min = 1))]
    #[serde(default = "default_lookup_pool_size")]
    pub lookup_pool_size: usize,

    #[garde(range(min = 1))]
    #[serde(default = "default_hierarchy_count")]
    pub hierarchy_count: usize,

    #[garde(range(min = 1, max = 1000))]
    #[serde(default = "default_hierarchy_depth")]
    pub hierarchy_depth: usize,

    /// Hierarchies persisted per write call during transitive setup
    #[garde(range(min = 1, max = 1000))]
    #[serde(default = "default_hierarchies_per_batch")]
    pub hierarchies_per_batch: usize,

    #[garde(skip)]
    #[serde(default)]
    pub root_pairing: RootPairing,
}

impl WorkloadConfig {
    /// Tuples in one hierarchy write call
    pub fn hierarchy_batch_tuples(&self) -> usize {
        self.hierarchies_per_batch * self.hierarchy_depth
    }
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_create_pool_size() -> usize {
    40_000
}

fn default_delete_pool_size() -> usize {
    40_000
}

fn default_lookup_pool_size() -> usize {
    100_000
}

fn default_hierarchy_count() -> usize {
    60_000
}

fn default_hierarchy_depth() -> usize {
    5
}

fn default_hierarchies_per_batch() -> usize {
    100
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            create_pool_size: default_create_pool_size(),
            delete_pool_size: default_delete_pool_size(),
            lookup_pool_size: default_lookup_pool_size(),
            hierarchy_count: default_hierarchy_count(),
            hierarchy_depth: default_hierarchy_depth(),
            hierarchies_per_batch: default_hierarchies_per_batch(),
            root_pairing: RootPairing::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn validate_api_url(value: &str, _: &()) -> garde::Result {
    let url = reqwest::Url::parse(value).map_err(|_| garde::Error::new("Invalid URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(garde::Error::new("URL scheme must be http or https")),
    }
}
