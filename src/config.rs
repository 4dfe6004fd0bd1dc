//! Configuration types for diario-dl

use crate::error::{Error, Result};
use crate::types::EditionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for [`GazetteDownloader`](crate::GazetteDownloader)
///
/// Every field has a sensible default matching the reference deployment, so
/// `Config::default()` works out of the box against the known service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote service (default: the Rio de Janeiro gazette portal)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request.
    ///
    /// The service rejects requests with default library agents, so a
    /// browser-style string is sent by default.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory for assembled output artifacts (default: "./diarios")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for per-edition temporary page files (default: "./diarios/temp_pages")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Path of the resume ledger file (default: "./historico.json")
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Maximum concurrent page fetches per edition (default: 30)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_pages: usize,

    /// Per-request timeout (default: 45 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Minimum size for an existing artifact to count as complete (default: 1024 bytes).
    ///
    /// An output file at or above this size short-circuits re-processing of
    /// its edition without any network access.
    #[serde(default = "default_min_artifact_bytes")]
    pub min_artifact_bytes: u64,

    /// Retry behavior for individual network operations
    #[serde(default)]
    pub retry: RetryConfig,

    /// Discovery and selection behavior
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            ledger_path: default_ledger_path(),
            max_concurrent_pages: default_max_concurrent(),
            request_timeout: default_request_timeout(),
            min_artifact_bytes: default_min_artifact_bytes(),
            retry: RetryConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Config {
    /// Deterministic path of the assembled artifact for one edition
    pub fn artifact_path(&self, id: EditionId) -> PathBuf {
        self.output_dir.join(format!("edicao_{id}.pdf"))
    }

    /// Validate the configuration, returning the first offending key
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_pages == 0 {
            return Err(Error::config(
                "concurrency limit must be at least 1",
                "max_concurrent_pages",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "at least one attempt is required",
                "retry.max_attempts",
            ));
        }
        self.discovery.validate()
    }
}

/// Retry configuration for transient failures.
///
/// Backoff is linear: the delay before attempt n+1 is `base_delay * n`.
/// The reference behavior is three attempts at 0.5s increments; this is a
/// deliberately flat curve, not an exponential one, because probe volume is
/// high and individual requests are cheap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay unit for linear backoff (default: 500 ms)
    #[serde(default = "default_base_delay", with = "duration_millis_serde")]
    pub base_delay: Duration,

    /// Add random jitter to delays (default: false).
    ///
    /// Off by default to preserve the strictly-increasing delay sequence;
    /// enable when many instances hammer the same service.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            jitter: false,
        }
    }
}

/// Inclusive bounds for one boundary search invocation
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SearchBounds {
    /// Lowest candidate value (inclusive)
    pub low: u32,
    /// Highest candidate value (inclusive)
    pub high: u32,
}

impl SearchBounds {
    /// Construct bounds; callers validate ordering via [`DiscoveryConfig::validate`]
    pub fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }
}

/// How boundary discovery resolves an Indeterminate probe
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminatePolicy {
    /// Fold retry-exhaustion into "does not exist" (reference behavior).
    ///
    /// Under network instability this biases the discovered boundary
    /// downward. It may under-report the newest edition or a page count,
    /// never over-report.
    #[default]
    TreatAsAbsent,
    /// Abort discovery with [`Error::DiscoveryInterrupted`](crate::error::Error::DiscoveryInterrupted)
    /// so the caller can distinguish "absent" from "unknown".
    Abort,
}

/// Discovery and per-run selection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Search window for the newest edition id (default: 7500-9000).
    ///
    /// This is a configuration constant, not a derived value: the upper
    /// bound must be raised periodically as the service's numbering grows
    /// past it, or discovery caps out. A result equal to `high` is logged
    /// at warn as a stale-window signal.
    #[serde(default = "default_edition_bounds")]
    pub edition_bounds: SearchBounds,

    /// Search window for the page count of one edition (default: 1-3000)
    #[serde(default = "default_page_bounds")]
    pub page_bounds: SearchBounds,

    /// How many not-yet-completed editions to process per run (default: 10)
    #[serde(default = "default_editions_per_run")]
    pub editions_per_run: usize,

    /// Lowest edition id the downward walk will consider (default: 6000).
    ///
    /// Bounds worst-case work when the ledger is far behind the service.
    #[serde(default = "default_floor_edition")]
    pub floor_edition: u32,

    /// Resolution of Indeterminate probes inside boundary searches
    #[serde(default)]
    pub indeterminate_policy: IndeterminatePolicy,

    /// Try the landing-page JSON shortcut before binary search (default: true)
    #[serde(default = "default_true")]
    pub use_landing_page: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            edition_bounds: default_edition_bounds(),
            page_bounds: default_page_bounds(),
            editions_per_run: default_editions_per_run(),
            floor_edition: default_floor_edition(),
            indeterminate_policy: IndeterminatePolicy::default(),
            use_landing_page: true,
        }
    }
}

impl DiscoveryConfig {
    fn validate(&self) -> Result<()> {
        if self.edition_bounds.low == 0 || self.edition_bounds.low > self.edition_bounds.high {
            return Err(Error::config(
                "edition search window must satisfy 1 <= low <= high",
                "discovery.edition_bounds",
            ));
        }
        if self.page_bounds.low == 0 || self.page_bounds.low > self.page_bounds.high {
            return Err(Error::config(
                "page search window must satisfy 1 <= low <= high",
                "discovery.page_bounds",
            ));
        }
        if self.editions_per_run == 0 {
            return Err(Error::config(
                "at least one edition per run is required",
                "discovery.editions_per_run",
            ));
        }
        if self.floor_edition >= self.edition_bounds.high {
            return Err(Error::config(
                "floor must lie below the edition search window's upper bound",
                "discovery.floor_edition",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://doweb.rio.rj.gov.br".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("diarios")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("diarios").join("temp_pages")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("historico.json")
}

fn default_max_concurrent() -> usize {
    30
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(45)
}

fn default_min_artifact_bytes() -> u64 {
    1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_edition_bounds() -> SearchBounds {
    SearchBounds::new(7500, 9000)
}

fn default_page_bounds() -> SearchBounds {
    SearchBounds::new(1, 3000)
}

fn default_editions_per_run() -> usize {
    10
}

fn default_floor_edition() -> u32 {
    6000
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second delays)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
