// src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Immutable run configuration, built once by `config::build_config` and
/// borrowed by every stage afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub domain: String,
    pub wordlist: PathBuf,
    pub resolvers: PathBuf,
    pub workspace_root: PathBuf,
    pub all_sources: bool,
    pub include_unresolved: bool,
    pub cleanup: bool,
    pub collectors: Vec<String>,
    pub permutation: PermutationConfig,
    pub output: OutputConfig,
    pub tools: ToolsConfig,
    pub scrapers: ScraperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: String::new(),
            wordlist: PathBuf::new(),
            resolvers: PathBuf::new(),
            workspace_root: PathBuf::from("."),
            all_sources: false,
            include_unresolved: false,
            cleanup: false,
            collectors: vec![
                "subfinder".to_string(),
                "crtsh".to_string(),
                "abuseipdb".to_string(),
            ],
            permutation: PermutationConfig::default(),
            output: OutputConfig::default(),
            tools: ToolsConfig::default(),
            scrapers: ScraperConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermutationConfig {
    pub backend: PermutationBackend,
    /// Narrower, faster search (dnsgen only)
    pub fast: bool,
    /// Broader guesses (alterx only)
    pub enrich: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermutationBackend {
    #[default]
    Alterx,
    Dnsgen,
}

impl FromStr for PermutationBackend {
    type Err = RaptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alterx" => Ok(Self::Alterx),
            "dnsgen" => Ok(Self::Dnsgen),
            other => Err(RaptorError::ConfigError(format!(
                "the permutation tool '{}' is neither alterx nor dnsgen",
                other
            ))),
        }
    }
}

impl fmt::Display for PermutationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alterx => write!(f, "alterx"),
            Self::Dnsgen => write!(f, "dnsgen"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Name of the final artifact inside the domain workspace
    pub file: String,
    pub silent: bool,
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: "final".to_string(),
            silent: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Executable names (or paths) of the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub subfinder: String,
    pub chaos: String,
    pub shuffledns: String,
    pub alterx: String,
    pub dnsgen: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            subfinder: "subfinder".to_string(),
            chaos: "chaos".to_string(),
            shuffledns: "shuffledns".to_string(),
            alterx: "alterx".to_string(),
            dnsgen: "dnsgen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub crtsh_url: String,
    pub abuseipdb_url: String,
    pub abuseipdb_session: Option<String>,
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:110.0) Gecko/20100101 Firefox/110.0"
                .to_string(),
            proxy: None,
            crtsh_url: "https://crt.sh".to_string(),
            abuseipdb_url: "https://www.abuseipdb.com".to_string(),
            abuseipdb_session: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectorKind {
    Generator,
    Enumerator,
    Scraper,
}

pub struct CollectorInfo {
    pub kind: CollectorKind,
    pub needs_key: bool,
}

/// Result of a collector that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectorOutcome {
    Collected { count: usize },
    /// Best-effort source gave up; its artifact exists but is empty.
    Degraded { reason: String },
}

impl CollectorOutcome {
    pub fn count(&self) -> usize {
        match self {
            Self::Collected { count } => *count,
            Self::Degraded { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Init,
    Collecting,
    MergedPhase1,
    ResolvedPhase1,
    FoldedUnresolved,
    Permuted,
    MergedPhase2,
    ResolvedPhase2,
    FinalMerged,
    Reported,
    CleanedUp,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "initializing",
            Self::Collecting => "collecting candidates",
            Self::MergedPhase1 => "merged phase 1 input",
            Self::ResolvedPhase1 => "resolved phase 1",
            Self::FoldedUnresolved => "folded unresolved candidates",
            Self::Permuted => "generated permutations",
            Self::MergedPhase2 => "merged phase 2 input",
            Self::ResolvedPhase2 => "resolved phase 2",
            Self::FinalMerged => "merged final results",
            Self::Reported => "reported",
            Self::CleanedUp => "cleaned up",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorReport {
    pub artifact: String,
    pub outcome: CollectorOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub domain: String,
    pub collectors: BTreeMap<String, CollectorReport>,
    pub phase1_candidates: usize,
    pub phase1_resolved: usize,
    pub phase2_candidates: usize,
    pub phase2_resolved: usize,
    pub final_count: usize,
    pub state: PipelineState,
    pub duration: Duration,
    pub timestamp: String,
}

impl RunSummary {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            collectors: BTreeMap::new(),
            phase1_candidates: 0,
            phase1_resolved: 0,
            phase2_candidates: 0,
            phase2_resolved: 0,
            final_count: 0,
            state: PipelineState::Init,
            duration: Duration::ZERO,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RaptorError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0} is not found in the path")]
    ToolNotFound(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("a file under the name {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("the {} file already exists", .0.display())]
    ArtifactExists(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: String,
        stderr: String,
    },

    #[error("Collector {collector} failed: {message}")]
    CollectorFailed { collector: String, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl RaptorError {
    /// Errors raised before any pipeline work starts.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Setup(_)
                | Self::ConfigError(_)
                | Self::ToolNotFound(_)
                | Self::InvalidDomain(_)
                | Self::OutputExists(_)
        )
    }
}
