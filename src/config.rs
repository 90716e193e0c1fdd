use crate::cli::Args;
use crate::collectors::{build_collectors, KNOWN_COLLECTORS};
use crate::permute::backend_tool;
use crate::types::{Config, OutputFormat, PermutationBackend, RaptorError, ScraperConfig, ToolsConfig};
use crate::utils::{find_executable, is_valid_domain};
use crate::workspace::{Workspace, GENERATED, PERMUTATION_IN, PHASE1_IN, PHASE1_OUT, PHASE2_IN, PHASE2_OUT};
use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Layout of the optional TOML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    workspace_root: Option<PathBuf>,
    collectors: Option<Vec<String>>,
    permutation_tool: Option<String>,
    tools: ToolsConfig,
    scrapers: ScraperConfig,
}

/// Defaults, then the config file, then the environment, then the command line.
pub fn build_config(args: &Args) -> Result<Config, RaptorError> {
    let mut config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());
    apply_args(&mut config, args)?;
    validate_config(&config)?;

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, RaptorError> {
    let mut config = Config::default();

    if !path.exists() {
        warn!("config file {} not found, using defaults", path.display());
        return Ok(config);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RaptorError::ConfigError(format!("Failed to read config file: {}", e)))?;
    let file: FileConfig = toml::from_str(&contents)
        .map_err(|e| RaptorError::ConfigError(format!("Failed to parse config file: {}", e)))?;

    if let Some(root) = file.workspace_root {
        config.workspace_root = root;
    }
    if let Some(collectors) = file.collectors {
        config.collectors = collectors;
    }
    if let Some(tool) = file.permutation_tool {
        config.permutation.backend = tool.parse()?;
    }
    config.tools = file.tools;
    config.scrapers = file.scrapers;

    Ok(config)
}

pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(session) = lookup("ABUSEIPDB_SESSION").filter(|s| !s.trim().is_empty()) {
        config.scrapers.abuseipdb_session = Some(session.trim().to_string());
    }

    let tools = &mut config.tools;
    for (key, slot) in [
        ("SUBRAPTOR_SUBFINDER", &mut tools.subfinder),
        ("SUBRAPTOR_CHAOS", &mut tools.chaos),
        ("SUBRAPTOR_SHUFFLEDNS", &mut tools.shuffledns),
        ("SUBRAPTOR_ALTERX", &mut tools.alterx),
        ("SUBRAPTOR_DNSGEN", &mut tools.dnsgen),
    ] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            *slot = value;
        }
    }
}

fn apply_args(config: &mut Config, args: &Args) -> Result<(), RaptorError> {
    if let Some(domain) = &args.domain {
        config.domain = domain.trim().to_lowercase();
    }
    if let Some(wordlist) = &args.wordlist {
        config.wordlist = wordlist.clone();
    }
    if let Some(resolver) = &args.resolver {
        config.resolvers = resolver.clone();
    }
    if let Some(tool) = &args.permutation_tool {
        config.permutation.backend = tool.parse::<PermutationBackend>()?;
    }
    if let Some(sources) = &args.sources {
        config.collectors = sources
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(session) = &args.abuseipdb_session {
        config.scrapers.abuseipdb_session = Some(session.clone());
    }
    if let Some(timeout) = args.timeout {
        config.scrapers.timeout_secs = timeout;
    }
    if let Some(output) = &args.output {
        config.output.file = output.clone();
    }

    config.permutation.fast |= args.fast;
    config.permutation.enrich |= args.enrich;
    config.all_sources |= args.all;
    config.include_unresolved |= args.include_unresolved;
    config.cleanup |= args.cleanup;
    config.output.silent = args.silent;
    config.output.verbose = args.verbose;
    if args.json {
        config.output.format = OutputFormat::Json;
    }
    Ok(())
}

/// Shape checks that need no filesystem access
pub fn validate_config(config: &Config) -> Result<(), RaptorError> {
    if config.output.verbose && config.output.silent {
        return Err(RaptorError::ConfigError("can't use both silent and verbose mode".to_string()));
    }
    if config.scrapers.timeout_secs == 0 {
        return Err(RaptorError::ConfigError("timeout must be greater than 0".to_string()));
    }

    for (name, endpoint) in [
        ("crtsh_url", &config.scrapers.crtsh_url),
        ("abuseipdb_url", &config.scrapers.abuseipdb_url),
    ] {
        let url = Url::parse(endpoint)
            .map_err(|e| RaptorError::ConfigError(format!("invalid {} '{}': {}", name, endpoint, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RaptorError::ConfigError(format!("{} must be an http(s) URL", name)));
        }
    }

    let mut seen = HashSet::new();
    for name in &config.collectors {
        if !KNOWN_COLLECTORS.contains(&name.as_str()) {
            return Err(RaptorError::ConfigError(format!(
                "Unknown collector: {} (available: {})",
                name,
                KNOWN_COLLECTORS.join(", ")
            )));
        }
        if !seen.insert(name) {
            return Err(RaptorError::ConfigError(format!("collector {} listed twice", name)));
        }
    }

    let output = &config.output.file;
    if output.is_empty() || Path::new(output).file_name().map(|n| n != output.as_str()).unwrap_or(true) {
        return Err(RaptorError::ConfigError(format!(
            "output '{}' must be a plain file name",
            output
        )));
    }
    let reserved = [GENERATED, PHASE1_IN, PHASE1_OUT, PERMUTATION_IN, PHASE2_IN, PHASE2_OUT];
    if reserved.contains(&output.as_str()) || output.ends_with(".subs") {
        return Err(RaptorError::ConfigError(format!(
            "output '{}' clashes with an intermediate artifact",
            output
        )));
    }

    Ok(())
}

/// Everything that must hold before any pipeline work starts.
pub fn validate_setup(config: &Config) -> Result<(), RaptorError> {
    if config.domain.is_empty() {
        return Err(RaptorError::Setup("domain name was not provided".to_string()));
    }
    if !is_valid_domain(&config.domain) {
        return Err(RaptorError::InvalidDomain(config.domain.clone()));
    }

    if config.wordlist.as_os_str().is_empty() {
        return Err(RaptorError::Setup("no wordlist was provided".to_string()));
    }
    if !config.wordlist.is_file() {
        return Err(RaptorError::Setup("wordlist file does not exist".to_string()));
    }

    if config.resolvers.as_os_str().is_empty() {
        return Err(RaptorError::Setup("no resolver file was provided".to_string()));
    }
    let resolvers = fs::metadata(&config.resolvers)
        .map_err(|_| RaptorError::Setup("resolver file does not exist".to_string()))?;
    if resolvers.len() <= 1 {
        return Err(RaptorError::Setup("resolver file is empty".to_string()));
    }

    let mut tools: Vec<&str> = Vec::new();
    let collectors = build_collectors(config)?;
    for collector in &collectors {
        if let Some(tool) = collector.required_tool(&config.tools) {
            tools.push(tool);
        }
    }
    tools.push(&config.tools.shuffledns);
    tools.push(backend_tool(&config.tools, config.permutation.backend));
    for tool in tools {
        if find_executable(tool).is_none() {
            return Err(RaptorError::ToolNotFound(tool.to_string()));
        }
    }

    let output = Workspace::new(&config.workspace_root, &config.domain).path(&config.output.file);
    if output.exists() {
        return Err(RaptorError::OutputExists(output));
    }

    Ok(())
}
