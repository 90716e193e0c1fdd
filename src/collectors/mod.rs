// src/collectors/mod.rs
use crate::error::{IoContext, Result};
use crate::merge::render;
use crate::session::Session;
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome, Config, RaptorError, ToolsConfig};
use crate::workspace::{collector_artifact, Workspace};
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeSet;
use tokio::io::AsyncWriteExt;

mod abuseipdb;
mod chaos;
mod crtsh;
mod subfinder;
mod wordlist;

pub use abuseipdb::AbuseIpdbCollector;
pub use chaos::ChaosCollector;
pub use crtsh::CrtShCollector;
pub use subfinder::SubfinderCollector;
pub use wordlist::WordlistCollector;

/// Collectors that can be selected by name; the wordlist expander always runs.
pub const KNOWN_COLLECTORS: [&str; 4] = ["subfinder", "chaos", "crtsh", "abuseipdb"];

/// Everything a collector may read while producing its artifact.
pub struct CollectContext<'a> {
    pub config: &'a Config,
    pub session: &'a Session,
    pub workspace: &'a Workspace,
}

/// A producer of exactly one candidate-set artifact.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;
    fn info(&self) -> CollectorInfo;

    fn artifact(&self) -> String {
        collector_artifact(self.name())
    }

    /// External binary that must be on the path for this collector to run
    fn required_tool<'t>(&self, _tools: &'t ToolsConfig) -> Option<&'t str> {
        None
    }

    /// Writes the artifact. `Err` is a hard failure that aborts the run;
    /// best-effort sources degrade to an empty artifact instead.
    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<CollectorOutcome>;
}

pub fn create_collector(name: &str) -> Option<Box<dyn Collector>> {
    match name.to_lowercase().as_str() {
        "wordlist" => Some(Box::new(WordlistCollector::new())),
        "subfinder" => Some(Box::new(SubfinderCollector::new())),
        "chaos" => Some(Box::new(ChaosCollector::new())),
        "crtsh" => Some(Box::new(CrtShCollector::new())),
        "abuseipdb" => Some(Box::new(AbuseIpdbCollector::new())),
        _ => None,
    }
}

/// Active collectors for a run: the wordlist expander first, then enumerators
/// and scrapers in configured order.
pub fn build_collectors(config: &Config) -> Result<Vec<Box<dyn Collector>>> {
    let mut collectors = vec![create_collector("wordlist")
        .ok_or_else(|| RaptorError::ConfigError("wordlist collector unavailable".to_string()))?];

    for name in &config.collectors {
        let collector = create_collector(name)
            .filter(|c| c.info().kind != CollectorKind::Generator)
            .ok_or_else(|| RaptorError::ConfigError(format!("Unknown collector: {}", name)))?;
        collectors.push(collector);
    }

    // stable: generator, enumerators, scrapers
    collectors.sort_by_key(|c| c.info().kind as u8);
    Ok(collectors)
}

/// Shared tail of the scrapers: the artifact is created up front so a stale
/// one is a hard conflict, then filled with whatever the fetch produced.
pub(crate) async fn write_scraped(
    ctx: &CollectContext<'_>,
    collector: &str,
    artifact: &str,
    fetched: Result<BTreeSet<String>>,
) -> Result<CollectorOutcome> {
    let path = ctx.workspace.path(artifact);
    let mut file = ctx.workspace.create_artifact(artifact).await?;

    match fetched {
        Ok(hosts) => {
            file.write_all(&render(&hosts)).await.with_path(&path)?;
            file.flush().await.with_path(&path)?;
            debug!("{}: {} subdomains were found", collector, hosts.len());
            Ok(CollectorOutcome::Collected { count: hosts.len() })
        }
        Err(e) => {
            debug!("{} failed, continuing without it: {}", collector, e);
            Ok(CollectorOutcome::Degraded { reason: e.to_string() })
        }
    }
}
