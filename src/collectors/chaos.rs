// src/collectors/chaos.rs
use crate::collectors::{CollectContext, Collector};
use crate::error::{IoContext, Result};
use crate::process::ToolCommand;
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome, ToolsConfig};
use crate::utils::{count_lines, strip_wildcards};
use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;

/// ProjectDiscovery Chaos dataset through the chaos client. Needs `CHAOS_KEY`;
/// without it the collector degrades to an empty artifact.
#[derive(Debug, Clone)]
pub struct ChaosCollector {
    name: String,
}

impl Default for ChaosCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChaosCollector {
    pub fn new() -> Self {
        Self { name: "chaos".to_string() }
    }
}

#[async_trait]
impl Collector for ChaosCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> CollectorInfo {
        CollectorInfo {
            kind: CollectorKind::Enumerator,
            needs_key: true,
        }
    }

    fn required_tool<'t>(&self, tools: &'t ToolsConfig) -> Option<&'t str> {
        Some(tools.chaos.as_str())
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<CollectorOutcome> {
        debug!("gathering subdomains using Chaos on {}", ctx.config.domain);

        let artifact = self.artifact();
        let path = ctx.workspace.path(&artifact);
        let mut file = ctx.workspace.create_artifact(&artifact).await?;

        let output = ToolCommand::new(&ctx.config.tools.chaos)
            .arg("-d")
            .arg(&ctx.config.domain)
            .arg("-silent")
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                debug!("chaos failed to get subdomains (check if CHAOS_KEY env variable exists): {}", e);
                return Ok(CollectorOutcome::Degraded { reason: e.to_string() });
            }
        };

        let cleaned = strip_wildcards(&String::from_utf8_lossy(&output));
        file.write_all(cleaned.as_bytes()).await.with_path(&path)?;
        file.flush().await.with_path(&path)?;

        let count = count_lines(cleaned.as_bytes());
        debug!("Chaos: {} subdomains were found", count);
        Ok(CollectorOutcome::Collected { count })
    }
}
