// src/collectors/subfinder.rs
use crate::collectors::{CollectContext, Collector};
use crate::error::{IoContext, Result};
use crate::process::ToolCommand;
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome, ToolsConfig};
use crate::utils::count_lines;
use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;

/// Passive enumeration through the subfinder binary
#[derive(Debug, Clone)]
pub struct SubfinderCollector {
    name: String,
}

impl Default for SubfinderCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SubfinderCollector {
    pub fn new() -> Self {
        Self { name: "subfinder".to_string() }
    }

    pub fn command(program: &str, domain: &str, all_sources: bool) -> ToolCommand {
        ToolCommand::new(program)
            .arg("-d")
            .arg(domain)
            .arg_if(all_sources, "-all")
            .arg("-silent")
    }
}

#[async_trait]
impl Collector for SubfinderCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> CollectorInfo {
        CollectorInfo {
            kind: CollectorKind::Enumerator,
            needs_key: false,
        }
    }

    fn required_tool<'t>(&self, tools: &'t ToolsConfig) -> Option<&'t str> {
        Some(tools.subfinder.as_str())
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<CollectorOutcome> {
        debug!("gathering subdomains using Subfinder on {}", ctx.config.domain);

        let artifact = self.artifact();
        let path = ctx.workspace.path(&artifact);
        let mut file = ctx.workspace.create_artifact(&artifact).await?;

        // Missing API keys only shrink the output; subfinder still exits 0.
        let output = Self::command(&ctx.config.tools.subfinder, &ctx.config.domain, ctx.config.all_sources)
            .output()
            .await?;
        file.write_all(&output).await.with_path(&path)?;
        file.flush().await.with_path(&path)?;

        let count = count_lines(&output);
        debug!("Subfinder: {} subdomains were found", count);
        Ok(CollectorOutcome::Collected { count })
    }
}
