// src/collectors/crtsh.rs
use crate::collectors::{write_scraped, CollectContext, Collector};
use crate::error::Result;
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome, RaptorError};
use crate::utils::strip_wildcards;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    #[serde(default)]
    common_name: Option<String>,
    #[serde(default)]
    name_value: Option<String>,
}

/// CRT.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShCollector {
    name: String,
}

impl Default for CrtShCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CrtShCollector {
    pub fn new() -> Self {
        Self { name: "crtsh".to_string() }
    }

    pub fn query_url(base: &str, domain: &str) -> String {
        format!(
            "{}/?q={}&output=json",
            base.trim_end_matches('/'),
            urlencoding::encode(domain)
        )
    }

    /// Hostnames from a crt.sh JSON listing. `name_value` may hold several
    /// names separated by newlines.
    pub fn parse(&self, body: &str) -> Result<BTreeSet<String>> {
        let entries: Vec<CrtShEntry> = serde_json::from_str(body).map_err(|e| RaptorError::SourceError {
            source_name: self.name.clone(),
            message: format!("Failed to parse JSON: {}", e),
        })?;

        let mut hosts = BTreeSet::new();
        for entry in entries {
            for field in [entry.common_name, entry.name_value].into_iter().flatten() {
                for line in strip_wildcards(&field).lines() {
                    let host = line.trim();
                    if !host.is_empty() {
                        hosts.insert(host.to_string());
                    }
                }
            }
        }
        Ok(hosts)
    }

    async fn fetch(&self, ctx: &CollectContext<'_>) -> Result<BTreeSet<String>> {
        let url = Self::query_url(&ctx.config.scrapers.crtsh_url, &ctx.config.domain);
        let body = ctx.session.get_text(&url, &[]).await?;
        self.parse(&body)
    }
}

#[async_trait]
impl Collector for CrtShCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> CollectorInfo {
        CollectorInfo {
            kind: CollectorKind::Scraper,
            needs_key: false,
        }
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<CollectorOutcome> {
        debug!("gathering subdomains from Crt.sh");
        let fetched = self.fetch(ctx).await;
        write_scraped(ctx, &self.name, &self.artifact(), fetched).await
    }
}
