// src/collectors/abuseipdb.rs
use crate::collectors::{write_scraped, CollectContext, Collector};
use crate::error::Result;
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome, RaptorError};
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use std::collections::BTreeSet;

const LIST_ITEM_PATTERN: &str = r"<li>(\w[^<]*)</li>";

/// AbuseIPDB WHOIS page; subdomain labels are listed as `<li>` items.
#[derive(Debug, Clone)]
pub struct AbuseIpdbCollector {
    name: String,
}

impl Default for AbuseIpdbCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl AbuseIpdbCollector {
    pub fn new() -> Self {
        Self { name: "abuseipdb".to_string() }
    }

    pub fn query_url(base: &str, domain: &str) -> String {
        format!("{}/whois/{}", base.trim_end_matches('/'), urlencoding::encode(domain))
    }

    /// Full hostnames from the labels listed on the page
    pub fn parse(&self, body: &str, domain: &str) -> Result<BTreeSet<String>> {
        let re = Regex::new(LIST_ITEM_PATTERN).map_err(|e| RaptorError::SourceError {
            source_name: self.name.clone(),
            message: format!("Regex error: {}", e),
        })?;

        Ok(re
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|label| label.as_str().trim())
            .filter(|label| !label.is_empty())
            .map(|label| format!("{}.{}", label, domain))
            .collect())
    }

    async fn fetch(&self, ctx: &CollectContext<'_>) -> Result<BTreeSet<String>> {
        let url = Self::query_url(&ctx.config.scrapers.abuseipdb_url, &ctx.config.domain);
        let headers: Vec<(&str, String)> = ctx
            .config
            .scrapers
            .abuseipdb_session
            .iter()
            .map(|session| ("cookie", format!("abuseipdb_session={}", session)))
            .collect();

        let body = ctx.session.get_text(&url, &headers).await?;
        self.parse(&body, &ctx.config.domain)
    }
}

#[async_trait]
impl Collector for AbuseIpdbCollector {
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
        debug!("gathering subdomains from AbuseIPDB");
        let fetched = self.fetch(ctx).await;
        write_scraped(ctx, &self.name, &self.artifact(), fetched).await
    }
}
