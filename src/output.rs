// src/output.rs
use crate::error::{IoContext, Result};
use crate::types::{OutputConfig, OutputFormat, RaptorError, RunSummary};
use log::{debug, info};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Serialize)]
struct JsonReport<'a> {
    subdomains: &'a [String],
    summary: &'a RunSummary,
}

/// Streams the final artifact to the caller.
pub struct Reporter {
    config: OutputConfig,
}

impl Reporter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Writes the final artifact to `writer` and returns the number of
    /// subdomains it holds.
    pub async fn report<W: Write>(&self, path: &Path, summary: &RunSummary, writer: &mut W) -> Result<usize> {
        debug!("printing final results");

        match self.config.format {
            OutputFormat::Text => self.write_text(path, writer).await,
            OutputFormat::Json => self.write_json(path, summary, writer).await,
        }
    }

    async fn write_text<W: Write>(&self, path: &Path, writer: &mut W) -> Result<usize> {
        let file = File::open(path).await.with_path(path)?;
        let mut lines = BufReader::new(file).lines();
        let mut count = 0;

        while let Some(line) = lines.next_line().await.with_path(path)? {
            writeln!(writer, "{}", line).with_path(path)?;
            count += 1;
        }
        writer.flush().with_path(path)?;

        info!("{} subdomains were resolved", count);
        Ok(count)
    }

    async fn write_json<W: Write>(&self, path: &Path, summary: &RunSummary, writer: &mut W) -> Result<usize> {
        let contents = tokio::fs::read_to_string(path).await.with_path(path)?;
        let subdomains: Vec<String> = contents.lines().map(str::to_string).collect();

        let json = serde_json::to_string_pretty(&JsonReport {
            subdomains: &subdomains,
            summary,
        })
        .map_err(|e| RaptorError::Unknown(anyhow::anyhow!("Failed to serialize JSON: {}", e)))?;

        writeln!(writer, "{}", json).with_path(path)?;
        writer.flush().with_path(path)?;

        info!("{} subdomains were resolved", subdomains.len());
        Ok(subdomains.len())
    }
}

/// Human-readable run summary, logged after the results.
pub fn log_summary(summary: &RunSummary) {
    for (name, report) in &summary.collectors {
        debug!("{} ({}): {:?}", name, report.artifact, report.outcome);
    }
    info!(
        "{}: phase 1 resolved {}/{}, phase 2 resolved {}/{}, {} in total ({:.2}s)",
        summary.domain,
        summary.phase1_resolved,
        summary.phase1_candidates,
        summary.phase2_resolved,
        summary.phase2_candidates,
        summary.final_count,
        summary.duration.as_secs_f64()
    );
}
