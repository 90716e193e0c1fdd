// src/permute.rs
use crate::error::{IoContext, Result};
use crate::process::ToolCommand;
use crate::types::{PermutationBackend, PermutationConfig, ToolsConfig};
use crate::utils::count_lines;
use crate::workspace::Workspace;
use log::debug;

/// Argv for the configured backend. Both read the seed set on stdin.
pub fn command(tools: &ToolsConfig, options: &PermutationConfig) -> ToolCommand {
    match options.backend {
        PermutationBackend::Alterx => ToolCommand::new(&tools.alterx)
            .arg("-silent")
            .arg_if(options.enrich, "-enrich"),
        PermutationBackend::Dnsgen => ToolCommand::new(&tools.dnsgen)
            .arg("-")
            .arg_if(options.fast, "-f"),
    }
}

pub fn backend_tool<'t>(tools: &'t ToolsConfig, backend: PermutationBackend) -> &'t str {
    match backend {
        PermutationBackend::Alterx => tools.alterx.as_str(),
        PermutationBackend::Dnsgen => tools.dnsgen.as_str(),
    }
}

/// Generates permutation guesses from the `input` seed artifact into a new
/// `output` artifact. Returns the number of guesses.
pub async fn permute(
    workspace: &Workspace,
    input: &str,
    output: &str,
    tools: &ToolsConfig,
    options: &PermutationConfig,
) -> Result<usize> {
    debug!("running {} on {}", options.backend, input);

    let seed_path = workspace.path(input);
    let seeds = tokio::fs::read(&seed_path).await.with_path(&seed_path)?;

    let guesses = command(tools, options).stdin(seeds).output().await?;
    workspace.write_artifact(output, &guesses).await?;

    let count = count_lines(&guesses);
    debug!("{}: {} permutations were generated", options.backend, count);
    Ok(count)
}
