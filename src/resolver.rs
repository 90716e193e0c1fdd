// src/resolver.rs
use crate::error::Result;
use crate::process::ToolCommand;
use crate::utils::count_lines;
use crate::workspace::Workspace;
use log::debug;
use std::path::Path;

/// Drives the external mass resolver (shuffledns) over a candidate set.
pub struct Resolver<'a> {
    program: &'a str,
    domain: &'a str,
    resolvers: &'a Path,
}

impl<'a> Resolver<'a> {
    pub fn new(program: &'a str, domain: &'a str, resolvers: &'a Path) -> Self {
        Self { program, domain, resolvers }
    }

    pub fn command(&self, input: &Path) -> ToolCommand {
        ToolCommand::new(self.program)
            .arg("-silent")
            .arg("-d")
            .arg(self.domain)
            .arg("-r")
            .arg(self.resolvers.to_string_lossy())
            .arg("-l")
            .arg(input.to_string_lossy())
    }

    /// Resolves the `input` artifact into a new `output` artifact and returns
    /// the number of resolved names. Failures are never retried.
    pub async fn resolve(&self, workspace: &Workspace, input: &str, output: &str) -> Result<usize> {
        debug!("running Shuffledns on {}", input);

        let resolved = self.command(&workspace.path(input)).output().await?;
        workspace.write_artifact(output, &resolved).await?;

        let count = count_lines(&resolved);
        debug!("Shuffledns: {} subdomains were resolved", count);
        Ok(count)
    }
}
