// src/workspace.rs
use crate::error::{IoContext, Result};
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const GENERATED: &str = "generated.subs";
pub const PHASE1_IN: &str = "shuffledns_phase1.in";
pub const PHASE1_OUT: &str = "shuffledns_phase1.out";
pub const PERMUTATION_IN: &str = "permutation.in";
pub const PHASE2_IN: &str = "shuffledns_phase2.in";
pub const PHASE2_OUT: &str = "shuffledns_phase2.out";

const PIPELINE_ARTIFACTS: [&str; 5] = [PHASE1_IN, PHASE1_OUT, PERMUTATION_IN, PHASE2_IN, PHASE2_OUT];

/// Artifact file name for a collector
pub fn collector_artifact(collector: &str) -> String {
    format!("{}.subs", collector)
}

/// Per-domain directory holding every artifact of a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(root: &Path, domain: &str) -> Self {
        Self { dir: root.join(domain) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: &str) -> PathBuf {
        self.dir.join(artifact)
    }

    /// Creates the directory if absent. Returns whether it was created.
    pub async fn ensure(&self) -> Result<bool> {
        if fs::metadata(&self.dir).await.is_ok() {
            debug!("skipping {} directory creation since it already exists", self.dir.display());
            return Ok(false);
        }
        debug!("creating {} directory", self.dir.display());
        fs::create_dir_all(&self.dir).await.with_path(&self.dir)?;
        Ok(true)
    }

    /// Opens a fresh artifact for writing; fails if it already exists.
    pub async fn create_artifact(&self, artifact: &str) -> Result<File> {
        let path = self.path(artifact);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_path(&path)
    }

    /// Writes a complete artifact in one go; fails if it already exists.
    pub async fn write_artifact(&self, artifact: &str, contents: &[u8]) -> Result<()> {
        let path = self.path(artifact);
        let mut file = self.create_artifact(artifact).await?;
        file.write_all(contents).await.with_path(&path)?;
        file.flush().await.with_path(&path)
    }

    pub async fn exists(&self, artifact: &str) -> bool {
        fs::metadata(self.path(artifact)).await.is_ok()
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let dest = self.path(to);
        if self.exists(to).await {
            return Err(crate::types::RaptorError::ArtifactExists(dest));
        }
        debug!("renaming {} to {}", from, to);
        fs::rename(self.path(from), &dest).await.with_path(&dest)
    }

    /// Deletes the intermediate artifacts of a run, keeping `keep`. Files that
    /// were never produced (or were renamed away) are skipped.
    pub async fn cleanup(&self, collector_artifacts: &[String], keep: &str) -> Result<usize> {
        debug!("cleaning up unnecessary files");
        let mut removed = 0;
        let names = collector_artifacts
            .iter()
            .map(String::as_str)
            .chain(PIPELINE_ARTIFACTS.iter().copied())
            .filter(|name| *name != keep);

        for name in names {
            let path = self.path(name);
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_path(&path),
            }
        }
        Ok(removed)
    }
}
