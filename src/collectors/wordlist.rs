// src/collectors/wordlist.rs
use crate::collectors::{CollectContext, Collector};
use crate::error::{IoContext, Result};
use crate::types::{CollectorInfo, CollectorKind, CollectorOutcome};
use crate::workspace::GENERATED;
use async_trait::async_trait;
use log::debug;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Expands every label of the wordlist into `<label>.<domain>`
#[derive(Debug, Clone)]
pub struct WordlistCollector {
    name: String,
}

impl Default for WordlistCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl WordlistCollector {
    pub fn new() -> Self {
        Self { name: "wordlist".to_string() }
    }
}

#[async_trait]
impl Collector for WordlistCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&self) -> CollectorInfo {
        CollectorInfo {
            kind: CollectorKind::Generator,
            needs_key: false,
        }
    }

    fn artifact(&self) -> String {
        GENERATED.to_string()
    }

    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<CollectorOutcome> {
        let wordlist_path = &ctx.config.wordlist;
        debug!("generating subdomain list based on the {} wordlist file", wordlist_path.display());

        let wordlist = File::open(wordlist_path).await.with_path(wordlist_path)?;
        let out_path = ctx.workspace.path(GENERATED);
        let mut out = BufWriter::new(ctx.workspace.create_artifact(GENERATED).await?);

        let mut lines = BufReader::new(wordlist).lines();
        let mut count = 0;
        while let Some(line) = lines.next_line().await.with_path(wordlist_path)? {
            let label = line.trim();
            if label.is_empty() {
                continue;
            }
            out.write_all(format!("{}.{}\n", label, ctx.config.domain).as_bytes())
                .await
                .with_path(&out_path)?;
            count += 1;
        }
        out.flush().await.with_path(&out_path)?;

        debug!("Generated: {} subdomains were generated", count);
        Ok(CollectorOutcome::Collected { count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::types::{Config, RaptorError};
    use crate::workspace::Workspace;

    async fn run(wordlist: &str) -> (tempfile::TempDir, Workspace, Result<CollectorOutcome>) {
        let dir = tempfile::tempdir().unwrap();
        let wordlist_path = dir.path().join("words.txt");
        std::fs::write(&wordlist_path, wordlist).unwrap();

        let config = Config {
            domain: "example.com".to_string(),
            wordlist: wordlist_path,
            ..Config::default()
        };
        let workspace = Workspace::new(dir.path(), "example.com");
        workspace.ensure().await.unwrap();
        let session = Session::new(&config.scrapers).unwrap();
        let ctx = CollectContext { config: &config, session: &session, workspace: &workspace };

        let outcome = WordlistCollector::new().collect(&ctx).await;
        (dir, workspace, outcome)
    }

    #[tokio::test]
    async fn test_expands_labels_and_skips_blanks() {
        let (_dir, workspace, outcome) = run("api\ndev\n\n").await;
        assert_eq!(outcome.unwrap(), CollectorOutcome::Collected { count: 2 });
        assert_eq!(
            std::fs::read_to_string(workspace.path(GENERATED)).unwrap(),
            "api.example.com\ndev.example.com\n"
        );
    }

    #[tokio::test]
    async fn test_fails_when_artifact_exists() {
        let dir = tempfile::tempdir().unwrap();
        let wordlist_path = dir.path().join("words.txt");
        std::fs::write(&wordlist_path, "www\n").unwrap();
        let config = Config {
            domain: "example.com".to_string(),
            wordlist: wordlist_path,
            ..Config::default()
        };
        let workspace = Workspace::new(dir.path(), "example.com");
        workspace.ensure().await.unwrap();
        workspace.write_artifact(GENERATED, b"old.example.com\n").await.unwrap();
        let session = Session::new(&config.scrapers).unwrap();
        let ctx = CollectContext { config: &config, session: &session, workspace: &workspace };

        let err = WordlistCollector::new().collect(&ctx).await.unwrap_err();
        assert!(matches!(err, RaptorError::ArtifactExists(_)));
    }

    #[tokio::test]
    async fn test_fails_when_wordlist_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            domain: "example.com".to_string(),
            wordlist: dir.path().join("missing.txt"),
            ..Config::default()
        };
        let workspace = Workspace::new(dir.path(), "example.com");
        workspace.ensure().await.unwrap();
        let session = Session::new(&config.scrapers).unwrap();
        let ctx = CollectContext { config: &config, session: &session, workspace: &workspace };

        assert!(matches!(
            WordlistCollector::new().collect(&ctx).await,
            Err(RaptorError::Io { .. })
        ));
        assert!(!workspace.exists(GENERATED).await);
    }
}
