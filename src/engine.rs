use crate::collectors::{build_collectors, CollectContext, Collector};
use crate::config;
use crate::error::Result;
use crate::merge::{merge, same_file};
use crate::output::{log_summary, Reporter};
use crate::permute::permute;
use crate::resolver::Resolver;
use crate::session::Session;
use crate::types::{CollectorOutcome, CollectorReport, Config, OutputConfig, PipelineState, RaptorError, RunSummary};
use crate::workspace::{Workspace, GENERATED, PERMUTATION_IN, PHASE1_IN, PHASE1_OUT, PHASE2_IN, PHASE2_OUT};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::io::Write;
use std::time::{Duration, Instant};

/// Sequences collect → resolve → permute → resolve over one domain workspace.
pub struct PipelineEngine {
    config: Config,
    session: Session,
    collectors: Vec<Box<dyn Collector>>,
    workspace: Workspace,
    reporter: Reporter,
    state: PipelineState,
    progress: ProgressBar,
}

impl PipelineEngine {
    /// Validates the configuration and environment; nothing is written yet.
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        config::validate_setup(&config)?;

        let session = Session::new(&config.scrapers)?;
        let collectors = build_collectors(&config)?;
        let workspace = Workspace::new(&config.workspace_root, &config.domain);
        let reporter = Reporter::new(config.output.clone());
        let progress = stage_progress(&config.output);

        Ok(Self {
            config,
            session,
            collectors,
            workspace,
            reporter,
            state: PipelineState::Init,
            progress,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Runs the whole pipeline, streaming the final artifact to `writer`.
    pub async fn run<W: Write>(&mut self, writer: &mut W) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new(&self.config.domain);

        let result = self.execute(&mut summary, started, writer).await;
        self.progress.finish_and_clear();
        summary.duration = started.elapsed();

        match result {
            Ok(()) => {
                self.transition(PipelineState::Done);
                summary.state = PipelineState::Done;
                log_summary(&summary);
                Ok(summary)
            }
            Err(e) => {
                debug!("pipeline aborted after state '{}'", self.state);
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn execute<W: Write>(&mut self, summary: &mut RunSummary, started: Instant, writer: &mut W) -> Result<()> {
        self.progress
            .suspend(|| info!("DNS Brute-forcing for {}", self.config.domain));

        self.transition(PipelineState::Collecting);
        self.workspace.ensure().await?;
        let artifacts = self.collect(summary).await?;

        summary.phase1_candidates = self.merge_all(&artifacts, PHASE1_IN).await?;
        self.transition(PipelineState::MergedPhase1);

        summary.phase1_resolved = self.resolver().resolve(&self.workspace, PHASE1_IN, PHASE1_OUT).await?;
        self.progress.suspend(|| {
            info!(
                "phase 1: {} of {} candidates resolved",
                summary.phase1_resolved, summary.phase1_candidates
            )
        });
        self.transition(PipelineState::ResolvedPhase1);

        let final_base = if self.config.include_unresolved {
            let mut seeds = vec![PHASE1_OUT.to_string()];
            seeds.extend(artifacts.iter().filter(|a| a.as_str() != GENERATED).cloned());
            let count = self.merge_all(&seeds, PERMUTATION_IN).await?;
            debug!("{} seeds (resolved and unresolved) for permutation", count);
            self.transition(PipelineState::FoldedUnresolved);
            PHASE1_OUT
        } else {
            self.workspace.rename(PHASE1_OUT, PERMUTATION_IN).await?;
            PERMUTATION_IN
        };

        permute(
            &self.workspace,
            PERMUTATION_IN,
            PHASE2_IN,
            &self.config.tools,
            &self.config.permutation,
        )
        .await?;
        self.transition(PipelineState::Permuted);

        // backends may drop seed lines; fold them back in
        summary.phase2_candidates = self.merge_step(PHASE2_IN, PERMUTATION_IN, PHASE2_IN).await?;
        self.transition(PipelineState::MergedPhase2);

        summary.phase2_resolved = self.resolver().resolve(&self.workspace, PHASE2_IN, PHASE2_OUT).await?;
        self.progress.suspend(|| {
            info!(
                "phase 2: {} of {} candidates resolved",
                summary.phase2_resolved, summary.phase2_candidates
            )
        });
        self.transition(PipelineState::ResolvedPhase2);

        let output = self.config.output.file.clone();
        summary.final_count = self.merge_step(final_base, PHASE2_OUT, &output).await?;
        self.transition(PipelineState::FinalMerged);

        summary.duration = started.elapsed();
        summary.state = PipelineState::Reported;
        self.progress.finish_and_clear();
        self.reporter
            .report(&self.workspace.path(&output), summary, writer)
            .await?;
        self.transition(PipelineState::Reported);

        if self.config.cleanup {
            let removed = self.workspace.cleanup(&artifacts, &output).await?;
            debug!("removed {} intermediate files", removed);
            self.transition(PipelineState::CleanedUp);
        }

        Ok(())
    }

    /// Runs every collector concurrently and waits for all of them. Hard
    /// failures are inspected only after the barrier; the first one aborts.
    async fn collect(&self, summary: &mut RunSummary) -> Result<Vec<String>> {
        let ctx = CollectContext {
            config: &self.config,
            session: &self.session,
            workspace: &self.workspace,
        };
        let ctx = &ctx;

        let tasks = self.collectors.iter().map(|collector| async move {
            let start = Instant::now();
            let result = collector.collect(ctx).await;
            match &result {
                Ok(outcome) => debug!(
                    "{}: {} subdomains in {:?}",
                    collector.name(),
                    outcome.count(),
                    start.elapsed()
                ),
                Err(e) => self.progress.suspend(|| warn!("{}: {}", collector.name(), e)),
            }
            (collector, result)
        });
        let outcomes = join_all(tasks).await;

        let mut failure = None;
        let mut artifacts = Vec::with_capacity(outcomes.len());
        for (collector, result) in outcomes {
            match result {
                Ok(outcome) => {
                    if matches!(outcome, CollectorOutcome::Degraded { .. }) && collector.info().needs_key {
                        debug!("{} needs an API key, check that one is configured", collector.name());
                    }
                    artifacts.push(collector.artifact());
                    summary.collectors.insert(
                        collector.name().to_string(),
                        CollectorReport {
                            artifact: collector.artifact(),
                            outcome,
                        },
                    );
                }
                Err(e) if failure.is_none() => {
                    failure = Some(RaptorError::CollectorFailed {
                        collector: collector.name().to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {}
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(artifacts),
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.config.tools.shuffledns, &self.config.domain, &self.config.resolvers)
    }

    /// Folds `sources` pairwise into `destination`.
    async fn merge_all(&self, sources: &[String], destination: &str) -> Result<usize> {
        let (first, rest) = sources
            .split_first()
            .ok_or_else(|| RaptorError::Unknown(anyhow::anyhow!("nothing to merge into {}", destination)))?;
        let second = rest.first().unwrap_or(first);

        let mut count = self.merge_step(first, second, destination).await?;
        for artifact in rest.iter().skip(1) {
            count = self.merge_step(artifact, destination, destination).await?;
        }
        Ok(count)
    }

    /// In-place merges may overwrite; merging into an unrelated existing
    /// artifact is a conflict.
    async fn merge_step(&self, a: &str, b: &str, destination: &str) -> Result<usize> {
        let (a, b, dest) = (
            self.workspace.path(a),
            self.workspace.path(b),
            self.workspace.path(destination),
        );
        if !same_file(&dest, &a) && !same_file(&dest, &b) && dest.exists() {
            return Err(RaptorError::ArtifactExists(dest));
        }
        merge(&a, &b, &dest).await
    }

    fn transition(&mut self, state: PipelineState) {
        debug!("{} -> {}", self.state, state);
        self.state = state;
        self.progress.set_message(state.to_string());
    }
}

fn stage_progress(output: &OutputConfig) -> ProgressBar {
    if output.silent || output.verbose || !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::PermutationBackend;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    const RESOLVE_ALL: &str = r#"while [ $# -gt 0 ]; do
  if [ "$1" = "-l" ]; then cat "$2"; fi
  shift
done"#;

    const RESOLVE_WWW_ONLY: &str = r#"while [ $# -gt 0 ]; do
  if [ "$1" = "-l" ]; then grep '^www' "$2" || true; fi
  shift
done"#;

    fn stub(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    struct Fixture {
        dir: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new(wordlist: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let bin = dir.path().join("bin");
            std::fs::create_dir(&bin).unwrap();
            let wordlist_path = dir.path().join("words.txt");
            let resolvers = dir.path().join("resolvers.txt");
            std::fs::write(&wordlist_path, wordlist).unwrap();
            std::fs::write(&resolvers, "8.8.8.8\n1.1.1.1\n").unwrap();

            let mut config = Config {
                domain: "example.com".to_string(),
                wordlist: wordlist_path,
                resolvers,
                workspace_root: dir.path().join("runs"),
                collectors: vec!["subfinder".to_string()],
                ..Config::default()
            };
            config.output.silent = true;
            config.tools.subfinder = stub(&bin, "subfinder", "echo api.example.com");
            config.tools.shuffledns = stub(&bin, "shuffledns", RESOLVE_ALL);
            config.tools.alterx = stub(&bin, "alterx", "cat");
            config.tools.dnsgen = stub(&bin, "dnsgen", "cat");
            std::fs::create_dir(&config.workspace_root).unwrap();

            Self { dir, config }
        }

        fn bin(&self) -> std::path::PathBuf {
            self.dir.path().join("bin")
        }

        fn artifact(&self, name: &str) -> String {
            std::fs::read_to_string(self.config.workspace_root.join("example.com").join(name)).unwrap()
        }
    }

    #[test]
    fn test_spinner_hidden_when_logs_are_quiet_or_verbose() {
        let silent = OutputConfig { silent: true, ..OutputConfig::default() };
        let verbose = OutputConfig { verbose: true, ..OutputConfig::default() };
        assert!(stage_progress(&silent).is_hidden());
        assert!(stage_progress(&verbose).is_hidden());
    }

    #[tokio::test]
    async fn test_stage_logs_still_reach_the_logger_around_spinner() {
        crate::collectors::captured_log::init();
        let mut fx = Fixture::new("www\n");
        fx.config.domain = "spinner.example.com".to_string();
        fx.config.output.silent = false;
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        engine.run(&mut out).await.unwrap();

        let (loud, _) = crate::collectors::captured_log::mentioning("spinner.example.com");
        assert!(loud.iter().any(|m| m.starts_with("DNS Brute-forcing")), "{:?}", loud);
    }

    #[tokio::test]
    async fn test_end_to_end_with_passthrough_tools() {
        let fx = Fixture::new("www\nmail\n");
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        let summary = engine.run(&mut out).await.unwrap();

        let expected = "api.example.com\nmail.example.com\nwww.example.com\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
        assert_eq!(fx.artifact("final"), expected);
        assert_eq!(engine.state(), PipelineState::Done);
        assert_eq!(summary.state, PipelineState::Done);
        assert_eq!(summary.phase1_candidates, 3);
        assert_eq!(summary.final_count, 3);
        assert_eq!(
            summary.collectors["wordlist"].outcome,
            CollectorOutcome::Collected { count: 2 }
        );
        // phase1 output was moved into the permutation seed
        assert!(!engine.workspace().exists(PHASE1_OUT).await);
    }

    #[tokio::test]
    async fn test_include_unresolved_seeds_permutation() {
        let mut fx = Fixture::new("www\nmail\n");
        fx.config.tools.shuffledns = stub(&fx.bin(), "shuffledns", RESOLVE_WWW_ONLY);
        fx.config.include_unresolved = true;
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        engine.run(&mut out).await.unwrap();

        assert_eq!(fx.artifact(PHASE1_OUT), "www.example.com\n");
        assert_eq!(fx.artifact(PERMUTATION_IN), "api.example.com\nwww.example.com\n");
        assert_eq!(fx.artifact("final"), "www.example.com\n");
    }

    #[tokio::test]
    async fn test_dropped_seeds_are_merged_back() {
        let mut fx = Fixture::new("www\n");
        fx.config.permutation.backend = PermutationBackend::Dnsgen;
        fx.config.tools.dnsgen = stub(&fx.bin(), "dnsgen", "cat >/dev/null; echo dev.example.com");
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        engine.run(&mut out).await.unwrap();

        assert_eq!(
            fx.artifact(PHASE2_IN),
            "api.example.com\ndev.example.com\nwww.example.com\n"
        );
        assert_eq!(
            fx.artifact("final"),
            "api.example.com\ndev.example.com\nwww.example.com\n"
        );
    }

    #[tokio::test]
    async fn test_scraper_failure_is_soft() {
        let mut server = mockito::Server::new_async().await;
        let _crtsh = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let _abuse = server
            .mock("GET", "/whois/example.com")
            .with_status(200)
            .with_body("<ul><li>vpn</li></ul>")
            .create_async()
            .await;

        let mut fx = Fixture::new("www\n");
        fx.config.collectors = vec!["subfinder".to_string(), "crtsh".to_string(), "abuseipdb".to_string()];
        fx.config.scrapers.crtsh_url = server.url();
        fx.config.scrapers.abuseipdb_url = server.url();
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        let summary = engine.run(&mut out).await.unwrap();

        assert_eq!(engine.state(), PipelineState::Done);
        assert!(matches!(
            summary.collectors["crtsh"].outcome,
            CollectorOutcome::Degraded { .. }
        ));
        assert_eq!(fx.artifact("crtsh.subs"), "");
        assert_eq!(
            fx.artifact("final"),
            "api.example.com\nvpn.example.com\nwww.example.com\n"
        );
    }

    #[tokio::test]
    async fn test_enumerator_failure_aborts() {
        let mut fx = Fixture::new("www\n");
        fx.config.tools.subfinder = stub(&fx.bin(), "subfinder", "echo 'no luck' >&2; exit 1");
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        let err = engine.run(&mut out).await.unwrap_err();

        assert!(matches!(err, RaptorError::CollectorFailed { ref collector, .. } if collector == "subfinder"));
        assert_eq!(engine.state(), PipelineState::Failed);
        assert!(!engine.workspace().exists(PHASE1_IN).await);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_failure_aborts() {
        let mut fx = Fixture::new("www\n");
        fx.config.tools.shuffledns = stub(&fx.bin(), "shuffledns", "exit 2");
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            engine.run(&mut out).await,
            Err(RaptorError::ToolFailed { .. })
        ));
        assert_eq!(engine.state(), PipelineState::Failed);
        assert!(!engine.workspace().exists("final").await);
    }

    #[tokio::test]
    async fn test_second_run_without_cleanup_fails_setup() {
        let fx = Fixture::new("www\n");
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();
        engine.run(&mut Vec::new()).await.unwrap();

        match PipelineEngine::new(fx.config.clone()) {
            Err(e) => {
                assert!(e.is_setup());
                assert!(matches!(e, RaptorError::OutputExists(_)));
            }
            Ok(_) => panic!("second run should be rejected"),
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_only_final() {
        let mut fx = Fixture::new("www\n");
        fx.config.cleanup = true;
        fx.config.include_unresolved = true;
        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();
        let summary = engine.run(&mut Vec::new()).await.unwrap();
        assert_eq!(summary.final_count, 2);

        let mut remaining: Vec<String> = std::fs::read_dir(engine.workspace().dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, ["final"]);
    }

    #[tokio::test]
    async fn test_reused_workspace_keeps_unrelated_files() {
        let fx = Fixture::new("www\n");
        let ws_dir = fx.config.workspace_root.join("example.com");
        std::fs::create_dir(&ws_dir).unwrap();
        std::fs::write(ws_dir.join("notes.txt"), "scope: *.example.com\n").unwrap();

        let mut engine = PipelineEngine::new(fx.config.clone()).unwrap();
        engine.run(&mut Vec::new()).await.unwrap();
        assert_eq!(fx.artifact("notes.txt"), "scope: *.example.com\n");
    }
}
