//! Reorganization session
//!
//! Sequences one cycle: scan, ask the suggestion provider, build a proposal,
//! plan, execute, then run plugin hooks. Blocking filesystem work runs on
//! tokio's blocking pool and cycles are serialized through an async mutex
//! around the executor.

mod events;

pub use events::{Phase, ReorgEvent};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc::UnboundedSender, Mutex};

use crate::config::Config;
use crate::error::{ReorgError, Result};
use crate::execution::{ExecutionReport, ProgressCallback, ReorganizationExecutor, UndoStore};
use crate::index::{FileInventory, PathIndex, ScanStats, TreeSnapshot};
use crate::planning::{MovePlan, MovePlanner, PlanningFailure};
use crate::plugins::{PluginKind, PluginRegistry};
use crate::proposal::{ProposalBuilder, ProposedStructure};
use crate::provider::{self, SuggestionProvider};
use events::{percent, EventSink};

/// Output of the analysis phase. `proposed` may be edited before planning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub root: PathBuf,
    pub snapshot: TreeSnapshot,
    pub inventory: FileInventory,
    pub stats: ScanStats,
    pub annotation: String,
    pub proposed: ProposedStructure,
}

/// What a reorganization would do
#[derive(Debug, Clone, Serialize)]
pub struct PlanPreview {
    pub plan: MovePlan,
    pub failures: Vec<PlanningFailure>,
}

/// Result of one plugin hook invocation
#[derive(Debug, Clone, Serialize)]
pub struct PluginOutcome {
    pub plugin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `reorganize` or `undo`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub planning_failures: Vec<PlanningFailure>,
    pub execution: ExecutionReport,
    pub plugins: Vec<PluginOutcome>,
}

impl CycleReport {
    /// Any file skipped by planning, failed to move, or plugin error
    pub fn has_failures(&self) -> bool {
        !self.planning_failures.is_empty()
            || !self.execution.failed.is_empty()
            || self.plugins.iter().any(|p| p.error.is_some())
    }
}

pub struct ReorgSession {
    config: Config,
    /// Built from `config.provider` on first analysis when not injected
    provider: OnceLock<Arc<dyn SuggestionProvider>>,
    plugins: Arc<PluginRegistry>,
    executor: Arc<Mutex<ReorganizationExecutor>>,
    index: PathIndex,
    builder: ProposalBuilder,
    planner: MovePlanner,
    events: EventSink,
    abort: Arc<AtomicBool>,
}

impl ReorgSession {
    pub fn new(
        config: Config,
        provider: Arc<dyn SuggestionProvider>,
        plugins: PluginRegistry,
        executor: ReorganizationExecutor,
    ) -> Self {
        let session = Self::assemble(config, plugins, executor);
        let _ = session.provider.set(provider);
        session
    }

    /// Wire up plugins from the plugin directory and a store-backed executor.
    ///
    /// The suggestion provider is built from `config.provider` the first time
    /// `analyze` needs it, so `undo` and plugin listing work even when the
    /// provider settings are incomplete.
    pub fn from_config(config: Config) -> Self {
        let mut plugins = PluginRegistry::new();
        plugins.load(&config.plugin_dir);

        let executor = ReorganizationExecutor::with_store(UndoStore::new(config.undo_store_path()))
            .with_conflict_policy(config.on_destination_exists);

        Self::assemble(config, plugins, executor)
    }

    fn assemble(config: Config, plugins: PluginRegistry, executor: ReorganizationExecutor) -> Self {
        if config.allowed_extensions.is_empty() {
            tracing::warn!("No allowed extensions configured; every file will be rejected during planning");
        }

        Self {
            config,
            provider: OnceLock::new(),
            plugins: Arc::new(plugins),
            executor: Arc::new(Mutex::new(executor)),
            index: PathIndex::new(),
            builder: ProposalBuilder::new(),
            planner: MovePlanner::new(),
            events: EventSink::default(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send events to `sender`
    pub fn with_events(mut self, sender: UnboundedSender<ReorgEvent>) -> Self {
        self.events = EventSink::new(sender);
        self
    }

    /// Replace the proposal builder (for a custom grouping policy)
    pub fn with_proposal_builder(mut self, builder: ProposalBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Flag that cancels the next `reorganize` before anything moves
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn reset_abort(&self) {
        self.abort.store(false, Ordering::SeqCst);
    }

    pub async fn can_undo(&self) -> bool {
        self.executor.lock().await.can_undo()
    }

    /// Scan `root`, ask the provider for advice and build a proposal
    pub async fn analyze(&self, root: &Path) -> Result<Analysis> {
        self.events.started(Phase::Analyze);
        self.events.progress(Phase::Analyze, 0);

        let index = self.index.clone();
        let scan_root = root.to_path_buf();
        let scan = tokio::task::spawn_blocking(move || index.scan(&scan_root))
            .await
            .map_err(|e| ReorgError::Task(e.to_string()))??;
        self.events.progress(Phase::Analyze, 50);

        let provider = self.provider()?;
        let paths = scan.inventory.to_strings();
        let annotation = provider.suggest(&paths).await?;
        tracing::info!(
            provider = provider.name(),
            files = paths.len(),
            "Received organization suggestion"
        );

        let proposed = self.builder.propose(&scan.snapshot, &annotation);
        self.events.progress(Phase::Analyze, 100);
        self.events.completed(
            Phase::Analyze,
            format!(
                "{} files, {} proposed folders",
                scan.stats.total_files,
                proposed.synthesized_folders().len()
            ),
        );

        Ok(Analysis {
            root: scan.inventory.root().to_path_buf(),
            snapshot: scan.snapshot,
            inventory: scan.inventory,
            stats: scan.stats,
            annotation,
            proposed,
        })
    }

    /// Plan without touching the disk
    pub fn preview(&self, analysis: &Analysis) -> PlanPreview {
        let (plan, failures) = self.planner.plan(
            &analysis.inventory,
            &analysis.proposed,
            &self.config.allowed_extensions,
        );
        PlanPreview { plan, failures }
    }

    /// Plan and execute `analysis`, then run `post_reorganization` hooks.
    ///
    /// Returns `Cancelled` if the abort flag is set when this is called or
    /// once the executor is free; it is not checked while moving.
    pub async fn reorganize(&self, analysis: &Analysis) -> Result<CycleReport> {
        self.ensure_not_aborted()?;

        let PlanPreview { plan, failures } = self.preview(analysis);
        let mut executor = Arc::clone(&self.executor).lock_owned().await;
        self.ensure_not_aborted()?;

        self.events.started(Phase::Execute);
        let events = self.events.clone();
        let execution = tokio::task::spawn_blocking(move || {
            let progress: ProgressCallback = Box::new(move |done, total| {
                events.progress(Phase::Execute, percent(done, total));
            });
            executor.execute_with_progress(&plan, Some(&progress))
        })
        .await
        .map_err(|e| ReorgError::Task(e.to_string()))??;

        self.events.completed(
            Phase::Execute,
            format!(
                "{} moved, {} failed, {} unchanged",
                execution.succeeded.len(),
                execution.failed.len(),
                execution.skipped.len()
            ),
        );

        let plugins = self
            .run_hooks(PluginKind::PostReorganization, Some(analysis.root.as_path()))
            .await?;

        Ok(CycleReport {
            planning_failures: failures,
            execution,
            plugins,
        })
    }

    /// Reverse the last reorganization, then run `post_undo` hooks with
    /// `root` as argument when given.
    pub async fn undo(&self, root: Option<&Path>) -> Result<CycleReport> {
        let mut executor = Arc::clone(&self.executor).lock_owned().await;

        self.events.started(Phase::Undo);
        let events = self.events.clone();
        let execution = tokio::task::spawn_blocking(move || {
            let report = executor.undo();
            events.progress(Phase::Undo, 100);
            report
        })
        .await
        .map_err(|e| ReorgError::Task(e.to_string()))??;

        self.events.completed(
            Phase::Undo,
            format!(
                "{} restored, {} failed",
                execution.succeeded.len(),
                execution.failed.len()
            ),
        );

        let plugins = self.run_hooks(PluginKind::PostUndo, root).await?;

        Ok(CycleReport {
            planning_failures: Vec::new(),
            execution,
            plugins,
        })
    }

    fn provider(&self) -> Result<&Arc<dyn SuggestionProvider>> {
        if let Some(provider) = self.provider.get() {
            return Ok(provider);
        }
        let provider = provider::from_config(&self.config.provider)?;
        Ok(self.provider.get_or_init(|| provider))
    }

    fn ensure_not_aborted(&self) -> Result<()> {
        if self.abort.load(Ordering::SeqCst) {
            tracing::info!("Reorganization cancelled before execution");
            return Err(ReorgError::Cancelled);
        }
        Ok(())
    }

    /// Dispatch every plugin of `kind` in load order. Plugin errors are
    /// collected, not returned.
    async fn run_hooks(&self, kind: PluginKind, root: Option<&Path>) -> Result<Vec<PluginOutcome>> {
        let names: Vec<String> = self.plugins.of_kind(kind).map(|r| r.name.clone()).collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        self.events.started(Phase::Hooks);
        let registry = Arc::clone(&self.plugins);
        let args: Vec<String> = root
            .map(|r| vec![r.to_string_lossy().into_owned()])
            .unwrap_or_default();

        let outcomes = tokio::task::spawn_blocking(move || {
            names
                .into_iter()
                .map(|name| match registry.dispatch(&name, &args) {
                    Ok(output) => PluginOutcome {
                        plugin: name,
                        output,
                        error: None,
                    },
                    Err(e) => {
                        tracing::warn!(plugin = %name, error = %e, "Plugin hook failed");
                        PluginOutcome {
                            plugin: name,
                            output: None,
                            error: Some(e.to_string()),
                        }
                    }
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ReorgError::Task(e.to_string()))?;

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        self.events.completed(
            Phase::Hooks,
            format!("{} {} hooks run, {} failed", outcomes.len(), kind, failed),
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::ConfigError;
    use crate::planning::{AllowedExtensions, MoveOperation};
    use crate::test_support::CapturedLogs;
    use crate::plugins::{PluginError, PluginRecord};
    use crate::proposal::StructureEdit;
    use crate::provider::{ProviderError, StaticProvider};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct FailingProvider;

    #[async_trait]
    impl SuggestionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn suggest(&self, _file_paths: &[String]) -> std::result::Result<String, ProviderError> {
            Err(ProviderError::Unavailable("offline".to_string()))
        }
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.jpg"), "b").unwrap();
        fs::write(dir.path().join("c/d.txt"), "d").unwrap();
        dir
    }

    fn config() -> Config {
        Config {
            allowed_extensions: AllowedExtensions::new([".txt", ".jpg"]),
            ..Config::default()
        }
    }

    fn session_with(plugins: PluginRegistry) -> ReorgSession {
        ReorgSession::new(
            config(),
            Arc::new(StaticProvider::new("group by type")),
            plugins,
            ReorganizationExecutor::new(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_cycle() {
        let dir = fixture();
        let root = dir.path().canonicalize().unwrap();
        let session = session_with(PluginRegistry::new());

        let analysis = session.analyze(dir.path()).await.unwrap();
        assert_eq!(analysis.annotation, "group by type");
        assert_eq!(analysis.root, root);

        let preview = session.preview(&analysis);
        assert!(preview.failures.is_empty());
        assert_eq!(
            preview.plan.operations(),
            &[
                MoveOperation::new(root.join("a.txt"), root.join("TXT Files/a.txt")),
                MoveOperation::new(root.join("b.jpg"), root.join("JPG Files/b.jpg")),
                MoveOperation::new(root.join("c/d.txt"), root.join("c/TXT Files/d.txt")),
            ]
        );

        let report = session.reorganize(&analysis).await.unwrap();
        assert!(!report.has_failures());
        assert_eq!(report.execution.succeeded.len(), 3);

        let after = PathIndex::new().inventory(&root).unwrap();
        assert_eq!(
            after.files(),
            &[
                root.join("JPG Files/b.jpg"),
                root.join("TXT Files/a.txt"),
                root.join("c/TXT Files/d.txt"),
            ]
        );

        session.undo(Some(root.as_path())).await.unwrap();
        let restored = PathIndex::new().inventory(&root).unwrap();
        assert_eq!(restored, analysis.inventory);
        assert!(!session.can_undo().await);
        assert!(matches!(
            session.undo(None).await,
            Err(ReorgError::NothingToUndo)
        ));
    }

    #[tokio::test]
    async fn test_abort_flag_prevents_mutation() {
        let dir = fixture();
        let session = session_with(PluginRegistry::new());
        let analysis = session.analyze(dir.path()).await.unwrap();

        session.abort_handle().store(true, Ordering::SeqCst);
        let result = session.reorganize(&analysis).await;

        assert!(matches!(result, Err(ReorgError::Cancelled)));
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("TXT Files").exists());
        assert!(!session.can_undo().await);

        session.reset_abort();
        assert!(session.reorganize(&analysis).await.is_ok());
    }

    #[tokio::test]
    async fn test_edits_flow_into_reorganize() {
        let dir = fixture();
        let session = session_with(PluginRegistry::new());
        let mut analysis = session.analyze(dir.path()).await.unwrap();
        analysis
            .proposed
            .apply_edit(StructureEdit::RenameFolder {
                from: "JPG Files".to_string(),
                to: "Photos".to_string(),
            })
            .unwrap();

        session.reorganize(&analysis).await.unwrap();
        assert!(dir.path().join("Photos/b.jpg").exists());
    }

    #[tokio::test]
    async fn test_provider_error_aborts_analysis() {
        let dir = fixture();
        let session = ReorgSession::new(
            config(),
            Arc::new(FailingProvider),
            PluginRegistry::new(),
            ReorganizationExecutor::new(),
        );

        let result = session.analyze(dir.path()).await;
        assert!(matches!(
            result,
            Err(ReorgError::Provider(ProviderError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_empty_allowed_set_warns() {
        let logs = CapturedLogs::default();
        logs.capture(|| {
            ReorgSession::new(
                Config::default(),
                Arc::new(StaticProvider::new("")),
                PluginRegistry::new(),
                ReorganizationExecutor::new(),
            )
        });

        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("No allowed extensions configured"));

        let quiet = CapturedLogs::default();
        quiet.capture(|| session_with(PluginRegistry::new()));
        assert!(!quiet.contents().contains("No allowed extensions configured"));
    }

    #[tokio::test]
    async fn test_undo_does_not_need_provider_settings() {
        let dir = fixture();
        let state = TempDir::new().unwrap();
        let config = Config {
            provider: ProviderConfig {
                mode: "bing".to_string(),
                endpoint: None,
                ..ProviderConfig::default()
            },
            plugin_dir: state.path().join("plugins"),
            undo_store: Some(state.path().join("last.json")),
            ..config()
        };

        let session = ReorgSession::from_config(config);
        assert!(session.plugins().is_empty());
        assert!(matches!(
            session.undo(Some(dir.path())).await,
            Err(ReorgError::NothingToUndo)
        ));
        assert!(matches!(
            session.analyze(dir.path()).await,
            Err(ReorgError::Config(ConfigError::MissingSetting { .. }))
        ));
    }

    #[tokio::test]
    async fn test_from_config_builds_provider_on_analyze() {
        let dir = fixture();
        let state = TempDir::new().unwrap();
        let config = Config {
            plugin_dir: state.path().join("plugins"),
            undo_store: Some(state.path().join("last.json")),
            ..config()
        };

        let session = ReorgSession::from_config(config);
        let analysis = session.analyze(dir.path()).await.unwrap();
        assert_eq!(analysis.annotation, "group by type");

        session.reorganize(&analysis).await.unwrap();
        assert!(state.path().join("last.json").exists());
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let session = session_with(PluginRegistry::new());
        let result = session.analyze(&dir.path().join("nope")).await;
        assert!(matches!(result, Err(ReorgError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_hooks_receive_root_and_errors_are_collected() {
        let dir = fixture();
        let seen = Arc::new(StdMutex::new(Vec::<String>::new()));
        let seen_by_plugin = Arc::clone(&seen);

        let mut plugins = PluginRegistry::new();
        plugins.register(
            PluginRecord::new("record", PluginKind::PostReorganization).with_execute(
                move |args: &[String]| -> std::result::Result<Option<String>, PluginError> {
                    seen_by_plugin.lock().unwrap().extend(args.iter().cloned());
                    Ok(Some("recorded".to_string()))
                },
            ),
        );
        plugins.register(
            PluginRecord::new("explode", PluginKind::PostReorganization).with_execute(
                |_: &[String]| -> std::result::Result<Option<String>, PluginError> {
                    Err(PluginError::ExecutionFailed {
                        name: "explode".to_string(),
                        reason: "boom".to_string(),
                    })
                },
            ),
        );
        plugins.register(PluginRecord::new("undo-only", PluginKind::PostUndo));

        let session = session_with(plugins);
        let analysis = session.analyze(dir.path()).await.unwrap();
        let report = session.reorganize(&analysis).await.unwrap();

        assert_eq!(report.plugins.len(), 2);
        assert_eq!(report.plugins[0].plugin, "record");
        assert_eq!(report.plugins[0].output.as_deref(), Some("recorded"));
        assert!(report.plugins[1].error.as_deref().unwrap().contains("boom"));
        assert!(report.has_failures());
        assert_eq!(report.execution.succeeded.len(), 3);

        let root = analysis.root.to_string_lossy().into_owned();
        assert_eq!(*seen.lock().unwrap(), vec![root]);
    }

    #[tokio::test]
    async fn test_events_sequence() {
        let dir = fixture();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = session_with(PluginRegistry::new()).with_events(tx);

        let analysis = session.analyze(dir.path()).await.unwrap();
        session.reorganize(&analysis).await.unwrap();
        drop(session);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events[0], ReorgEvent::PhaseStarted(Phase::Analyze));
        assert!(events.contains(&ReorgEvent::ProgressUpdated {
            phase: Phase::Analyze,
            percent: 50
        }));
        assert!(events.contains(&ReorgEvent::PhaseStarted(Phase::Execute)));
        assert!(events.contains(&ReorgEvent::ProgressUpdated {
            phase: Phase::Execute,
            percent: 100
        }));
        assert!(matches!(
            events.last(),
            Some(ReorgEvent::PhaseCompleted {
                phase: Phase::Execute,
                ..
            })
        ));
    }
}
