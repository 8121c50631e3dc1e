// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Asynchronous, per-project loading of the file index.
//!
//! Selecting a project starts a fetch on tokio's blocking pool and moves the
//! loader to [`IndexState::Loading`]. Each fetch carries a request number;
//! only the result of the most recent request is applied, so a listing that
//! arrives after a project switch or a reload is dropped instead of
//! overwriting the newer state.
//! Fetch failures become [`IndexState::Unavailable`] and never propagate.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::source::ProjectSource;
use super::{FileFilter, FileIndex};
use crate::types::ProjectFile;

/// What the loader currently knows about the selected project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// No project selected
    Unset,
    /// Fetch in flight
    Loading { project: String },
    /// Listing available
    Ready { project: String, index: Arc<FileIndex> },
    /// Fetch failed; shown as empty
    Unavailable { project: String, reason: String },
}

impl IndexState {
    pub fn project(&self) -> Option<&str> {
        match self {
            IndexState::Unset => None,
            IndexState::Loading { project }
            | IndexState::Ready { project, .. }
            | IndexState::Unavailable { project, .. } => Some(project),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, IndexState::Loading { .. })
    }

    /// Files of the selected project, empty unless loaded.
    pub fn files(&self) -> &[ProjectFile] {
        match self {
            IndexState::Ready { index, .. } => index.files(),
            _ => &[],
        }
    }

    pub fn index(&self) -> Option<Arc<FileIndex>> {
        match self {
            IndexState::Ready { index, .. } => Some(Arc::clone(index)),
            _ => None,
        }
    }
}

/// How a completed fetch was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Listing stored as the current index
    Applied { project: String, files: usize },
    /// Fetch failed for the current project
    Failed { project: String },
    /// Result was for a project that is no longer selected
    Discarded { project: String },
}

/// Result of one fetch, tagged with the request that started it.
#[derive(Debug)]
pub struct FetchResult {
    pub request: u64,
    pub project: String,
    pub result: anyhow::Result<Vec<String>>,
}

/// Loads and caches the file index of the selected project.
pub struct FileIndexLoader {
    source: Arc<dyn ProjectSource>,
    filter: FileFilter,
    state: IndexState,
    /// Number of the latest fetch; older results are stale
    latest_request: u64,
    tx: mpsc::UnboundedSender<FetchResult>,
    rx: mpsc::UnboundedReceiver<FetchResult>,
}

impl FileIndexLoader {
    pub fn new(source: Arc<dyn ProjectSource>, filter: FileFilter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            filter,
            state: IndexState::Unset,
            latest_request: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &IndexState {
        &self.state
    }

    pub fn current_project(&self) -> Option<&str> {
        self.state.project()
    }

    /// Switch the selected project and start fetching its listing.
    ///
    /// Re-selecting the current project keeps the cached listing. Must be
    /// called from within a tokio runtime when `project` is `Some`.
    pub fn select_project(&mut self, project: Option<String>) {
        let Some(project) = project else {
            self.latest_request += 1;
            self.state = IndexState::Unset;
            return;
        };

        let cached = matches!(
            &self.state,
            IndexState::Ready { project: p, .. } | IndexState::Loading { project: p } if *p == project
        );
        if cached {
            return;
        }

        tracing::info!("Loading files for project {}", project);
        self.state = IndexState::Loading {
            project: project.clone(),
        };
        self.spawn_fetch(project);
    }

    /// Drop the cached listing and fetch it again.
    pub fn refresh(&mut self) {
        if let Some(project) = self.current_project().map(str::to_string) {
            self.state = IndexState::Loading {
                project: project.clone(),
            };
            self.spawn_fetch(project);
        }
    }

    fn spawn_fetch(&mut self, project: String) {
        self.latest_request += 1;
        let request = self.latest_request;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let id = project.clone();
            let result = match tokio::task::spawn_blocking(move || source.list_files(&id)).await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("File listing task failed: {}", e)),
            };
            // Receiver gone means the loader was dropped; nothing to update
            let _ = tx.send(FetchResult {
                request,
                project,
                result,
            });
        });
    }

    /// Apply a finished fetch to the loader state.
    pub fn apply(&mut self, fetched: FetchResult) -> LoadOutcome {
        let stale = fetched.request != self.latest_request
            || self.current_project() != Some(fetched.project.as_str());
        if stale {
            tracing::debug!(
                "Discarding stale file listing #{} for {} (latest: #{}, current: {:?})",
                fetched.request,
                fetched.project,
                self.latest_request,
                self.current_project()
            );
            return LoadOutcome::Discarded {
                project: fetched.project,
            };
        }

        match fetched.result {
            Ok(paths) => {
                let index = FileIndex::from_paths(&paths, &self.filter);
                let files = index.len();
                tracing::info!(
                    "Indexed {} of {} files for project {}",
                    files,
                    paths.len(),
                    fetched.project
                );
                self.state = IndexState::Ready {
                    project: fetched.project.clone(),
                    index: Arc::new(index),
                };
                LoadOutcome::Applied {
                    project: fetched.project,
                    files,
                }
            }
            Err(e) => {
                tracing::warn!("File listing for {} unavailable: {:#}", fetched.project, e);
                self.state = IndexState::Unavailable {
                    project: fetched.project.clone(),
                    reason: format!("{:#}", e),
                };
                LoadOutcome::Failed {
                    project: fetched.project,
                }
            }
        }
    }

    /// Wait for the next fetch to finish and apply it.
    pub async fn next_outcome(&mut self) -> Option<LoadOutcome> {
        let fetched = self.rx.recv().await?;
        Some(self.apply(fetched))
    }

    /// Apply every fetch that has already finished, without waiting.
    pub fn poll_outcomes(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(fetched) = self.rx.try_recv() {
            outcomes.push(self.apply(fetched));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticSource;

    impl ProjectSource for StaticSource {
        fn list_files(&self, project_id: &str) -> anyhow::Result<Vec<String>> {
            match project_id {
                "web" => Ok(vec!["src/App.tsx".into(), "logo.png".into(), "AI_RULES.md".into()]),
                "api" => Ok(vec!["src/main.rs".into()]),
                _ => Err(anyhow!("no such project")),
            }
        }
    }

    fn loader() -> FileIndexLoader {
        FileIndexLoader::new(Arc::new(StaticSource), FileFilter::default())
    }

    #[test]
    fn test_initial_state_is_unset_and_empty() {
        let loader = loader();
        assert_eq!(loader.state(), &IndexState::Unset);
        assert!(loader.state().files().is_empty());
    }

    #[test]
    fn test_apply_for_current_project() {
        let mut loader = loader();
        loader.state = IndexState::Loading { project: "web".into() };

        let outcome = loader.apply(FetchResult {
            request: 0,
            project: "web".into(),
            result: Ok(vec!["src/App.tsx".into(), "logo.png".into()]),
        });

        assert_eq!(outcome, LoadOutcome::Applied { project: "web".into(), files: 1 });
        assert_eq!(loader.state().files().len(), 1);
    }

    #[test]
    fn test_stale_result_discarded() {
        let mut loader = loader();
        loader.state = IndexState::Loading { project: "api".into() };

        let outcome = loader.apply(FetchResult {
            request: 0,
            project: "web".into(),
            result: Ok(vec!["src/App.tsx".into()]),
        });

        assert_eq!(outcome, LoadOutcome::Discarded { project: "web".into() });
        assert!(loader.state().is_loading());
    }

    #[test]
    fn test_failure_becomes_unavailable() {
        let mut loader = loader();
        loader.state = IndexState::Loading { project: "web".into() };

        let outcome = loader.apply(FetchResult {
            request: 0,
            project: "web".into(),
            result: Err(anyhow!("backend down")),
        });

        assert_eq!(outcome, LoadOutcome::Failed { project: "web".into() });
        assert!(matches!(loader.state(), IndexState::Unavailable { reason, .. } if reason.contains("backend down")));
        assert!(loader.state().files().is_empty());
    }

    #[test]
    fn test_unselect_clears_state() {
        let mut loader = loader();
        loader.select_project(None);
        assert_eq!(loader.state(), &IndexState::Unset);
    }

    #[tokio::test]
    async fn test_select_and_load() {
        let mut loader = loader();
        loader.select_project(Some("web".into()));
        assert!(loader.state().is_loading());

        let outcome = loader.next_outcome().await;
        assert_eq!(outcome, Some(LoadOutcome::Applied { project: "web".into(), files: 2 }));
        assert_eq!(loader.state().project(), Some("web"));
    }

    #[tokio::test]
    async fn test_switch_before_completion_discards_first() {
        let mut loader = loader();
        loader.select_project(Some("web".into()));
        loader.select_project(Some("api".into()));

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            outcomes.push(loader.next_outcome().await.unwrap());
        }

        assert!(outcomes.contains(&LoadOutcome::Discarded { project: "web".into() }));
        assert!(outcomes.contains(&LoadOutcome::Applied { project: "api".into(), files: 1 }));
        assert_eq!(loader.state().project(), Some("api"));
        assert_eq!(loader.state().files()[0].relative_path, "src/main.rs");
    }

    /// First listing of a project is slow and short; later ones are fast.
    struct SlowFirstSource {
        calls: Arc<AtomicUsize>,
    }

    impl ProjectSource for SlowFirstSource {
        fn list_files(&self, _project_id: &str) -> anyhow::Result<Vec<String>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(200));
                Ok(vec!["old.ts".into()])
            } else {
                Ok(vec!["old.ts".into(), "new.ts".into()])
            }
        }
    }

    fn slow_first_loader() -> (FileIndexLoader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = SlowFirstSource {
            calls: Arc::clone(&calls),
        };
        (FileIndexLoader::new(Arc::new(source), FileFilter::default()), calls)
    }

    async fn wait_for_calls(calls: &AtomicUsize, n: usize) {
        while calls.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refresh_ignores_late_earlier_listing() {
        let (mut loader, calls) = slow_first_loader();
        loader.select_project(Some("web".into()));
        wait_for_calls(&calls, 1).await;
        loader.refresh();

        let first = loader.next_outcome().await;
        assert_eq!(first, Some(LoadOutcome::Applied { project: "web".into(), files: 2 }));

        let second = loader.next_outcome().await;
        assert_eq!(second, Some(LoadOutcome::Discarded { project: "web".into() }));
        assert_eq!(loader.state().files().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_switch_back_ignores_first_listing() {
        let (mut loader, calls) = slow_first_loader();
        loader.select_project(Some("web".into()));
        wait_for_calls(&calls, 1).await;
        loader.select_project(Some("api".into()));
        wait_for_calls(&calls, 2).await;
        loader.select_project(Some("web".into()));

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(loader.next_outcome().await.unwrap());
        }

        assert_eq!(
            outcomes.iter().filter(|o| matches!(o, LoadOutcome::Applied { .. })).count(),
            1
        );
        assert_eq!(loader.state().project(), Some("web"));
        assert_eq!(loader.state().files().len(), 2);
    }

    #[test]
    fn test_result_from_older_request_discarded() {
        let mut loader = loader();
        loader.state = IndexState::Loading { project: "web".into() };
        loader.latest_request = 2;

        let outcome = loader.apply(FetchResult {
            request: 1,
            project: "web".into(),
            result: Ok(vec!["src/App.tsx".into()]),
        });

        assert_eq!(outcome, LoadOutcome::Discarded { project: "web".into() });
        assert!(loader.state().is_loading());
    }

    #[tokio::test]
    async fn test_reselect_keeps_cache() {
        let mut loader = loader();
        loader.select_project(Some("web".into()));
        loader.next_outcome().await;

        loader.select_project(Some("web".into()));
        assert!(matches!(loader.state(), IndexState::Ready { .. }));
        assert!(loader.poll_outcomes().is_empty());
    }
}
