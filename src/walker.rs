use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::classifier::MigrationDetector;
use crate::corpus::CorpusStore;
use crate::error::{PersistenceError, VcsError};
use crate::models::MigrationEvent;
use crate::vcs::CommitHistory;

/// Outcome of walking one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Commits in the first-parent history.
    pub commits: usize,
    /// Commits sent to the classifier.
    pub classified: usize,
    /// Migration events persisted.
    pub recorded: usize,
    /// Commits skipped because reading or persisting them failed.
    pub failed: usize,
}

/// Walks a repository's history, classifies each commit and records the
/// positives in the corpus.
pub struct HistoryWalker<'a> {
    detector: &'a MigrationDetector,
    store: &'a CorpusStore,
    show_progress: bool,
}

#[derive(Debug, thiserror::Error)]
enum CommitError {
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl<'a> HistoryWalker<'a> {
    pub fn new(detector: &'a MigrationDetector, store: &'a CorpusStore) -> Self {
        Self {
            detector,
            store,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Walk `history` of `repository`.
    ///
    /// Only failing to list the history fails the walk. Anything that goes
    /// wrong with a single commit is logged and that commit is skipped.
    pub async fn walk<H: CommitHistory>(
        &self,
        repository: &str,
        history: &H,
    ) -> Result<WalkSummary, VcsError> {
        let span = info_span!("walk", repo = %repository, ecosystem = %self.store.ecosystem());
        self.walk_inner(repository, history).instrument(span).await
    }

    async fn walk_inner<H: CommitHistory>(
        &self,
        repository: &str,
        history: &H,
    ) -> Result<WalkSummary, VcsError> {
        let manifest = self.store.ecosystem().manifest_file();
        let commits = history.linear_history()?;
        let mut summary = WalkSummary {
            commits: commits.len(),
            ..WalkSummary::default()
        };

        let Some(head) = commits.last() else {
            info!("repository has no commits");
            return Ok(summary);
        };
        if history.file_at(head, manifest)?.is_none() {
            info!(manifest, "skipping repository without manifest at HEAD");
            return Ok(summary);
        }

        info!(commits = commits.len(), "checking commits");
        let pb = self.progress_bar(repository, commits.len().saturating_sub(1));

        // The oldest commit has no predecessor and is never a candidate.
        for pair in commits.windows(2) {
            let (parent, commit) = (&pair[0], &pair[1]);
            let span = info_span!("commit", hash = %commit);

            match self
                .check_commit(repository, history, parent, commit)
                .instrument(span.clone())
                .await
            {
                Ok(recorded) => {
                    summary.classified += 1;
                    if recorded {
                        summary.recorded += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    span.in_scope(|| warn!(error = %e, "skipping commit"));
                }
            }

            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        info!(
            recorded = summary.recorded,
            failed = summary.failed,
            "finished repository"
        );
        Ok(summary)
    }

    /// Classify one commit and record it when positive. Returns whether an
    /// event was recorded.
    async fn check_commit<H: CommitHistory>(
        &self,
        repository: &str,
        history: &H,
        parent: &str,
        commit: &str,
    ) -> Result<bool, CommitError> {
        let message = history.message(commit)?;
        if !self.detector.is_migration(&message).await {
            return Ok(false);
        }

        let manifest = self.store.ecosystem().manifest_file();
        let event = MigrationEvent {
            repository: repository.to_string(),
            ecosystem: self.store.ecosystem(),
            commit: commit.to_string(),
            parent: parent.to_string(),
            before: history.file_at(parent, manifest)?,
            after: history.file_at(commit, manifest)?,
            message,
        };

        let dir = self.store.record(&event)?;
        debug!(dir = %dir.display(), "recorded migration");
        Ok(true)
    }

    fn progress_bar(&self, repository: &str, len: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(repository.to_string());
        Some(pb)
    }
}
