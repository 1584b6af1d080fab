//! On-disk migration corpus.
//!
//! ```text
//! <root>/<eco>_migrations/<repo>_migrations/
//!     source                       where the repository was acquired from
//! <root>/<eco>_migrations/<repo>_migrations/<commit>/
//!     commit_message
//!     <commit>_<manifest>          manifest at the migration commit
//!     prev_<parent>_<manifest>     manifest at its predecessor
//! ```
//!
//! A snapshot file is missing when the manifest did not exist at that commit.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PersistenceError;
use crate::models::{Ecosystem, MigrationEvent};

const MESSAGE_FILE: &str = "commit_message";
const SOURCE_FILE: &str = "source";
const PREV_PREFIX: &str = "prev_";
const REPO_SUFFIX: &str = "_migrations";

/// Reads and writes migration events for one ecosystem under a corpus root.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
    ecosystem: Ecosystem,
}

/// A migration event as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub repository: String,
    pub commit: String,
    /// Decoded from the `prev_` snapshot name; unknown when that file is missing.
    pub parent: Option<String>,
    pub message: Option<PathBuf>,
    pub before: Option<PathBuf>,
    pub after: Option<PathBuf>,
}

impl StoredEvent {
    #[cfg(test)]
    pub fn read_message(&self) -> Result<Option<String>, PersistenceError> {
        match &self.message {
            Some(path) => fs::read_to_string(path)
                .map(Some)
                .map_err(|e| PersistenceError::new("failed to read", path, e)),
            None => Ok(None),
        }
    }
}

impl CorpusStore {
    pub fn new(root: impl Into<PathBuf>, ecosystem: Ecosystem) -> Self {
        Self {
            root: root.into(),
            ecosystem,
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    /// `<root>/<eco>_migrations`
    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join(format!("{}_migrations", self.ecosystem.tag()))
    }

    /// `<root>/<eco>_migrations/<repo>_migrations`
    pub fn repository_dir(&self, repository: &str) -> PathBuf {
        self.migrations_dir()
            .join(format!("{}{}", repository, REPO_SUFFIX))
    }

    pub fn event_dir(&self, repository: &str, commit: &str) -> PathBuf {
        self.repository_dir(repository).join(commit)
    }

    /// `<root>/<eco>_migrations_info.json`
    pub fn aggregate_path(&self) -> PathBuf {
        self.root
            .join(format!("{}_migrations_info.json", self.ecosystem.tag()))
    }

    /// `<root>/<eco>_migration_freq_info.txt`
    pub fn frequency_path(&self) -> PathBuf {
        self.root
            .join(format!("{}_migration_freq_info.txt", self.ecosystem.tag()))
    }

    /// Persist one event, creating directories as needed.
    ///
    /// Recording the same commit again rewrites its directory in place; any
    /// stale snapshot from an earlier run is removed so the directory never
    /// holds more than one snapshot per side. If any write fails the event
    /// directory is removed, so a failed event is never counted.
    pub fn record(&self, event: &MigrationEvent) -> Result<PathBuf, PersistenceError> {
        let dir = self.event_dir(&event.repository, &event.commit);
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::new("failed to create", &dir, e))?;

        if let Err(e) = self.write_event(&dir, event) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %cleanup, "failed to remove partial event");
            }
            return Err(e);
        }
        Ok(dir)
    }

    fn write_event(&self, dir: &Path, event: &MigrationEvent) -> Result<(), PersistenceError> {
        let manifest = self.ecosystem.manifest_file();
        let after_name = format!("{}_{}", event.commit, manifest);
        let before_name = format!("{}{}_{}", PREV_PREFIX, event.parent, manifest);

        self.remove_stale(dir, &[MESSAGE_FILE, &after_name, &before_name])?;

        write_file(&dir.join(MESSAGE_FILE), event.message.as_bytes())?;
        write_snapshot(&dir.join(&after_name), event.after.as_deref())?;
        write_snapshot(&dir.join(&before_name), event.before.as_deref())
    }

    fn remove_stale(&self, dir: &Path, keep: &[&str]) -> Result<(), PersistenceError> {
        for entry in read_dir(dir)? {
            let path = entry.path();
            let name = entry.file_name();
            if path.is_file() && !keep.iter().any(|k| name == *k) {
                fs::remove_file(&path)
                    .map_err(|e| PersistenceError::new("failed to remove", &path, e))?;
            }
        }
        Ok(())
    }

    /// Remember where `repository` was acquired from, so it can be acquired
    /// again after a temporary clone is gone.
    pub fn record_source(&self, repository: &str, source: &str) -> Result<(), PersistenceError> {
        let dir = self.repository_dir(repository);
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::new("failed to create", &dir, e))?;
        write_file(&dir.join(SOURCE_FILE), source.as_bytes())
    }

    /// The source recorded for `repository`, if any.
    pub fn source(&self, repository: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.repository_dir(repository).join(SOURCE_FILE);
        match fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source.trim().to_string()).filter(|s| !s.is_empty())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::new("failed to read", &path, e)),
        }
    }

    /// Names of all repositories with a migration folder, sorted.
    ///
    /// A corpus that does not exist yet has no repositories.
    pub fn repositories(&self) -> Result<Vec<String>, PersistenceError> {
        let dir = self.migrations_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut repos: Vec<String> = read_dir(&dir)?
            .into_iter()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(REPO_SUFFIX)
                    .filter(|repo| !repo.is_empty())
                    .map(str::to_string)
            })
            .collect();
        repos.sort();
        Ok(repos)
    }

    /// Number of migration sub-directories recorded for `repository`.
    pub fn migration_count(&self, repository: &str) -> Result<usize, PersistenceError> {
        let dir = self.repository_dir(repository);
        Ok(read_dir(&dir)?
            .into_iter()
            .filter(|entry| entry.path().is_dir())
            .count())
    }

    /// All events recorded for `repository`, ordered by commit hash.
    pub fn events(&self, repository: &str) -> Result<Vec<StoredEvent>, PersistenceError> {
        let dir = self.repository_dir(repository);
        let manifest = self.ecosystem.manifest_file();

        let mut events = Vec::new();
        for entry in read_dir(&dir)? {
            let event_dir = entry.path();
            if !event_dir.is_dir() {
                continue;
            }
            let commit = entry.file_name().to_string_lossy().into_owned();
            let mut event = StoredEvent {
                repository: repository.to_string(),
                commit,
                parent: None,
                message: None,
                before: None,
                after: None,
            };

            for file in read_dir(&event_dir)? {
                let name = file.file_name().to_string_lossy().into_owned();
                if name == MESSAGE_FILE {
                    event.message = Some(file.path());
                } else if let Some(rest) = name.strip_prefix(PREV_PREFIX) {
                    event.parent = rest
                        .strip_suffix(manifest)
                        .and_then(|p| p.strip_suffix('_'))
                        .map(str::to_string);
                    event.before = Some(file.path());
                } else if name.ends_with(manifest) {
                    event.after = Some(file.path());
                }
            }
            events.push(event);
        }

        events.sort_by(|a, b| a.commit.cmp(&b.commit));
        Ok(events)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, PersistenceError> {
    fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| PersistenceError::new("failed to list", dir, e))
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), PersistenceError> {
    fs::write(path, content).map_err(|e| PersistenceError::new("failed to write", path, e))
}

fn write_snapshot(path: &Path, content: Option<&[u8]>) -> Result<(), PersistenceError> {
    match content {
        Some(content) => write_file(path, content),
        None => match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(PersistenceError::new("failed to remove", path, e))
            }
            _ => Ok(()),
        },
    }
}
