//! Getting a repository onto disk: open a local checkout, or clone a URL into
//! a temporary directory that disappears once the repository is dropped.

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use tempfile::TempDir;
use tracing::info;

use crate::error::AcquisitionError;
use crate::vcs::GitRepository;

const REMOTE_PREFIXES: &[&str] = &["https://", "http://", "ssh://", "git://", "file://", "git@"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Local(PathBuf),
    Remote(String),
}

impl RepoSource {
    pub fn parse(spec: &str) -> Self {
        if REMOTE_PREFIXES.iter().any(|p| spec.starts_with(p)) {
            RepoSource::Remote(spec.to_string())
        } else {
            RepoSource::Local(PathBuf::from(spec))
        }
    }

    /// Repository name used for the corpus folder: the last path segment,
    /// without a trailing `.git`.
    pub fn name(&self) -> String {
        match self {
            RepoSource::Remote(url) => {
                let trimmed = url.trim_end_matches('/');
                let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
                strip_git_suffix(last)
            }
            RepoSource::Local(path) => {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
                let last = resolved
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| resolved.display().to_string());
                strip_git_suffix(&last)
            }
        }
    }

    /// The form stored in the corpus: the URL, or the absolute local path so
    /// it still resolves from another working directory.
    pub fn to_spec(&self) -> String {
        match self {
            RepoSource::Remote(url) => url.clone(),
            RepoSource::Local(path) => path
                .canonicalize()
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
        }
    }
}

fn strip_git_suffix(name: &str) -> String {
    name.strip_suffix(".git").unwrap_or(name).to_string()
}

/// An opened repository. A cloned one keeps its temporary directory alive.
pub struct AcquiredRepo {
    pub name: String,
    pub git: GitRepository,
    _workdir: Option<TempDir>,
}

pub fn acquire(source: &RepoSource) -> Result<AcquiredRepo, AcquisitionError> {
    let name = source.name();
    match source {
        RepoSource::Local(path) => Ok(AcquiredRepo {
            git: GitRepository::open(path)?,
            name,
            _workdir: None,
        }),
        RepoSource::Remote(url) => {
            let workdir = TempDir::new().map_err(AcquisitionError::WorkDir)?;
            let target = workdir.path().join(&name);
            let git = clone(url, &target)?;
            Ok(AcquiredRepo {
                name,
                git,
                _workdir: Some(workdir),
            })
        }
    }
}

fn clone(url: &str, target: &Path) -> Result<GitRepository, AcquisitionError> {
    info!(url, target = %target.display(), "cloning repository");
    RepoBuilder::new()
        .clone(url, target)
        .map(GitRepository::from_repository)
        .map_err(|e| AcquisitionError::Clone {
            url: url.to_string(),
            reason: e.message().to_string(),
        })
}
