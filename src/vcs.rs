use std::path::Path;

use git2::{ErrorCode, Oid, Repository, Sort};

use crate::error::{AcquisitionError, VcsError};

/// The version-control queries the miner needs from a repository.
pub trait CommitHistory {
    /// Commit hashes along the first-parent chain from `HEAD`, oldest first.
    ///
    /// Element `i - 1` is always the first parent of element `i`.
    fn linear_history(&self) -> Result<Vec<String>, VcsError>;

    /// Full message of one commit.
    fn message(&self, commit: &str) -> Result<String, VcsError>;

    /// Content of `path` as recorded in `commit`'s tree, `None` if absent.
    fn file_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, VcsError>;

    /// Number of commits reachable from `HEAD`, merges and side branches included.
    fn commit_count(&self) -> Result<usize, VcsError>;
}

/// A git repository opened through libgit2.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    pub fn open(path: &Path) -> Result<Self, AcquisitionError> {
        Repository::open(path)
            .map(Self::from_repository)
            .map_err(|source| AcquisitionError::Open {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    fn find_commit(&self, hash: &str) -> Result<git2::Commit<'_>, VcsError> {
        let oid = Oid::from_str(hash).map_err(|_| VcsError::InvalidHash(hash.to_string()))?;
        Ok(self.repo.find_commit(oid)?)
    }

    fn head_walk(&self) -> Result<Option<git2::Revwalk<'_>>, VcsError> {
        if self.repo.is_empty()? {
            return Ok(None);
        }
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        Ok(Some(revwalk))
    }
}

impl CommitHistory for GitRepository {
    fn linear_history(&self) -> Result<Vec<String>, VcsError> {
        let Some(mut revwalk) = self.head_walk()? else {
            return Ok(Vec::new());
        };
        revwalk.simplify_first_parent()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        revwalk
            .map(|oid| oid.map(|oid| oid.to_string()).map_err(VcsError::from))
            .collect()
    }

    fn message(&self, commit: &str) -> Result<String, VcsError> {
        let commit = self.find_commit(commit)?;
        Ok(String::from_utf8_lossy(commit.message_bytes()).into_owned())
    }

    fn file_at(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        let tree = self.find_commit(commit)?.tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(&self.repo)?;
        Ok(object.as_blob().map(|blob| blob.content().to_vec()))
    }

    fn commit_count(&self) -> Result<usize, VcsError> {
        let Some(revwalk) = self.head_walk()? else {
            return Ok(0);
        };
        let mut count = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::commit;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_linear_history_is_oldest_first() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = commit(&repo, &[("pom.xml", Some("<project/>"))], "initial");
        let second = commit(&repo, &[("README", Some("hi"))], "docs");
        let third = commit(&repo, &[("pom.xml", Some("<project></project>"))], "bump");

        let git = GitRepository::from_repository(repo);
        assert_eq!(
            git.linear_history().unwrap(),
            vec![first.to_string(), second.to_string(), third.to_string()]
        );
        assert_eq!(git.commit_count().unwrap(), 3);
        assert_eq!(git.message(&second.to_string()).unwrap(), "docs");
    }

    #[test]
    fn test_file_at_reads_historical_content() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let old = commit(&repo, &[("requirements.txt", Some("simplejson\n"))], "add");
        let new = commit(&repo, &[("requirements.txt", Some("ujson\n"))], "swap json lib");
        let gone = commit(&repo, &[("requirements.txt", None)], "drop requirements");

        let git = GitRepository::from_repository(repo);
        assert_eq!(
            git.file_at(&old.to_string(), "requirements.txt").unwrap(),
            Some(b"simplejson\n".to_vec())
        );
        assert_eq!(
            git.file_at(&new.to_string(), "requirements.txt").unwrap(),
            Some(b"ujson\n".to_vec())
        );
        assert_eq!(git.file_at(&gone.to_string(), "requirements.txt").unwrap(), None);
    }

    #[test]
    fn test_empty_repository_has_no_history() {
        let dir = TempDir::new().unwrap();
        let git = GitRepository::from_repository(Repository::init(dir.path()).unwrap());
        assert!(git.linear_history().unwrap().is_empty());
        assert_eq!(git.commit_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_hash() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, &[("a", Some("a"))], "a");
        let git = GitRepository::from_repository(repo);
        assert!(matches!(
            git.message("not-a-hash"),
            Err(VcsError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_open_missing_repository_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GitRepository::open(&dir.path().join("nope")),
            Err(AcquisitionError::Open { .. })
        ));
    }
}
