use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::acquire::{acquire, AcquiredRepo, RepoSource};
use crate::corpus::CorpusStore;
use crate::error::PersistenceError;
use crate::vcs::CommitHistory;

/// Migration events per commit for one repository.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MigrationRate {
    Defined(f64),
    /// The repository has no commits.
    Undefined,
}

impl MigrationRate {
    pub fn compute(migrations: usize, commits: usize) -> Self {
        if commits == 0 {
            MigrationRate::Undefined
        } else {
            MigrationRate::Defined(migrations as f64 / commits as f64)
        }
    }
}

impl fmt::Display for MigrationRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug keeps the decimal point: `1.0`, `0.0`, `0.25`.
            MigrationRate::Defined(rate) => write!(f, "{:?}", rate),
            MigrationRate::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryRate {
    pub repository: String,
    pub migrations: usize,
    pub commits: usize,
    pub rate: MigrationRate,
}

impl fmt::Display for RepositoryRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Migration rate for {} = {}", self.repository, self.rate)
    }
}

/// Per-repository migration rates for one ecosystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyReport {
    pub rates: Vec<RepositoryRate>,
    /// Repositories that could not be opened or counted.
    pub skipped: Vec<String>,
}

impl FrequencyReport {
    /// One `Migration rate for <repo> = <rate>` line per repository.
    pub fn render(&self) -> String {
        self.rates.iter().map(|r| format!("{}\n", r)).collect()
    }

    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        std::fs::write(path, self.render())
            .map_err(|e| PersistenceError::new("failed to write", path, e))
    }
}

/// Rate for one repository whose history is available.
pub fn repository_rate<H: CommitHistory>(
    store: &CorpusStore,
    repository: &str,
    history: &H,
) -> anyhow::Result<RepositoryRate> {
    let commits = history.commit_count()?;
    let migrations = store.migration_count(repository)?;
    Ok(RepositoryRate {
        repository: repository.to_string(),
        migrations,
        commits,
        rate: MigrationRate::compute(migrations, commits),
    })
}

/// Find a corpus repository on disk, trying in order:
///
/// 1. a `sources` entry with the same name,
/// 2. `<repos_dir>/<repo>`,
/// 3. the source recorded by `walk`, cloned again if it is a URL.
fn locate(
    store: &CorpusStore,
    repository: &str,
    repos_dir: &Path,
    sources: &[RepoSource],
) -> anyhow::Result<AcquiredRepo> {
    if let Some(source) = sources.iter().find(|s| s.name() == repository) {
        return Ok(acquire(source)?);
    }

    let local = repos_dir.join(repository);
    if local.exists() {
        return Ok(acquire(&RepoSource::Local(local))?);
    }

    match store.source(repository)? {
        Some(spec) => {
            debug!(repo = %repository, source = %spec, "acquiring from recorded source");
            Ok(acquire(&RepoSource::parse(&spec))?)
        }
        None => Ok(acquire(&RepoSource::Local(local))?),
    }
}

/// Compute the rate of every repository in the corpus.
pub fn report(
    store: &CorpusStore,
    repos_dir: &Path,
    sources: &[RepoSource],
) -> Result<FrequencyReport, PersistenceError> {
    let mut report = FrequencyReport::default();

    for repository in store.repositories()? {
        let result = locate(store, &repository, repos_dir, sources)
            .and_then(|repo| repository_rate(store, &repository, &repo.git));

        match result {
            Ok(rate) => {
                info!(
                    repo = %repository,
                    migrations = rate.migrations,
                    commits = rate.commits,
                    "computed migration rate"
                );
                report.rates.push(rate);
            }
            Err(e) => {
                warn!(repo = %repository, error = %e, "skipping repository");
                report.skipped.push(repository);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecosystem, MigrationEvent};
    use crate::vcs::testing::commit;
    use git2::{Oid, Repository};
    use tempfile::TempDir;

    #[test]
    fn test_rate() {
        assert_eq!(MigrationRate::compute(1, 5), MigrationRate::Defined(0.2));
        assert_eq!(MigrationRate::compute(0, 3), MigrationRate::Defined(0.0));
        assert_eq!(MigrationRate::compute(2, 0), MigrationRate::Undefined);
        assert_eq!(MigrationRate::compute(0, 0).to_string(), "undefined");
        assert_eq!(MigrationRate::compute(1, 1).to_string(), "1.0");
        assert_eq!(MigrationRate::compute(0, 4).to_string(), "0.0");
        assert_eq!(MigrationRate::compute(1, 4).to_string(), "0.25");
    }

    #[test]
    fn test_render() {
        let report = FrequencyReport {
            rates: vec![
                RepositoryRate {
                    repository: "alpha".to_string(),
                    migrations: 1,
                    commits: 5,
                    rate: MigrationRate::compute(1, 5),
                },
                RepositoryRate {
                    repository: "empty".to_string(),
                    migrations: 0,
                    commits: 0,
                    rate: MigrationRate::compute(0, 0),
                },
            ],
            skipped: Vec::new(),
        };
        assert_eq!(
            report.render(),
            "Migration rate for alpha = 0.2\nMigration rate for empty = undefined\n"
        );
    }

    #[test]
    fn test_report_over_corpus() {
        let work = TempDir::new().unwrap();
        let repos_dir = work.path().join("repos");
        let corpus = work.path().join("corpus");

        std::fs::create_dir_all(repos_dir.join("alpha")).unwrap();
        let repo = Repository::init(repos_dir.join("alpha")).unwrap();
        let mut hashes = Vec::new();
        for i in 0..4 {
            let content = format!("lib{}\n", i);
            hashes.push(commit(&repo, &[("requirements.txt", Some(content.as_str()))], "c"));
        }

        let store = CorpusStore::new(&corpus, Ecosystem::Pypi);
        store
            .record(&MigrationEvent {
                repository: "alpha".to_string(),
                ecosystem: Ecosystem::Pypi,
                commit: hashes[2].to_string(),
                parent: hashes[1].to_string(),
                message: "c".to_string(),
                before: Some(b"lib1\n".to_vec()),
                after: Some(b"lib2\n".to_vec()),
            })
            .unwrap();
        // A corpus entry whose repository is not on disk.
        std::fs::create_dir_all(store.repository_dir("ghost")).unwrap();

        let report = report(&store, &repos_dir, &[]).unwrap();
        assert_eq!(report.rates.len(), 1);
        assert_eq!(report.rates[0].commits, 4);
        assert_eq!(report.rates[0].migrations, 1);
        assert_eq!(report.rates[0].rate, MigrationRate::Defined(0.25));
        assert_eq!(report.skipped, vec!["ghost"]);
    }

    fn origin_with_commits(dir: &Path, n: usize) -> Vec<Oid> {
        let repo = Repository::init(dir).unwrap();
        (0..n)
            .map(|i| {
                let content = format!("{{\"dependencies\":{{\"lib{}\":\"1\"}}}}", i);
                commit(&repo, &[("package.json", Some(content.as_str()))], "c")
            })
            .collect()
    }

    fn record_one(store: &CorpusStore, repository: &str, commit: Oid, parent: Oid) {
        store
            .record(&MigrationEvent {
                repository: repository.to_string(),
                ecosystem: store.ecosystem(),
                commit: commit.to_string(),
                parent: parent.to_string(),
                message: "c".to_string(),
                before: None,
                after: None,
            })
            .unwrap();
    }

    #[test]
    fn test_report_reacquires_recorded_source() {
        let work = TempDir::new().unwrap();
        let origin = work.path().join("origin").join("webapp");
        std::fs::create_dir_all(&origin).unwrap();
        let hashes = origin_with_commits(&origin, 2);

        // Walked from a URL: nothing under repos_dir, only the recorded source.
        let store = CorpusStore::new(work.path().join("corpus"), Ecosystem::Npm);
        store
            .record_source("webapp", &format!("file://{}", origin.display()))
            .unwrap();
        record_one(&store, "webapp", hashes[1], hashes[0]);

        let report = report(&store, &work.path().join("empty"), &[]).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.render(), "Migration rate for webapp = 0.5\n");
    }

    #[test]
    fn test_report_prefers_explicit_sources() {
        let work = TempDir::new().unwrap();
        let origin = work.path().join("elsewhere").join("service");
        std::fs::create_dir_all(&origin).unwrap();
        let hashes = origin_with_commits(&origin, 4);

        let store = CorpusStore::new(work.path().join("corpus"), Ecosystem::Npm);
        record_one(&store, "service", hashes[2], hashes[1]);

        let without = report(&store, &work.path().join("repos"), &[]).unwrap();
        assert_eq!(without.skipped, vec!["service"]);

        let sources = [RepoSource::Local(origin.clone())];
        let with = report(&store, &work.path().join("repos"), &sources).unwrap();
        assert_eq!(with.rates[0].rate, MigrationRate::Defined(0.25));
    }
}
