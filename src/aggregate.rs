use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::corpus::{CorpusStore, StoredEvent};
use crate::diff::DependencyDelta;
use crate::error::PersistenceError;
use crate::manifest::ManifestFormat;
use crate::models::DependencySet;

/// How often one dependency was dropped and picked up across the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub abandonments: u64,
    pub adoptions: u64,
}

/// Corpus-wide adoption/abandonment counts keyed by dependency identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateTable(BTreeMap<String, Counts>);

impl AggregateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one event's delta. Plain counter addition, so folding order never
    /// matters.
    pub fn fold(&mut self, delta: &DependencyDelta) {
        for id in &delta.abandoned {
            self.0.entry(id.clone()).or_default().abandonments += 1;
        }
        for id in &delta.adopted {
            self.0.entry(id.clone()).or_default().adoptions += 1;
        }
    }

    /// Combine a partial table built elsewhere into this one.
    pub fn merge(&mut self, other: AggregateTable) {
        for (id, counts) in other.0 {
            let entry = self.0.entry(id).or_default();
            entry.abandonments += counts.abandonments;
            entry.adoptions += counts.adoptions;
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Counts> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize as a JSON object indented with four spaces.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = self.to_json().map_err(|e| {
            PersistenceError::new("failed to serialize", path, std::io::Error::other(e))
        })?;
        std::fs::write(path, json).map_err(|e| PersistenceError::new("failed to write", path, e))
    }
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    pub repositories: usize,
    pub events: usize,
    pub folded: usize,
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
enum SnapshotError {
    #[error("neither snapshot exists")]
    BothMissing,
    #[error("{side} snapshot {}: {reason}", path.display())]
    Unusable {
        side: &'static str,
        path: std::path::PathBuf,
        reason: String,
    },
}

/// Folds every recorded migration event of one ecosystem into an
/// [`AggregateTable`].
pub struct Aggregator<'a> {
    store: &'a CorpusStore,
    format: ManifestFormat,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a CorpusStore, format: ManifestFormat) -> Self {
        Self { store, format }
    }

    /// One full pass over the corpus.
    ///
    /// A snapshot that was never written (the manifest did not exist at that
    /// commit) counts as an empty set. An event with neither snapshot, or
    /// with a snapshot that does not parse, is skipped; a repository whose
    /// folder cannot be listed is skipped. Neither stops the pass.
    pub fn run(&self) -> Result<(AggregateTable, AggregateSummary), PersistenceError> {
        let _span = info_span!("aggregate", ecosystem = %self.store.ecosystem()).entered();

        let mut table = AggregateTable::new();
        let mut summary = AggregateSummary::default();

        for repository in self.store.repositories()? {
            let events = match self.store.events(&repository) {
                Ok(events) => events,
                Err(e) => {
                    warn!(repo = %repository, error = %e, "skipping repository");
                    continue;
                }
            };
            summary.repositories += 1;

            // Per-repository partial table, merged once the repository is done.
            let mut partial = AggregateTable::new();
            for event in events {
                summary.events += 1;
                match self.delta_of(&event) {
                    Ok(delta) => {
                        if delta.is_empty() {
                            debug!(repo = %repository, commit = %event.commit, "event changes no dependencies");
                        }
                        partial.fold(&delta);
                        summary.folded += 1;
                    }
                    Err(e) => {
                        summary.skipped += 1;
                        warn!(repo = %repository, commit = %event.commit, error = %e, "skipping event");
                    }
                }
            }
            table.merge(partial);
        }

        info!(
            events = summary.events,
            folded = summary.folded,
            skipped = summary.skipped,
            dependencies = table.len(),
            "aggregation finished"
        );
        Ok((table, summary))
    }

    fn delta_of(&self, event: &StoredEvent) -> Result<DependencyDelta, SnapshotError> {
        if event.before.is_none() && event.after.is_none() {
            return Err(SnapshotError::BothMissing);
        }
        let before = self.parse_snapshot("before", event.before.as_deref())?;
        let after = self.parse_snapshot("after", event.after.as_deref())?;
        if before.is_empty() && after.is_empty() {
            debug!(commit = %event.commit, "neither snapshot declares dependencies");
        } else {
            debug!(before = before.len(), after = after.len(), "parsed snapshots");
        }
        Ok(DependencyDelta::between(&before, &after))
    }

    fn parse_snapshot(
        &self,
        side: &'static str,
        path: Option<&Path>,
    ) -> Result<DependencySet, SnapshotError> {
        let Some(path) = path else {
            return Ok(DependencySet::new());
        };
        let unusable = |reason: String| SnapshotError::Unusable {
            side,
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read(path).map_err(|e| unusable(e.to_string()))?;
        self.format
            .parse(&content)
            .map_err(|e| unusable(e.to_string()))
    }
}
