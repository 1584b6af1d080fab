use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The dependency-management conventions the miner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Maven,
    Npm,
    Pypi,
}

impl Ecosystem {
    /// The single manifest file tracked for this ecosystem.
    pub fn manifest_file(&self) -> &'static str {
        match self {
            Ecosystem::Maven => "pom.xml",
            Ecosystem::Npm => "package.json",
            Ecosystem::Pypi => "requirements.txt",
        }
    }

    /// Lowercase tag used in corpus directory and output file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Ecosystem::Maven => "maven",
            Ecosystem::Npm => "npm",
            Ecosystem::Pypi => "pypi",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Maven => write!(f, "Maven"),
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::Pypi => write!(f, "PyPI"),
        }
    }
}

/// Dependency identifiers extracted from one manifest snapshot.
///
/// Ordered so that deltas and reports come out deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet(BTreeSet<String>);

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, id: impl Into<String>) {
        self.0.insert(id.into());
    }

    pub(crate) fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for DependencySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A commit the classifier judged to be a library migration, together with the
/// manifest content at the commit and at its predecessor.
///
/// A snapshot is `None` when the manifest did not exist at that commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEvent {
    pub repository: String,
    pub ecosystem: Ecosystem,
    pub commit: String,
    pub parent: String,
    pub message: String,
    pub before: Option<Vec<u8>>,
    pub after: Option<Vec<u8>>,
}
