//! Commit message classification.
//!
//! - [`CommitClassifier`]: a service that answers "is this commit a library
//!   migration?" with a raw token.
//! - [`MigrationDetector`]: the strict, fail-closed adapter the history
//!   walker talks to.
//! - [`chat`]: an OpenAI-compatible chat-completions classifier.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ClassificationError;

pub mod chat;

/// Instruction sent alongside every commit message.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes GitHub commit messages. \
You take commit messages as input, and if the commit message indicates a third-party library \
migration, you respond with 'True', otherwise, you respond with 'False'. Make sure not to \
classify merge commits as a library migration.";

const POSITIVE: &str = "True";
const NEGATIVE: &str = "False";

/// A text classifier constrained to answer `True` or `False`.
#[async_trait]
pub trait CommitClassifier: Send + Sync {
    /// Return the classifier's raw answer for `message`.
    async fn classify(&self, message: &str) -> Result<String, ClassificationError>;
}

/// Turns a classifier's raw answers into a strict boolean verdict.
///
/// Only the exact token `True` is a positive verdict. Anything else,
/// including transport failures, is negative and gets logged. Merge commits
/// are excluded by the prompt alone; callers must not rely on it.
pub struct MigrationDetector {
    classifier: Box<dyn CommitClassifier>,
}

impl MigrationDetector {
    pub fn new(classifier: Box<dyn CommitClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn is_migration(&self, message: &str) -> bool {
        match self.classifier.classify(message).await {
            Ok(answer) if answer == POSITIVE => {
                debug!("commit classified as a library migration");
                true
            }
            Ok(answer) if answer == NEGATIVE => false,
            Ok(answer) => {
                warn!(answer = %answer, "classification error: unexpected answer, treating as not a migration");
                false
            }
            Err(e) => {
                warn!(error = %e, "classification error, treating as not a migration");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Answers from a fixed message → answer table; unknown messages get `False`.
    #[derive(Default)]
    pub struct ScriptedClassifier {
        answers: HashMap<String, String>,
        pub seen: Mutex<Vec<String>>,
    }

    impl ScriptedClassifier {
        pub fn answering(pairs: &[(&str, &str)]) -> Self {
            Self {
                answers: pairs
                    .iter()
                    .map(|(m, a)| (m.to_string(), a.to_string()))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommitClassifier for ScriptedClassifier {
        async fn classify(&self, message: &str) -> Result<String, ClassificationError> {
            self.seen.lock().unwrap().push(message.to_string());
            Ok(self
                .answers
                .get(message)
                .cloned()
                .unwrap_or_else(|| NEGATIVE.to_string()))
        }
    }

    #[async_trait]
    impl<T: CommitClassifier + ?Sized> CommitClassifier for Arc<T> {
        async fn classify(&self, message: &str) -> Result<String, ClassificationError> {
            (**self).classify(message).await
        }
    }

    /// Always fails as if the service were unreachable.
    pub struct FailingClassifier;

    #[async_trait]
    impl CommitClassifier for FailingClassifier {
        async fn classify(&self, _message: &str) -> Result<String, ClassificationError> {
            Err(ClassificationError::MissingAnswer)
        }
    }
}
