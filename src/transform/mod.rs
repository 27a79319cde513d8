//! Transformations from authenticated push payloads to line-oriented text.
//!
//! A transformation consumes the raw payload bytes the receiver accepted
//! and produces flattened output for downstream consumers. Two are
//! provided:
//!
//! - [`CommitsTransformer`] - per-file-change CSV records
//! - [`RepoTransformer`] - the repository name, when qualifying changes
//!   exist
//!
//! Both are pure and stateless per call; a constructed instance is safe for
//! unbounded concurrent use.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::descriptor::{ConfigError, Descriptor};
use crate::events::{Commit, ParseError};

pub mod commits;
pub mod repo;

pub use commits::CommitsTransformer;
pub use repo::RepoTransformer;

/// Errors produced by a transformation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The payload could not be parsed as a push event.
    #[error("invalid push payload: {0}")]
    Parse(#[from] ParseError),

    /// A configured halt predicate matched: stop processing this event
    /// entirely and produce no output. Distinct from a parse or validation
    /// failure; the event was authentic and well-formed but excluded by
    /// policy.
    #[error("event matched configured halt predicate")]
    Halt,

    /// Writing the output records failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] csv::Error),
}

impl TransformError {
    /// Whether this is the halt outcome rather than a failure.
    pub fn is_halt(&self) -> bool {
        matches!(self, TransformError::Halt)
    }
}

/// A payload-to-text transformation.
///
/// `Ok(None)` means the supplied token was already cancelled at entry and
/// no verdict was reached; cancellation is not observed after that point.
pub trait Transform: Send + Sync {
    fn transform(
        &self,
        cancel: &CancellationToken,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, TransformError>;
}

/// Change-category and prepend flags shared by both transformers,
/// immutable after construction. All default to false.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformFlags {
    /// Exclude newly added files from the output.
    pub exclude_additions: bool,
    /// Exclude modified files from the output.
    pub exclude_modifications: bool,
    /// Exclude removed files from the output.
    pub exclude_deletions: bool,
    /// Prepend the head commit's message to the output.
    pub prepend_message: bool,
    /// Prepend the head commit's author name to the output.
    pub prepend_author: bool,
}

impl TransformFlags {
    /// Query parameter keys understood by both transformers.
    pub(crate) const KEYS: [&'static str; 5] = [
        "exclude_additions",
        "exclude_modifications",
        "exclude_deletions",
        "prepend_message",
        "prepend_author",
    ];

    /// Reads the shared flags from a descriptor. Key validation is the
    /// caller's responsibility since each transformer accepts one extra
    /// key of its own.
    pub(crate) fn from_descriptor(descriptor: &Descriptor) -> Result<Self, ConfigError> {
        Ok(TransformFlags {
            exclude_additions: descriptor.bool_flag("exclude_additions")?,
            exclude_modifications: descriptor.bool_flag("exclude_modifications")?,
            exclude_deletions: descriptor.bool_flag("exclude_deletions")?,
            prepend_message: descriptor.bool_flag("prepend_message")?,
            prepend_author: descriptor.bool_flag("prepend_author")?,
        })
    }

    /// Whether a commit has any change in a non-excluded category.
    pub(crate) fn has_qualifying_change(&self, commit: &Commit) -> bool {
        (!self.exclude_additions && !commit.added.is_empty())
            || (!self.exclude_modifications && !commit.modified.is_empty())
            || (!self.exclude_deletions && !commit.removed.is_empty())
    }
}
