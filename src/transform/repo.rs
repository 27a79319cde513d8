//! Flattens push events into the name of the repository pushed to.
//!
//! Output is the bare repository name, emitted only when the push contains
//! at least one change in a non-excluded category; otherwise the output is
//! empty. Optional `#message` and `#author` lines may be prepended.

use tokio_util::sync::CancellationToken;

use crate::descriptor::{ConfigError, Descriptor};
use crate::events::parse_push_event;

use super::{Transform, TransformError, TransformFlags};

/// Transforms push events into the repository name.
///
/// Constructed from a descriptor of the form:
///
/// ```text
/// githubrepo://?exclude_additions=<bool>&exclude_modifications=<bool>
///     &exclude_deletions=<bool>&prepend_message=<bool>&prepend_author=<bool>
///     &halt_on_author=<substring>
/// ```
#[derive(Debug, Clone)]
pub struct RepoTransformer {
    flags: TransformFlags,
    halt_on_author: Option<String>,
}

impl RepoTransformer {
    pub fn new(flags: TransformFlags, halt_on_author: Option<String>) -> Self {
        RepoTransformer {
            flags,
            halt_on_author,
        }
    }

    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, ConfigError> {
        let mut allowed = TransformFlags::KEYS.to_vec();
        allowed.push("halt_on_author");
        descriptor.check_keys(&allowed)?;

        Ok(RepoTransformer {
            flags: TransformFlags::from_descriptor(descriptor)?,
            halt_on_author: descriptor.get_non_empty("halt_on_author").map(String::from),
        })
    }
}

impl Transform for RepoTransformer {
    fn transform(
        &self,
        cancel: &CancellationToken,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, TransformError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let event = parse_push_event(payload)?;

        if let Some(needle) = &self.halt_on_author {
            if event.head_commit()?.author.name.contains(needle.as_str()) {
                return Err(TransformError::Halt);
            }
        }

        let qualifying = event
            .commits
            .iter()
            .any(|c| self.flags.has_qualifying_change(c));

        if !qualifying {
            return Ok(Some(Vec::new()));
        }

        let mut out = String::new();

        if self.flags.prepend_message {
            let head = event.head_commit()?;
            out.push_str(&format!("#message {}\n", head.message));
        }

        if self.flags.prepend_author {
            let head = event.head_commit()?;
            out.push_str(&format!("#author {}\n", head.author.name));
        }

        out.push_str(&event.repository.name);

        Ok(Some(out.into_bytes()))
    }
}
