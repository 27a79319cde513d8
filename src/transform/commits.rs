//! Flattens push events into per-file-change CSV records.
//!
//! Each output row is `<head commit hash>,<repository name>,<file path>`.
//! Rows appear in commit order; within a commit, added paths come first,
//! then modified, then removed, subject to the exclusion flags. Optional
//! header rows carry the head commit's message and author.

use tokio_util::sync::CancellationToken;

use crate::descriptor::{ConfigError, Descriptor};
use crate::events::parse_push_event;

use super::{Transform, TransformError, TransformFlags};

/// Transforms push events into CSV records of changed files.
///
/// Constructed from a descriptor of the form:
///
/// ```text
/// githubcommits://?exclude_additions=<bool>&exclude_modifications=<bool>
///     &exclude_deletions=<bool>&prepend_message=<bool>&prepend_author=<bool>
///     &halt_on_message=<substring>
/// ```
#[derive(Debug, Clone)]
pub struct CommitsTransformer {
    flags: TransformFlags,
    halt_on_message: Option<String>,
}

impl CommitsTransformer {
    pub fn new(flags: TransformFlags, halt_on_message: Option<String>) -> Self {
        CommitsTransformer {
            flags,
            halt_on_message,
        }
    }

    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, ConfigError> {
        let mut allowed = TransformFlags::KEYS.to_vec();
        allowed.push("halt_on_message");
        descriptor.check_keys(&allowed)?;

        Ok(CommitsTransformer {
            flags: TransformFlags::from_descriptor(descriptor)?,
            halt_on_message: descriptor.get_non_empty("halt_on_message").map(String::from),
        })
    }
}

impl Transform for CommitsTransformer {
    fn transform(
        &self,
        cancel: &CancellationToken,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, TransformError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let event = parse_push_event(payload)?;

        if let Some(needle) = &self.halt_on_message {
            if event.head_commit()?.message.contains(needle.as_str()) {
                return Err(TransformError::Halt);
            }
        }

        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);

            if self.flags.prepend_message {
                let head = event.head_commit()?;
                writer.write_record(["#message", head.message.as_str(), ""])?;
            }

            if self.flags.prepend_author {
                let head = event.head_commit()?;
                writer.write_record(["#author", head.author.name.as_str(), ""])?;
            }

            // The head commit is only required once there is a row to emit,
            // so an event with no qualifying changes flattens to empty
            // output even without one.
            if event
                .commits
                .iter()
                .any(|c| self.flags.has_qualifying_change(c))
            {
                let head = event.head_commit()?;
                let repo = event.repository.name.as_str();

                for commit in &event.commits {
                    if !self.flags.exclude_additions {
                        for path in &commit.added {
                            writer.write_record([head.id.as_str(), repo, path.as_str()])?;
                        }
                    }

                    if !self.flags.exclude_modifications {
                        for path in &commit.modified {
                            writer.write_record([head.id.as_str(), repo, path.as_str()])?;
                        }
                    }

                    if !self.flags.exclude_deletions {
                        for path in &commit.removed {
                            writer.write_record([head.id.as_str(), repo, path.as_str()])?;
                        }
                    }
                }
            }

            writer.flush().map_err(csv::Error::from)?;
        }

        Ok(Some(buf))
    }
}
