//! Typed push-event model parsed from GitHub webhook payloads.
//!
//! Payloads are deserialized into raw structures where every field is
//! optional, then validated into the public [`PushEvent`] type. Required
//! fields that are absent produce a [`ParseError`] naming the field, so a
//! malformed payload is always a clear error rather than a panic or a
//! silently empty value.
//!
//! The event type itself (`push`, `ping`, ...) travels in the
//! `X-GitHub-Event` header, not in the payload, so dispatch on it happens
//! in [`parse_event`] with the type supplied by the caller.

use serde::Deserialize;
use thiserror::Error;

/// Error type for payload parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent from the payload.
    #[error("missing field: {field}")]
    MissingField { field: &'static str },
}

impl ParseError {
    fn missing(field: &'static str) -> Self {
        ParseError::MissingField { field }
    }
}

/// A parsed webhook event.
///
/// Only push events carry a typed representation; every other event type is
/// ignored by returning `None` from [`parse_event`].
#[derive(Debug, Clone)]
pub enum Event {
    /// One or more commits were pushed to a ref.
    Push(PushEvent),
}

/// A push notification: commits pushed to a branch or tag.
///
/// Read-only once constructed. The head commit is private because it may be
/// absent; all access goes through [`PushEvent::head_commit`], which fails
/// with a field-naming error instead of panicking.
#[derive(Debug, Clone)]
pub struct PushEvent {
    /// The full ref the push targeted, e.g. `refs/heads/main`.
    pub ref_name: String,

    /// The repository the push landed in.
    pub repository: Repository,

    /// The commits in the push, in order, with their per-file change lists.
    pub commits: Vec<Commit>,

    head_commit: Option<HeadCommit>,
}

impl PushEvent {
    /// Returns the head commit, or a `ParseError` naming the missing field
    /// when the payload carried none.
    pub fn head_commit(&self) -> Result<&HeadCommit, ParseError> {
        self.head_commit
            .as_ref()
            .ok_or_else(|| ParseError::missing("head_commit"))
    }

    /// Whether the payload carried a head commit.
    pub fn has_head_commit(&self) -> bool {
        self.head_commit.is_some()
    }
}

/// Repository identification carried in the payload.
#[derive(Debug, Clone)]
pub struct Repository {
    /// The repository name (without the owner prefix).
    pub name: String,
}

/// The most recent commit of a push.
#[derive(Debug, Clone)]
pub struct HeadCommit {
    /// The commit hash.
    pub id: String,

    /// The commit message.
    pub message: String,

    /// The commit author.
    pub author: Author,
}

/// Commit author identification.
#[derive(Debug, Clone)]
pub struct Author {
    /// The author's display name.
    pub name: String,
}

/// A single commit's file-level changes.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    /// Paths of files added by this commit.
    pub added: Vec<String>,

    /// Paths of files modified by this commit.
    pub modified: Vec<String>,

    /// Paths of files removed by this commit.
    pub removed: Vec<String>,
}

// ============================================================================
// Raw payload structures for deserialization
//
// Every field is optional here; required fields are enforced during
// validation so the error names the field instead of whatever serde would
// report.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
    repository: Option<RawRepository>,
    head_commit: Option<RawHeadCommit>,
    #[serde(default)]
    commits: Vec<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHeadCommit {
    id: Option<String>,
    message: Option<String>,
    author: Option<RawAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    #[serde(default)]
    added: Vec<String>,
    #[serde(default)]
    modified: Vec<String>,
    #[serde(default)]
    removed: Vec<String>,
}

/// Parses a payload as a push event.
///
/// `ref` and `repository.name` are required. `head_commit` may be absent
/// (non-push or truncated payloads); when present, its `id`, `message` and
/// `author.name` are all required.
pub fn parse_push_event(payload: &[u8]) -> Result<PushEvent, ParseError> {
    let raw: RawPushPayload = serde_json::from_slice(payload)?;

    let ref_name = raw.ref_name.ok_or_else(|| ParseError::missing("ref"))?;

    let repository = raw
        .repository
        .ok_or_else(|| ParseError::missing("repository"))?;
    let repo_name = repository
        .name
        .ok_or_else(|| ParseError::missing("repository.name"))?;

    let head_commit = raw.head_commit.map(validate_head_commit).transpose()?;

    let commits = raw
        .commits
        .into_iter()
        .map(|c| Commit {
            added: c.added,
            modified: c.modified,
            removed: c.removed,
        })
        .collect();

    Ok(PushEvent {
        ref_name,
        repository: Repository { name: repo_name },
        commits,
        head_commit,
    })
}

fn validate_head_commit(raw: RawHeadCommit) -> Result<HeadCommit, ParseError> {
    let id = raw.id.ok_or_else(|| ParseError::missing("head_commit.id"))?;
    let message = raw
        .message
        .ok_or_else(|| ParseError::missing("head_commit.message"))?;
    let author = raw
        .author
        .ok_or_else(|| ParseError::missing("head_commit.author"))?;
    let name = author
        .name
        .ok_or_else(|| ParseError::missing("head_commit.author.name"))?;

    Ok(HeadCommit {
        id,
        message,
        author: Author { name },
    })
}

/// Parses a payload according to its out-of-band event type.
///
/// Returns `Ok(Some(event))` for event types with a typed representation,
/// `Ok(None)` for every other type (ignored, not an error), and `Err` for a
/// payload that does not match its declared type.
pub fn parse_event(event_type: &str, payload: &[u8]) -> Result<Option<Event>, ParseError> {
    match event_type {
        "push" => parse_push_event(payload).map(|e| Some(Event::Push(e))),
        _ => Ok(None),
    }
}
