//! Receives and authenticates inbound GitHub webhook requests.
//!
//! The receiver validates the shape of a request (method, headers), checks
//! the HMAC signature over the raw body, and optionally enforces a branch
//! filter. On success it returns the body bytes exactly as received; all
//! event interpretation is left to the transformations downstream, since
//! the event type travels in a header rather than in the payload.
//!
//! A receiver is constructed once from a descriptor
//! (`github://?secret=...&ref=...`) and is reusable across any number of
//! concurrent requests.

use std::io::{self, Read};

use http::{HeaderMap, Method};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::descriptor::{ConfigError, Descriptor};
use crate::events::{parse_push_event, ParseError};
use crate::signature::verify_signature;

/// Header carrying the event type.
pub const HEADER_EVENT: &str = "x-github-event";
/// Header carrying the HMAC signature (`sha1=<hex>`).
pub const HEADER_SIGNATURE: &str = "x-hub-signature";

/// Event type reserved for the hosting service's handshake check.
const EVENT_PING: &str = "ping";

/// A rejected webhook request, classified by what failed.
///
/// `Ping` is not a failure: it reports a successful handshake that requires
/// no further processing. Everything else means the request was not
/// accepted. The expected signature is never carried in any variant.
#[derive(Debug, Error)]
pub enum Rejection {
    /// The request used a method other than POST.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The event-type header was absent or empty.
    #[error("missing X-GitHub-Event header")]
    MissingEventHeader,

    /// The signature header was absent or empty, so the request cannot be
    /// authenticated.
    #[error("missing X-Hub-Signature header required for HMAC verification")]
    MissingSignatureHeader,

    /// The event was a ping handshake; nothing to do.
    #[error("ping message is a no-op")]
    Ping,

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Io(#[from] io::Error),

    /// The presented signature did not match the body.
    #[error("HMAC verification failed")]
    InvalidSignature,

    /// The body could not be parsed as a push event while applying the ref
    /// filter.
    #[error("invalid push payload: {0}")]
    Parse(#[from] ParseError),

    /// The push targeted a ref other than the configured filter.
    #[error("ref '{actual}' does not match required ref '{expected}'")]
    RefMismatch { expected: String, actual: String },
}

/// Configuration for a [`GithubReceiver`], immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct ReceiverConfig {
    /// Shared signing secret. An empty secret means signature verification
    /// will fail against any signature a real sender produces.
    pub secret: String,

    /// Required ref, e.g. `refs/heads/main`. `None` disables filtering.
    pub ref_filter: Option<String>,
}

/// Authenticates inbound GitHub webhook requests.
#[derive(Debug, Clone)]
pub struct GithubReceiver {
    secret: String,
    ref_filter: Option<String>,
}

impl GithubReceiver {
    pub fn new(config: ReceiverConfig) -> Self {
        GithubReceiver {
            secret: config.secret,
            ref_filter: config.ref_filter,
        }
    }

    /// Constructs a receiver from a `github://?secret=...&ref=...`
    /// descriptor. Both parameters are optional; an empty `ref` disables
    /// filtering.
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, ConfigError> {
        descriptor.check_keys(&["secret", "ref"])?;

        Ok(GithubReceiver {
            secret: descriptor.get("secret").unwrap_or_default().to_string(),
            ref_filter: descriptor.get_non_empty("ref").map(String::from),
        })
    }

    /// Validates and authenticates a request, returning the raw body bytes.
    ///
    /// Checks run in order and stop at the first failure: method, event
    /// header, signature header, ping short-circuit, body read, signature
    /// verification, optional ref filter.
    ///
    /// Returns `Ok(None)` when `cancel` was already cancelled at entry: no
    /// verdict was reached and no error occurred. Cancellation is only
    /// observed at entry; the remaining work is bounded and runs to
    /// completion.
    pub fn receive<R: Read>(
        &self,
        cancel: &CancellationToken,
        method: &Method,
        headers: &HeaderMap,
        mut body: R,
    ) -> Result<Option<Vec<u8>>, Rejection> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        if method != Method::POST {
            return Err(Rejection::MethodNotAllowed);
        }

        let event_type = match non_empty_header(headers, HEADER_EVENT) {
            Some(v) => v,
            None => return Err(Rejection::MissingEventHeader),
        };

        let signature = match non_empty_header(headers, HEADER_SIGNATURE) {
            Some(v) => v.to_string(),
            None => return Err(Rejection::MissingSignatureHeader),
        };

        if event_type == EVENT_PING {
            return Err(Rejection::Ping);
        }

        let mut payload = Vec::new();
        body.read_to_end(&mut payload)?;

        if !verify_signature(&payload, &signature, self.secret.as_bytes()) {
            return Err(Rejection::InvalidSignature);
        }

        if let Some(required) = &self.ref_filter {
            let event = parse_push_event(&payload)?;
            if &event.ref_name != required {
                return Err(Rejection::RefMismatch {
                    expected: required.clone(),
                    actual: event.ref_name,
                });
            }
        }

        Ok(Some(payload))
    }
}

/// Returns the header value if it is present, valid UTF-8, and non-empty.
fn non_empty_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign;

    const PUSH_FIXTURE: &[u8] = include_bytes!("../tests/fixtures/push.json");
    const SECRET: &str = "s33kret";

    fn receiver() -> GithubReceiver {
        GithubReceiver::new(ReceiverConfig {
            secret: SECRET.to_string(),
            ref_filter: None,
        })
    }

    fn signed_headers(payload: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            sign(payload, SECRET.as_bytes()).parse().unwrap(),
        );
        headers
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }

    #[test]
    fn accepts_and_returns_body_unmodified() {
        let cancel = CancellationToken::new();
        let headers = signed_headers(PUSH_FIXTURE);

        let result = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap();

        assert_eq!(result.as_deref(), Some(PUSH_FIXTURE));
    }

    #[test]
    fn cancelled_token_yields_no_verdict() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let headers = signed_headers(PUSH_FIXTURE);

        let result = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn rejects_non_post_methods() {
        let cancel = CancellationToken::new();
        let headers = signed_headers(PUSH_FIXTURE);

        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let err = receiver()
                .receive(&cancel, &method, &headers, PUSH_FIXTURE)
                .unwrap_err();
            assert!(matches!(err, Rejection::MethodNotAllowed));
        }
    }

    #[test]
    fn rejects_missing_event_header() {
        let cancel = CancellationToken::new();
        let mut headers = signed_headers(PUSH_FIXTURE);
        headers.remove(HEADER_EVENT);

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::MissingEventHeader));
    }

    #[test]
    fn empty_event_header_counts_as_missing() {
        let cancel = CancellationToken::new();
        let mut headers = signed_headers(PUSH_FIXTURE);
        headers.insert(HEADER_EVENT, "".parse().unwrap());

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::MissingEventHeader));
    }

    #[test]
    fn rejects_missing_signature_header() {
        let cancel = CancellationToken::new();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::MissingSignatureHeader));
    }

    #[test]
    fn ping_is_a_distinguished_no_op() {
        let cancel = CancellationToken::new();
        let mut headers = signed_headers(PUSH_FIXTURE);
        headers.insert(HEADER_EVENT, "ping".parse().unwrap());

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::Ping));
    }

    #[test]
    fn body_read_failure_is_classified_as_io() {
        let cancel = CancellationToken::new();
        let headers = signed_headers(PUSH_FIXTURE);

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, FailingReader)
            .unwrap_err();
        assert!(matches!(err, Rejection::Io(_)));
    }

    #[test]
    fn rejects_forged_signature() {
        let cancel = CancellationToken::new();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            "sha1=0000000000000000000000000000000000000000"
                .parse()
                .unwrap(),
        );

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidSignature));
    }

    #[test]
    fn rejects_signature_from_wrong_secret() {
        let cancel = CancellationToken::new();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            sign(PUSH_FIXTURE, b"not-the-secret").parse().unwrap(),
        );

        let err = receiver()
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidSignature));
    }

    #[test]
    fn ref_filter_accepts_exact_match() {
        let cancel = CancellationToken::new();
        let receiver = GithubReceiver::new(ReceiverConfig {
            secret: SECRET.to_string(),
            ref_filter: Some("refs/heads/main".to_string()),
        });
        let headers = signed_headers(PUSH_FIXTURE);

        let result = receiver
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap();
        assert_eq!(result.as_deref(), Some(PUSH_FIXTURE));
    }

    #[test]
    fn ref_filter_rejects_other_refs() {
        let cancel = CancellationToken::new();
        let receiver = GithubReceiver::new(ReceiverConfig {
            secret: SECRET.to_string(),
            ref_filter: Some("refs/heads/release".to_string()),
        });
        let headers = signed_headers(PUSH_FIXTURE);

        let err = receiver
            .receive(&cancel, &Method::POST, &headers, PUSH_FIXTURE)
            .unwrap_err();
        match err {
            Rejection::RefMismatch { expected, actual } => {
                assert_eq!(expected, "refs/heads/release");
                assert_eq!(actual, "refs/heads/main");
            }
            other => panic!("unexpected rejection: {other}"),
        }
    }

    #[test]
    fn ref_filter_on_unparsable_body_is_a_parse_error() {
        let cancel = CancellationToken::new();
        let receiver = GithubReceiver::new(ReceiverConfig {
            secret: SECRET.to_string(),
            ref_filter: Some("refs/heads/main".to_string()),
        });

        let body: &[u8] = b"not json";
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            sign(body, SECRET.as_bytes()).parse().unwrap(),
        );

        let err = receiver
            .receive(&cancel, &Method::POST, &headers, body)
            .unwrap_err();
        assert!(matches!(err, Rejection::Parse(_)));
    }

    #[test]
    fn from_descriptor_parses_secret_and_ref() {
        let d = Descriptor::parse("github://?secret=s33kret&ref=refs/heads/main").unwrap();
        let receiver = GithubReceiver::from_descriptor(&d).unwrap();

        assert_eq!(receiver.secret, "s33kret");
        assert_eq!(receiver.ref_filter.as_deref(), Some("refs/heads/main"));
    }

    #[test]
    fn from_descriptor_defaults() {
        let d = Descriptor::parse("github://").unwrap();
        let receiver = GithubReceiver::from_descriptor(&d).unwrap();

        assert_eq!(receiver.secret, "");
        assert!(receiver.ref_filter.is_none());
    }

    #[test]
    fn from_descriptor_rejects_unknown_keys() {
        let d = Descriptor::parse("github://?sekret=typo").unwrap();
        assert!(matches!(
            GithubReceiver::from_descriptor(&d),
            Err(ConfigError::UnknownKey { .. })
        ));
    }
}
