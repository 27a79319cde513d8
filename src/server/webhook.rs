//! Webhook endpoint handler.
//!
//! Runs the full pipeline for one delivery: receiver checks, then each
//! configured transformation in sequence over the authenticated payload.
//! The final output is returned as the response body; classification of
//! failures into HTTP status codes happens only here.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use super::AppState;
use crate::receiver::Rejection;
use crate::transform::Transform;

/// Webhook handler.
///
/// # Response
///
/// - 200 OK: delivery accepted; body is the transformed output (empty when
///   a halt predicate matched)
/// - 204 No Content: ping handshake acknowledged
/// - 400 Bad Request: missing event header or unparsable payload
/// - 403 Forbidden: missing or failed signature verification
/// - 405 Method Not Allowed: non-POST delivery
/// - 409 Conflict: push targeted a ref other than the configured filter
/// - 503 Service Unavailable: server is shutting down
pub async fn webhook_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received = state
        .receiver()
        .receive(state.cancel(), &method, &headers, body.as_ref());

    let payload = match received {
        Ok(Some(payload)) => payload,
        Ok(None) => return shutting_down(),
        Err(Rejection::Ping) => {
            debug!("acknowledged ping handshake");
            return StatusCode::NO_CONTENT.into_response();
        }
        Err(rejection) => {
            warn!(error = %rejection, "rejected webhook delivery");
            return (rejection_status(&rejection), rejection.to_string()).into_response();
        }
    };

    let mut output = payload;
    for transformer in state.transformers() {
        match transformer.transform(state.cancel(), &output) {
            Ok(Some(next)) => output = next,
            Ok(None) => return shutting_down(),
            Err(err) if err.is_halt() => {
                debug!("transformation halted the event");
                return (StatusCode::OK, Vec::new()).into_response();
            }
            Err(err) => {
                warn!(error = %err, "transformation failed");
                return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
            }
        }
    }

    info!(bytes = output.len(), "webhook delivery transformed");
    (StatusCode::OK, output).into_response()
}

fn shutting_down() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response()
}

/// Maps a receiver rejection to an HTTP status code.
fn rejection_status(rejection: &Rejection) -> StatusCode {
    match rejection {
        Rejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        Rejection::MissingEventHeader => StatusCode::BAD_REQUEST,
        Rejection::MissingSignatureHeader => StatusCode::FORBIDDEN,
        Rejection::Ping => StatusCode::NO_CONTENT,
        Rejection::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Rejection::InvalidSignature => StatusCode::FORBIDDEN,
        Rejection::Parse(_) => StatusCode::BAD_REQUEST,
        Rejection::RefMismatch { .. } => StatusCode::CONFLICT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    use crate::receiver::{GithubReceiver, ReceiverConfig, HEADER_EVENT, HEADER_SIGNATURE};
    use crate::registry::Registry;
    use crate::signature::sign;

    const PUSH_FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/push.json");
    const SECRET: &str = "s33kret";

    fn test_state(transformer_uri: &str) -> AppState {
        let receiver = GithubReceiver::new(ReceiverConfig {
            secret: SECRET.to_string(),
            ref_filter: None,
        });
        let transformer = Registry::with_defaults()
            .transformer(transformer_uri)
            .unwrap();
        AppState::new(receiver, vec![transformer], CancellationToken::new())
    }

    fn signed_headers(payload: &[u8], event_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, event_type.parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            sign(payload, SECRET.as_bytes()).parse().unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn signed_push_is_accepted() {
        let state = test_state("githubcommits://");
        let headers = signed_headers(PUSH_FIXTURE, "push");

        let response = webhook_handler(
            State(state),
            Method::POST,
            headers,
            Bytes::from_static(PUSH_FIXTURE),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forged_signature_is_forbidden() {
        let state = test_state("githubcommits://");
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());
        headers.insert(
            HEADER_SIGNATURE,
            "sha1=0000000000000000000000000000000000000000"
                .parse()
                .unwrap(),
        );

        let response = webhook_handler(
            State(state),
            Method::POST,
            headers,
            Bytes::from_static(PUSH_FIXTURE),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn ping_returns_no_content() {
        let state = test_state("githubcommits://");
        let headers = signed_headers(PUSH_FIXTURE, "ping");

        let response = webhook_handler(
            State(state),
            Method::POST,
            headers,
            Bytes::from_static(PUSH_FIXTURE),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn halt_is_ok_with_empty_body() {
        let state = test_state("githubcommits://?halt_on_message=SWIM");
        let headers = signed_headers(PUSH_FIXTURE, "push");

        let response = webhook_handler(
            State(state),
            Method::POST,
            headers,
            Bytes::from_static(PUSH_FIXTURE),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_post_is_method_not_allowed() {
        let state = test_state("githubcommits://");
        let headers = signed_headers(PUSH_FIXTURE, "push");

        let response = webhook_handler(
            State(state),
            Method::GET,
            headers,
            Bytes::from_static(PUSH_FIXTURE),
        )
        .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn rejection_status_mapping() {
        assert_eq!(
            rejection_status(&Rejection::MethodNotAllowed),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            rejection_status(&Rejection::MissingEventHeader),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            rejection_status(&Rejection::MissingSignatureHeader),
            StatusCode::FORBIDDEN
        );
        assert_eq!(rejection_status(&Rejection::Ping), StatusCode::NO_CONTENT);
        assert_eq!(
            rejection_status(&Rejection::InvalidSignature),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            rejection_status(&Rejection::RefMismatch {
                expected: "refs/heads/main".to_string(),
                actual: "refs/heads/dev".to_string(),
            }),
            StatusCode::CONFLICT
        );
    }
}
