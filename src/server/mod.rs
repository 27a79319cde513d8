//! HTTP adapter for the webhook pipeline.
//!
//! This module owns everything HTTP-specific: routing state, the webhook
//! endpoint that maps pipeline outcomes to status codes, and a health
//! endpoint for liveness probes. The core receiver and transformations
//! know nothing about HTTP status codes or logging; both live here.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts webhook deliveries, returns the transformed
//!   output
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::receiver::GithubReceiver;
use crate::transform::Transform;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state, passed to handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Authenticates inbound deliveries.
    receiver: GithubReceiver,

    /// Transformations applied in sequence to the authenticated payload.
    transformers: Vec<Box<dyn Transform>>,

    /// Cancelled on shutdown; in-flight requests observe it at entry to
    /// each pipeline stage.
    cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        receiver: GithubReceiver,
        transformers: Vec<Box<dyn Transform>>,
        cancel: CancellationToken,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                receiver,
                transformers,
                cancel,
            }),
        }
    }

    pub fn receiver(&self) -> &GithubReceiver {
        &self.inner.receiver
    }

    pub fn transformers(&self) -> &[Box<dyn Transform>] {
        &self.inner.transformers
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.inner.cancel
    }
}
