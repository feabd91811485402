//! Response handling.
//!
//! # Responsibilities
//! - Relay the upstream status and every header unmodified
//! - Stream the upstream body to the client without buffering it
//! - End the body when the upstream exchange outlives its deadline
//! - Log body errors that happen after the status line was sent
//!
//! # Design Decisions
//! - Once streaming starts, failures cannot change the status; they are
//!   logged and the connection is closed

use axum::{
    body::{Body, BodyDataStream, Bytes},
    http::Response,
};
use futures_util::{stream, StreamExt};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

/// Why a relayed body ended early.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream body failed: {0}")]
    Upstream(#[from] axum::Error),

    #[error("upstream body not finished before deadline")]
    DeadlineElapsed,
}

/// Convert an upstream response into a client response.
///
/// The body must finish by `deadline`; a chunk still pending then ends the
/// stream with [`RelayError::DeadlineElapsed`].
pub fn relay_response(upstream: Response<Body>, request_id: &str, deadline: Instant) -> Response<Body> {
    let (parts, body) = upstream.into_parts();
    let state: Option<(BodyDataStream, String)> = Some((body.into_data_stream(), request_id.to_string()));

    let relayed = stream::unfold(state, move |state| async move {
        let (mut data, request_id) = state?;
        match timeout_at(deadline, data.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok::<Bytes, RelayError>(chunk), Some((data, request_id)))),
            Ok(Some(Err(e))) => {
                tracing::warn!(request_id = %request_id, error = %e, "Upstream body stream failed");
                Some((Err(RelayError::Upstream(e)), None))
            }
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(request_id = %request_id, "Upstream body timed out");
                Some((Err(RelayError::DeadlineElapsed), None))
            }
        }
    });

    Response::from_parts(parts, Body::from_stream(relayed))
}
