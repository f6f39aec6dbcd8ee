//! The admin HTTP API (spec §6): one `POST` path per resource, each body a
//! tagged `command` enum from [`signpost_api`], each response an
//! [`Envelope`].

mod component;
mod distrib;
mod krs_debug;
mod krs_keys;
mod krs_query;
mod node;
mod node_component;
mod notify;
mod service;
mod service_component;
mod service_transaction;
mod zone;

use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use domain::base::Name;

use crate::center::Center;
use crate::error::KdcError;
use signpost_api::{ApiErrorKind, Envelope};

/// Build the admin HTTP API router (both daemons mount this; a KRS simply
/// never receives traffic on the KDC-only paths from a well-behaved CLI).
pub fn router(center: Arc<Center>) -> Router {
    Router::new()
        .route("/kdc/zone", post(zone::handle))
        .route("/kdc/node", post(node::handle))
        .route("/kdc/service", post(service::handle))
        .route("/kdc/component", post(component::handle))
        .route("/kdc/service-component", post(service_component::handle))
        .route("/kdc/node-component", post(node_component::handle))
        .route("/kdc/service-transaction", post(service_transaction::handle))
        .route("/kdc/distrib", post(distrib::handle))
        .route("/krs/keys", post(krs_keys::handle))
        .route("/krs/query", post(krs_query::handle))
        .route("/krs/debug", post(krs_debug::handle))
        .route("/notify", post(notify::handle))
        .route("/metrics", axum::routing::get(metrics))
        .with_state(center)
}

/// Prometheus text exposition of [`crate::metrics::Metrics`].
async fn metrics(axum::extract::State(center): axum::extract::State<Arc<Center>>) -> Result<String, axum::http::StatusCode> {
    center
        .metrics
        .assemble(&center.pool)
        .await
        .map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)
}

/// Turn a `Result` into the `{time, error?, error_msg?, ...}` envelope spec
/// §6 calls for, logging failures at the kind's natural severity and
/// answering with HTTP 200 on success or the kind's 4xx on failure.
pub(crate) fn respond<T>(result: Result<T, KdcError>) -> (StatusCode, axum::Json<Envelope<T>>) {
    match result {
        Ok(data) => (StatusCode::OK, axum::Json(Envelope::ok(data))),
        Err(e) => {
            tracing::warn!("Admin API call failed: {e}");
            let status = status_for(e.kind());
            (status, axum::Json(Envelope::err(e)))
        }
    }
}

/// Map a [`KdcError`] kind to the 4xx status spec §6's "400 on bad input"
/// generalizes to: the kind a client can act on drives the code.
fn status_for(kind: ApiErrorKind) -> StatusCode {
    match kind {
        ApiErrorKind::Validation => StatusCode::BAD_REQUEST,
        ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
        ApiErrorKind::Conflict => StatusCode::CONFLICT,
        ApiErrorKind::Freshness => StatusCode::BAD_REQUEST,
        ApiErrorKind::CryptoFailure | ApiErrorKind::TransportFailure | ApiErrorKind::Persistence => StatusCode::BAD_REQUEST,
    }
}

/// Parse a catalog-stored plain `String` FQDN back into a `Name<Bytes>` for
/// a DTO, failing loudly rather than silently on stored data corruption.
pub(crate) fn fqdn(name: &str) -> Result<Name<Bytes>, KdcError> {
    Name::from_str(name).map_err(|_| KdcError::Validation(format!("invalid FQDN stored in catalog: '{name}'")))
}
