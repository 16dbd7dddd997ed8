//! Proxy callback handlers.

use crate::error::CallbackError;
use crate::router::CallbackState;
use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Optional `ConnectInfo` extractor.
///
/// axum 0.8 dropped the blanket `Option<T>` extractor impl (it now
/// requires `T: OptionalFromRequestParts`, which `ConnectInfo` does not
/// implement). This wrapper restores the previous behaviour: yield
/// `None` when connection info was not wired up instead of rejecting.
pub struct MaybeConnectInfo(Option<ConnectInfo<SocketAddr>>);

impl<S> FromRequestParts<S> for MaybeConnectInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
                .await
                .ok(),
        ))
    }
}

/// Answer to the parameterless probe some CAS servers send first.
const PROBE_BODY: &str = "Okay, the server is up, but please specify a pgtIou and pgtId.";
/// Acknowledgement for a stored PGT.
const RECEIVED_BODY: &str = "PGT received. Thank you!";

/// Parameters of a PGT push.
///
/// The protocol names the parameter `pgt`, but some CAS servers send
/// `pgtId`; `pgt` takes precedence when both are present.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "pgtIou")]
    pub pgt_iou: Option<String>,
    pub pgt: Option<String>,
    #[serde(rename = "pgtId")]
    pub pgt_id: Option<String>,
}

/// Receive a PGT push via GET.
///
/// GET /cas_proxy_callback/receive_pgt
#[utoipa::path(
    get,
    path = "/cas_proxy_callback/receive_pgt",
    responses(
        (status = 200, description = "PGT stored, or probe acknowledged"),
        (status = 503, description = "Rejected: plaintext transport from a non-loopback peer"),
    ),
    tag = "CAS proxy callback"
)]
pub async fn receive_pgt_get(
    State(state): State<CallbackState>,
    MaybeConnectInfo(connect_info): MaybeConnectInfo,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    receive_pgt(&state, connect_info, &headers, params).await
}

/// Receive a PGT push via POST.
///
/// POST /cas_proxy_callback/receive_pgt
#[utoipa::path(
    post,
    path = "/cas_proxy_callback/receive_pgt",
    responses(
        (status = 200, description = "PGT stored, or probe acknowledged"),
        (status = 503, description = "Rejected: plaintext transport from a non-loopback peer"),
    ),
    tag = "CAS proxy callback"
)]
pub async fn receive_pgt_post(
    State(state): State<CallbackState>,
    MaybeConnectInfo(connect_info): MaybeConnectInfo,
    headers: HeaderMap,
    Form(params): Form<CallbackParams>,
) -> Response {
    receive_pgt(&state, connect_info, &headers, params).await
}

async fn receive_pgt(
    state: &CallbackState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Response {
    if !transport_is_trusted(state, connect_info, headers) {
        tracing::warn!("rejecting proxy callback over untrusted transport");
        return CallbackError::InsecureTransport.into_response();
    }

    let pgt = params.pgt.or(params.pgt_id);
    let (Some(pgt_iou), Some(pgt)) = (params.pgt_iou, pgt) else {
        // CAS probes the endpoint with no parameters before trusting it.
        return PROBE_BODY.into_response();
    };

    match state.store.save_pgt_iou(&pgt_iou, &pgt).await {
        Ok(()) => {
            tracing::info!(%pgt_iou, "received PGT from CAS server");
            RECEIVED_BODY.into_response()
        }
        Err(e) => CallbackError::Store(e).into_response(),
    }
}

/// The push must arrive over TLS (terminated here or at a proxy that
/// vouches via `x-forwarded-proto`) or from loopback.
fn transport_is_trusted(
    state: &CallbackState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
) -> bool {
    if state.tls_terminated {
        return true;
    }
    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"));
    if forwarded_https {
        return true;
    }
    connect_info.is_some_and(|ConnectInfo(addr)| addr.ip().is_loopback())
}
