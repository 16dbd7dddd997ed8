//! Integration tests for the proxy callback endpoint.

use axum::body::Body;
use axum::http::Request;
use casgate_callback::{callback_router, CallbackState};
use casgate_store::{InMemoryTicketStore, TicketStore};
use std::sync::Arc;
use tower::ServiceExt;

fn trusted_state() -> (Arc<InMemoryTicketStore>, CallbackState) {
    let store = Arc::new(InMemoryTicketStore::new());
    let state = CallbackState::new(Arc::clone(&store) as Arc<dyn TicketStore>)
        .with_tls_terminated(true);
    (store, state)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn stores_a_pushed_pgt_from_query_params() {
    let (store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgtIou=PGTIOU-1&pgt=PGT-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(body_string(response).await, "PGT received. Thank you!");
    assert_eq!(store.retrieve_pgt("PGTIOU-1").await.unwrap(), "PGT-1");
}

#[tokio::test]
async fn accepts_the_pgt_id_fallback_parameter() {
    let (store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgtIou=PGTIOU-2&pgtId=PGT-2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.retrieve_pgt("PGTIOU-2").await.unwrap(), "PGT-2");
}

#[tokio::test]
async fn pgt_takes_precedence_over_pgt_id() {
    let (store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgtIou=PGTIOU-3&pgt=PGT-real&pgtId=PGT-other")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.retrieve_pgt("PGTIOU-3").await.unwrap(), "PGT-real");
}

#[tokio::test]
async fn a_parameterless_probe_gets_an_informational_200() {
    let (store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(body_string(response).await.contains("specify a pgtIou"));
    // nothing was stored
    assert!(store.retrieve_pgt("PGTIOU-1").await.is_err());
}

#[tokio::test]
async fn a_push_missing_the_iou_is_treated_as_a_probe() {
    let (_store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgt=PGT-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(body_string(response).await.contains("specify a pgtIou"));
}

#[tokio::test]
async fn accepts_a_form_encoded_post() {
    let (store, state) = trusted_state();
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cas_proxy_callback/receive_pgt")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("pgtIou=PGTIOU-4&pgt=PGT-4"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.retrieve_pgt("PGTIOU-4").await.unwrap(), "PGT-4");
}

#[tokio::test]
async fn plaintext_pushes_from_unknown_peers_are_rejected() {
    let store = Arc::new(InMemoryTicketStore::new());
    let state = CallbackState::new(Arc::clone(&store) as Arc<dyn TicketStore>);
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgtIou=PGTIOU-5&pgt=PGT-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    assert!(store.retrieve_pgt("PGTIOU-5").await.is_err());
}

#[tokio::test]
async fn a_tls_terminating_proxy_can_vouch_with_forwarded_proto() {
    let store = Arc::new(InMemoryTicketStore::new());
    let state = CallbackState::new(Arc::clone(&store) as Arc<dyn TicketStore>);
    let app = callback_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/cas_proxy_callback/receive_pgt?pgtIou=PGTIOU-6&pgt=PGT-6")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(store.retrieve_pgt("PGTIOU-6").await.unwrap(), "PGT-6");
}
