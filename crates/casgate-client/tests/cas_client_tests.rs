//! Integration tests for `CasClient` against a mock CAS server.

use casgate_client::{CasClient, CasConfig, ClientError};
use casgate_core::{ProxyGrantingTicket, ServiceTicket};
use casgate_store::{InMemoryTicketStore, TicketStore, TicketStoreError};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUCCESS_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>alice</cas:user>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;

const FAILURE_XML: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="INVALID_TICKET">Ticket ST-1 not recognized</cas:authenticationFailure>
</cas:serviceResponse>"#;

fn client_for(server: &MockServer) -> CasClient {
    CasClient::new(
        CasConfig::new(server.uri()),
        Arc::new(InMemoryTicketStore::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn validates_a_service_ticket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .and(query_param("service", "https://app.example.com/"))
        .and(query_param("ticket", "ST-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_XML))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let st = ServiceTicket::new("ST-1", "https://app.example.com/", false);
    let outcome = client.validate_service_ticket(&st).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.user.as_deref(), Some("alice"));
}

#[tokio::test]
async fn sends_renew_and_pgt_url_only_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .and(query_param("renew", "1"))
        .and(query_param("pgtUrl", "https://app.example.com/cas_proxy_callback/receive_pgt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_XML))
        .mount(&server)
        .await;

    let config = CasConfig::new(server.uri())
        .with_proxy_callback_url("https://app.example.com/cas_proxy_callback/receive_pgt");
    let client = CasClient::new(config, Arc::new(InMemoryTicketStore::new())).unwrap();

    let st = ServiceTicket::new("ST-2", "https://app.example.com/", true);
    client.validate_service_ticket(&st).await.unwrap();
    // The mock's matchers are the assertion: a request without renew=1
    // and pgtUrl would not match and the call would fail with a 404.
}

#[tokio::test]
async fn a_422_body_is_still_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .respond_with(ResponseTemplate::new(422).set_body_string(FAILURE_XML))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let st = ServiceTicket::new("ST-1", "https://app.example.com/", false);
    let outcome = client.validate_service_ticket(&st).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.failure_code.as_deref(), Some("INVALID_TICKET"));
    assert_eq!(
        outcome.failure_message.as_deref(),
        Some("Ticket ST-1 not recognized")
    );
}

#[tokio::test]
async fn other_statuses_are_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let st = ServiceTicket::new("ST-1", "https://app.example.com/", false);
    let err = client.validate_service_ticket(&st).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn an_unparseable_body_is_a_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let st = ServiceTicket::new("ST-1", "https://app.example.com/", false);
    let err = client.validate_service_ticket(&st).await.unwrap_err();
    assert!(matches!(err, ClientError::Malformed(_)));
}

#[tokio::test]
async fn legacy_plaintext_servers_are_understood() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxyValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("yes\nbob\n"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let st = ServiceTicket::new("ST-1", "https://app.example.com/", false);
    let outcome = client.validate_service_ticket(&st).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.user.as_deref(), Some("bob"));
}

#[tokio::test]
async fn requests_a_proxy_ticket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("pgt", "PGT-1"))
        .and(query_param("targetService", "https://backend.example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:proxySuccess><cas:proxyTicket>PT-57-abc</cas:proxyTicket></cas:proxySuccess>
</cas:serviceResponse>"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let pgt = ProxyGrantingTicket::new("PGT-1", "PGTIOU-1");
    let pt = client
        .request_proxy_ticket(&pgt, "https://backend.example.com/")
        .await
        .unwrap();
    assert_eq!(pt.ticket, "PT-57-abc");
    assert_eq!(pt.target_service, "https://backend.example.com/");
}

#[tokio::test]
async fn a_denied_proxy_request_carries_the_failure_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:proxyFailure code="BAD_PGT">unknown pgt</cas:proxyFailure>
</cas:serviceResponse>"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let pgt = ProxyGrantingTicket::new("PGT-bogus", "PGTIOU-1");
    let err = client
        .request_proxy_ticket(&pgt, "https://backend.example.com/")
        .await
        .unwrap_err();
    match err {
        ClientError::ProxyRequestDenied { code, message } => {
            assert_eq!(code, "BAD_PGT");
            assert_eq!(message, "unknown pgt");
        }
        other => panic!("expected ProxyRequestDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn pgt_retrieval_consumes_the_store_entry() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemoryTicketStore::new());
    store.save_pgt_iou("PGTIOU-9", "PGT-9").await.unwrap();

    let client = CasClient::new(CasConfig::new(server.uri()), store).unwrap();

    let pgt = client.retrieve_proxy_granting_ticket("PGTIOU-9").await.unwrap();
    assert_eq!(pgt.ticket, "PGT-9");
    assert_eq!(pgt.iou, "PGTIOU-9");

    // single-use: a second retrieval fails with the not-found class
    let err = client
        .retrieve_proxy_granting_ticket("PGTIOU-9")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::TicketStore(TicketStoreError::PgtNotFound(_))
    ));
}

#[tokio::test]
async fn probes_server_liveness() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.cas_server_is_up().await);

    let dead = CasClient::new(
        CasConfig::new("http://127.0.0.1:1"),
        Arc::new(InMemoryTicketStore::new()),
    )
    .unwrap();
    assert!(!dead.cas_server_is_up().await);
}
