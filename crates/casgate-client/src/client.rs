//! The CAS client.

use crate::config::CasConfig;
use crate::error::{ClientError, ClientResult};
use casgate_core::{ProxyGrantingTicket, ProxyTicket, ServiceTicket};
use casgate_protocol::{
    parse_proxy_response, parse_validation_response, ProtocolError, ProxyOutcome,
    ValidationOutcome,
};
use casgate_store::TicketStore;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Brokers all HTTP transactions with the CAS server.
pub struct CasClient {
    config: CasConfig,
    http: reqwest::Client,
    ticket_store: Arc<dyn TicketStore>,
}

impl CasClient {
    /// Build a client from validated configuration. The HTTP connection
    /// pool, timeouts, TLS mode, and outbound proxy are fixed here.
    pub fn new(config: CasConfig, ticket_store: Arc<dyn TicketStore>) -> ClientResult<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .redirect(reqwest::redirect::Policy::none());

        if !config.force_ssl_verification {
            tracing::warn!("TLS certificate verification is disabled for CAS requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let (Some(host), Some(port)) = (config.proxy_host.as_deref(), config.proxy_port) {
            let proxy = reqwest::Proxy::all(format!("http://{host}:{port}"))
                .map_err(|e| ClientError::Configuration(format!("invalid outbound proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            ticket_store,
        })
    }

    /// Build a client with the default ticket store: a
    /// [`casgate_store::LocalDirTicketStore`] under the system temp
    /// directory. Production deployments with more than one worker host
    /// should inject a shared store instead.
    pub fn with_default_store(config: CasConfig) -> ClientResult<Self> {
        let dir = std::env::temp_dir().join("casgate");
        let store = casgate_store::LocalDirTicketStore::new(dir)?;
        Self::new(config, Arc::new(store))
    }

    #[must_use]
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    #[must_use]
    pub fn ticket_store(&self) -> Arc<dyn TicketStore> {
        Arc::clone(&self.ticket_store)
    }

    /// Validate a service (or proxy) ticket against the CAS server.
    #[instrument(skip(self), fields(ticket = %st.ticket, service = %st.service))]
    pub async fn validate_service_ticket(
        &self,
        st: &ServiceTicket,
    ) -> ClientResult<ValidationOutcome> {
        let mut url = self.parse_endpoint(&self.config.validate_url())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("service", &st.service);
            query.append_pair("ticket", &st.ticket);
            if st.renew {
                query.append_pair("renew", "1");
            }
            if let Some(callback) = &self.config.proxy_callback_url {
                query.append_pair("pgtUrl", callback);
            }
        }

        let body = self.fetch_cas_body(url).await?;
        let outcome = parse_validation_response(&body, self.config.attribute_format)?;
        if outcome.success && outcome.user.is_none() {
            return Err(ClientError::Malformed(ProtocolError::MalformedResponse(
                "authenticationSuccess without cas:user".to_string(),
            )));
        }
        if outcome.success {
            tracing::info!(user = ?outcome.user, "ticket is valid");
        } else {
            tracing::warn!(
                code = ?outcome.failure_code,
                message = ?outcome.failure_message,
                "ticket failed validation"
            );
        }
        Ok(outcome)
    }

    /// Request a proxy ticket for `target_service` using a PGT.
    #[instrument(skip(self, pgt))]
    pub async fn request_proxy_ticket(
        &self,
        pgt: &ProxyGrantingTicket,
        target_service: &str,
    ) -> ClientResult<ProxyTicket> {
        let mut url = self.parse_endpoint(&self.config.proxy_url())?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pgt", &pgt.ticket);
            query.append_pair("targetService", target_service);
        }

        let body = self.fetch_cas_body(url).await?;
        match parse_proxy_response(&body)? {
            ProxyOutcome::Granted { proxy_ticket } => {
                tracing::info!(%proxy_ticket, "got proxy ticket");
                Ok(ProxyTicket::new(proxy_ticket, target_service))
            }
            ProxyOutcome::Denied { code, message } => Err(ClientError::ProxyRequestDenied {
                code: code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: message.unwrap_or_default(),
            }),
        }
    }

    /// Exchange a PGT IOU for the PGT pushed to the proxy callback.
    ///
    /// Single-use: the underlying store entry is consumed. A missing
    /// entry means the callback has not arrived (or already ran) and
    /// surfaces as [`casgate_store::TicketStoreError::PgtNotFound`].
    #[instrument(skip(self))]
    pub async fn retrieve_proxy_granting_ticket(
        &self,
        pgt_iou: &str,
    ) -> ClientResult<ProxyGrantingTicket> {
        let pgt = self.ticket_store.retrieve_pgt(pgt_iou).await?;
        Ok(ProxyGrantingTicket::new(pgt, pgt_iou))
    }

    /// Append `service=<url>` to the login URL, merging with any query
    /// string the configured login URL already carries.
    #[must_use]
    pub fn add_service_to_login_url(&self, service_url: &str) -> String {
        let login = self.config.login_url();
        let separator = if login.contains('?') { '&' } else { '?' };
        format!(
            "{login}{separator}service={}",
            urlencoding::encode(service_url)
        )
    }

    /// Build the CAS logout URL. Three mutually exclusive modes, in
    /// priority order:
    ///
    /// 1. `destination`: the URL (with any `ticket` parameter stripped)
    ///    is passed under the configured destination parameter name plus
    ///    `gateway=true`;
    /// 2. `follow_url`: passed as `url`, with the service URL as
    ///    `service`;
    /// 3. otherwise just `service`.
    ///
    /// The parameter asymmetry between the modes is required by CAS
    /// server compatibility; do not normalize it.
    pub fn build_logout_url(
        &self,
        destination: Option<&str>,
        follow_url: Option<&str>,
        service_url: Option<&str>,
    ) -> ClientResult<String> {
        let mut url = self.parse_endpoint(&self.config.logout_url())?;
        let service = service_url.or(self.config.service_url.as_deref());

        if let Some(destination) = destination {
            let cleaned = strip_ticket_param(destination);
            url.query_pairs_mut()
                .append_pair(&self.config.logout_destination_param, &cleaned)
                .append_pair("gateway", "true");
        } else if let Some(follow) = follow_url {
            let mut query = url.query_pairs_mut();
            query.append_pair("url", follow);
            if let Some(service) = service {
                query.append_pair("service", service);
            }
        } else if let Some(service) = service {
            url.query_pairs_mut().append_pair("service", service);
        }

        Ok(url.to_string())
    }

    /// Probe whether the CAS server answers on its login URL.
    pub async fn cas_server_is_up(&self) -> bool {
        match self.http.get(self.config.login_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "CAS server is unreachable");
                false
            }
        }
    }

    fn parse_endpoint(&self, raw: &str) -> ClientResult<Url> {
        Url::parse(raw).map_err(|e| ClientError::Configuration(format!("invalid URL {raw}: {e}")))
    }

    /// GET a CAS endpoint and return the body when the status is in the
    /// parseable set. 422 is a CAS-level "processed but invalid" answer
    /// and still carries a protocol body; everything else non-200 is a
    /// transport failure.
    async fn fetch_cas_body(&self, url: Url) -> ClientResult<String> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ClientError::Transport(format!(
                "unexpected HTTP status {status} from CAS server"
            )));
        }
        Ok(response.text().await?)
    }
}

/// Remove any `ticket` query parameter from a URL. A `ticket` parameter
/// in a post-logout destination would start a redirect loop.
fn strip_ticket_param(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "ticket")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if remaining.is_empty() {
        url.set_query(None);
    } else {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in &remaining {
            query.append_pair(k, v);
        }
    }
    url.to_string()
}
