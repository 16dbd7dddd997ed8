//! The ticket validation state machine.

use crate::config::{AuthMode, FilterConfig};
use crate::error::{FilterError, FilterResult};
use crate::outcome::{AuthDecision, Identity};
use crate::request::RequestContext;
use crate::session::{get_string, CasSession, SessionRegistry};
use crate::validator::TicketValidator;
use casgate_client::ClientError;
use casgate_core::{ProxyGrantingTicket, ServiceTicket};
use casgate_protocol::extract_session_index;
use casgate_store::TicketStore;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond clock, injectable for tests.
pub type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Makes one authentication decision per inbound request.
///
/// Decision priority:
///
/// 1. single-sign-out pushes are intercepted before any ticket logic;
/// 2. a ticket matching the session's last validated (ticket, service)
///    pair is allowed without a CAS round trip — one-time tickets must
///    not be consumed twice;
/// 3. a new ticket is validated against CAS;
/// 4. an existing local session is trusted (unless configured otherwise);
/// 5. a gateway return is allowed through, authenticated or not;
/// 6. everything else redirects to the CAS login page.
pub struct CasFilter {
    validator: Arc<dyn TicketValidator>,
    store: Arc<dyn TicketStore>,
    registry: Arc<dyn SessionRegistry>,
    config: FilterConfig,
    clock: Clock,
}

impl CasFilter {
    #[must_use]
    pub fn new(
        validator: Arc<dyn TicketValidator>,
        store: Arc<dyn TicketStore>,
        registry: Arc<dyn SessionRegistry>,
        config: FilterConfig,
    ) -> Self {
        Self {
            validator,
            store,
            registry,
            config,
            clock: Box::new(system_clock),
        }
    }

    /// Replace the loop-breaker clock. Test seam.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run the state machine for one request.
    pub async fn authenticate(
        &self,
        req: &RequestContext,
        session: &mut dyn CasSession,
    ) -> FilterResult<AuthDecision> {
        if let AuthMode::Fake(fake) = &self.config.auth_mode {
            tracing::warn!(username = %fake.username, "using fake CAS authentication");
            let keys = &self.config.session_keys;
            session.set(&keys.username, json!(fake.username));
            session.set(
                &keys.extra_attributes,
                Value::Object(fake.extra_attributes.clone()),
            );
            return Ok(AuthDecision::Allow(Identity::named(
                fake.username.clone(),
                fake.extra_attributes.clone(),
            )));
        }

        // 1. Single-sign-out runs before any ticket or session logic.
        if self.config.enable_single_sign_out && req.is_post {
            if let Some(payload) = &req.logout_request {
                return Ok(self.intercept_single_sign_out(payload).await);
            }
        }

        let service = self.service_url(req);
        let keys = &self.config.session_keys;

        if let Some(ticket) = &req.ticket {
            // 2. Never revalidate the pair we already validated — the
            // ticket is one-time-use and the user may simply have hit
            // refresh with the ticket still in the URL.
            let last_ticket = get_string(session, &keys.last_valid_ticket);
            let last_service = get_string(session, &keys.last_valid_ticket_service);
            if last_ticket.as_deref() == Some(ticket.as_str())
                && last_service.as_deref() == Some(service.as_str())
            {
                tracing::warn!(
                    %ticket,
                    "re-using previously validated ticket since ticket and service are unchanged"
                );
                return Ok(AuthDecision::Allow(self.identity_from_session(session)));
            }

            // 3. A new ticket: validate it against the CAS server.
            return self.validate_ticket(req, session, ticket, &service).await;
        }

        // 4. Trust an existing local session.
        if !self.config.authenticate_on_every_request {
            if let Some(username) = get_string(session, &keys.username) {
                tracing::debug!(
                    %username,
                    "existing local CAS session; user will not be re-authenticated"
                );
                return Ok(AuthDecision::Allow(self.identity_from_session(session)));
            }
        }

        // 5. Coming back from a gateway round trip.
        let gatewayed = session
            .get(&keys.sent_to_gateway)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if gatewayed {
            session.set(&keys.sent_to_gateway, json!(false));
            if self.config.use_gatewaying {
                tracing::info!(
                    "returning from CAS gateway without a ticket; continuing unauthenticated"
                );
                if get_string(session, &keys.username).is_none() {
                    session.remove(&keys.username);
                }
                return Ok(AuthDecision::Allow(self.identity_from_session(session)));
            }
            tracing::warn!(
                "request was gatewayed but gatewaying is disabled; something is not right"
            );
        }

        // 6. Off to the CAS login page.
        Ok(self.redirect_to_cas(session, &service))
    }

    async fn validate_ticket(
        &self,
        req: &RequestContext,
        session: &mut dyn CasSession,
        ticket: &str,
        service: &str,
    ) -> FilterResult<AuthDecision> {
        let st = ServiceTicket::new(ticket, service, req.renew);
        if st.is_proxy() {
            tracing::debug!(ticket, "ticket carries the PT- prefix; validating as proxy ticket");
        }

        let outcome = match self.validator.validate_service_ticket(&st).await {
            Ok(outcome) => outcome,
            Err(ClientError::Transport(e)) => {
                // Degrade to re-authentication rather than failing the
                // request; no session state has been written yet.
                tracing::warn!(
                    error = %e,
                    "could not reach CAS server; redirecting for re-authentication"
                );
                return Ok(self.redirect_to_cas(session, service));
            }
            Err(e) => return Err(e.into()),
        };

        if !outcome.success {
            tracing::warn!(
                ticket,
                code = ?outcome.failure_code,
                message = ?outcome.failure_message,
                "ticket failed validation"
            );
            if req.expects_html {
                return Ok(self.redirect_to_cas(session, service));
            }
            return Ok(AuthDecision::Unauthorized(json!({
                "error": "unauthorized",
                "code": outcome.failure_code,
                "message": outcome.failure_message,
            })));
        }

        let keys = &self.config.session_keys;
        let username = outcome.user.clone().unwrap_or_default();
        tracing::info!(ticket, service, %username, "ticket is valid");

        session.set(&keys.username, json!(username));
        session.set(
            &keys.extra_attributes,
            Value::Object(outcome.extra_attributes.clone()),
        );
        session.set(&keys.last_valid_ticket, json!(st.ticket));
        session.set(&keys.last_valid_ticket_service, json!(st.service));

        // Record the ticket → session mapping so a later single-sign-out
        // push can find this session. Best-effort.
        if let Err(e) = self
            .store
            .store_service_session(&st.ticket, &session.id())
            .await
        {
            tracing::warn!(error = %e, "failed to record service ticket for single-sign-out");
        }

        if let Some(pgt_iou) = &outcome.pgt_iou {
            self.cache_pgt(session, pgt_iou).await?;
        }

        Ok(AuthDecision::Allow(Identity::named(
            username,
            outcome.extra_attributes,
        )))
    }

    /// Retrieve and cache the PGT for `pgt_iou`, unless the session
    /// already holds a PGT for that IOU. The store entry is single-use,
    /// so the cache is what makes retrieval idempotent from here up.
    async fn cache_pgt(&self, session: &mut dyn CasSession, pgt_iou: &str) -> FilterResult<()> {
        let keys = &self.config.session_keys;
        let cached: Option<ProxyGrantingTicket> = session
            .get(&keys.pgt)
            .and_then(|v| serde_json::from_value(v).ok());

        let fetch = match &cached {
            None => true,
            Some(pgt) => self.config.refetch_pgt_on_iou_change && pgt.iou != pgt_iou,
        };
        if !fetch {
            tracing::debug!(pgt_iou, "PGT already cached; not retrieving again");
            return Ok(());
        }

        tracing::info!(pgt_iou, "validation response carries a PGT IOU; retrieving the PGT");
        match self.validator.retrieve_proxy_granting_ticket(pgt_iou).await {
            Ok(pgt) => {
                session.set(
                    &keys.pgt,
                    json!({ "ticket": pgt.ticket, "iou": pgt.iou }),
                );
                Ok(())
            }
            // An announced-but-missing PGT is a deployment defect (the
            // callback endpoint never stored it), not an auth failure.
            Err(e) => Err(FilterError::PgtRetrieval(e.to_string())),
        }
    }

    async fn intercept_single_sign_out(&self, payload: &str) -> AuthDecision {
        match extract_session_index(payload) {
            Ok(session_index) => match self.store.process_single_sign_out(&session_index).await {
                Ok(Some(session_id)) => {
                    match self.registry.destroy(&session_id).await {
                        Ok(()) => tracing::info!(
                            %session_index,
                            %session_id,
                            "single-sign-out completed"
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            %session_id,
                            "single-sign-out could not destroy the session"
                        ),
                    }
                }
                Ok(None) => tracing::debug!(
                    %session_index,
                    "single-sign-out ticket has no session; it may already be gone"
                ),
                Err(e) => tracing::warn!(error = %e, "single-sign-out lookup failed"),
            },
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable single-sign-out payload");
            }
        }
        // Single-sign-out is best-effort: always acknowledge, never redirect.
        AuthDecision::Intercepted
    }

    fn redirect_to_cas(&self, session: &mut dyn CasSession, service: &str) -> AuthDecision {
        let keys = &self.config.session_keys;
        let mut url = self.validator.add_service_to_login_url(service);

        if self.config.use_gatewaying {
            session.set(&keys.sent_to_gateway, json!(true));
            url.push_str("&gateway=true");
        } else {
            session.set(&keys.sent_to_gateway, json!(false));
        }

        // Loop breaker: a service that drops the ticket (or a clock-skewed
        // CAS server) can bounce the browser here several times per
        // second. Past the threshold, force primary authentication.
        let now = (self.clock)();
        let last = session
            .get(&keys.last_redirect_unix_ms)
            .and_then(|v| v.as_i64());
        let previous = session
            .get(&keys.redirect_retry_count)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let count = match last {
            Some(last) if now.saturating_sub(last) < self.config.redirect_loop_window_ms => {
                previous + 1
            }
            _ => 1,
        };
        session.set(&keys.last_redirect_unix_ms, json!(now));
        session.set(&keys.redirect_retry_count, json!(count));
        if count >= self.config.redirect_loop_threshold {
            tracing::warn!(count, "redirect loop suspected; forcing renew=1 to break it");
            url.push_str("&renew=1");
        }

        tracing::debug!(%url, "redirecting to CAS for authentication");
        AuthDecision::Redirect(url)
    }

    fn identity_from_session(&self, session: &dyn CasSession) -> Identity {
        let keys = &self.config.session_keys;
        let extra_attributes = session
            .get(&keys.extra_attributes)
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_else(Map::new);
        Identity {
            username: get_string(session, &keys.username),
            extra_attributes,
        }
    }

    fn service_url(&self, req: &RequestContext) -> String {
        if let Some(service) = &self.config.service_url {
            tracing::debug!(%service, "using explicitly configured service url");
            return service.clone();
        }
        req.service_url_without_ticket()
    }
}
