//! What the filter needs to know about an inbound request.

use url::Url;

/// Framework-independent view of one inbound request.
///
/// The adapter builds this from the real request; the filter never sees
/// headers, cookies, or bodies beyond what is captured here.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Full request URL, query string included.
    pub url: String,
    /// The `ticket` query parameter, if present.
    pub ticket: Option<String>,
    /// The `renew` query parameter.
    pub renew: bool,
    /// The `logoutRequest` POST field, if present (single-sign-out push).
    pub logout_request: Option<String>,
    /// Whether this is a POST request.
    pub is_post: bool,
    /// Whether the client negotiated an HTML response. Non-HTML clients
    /// get a structured 401 instead of a login redirect.
    pub expects_html: bool,
}

impl RequestContext {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ticket: None,
            renew: false,
            logout_request: None,
            is_post: false,
            expects_html: true,
        }
    }

    #[must_use]
    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    #[must_use]
    pub fn with_logout_request(mut self, payload: impl Into<String>) -> Self {
        self.logout_request = Some(payload.into());
        self.is_post = true;
        self
    }

    /// The request URL with any `ticket` query parameter removed — a
    /// `ticket` parameter inside the service URL would make the CAS
    /// server issue tickets for a URL that still carries one, looping the
    /// redirect dance forever.
    #[must_use]
    pub fn service_url_without_ticket(&self) -> String {
        let Ok(mut url) = Url::parse(&self.url) else {
            return self.url.clone();
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
}
