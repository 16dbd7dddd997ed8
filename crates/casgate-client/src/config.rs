//! Client configuration.
//!
//! One [`CasConfig`] is constructed at startup, validated, and injected
//! into [`crate::CasClient`]. Endpoint URLs not set explicitly derive
//! from `cas_base_url` by path suffixing.

use crate::error::{ClientError, ClientResult};
use casgate_protocol::AttributeFormat;
use std::time::Duration;
use url::Url;

/// Configuration for the CAS client.
#[derive(Debug, Clone)]
pub struct CasConfig {
    /// Base URL of the CAS server, e.g. `https://cas.example.com/cas`.
    /// Required; a trailing slash is stripped.
    pub cas_base_url: String,
    /// Override for `<base>/login`.
    pub login_url: Option<String>,
    /// Override for `<base>/proxyValidate`.
    pub validate_url: Option<String>,
    /// Override for `<base>/logout`.
    pub logout_url: Option<String>,
    /// Override for `<base>/proxy`.
    pub proxy_url: Option<String>,
    /// Where the CAS server should push proxy-granting tickets. Setting
    /// this adds `pgtUrl` to every validation request.
    pub proxy_callback_url: Option<String>,
    /// Fixed service URL; when unset the filter guesses from the request.
    pub service_url: Option<String>,
    /// Verify the CAS server's TLS certificate. Disable only against test
    /// servers with self-signed certificates.
    pub force_ssl_verification: bool,
    /// Outbound HTTP proxy host.
    pub proxy_host: Option<String>,
    /// Outbound HTTP proxy port.
    pub proxy_port: Option<u16>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// How extra attributes in validation responses are decoded.
    pub attribute_format: AttributeFormat,
    /// Query parameter name used for the destination-style logout URL.
    pub logout_destination_param: String,
}

impl CasConfig {
    #[must_use]
    pub fn new(cas_base_url: impl Into<String>) -> Self {
        let cas_base_url = cas_base_url.into().trim_end_matches('/').to_string();
        Self {
            cas_base_url,
            login_url: None,
            validate_url: None,
            logout_url: None,
            proxy_url: None,
            proxy_callback_url: None,
            service_url: None,
            force_ssl_verification: true,
            proxy_host: None,
            proxy_port: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            attribute_format: AttributeFormat::Raw,
            logout_destination_param: "destination".to_string(),
        }
    }

    #[must_use]
    pub fn with_proxy_callback_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_callback_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_attribute_format(mut self, format: AttributeFormat) -> Self {
        self.attribute_format = format;
        self
    }

    /// Fail fast on unusable configuration; called by `CasClient::new`.
    pub fn validate(&self) -> ClientResult<()> {
        if self.cas_base_url.is_empty() {
            return Err(ClientError::Configuration(
                "missing cas_base_url".to_string(),
            ));
        }
        Url::parse(&self.cas_base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid cas_base_url: {e}"))
        })?;
        if self.proxy_host.is_some() != self.proxy_port.is_some() {
            return Err(ClientError::Configuration(
                "proxy_host and proxy_port must be set together".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn login_url(&self) -> String {
        self.login_url
            .clone()
            .unwrap_or_else(|| format!("{}/login", self.cas_base_url))
    }

    #[must_use]
    pub fn validate_url(&self) -> String {
        self.validate_url
            .clone()
            .unwrap_or_else(|| format!("{}/proxyValidate", self.cas_base_url))
    }

    #[must_use]
    pub fn logout_url(&self) -> String {
        self.logout_url
            .clone()
            .unwrap_or_else(|| format!("{}/logout", self.cas_base_url))
    }

    #[must_use]
    pub fn proxy_url(&self) -> String {
        self.proxy_url
            .clone()
            .unwrap_or_else(|| format!("{}/proxy", self.cas_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoint_urls_from_base() {
        let config = CasConfig::new("https://cas.example.com/cas/");
        assert_eq!(config.cas_base_url, "https://cas.example.com/cas");
        assert_eq!(config.login_url(), "https://cas.example.com/cas/login");
        assert_eq!(
            config.validate_url(),
            "https://cas.example.com/cas/proxyValidate"
        );
        assert_eq!(config.logout_url(), "https://cas.example.com/cas/logout");
        assert_eq!(config.proxy_url(), "https://cas.example.com/cas/proxy");
    }

    #[test]
    fn explicit_urls_win_over_derivation() {
        let mut config = CasConfig::new("https://cas.example.com");
        config.validate_url = Some("https://cas.example.com/serviceValidate".to_string());
        assert_eq!(
            config.validate_url(),
            "https://cas.example.com/serviceValidate"
        );
    }

    #[test]
    fn empty_base_url_fails_validation() {
        let config = CasConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn unparseable_base_url_fails_validation() {
        let config = CasConfig::new("not a url");
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn lone_proxy_host_fails_validation() {
        let mut config = CasConfig::new("https://cas.example.com");
        config.proxy_host = Some("proxy.internal".to_string());
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
    }
}
