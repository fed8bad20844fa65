use std::time::Duration;

use crate::error::{OpenObserveError, Result};
use crate::security::{basic_auth_value, SecureString};

/// Placeholder substituted with the endpoint path on every call.
pub const STREAM_PLACEHOLDER: &str = "[STREAM]";

const DEFAULT_HOST: &str = "http://localhost:5080";
const DEFAULT_ORGANISATION: &str = "default";

/// Connection settings for an OpenObserve instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    user: String,
    password: SecureString,
    organisation: String,
    host: String,
    verify: bool,
    timeout: Duration,
    search_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given credentials with default settings.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecureString::new(password.into()),
            organisation: DEFAULT_ORGANISATION.to_string(),
            host: DEFAULT_HOST.to_string(),
            verify: true,
            timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(300),
        }
    }

    /// Build a configuration from `OO_HOST`, `OO_USER`, `OO_PASS` and `OO_ORG`.
    ///
    /// User and password are required; host and organisation keep their
    /// defaults when unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| OpenObserveError::Configuration {
                message: format!("{key} is not set"),
            })
        };
        let user = required("OO_USER")?;
        let password = required("OO_PASS")?;

        let mut config = Self::new(user, password);
        if let Some(host) = lookup("OO_HOST") {
            config = config.with_host(host);
        }
        if let Some(org) = lookup("OO_ORG") {
            config = config.with_organisation(org);
        }
        Ok(config)
    }

    /// Set the organisation (`default`, `_meta`, ...).
    pub fn with_organisation(mut self, organisation: impl Into<String>) -> Self {
        self.organisation = organisation.into();
        self
    }

    /// Set the base URL of the instance.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the HTTP timeout for object and ingestion calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default HTTP timeout for search calls.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Get the password.
    ///
    /// # Security
    /// Returns a reference to the secure string. Use `expose()` to access
    /// the underlying value. Avoid storing or logging the exposed value.
    pub fn password(&self) -> &SecureString {
        &self.password
    }

    pub fn organisation(&self) -> &str {
        &self.organisation
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn search_timeout(&self) -> Duration {
        self.search_timeout
    }

    /// The `Authorization` header value for these credentials.
    pub fn basic_auth_header(&self) -> SecureString {
        basic_auth_value(&self.user, &self.password)
    }

    /// URL template with a `[STREAM]` placeholder, e.g.
    /// `http://localhost:5080/api/default/[STREAM]`.
    pub fn url_template(&self) -> String {
        format!(
            "{}/api/{}/{STREAM_PLACEHOLDER}",
            self.host, self.organisation
        )
    }

    /// Same as [`url_template`](Self::url_template) for the `/api/v2` routes.
    pub fn url_template_v2(&self) -> String {
        format!(
            "{}/api/v2/{}/{STREAM_PLACEHOLDER}",
            self.host, self.organisation
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("root@example.com", "secret");
        assert_eq!(config.organisation(), "default");
        assert_eq!(config.host(), "http://localhost:5080");
        assert!(config.verify());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.search_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_url_templates() {
        let config = ClientConfig::new("u", "p")
            .with_host("https://oo.example.com/")
            .with_organisation("_meta");
        assert_eq!(
            config.url_template(),
            "https://oo.example.com/api/_meta/[STREAM]"
        );
        assert_eq!(
            config.url_template_v2(),
            "https://oo.example.com/api/v2/_meta/[STREAM]"
        );
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("OO_USER", "root@example.com"),
            ("OO_PASS", "secret"),
            ("OO_HOST", "https://oo.example.com/"),
            ("OO_ORG", "_meta"),
        ]))
        .unwrap();
        assert_eq!(config.user(), "root@example.com");
        assert_eq!(config.password().expose(), "secret");
        assert_eq!(config.host(), "https://oo.example.com");
        assert_eq!(config.organisation(), "_meta");
    }

    #[test]
    fn test_from_lookup_keeps_defaults() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("OO_USER", "u"), ("OO_PASS", "p")])).unwrap();
        assert_eq!(config.host(), "http://localhost:5080");
        assert_eq!(config.organisation(), "default");
    }

    #[test]
    fn test_from_lookup_requires_credentials() {
        let err = ClientConfig::from_lookup(lookup_from(&[("OO_PASS", "p")])).unwrap_err();
        assert!(matches!(err, OpenObserveError::Configuration { .. }));
        assert!(err.to_string().contains("OO_USER is not set"));

        let err = ClientConfig::from_lookup(lookup_from(&[("OO_USER", "u")])).unwrap_err();
        assert!(err.to_string().contains("OO_PASS is not set"));
    }

    // The only test in this crate that touches the process environment.
    #[test]
    fn test_from_env() {
        std::env::remove_var("OO_USER");
        std::env::remove_var("OO_PASS");
        std::env::remove_var("OO_HOST");
        std::env::remove_var("OO_ORG");
        let err = ClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("OO_USER is not set"));

        std::env::set_var("OO_USER", "root@example.com");
        let err = ClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("OO_PASS is not set"));

        std::env::set_var("OO_PASS", "secret");
        std::env::set_var("OO_HOST", "https://oo.example.com/");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.user(), "root@example.com");
        assert_eq!(config.host(), "https://oo.example.com");
        assert_eq!(config.organisation(), "default");

        for key in ["OO_USER", "OO_PASS", "OO_HOST"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = ClientConfig::new("u", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
        assert_eq!(config.basic_auth_header().expose(), "Basic dTpodW50ZXIy");
    }
}
