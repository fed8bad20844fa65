//! Credential handling and input validation.
//!
//! Secrets are kept in [`SecureString`] so they are wiped on drop and never
//! show up in `Debug` output. The validators here run before any request is
//! sent: SQL text goes through DataFusion's SQL parser, and alert payloads
//! are checked for a well-formed KSUID and a URL-safe name.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use datafusion::sql::parser::DFParser;
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{OpenObserveError, Result};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Builds the value of an `Authorization` header for HTTP Basic auth.
///
/// # Examples
/// ```rust
/// use oo_client::security::{basic_auth_value, SecureString};
///
/// let header = basic_auth_value("root@example.com", &SecureString::new("secret"));
/// assert_eq!(header.expose(), "Basic cm9vdEBleGFtcGxlLmNvbTpzZWNyZXQ=");
/// ```
pub fn basic_auth_value(user: &str, password: &SecureString) -> SecureString {
    let mut raw = format!("{user}:{}", password.expose());
    let encoded = STANDARD.encode(raw.as_bytes());
    raw.zeroize();
    SecureString::new(format!("Basic {encoded}"))
}

static KSUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is compile-time constant and known to be valid
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9]{27}$").expect("Hard-coded regex pattern should be valid")
});

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"^[^:#?&%"'\s]+$"#).expect("Hard-coded regex pattern should be valid")
});

/// Input validation for identifiers and names sent to the server.
pub struct InputValidator;

impl InputValidator {
    /// Returns true if the input looks like a KSUID (27 alphanumerics).
    pub fn is_ksuid(value: &str) -> bool {
        KSUID_REGEX.is_match(value)
    }

    /// Returns true if the input is usable as an object name in a URL path.
    ///
    /// Names may not be empty and may not contain whitespace, quotes or any of
    /// `: # ? & %`.
    pub fn is_name(value: &str) -> bool {
        NAME_REGEX.is_match(value)
    }
}

/// Local syntax check for search SQL.
pub struct SqlValidator;

impl SqlValidator {
    /// Parses `sql` and fails if it is not syntactically valid.
    ///
    /// Only the syntax is checked. Whether the server's dialect accepts the
    /// statement is still decided remotely.
    pub fn validate(sql: &str) -> Result<()> {
        if sql.trim().is_empty() {
            return Err(OpenObserveError::InvalidSql {
                message: "sql must contain a statement".to_string(),
            });
        }

        let statements = DFParser::parse_sql(sql).map_err(|e| OpenObserveError::InvalidSql {
            message: e.to_string(),
        })?;

        if statements.is_empty() {
            return Err(OpenObserveError::InvalidSql {
                message: "sql must contain a statement".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug_is_redacted() {
        let secure = SecureString::new("secret123");
        assert_eq!(format!("{secure:?}"), "SecureString(***)");
        assert_eq!(secure.expose(), "secret123");
        assert_eq!(secure.into_string(), "secret123");
    }

    #[test]
    fn test_basic_auth_value() {
        let header = basic_auth_value("user", &SecureString::new("pass"));
        assert_eq!(header.expose(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_ksuid_validation() {
        assert!(InputValidator::is_ksuid("2u5huhHK59KnKur8ih1QuiUmABC"));
        assert!(InputValidator::is_ksuid("ksuid1234567890abcdefghijkl"));
        assert!(!InputValidator::is_ksuid("ksuid-1234567890abcdefghijklmno"));
        assert!(!InputValidator::is_ksuid("short"));
        assert!(!InputValidator::is_ksuid(""));
    }

    #[test]
    fn test_name_validation() {
        assert!(InputValidator::is_name("pytest_alert"));
        assert!(InputValidator::is_name("alert-destination-email"));
        assert!(!InputValidator::is_name("Test Alert"));
        assert!(!InputValidator::is_name("a:b"));
        assert!(!InputValidator::is_name("what?"));
        assert!(!InputValidator::is_name("it's"));
        assert!(!InputValidator::is_name(""));
    }

    #[test]
    fn test_valid_sql() {
        assert!(SqlValidator::validate(
            r#"SELECT log_file_name,count(*) FROM "default" GROUP BY log_file_name"#
        )
        .is_ok());
        assert!(SqlValidator::validate(
            r#"SELECT * FROM "kunai" WHERE data_path LIKE '/etc/sudoers.d/%' LIMIT 1"#
        )
        .is_ok());
    }

    #[test]
    fn test_invalid_sql() {
        let err = SqlValidator::validate(r#"SELECT _timestamp FROM (SELECT _timestamp FROM "default""#)
            .unwrap_err();
        assert!(matches!(err, OpenObserveError::InvalidSql { .. }));

        assert!(SqlValidator::validate("INVALID").is_err());
        assert!(SqlValidator::validate("   ").is_err());
    }
}
