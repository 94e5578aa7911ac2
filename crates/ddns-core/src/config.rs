//! Configuration types for the DDNS system
//!
//! The configuration is a TOML file read once per run and immutable for the
//! run's duration:
//!
//! ```toml
//! enable = true
//!
//! [tencent]
//! secretid = "AKIDxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"
//! secretkey = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"
//!
//! [dns]
//! domain = "example.com"
//! subdomain = "home"
//! enableIPv6 = true
//!
//! [ip]
//! trace_url = "https://www.cloudflare.com/cdn-cgi/trace"
//!
//! [log]
//! level = "info"
//! file = "./ddns.log"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::fqdn;

/// Default IP echo endpoint
pub const DEFAULT_TRACE_URL: &str = "https://www.cloudflare.com/cdn-cgi/trace";

/// Main reconcile configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Global on/off switch
    #[serde(default)]
    pub enable: bool,

    /// Provider credential pair
    #[serde(default)]
    pub tencent: Credentials,

    /// Managed name
    #[serde(default)]
    pub dns: DnsConfig,

    /// IP detection settings
    #[serde(default)]
    pub ip: IpConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

impl ReconcileConfig {
    /// Create a configuration for `<subdomain>.<domain>` with defaults
    pub fn new(
        domain: impl Into<String>,
        subdomain: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            enable: true,
            tencent: credentials,
            dns: DnsConfig {
                domain: domain.into(),
                subdomain: subdomain.into(),
                enable_ipv6: false,
            },
            ip: IpConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Enable or disable IPv6 (AAAA) management
    pub fn with_ipv6(mut self, enable_ipv6: bool) -> Self {
        self.dns.enable_ipv6 = enable_ipv6;
        self
    }

    /// Enable or disable the whole run
    pub fn with_enabled(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// Load and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("Invalid TOML: {}", e)))
    }

    /// The fully-qualified name being kept in sync
    pub fn fqdn(&self) -> String {
        fqdn(&self.dns.domain, &self.dns.subdomain)
    }

    /// Validate the configuration
    ///
    /// A disabled configuration is accepted as-is: the run is a no-op and
    /// never touches the credentials or the managed name.
    pub fn validate(&self) -> Result<()> {
        self.log.validate()?;

        if !self.enable {
            return Ok(());
        }

        self.tencent.validate()?;
        self.dns.validate()?;
        self.ip.validate()?;

        Ok(())
    }
}

/// Provider credential pair
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Secret id
    #[serde(rename = "secretid", default)]
    pub secret_id: String,

    /// Secret key
    /// ⚠️ NEVER log this value
    #[serde(rename = "secretkey", default)]
    pub secret_key: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.secret_id.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(Error::config(
                "tencent.secretid and tencent.secretkey are required",
            ));
        }

        for value in [&self.secret_id, &self.secret_key] {
            let lower = value.to_lowercase();
            if lower.contains("your_secret")
                || lower.contains("replace_me")
                || lower.contains("example")
                || lower == "secret"
            {
                return Err(Error::config(
                    "tencent credentials appear to be placeholders. \
                    Use an API key pair from the Tencent Cloud console.",
                ));
            }
        }

        Ok(())
    }
}

// Keeps the secret key out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

/// Managed name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Zone (e.g. "example.com")
    pub domain: String,

    /// Host part (e.g. "home", or "@" for the apex)
    pub subdomain: String,

    /// Whether AAAA records are managed
    #[serde(rename = "enableIPv6", default)]
    pub enable_ipv6: bool,
}

impl DnsConfig {
    fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain)?;

        match self.subdomain.as_str() {
            "" => Err(Error::config(
                "dns.subdomain cannot be empty (use \"@\" for the zone apex)",
            )),
            "@" | "*" => Ok(()),
            sub => {
                let labels = sub.strip_prefix("*.").unwrap_or(sub);
                validate_labels(labels, sub)
            }
        }
    }
}

/// IP detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpConfig {
    /// Trace/echo endpoint returning free text with the caller's address
    #[serde(default = "default_trace_url")]
    pub trace_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpConfig {
    fn validate(&self) -> Result<()> {
        if !self.trace_url.starts_with("https://") && !self.trace_url.starts_with("http://") {
            return Err(Error::config(format!(
                "ip.trace_url must use HTTP or HTTPS scheme. Got: {}",
                self.trace_url
            )));
        }

        if !(1..=300).contains(&self.timeout_secs) {
            return Err(Error::config(format!(
                "ip.timeout_secs must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }

        Ok(())
    }
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            trace_url: default_trace_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LogConfig {
    fn validate(&self) -> Result<()> {
        validate_log_level(&self.level)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Check a log level name
pub fn validate_log_level(level: &str) -> Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(Error::config(format!(
            "log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ))),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches common mistakes, not every invalid name.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("dns.domain cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    if !domain.trim_end_matches('.').contains('.') {
        return Err(Error::config(format!(
            "dns.domain must be a registered zone such as example.com. Got: {}",
            domain
        )));
    }

    validate_labels(domain.trim_end_matches('.'), domain)
}

fn validate_labels(labels: &str, whole: &str) -> Result<()> {
    for label in labels.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                whole
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // Underscore shows up in service labels (_acme-challenge)
        if !label
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_trace_url() -> String {
    DEFAULT_TRACE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
enable = true

[tencent]
secretid = "AKIDz8krbsJ5yKBZQpn74WFkmLPx3gnPhESA"
secretkey = "Gu5t9xGARNpq86cd98joQYCN3Cozk1qA"

[dns]
domain = "example.com"
subdomain = "home"
enableIPv6 = true

[ip]
trace_url = "https://1.1.1.1/cdn-cgi/trace"
timeout_secs = 5

[log]
level = "debug"
file = "./ddns.log"
"#;

    #[test]
    fn parses_full_config() {
        let config = ReconcileConfig::from_toml(FULL).unwrap();

        assert!(config.enable);
        assert_eq!(config.tencent.secret_id, "AKIDz8krbsJ5yKBZQpn74WFkmLPx3gnPhESA");
        assert_eq!(config.dns.domain, "example.com");
        assert_eq!(config.dns.subdomain, "home");
        assert!(config.dns.enable_ipv6);
        assert_eq!(config.ip.trace_url, "https://1.1.1.1/cdn-cgi/trace");
        assert_eq!(config.ip.timeout_secs, 5);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, Some(PathBuf::from("./ddns.log")));
        assert_eq!(config.fqdn(), "home.example.com");
        config.validate().unwrap();
    }

    #[test]
    fn optional_sections_default() {
        let config = ReconcileConfig::from_toml(
            r#"
[dns]
domain = "example.com"
subdomain = "@"
"#,
        )
        .unwrap();

        assert!(!config.enable, "enable defaults to off");
        assert!(!config.dns.enable_ipv6);
        assert_eq!(config.ip.trace_url, DEFAULT_TRACE_URL);
        assert_eq!(config.ip.timeout_secs, 10);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.fqdn(), "example.com");
    }

    #[test]
    fn bare_disable_switch_is_enough() {
        let config = ReconcileConfig::from_toml("enable = false").unwrap();
        assert!(!config.enable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn disabled_config_skips_credential_checks() {
        let config =
            ReconcileConfig::new("example.com", "home", Credentials::default()).with_enabled(false);
        assert!(config.validate().is_ok());

        let config = config.with_enabled(true);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn placeholder_credentials_rejected() {
        let config = ReconcileConfig::new(
            "example.com",
            "home",
            Credentials::new("REPLACE_ME", "REPLACE_ME"),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("placeholders"), "got {err}");
    }

    #[test]
    fn domain_name_validation() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("example.co.uk.").is_ok());
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("localhost").is_err());
        assert!(validate_domain_name("exa mple.com").is_err());
        assert!(validate_domain_name("-example.com").is_err());
        assert!(validate_domain_name("example..com").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn subdomain_validation() {
        let creds = Credentials::new("AKIDz8krbsJ5yKBZQpn74WFkmLPx3gnPhESA", "Gu5t9xGARNpq86cd98joQYCN3Cozk1qA");
        for ok in ["home", "@", "*", "*.lab", "a.b", "_dyn"] {
            let config = ReconcileConfig::new("example.com", ok, creds.clone());
            assert!(config.validate().is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "home.", "bad host", "-home"] {
            let config = ReconcileConfig::new("example.com", bad, creds.clone());
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn trace_url_scheme_checked() {
        let mut config = ReconcileConfig::from_toml(FULL).unwrap();
        config.ip.trace_url = "ftp://example.com/trace".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_log_level_rejected_even_when_disabled() {
        let mut config = ReconcileConfig::from_toml(FULL).unwrap().with_enabled(false);
        config.log.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn secret_key_not_exposed_in_debug() {
        let config = ReconcileConfig::from_toml(FULL).unwrap();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("Gu5t9xGARNpq86cd98joQYCN3Cozk1qA"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ReconcileConfig::load("/nonexistent/ddns/config.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = ReconcileConfig::from_toml("enable = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }
}
