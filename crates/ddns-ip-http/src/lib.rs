// # HTTP IP Detector
//
// Learns the host's public addresses from a trace/echo endpoint that
// returns free text containing the caller's address (by default
// Cloudflare's `/cdn-cgi/trace`, which answers `ip=<addr>`).
//
// ## Detection Policy
//
// 1. GET the endpoint over the default route.
// 2. If the body contains an IPv4 address, that is the answer and IPv6 is
//    left empty.
// 3. Otherwise the body is expected to carry an IPv6 address (the default
//    route prefers v6). Keep it and GET the endpoint again through a client
//    bound to `0.0.0.0`, which forces an IPv4 connection, to learn the IPv4
//    address as well.
//
// The HTTP transport sits behind [`TraceFetcher`] so the policy can be
// exercised without a network.

use ddns_core::config::IpConfig;
use ddns_core::traits::{IpDetector, PublicAddress};
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use regex::Regex;

/// Dotted quad candidate; octet range is checked by the parser
const IPV4_PATTERN: &str = r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+";

/// Loose IPv6 candidate (groups separated by `:` or `::`)
const IPV6_PATTERN: &str = r"(([0-9a-fA-F]{1,4}):{1,2}){2,8}([0-9a-fA-F]{1,4})";

/// Which network path a trace request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Whatever the OS picks (IPv6 preferred on dual-stack hosts)
    Default,
    /// Bound to the IPv4 wildcard address
    Ipv4Only,
}

/// Fetches the trace endpoint body over a given route
#[async_trait::async_trait]
pub trait TraceFetcher: Send + Sync {
    /// Return the response body, or `Error::Network` on any failure
    async fn fetch(&self, route: Route) -> Result<String>;
}

/// [`TraceFetcher`] over `reqwest`
pub struct ReqwestTraceFetcher {
    url: String,
    default_client: reqwest::Client,
    ipv4_client: reqwest::Client,
}

impl ReqwestTraceFetcher {
    /// Create a fetcher for `url` with a per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let default_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::network(format!("Failed to build HTTP client: {}", e)))?;

        let ipv4_client = reqwest::Client::builder()
            .timeout(timeout)
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .build()
            .map_err(|e| Error::network(format!("Failed to build IPv4 HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            default_client,
            ipv4_client,
        })
    }

    fn client(&self, route: Route) -> &reqwest::Client {
        match route {
            Route::Default => &self.default_client,
            Route::Ipv4Only => &self.ipv4_client,
        }
    }
}

#[async_trait::async_trait]
impl TraceFetcher for ReqwestTraceFetcher {
    async fn fetch(&self, route: Route) -> Result<String> {
        tracing::debug!("GET {} ({:?} route)", self.url, route);

        let response = self
            .client(route)
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))
    }
}

/// Pulls addresses out of free-form text
#[derive(Debug, Clone)]
pub struct AddressScanner {
    ipv4: Regex,
    ipv6: Regex,
}

impl AddressScanner {
    /// Compile the address patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            ipv4: Regex::new(IPV4_PATTERN)
                .map_err(|e| Error::Other(format!("Invalid IPv4 pattern: {}", e)))?,
            ipv6: Regex::new(IPV6_PATTERN)
                .map_err(|e| Error::Other(format!("Invalid IPv6 pattern: {}", e)))?,
        })
    }

    /// First dotted quad in `text` that is a valid IPv4 address
    pub fn first_ipv4(&self, text: &str) -> Option<Ipv4Addr> {
        self.ipv4
            .find_iter(text)
            .find_map(|m| m.as_str().parse().ok())
    }

    /// First candidate in `text` that is a valid IPv6 address
    pub fn first_ipv6(&self, text: &str) -> Option<Ipv6Addr> {
        self.ipv6
            .find_iter(text)
            .find_map(|m| m.as_str().parse().ok())
    }
}

/// IP detector backed by a trace endpoint
pub struct HttpIpDetector<F = ReqwestTraceFetcher> {
    fetcher: F,
    scanner: AddressScanner,
}

impl HttpIpDetector<ReqwestTraceFetcher> {
    /// Build a detector from the `[ip]` configuration section
    pub fn from_config(config: &IpConfig) -> Result<Self> {
        let fetcher = ReqwestTraceFetcher::new(
            config.trace_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Self::with_fetcher(fetcher)
    }
}

impl<F: TraceFetcher> HttpIpDetector<F> {
    /// Build a detector over a custom transport
    pub fn with_fetcher(fetcher: F) -> Result<Self> {
        Ok(Self {
            fetcher,
            scanner: AddressScanner::new()?,
        })
    }
}

#[async_trait::async_trait]
impl<F: TraceFetcher> IpDetector for HttpIpDetector<F> {
    async fn detect(&self) -> Result<PublicAddress> {
        let body = self.fetcher.fetch(Route::Default).await?;

        if let Some(ipv4) = self.scanner.first_ipv4(&body) {
            tracing::debug!("Default route reports IPv4 {}", ipv4);
            return Ok(PublicAddress::new(Some(ipv4), None));
        }

        let Some(ipv6) = self.scanner.first_ipv6(&body) else {
            return Err(Error::network(
                "Trace response contains no IPv4 or IPv6 address",
            ));
        };
        tracing::debug!("Default route reports IPv6 {}, asking again over IPv4", ipv6);

        let body = self.fetcher.fetch(Route::Ipv4Only).await?;
        let ipv4 = self.scanner.first_ipv4(&body).ok_or_else(|| {
            Error::network("IPv4-only trace response contains no IPv4 address")
        })?;

        Ok(PublicAddress::dual(ipv4, ipv6))
    }
}
