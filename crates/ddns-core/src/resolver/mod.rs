//! Host resolver backed record lookup
//!
//! Uses the operating system's resolver (`getaddrinfo` through
//! [`tokio::net::lookup_host`]), so the answer is whatever the host would
//! use to reach the name: caches, `/etc/hosts` and search domains included.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{RecordResolver, ResolvedAddress, fqdn};

/// Record resolver using the system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordResolver for SystemResolver {
    async fn resolve(&self, domain: &str, subdomain: &str) -> Result<ResolvedAddress> {
        let name = fqdn(domain, subdomain);
        debug!("Resolving {}", name);

        let addrs = tokio::net::lookup_host((name.as_str(), 0))
            .await
            .map_err(|e| Error::resolution(format!("Lookup of {} failed: {}", name, e)))?;

        let resolved = ResolvedAddress::from_addrs(addrs.map(|sa| sa.ip()));
        debug!("Resolved {} -> {}", name, resolved);
        Ok(resolved)
    }
}
