// # Record Resolver Trait
//
// Defines the interface for looking up the currently published addresses of
// the managed name.
//
// ## Implementations
//
// - Host resolver (getaddrinfo): [`crate::resolver::SystemResolver`]

use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::ip_detector::display_slot;

/// Addresses currently published for `<subdomain>.<domain>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Published A record value
    pub ipv4: Option<Ipv4Addr>,
    /// Published AAAA record value
    pub ipv6: Option<Ipv6Addr>,
}

impl ResolvedAddress {
    /// Create a new resolved address pair
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Nothing published
    pub fn empty() -> Self {
        Self::default()
    }

    /// Classify lookup results by family.
    ///
    /// The DNS layer gives no reliable ordering, so when several addresses
    /// of one family are returned the last one observed wins.
    pub fn from_addrs<I>(addrs: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        addrs
            .into_iter()
            .fold(Self::empty(), |mut resolved, addr| {
                match addr {
                    IpAddr::V4(v4) => resolved.ipv4 = Some(v4),
                    IpAddr::V6(v6) => resolved.ipv6 = Some(v6),
                }
                resolved
            })
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ipv4={} ipv6={}",
            display_slot(self.ipv4),
            display_slot(self.ipv6)
        )
    }
}

/// Trait for record resolver implementations
#[async_trait]
pub trait RecordResolver: Send + Sync {
    /// Resolve the published addresses of `<subdomain>.<domain>`
    ///
    /// # Returns
    ///
    /// - `Ok(ResolvedAddress)`: possibly empty when nothing is published
    /// - `Err(Error::Resolution)`: if the lookup itself failed
    async fn resolve(
        &self,
        domain: &str,
        subdomain: &str,
    ) -> Result<ResolvedAddress, crate::Error>;
}

/// Build the fully-qualified name for a subdomain/domain pair.
///
/// `@` and the empty string denote the zone apex.
pub fn fqdn(domain: &str, subdomain: &str) -> String {
    let domain = domain.trim_end_matches('.');
    match subdomain {
        "" | "@" => domain.to_string(),
        sub => format!("{sub}.{domain}"),
    }
}
