// # IP Detector Trait
//
// Defines the interface for learning the caller's current public addresses.
//
// ## Implementations
//
// - HTTP trace/echo endpoint: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpDetector;
//
// #[tokio::main(flavor = "current_thread")]
// async fn main() -> anyhow::Result<()> {
//     let detector = /* IpDetector implementation */;
//
//     let current = detector.detect().await?;
//     println!("IPv4: {:?}, IPv6: {:?}", current.ipv4, current.ipv6);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The caller's public addresses, produced fresh on each run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicAddress {
    /// Public IPv4 address (None if it could not be learned)
    pub ipv4: Option<Ipv4Addr>,
    /// Public IPv6 address (None when the default route is IPv4)
    pub ipv6: Option<Ipv6Addr>,
}

impl PublicAddress {
    /// Create a new public address pair
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// IPv4 only
    pub fn v4(ipv4: Ipv4Addr) -> Self {
        Self::new(Some(ipv4), None)
    }

    /// Both families
    pub fn dual(ipv4: Ipv4Addr, ipv6: Ipv6Addr) -> Self {
        Self::new(Some(ipv4), Some(ipv6))
    }
}

impl fmt::Display for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ipv4={} ipv6={}",
            display_slot(self.ipv4),
            display_slot(self.ipv6)
        )
    }
}

/// Renders an empty slot as `-` in log lines
pub(crate) fn display_slot<T: fmt::Display>(slot: Option<T>) -> String {
    slot.map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Trait for IP detector implementations
///
/// A detector is asked exactly once per run. It reports what the outside
/// world sees as the caller's address; it never talks to the DNS provider
/// and never decides whether an update is needed.
///
/// # Errors
///
/// Implementations return [`crate::Error::Network`] when the echo endpoint
/// is unreachable. The reconciler treats that as fatal for the run, since
/// nothing can be reconciled without a current-address baseline.
#[async_trait]
pub trait IpDetector: Send + Sync {
    /// Detect the current public IPv4 and, opportunistically, IPv6 address
    async fn detect(&self) -> Result<PublicAddress, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_marks_missing_family() {
        let addr = PublicAddress::v4(Ipv4Addr::new(198, 51, 100, 7));
        assert_eq!(addr.to_string(), "ipv4=198.51.100.7 ipv6=-");
    }
}
