// # Provider Client Trait
//
// Defines the interface to a remote DNS record CRUD API.
//
// ## Implementations
//
// - Tencent Cloud DNSPod: `ddns-provider-dnspod` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{ProviderClient, RecordType};
//
// #[tokio::main(flavor = "current_thread")]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ProviderClient implementation */;
//
//     let records = provider.list_records("example.com").await?;
//     if let Some(id) = provider.find_record_id(&records, "home", RecordType::A) {
//         provider.delete_record("example.com", id).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// DNS record type managed by this system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire representation (`A` / `AAAA`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Record type matching an address family
    pub fn for_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::Other(format!(
                "Unsupported record type: {other}"
            ))),
        }
    }
}

/// Record status as understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    /// Record is served
    #[default]
    Enable,
    /// Record exists but is paused
    Disable,
}

impl RecordStatus {
    /// Wire representation (`ENABLE` / `DISABLE`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Enable => "ENABLE",
            RecordStatus::Disable => "DISABLE",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ENABLE" => Ok(RecordStatus::Enable),
            "DISABLE" => Ok(RecordStatus::Disable),
            other => Err(crate::Error::Other(format!(
                "Unknown record status: {other}"
            ))),
        }
    }
}

/// Provider-assigned record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A DNS record as owned by the provider
///
/// Read and written only through a [`ProviderClient`]; never cached across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// The record ID (provider-assigned)
    pub id: RecordId,
    /// Record name relative to the zone (`@` for the apex)
    pub name: String,
    /// A or AAAA
    pub record_type: RecordType,
    /// The record value (address literal)
    pub value: String,
    /// Routing line name (opaque)
    pub line: String,
    /// Routing line id (opaque)
    pub line_id: Option<String>,
    /// Weight (opaque)
    pub weight: Option<u32>,
    /// Time-to-live
    pub ttl: Option<u32>,
    /// Served or paused
    pub status: RecordStatus,
}

/// Trait for provider client implementations
///
/// # Contract
///
/// - Every call is authenticated with the static credential pair the client
///   was built with.
/// - A structured rejection by the API's own error taxonomy is returned as
///   [`crate::Error::ProviderApi`]; the reconciler logs it and moves on.
/// - Network or protocol failures are returned as [`crate::Error::Transport`];
///   the reconciler aborts the pass on those.
/// - Clients do not retry, back off or cache records between calls.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// List the A/AAAA records of a zone
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Find the id of the record matching `subdomain` and `record_type`.
    ///
    /// Names compare ASCII case-insensitively, as DNS does; providers
    /// store them lowercased. When the provider holds duplicates the last
    /// match wins.
    fn find_record_id(
        &self,
        records: &[DnsRecord],
        subdomain: &str,
        record_type: RecordType,
    ) -> Option<RecordId> {
        records
            .iter()
            .rev()
            .find(|r| r.name.eq_ignore_ascii_case(subdomain) && r.record_type == record_type)
            .map(|r| r.id)
    }

    /// Create a record on the provider's default line
    async fn create_record(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
    ) -> Result<RecordId, crate::Error>;

    /// Overwrite the value and status of an existing record
    async fn update_record(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
        id: RecordId,
        status: RecordStatus,
    ) -> Result<(), crate::Error>;

    /// Delete a record by id
    async fn delete_record(&self, domain: &str, id: RecordId) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
