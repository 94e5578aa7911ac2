//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces the reconciler drives.
//!
//! - [`IpDetector`]: Learn the current public addresses
//! - [`RecordResolver`]: Look up the currently published addresses
//! - [`ProviderClient`]: Create, update and delete records via a provider API

pub mod ip_detector;
pub mod provider_client;
pub mod record_resolver;

pub use ip_detector::{IpDetector, PublicAddress};
pub use provider_client::{DnsRecord, ProviderClient, RecordId, RecordStatus, RecordType};
pub use record_resolver::{RecordResolver, ResolvedAddress, fqdn};
