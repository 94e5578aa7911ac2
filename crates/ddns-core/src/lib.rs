// # ddns-core
//
// Core library for the single-pass DDNS reconciler.
//
// ## Architecture Overview
//
// One invocation (typically from cron or a systemd timer) does:
//
//     detect public IP → resolve published record → diff → reconcile via provider API
//
// - **IpDetector**: Trait for learning the current public IPv4/IPv6 addresses
// - **RecordResolver**: Trait for looking up what is published for the name
// - **ProviderClient**: Trait for record CRUD against a DNS provider API
// - **Reconciler**: Drives the three and issues the minimal set of changes
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single Pass**: No daemon loop, no retries, no state between runs
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Unchanged external state means a no-op run

pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credentials, DnsConfig, IpConfig, LogConfig, ReconcileConfig};
pub use engine::{
    Action, ActionKind, ActionReport, ActionStatus, Outcome, ReconcileEvent, ReconcileReport,
    Reconciler,
};
pub use error::{Error, Result};
pub use resolver::SystemResolver;
pub use traits::{
    DnsRecord, IpDetector, ProviderClient, PublicAddress, RecordId, RecordResolver, RecordStatus,
    RecordType, ResolvedAddress,
};
