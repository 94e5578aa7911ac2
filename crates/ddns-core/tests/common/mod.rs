//! Test doubles and common utilities for reconcile contract tests
//!
//! The fake provider keeps an in-memory zone so a resolver can read back
//! what previous passes wrote, which is what the idempotency tests need.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    DnsRecord, IpDetector, ProviderClient, PublicAddress, RecordId, RecordResolver,
    RecordStatus, RecordType, ResolvedAddress,
};
use ddns_core::{Credentials, ReconcileConfig, ReconcileEvent};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const DOMAIN: &str = "example.com";
pub const SUBDOMAIN: &str = "home";

/// A call observed by [`FakeProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List,
    Create {
        subdomain: String,
        record_type: RecordType,
        value: IpAddr,
    },
    Update {
        subdomain: String,
        record_type: RecordType,
        value: IpAddr,
        id: RecordId,
        status: RecordStatus,
    },
    Delete {
        id: RecordId,
    },
}

impl ProviderCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, ProviderCall::List)
    }
}

/// Which operation a scripted failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Create(RecordType),
    Update(RecordType),
    Delete,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Structured API rejection
    Api,
    /// Wire-level failure
    Transport,
}

#[derive(Default)]
struct Zone {
    records: Vec<DnsRecord>,
    next_id: u64,
    calls: Vec<ProviderCall>,
    failures: Vec<(Op, Failure)>,
}

/// In-memory provider that records every call
#[derive(Clone)]
pub struct FakeProvider {
    zone: Arc<Mutex<Zone>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            zone: Arc::new(Mutex::new(Zone {
                next_id: 1000,
                ..Zone::default()
            })),
        }
    }

    /// Seed a record; returns its id
    pub fn with_record(self, name: &str, record_type: RecordType, value: &str) -> Self {
        {
            let mut zone = self.zone.lock().unwrap();
            let id = RecordId(zone.next_id);
            zone.next_id += 1;
            zone.records.push(record(id, name, record_type, value));
        }
        self
    }

    /// Make every call of `op` fail
    pub fn failing(self, op: Op, failure: Failure) -> Self {
        self.zone.lock().unwrap().failures.push((op, failure));
        self
    }

    /// A handle sharing the same zone (pass one to the reconciler, keep one)
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.zone.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(ProviderCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.zone.lock().unwrap().calls.clear();
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.zone.lock().unwrap().records.clone()
    }

    pub fn record_id(&self, name: &str, record_type: RecordType) -> Option<RecordId> {
        self.records()
            .iter()
            .rev()
            .find(|r| r.name == name && r.record_type == record_type)
            .map(|r| r.id)
    }

    fn check(&self, op: Op) -> Result<()> {
        let zone = self.zone.lock().unwrap();
        match zone.failures.iter().find(|(o, _)| *o == op) {
            Some((_, Failure::Api)) => Err(Error::provider_api(
                "InvalidParameter.DomainRecordExist",
                "scripted rejection",
            )),
            Some((_, Failure::Transport)) => Err(Error::transport("scripted connection reset")),
            None => Ok(()),
        }
    }

    fn log(&self, call: ProviderCall) {
        self.zone.lock().unwrap().calls.push(call);
    }
}

fn record(id: RecordId, name: &str, record_type: RecordType, value: &str) -> DnsRecord {
    DnsRecord {
        id,
        name: name.to_string(),
        record_type,
        value: value.to_string(),
        line: "默认".to_string(),
        line_id: Some("0".to_string()),
        weight: None,
        ttl: Some(600),
        status: RecordStatus::Enable,
    }
}

#[async_trait::async_trait]
impl ProviderClient for FakeProvider {
    async fn list_records(&self, _domain: &str) -> Result<Vec<DnsRecord>> {
        self.log(ProviderCall::List);
        self.check(Op::List)?;
        Ok(self.records())
    }

    async fn create_record(
        &self,
        _domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
    ) -> Result<RecordId> {
        self.log(ProviderCall::Create {
            subdomain: subdomain.to_string(),
            record_type,
            value,
        });
        self.check(Op::Create(record_type))?;

        let mut zone = self.zone.lock().unwrap();
        let id = RecordId(zone.next_id);
        zone.next_id += 1;
        zone.records
            .push(record(id, subdomain, record_type, &value.to_string()));
        Ok(id)
    }

    async fn update_record(
        &self,
        _domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
        id: RecordId,
        status: RecordStatus,
    ) -> Result<()> {
        self.log(ProviderCall::Update {
            subdomain: subdomain.to_string(),
            record_type,
            value,
            id,
            status,
        });
        self.check(Op::Update(record_type))?;

        let mut zone = self.zone.lock().unwrap();
        let record = zone
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::provider_api("InvalidParameter.RecordIdInvalid", "no such record"))?;
        record.value = value.to_string();
        record.status = status;
        Ok(())
    }

    async fn delete_record(&self, _domain: &str, id: RecordId) -> Result<()> {
        self.log(ProviderCall::Delete { id });
        self.check(Op::Delete)?;

        let mut zone = self.zone.lock().unwrap();
        zone.records.retain(|r| r.id != id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Resolver answering from the fake provider's zone, like DNS would after propagation
pub struct ZoneResolver {
    provider: FakeProvider,
}

impl ZoneResolver {
    pub fn new(provider: &FakeProvider) -> Self {
        Self {
            provider: provider.handle(),
        }
    }
}

#[async_trait::async_trait]
impl RecordResolver for ZoneResolver {
    async fn resolve(&self, _domain: &str, subdomain: &str) -> Result<ResolvedAddress> {
        let addrs = self
            .provider
            .records()
            .into_iter()
            .filter(|r| {
                r.name.eq_ignore_ascii_case(subdomain) && r.status == RecordStatus::Enable
            })
            .filter_map(|r| r.value.parse::<IpAddr>().ok());
        Ok(ResolvedAddress::from_addrs(addrs))
    }
}

/// Resolver returning a fixed answer or a lookup failure
pub struct StaticResolver {
    answer: Option<ResolvedAddress>,
}

impl StaticResolver {
    pub fn new(answer: ResolvedAddress) -> Self {
        Self {
            answer: Some(answer),
        }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait::async_trait]
impl RecordResolver for StaticResolver {
    async fn resolve(&self, domain: &str, subdomain: &str) -> Result<ResolvedAddress> {
        self.answer.ok_or_else(|| {
            Error::resolution(format!("{subdomain}.{domain}: temporary failure in name resolution"))
        })
    }
}

/// Detector returning a fixed address (or failing) and counting calls
pub struct StaticDetector {
    answer: Option<PublicAddress>,
    calls: Arc<AtomicUsize>,
}

impl StaticDetector {
    pub fn new(answer: PublicAddress) -> Self {
        Self {
            answer: Some(answer),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            answer: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpDetector for StaticDetector {
    async fn detect(&self) -> Result<PublicAddress> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or_else(|| Error::network("trace endpoint unreachable"))
    }
}

/// Helper to create a minimal config for testing
pub fn config(enable_ipv6: bool) -> ReconcileConfig {
    ReconcileConfig::new(
        DOMAIN,
        SUBDOMAIN,
        Credentials::new("AKIDtestsecretid", "testsecretkey"),
    )
    .with_ipv6(enable_ipv6)
}

/// Drain all events emitted so far
pub fn drain(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
