// # Tencent Cloud DNSPod Provider
//
// This crate provides the DNSPod implementation of `ProviderClient`.
//
// ## Behavior
//
// - One signed HTTPS POST per API action, no retries (a failed pass is
//   repeated by the next scheduled invocation)
// - HTTP timeout configured (30 seconds)
// - `Response.Error` is surfaced as `Error::ProviderApi` so the reconciler
//   can abandon just that sub-action
// - Everything else that goes wrong on the wire is `Error::Transport`
// - Dry-run mode for safe testing
// - Only A and AAAA records are surfaced
//
// ## Security Requirements
//
// - The secret key NEVER appears in logs, errors or `Debug` output
// - Requests are authenticated with TC3-HMAC-SHA256 (see `sign.rs`)
//
// ## API Reference
//
// - Tencent Cloud API 3.0, service `dnspod`, version `2021-03-23`
// - `DescribeRecordList`, `CreateRecord`, `ModifyRecord`, `DeleteRecord`

mod sign;
mod types;

use async_trait::async_trait;
use chrono::Utc;
use ddns_core::traits::{DnsRecord, ProviderClient, RecordId, RecordStatus, RecordType};
use ddns_core::{Credentials, Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

use types::{
    CreateRecordRequest, CreateRecordResponse, DeleteRecordRequest, DescribeRecordListRequest,
    DnspodRecord, EmptyResponse, ModifyRecordRequest, NO_DATA_OF_RECORD, RecordListResponse,
    decode_response,
};

pub(crate) const DNSPOD_API_HOST: &str = "dnspod.tencentcloudapi.com";
pub(crate) const DNSPOD_SERVICE: &str = "dnspod";
pub(crate) const DNSPOD_VERSION: &str = "2021-03-23";
pub(crate) const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Records per `DescribeRecordList` page
const PAGE_SIZE: u32 = 100;

/// Line every record is created on and updated to
const DEFAULT_LINE: &str = "默认";
const DEFAULT_LINE_ID: &str = "0";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Tencent Cloud DNSPod provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform `DescribeRecordList` as usual
/// - Log the intended create/modify/delete payload
/// - **NOT** actually modify DNS records
pub struct DnspodProvider {
    /// SecretId / SecretKey pair
    /// ⚠️ NEVER log the secret key
    credentials: Credentials,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, read records but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the secret key
impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodProvider")
            .field("secret_id", &self.credentials.secret_id)
            .field("secret_key", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DnspodProvider {
    /// Create a new DNSPod provider
    ///
    /// The credential pair is checked by `ReconcileConfig::validate`; a
    /// disabled configuration may legitimately carry none.
    ///
    /// # Errors
    ///
    /// - `Error::Transport` if the HTTP client cannot be built
    pub fn new(credentials: Credentials, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            client,
            dry_run,
        })
    }

    /// Execute one signed API action
    async fn request<T: DeserializeOwned, B: Serialize>(&self, action: &str, body: &B) -> Result<T> {
        let payload = serde_json::to_string(body)?;
        tracing::debug!("DNSPod {} request: {}", action, payload);

        let timestamp = Utc::now().timestamp();
        let authorization = self.sign(action, &payload, timestamp);

        let response = self
            .client
            .post(format!("https://{DNSPOD_API_HOST}"))
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", DNSPOD_API_HOST)
            .header("X-TC-Action", action)
            .header("X-TC-Version", DNSPOD_VERSION)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("Authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("DNSPod {} request failed: {}", action, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read DNSPod response: {}", e)))?;

        match decode_response(&text) {
            Err(Error::Transport(detail)) if !status.is_success() => Err(Error::transport(
                format!("DNSPod returned HTTP {}: {}", status, detail),
            )),
            Err(Error::ProviderApi { code, message }) => {
                tracing::debug!("DNSPod {} rejected: {} - {}", action, code, message);
                Err(Error::ProviderApi { code, message })
            }
            other => other,
        }
    }

    /// Fetch one `DescribeRecordList` page
    async fn record_page(&self, domain: &str, offset: u32) -> Result<RecordListResponse> {
        let req = DescribeRecordListRequest {
            domain,
            offset,
            limit: PAGE_SIZE,
        };
        self.request("DescribeRecordList", &req).await
    }
}

/// Walk `DescribeRecordList` pages until `TotalCount` records were seen.
///
/// `NoDataOfRecord` ends the walk; on the first page it means an empty zone.
/// A page without `TotalCount` is treated as the last one.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<DnsRecord>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<RecordListResponse>>,
{
    let mut records = Vec::new();
    let mut offset = 0u32;

    loop {
        let page = match fetch_page(offset).await {
            Ok(page) => page,
            Err(Error::ProviderApi { code, .. }) if code == NO_DATA_OF_RECORD => break,
            Err(e) => return Err(e),
        };

        let total = page
            .record_count_info
            .and_then(|c| c.total_count)
            .unwrap_or(0);
        let batch = page.record_list.unwrap_or_default();
        let fetched = batch.len() as u32;

        records.extend(batch.into_iter().filter_map(DnspodRecord::into_record));
        offset += fetched;

        if fetched == 0 || offset >= total {
            break;
        }
    }

    Ok(records)
}

#[async_trait]
impl ProviderClient for DnspodProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let records = collect_pages(|offset| self.record_page(domain, offset)).await?;
        tracing::debug!("{}: {} A/AAAA records", domain, records.len());
        Ok(records)
    }

    async fn create_record(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
    ) -> Result<RecordId> {
        let req = CreateRecordRequest {
            domain,
            sub_domain: subdomain,
            record_type: record_type.as_str(),
            record_line: DEFAULT_LINE,
            value: value.to_string(),
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would create {} record {}.{} -> {}",
                record_type,
                subdomain,
                domain,
                value
            );
            tracing::debug!("[DRY-RUN] CreateRecord payload: {:?}", req);
            return Ok(RecordId(0));
        }

        let created: CreateRecordResponse = self.request("CreateRecord", &req).await?;
        tracing::info!(
            "Created {} record {}.{} -> {} (id {})",
            record_type,
            subdomain,
            domain,
            value,
            created.record_id
        );
        Ok(RecordId(created.record_id))
    }

    async fn update_record(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
        value: IpAddr,
        id: RecordId,
        status: RecordStatus,
    ) -> Result<()> {
        let req = ModifyRecordRequest {
            domain,
            sub_domain: subdomain,
            record_type: record_type.as_str(),
            record_line: DEFAULT_LINE,
            record_line_id: DEFAULT_LINE_ID,
            record_id: id.0,
            value: value.to_string(),
            status: status.as_str(),
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would update {} record {}.{} ({}) -> {} [{}]",
                record_type,
                subdomain,
                domain,
                id,
                value,
                status
            );
            tracing::debug!("[DRY-RUN] ModifyRecord payload: {:?}", req);
            return Ok(());
        }

        let _: EmptyResponse = self.request("ModifyRecord", &req).await?;
        tracing::info!(
            "Updated {} record {}.{} ({}) -> {}",
            record_type,
            subdomain,
            domain,
            id,
            value
        );
        Ok(())
    }

    async fn delete_record(&self, domain: &str, id: RecordId) -> Result<()> {
        let req = DeleteRecordRequest {
            domain,
            record_id: id.0,
        };

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would delete record {} from {}", id, domain);
            return Ok(());
        }

        let _: EmptyResponse = self.request("DeleteRecord", &req).await?;
        tracing::info!("Deleted record {} from {}", id, domain);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "dnspod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordCountInfo;

    fn credentials() -> Credentials {
        Credentials::new("AKIDtestsecretid", "very-secret-key")
    }

    #[test]
    fn debug_redacts_secret_key() {
        let provider = DnspodProvider::new(credentials(), true).unwrap();
        let debug = format!("{:?}", provider);

        assert!(debug.contains("<REDACTED>"));
        assert!(debug.contains("AKIDtestsecretid"));
        assert!(!debug.contains("very-secret-key"));
    }

    #[tokio::test]
    async fn dry_run_writes_touch_nothing() {
        let provider = DnspodProvider::new(credentials(), true).unwrap();

        let id = provider
            .create_record("example.com", "home", RecordType::A, "203.0.113.5".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(id, RecordId(0));

        provider
            .update_record(
                "example.com",
                "home",
                RecordType::Aaaa,
                "2001:db8::5".parse().unwrap(),
                RecordId(42),
                RecordStatus::Enable,
            )
            .await
            .unwrap();

        provider
            .delete_record("example.com", RecordId(42))
            .await
            .unwrap();
    }

    fn record(id: u64, record_type: &str) -> DnspodRecord {
        DnspodRecord {
            record_id: id,
            name: "home".to_string(),
            record_type: record_type.to_string(),
            value: "203.0.113.5".to_string(),
            line: DEFAULT_LINE.to_string(),
            line_id: Some(DEFAULT_LINE_ID.to_string()),
            weight: None,
            ttl: Some(600),
            status: "ENABLE".to_string(),
        }
    }

    /// Serve `zone` the way `DescribeRecordList` pages it
    fn page(zone: &[(u64, &str)], offset: u32, total: Option<u32>) -> RecordListResponse {
        let start = (offset as usize).min(zone.len());
        let end = (start + PAGE_SIZE as usize).min(zone.len());
        RecordListResponse {
            record_list: Some(zone[start..end].iter().map(|(id, t)| record(*id, t)).collect()),
            record_count_info: Some(RecordCountInfo { total_count: total }),
        }
    }

    #[tokio::test]
    async fn listing_walks_every_page() {
        let zone: Vec<(u64, &str)> = (1..=250).map(|id| (id, "A")).collect();
        let mut offsets = Vec::new();

        let records = collect_pages(|offset| {
            offsets.push(offset);
            let page = page(&zone, offset, Some(250));
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(offsets, vec![0, 100, 200]);
        assert_eq!(records.len(), 250);
        assert_eq!(records.last().map(|r| r.id), Some(RecordId(250)));
    }

    #[tokio::test]
    async fn empty_zone_lists_nothing() {
        let mut calls = 0;

        let records = collect_pages(|_| {
            calls += 1;
            async {
                Err::<RecordListResponse, _>(Error::provider_api(
                    NO_DATA_OF_RECORD,
                    "记录列表为空。",
                ))
            }
        })
        .await
        .unwrap();

        assert!(records.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn page_without_total_count_is_the_last() {
        let zone: Vec<(u64, &str)> = (1..=150).map(|id| (id, "A")).collect();
        let mut offsets = Vec::new();

        let records = collect_pages(|offset| {
            offsets.push(offset);
            let page = page(&zone, offset, None);
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(offsets, vec![0]);
        assert_eq!(records.len(), 100);
    }

    #[tokio::test]
    async fn listing_keeps_only_address_records_across_pages() {
        let kinds = ["A", "NS", "AAAA", "CNAME", "MX", "TXT"];
        let zone: Vec<(u64, &str)> = (0..180u64).map(|id| (id, kinds[id as usize % 6])).collect();

        let records = collect_pages(|offset| {
            let page = page(&zone, offset, Some(180));
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(records.len(), 60);
        assert!(
            records
                .iter()
                .all(|r| matches!(r.record_type, RecordType::A | RecordType::Aaaa))
        );
        assert!(records.iter().any(|r| r.id.0 >= 100), "second page was read");
    }

    #[tokio::test]
    async fn listing_failure_on_a_later_page_is_returned() {
        let zone: Vec<(u64, &str)> = (1..=250).map(|id| (id, "A")).collect();

        let err = collect_pages(|offset| {
            let result = if offset == 0 {
                Ok(page(&zone, offset, Some(250)))
            } else {
                Err(Error::transport("connection reset"))
            };
            async move { result }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    }

    #[test]
    fn provider_name() {
        let provider = DnspodProvider::new(credentials(), false).unwrap();
        assert_eq!(provider.provider_name(), "dnspod");
    }
}
