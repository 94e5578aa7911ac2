//! Tencent Cloud DNSPod API request and response types

use ddns_core::traits::{DnsRecord, RecordId, RecordStatus, RecordType};
use ddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error code returned by `DescribeRecordList` for a zone without records
pub(crate) const NO_DATA_OF_RECORD: &str = "ResourceNotFound.NoDataOfRecord";

// ============ Envelope ============

/// Every API 3.0 answer is wrapped in `{"Response": {...}}`
#[derive(Debug, Deserialize)]
struct TencentResponse {
    #[serde(rename = "Response")]
    response: serde_json::Value,
}

/// Error payload nested inside a response
#[derive(Debug, Deserialize)]
struct TencentError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

/// Decode a response body into `T`.
///
/// `Response.Error` becomes [`Error::ProviderApi`]; anything that does not
/// look like an API 3.0 answer becomes [`Error::Transport`].
pub(crate) fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: TencentResponse = serde_json::from_str(text)
        .map_err(|e| Error::transport(format!("Malformed DNSPod response: {}", e)))?;

    if let Some(error) = envelope.response.get("Error") {
        let error: TencentError = serde_json::from_value(error.clone())
            .map_err(|e| Error::transport(format!("Malformed DNSPod error payload: {}", e)))?;
        return Err(Error::provider_api(error.code, error.message));
    }

    serde_json::from_value(envelope.response)
        .map_err(|e| Error::transport(format!("Unexpected DNSPod response shape: {}", e)))
}

// ============ Requests ============

/// `DescribeRecordList` request body
#[derive(Debug, Serialize)]
pub(crate) struct DescribeRecordListRequest<'a> {
    #[serde(rename = "Domain")]
    pub domain: &'a str,
    #[serde(rename = "Offset")]
    pub offset: u32,
    #[serde(rename = "Limit")]
    pub limit: u32,
}

/// `CreateRecord` request body
#[derive(Debug, Serialize)]
pub(crate) struct CreateRecordRequest<'a> {
    #[serde(rename = "Domain")]
    pub domain: &'a str,
    #[serde(rename = "SubDomain")]
    pub sub_domain: &'a str,
    #[serde(rename = "RecordType")]
    pub record_type: &'static str,
    #[serde(rename = "RecordLine")]
    pub record_line: &'static str,
    #[serde(rename = "Value")]
    pub value: String,
}

/// `ModifyRecord` request body
#[derive(Debug, Serialize)]
pub(crate) struct ModifyRecordRequest<'a> {
    #[serde(rename = "Domain")]
    pub domain: &'a str,
    #[serde(rename = "SubDomain")]
    pub sub_domain: &'a str,
    #[serde(rename = "RecordType")]
    pub record_type: &'static str,
    #[serde(rename = "RecordLine")]
    pub record_line: &'static str,
    #[serde(rename = "RecordLineId")]
    pub record_line_id: &'static str,
    #[serde(rename = "RecordId")]
    pub record_id: u64,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Status")]
    pub status: &'static str,
}

/// `DeleteRecord` request body
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRecordRequest<'a> {
    #[serde(rename = "Domain")]
    pub domain: &'a str,
    #[serde(rename = "RecordId")]
    pub record_id: u64,
}

// ============ Responses ============

/// `DescribeRecordList` response
#[derive(Debug, Deserialize)]
pub(crate) struct RecordListResponse {
    #[serde(rename = "RecordList")]
    pub record_list: Option<Vec<DnspodRecord>>,
    #[serde(rename = "RecordCountInfo")]
    pub record_count_info: Option<RecordCountInfo>,
}

/// Record counters of a `DescribeRecordList` page
#[derive(Debug, Deserialize)]
pub(crate) struct RecordCountInfo {
    #[serde(rename = "TotalCount")]
    pub total_count: Option<u32>,
}

/// Record item of `DescribeRecordList`
#[derive(Debug, Deserialize)]
pub(crate) struct DnspodRecord {
    #[serde(rename = "RecordId")]
    pub record_id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Line", default)]
    pub line: String,
    #[serde(rename = "LineId")]
    pub line_id: Option<String>,
    #[serde(rename = "Weight")]
    pub weight: Option<u32>,
    #[serde(rename = "TTL")]
    pub ttl: Option<u32>,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl DnspodRecord {
    /// Convert to the core record, dropping anything that is not A/AAAA
    pub(crate) fn into_record(self) -> Option<DnsRecord> {
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        Some(DnsRecord {
            id: RecordId(self.record_id),
            name: self.name,
            record_type,
            value: self.value,
            line: self.line,
            line_id: self.line_id,
            weight: self.weight,
            ttl: self.ttl,
            status: self.status.parse::<RecordStatus>().unwrap_or_default(),
        })
    }
}

/// `CreateRecord` response
#[derive(Debug, Deserialize)]
pub(crate) struct CreateRecordResponse {
    #[serde(rename = "RecordId")]
    pub record_id: u64,
}

/// Response of calls that only return a request id
#[derive(Debug, Deserialize)]
pub(crate) struct EmptyResponse {}
