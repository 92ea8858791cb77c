use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header value meaning "generate a transaction id from the row ordinal".
pub const GENERATED_TX_ID: &str = "__generated_tx_id__";
/// Header value meaning "generate a timestamp from the row ordinal".
pub const GENERATED_TIMESTAMP: &str = "__generated_timestamp__";

/// Sub-second digits are written only when non-zero, so whole-second
/// instants keep the plain `YYYY-MM-DD HH:MM:SS` shape.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ── Input Types (parsed from the ledger) ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl Transaction {
    /// Milliseconds since the Unix epoch, treating the timestamp as UTC.
    pub fn epoch_ms(&self) -> i64 {
        self.timestamp.and_utc().timestamp_millis()
    }
}

/// Binding of the five canonical fields to header names in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: String,
    pub timestamp: String,
}

impl ColumnMapping {
    /// Mapping with generated id and timestamp columns.
    pub fn new(sender_id: &str, receiver_id: &str, amount: &str) -> Self {
        Self {
            transaction_id: GENERATED_TX_ID.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            amount: amount.to_string(),
            timestamp: GENERATED_TIMESTAMP.to_string(),
        }
    }

    pub fn canonical() -> Self {
        Self {
            transaction_id: "transaction_id".into(),
            sender_id: "sender_id".into(),
            receiver_id: "receiver_id".into(),
            amount: "amount".into(),
            timestamp: "timestamp".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub needs_mapping: bool,
    pub auto_mapping: Option<ColumnMapping>,
    pub row_count: usize,
    pub sample_rows: Vec<Vec<String>>,
}

// ── Output Types (analysis report) ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    SmurfingFanIn,
    SmurfingFanOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: PatternType,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
    #[serde(rename = "reason")]
    pub reasons: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub fan_in_accounts: usize,
    pub fan_out_accounts: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

// ── Visualization projection ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub in_degree: u32,
    pub out_degree: u32,
    pub total_amount: f64,
    pub is_suspicious: bool,
    pub ring_id: Option<String>,
    pub patterns: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Normal,
    FanIn,
    FanOut,
    PassThrough,
    RingTransfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub timestamp: String,
    #[serde(rename = "isRingEdge")]
    pub is_ring_edge: bool,
    pub edge_type: EdgeType,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub report: AnalysisReport,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
