//! CSV ingestion: header normalisation, column auto-mapping and row parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use crate::error::{AnalysisError, Result};
use crate::types::{ColumnMapping, CsvPreview, Transaction, GENERATED_TIMESTAMP, GENERATED_TX_ID};

const SAMPLE_ROWS: usize = 5;

// Normalised header keywords per canonical field, most specific first.
const TRANSACTION_ID_HINTS: &[&str] = &[
    "transaction_id", "txn_id", "trans_id", "tx_id", "id", "transaction", "txn", "trans_no", "reference", "ref",
];
const SENDER_HINTS: &[&str] = &[
    "sender_id", "sender", "from", "from_id", "from_account", "source", "source_id", "payer", "payer_id",
    "originator", "debit_account", "source_account",
];
const RECEIVER_HINTS: &[&str] = &[
    "receiver_id", "receiver", "to", "to_id", "to_account", "target", "target_id", "payee", "payee_id",
    "beneficiary", "credit_account", "dest", "destination", "destination_id", "dest_account",
];
const AMOUNT_HINTS: &[&str] = &[
    "amount", "value", "sum", "total", "amt", "price", "payment", "transfer_amount", "txn_amount",
    "transaction_amount",
];
const TIMESTAMP_HINTS: &[&str] = &[
    "timestamp", "date", "time", "datetime", "created_at", "created", "txn_date", "transaction_date",
    "trans_date", "occurred_at", "ts", "year",
];

// Offset-bearing forms are converted to UTC.
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    // US-style exports: month first.
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Rows skipped while parsing, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroppedRows {
    pub bad_amount: usize,
    pub missing_party: usize,
    pub self_transfer: usize,
    pub bad_timestamp: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.bad_amount + self.missing_party + self.self_transfer + self.bad_timestamp
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub transactions: Vec<Transaction>,
    pub dropped: DroppedRows,
}

/// Lower-case, collapse every run of non-alphanumerics into one `_`, trim `_`.
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    for c in header.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Match headers to canonical fields: exact normalised match first, then
/// substring match either way. A header is never used for two fields.
///
/// Returns `None` when sender, receiver or amount cannot be matched. Missing
/// id/timestamp columns map to the generated-value sentinels.
pub fn auto_map(headers: &[String]) -> Option<ColumnMapping> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut used = vec![false; headers.len()];

    let mut pick = |hints: &[&str]| -> Option<String> {
        let exact = (0..normalized.len()).find(|&i| !used[i] && hints.contains(&normalized[i].as_str()));
        let idx = exact.or_else(|| {
            (0..normalized.len()).find(|&i| {
                let n = normalized[i].as_str();
                !used[i] && !n.is_empty() && hints.iter().any(|h| n.contains(h) || h.contains(n))
            })
        })?;
        used[idx] = true;
        Some(headers[idx].clone())
    };

    // Field order decides who wins a contested header.
    let sender = pick(SENDER_HINTS);
    let receiver = pick(RECEIVER_HINTS);
    let amount = pick(AMOUNT_HINTS);
    let timestamp = pick(TIMESTAMP_HINTS);
    let transaction_id = pick(TRANSACTION_ID_HINTS);

    Some(ColumnMapping {
        sender_id: sender?,
        receiver_id: receiver?,
        amount: amount?,
        timestamp: timestamp.unwrap_or_else(|| GENERATED_TIMESTAMP.to_string()),
        transaction_id: transaction_id.unwrap_or_else(|| GENERATED_TX_ID.to_string()),
    })
}

/// Headers, auto-mapping and a few sample rows. Never fails on unmatched
/// columns; `needs_mapping` reports that instead.
pub fn preview_csv(text: &str) -> Result<CsvPreview> {
    let (headers, _, records) = open(text)?;
    let mut row_count = 0;
    let mut sample_rows = Vec::new();
    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        row_count += 1;
        if sample_rows.len() < SAMPLE_ROWS {
            sample_rows.push(record.iter().map(str::to_string).collect());
        }
    }

    let auto_mapping = auto_map(&headers);
    Ok(CsvPreview {
        headers,
        needs_mapping: auto_mapping.is_none(),
        auto_mapping,
        row_count,
        sample_rows,
    })
}

/// Read only the header line.
pub fn read_headers(text: &str) -> Result<Vec<String>> {
    open(text).map(|(headers, _, _)| headers)
}

/// Parse every data row under a confirmed mapping. Invalid rows are dropped
/// and counted; a mapping naming an absent header is an error.
pub fn parse_transactions(text: &str, mapping: &ColumnMapping) -> Result<ParseOutcome> {
    let (headers, header_line, records) = open(text)?;

    let column = |field: &'static str, header: &str| -> Result<usize> {
        let header = header.trim();
        headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| AnalysisError::ColumnNotFound { field, header: header.to_string() })
    };
    let optional = |field: &'static str, header: &str, sentinel: &str| -> Result<Option<usize>> {
        if header == sentinel {
            Ok(None)
        } else {
            column(field, header).map(Some)
        }
    };

    let sender_idx = column("sender_id", &mapping.sender_id)?;
    let receiver_idx = column("receiver_id", &mapping.receiver_id)?;
    let amount_idx = column("amount", &mapping.amount)?;
    let timestamp_idx = optional("timestamp", &mapping.timestamp, GENERATED_TIMESTAMP)?;
    let tx_id_idx = optional("transaction_id", &mapping.transaction_id, GENERATED_TX_ID)?;

    let mut transactions = Vec::new();
    let mut dropped = DroppedRows::default();

    for (n, record) in records.enumerate() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let ordinal = record
            .position()
            .map_or(n as u64 + 1, |p| p.line().saturating_sub(header_line))
            as usize;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let Some(amount) = parse_amount(cell(amount_idx)) else {
            dropped.bad_amount += 1;
            continue;
        };

        let sender = cell(sender_idx);
        let receiver = cell(receiver_idx);
        if sender.is_empty() || receiver.is_empty() {
            dropped.missing_party += 1;
            continue;
        }
        if sender == receiver {
            dropped.self_transfer += 1;
            continue;
        }

        let timestamp = match timestamp_idx.map(cell).filter(|c| !c.is_empty()) {
            Some(raw) => parse_timestamp(raw),
            None => synthetic_timestamp(ordinal),
        };
        let Some(timestamp) = timestamp else {
            dropped.bad_timestamp += 1;
            continue;
        };

        let transaction_id = tx_id_idx
            .map(cell)
            .filter(|c| !c.is_empty())
            .map_or_else(|| format!("TXN_{ordinal:06}"), str::to_string);

        transactions.push(Transaction {
            transaction_id,
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            amount,
            timestamp,
        });
    }

    Ok(ParseOutcome { transactions, dropped })
}

/// Accepts RFC 3339, `YYYY-MM-DD` shapes with optional time and UTC offset,
/// US `MM/DD/YYYY` shapes and integer Unix epochs (seconds, or milliseconds
/// from 10^11 up).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_utc());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        let ms = if n >= 100_000_000_000 { n } else { n.checked_mul(1000)? };
        return DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc());
    }
    None
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let amount: f64 = cleaned.parse().ok()?;
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn synthetic_timestamp(ordinal: usize) -> Option<NaiveDateTime> {
    let day = (ordinal % 28) as u32 + 1;
    NaiveDate::from_ymd_opt(2026, 1, day)?.and_hms_opt(0, 0, 0)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

/// Header fields, the header's line number, and the remaining records.
fn open(text: &str) -> Result<(Vec<String>, u64, StringRecordsIntoIter<&[u8]>)> {
    let text = text.trim_start_matches('\u{feff}');
    let mut records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
        .into_records();

    while let Some(record) = records.next() {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let line = record.position().map_or(1, |p| p.line());
        let headers = record.iter().map(|h| h.trim_matches('\u{feff}').to_string()).collect();
        return Ok((headers, line, records));
    }
    Err(AnalysisError::EmptyInput)
}
