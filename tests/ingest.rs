//! Column mapping, row parsing and CSV round-trip tests.

use chrono::{Duration, NaiveDate};

use ledger_fraud_detect::config::Thresholds;
use ledger_fraud_detect::error::AnalysisError;
use ledger_fraud_detect::generator::{to_csv, LedgerGenerator};
use ledger_fraud_detect::ingest::{auto_map, parse_transactions, preview_csv, DroppedRows};
use ledger_fraud_detect::types::*;
use ledger_fraud_detect::analyze_csv;

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ── Auto-mapping ──

#[test]
fn test_auto_map_canonical_headers() {
    let mapping = auto_map(&headers(&["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"])).unwrap();
    assert_eq!(mapping, ColumnMapping::canonical());
}

#[test]
fn test_auto_map_bank_export_headers() {
    let mapping = auto_map(&headers(&["Txn Ref", "From Account", "To Account", "Amount ($)", "Date"])).unwrap();
    assert_eq!(mapping.sender_id, "From Account");
    assert_eq!(mapping.receiver_id, "To Account");
    assert_eq!(mapping.amount, "Amount ($)");
    assert_eq!(mapping.timestamp, "Date");
    assert_eq!(mapping.transaction_id, "Txn Ref");
}

#[test]
fn test_auto_map_fills_sentinels_for_optional_fields() {
    let mapping = auto_map(&headers(&["payer", "payee", "value"])).unwrap();
    assert_eq!(mapping.sender_id, "payer");
    assert_eq!(mapping.receiver_id, "payee");
    assert_eq!(mapping.amount, "value");
    assert_eq!(mapping.timestamp, GENERATED_TIMESTAMP);
    assert_eq!(mapping.transaction_id, GENERATED_TX_ID);
}

#[test]
fn test_auto_map_fails_without_amount() {
    assert!(auto_map(&headers(&["sender", "receiver", "memo"])).is_none());
}

// ── Parsing ──

#[test]
fn test_generated_ids_and_timestamps() {
    let text = "from,to,amount\nA,B,10\nB,C,20\n";
    let outcome = parse_transactions(text, &ColumnMapping::new("from", "to", "amount")).unwrap();

    assert_eq!(outcome.transactions.len(), 2);
    let first = &outcome.transactions[0];
    assert_eq!(first.transaction_id, "TXN_000001");
    assert_eq!(first.timestamp, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap());
    assert_eq!(outcome.transactions[1].transaction_id, "TXN_000002");
    assert_eq!(
        outcome.transactions[1].timestamp,
        NaiveDate::from_ymd_opt(2026, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap()
    );
}

#[test]
fn test_invalid_rows_are_dropped_and_counted() {
    let text = "\
id,sender,receiver,amount,time
1,A,B,100,2026-01-05 10:00:00
2,A,B,abc,2026-01-05 10:00:00
3,,B,100,2026-01-05 10:00:00
4,A,A,100,2026-01-05 10:00:00
5,A,B,100,not a date
6,A,C,-5,2026-01-05 10:00:00
7,C,D,50,
";
    let mapping = auto_map(&headers(&["id", "sender", "receiver", "amount", "time"])).unwrap();
    let outcome = parse_transactions(text, &mapping).unwrap();

    let ids: Vec<&str> = outcome.transactions.iter().map(|t| t.transaction_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "7"]);
    assert_eq!(
        outcome.dropped,
        DroppedRows { bad_amount: 2, missing_party: 1, self_transfer: 1, bad_timestamp: 1 }
    );
    // Blank timestamp cell falls back to the generated one for row 7.
    assert_eq!(
        outcome.transactions[1].timestamp,
        NaiveDate::from_ymd_opt(2026, 1, 8).unwrap().and_hms_opt(0, 0, 0).unwrap()
    );
}

#[test]
fn test_bom_quotes_and_currency() {
    let text = "\u{feff}sender,receiver,amount\n\"ACC,1\",\"B \"\"quoted\"\"\",\"$1,250.50\"\n";
    let outcome = parse_transactions(text, &ColumnMapping::new("sender", "receiver", "amount")).unwrap();

    assert_eq!(outcome.transactions.len(), 1);
    let tx = &outcome.transactions[0];
    assert_eq!(tx.sender_id, "ACC,1");
    assert_eq!(tx.receiver_id, "B \"quoted\"");
    assert_eq!(tx.amount, 1250.5);
}

#[test]
fn test_us_style_dates_are_accepted() {
    let text = "sender,receiver,amount,date\nA,B,10,01/15/2026 10:00\nB,C,10,01/15/2026 11:00\nC,A,10,01/15/2026 12:00\n";
    let analysis = analyze_csv(text, None, &Thresholds::default()).unwrap();

    assert_eq!(analysis.edges.len(), 3);
    assert_eq!(analysis.edges[0].timestamp, "2026-01-15 10:00:00");
    assert_eq!(analysis.edges[2].timestamp, "2026-01-15 12:00:00");
    assert_eq!(analysis.report.fraud_rings.len(), 1);
}

#[test]
fn test_offset_timestamps_convert_to_utc() {
    let text = "sender,receiver,amount,time\nA,B,10,2026-01-15 12:00:00+02:00\nB,C,10,2026-01-15 05:00:00 -0500\n";
    let outcome = parse_transactions(text, &auto_map(&headers(&["sender", "receiver", "amount", "time"])).unwrap()).unwrap();

    assert_eq!(outcome.dropped.total(), 0);
    let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    assert_eq!(outcome.transactions[0].timestamp, day.and_hms_opt(10, 0, 0).unwrap());
    assert_eq!(outcome.transactions[1].timestamp, day.and_hms_opt(10, 0, 0).unwrap());
}

#[test]
fn test_confirmed_mapping_with_unknown_column() {
    let text = "sender,receiver,amount\nA,B,1\n";
    let err = parse_transactions(text, &ColumnMapping::new("sender", "recipient", "amount")).unwrap_err();
    match err {
        AnalysisError::ColumnNotFound { field, header } => {
            assert_eq!(field, "receiver_id");
            assert_eq!(header, "recipient");
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
}

// ── analyze_csv ──

#[test]
fn test_unmappable_headers_need_mapping() {
    let err = analyze_csv("colA,colB,colC\n1,2,3\n", None, &Thresholds::default()).unwrap_err();
    assert!(err.is_needs_mapping());
    assert_eq!(err.to_string(), "NEEDS_MAPPING");
    match err {
        AnalysisError::NeedsMapping { headers } => assert_eq!(headers, vec!["colA", "colB", "colC"]),
        other => panic!("expected NeedsMapping, got {other:?}"),
    }
}

#[test]
fn test_no_valid_rows_is_an_error() {
    let err = analyze_csv("sender,receiver,amount\nA,A,1\nB,B,2\n", None, &Thresholds::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::NoValidTransactions));
    assert!(!err.is_needs_mapping());
}

#[test]
fn test_explicit_mapping_overrides_auto_mapping() {
    let text = "a,b,c\nX,Y,10\nY,Z,10\nZ,X,10\n";
    let mapping = ColumnMapping::new("a", "b", "c");
    let analysis = analyze_csv(text, Some(&mapping), &Thresholds::default()).unwrap();
    assert_eq!(analysis.report.fraud_rings.len(), 1);
    assert_eq!(analysis.report.fraud_rings[0].risk_score, 91.0);
}

// ── Preview ──

#[test]
fn test_preview_reports_mapping_and_samples() {
    let mut text = String::from("sender,receiver,amount,notes\n");
    for i in 0..8 {
        text.push_str(&format!("S{i},R{i},{i}.50,n{i}\n"));
    }
    let preview = preview_csv(&text).unwrap();

    assert_eq!(preview.headers, vec!["sender", "receiver", "amount", "notes"]);
    assert!(!preview.needs_mapping);
    assert_eq!(preview.auto_mapping.unwrap().amount, "amount");
    assert_eq!(preview.row_count, 8);
    assert_eq!(preview.sample_rows.len(), 5);
    assert_eq!(preview.sample_rows[0], vec!["S0", "R0", "0.50", "n0"]);
}

#[test]
fn test_preview_of_unmappable_file_flags_it() {
    let preview = preview_csv("qqq,zzz\n1,2\n").unwrap();
    assert!(preview.needs_mapping);
    assert!(preview.auto_mapping.is_none());
}

#[test]
fn test_empty_input() {
    assert!(matches!(preview_csv(""), Err(AnalysisError::EmptyInput)));
    assert!(matches!(preview_csv("\n\n"), Err(AnalysisError::EmptyInput)));
}

// ── Round trip ──

#[test]
fn test_generated_ledger_round_trips_through_csv() {
    let ledger = LedgerGenerator::new(9, 0.05).generate(500);
    let csv = to_csv(&ledger.transactions).unwrap();
    let outcome = parse_transactions(&csv, &ColumnMapping::canonical()).unwrap();

    assert_eq!(outcome.dropped.total(), 0);
    assert_eq!(outcome.transactions, ledger.transactions);
}

#[test]
fn test_fractional_cents_and_milliseconds_round_trip() {
    let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let txs = vec![
        Transaction {
            transaction_id: "T1".into(),
            sender_id: "A".into(),
            receiver_id: "B".into(),
            amount: 10.125,
            timestamp: base + Duration::milliseconds(500),
        },
        Transaction {
            transaction_id: "T2".into(),
            sender_id: "B".into(),
            receiver_id: "C".into(),
            amount: 0.001,
            timestamp: base + Duration::milliseconds(1_250),
        },
        Transaction {
            transaction_id: "T3".into(),
            sender_id: "C".into(),
            receiver_id: "A".into(),
            amount: 1234567.891,
            timestamp: base + Duration::seconds(2),
        },
    ];

    let csv = to_csv(&txs).unwrap();
    assert!(csv.contains("10.125,2026-01-01 00:00:00.500"));
    assert!(csv.lines().any(|line| line.ends_with("1234567.891,2026-01-01 00:00:02")));

    let outcome = parse_transactions(&csv, &ColumnMapping::canonical()).unwrap();
    assert_eq!(outcome.transactions, txs);
}
