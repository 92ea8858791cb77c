//! Built-in reference ledger with known verdicts, used to confirm a build
//! (or a threshold configuration) still catches what it should.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::analyze_csv;
use crate::config::Thresholds;
use crate::error::Result;
use crate::generator::to_csv;
use crate::types::{AnalysisReport, PatternType, Summary, Transaction};

#[derive(Debug, Clone, Serialize)]
pub struct SelfCheckResult {
    /// `success` or `failure`.
    pub status: &'static str,
    pub failures: Vec<String>,
    pub summary: Summary,
}

impl SelfCheckResult {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Builder {
    start: NaiveDateTime,
    seq: usize,
    txs: Vec<Transaction>,
}

impl Builder {
    fn push(&mut self, from: &str, to: &str, amount: f64, offset_ms: i64) {
        self.seq += 1;
        self.txs.push(Transaction {
            transaction_id: format!("TX{}", self.seq),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: self.start + Duration::milliseconds(offset_ms),
        });
    }
}

/// The reference scenario, all on 2026-01-01 from 12:00:00.
///
/// - `Shell1`, `Shell2`: a valid low-degree relay chain.
/// - `Shell1F`: same chain, but the relay also receives from two outsiders.
/// - `SmurfTarget`: eleven small deposits, most of it forwarded onward.
/// - `LegitMerchant`: 25 customers in, 25 suppliers out.
/// - `VelocityUser`: eleven payouts a minute apart.
/// - `CycA` → `CycB` → `CycC` → `CycA`: a three-account ring.
pub fn scenario_ledger() -> Vec<Transaction> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default();
    let mut b = Builder { start, seq: 0, txs: Vec::new() };

    b.push("ShellSrc", "Shell1", 100.0, 0);
    b.push("Shell1", "Shell2", 99.0, 1_000);
    b.push("Shell2", "ShellDst", 98.0, 2_000);

    b.push("ShellSrcF", "Shell1F", 100.0, 0);
    b.push("Shell1F", "Shell2F", 99.0, 1_000);
    b.push("Shell2F", "ShellDstF", 98.0, 2_000);
    b.push("X", "Shell1F", 10.0, 500);
    b.push("Y", "Shell1F", 10.0, 600);

    for i in 1..=11 {
        b.push(&format!("SmurfS{i}"), "SmurfTarget", 50.0, i * 1_000);
    }
    b.push("SmurfTarget", "SmurfExit", 500.0, 20_000);

    for i in 1..=25 {
        b.push(&format!("LegitC{i}"), "LegitMerchant", 50.0, i * 1_000);
        b.push("LegitMerchant", &format!("LegitSup{i}"), 50.0, i * 1_000 + 500);
    }

    for i in 1..=11 {
        b.push("VelocityUser", &format!("VelocityTarget{i}"), 10.0, i * 60_000);
    }

    b.push("CycA", "CycB", 5_000.0, 3_600_000);
    b.push("CycB", "CycC", 4_900.0, 7_200_000);
    b.push("CycC", "CycA", 4_800.0, 10_800_000);

    b.txs
}

/// Round-trip the scenario through CSV, analyse it with `th`, and check
/// every expected verdict.
pub fn run(th: &Thresholds) -> Result<SelfCheckResult> {
    let csv = to_csv(&scenario_ledger())?;
    let analysis = analyze_csv(&csv, None, th)?;
    let failures = verify(&analysis.report);

    for failure in &failures {
        tracing::warn!(%failure, "self-check failure");
    }
    Ok(SelfCheckResult {
        status: if failures.is_empty() { "success" } else { "failure" },
        failures,
        summary: analysis.report.summary,
    })
}

fn verify(report: &AnalysisReport) -> Vec<String> {
    let mut failures = Vec::new();
    let account = |id: &str| report.suspicious_accounts.iter().find(|a| a.account_id == id);
    let has_pattern = |id: &str, tag: &str| account(id).is_some_and(|a| a.detected_patterns.iter().any(|p| p == tag));

    if !has_pattern("Shell1", "shell_network") {
        failures.push("valid shell chain not detected (Shell1)".to_string());
    }
    if has_pattern("Shell1F", "shell_network") {
        failures.push("degree-4 relay wrongly tagged as shell (Shell1F)".to_string());
    }

    match report.fraud_rings.iter().find(|r| r.member_accounts.iter().any(|m| m == "SmurfTarget")) {
        None => failures.push("smurfing ring not created for SmurfTarget".to_string()),
        Some(ring) if ring.member_accounts.len() < 12 => failures.push(format!(
            "smurfing ring incomplete: expected at least 12 members, got {}",
            ring.member_accounts.len()
        )),
        Some(_) => {}
    }

    if let Some(merchant) = account("LegitMerchant") {
        if merchant.suspicion_score > 50.0 {
            failures.push(format!("legitimate merchant scored too high ({})", merchant.suspicion_score));
        }
    }

    if !has_pattern("VelocityUser", "high_velocity") {
        failures.push("high velocity (more than 10 transfers in 1h) not detected".to_string());
    }

    let cycle = report.fraud_rings.iter().find(|r| r.pattern_type == PatternType::Cycle);
    match cycle {
        Some(ring) if ring.member_accounts == ["CycA", "CycB", "CycC"] && ring.risk_score == 91.0 => {}
        Some(ring) => failures.push(format!(
            "cycle ring wrong: members {:?}, risk {}",
            ring.member_accounts, ring.risk_score
        )),
        None => failures.push("three-account cycle not detected".to_string()),
    }

    if report.suspicious_accounts.iter().any(|a| a.ring_id.as_deref().is_some_and(str::is_empty)) {
        failures.push("empty ring_id instead of null".to_string());
    }
    if report
        .suspicious_accounts
        .iter()
        .any(|a| !(0.0..=100.0).contains(&a.suspicion_score))
    {
        failures.push("suspicion_score outside [0, 100]".to_string());
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_pass() {
        let result = run(&Thresholds::default()).unwrap();
        assert!(result.passed(), "failures: {:?}", result.failures);
        assert_eq!(result.status, "success");
    }

    #[test]
    fn disabled_velocity_is_reported() {
        let th = Thresholds { velocity_max_transactions: 1_000, ..Thresholds::default() };
        let result = run(&th).unwrap();
        assert_eq!(result.status, "failure");
        assert!(result.failures.iter().any(|f| f.contains("high velocity")));
    }
}
