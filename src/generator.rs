//! Seeded synthetic ledgers: retail background traffic with injected fraud
//! scenarios and their ground truth.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::types::{Transaction, TIMESTAMP_FORMAT};

const SPAN_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Cycle,
    FanIn,
    FanOut,
    ShellChain,
    VelocityBurst,
}

const ALL_SCENARIOS: &[ScenarioKind] = &[
    ScenarioKind::Cycle,
    ScenarioKind::FanIn,
    ScenarioKind::FanOut,
    ScenarioKind::ShellChain,
    ScenarioKind::VelocityBurst,
];

/// One injected scenario. `focus` is the account every detector run should flag.
#[derive(Debug, Clone, Serialize)]
pub struct InjectedScenario {
    pub kind: ScenarioKind,
    pub focus: String,
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedLedger {
    /// Time-ordered transactions.
    pub transactions: Vec<Transaction>,
    pub scenarios: Vec<InjectedScenario>,
}

pub struct LedgerGenerator {
    rng: StdRng,
    pub fraud_rate: f64,
    start: NaiveDateTime,
    tx_seq: u64,
    mule_seq: u64,
}

impl LedgerGenerator {
    pub fn new(seed: u64, fraud_rate: f64) -> Self {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            rng: StdRng::seed_from_u64(seed),
            fraud_rate: fraud_rate.clamp(0.0, 1.0),
            start,
            tx_seq: 0,
            mule_seq: 0,
        }
    }

    /// `size` background transfers plus roughly `size * fraud_rate` injected ones.
    pub fn generate(&mut self, size: usize) -> GeneratedLedger {
        let customers = accounts("CUST", 4, (size / 8).max(20));
        let merchants = accounts("MERCH", 3, (size / 50).max(5));
        let suppliers = accounts("SUPP", 2, (size / 200).max(2));

        let mut transactions = Vec::with_capacity(size + size / 5);
        for _ in 0..size {
            let at = self.random_instant();
            // Customers buy from merchants; merchants settle small invoices with suppliers.
            let tx = if self.rng.gen_bool(0.9) {
                let from = pick(&mut self.rng, &customers);
                let to = pick(&mut self.rng, &merchants);
                let amount = self.amount(5.0, 500.0);
                self.transfer(from, to, amount, at)
            } else {
                let from = pick(&mut self.rng, &merchants);
                let to = pick(&mut self.rng, &suppliers);
                let amount = self.amount(50.0, 300.0);
                self.transfer(from, to, amount, at)
            };
            transactions.push(tx);
        }

        let injections = if self.fraud_rate > 0.0 {
            ((size as f64 * self.fraud_rate) / 10.0).ceil() as usize
        } else {
            0
        };
        let mut scenarios = Vec::with_capacity(injections);
        for i in 0..injections {
            let kind = if i < ALL_SCENARIOS.len() {
                ALL_SCENARIOS[i]
            } else {
                ALL_SCENARIOS[self.rng.gen_range(0..ALL_SCENARIOS.len())]
            };
            let scenario = self.inject(kind, &merchants, &mut transactions);
            scenarios.push(scenario);
        }

        transactions.sort_by_key(|tx| tx.timestamp);
        tracing::debug!(
            transactions = transactions.len(),
            scenarios = scenarios.len(),
            "generated ledger"
        );
        GeneratedLedger { transactions, scenarios }
    }

    fn inject(&mut self, kind: ScenarioKind, merchants: &[String], out: &mut Vec<Transaction>) -> InjectedScenario {
        let base = self.random_instant();
        match kind {
            ScenarioKind::Cycle => {
                let n = self.rng.gen_range(3..=5);
                let members = self.mules(n);
                for (i, from) in members.iter().enumerate() {
                    let to = &members[(i + 1) % n];
                    let amount = self.amount(5_000.0, 9_000.0);
                    out.push(self.transfer(from, to, amount, base + Duration::hours(i as i64 * 3)));
                }
                InjectedScenario { kind, focus: members[0].clone(), accounts: members }
            }
            ScenarioKind::FanIn => {
                let n = self.rng.gen_range(6..=10);
                let hub = self.mules(1).remove(0);
                let exit = self.mules(1).remove(0);
                let senders = self.mules(n);
                let mut total = 0.0;
                for (i, sender) in senders.iter().enumerate() {
                    let amount = self.amount(500.0, 2_000.0);
                    total += amount;
                    out.push(self.transfer(sender, &hub, amount, base + Duration::minutes(i as i64 * 45)));
                }
                let last_in = base + Duration::minutes((n as i64 - 1) * 45);
                let forwarded = (total * 0.85 * 100.0).round() / 100.0;
                out.push(self.transfer(&hub, &exit, forwarded, last_in + Duration::hours(2)));

                let mut accounts = vec![hub.clone()];
                accounts.extend(senders);
                accounts.push(exit);
                InjectedScenario { kind, focus: hub, accounts }
            }
            ScenarioKind::FanOut => {
                let n = self.rng.gen_range(6..=10);
                let source = self.mules(1).remove(0);
                let receivers = self.mules(n);
                for (i, receiver) in receivers.iter().enumerate() {
                    let amount = self.amount(800.0, 3_000.0);
                    out.push(self.transfer(&source, receiver, amount, base + Duration::minutes(i as i64 * 30)));
                }
                let mut accounts = vec![source.clone()];
                accounts.extend(receivers);
                InjectedScenario { kind, focus: source, accounts }
            }
            ScenarioKind::ShellChain => {
                let hops = self.rng.gen_range(3..=5);
                let chain = self.mules(hops + 1);
                let mut amount = self.amount(20_000.0, 50_000.0);
                for (i, pair) in chain.windows(2).enumerate() {
                    out.push(self.transfer(&pair[0], &pair[1], amount, base + Duration::hours(i as i64 * 6)));
                    amount = (amount * 0.97 * 100.0).round() / 100.0;
                }
                InjectedScenario { kind, focus: chain[1].clone(), accounts: chain }
            }
            ScenarioKind::VelocityBurst => {
                let n = self.rng.gen_range(12..=15);
                let source = self.mules(1).remove(0);
                for i in 0..n {
                    let to = pick(&mut self.rng, merchants);
                    let amount = self.amount(20.0, 200.0);
                    out.push(self.transfer(&source, to, amount, base + Duration::minutes(i as i64 * 4)));
                }
                InjectedScenario { kind, focus: source.clone(), accounts: vec![source] }
            }
        }
    }

    fn mules(&mut self, n: usize) -> Vec<String> {
        (0..n)
            .map(|_| {
                self.mule_seq += 1;
                format!("MULE_{:04}", self.mule_seq)
            })
            .collect()
    }

    fn transfer(&mut self, from: &str, to: &str, amount: f64, at: NaiveDateTime) -> Transaction {
        self.tx_seq += 1;
        Transaction {
            transaction_id: format!("TX_{:08}", self.tx_seq),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: at,
        }
    }

    /// Whole cents, so a CSV round trip is lossless.
    fn amount(&mut self, low: f64, high: f64) -> f64 {
        (self.rng.gen_range(low..high) * 100.0).round() / 100.0
    }

    /// Whole seconds within the ledger span, leaving a day of headroom for
    /// scenarios that stretch past their start.
    fn random_instant(&mut self) -> NaiveDateTime {
        let secs = self.rng.gen_range(0..(SPAN_DAYS - 1) * 86_400);
        self.start + Duration::seconds(secs)
    }
}

fn accounts(prefix: &str, width: usize, n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("{prefix}_{i:0width$}")).collect()
}

fn pick<'a>(rng: &mut StdRng, pool: &'a [String]) -> &'a str {
    pool.choose(rng).map_or("", String::as_str)
}

/// Canonical five-column CSV with a header line. Lossless: parsing it back
/// under [`ColumnMapping::canonical`](crate::types::ColumnMapping::canonical)
/// yields the same transactions.
pub fn to_csv(transactions: &[Transaction]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"])?;
    for tx in transactions {
        // Shortest representation that parses back to the same f64.
        let amount = tx.amount.to_string();
        let timestamp = tx.timestamp.format(TIMESTAMP_FORMAT).to_string();
        writer.write_record([
            tx.transaction_id.as_str(),
            tx.sender_id.as_str(),
            tx.receiver_id.as_str(),
            amount.as_str(),
            timestamp.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| AnalysisError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
