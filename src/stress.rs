use std::time::{Duration, Instant};

use anyhow::Context;

use crate::analyze_transactions;
use crate::config::Config;
use crate::generator::{to_csv, LedgerGenerator};
use crate::ingest;
use crate::latency::LatencyTracker;
use crate::types::ColumnMapping;

struct StressLevel {
    transactions: usize,
    fraud_rate: f64,
}

const LEVELS: &[StressLevel] = &[
    StressLevel { transactions: 1_000,   fraud_rate: 0.05 },
    StressLevel { transactions: 5_000,   fraud_rate: 0.05 },
    StressLevel { transactions: 10_000,  fraud_rate: 0.02 },
    StressLevel { transactions: 25_000,  fraud_rate: 0.02 },
    StressLevel { transactions: 50_000,  fraud_rate: 0.01 },
    StressLevel { transactions: 100_000, fraud_rate: 0.01 },
];

struct LevelResult {
    level: usize,
    ledger_size: usize,
    accounts: usize,
    runs: u64,
    tx_per_sec: u64,
    flagged: usize,
    rings: usize,
    parse_p50: u64,
    parse_p99: u64,
    analyze_p50: u64,
    analyze_p95: u64,
    analyze_p99: u64,
    render_p99: u64,
    duration_secs: f64,
}

/// Analyse generated ledgers of growing size, each repeatedly for
/// `level_duration` seconds (at least once), and print a latency table.
/// `max_size` caps the levels run; 0 runs them all.
pub fn run(config: &Config, level_duration: u64, max_size: usize) -> anyhow::Result<()> {
    let levels: Vec<&StressLevel> = LEVELS
        .iter()
        .filter(|l| max_size == 0 || l.transactions <= max_size)
        .collect();
    println!("=== STRESS TEST ===");
    println!(
        "Levels: {}, Duration per level: {}s, Largest ledger: {} transactions",
        levels.len(),
        level_duration,
        levels.last().map_or(0, |l| l.transactions)
    );
    println!();

    let th = &config.detection;
    let mapping = ColumnMapping::canonical();
    let mut latency = LatencyTracker::new();
    let mut results: Vec<LevelResult> = Vec::new();
    let level_dur = Duration::from_secs(level_duration);

    for (idx, level) in levels.iter().enumerate() {
        let level_num = idx + 1;
        print!(
            "Level {}/{}: {} transactions, {:.0}% injected ... ",
            level_num,
            levels.len(),
            level.transactions,
            level.fraud_rate * 100.0
        );

        let ledger = LedgerGenerator::new(config.generator.seed, level.fraud_rate).generate(level.transactions);
        let csv = to_csv(&ledger.transactions).context("encoding generated ledger")?;

        latency.reset();
        let mut runs = 0u64;
        let mut processed = 0u64;
        let mut last = None;
        let level_start = Instant::now();

        while runs == 0 || level_start.elapsed() < level_dur {
            let t = latency.start();
            let parsed = ingest::parse_transactions(&csv, &mapping).context("parsing generated ledger")?;
            latency.record_parse(t);

            let t = latency.start();
            let analysis = analyze_transactions(&parsed.transactions, th);
            latency.record_analyze(t);

            let t = latency.start();
            let rendered = serde_json::to_string(&analysis.report).context("rendering report")?;
            latency.record_render(t);
            std::hint::black_box(rendered);

            runs += 1;
            processed += parsed.transactions.len() as u64;
            last = Some(analysis);
        }

        let elapsed = level_start.elapsed().as_secs_f64();
        let tx_per_sec = (processed as f64 / elapsed) as u64;
        let parse = latency.parse_stats();
        let analyze = latency.analyze_stats();
        let render = latency.render_stats();
        let summary = last.map(|a| a.report.summary);

        println!("{} tx/sec (analyze p99={})", tx_per_sec, format_latency(analyze.p99_us));

        results.push(LevelResult {
            level: level_num,
            ledger_size: ledger.transactions.len(),
            accounts: summary.as_ref().map_or(0, |s| s.total_accounts_analyzed),
            runs,
            tx_per_sec,
            flagged: summary.as_ref().map_or(0, |s| s.suspicious_accounts_flagged),
            rings: summary.as_ref().map_or(0, |s| s.fraud_rings_detected),
            parse_p50: parse.p50_us,
            parse_p99: parse.p99_us,
            analyze_p50: analyze.p50_us,
            analyze_p95: analyze.p95_us,
            analyze_p99: analyze.p99_us,
            render_p99: render.p99_us,
            duration_secs: elapsed,
        });
    }

    println!();
    print_results_table(&results);
    print_scaling_analysis(&results);
    println!();
    print_latency_detail(&results);
    Ok(())
}

fn format_latency(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.1}s", us as f64 / 1_000_000.0)
    } else if us >= 1_000 {
        format!("{:.1}ms", us as f64 / 1_000.0)
    } else {
        format!("{}us", us)
    }
}

fn print_results_table(results: &[LevelResult]) {
    println!("{}", "=".repeat(90));
    println!("{:^90}", "STRESS TEST RESULTS");
    println!("{}", "=".repeat(90));
    println!(
        " {:<5} {:>9} {:>9} {:>6} {:>10} {:>10} {:>8} {:>6} {:>8}",
        "Level", "Ledger", "Accounts", "Runs", "Tx/s", "Anlz p99", "Flagged", "Rings", "Time"
    );
    println!("{}", "-".repeat(90));

    for r in results {
        println!(
            " {:<5} {:>9} {:>9} {:>6} {:>10} {:>10} {:>8} {:>6} {:>7.1}s",
            r.level,
            r.ledger_size,
            r.accounts,
            r.runs,
            r.tx_per_sec,
            format_latency(r.analyze_p99),
            r.flagged,
            r.rings,
            r.duration_secs,
        );
    }

    println!("{}", "=".repeat(90));

    let total_runs: u64 = results.iter().map(|r| r.runs).sum();
    let total_time: f64 = results.iter().map(|r| r.duration_secs).sum();
    println!("Totals: {} analyses in {:.1}s", total_runs, total_time);
}

fn print_latency_detail(results: &[LevelResult]) {
    println!("Latency detail:");
    println!(
        " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Level", "Parse p50", "Parse p99", "Anlz p50", "Anlz p95", "Anlz p99", "Render p99"
    );
    println!("{}", "-".repeat(75));
    for r in results {
        println!(
            " {:<5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            r.level,
            format_latency(r.parse_p50),
            format_latency(r.parse_p99),
            format_latency(r.analyze_p50),
            format_latency(r.analyze_p95),
            format_latency(r.analyze_p99),
            format_latency(r.render_p99),
        );
    }
}

fn print_scaling_analysis(results: &[LevelResult]) {
    println!();

    // Throughput should stay roughly flat if the engine scales linearly.
    let (Some(first), Some(last)) = (results.first(), results.last()) else {
        return;
    };
    if first.tx_per_sec > 0 && results.len() > 1 {
        let pct = last.tx_per_sec as f64 / first.tx_per_sec as f64 * 100.0;
        println!(
            "Scaling: {} tx/sec at {} transactions vs {} tx/sec at {} ({:.0}%)",
            last.tx_per_sec, last.ledger_size, first.tx_per_sec, first.ledger_size, pct
        );
        if pct < 50.0 {
            println!("  Throughput more than halved across levels; look for super-linear stages.");
        }
    }

    if let Some(p) = results.iter().max_by_key(|r| r.tx_per_sec) {
        println!("Peak throughput: ~{} tx/sec (Level {})", p.tx_per_sec, p.level);
    }
}
