use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledger_fraud_detect::config::Config;
use ledger_fraud_detect::generator::{to_csv, LedgerGenerator};
use ledger_fraud_detect::types::{ColumnMapping, GENERATED_TIMESTAMP, GENERATED_TX_ID};
use ledger_fraud_detect::{analyze_csv, analyze_transactions, ingest, selfcheck, stress, web};

#[derive(Parser)]
#[command(name = "ledger-fraud-detect", about = "Forensic fraud-ring and smurfing detection over transaction ledgers")]
struct Cli {
    /// Run mode: analyze, preview, demo, selfcheck, serve, or stress
    #[arg(long, default_value = "analyze")]
    mode: String,

    /// CSV ledger to read (analyze/preview; "-" for stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write output here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Header of the sender column (skips auto-mapping)
    #[arg(long)]
    sender_col: Option<String>,

    /// Header of the receiver column
    #[arg(long)]
    receiver_col: Option<String>,

    /// Header of the amount column
    #[arg(long)]
    amount_col: Option<String>,

    /// Header of the timestamp column (default: generated)
    #[arg(long)]
    timestamp_col: Option<String>,

    /// Header of the transaction id column (default: generated)
    #[arg(long)]
    tx_id_col: Option<String>,

    /// Config file (default: ~/.config/ledger-fraud-detect/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Web server port (serve mode; overrides the configured bind port)
    #[arg(long)]
    port: Option<u16>,

    /// Fraud injection rate for generated ledgers (0.0-1.0)
    #[arg(long)]
    fraud_rate: Option<f64>,

    /// Generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Generated ledger size (demo), or largest stress level (0 = all)
    #[arg(long, default_value = "2000")]
    size: usize,

    /// Seconds per stress level
    #[arg(long, default_value = "5")]
    duration: u64,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Emit only the report, without the graph projection
    #[arg(long)]
    report_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledger_fraud_detect=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref());
    if let Some(rate) = cli.fraud_rate {
        config.generator.fraud_rate = rate;
    }
    if let Some(seed) = cli.seed {
        config.generator.seed = seed;
    }
    if let Some(port) = cli.port {
        let host = config.server.bind.rsplit_once(':').map_or("0.0.0.0", |(host, _)| host).to_string();
        config.server.bind = format!("{host}:{port}");
    }

    match cli.mode.as_str() {
        "analyze" => run_analyze(&cli, &config)?,
        "preview" => run_preview(&cli)?,
        "demo" => run_demo(&cli, &config)?,
        "selfcheck" => run_selfcheck(&cli, &config)?,
        "serve" => web::run(&config).await?,
        "stress" => {
            let size = cli.size;
            let duration = cli.duration;
            tokio::task::spawn_blocking(move || stress::run(&config, duration, size)).await??
        }
        other => bail!("unknown mode: {other}. Use --mode analyze|preview|demo|selfcheck|serve|stress"),
    }

    Ok(())
}

fn run_analyze(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let text = read_input(cli)?;
    let mapping = cli_mapping(cli)?;

    match analyze_csv(&text, mapping.as_ref(), &config.detection) {
        Ok(analysis) => {
            if cli.report_only {
                write_json(cli, &analysis.report)
            } else {
                write_json(cli, &analysis)
            }
        }
        Err(e) if e.is_needs_mapping() => {
            let preview = ingest::preview_csv(&text)?;
            eprintln!("Could not map columns automatically. Headers found:");
            for header in &preview.headers {
                eprintln!("  {header}");
            }
            eprintln!("Re-run with --sender-col, --receiver-col and --amount-col.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_preview(cli: &Cli) -> anyhow::Result<()> {
    let text = read_input(cli)?;
    let preview = ingest::preview_csv(&text)?;
    write_json(cli, &preview)
}

/// Generate a ledger, analyse it, and report which injected scenarios were caught.
fn run_demo(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let mut gen = LedgerGenerator::new(config.generator.seed, config.generator.fraud_rate);
    let ledger = gen.generate(cli.size);

    if let Some(path) = &cli.output {
        let csv = to_csv(&ledger.transactions)?;
        std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
        println!("Ledger written to {}", path.display());
    }

    let analysis = analyze_transactions(&ledger.transactions, &config.detection);
    let summary = &analysis.report.summary;

    println!("=== ledger-fraud-detect (demo) ===");
    println!(
        "Seed: {}, Fraud rate: {:.0}%, Transactions: {}",
        config.generator.seed,
        gen.fraud_rate * 100.0,
        ledger.transactions.len()
    );
    println!();
    println!("  Accounts analysed:  {}", summary.total_accounts_analyzed);
    println!("  Accounts flagged:   {}", summary.suspicious_accounts_flagged);
    println!("  Rings detected:     {}", summary.fraud_rings_detected);
    println!("  Fan-in hubs:        {}", summary.fan_in_accounts);
    println!("  Fan-out hubs:       {}", summary.fan_out_accounts);
    println!("  Processing time:    {:.4}s", summary.processing_time_seconds);
    println!();

    let flagged = |id: &str| analysis.report.suspicious_accounts.iter().find(|a| a.account_id == id);
    let mut caught = 0;
    println!("  Injected scenarios:");
    for scenario in &ledger.scenarios {
        let verdict = match flagged(&scenario.focus) {
            Some(account) => {
                caught += 1;
                format!("flagged {:>5.1}  {}", account.suspicion_score, account.detected_patterns.join(","))
            }
            None => "MISSED".to_string(),
        };
        println!("    {:<15} {:<10} {}", format!("{:?}", scenario.kind), scenario.focus, verdict);
    }
    println!();
    println!("  Caught {}/{} injected scenarios", caught, ledger.scenarios.len());

    println!();
    println!("  Top accounts:");
    for account in analysis.report.suspicious_accounts.iter().take(10) {
        println!(
            "    {:<12} {:>5.1}  {:<8} {}",
            account.account_id,
            account.suspicion_score,
            account.ring_id.as_deref().unwrap_or("-"),
            account.explanation
        );
    }
    Ok(())
}

fn run_selfcheck(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let result = selfcheck::run(&config.detection)?;
    write_json(cli, &result)?;
    if !result.passed() {
        bail!("self-check failed with {} failure(s)", result.failures.len());
    }
    Ok(())
}

fn read_input(cli: &Cli) -> anyhow::Result<String> {
    match cli.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => std::io::read_to_string(std::io::stdin()).context("reading stdin"),
    }
}

fn cli_mapping(cli: &Cli) -> anyhow::Result<Option<ColumnMapping>> {
    match (&cli.sender_col, &cli.receiver_col, &cli.amount_col) {
        (None, None, None) => Ok(None),
        (Some(sender), Some(receiver), Some(amount)) => Ok(Some(ColumnMapping {
            sender_id: sender.clone(),
            receiver_id: receiver.clone(),
            amount: amount.clone(),
            timestamp: cli.timestamp_col.clone().unwrap_or_else(|| GENERATED_TIMESTAMP.to_string()),
            transaction_id: cli.tx_id_col.clone().unwrap_or_else(|| GENERATED_TX_ID.to_string()),
        })),
        _ => bail!("--sender-col, --receiver-col and --amount-col must be given together"),
    }
}

fn write_json<T: serde::Serialize>(cli: &Cli, value: &T) -> anyhow::Result<()> {
    let json = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    match &cli.output {
        Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
