//! FundLab CLI — paper-trading cycle runner.
//!
//! Commands:
//! - `run` — drive trading cycles from a TOML config (or a built-in
//!   default universe) against synthetic market data and the paper broker
//! - `status` — print the portfolio snapshot from an audit trail

use anyhow::Result;
use clap::{Parser, Subcommand};
use fundlab_core::cycle::CycleRecord;
use fundlab_core::domain::PortfolioSnapshot;
use fundlab_runner::{
    bootstrap_portfolio, AuditSink, CycleOrchestrator, InstrumentSpec, JsonlAuditSink,
    PaperBroker, RunConfig, SyntheticMarketData,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fundlab", about = "FundLab CLI — multi-analyst paper-trading engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run paper-trading cycles and append each cycle to the audit trail.
    Run {
        /// Path to a TOML config file. Without it, a built-in demo
        /// universe is used.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of cycles to run (overrides the config).
        #[arg(long)]
        cycles: Option<u64>,

        /// Master RNG seed for synthetic data (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Starting capital for a fresh portfolio (overrides the config).
        #[arg(long)]
        capital: Option<f64>,

        /// Audit trail path (overrides the config).
        #[arg(long)]
        audit: Option<PathBuf>,
    },
    /// Print the latest portfolio snapshot from an audit trail.
    Status {
        /// Audit trail path.
        #[arg(long, default_value = "audit.jsonl")]
        audit: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, cycles, seed, capital, audit } => {
            run_cmd(config, cycles, seed, capital, audit).await
        }
        Commands::Status { audit } => status_cmd(&audit),
    }
}

async fn run_cmd(
    config_path: Option<PathBuf>,
    cycles: Option<u64>,
    seed: Option<u64>,
    capital: Option<f64>,
    audit: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RunConfig::load(&path)?,
        None => default_config(),
    };
    if let Some(cycles) = cycles {
        config.cycles = cycles;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(capital) = capital {
        config.initial_capital = capital;
    }
    if let Some(audit) = audit {
        config.audit_path = audit;
    }
    config.validate()?;

    let universe = config.instrument_universe();
    let data = Arc::new(SyntheticMarketData::new(config.seed, universe.clone()));
    let broker = Arc::new(PaperBroker::new());
    let sink = Arc::new(JsonlAuditSink::new(config.audit_path.clone()));
    let portfolio = bootstrap_portfolio(sink.as_ref(), config.initial_capital)?;

    let mut orchestrator = CycleOrchestrator::new(
        universe,
        config.policy.clone(),
        data.clone(),
        broker,
        sink.clone(),
        portfolio,
    );

    for tick in 0..config.cycles {
        data.set_tick(tick);
        let record = orchestrator.run_cycle().await;
        print_cycle(&record);
    }

    println!();
    if let Some(snapshot) = sink.latest_snapshot()? {
        print_snapshot(&snapshot);
    }
    println!("Audit trail: {}", config.audit_path.display());
    Ok(())
}

fn status_cmd(audit: &PathBuf) -> Result<()> {
    let sink = JsonlAuditSink::new(audit.clone());
    match sink.latest_snapshot()? {
        Some(snapshot) => {
            print_snapshot(&snapshot);
            Ok(())
        }
        None => {
            println!("No cycle records in {}", audit.display());
            Ok(())
        }
    }
}

fn print_cycle(record: &CycleRecord) {
    let status = if record.degraded { "DEGRADED" } else { "complete" };
    println!(
        "cycle {:>3} [{status}]  signals {:>3}  orders {:>2}  fills {:>2}  cash {:>12.2}  equity {:>12.2}",
        record.cycle,
        record.signals.len(),
        record.order_count(),
        record.fill_count(),
        record.snapshot.cash,
        record.snapshot.equity,
    );
    for reason in &record.degraded_reasons {
        println!("    ! {reason}");
    }
}

fn print_snapshot(snapshot: &PortfolioSnapshot) {
    println!("Portfolio as of {}", snapshot.as_of);
    println!("  cash:            {:>14.2}", snapshot.cash);
    println!("  equity:          {:>14.2}", snapshot.equity);
    println!("  realized P&L:    {:>14.2}", snapshot.realized_pnl);
    println!("  unrealized P&L:  {:>14.2}", snapshot.unrealized_pnl);
    if snapshot.positions.is_empty() {
        println!("  (no open positions)");
    } else {
        println!("  positions:");
        for position in &snapshot.positions {
            println!(
                "    {:<8} {:>10.0} @ {:>10.2}  (cost {:>12.2})",
                position.symbol,
                position.quantity,
                position.avg_cost,
                position.cost_basis(),
            );
        }
    }
}

/// Demo universe used when no config file is given.
fn default_config() -> RunConfig {
    let spec = |symbol: &str, venue: &str, sector: &str| InstrumentSpec {
        symbol: symbol.into(),
        venue: venue.into(),
        sector: sector.into(),
        tradable: true,
    };
    RunConfig {
        universe: vec![
            spec("AAPL", "NASDAQ", "Technology"),
            spec("MSFT", "NASDAQ", "Technology"),
            spec("NVDA", "NASDAQ", "Technology"),
            spec("JPM", "NYSE", "Financial"),
            spec("XOM", "NYSE", "Energy"),
            spec("JNJ", "NYSE", "Healthcare"),
        ],
        initial_capital: 500_000.0,
        cycles: 10,
        seed: 42,
        audit_path: PathBuf::from("audit.jsonl"),
        policy: Default::default(),
    }
}
