//! Command-line interface for tradeguard
//!
//! Runs the guarded trading assistant with rule-based demo agents, either
//! for a single query or as an interactive session.
//!
//! ```bash
//! tradeguard --query "Buy 50 shares of AAPL at market" --trace
//! TRADEGUARD_MAX_ORDERS_PER_SESSION=3 tradeguard --session alice
//! ```

mod agents;
mod render;

use agents::{FaqAgent, MarketInsightsAgent, TaskAgent};
use anyhow::Context as _;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};
use tradeguard_guardrails::GuardrailConfig;
use tradeguard_supervisor::{
    EventSink, FAQ_AGENT, KeywordRouter, NoopSink, Supervisor, SupervisorConfig, TracingSink,
};
use tradeguard_tools::{OrderTool, PlaceOrderTool, QuoteTool, ToolRegistry};
use tradeguard_utils::{AppConfig, LogFormat, init_tracing};

/// Prices served by the demo quote tool
const DEMO_PRICES: &[(&str, f64)] = &[
    ("AAPL", 189.5),
    ("MSFT", 415.2),
    ("TSLA", 242.8),
    ("NVDA", 121.4),
    ("AMZN", 186.1),
    ("GOOGL", 165.3),
];

#[derive(Parser, Debug)]
#[command(name = "tradeguard")]
#[command(about = "Guarded multi-agent trading assistant", long_about = None)]
struct Args {
    /// Session identifier; order limits are counted per session
    #[arg(short, long, default_value = "local")]
    session: String,

    /// Answer a single query and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Override the agent hop limit per turn
    #[arg(long)]
    max_hops: Option<u32>,

    /// Print the stage-by-stage trace of every turn
    #[arg(short, long)]
    trace: bool,

    /// Log turn events through tracing
    #[arg(long)]
    events: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn build_supervisor(args: &Args) -> anyhow::Result<Supervisor> {
    let guardrail_config =
        GuardrailConfig::from_env().context("Invalid guardrail configuration")?;
    let mut config = SupervisorConfig::from_env().context("Invalid supervisor configuration")?;
    if let Some(max_hops) = args.max_hops {
        config.max_hops = max_hops;
    }

    let tools = ToolRegistry::new();
    for tool in OrderTool::all() {
        tools.register(Arc::new(tool));
    }
    tools.register(Arc::new(PlaceOrderTool::new()));
    tools.register(Arc::new(QuoteTool::new(DEMO_PRICES.iter().copied())));

    let events: Arc<dyn EventSink> = if args.events {
        Arc::new(TracingSink)
    } else {
        Arc::new(NoopSink)
    };

    let supervisor = Supervisor::builder()
        .config(config)
        .guardrail_config(guardrail_config)
        .agent(Arc::new(FaqAgent::new()?))
        .agent(Arc::new(TaskAgent::new()?))
        .agent(Arc::new(MarketInsightsAgent::new()?))
        .router(Arc::new(KeywordRouter::new().with_default(FAQ_AGENT)))
        .tools(Arc::new(tools))
        .event_sink(events)
        .build()?;
    Ok(supervisor)
}

async fn answer(supervisor: &Supervisor, session: &str, query: &str, trace: bool) {
    let outcome = supervisor.handle(session, query).await;
    println!("{}\n", outcome.response);
    if trace {
        println!("{}\n", render::trace_table(&outcome.turn));
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /orders   - orders placed in this session");
    println!("  /metrics  - turn statistics so far");
    println!("  /reset    - forget this session's turns and orders");
    println!("  /help     - show this help");
    println!("  /exit     - quit");
    println!();
}

async fn run_repl(supervisor: &Supervisor, args: &Args) -> anyhow::Result<()> {
    println!("tradeguard - session '{}'. Type /help for commands.\n", args.session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        match input {
            "" => {}
            "/exit" | "/quit" => break,
            "/help" => print_help(),
            "/orders" => println!(
                "{} orders placed in session '{}'\n",
                supervisor.order_count(&args.session),
                args.session
            ),
            "/metrics" => println!("{}\n", render::metrics_table(&supervisor.metrics())),
            "/reset" => {
                supervisor.reset_session(&args.session);
                println!("Session reset.\n");
            }
            query => {
                let evicted = supervisor.evict_idle();
                debug!(evicted, "Idle sweep");
                answer(supervisor, &args.session, query, args.trace).await;
            }
        }
    }

    println!("{}", render::metrics_table(&supervisor.metrics()));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app_config = AppConfig::from_env()?;
    if args.json_logs {
        app_config.log_format = LogFormat::Json;
    }
    init_tracing(app_config.log_format, &app_config.log_filter);

    info!(environment = %app_config.environment, session = %args.session, "Starting tradeguard");
    let supervisor = build_supervisor(&args)?;

    match &args.query {
        Some(query) => answer(&supervisor, &args.session, query, args.trace).await,
        None => run_repl(&supervisor, &args).await?,
    }

    Ok(())
}
