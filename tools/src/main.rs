//! kilowatt-runner: headless analytics runner.
//!
//! Usage:
//!   kilowatt-runner --db records.db --out results.json
//!   kilowatt-runner --demo-seed 42 --serve
//!   kilowatt-runner --db records.db --config analytics.json --serve

use anyhow::Result;
use kilowatt_core::{
    cache::ResultCache,
    clock::{Clock, SystemClock},
    config::AnalyticsConfig,
    demo::DemoDataset,
    error::AnalyticsError,
    forecast::ForecastRequest,
    optimize::OptimizationRequest,
    query::{CommissionFilter, PageRequest, PricingFilter, UsageFilter},
    service::{group_thousands, AnalyticsService},
    source::RecordSource,
    store::RecordStore,
};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetSummary,
    GetResults,
    Usage {
        #[serde(default)]
        filter: UsageFilter,
        #[serde(default)]
        page:   PageRequest,
    },
    Pricing {
        #[serde(default)]
        filter: PricingFilter,
    },
    Commissions {
        #[serde(default)]
        filter: CommissionFilter,
    },
    Market,
    Forecast {
        #[serde(default)]
        request: ForecastRequest,
    },
    Optimize {
        #[serde(default)]
        request: OptimizationRequest,
    },
    Anomalies {
        #[serde(default)]
        severity: Option<String>,
    },
    Performance,
    Refresh,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config_path = flag_value(&args, "--config");
    let out_path = flag_value(&args, "--out");
    let demo_seed = flag_value(&args, "--demo-seed").map(str::parse::<u64>).transpose()?;
    let serve = args.iter().any(|a| a == "--serve");

    let config = match config_path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };

    if !serve {
        println!("kilowatt-runner");
        println!("  db:          {db}");
        println!("  config:      {}", config_path.unwrap_or("(defaults)"));
        println!("  cache ttl:   {}s", config.cache_ttl_secs);
        if let Some(seed) = demo_seed {
            println!("  demo seed:   {seed}");
        }
        println!();
    }

    let store = Arc::new(if db == ":memory:" {
        RecordStore::in_memory()?
    } else {
        RecordStore::open(db)?
    });
    store.migrate()?;

    if let Some(seed) = demo_seed {
        DemoDataset::generate(seed).load_into(&store)?;
    }
    let (usage_rows, pricing_rows, commission_rows) = store.table_counts()?;
    log::info!("runner: {usage_rows} usage, {pricing_rows} pricing, {commission_rows} commission rows");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut cache = ResultCache::new(config.cache_ttl(), clock);
    if config.snapshot_enabled {
        cache = cache.with_snapshots(Arc::clone(&store));
    }
    let cache = Arc::new(cache);
    if cache.restore()? {
        log::info!("runner: serving restored snapshot until the first refresh completes");
    }

    let source: Arc<dyn RecordSource> = store;
    let service = AnalyticsService::with_cache(config, cache, source);

    if serve {
        service.trigger_refresh();
        run_serve_loop(&service)?;
    } else {
        let bundle = service.refresh_now()?;
        print_summary(&service)?;
        if let Some(path) = out_path {
            std::fs::write(path, bundle.to_json_pretty()?)
                .map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
            println!();
            println!("  results written to {path}");
        }
    }

    Ok(())
}

fn run_serve_loop(service: &AnalyticsService) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string(), "status": "client_input" });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if let IpcCommand::Quit = cmd {
            break;
        }
        let reply = match handle_command(service, cmd) {
            Ok(value) => value,
            Err(e) => error_reply(&e),
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

/// Replies are written straight from the typed values so map entries keep
/// the order their serializers emit.
fn handle_command(service: &AnalyticsService, cmd: IpcCommand) -> Result<String, AnalyticsError> {
    match cmd {
        IpcCommand::GetSummary => to_json(&service.get_summary()?),
        IpcCommand::GetResults => to_json(service.get_results()?.as_ref()),
        IpcCommand::Usage { filter, page } => to_json(&service.get_usage_analysis(&filter, page)?),
        IpcCommand::Pricing { filter } => to_json(&service.get_pricing_analysis(&filter)?),
        IpcCommand::Commissions { filter } => to_json(&service.get_commission_analysis(&filter)?),
        IpcCommand::Market => to_json(&service.get_market_intelligence()?),
        IpcCommand::Forecast { request } => to_json(&service.forecast(&request)?),
        IpcCommand::Optimize { request } => to_json(&service.optimize(&request)?),
        IpcCommand::Anomalies { severity } => to_json(&service.anomalies(severity.as_deref())?),
        IpcCommand::Performance => to_json(&service.performance_metrics()?),
        IpcCommand::Refresh => Ok(serde_json::json!({
            "message": "Analytics refresh triggered",
            "accepted": service.trigger_refresh(),
        })
        .to_string()),
        IpcCommand::Quit => Ok(String::new()),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AnalyticsError> {
    Ok(serde_json::to_string(value)?)
}

fn error_reply(e: &AnalyticsError) -> String {
    serde_json::json!({ "error": e.to_string(), "status": e.status() }).to_string()
}

fn print_summary(service: &AnalyticsService) -> Result<()> {
    let bundle = service.get_results()?;
    let summary = service.get_summary()?;
    let metrics = service.performance_metrics()?;

    println!("=== ANALYTICS SUMMARY ===");
    println!("  computed at:      {}", metrics.last_updated);
    println!("  refresh time:     {:.3}s", metrics.analysis_duration_seconds);
    println!("  accounts:         {}", metrics.total_accounts_analyzed);
    println!("  service points:   {}", metrics.total_service_points_processed);
    println!("  pricing groups:   {}", bundle.pricing_analyses.len());
    println!("  providers paid:   {}", bundle.commission_analyses.len());
    println!("  market size:      {} kWh/year", group_thousands(summary.market_size_kwh));
    println!("  market value:     ${}", group_thousands(summary.market_value_usd));
    println!("  top zones:        {}", join_or_none(&summary.top_performing_zones));
    println!("  competitive:      {}", join_or_none(&summary.most_competitive_providers));

    println!();
    println!("=== KEY INSIGHTS ===");
    for insight in &summary.key_insights {
        println!("  {insight}");
    }

    let anomalies = service.anomalies(None)?;
    if !anomalies.is_empty() {
        println!();
        println!("=== ANOMALIES ({}) ===", anomalies.len());
        for a in anomalies.iter().take(10) {
            println!("  {:?} | {} | score {:.2}", a.severity, a.account_name, a.anomaly_score);
        }
    }
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".into()
    } else {
        items.join(", ")
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
