//! Tradeflow Simulator CLI
//!
//! Run route sequences on a virtual clock and check their invariants.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tradeflow_core::{load_route_file, order_exporters_first, CentroidResolver, ChoreographyConfig};
use tradeflow_sim::scenarios::ScenarioId;
use tradeflow_sim::{ScenarioResult, ScenarioRunner};

/// Tradeflow route sequence simulator
#[derive(Parser, Debug)]
#[command(name = "tradeflow-sim")]
#[command(about = "Run deterministic route sequence simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (full_route, cancel_mid_arc, ..., all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Choreography config (JSON); missing fields use defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Route to fly instead of the built-in one (JSON array of stops)
    #[arg(short, long)]
    route: Option<String>,

    /// Country boundaries (GeoJSON) used to place route stops
    #[arg(short, long)]
    geojson: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export sampled frames and notifications to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn exit_with(message: String) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Tradeflow Sequence Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match &args.config {
        Some(path) => ChoreographyConfig::from_json_file(path)
            .unwrap_or_else(|e| exit_with(format!("config {}: {}", path, e))),
        None => ChoreographyConfig::default(),
    };
    if let Err(e) = config.validate() {
        exit_with(format!("config: {}", e));
    }

    let route = args.route.as_ref().map(|path| {
        let steps = load_route_file(path).unwrap_or_else(|e| exit_with(format!("route {}: {}", path, e)));
        order_exporters_first(steps)
    });
    let centroids = args.geojson.as_ref().map(|path| {
        let resolver = CentroidResolver::from_geojson_file(path)
            .unwrap_or_else(|e| exit_with(format!("geojson {}: {}", path, e)));
        info!("Loaded {} country shapes from {}", resolver.shape_count(), path);
        resolver
    });

    // A custom route only makes sense for the route-following run
    let scenarios: Vec<ScenarioId> = if route.is_some() {
        vec![ScenarioId::FullRoute]
    } else if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            let names: Vec<_> = ScenarioId::all().iter().map(|s| s.name()).collect();
            exit_with(format!("{}\nAvailable scenarios: {}, all", e, names.join(", ")))
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        let mut runner = ScenarioRunner::new(seed).with_config(config.clone());
        if let Some(steps) = &route {
            runner = runner.with_route(steps.clone());
        }
        if let Some(resolver) = &centroids {
            runner = runner.with_centroids(resolver.clone());
        }
        runner
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            exit_with("--export only supports a single scenario, not 'all'".to_string());
        }

        info!("Running with export to: {}", export_path);
        let (result, export) = runner_for(base_seed).run_exporting(scenarios[0]);

        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {:?}", e);
        } else {
            info!("Exported {} frames to {}", export.frames.len(), export_path);
        }

        if result.passed {
            info!("✓ {} (seed={}) PASSED", scenarios[0].name(), base_seed);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Run simulations
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED - {} frames, {} trails",
                        scenario.name(),
                        seed,
                        result.metrics.frames,
                        result.metrics.trails
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.metrics.frames,
                    "trails": r.metrics.trails,
                    "step_events": r.metrics.step_events,
                    "max_tip_drift": r.metrics.max_tip_drift,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => exit_with(format!("summary: {}", e)),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
