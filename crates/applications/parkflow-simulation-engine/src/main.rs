//! Parkflow Simulation Engine CLI
//!
//! Command-line interface for comparing parking allocation policies

use anyhow::{Context, bail};
use clap::Parser;
use std::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parkflow::{PolicyKind, SimulationConfig, SimulationResult, run_batch};

#[derive(Parser, Debug)]
#[command(name = "parkflow-sim")]
#[command(about = "Simulate parking lot allocation policies", long_about = None)]
struct Args {
    /// Base configuration as JSON (fields not given use defaults)
    #[arg(short, long)]
    config: Option<String>,

    /// Policies to compare (comma-separated: priority,on-demand,time-based,membership)
    #[arg(short, long, default_value = "priority,on-demand,time-based,membership")]
    policies: String,

    /// Simulated minutes per run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// RNG seed shared by every run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Vehicles generated per tick outside peak hours
    #[arg(long)]
    cars_per_tick: Option<u32>,

    /// Maximum number of waiting vehicles
    #[arg(long)]
    max_queue: Option<usize>,

    /// Queue-head matches attempted per tick
    #[arg(long)]
    allocations_per_tick: Option<u32>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<String>,
}

impl Args {
    /// Per-policy config: file (or preset) plus CLI overrides
    fn config_for(&self, policy: PolicyKind, base: Option<&SimulationConfig>) -> SimulationConfig {
        let mut config = match base {
            Some(base) => SimulationConfig {
                policy,
                ..base.clone()
            },
            None => SimulationConfig::preset(policy),
        };

        if let Some(ticks) = self.ticks {
            config.run_length = ticks;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(rate) = self.cars_per_tick {
            config.cars_per_tick = rate;
        }
        if let Some(max_queue) = self.max_queue {
            config.max_queue_size = max_queue;
        }
        if let Some(allocations) = self.allocations_per_tick {
            config.allocations_per_tick = allocations;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkflow=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let base = match &args.config {
        Some(path) => Some(
            SimulationConfig::from_json_file(path)
                .with_context(|| format!("failed to load config from {path}"))?,
        ),
        None => None,
    };

    let policies = args
        .policies
        .split(',')
        .map(|name| name.parse::<PolicyKind>())
        .collect::<Result<Vec<_>, _>>()?;
    if policies.is_empty() {
        bail!("no policies selected");
    }

    let configs: Vec<SimulationConfig> = policies
        .iter()
        .map(|&policy| args.config_for(policy, base.as_ref()))
        .collect();

    // Fail fast before spawning any run
    for config in &configs {
        config
            .validate()
            .with_context(|| format!("invalid configuration for {}", config.policy.name()))?;
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Parkflow Simulation Engine                              ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    let first = &configs[0];
    println!("Configuration:");
    println!("  Duration: {} minutes", first.run_length);
    println!("  Seed: {}", first.seed);
    println!("  Arrivals: {} car(s) every {} tick(s)", first.cars_per_tick, first.arrival_interval);
    println!("  Peak hours: {}:00-{}:00", first.peak_start_hour, first.peak_end_hour);
    println!("  Max queue: {}\n", first.max_queue_size);

    info!(runs = configs.len(), "running policies in parallel");
    let mut results: Vec<SimulationResult> = Vec::new();
    for (config, outcome) in configs.iter().zip(run_batch(&configs)) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => warn!(policy = config.policy.name(), error = %e, "run failed"),
        }
    }

    if results.is_empty() {
        bail!("every simulation run failed");
    }

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Simulation Results                                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("{:<12} {:>12} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10}",
        "Policy", "Earnings", "Parked", "Departed", "Lost", "Max Queue", "Avg Wait", "Reclass");
    println!("{}", "-".repeat(92));

    for result in &results {
        let summary = &result.summary;
        let avg_wait = summary
            .waits
            .overall
            .map_or_else(|| "N/A".to_string(), |w| format!("{w:.2}"));

        println!("{:<12} {:>12.2} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10}",
            result.policy_name,
            summary.total_earnings,
            summary.total_cars_parked,
            summary.departed_cars,
            summary.lost_arrivals,
            summary.max_waiting_cars,
            avg_wait,
            summary.reclassified_spots,
        );
    }

    println!("\n{}", "-".repeat(92));
    println!("Mean wait by category (ticks):");
    for result in &results {
        let by_category = result.summary.waits.by_category;
        let show = |w: Option<f64>| w.map_or_else(|| "-".to_string(), |w| format!("{w:.2}"));
        println!("  {:<12} standard {:>7}  electric {:>7}  premium {:>7}",
            result.policy_name,
            show(by_category.standard),
            show(by_category.electric),
            show(by_category.premium),
        );
    }

    if let Some(output_path) = &args.output {
        println!("\nWriting results to {}...", output_path);
        let json = serde_json::to_string_pretty(&results)?;
        fs::write(output_path, json).with_context(|| format!("failed to write {output_path}"))?;
        println!("  Results saved");
    }

    println!("\n✅ Simulation complete!\n");
    Ok(())
}
