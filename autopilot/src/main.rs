use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use drive_autopilot::benchmark::{
    resolve_policies, resolve_scenarios, run_benchmark, BenchmarkConfig, Objective,
};
use drive_autopilot::policies::{create_policy, describe_policies, policy_manifest_entries};
use drive_autopilot::runner::{decide_scene_file, run_policy, write_trace};
use drive_autopilot::scenarios::builtin_scenarios;
use drive_autopilot::util::write_json_pretty;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "drive-autopilot")]
#[command(about = "Driving decision harness: single decisions, scenario rollouts, and benchmarks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available policies
    ListPolicies,
    /// Export the policy manifest (including config fingerprints)
    PolicyManifest {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List built-in scenarios
    ListScenarios,
    /// Decide a single scene snapshot read from JSON
    Decide {
        #[arg(long)]
        scene: PathBuf,
        #[arg(long, default_value = "canonical")]
        policy: String,
    },
    /// Roll one policy through one scenario
    Simulate {
        #[arg(long, default_value = "canonical")]
        policy: String,
        #[arg(long)]
        scenario: String,
        #[arg(long)]
        max_ticks: Option<u32>,
        /// Write the per-tick trace as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Run every policy against every scenario and rank them
    Benchmark {
        #[arg(long)]
        policies: Option<String>,
        #[arg(long)]
        scenarios: Option<String>,
        #[arg(long)]
        max_ticks: Option<u32>,
        #[arg(long, value_enum, default_value_t = CliObjective::Balanced)]
        objective: CliObjective,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        save_top: usize,
        #[arg(long)]
        jobs: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliObjective {
    Safety,
    Progress,
    Balanced,
}

impl From<CliObjective> for Objective {
    fn from(value: CliObjective) -> Self {
        match value {
            CliObjective::Safety => Objective::Safety,
            CliObjective::Progress => Objective::Progress,
            CliObjective::Balanced => Objective::Balanced,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::ListPolicies => {
            for (id, description) in describe_policies() {
                println!("{id:12} {description}");
            }
        }
        Commands::PolicyManifest { output } => {
            let manifest = policy_manifest_entries()?;
            if let Some(path) = output {
                write_json_pretty(&path, &manifest)?;
                println!("wrote={}", path.display());
                println!("policies={}", manifest.len());
            } else {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            }
        }
        Commands::ListScenarios => {
            for scenario in builtin_scenarios() {
                println!("{:20} {}", scenario.id, scenario.description);
            }
        }
        Commands::Decide { scene, policy } => {
            let policy = create_policy(&policy)?;
            let decision = decide_scene_file(&scene, policy.as_ref())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&decision).context("failed to encode decision")?
            );
        }
        Commands::Simulate {
            policy,
            scenario,
            max_ticks,
            trace,
        } => {
            let artifact = run_policy(&policy, &scenario, max_ticks)?;
            let m = &artifact.metrics;
            println!("policy={}", m.policy_id);
            println!("policy_fingerprint={}", m.policy_fingerprint);
            println!("scenario={}", m.scenario_id);
            println!("ticks={}", m.ticks);
            println!("arrived={}", m.arrived);
            match &m.collision {
                Some(collision) => {
                    println!("collision={}@{}", collision.actor_id, collision.tick)
                }
                None => println!("collision=none"),
            }
            println!("red_light_violations={}", m.red_light_violations);
            println!("stop_sign_violations={}", m.stop_sign_violations);
            println!(
                "levels=move:{},slow:{},stop:{}",
                m.move_ticks, m.slow_ticks, m.stop_ticks
            );
            if let Some(gap) = m.min_separation_m {
                println!("min_separation_m={gap:.3}");
            }
            println!("distance_travelled_m={:.2}", m.distance_travelled_m);
            println!("distance_to_target_m={:.2}", m.final_distance_to_target_m);
            if let Some(path) = trace {
                write_trace(&path, &artifact)?;
                println!("trace={}", path.display());
            }
        }
        Commands::Benchmark {
            policies,
            scenarios,
            max_ticks,
            objective,
            out_dir,
            save_top,
            jobs,
        } => {
            let policies = resolve_policies(policies.as_deref())?;
            let scenarios = resolve_scenarios(scenarios.as_deref())?;
            let objective: Objective = objective.into();
            let out_dir = out_dir.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "benchmarks/{}-{}",
                    objective.as_str(),
                    timestamp_suffix()
                ))
            });

            let report = run_benchmark(BenchmarkConfig {
                policies,
                scenarios,
                max_ticks,
                objective,
                out_dir: out_dir.clone(),
                save_top,
                jobs,
            })?;

            println!("objective={}", objective.as_str());
            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("out_dir={}", out_dir.display());
            println!("rankings:");
            for (idx, policy) in report.policy_rankings.iter().enumerate() {
                println!(
                    "  {}. {}  objective={:.2} arrival={:.0}% collision={:.0}% violations={:.2} avg_ticks={:.1}",
                    idx + 1,
                    policy.policy_id,
                    policy.objective_value,
                    policy.arrival_rate * 100.0,
                    policy.collision_rate * 100.0,
                    policy.avg_violations,
                    policy.avg_ticks,
                );
            }
            if !report.saved_traces.is_empty() {
                println!("saved traces:");
                for saved in &report.saved_traces {
                    println!(
                        "  [{} #{:02}] {} {} ticks={}",
                        saved.metric, saved.rank, saved.policy_id, saved.scenario_id, saved.ticks
                    );
                }
            }
        }
    }

    Ok(())
}

fn timestamp_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}
