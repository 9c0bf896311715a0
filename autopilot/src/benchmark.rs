use crate::policies::{create_policy, policy_ids};
use crate::runner::{run_policy_instance, write_trace, RunArtifact, RunMetrics};
use crate::scenarios::{resolve_scenario, scenario_ids, Scenario};
use crate::util::{file_name_token, parse_id_csv, write_json_pretty};
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Safety,
    Progress,
    Balanced,
}

impl Objective {
    pub fn run_value(self, metrics: &RunMetrics) -> f64 {
        let safe = if metrics.collision.is_some() { 0.0 } else { 1.0 };
        let violations = metrics.violations() as f64;
        let progress = metrics.progress();
        // Unused ticks after arrival reward getting there sooner.
        let spare_ticks = metrics
            .arrival_tick
            .map(|tick| metrics.max_ticks.saturating_sub(tick) as f64)
            .unwrap_or(0.0);
        match self {
            Self::Safety => safe * 1000.0 - violations * 250.0 + progress * 100.0,
            Self::Progress => progress * 1000.0 + spare_ticks * 0.5 - (1.0 - safe) * 300.0,
            Self::Balanced => {
                safe * 600.0 - violations * 150.0 + progress * 400.0 + spare_ticks * 0.2
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Progress => "progress",
            Self::Balanced => "balanced",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub policies: Vec<String>,
    pub scenarios: Vec<String>,
    pub max_ticks: Option<u32>,
    pub objective: Objective,
    pub out_dir: PathBuf,
    pub save_top: usize,
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub policy_id: String,
    pub policy_fingerprint: String,
    pub scenario_id: String,
    pub ticks: u32,
    pub arrived: bool,
    pub arrival_tick: Option<u32>,
    pub collision_actor: Option<String>,
    pub red_light_violations: u32,
    pub stop_sign_violations: u32,
    pub min_separation_m: Option<f64>,
    pub progress: f64,
    pub objective_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyAggregate {
    pub policy_id: String,
    pub policy_fingerprint: String,
    pub runs: usize,
    pub arrival_rate: f64,
    pub collision_rate: f64,
    pub avg_violations: f64,
    pub avg_ticks: f64,
    pub avg_progress: f64,
    pub worst_separation_m: Option<f64>,
    pub objective_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedTraceRecord {
    pub rank: usize,
    pub metric: String,
    pub policy_id: String,
    pub scenario_id: String,
    pub ticks: u32,
    pub objective_value: f64,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub objective: Objective,
    pub max_ticks: Option<u32>,
    pub jobs: Option<usize>,
    pub policies: Vec<String>,
    pub scenarios: Vec<String>,
    pub run_count: usize,
    pub policy_rankings: Vec<PolicyAggregate>,
    pub runs: Vec<RunRecord>,
    pub saved_traces: Vec<SavedTraceRecord>,
}

#[derive(Clone, Debug)]
struct InternalRun {
    artifact: RunArtifact,
    objective_value: f64,
}

impl InternalRun {
    fn metrics(&self) -> &RunMetrics {
        &self.artifact.metrics
    }
}

pub fn resolve_policies(input: Option<&str>) -> Result<Vec<String>> {
    match input {
        None => Ok(policy_ids().iter().map(|id| (*id).to_string()).collect()),
        Some(raw) => parse_id_csv(raw, "--policies"),
    }
}

pub fn resolve_scenarios(input: Option<&str>) -> Result<Vec<String>> {
    match input {
        None => Ok(scenario_ids()),
        Some(raw) => parse_id_csv(raw, "--scenarios"),
    }
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.policies.is_empty() {
        return Err(anyhow!("benchmark requires at least one policy"));
    }
    if config.scenarios.is_empty() {
        return Err(anyhow!("benchmark requires at least one scenario"));
    }
    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }
    // Fail on a bad id before any work is scheduled.
    for policy_id in &config.policies {
        create_policy(policy_id)?;
    }
    let scenarios: Vec<Scenario> = config
        .scenarios
        .iter()
        .map(|id| resolve_scenario(id))
        .collect::<Result<_>>()?;
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let run_jobs: Vec<(&str, &Scenario)> = config
        .policies
        .iter()
        .flat_map(|policy| scenarios.iter().map(move |scenario| (policy.as_str(), scenario)))
        .collect();
    tracing::info!(
        runs = run_jobs.len(),
        objective = config.objective.as_str(),
        "benchmark started"
    );

    let run_one = |(policy_id, scenario): &(&str, &Scenario)| -> Result<InternalRun> {
        let policy = create_policy(policy_id)?;
        let artifact = run_policy_instance(policy.as_ref(), scenario, config.max_ticks)
            .with_context(|| {
                format!(
                    "benchmark run failed for policy={policy_id} scenario={}",
                    scenario.id
                )
            })?;
        let objective_value = config.objective.run_value(&artifact.metrics);
        Ok(InternalRun {
            artifact,
            objective_value,
        })
    };

    let run_results: Vec<Result<InternalRun>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };

    let mut runs = Vec::with_capacity(run_results.len());
    for result in run_results {
        runs.push(result?);
    }

    let rankings = rank_policies(&runs);

    let mut run_records: Vec<RunRecord> = runs
        .iter()
        .map(|run| {
            let m = run.metrics();
            RunRecord {
                policy_id: m.policy_id.clone(),
                policy_fingerprint: m.policy_fingerprint.clone(),
                scenario_id: m.scenario_id.clone(),
                ticks: m.ticks,
                arrived: m.arrived,
                arrival_tick: m.arrival_tick,
                collision_actor: m.collision.as_ref().map(|c| c.actor_id.clone()),
                red_light_violations: m.red_light_violations,
                stop_sign_violations: m.stop_sign_violations,
                min_separation_m: m.min_separation_m,
                progress: m.progress(),
                objective_value: run.objective_value,
            }
        })
        .collect();
    run_records.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| a.policy_id.cmp(&b.policy_id))
            .then_with(|| a.scenario_id.cmp(&b.scenario_id))
    });

    let mut saved_traces = Vec::new();
    if config.save_top > 0 {
        save_top_traces(
            &config.out_dir,
            &runs,
            "objective",
            config.save_top,
            |run| run.objective_value,
            &mut saved_traces,
        )?;
        save_top_traces(
            &config.out_dir,
            &runs,
            "clearance",
            config.save_top,
            |run| run.metrics().min_separation_m.unwrap_or(f64::NEG_INFINITY),
            &mut saved_traces,
        )?;
    }

    write_runs_csv(&config.out_dir.join("runs.csv"), &run_records)?;
    write_rankings_csv(&config.out_dir.join("rankings.csv"), &rankings)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        objective: config.objective,
        max_ticks: config.max_ticks,
        jobs: config.jobs,
        policies: config.policies,
        scenarios: config.scenarios,
        run_count: run_records.len(),
        policy_rankings: rankings,
        runs: run_records,
        saved_traces,
    };
    write_json_pretty(&config.out_dir.join("summary.json"), &report)?;
    tracing::info!(runs = report.run_count, "benchmark finished");

    Ok(report)
}

fn rank_policies(runs: &[InternalRun]) -> Vec<PolicyAggregate> {
    let mut grouped: BTreeMap<&str, Vec<&InternalRun>> = BTreeMap::new();
    for run in runs {
        grouped
            .entry(run.metrics().policy_id.as_str())
            .or_default()
            .push(run);
    }

    let mut rankings: Vec<PolicyAggregate> = grouped
        .into_iter()
        .map(|(policy_id, policy_runs)| {
            let count = policy_runs.len() as f64;
            let metrics: Vec<&RunMetrics> = policy_runs.iter().map(|r| r.metrics()).collect();
            let arrivals = metrics.iter().filter(|m| m.arrived).count();
            let collisions = metrics.iter().filter(|m| m.collision.is_some()).count();
            let violations: u32 = metrics.iter().map(|m| m.violations()).sum();
            let ticks: u64 = metrics.iter().map(|m| m.ticks as u64).sum();
            let progress: f64 = metrics.iter().map(|m| m.progress()).sum();
            let objective: f64 = policy_runs.iter().map(|r| r.objective_value).sum();
            PolicyAggregate {
                policy_id: policy_id.to_string(),
                policy_fingerprint: metrics
                    .first()
                    .map(|m| m.policy_fingerprint.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                runs: policy_runs.len(),
                arrival_rate: arrivals as f64 / count,
                collision_rate: collisions as f64 / count,
                avg_violations: violations as f64 / count,
                avg_ticks: ticks as f64 / count,
                avg_progress: progress / count,
                worst_separation_m: metrics
                    .iter()
                    .filter_map(|m| m.min_separation_m)
                    .min_by(f64::total_cmp),
                objective_value: objective / count,
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| a.collision_rate.total_cmp(&b.collision_rate))
            .then_with(|| b.arrival_rate.total_cmp(&a.arrival_rate))
    });
    rankings
}

fn save_top_traces<F>(
    out_dir: &Path,
    runs: &[InternalRun],
    metric_name: &str,
    count: usize,
    metric: F,
    saved_traces: &mut Vec<SavedTraceRecord>,
) -> Result<()>
where
    F: Fn(&InternalRun) -> f64,
{
    let mut order: Vec<&InternalRun> = runs.iter().collect();
    order.sort_by(|a, b| {
        metric(b)
            .total_cmp(&metric(a))
            .then_with(|| a.metrics().ticks.cmp(&b.metrics().ticks))
    });

    let save_dir = out_dir.join(format!("top-{metric_name}"));
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("failed creating {}", save_dir.display()))?;

    for (idx, run) in order.into_iter().take(count).enumerate() {
        let rank = idx + 1;
        let m = run.metrics();
        let trace_path = save_dir.join(format!(
            "rank{rank:02}-{}-{}-ticks{}.json",
            file_name_token(&m.policy_id),
            file_name_token(&m.scenario_id),
            m.ticks
        ));
        write_trace(&trace_path, &run.artifact)?;

        saved_traces.push(SavedTraceRecord {
            rank,
            metric: metric_name.to_string(),
            policy_id: m.policy_id.clone(),
            scenario_id: m.scenario_id.clone(),
            ticks: m.ticks,
            objective_value: run.objective_value,
            path: trace_path.to_string_lossy().into_owned(),
        });
    }

    Ok(())
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "policy_id,policy_fingerprint,scenario_id,ticks,arrived,arrival_tick,collision_actor,red_light_violations,stop_sign_violations,min_separation_m,progress,objective_value\n",
    );
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{:.4},{:.4}\n",
            row.policy_id,
            row.policy_fingerprint,
            row.scenario_id,
            row.ticks,
            row.arrived,
            opt_cell(row.arrival_tick),
            opt_cell(row.collision_actor.as_deref()),
            row.red_light_violations,
            row.stop_sign_violations,
            opt_cell(row.min_separation_m.map(|gap| format!("{gap:.3}"))),
            row.progress,
            row.objective_value,
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

fn write_rankings_csv(path: &Path, rows: &[PolicyAggregate]) -> Result<()> {
    let mut csv = String::from(
        "rank,policy_id,policy_fingerprint,runs,arrival_rate,collision_rate,avg_violations,avg_ticks,avg_progress,worst_separation_m,objective_value\n",
    );
    for (idx, row) in rows.iter().enumerate() {
        csv.push_str(&format!(
            "{},{},{},{},{:.4},{:.4},{:.2},{:.2},{:.4},{},{:.4}\n",
            idx + 1,
            row.policy_id,
            row.policy_fingerprint,
            row.runs,
            row.arrival_rate,
            row.collision_rate,
            row.avg_violations,
            row.avg_ticks,
            row.avg_progress,
            opt_cell(row.worst_separation_m.map(|gap| format!("{gap:.3}"))),
            row.objective_value,
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}
