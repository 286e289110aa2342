use std::{
    collections::BTreeMap,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use clap::Parser;
use dslab_clustering::{
    config::ClusteringConfig,
    experiment::{Experiment, RunResult, WorkflowPlan},
};
use env_logger::Builder;
use serde::Deserialize;

fn default_seed() -> u64 {
    123
}

#[derive(Deserialize)]
struct Config {
    #[serde(default = "default_seed")]
    seed: u64,
    #[serde(default)]
    clustering_delay: Option<f64>,
    workflows: Vec<PathBuf>,
    strategies: Vec<ClusteringConfig>,
}

/// Runs clustering strategies over workflows and compares them.
#[derive(Parser, Debug)]
struct Args {
    /// Path to config.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to folder with job partitions of every run.
    #[arg(short, long, default_value = None)]
    traces: Option<PathBuf>,

    /// Path to file with results.
    #[arg(short, long)]
    output: PathBuf,

    /// Do not run experiments, just read results from --output.
    #[arg(long)]
    precalculated: bool,

    /// Number of threads.
    #[arg(long, default_value_t = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))]
    threads: usize,
}

fn filename(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .and_then(|name| name.to_str())
        .unwrap_or("workflow")
        .to_string()
}

struct ResultRow {
    name: String,
    runs: usize,
    avg_jobs: f64,
    avg_imbalance: f64,
    max_imbalance: f64,
    total_wastage: f64,
    fallbacks: usize,
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = Args::parse();
    let config: Config = serde_yaml::from_str(&std::fs::read_to_string(args.config).expect("Can't read config file"))
        .expect("Can't parse config file");
    for strategy in config.strategies.iter() {
        strategy.validate().expect("Invalid strategy config");
    }

    let result: Vec<RunResult> = if args.precalculated {
        serde_json::from_str(&std::fs::read_to_string(args.output).expect("Can't read file with result"))
            .expect("Can't parse file with result")
    } else {
        let experiment = Experiment::new(
            config.seed,
            config
                .workflows
                .into_iter()
                .enumerate()
                .map(|(i, path)| WorkflowPlan {
                    name: format!("{}_{}", i, filename(&path)),
                    path,
                })
                .collect(),
            config.strategies,
            config.clustering_delay,
            args.traces,
        );

        let result = experiment.run(args.threads).expect("Can't run experiment");
        File::create(args.output)
            .expect("Can't create output file")
            .write_all(
                serde_json::to_string_pretty(&result)
                    .expect("Can't serialize results")
                    .as_bytes(),
            )
            .expect("Can't write to output file");
        result
    };

    let mut runs_by_strategy: BTreeMap<String, Vec<RunResult>> = BTreeMap::new();
    for run in result.into_iter() {
        runs_by_strategy.entry(run.strategy.clone()).or_default().push(run);
    }

    let mut rows = runs_by_strategy
        .into_iter()
        .map(|(name, runs)| ResultRow {
            name,
            runs: runs.len(),
            avg_jobs: runs.iter().map(|run| run.run_stats.job_count as f64).sum::<f64>() / runs.len() as f64,
            avg_imbalance: runs.iter().map(|run| run.run_stats.runtime_imbalance).sum::<f64>() / runs.len() as f64,
            max_imbalance: runs
                .iter()
                .map(|run| run.run_stats.runtime_imbalance)
                .fold(0.0, f64::max),
            total_wastage: runs.iter().map(|run| run.run_stats.core_hour_wastage).sum(),
            fallbacks: runs.iter().map(|run| run.run_stats.fallbacks).sum(),
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| a.avg_imbalance.total_cmp(&b.avg_imbalance).then(a.name.cmp(&b.name)));

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0).max("algorithm".len());
    println!(
        "| {: <width$} | runs | avg jobs | avg imbalance | max imbalance | total wastage | fallbacks |",
        "algorithm",
        width = width
    );
    println!(
        "|-{:-<width$}-|------|----------|---------------|---------------|---------------|-----------|",
        "",
        width = width
    );
    for row in rows.into_iter() {
        println!(
            "| {: <width$} | {: >4} | {: >8.1} | {: >13.3} | {: >13.3} | {: >13.1} | {: >9} |",
            row.name,
            row.runs,
            row.avg_jobs,
            row.avg_imbalance,
            row.max_imbalance,
            row.total_wastage,
            row.fallbacks,
            width = width
        );
    }
}
