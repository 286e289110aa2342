//! Batch runs of several strategies over several workflows.

use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Instant,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::{config::ClusteringConfig, error::Result, job::FixedDelay, run_stats::RunStats, workflow::Workflow};

#[derive(Clone, Debug)]
pub struct WorkflowPlan {
    pub name: String,
    pub path: PathBuf,
}

struct Run {
    workflow: WorkflowPlan,
    strategy: ClusteringConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub workflow: String,
    pub strategy: String,
    pub run_stats: RunStats,
}

pub struct Experiment {
    seed: u64,
    workflows: Vec<WorkflowPlan>,
    strategies: Vec<ClusteringConfig>,
    clustering_delay: Option<f64>,
    traces_folder: Option<PathBuf>,
}

impl Experiment {
    pub fn new(
        seed: u64,
        workflows: Vec<WorkflowPlan>,
        strategies: Vec<ClusteringConfig>,
        clustering_delay: Option<f64>,
        traces_folder: Option<PathBuf>,
    ) -> Self {
        Self {
            seed,
            workflows,
            strategies,
            clustering_delay,
            traces_folder,
        }
    }

    /// Runs every strategy on every workflow using `threads` threads. Failed runs are logged and skipped.
    pub fn run(self, threads: usize) -> Result<Vec<RunResult>> {
        if let Some(dir) = &self.traces_folder {
            std::fs::create_dir_all(dir)?;
        }

        let runs = self
            .workflows
            .into_iter()
            .cartesian_product(self.strategies)
            .map(|(workflow, strategy)| Run {
                workflow,
                strategy: strategy.with_default_seed(self.seed),
            })
            .collect::<Vec<_>>();

        let total_runs = runs.len();

        let finished_run_atomic = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(Vec::new()));

        let pool = ThreadPool::new(threads.max(1));
        let start_time = Instant::now();
        for run in runs.into_iter() {
            let finished_run_atomic = finished_run_atomic.clone();
            let results = results.clone();
            let traces_folder = self.traces_folder.clone();
            let clustering_delay = self.clustering_delay;
            pool.execute(move || {
                match execute(&run, clustering_delay, traces_folder) {
                    Ok(result) => results.lock().unwrap_or_else(PoisonError::into_inner).push(result),
                    Err(e) => log::error!("{:?} on {} failed: {}", run.strategy, run.workflow.name, e),
                }

                let finished_runs = finished_run_atomic.fetch_add(1, Ordering::SeqCst) + 1;
                log::info!(
                    "Finished {}/{} runs in {:.2?}",
                    finished_runs,
                    total_runs,
                    start_time.elapsed()
                );
            });
        }

        pool.join();

        let mut results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        results.sort_by_cached_key(|run: &RunResult| (run.workflow.clone(), run.strategy.clone()));
        Ok(results)
    }
}

fn execute(run: &Run, clustering_delay: Option<f64>, traces_folder: Option<PathBuf>) -> Result<RunResult> {
    let mut workflow = Workflow::from_yaml(&run.workflow.path)?;
    let mut strategy = run.strategy.build()?;
    let mut clustering = strategy.run(&mut workflow)?;
    if let Some(delay) = clustering_delay {
        clustering.apply_cluster_delay(&FixedDelay(delay));
    }
    if let Some(folder) = traces_folder {
        let file = File::create(folder.join(format!("{}_{}.json", run.workflow.name, strategy.name())))?;
        serde_json::to_writer_pretty(file, &clustering)?;
    }
    Ok(RunResult {
        workflow: run.workflow.name.clone(),
        strategy: strategy.name(),
        run_stats: RunStats::new(&workflow, &clustering),
    })
}
