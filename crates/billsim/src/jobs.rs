//! Monte Carlo job runner.
//!
//! A `SimulationRunner` is a long-lived value owned by the process
//! entrypoint (no module-scoped singleton). `start_simulation` registers a
//! job and returns its id immediately; a background thread processes batches
//! sequentially, running `batch_size` sims concurrently inside each batch.
//! Every sim streams a shard file to `temp/`; on success the shards merge
//! into `results/<job>.json` (then are deleted) and the percentile-by-year
//! summary lands in `graphs/<job>.json`. A single sim failure aborts the
//! job, marks it failed, and cleans the shards up. There is no cancel API;
//! completion is polled via `status`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use billsim_core::engine::{self, EngineOptions};
use billsim_core::model::Catalog;
use billsim_core::montecarlo::{DEFAULT_PERCENTILES, StochasticConfig, run_batch, summary_graph};
use billsim_core::queries::ChartData;
use billsim_core::queries::graph::yearly_minima;
use billsim_core::timeline::{Window, build_timeline};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::storage::atomic_write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub scenario: String,
    pub start_date: Date,
    pub end_date: Date,
    pub simulations: usize,
    pub batch_size: usize,
    #[serde(default)]
    pub percentiles: Vec<f64>,
    pub stochastic: StochasticConfig,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    pub progress: f64,
    pub completed_simulations: usize,
    pub total_simulations: usize,
    pub scenario: String,
    pub start_date: Date,
    pub end_date: Date,
    pub started_at_millis: u64,
    pub duration_millis: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Compact per-sim ledger row kept in shards and the merged result file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompactEntry {
    date: Date,
    amount: f64,
    balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompactAccount {
    id: String,
    name: String,
    balance: f64,
    entries: Vec<CompactEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimShard {
    simulation: usize,
    accounts: Vec<CompactAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergedResults {
    metadata: JobStatus,
    results: Vec<SimShard>,
}

/// Graph file: the combined percentile chart plus per-account splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloGraph {
    pub combined: ChartData,
    pub per_account: BTreeMap<String, ChartData>,
}

struct JobHandle {
    status: Mutex<JobStatus>,
    completed: AtomicUsize,
}

impl JobHandle {
    fn snapshot(&self) -> JobStatus {
        let mut status = match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        status.completed_simulations = self.completed.load(Ordering::Relaxed);
        if status.total_simulations > 0 {
            status.progress =
                status.completed_simulations as f64 / status.total_simulations as f64;
        }
        status
    }
}

pub struct SimulationRunner {
    root: PathBuf,
    jobs: Mutex<BTreeMap<String, Arc<JobHandle>>>,
    job_counter: AtomicU64,
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl SimulationRunner {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        for sub in ["temp", "results", "graphs"] {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(SimulationRunner {
            root,
            jobs: Mutex::new(BTreeMap::new()),
            job_counter: AtomicU64::new(0),
        })
    }

    fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    fn results_path(&self, id: &str) -> PathBuf {
        self.root.join("results").join(format!("{id}.json"))
    }

    fn graph_path(&self, id: &str) -> PathBuf {
        self.root.join("graphs").join(format!("{id}.json"))
    }

    /// Register a job and kick off the background worker. Returns the job id
    /// immediately.
    pub fn start_simulation(
        self: &Arc<Self>,
        catalog: Catalog,
        request: JobRequest,
    ) -> Result<String> {
        if request.simulations == 0 {
            return Err(ServiceError::ValidationFailed(vec![
                "Simulation count must be > 0".to_string(),
            ]));
        }
        let counter = self.job_counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("mc-{}-{}", epoch_millis(), counter);

        let handle = Arc::new(JobHandle {
            status: Mutex::new(JobStatus {
                id: id.clone(),
                state: JobState::Pending,
                progress: 0.0,
                completed_simulations: 0,
                total_simulations: request.simulations,
                scenario: request.scenario.clone(),
                start_date: request.start_date,
                end_date: request.end_date,
                started_at_millis: epoch_millis(),
                duration_millis: None,
                error: None,
            }),
            completed: AtomicUsize::new(0),
        });

        {
            let mut jobs = match self.jobs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            jobs.insert(id.clone(), Arc::clone(&handle));
        }

        let runner = Arc::clone(self);
        let job_id = id.clone();
        std::thread::spawn(move || {
            runner.run_job(&job_id, handle, catalog, request);
        });

        Ok(id)
    }

    fn set_state(handle: &JobHandle, state: JobState, error: Option<String>, started: Instant) {
        let mut status = match handle.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Terminal states are immutable.
        if matches!(status.state, JobState::Completed | JobState::Failed) {
            return;
        }
        status.state = state;
        status.error = error;
        if matches!(state, JobState::Completed | JobState::Failed) {
            status.duration_millis = Some(started.elapsed().as_millis() as u64);
        }
    }

    fn run_job(&self, id: &str, handle: Arc<JobHandle>, catalog: Catalog, request: JobRequest) {
        let started = Instant::now();
        Self::set_state(&handle, JobState::Running, None, started);
        tracing::info!(
            "job {id}: {} sims over {}..{} ({})",
            request.simulations,
            request.start_date,
            request.end_date,
            request.scenario
        );

        match self.execute(id, &handle, &catalog, &request) {
            Ok(()) => {
                Self::set_state(&handle, JobState::Completed, None, started);
                // Persist final metadata into the merged result file.
                if let Err(err) = self.stamp_metadata(id, &handle) {
                    tracing::warn!("job {id}: failed to stamp metadata: {err}");
                }
                tracing::info!("job {id}: completed");
            }
            Err(err) => {
                tracing::error!("job {id}: failed: {err}");
                self.cleanup_shards(id, request.simulations);
                Self::set_state(&handle, JobState::Failed, Some(err.to_string()), started);
            }
        }
    }

    fn execute(
        &self,
        id: &str,
        handle: &JobHandle,
        catalog: &Catalog,
        request: &JobRequest,
    ) -> Result<()> {
        let window = Window::new(request.start_date, request.end_date);
        // One shared timeline per job; each sim gets its own walk state.
        let timeline = build_timeline(catalog, &request.scenario, window)?;

        // Deterministic overlay pass.
        let deterministic =
            engine::run(catalog, &timeline, None, &EngineOptions::default())?;
        let overlay = yearly_minima(&deterministic, None);
        let account_names: Vec<String> = deterministic
            .accounts
            .iter()
            .filter(|a| !a.hidden)
            .map(|a| a.name.clone())
            .collect();

        let batch_size = request.batch_size.max(1);
        let mut combined_minima: Vec<Vec<(i16, f64)>> = Vec::with_capacity(request.simulations);
        let mut per_account_minima: BTreeMap<String, Vec<Vec<(i16, f64)>>> = BTreeMap::new();

        // Batches run sequentially; each batch fans out across the core's
        // parallel pool. The first sim failure aborts the job.
        let mut next_sim = 0usize;
        while next_sim < request.simulations {
            let batch_end = (next_sim + batch_size).min(request.simulations);
            let batch = run_batch(
                catalog,
                &timeline,
                &request.stochastic,
                request.seed,
                next_sim..batch_end,
            )
            .map_err(|err| ServiceError::JobFailed(format!("sim failed: {err}")))?;

            for (sim, result) in batch {
                self.write_shard(id, sim, &result)?;
                combined_minima.push(yearly_minima(&result, None));
                for name in &account_names {
                    let selection = vec![name.clone()];
                    per_account_minima
                        .entry(name.clone())
                        .or_default()
                        .push(yearly_minima(&result, Some(&selection)));
                }
                handle.completed.fetch_add(1, Ordering::Relaxed);
            }
            next_sim = batch_end;
        }

        self.merge_shards(id, handle, request.simulations)?;

        let percentiles: &[f64] = if request.percentiles.is_empty() {
            &DEFAULT_PERCENTILES
        } else {
            &request.percentiles
        };
        let graph = MonteCarloGraph {
            combined: summary_graph(&combined_minima, percentiles, Some(&overlay)),
            per_account: per_account_minima
                .iter()
                .map(|(name, minima)| {
                    let overlay = yearly_minima(&deterministic, Some(&[name.clone()]));
                    (
                        name.clone(),
                        summary_graph(minima, percentiles, Some(&overlay)),
                    )
                })
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&graph)?;
        atomic_write(&self.graph_path(id), &bytes)?;
        Ok(())
    }

    fn shard_path(&self, id: &str, sim: usize) -> PathBuf {
        self.temp_dir().join(format!("{id}_sim_{sim}.json"))
    }

    fn write_shard(
        &self,
        id: &str,
        sim: usize,
        result: &billsim_core::EngineResult,
    ) -> Result<()> {
        let shard = SimShard {
            simulation: sim,
            accounts: result
                .accounts
                .iter()
                .map(|a| CompactAccount {
                    id: a.account_id.clone(),
                    name: a.name.clone(),
                    balance: a.balance,
                    entries: a
                        .consolidated_activity
                        .iter()
                        .map(|e| CompactEntry {
                            date: e.date,
                            amount: e.amount,
                            balance: e.balance,
                        })
                        .collect(),
                })
                .collect(),
        };
        let bytes = serde_json::to_vec(&shard)?;
        atomic_write(&self.shard_path(id, sim), &bytes)?;
        Ok(())
    }

    /// Join shard files in simulation order into the result file, then
    /// delete them.
    fn merge_shards(&self, id: &str, handle: &JobHandle, total: usize) -> Result<()> {
        let mut results = Vec::with_capacity(total);
        for sim in 0..total {
            let path = self.shard_path(id, sim);
            let bytes = fs::read(&path)?;
            results.push(serde_json::from_slice::<SimShard>(&bytes)?);
        }
        let merged = MergedResults {
            metadata: handle.snapshot(),
            results,
        };
        let bytes = serde_json::to_vec(&merged)?;
        atomic_write(&self.results_path(id), &bytes)?;
        self.cleanup_shards(id, total);
        Ok(())
    }

    fn cleanup_shards(&self, id: &str, total: usize) {
        for sim in 0..total {
            let _ = fs::remove_file(self.shard_path(id, sim));
        }
    }

    /// Rewrite the merged result's metadata with the terminal status.
    fn stamp_metadata(&self, id: &str, handle: &JobHandle) -> Result<()> {
        let path = self.results_path(id);
        let bytes = fs::read(&path)?;
        let mut merged: MergedResults = serde_json::from_slice(&bytes)?;
        merged.metadata = handle.snapshot();
        let bytes = serde_json::to_vec(&merged)?;
        atomic_write(&path, &bytes)?;
        Ok(())
    }

    /// Live job status, falling back to persisted metadata for jobs from
    /// earlier process lifetimes.
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        {
            let jobs = match self.jobs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(handle) = jobs.get(id) {
                return Some(handle.snapshot());
            }
        }
        let bytes = fs::read(self.results_path(id)).ok()?;
        serde_json::from_slice::<MergedResults>(&bytes)
            .ok()
            .map(|m| m.metadata)
    }

    /// The summary graph of a completed job. `NotFound` until the job has
    /// finished (the graph file is the last thing written).
    pub fn graph(&self, id: &str) -> Result<MonteCarloGraph> {
        if let Some(status) = self.status(id)
            && status.state != JobState::Completed
        {
            return Err(ServiceError::NotFound(format!(
                "job {id} is not complete"
            )));
        }
        let path = self.graph_path(id);
        if !path.exists() {
            return Err(ServiceError::NotFound(format!("no graph for job {id}")));
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Historical job listing from persisted result metadata, most recent
    /// first.
    pub fn list_jobs(&self) -> Vec<JobStatus> {
        let mut out: Vec<JobStatus> = Vec::new();
        {
            let jobs = match self.jobs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            out.extend(jobs.values().map(|h| h.snapshot()));
        }
        if let Ok(entries) = fs::read_dir(self.root.join("results")) {
            for entry in entries.filter_map(|e| e.ok()) {
                if let Ok(bytes) = fs::read(entry.path())
                    && let Ok(merged) = serde_json::from_slice::<MergedResults>(&bytes)
                    && !out.iter().any(|s| s.id == merged.metadata.id)
                {
                    out.push(merged.metadata);
                }
            }
        }
        out.sort_by(|a, b| b.started_at_millis.cmp(&a.started_at_millis));
        out
    }
}
