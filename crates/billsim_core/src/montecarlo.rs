//! Monte Carlo primitives: stochastic variable overrides, deterministic
//! per-sim seeding, percentile interpolation, and the percentile-by-year
//! summary graph.
//!
//! The job runner (service layer) owns scheduling and shard files; this
//! module owns the math so it can be tested without touching disk.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution as _, LogNormal, Normal, Uniform};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::engine::{self, EngineOptions, EngineResult, StochasticOverrides};
use crate::model::Catalog;
use crate::queries::{ChartData, Dataset};
use crate::timeline::Timeline;

/// Percentiles reported by default.
pub const DEFAULT_PERCENTILES: [f64; 7] = [0.0, 5.0, 25.0, 50.0, 75.0, 95.0, 100.0];

/// Distribution a stochastic variable draws from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VariableDistribution {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Uniform { min: f64, max: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StochasticVariable {
    pub variable: String,
    pub distribution: VariableDistribution,
}

/// Which variable bindings a stochastic run replaces (typically investment
/// returns and inflation adjustments).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StochasticConfig {
    pub variables: Vec<StochasticVariable>,
}

impl StochasticConfig {
    /// Draw one value per variable. Draws are made in declaration order from
    /// the provided RNG, so a given seed always yields the same overrides.
    pub fn draw(&self, rng: &mut SmallRng) -> StochasticOverrides {
        let mut overrides = StochasticOverrides::default();
        for var in &self.variables {
            let value = match var.distribution {
                VariableDistribution::Normal { mean, std_dev } => Normal::new(mean, std_dev)
                    .map(|d| d.sample(rng))
                    .unwrap_or(mean),
                VariableDistribution::LogNormal { mu, sigma } => LogNormal::new(mu, sigma)
                    .map(|d| d.sample(rng))
                    .unwrap_or_else(|_| mu.exp()),
                VariableDistribution::Uniform { min, max } => Uniform::new_inclusive(min, max)
                    .map(|d| d.sample(rng))
                    .unwrap_or(min),
            };
            overrides.insert(var.variable.clone(), value);
        }
        overrides
    }
}

/// Seed for one simulation, derived from the job seed and the simulation
/// number with a splitmix64 round so neighbouring sims decorrelate.
pub fn sim_seed(job_seed: u64, sim_number: u64) -> u64 {
    let mut z = job_seed
        .wrapping_add(sim_number.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seeded RNG for one simulation.
pub fn sim_rng(job_seed: u64, sim_number: u64) -> SmallRng {
    SmallRng::seed_from_u64(sim_seed(job_seed, sim_number))
}

/// Run one stochastic simulation against a shared timeline.
pub fn run_simulation(
    catalog: &Catalog,
    timeline: &Timeline,
    config: &StochasticConfig,
    job_seed: u64,
    sim: usize,
) -> crate::error::Result<EngineResult> {
    let overrides = config.draw(&mut sim_rng(job_seed, sim as u64));
    let options = EngineOptions {
        write_snapshots: false,
        stochastic: Some(overrides),
    };
    engine::run(catalog, timeline, None, &options)
}

/// Run a contiguous block of simulations, in parallel when the `parallel`
/// feature is enabled. Results come back in simulation order; the first
/// failure aborts the whole batch.
pub fn run_batch(
    catalog: &Catalog,
    timeline: &Timeline,
    config: &StochasticConfig,
    job_seed: u64,
    sims: std::ops::Range<usize>,
) -> crate::error::Result<Vec<(usize, EngineResult)>> {
    #[cfg(feature = "parallel")]
    let results = sims
        .into_par_iter()
        .map(|sim| run_simulation(catalog, timeline, config, job_seed, sim).map(|r| (sim, r)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results = sims
        .map(|sim| run_simulation(catalog, timeline, config, job_seed, sim).map(|r| (sim, r)))
        .collect();

    results
}

/// Linear-interpolated percentile (`p` in 0..=100) over a sorted slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Percentile-by-year summary over per-sim yearly minima (see
/// [`crate::queries::graph::yearly_minima`] for the per-run reduction).
///
/// Every sim must cover the same years (they share one timeline). Each
/// requested percentile becomes a dataset; `deterministic` adds an overlay
/// dataset from a non-stochastic pass.
pub fn summary_graph(
    per_sim_minima: &[Vec<(i16, f64)>],
    percentiles: &[f64],
    deterministic: Option<&[(i16, f64)]>,
) -> ChartData {
    let Some(first) = per_sim_minima.first() else {
        return ChartData::default();
    };
    let years: Vec<i16> = first.iter().map(|(y, _)| *y).collect();
    let labels: Vec<String> = years.iter().map(|y| y.to_string()).collect();

    let mut datasets = Vec::with_capacity(percentiles.len());
    for &p in percentiles {
        let mut data = Vec::with_capacity(years.len());
        for (yi, _) in years.iter().enumerate() {
            let mut values: Vec<f64> = per_sim_minima
                .iter()
                .filter_map(|sim| sim.get(yi).map(|(_, v)| *v))
                .collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            data.push(percentile(&values, p));
        }
        datasets.push(Dataset {
            label: format!("p{}", p as i64),
            data,
        });
    }

    if let Some(overlay) = deterministic {
        datasets.push(Dataset {
            label: "deterministic".to_string(),
            data: years
                .iter()
                .map(|y| {
                    overlay
                        .iter()
                        .find(|(oy, _)| oy == y)
                        .map(|(_, v)| *v)
                        .unwrap_or(0.0)
                })
                .collect(),
        });
    }

    ChartData { labels, datasets }
}
