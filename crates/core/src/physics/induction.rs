//! Upstream inflow sampling
//!
//! The undisturbed inflow of a turbine is estimated as the mean streamwise
//! velocity over the cells of a band upstream of its rotor. Finding those
//! cells needs a scan of the whole mesh, so it is done once: `scan` records
//! the qualifying cells per subdomain and later iterations `refresh` by
//! revisiting only the recorded cells.

use crate::core_types::VectorField;
use crate::error::ConfigError;
use crate::grid::{reduce, Decomposition};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::turbine::Turbine;

/// Globally reduced inflow sample of one turbine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InflowSample {
    /// Sum of the streamwise velocity over the sampled cells
    pub sum: f64,
    /// Number of sampled cells
    pub count: usize,
}

impl InflowSample {
    /// Mean streamwise velocity, `None` when no cell was sampled
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Cells recorded for every turbine, grouped by owning subdomain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InductionCache {
    /// `per_rank[rank][turbine]` holds subdomain-local cell indices
    per_rank: Vec<Vec<Vec<usize>>>,
    /// Global cell count per turbine
    counts: Vec<usize>,
    /// Cells per subdomain at scan time
    layout: Vec<usize>,
}

impl InductionCache {
    /// Number of turbines covered
    pub fn turbine_count(&self) -> usize {
        self.counts.len()
    }

    /// Number of subdomains covered
    pub fn rank_count(&self) -> usize {
        self.per_rank.len()
    }

    /// Global number of cached cells of a turbine
    pub fn cell_count(&self, turbine: usize) -> usize {
        self.counts[turbine]
    }

    /// Total number of cached `(rank, cell)` entries
    pub fn len(&self) -> usize {
        reduce::sum_counts(&self.counts)
    }

    /// True when no turbine has a cached cell
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached `(rank, cell)` entries of a turbine, in rank then cell order
    pub fn entries(&self, turbine: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.per_rank
            .iter()
            .enumerate()
            .flat_map(move |(rank, per_turbine)| {
                per_turbine[turbine].iter().map(move |&cell| (rank, cell))
            })
    }

    /// Re-read the streamwise velocity at the cached cells
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` is not partitioned
    /// like the field the cache was built from
    pub fn refresh(&self, velocity: &VectorField) -> Result<Vec<InflowSample>, ConfigError> {
        let layout: Vec<usize> = velocity.parts().iter().map(Vec::len).collect();
        if layout != self.layout {
            return Err(ConfigError::LayoutMismatch(format!(
                "velocity has {} cells in {} subdomains, induction cache was built on {} in {}",
                velocity.len(),
                velocity.rank_count(),
                reduce::sum_counts(&self.layout),
                self.rank_count()
            )));
        }

        let partial_sums: Vec<Vec<f64>> = self
            .per_rank
            .par_iter()
            .zip(velocity.parts().par_iter())
            .map(|(per_turbine, u)| {
                per_turbine
                    .iter()
                    .map(|cells| cells.iter().map(|&c| u[c].x).fold(0.0, |acc, v| acc + v))
                    .collect()
            })
            .collect();
        let sums = if partial_sums.is_empty() {
            vec![0.0; self.counts.len()]
        } else {
            reduce::sum_elementwise(&partial_sums)
        };

        Ok(sums
            .into_iter()
            .zip(&self.counts)
            .map(|(sum, &count)| InflowSample { sum, count })
            .collect())
    }
}

/// Full-mesh scan for the upstream sampling band
pub struct InductionSampler;

impl InductionSampler {
    /// Find every cell in each turbine's sampling band, record them and
    /// return the first inflow samples
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` does not match the
    /// decomposition
    pub fn scan(
        decomposition: &Decomposition,
        velocity: &VectorField,
        turbines: &[Turbine],
    ) -> Result<(InductionCache, Vec<InflowSample>), ConfigError> {
        if !velocity.matches(decomposition) {
            return Err(ConfigError::LayoutMismatch(
                "velocity field does not match the decomposition".to_string(),
            ));
        }

        let partials: Vec<(Vec<Vec<usize>>, Vec<f64>)> = decomposition
            .subdomains()
            .par_iter()
            .zip(velocity.parts().par_iter())
            .map(|(subdomain, u)| {
                let cells: Vec<Vec<usize>> = turbines
                    .iter()
                    .map(|t| {
                        subdomain
                            .cells()
                            .iter()
                            .enumerate()
                            .filter(|(_, p)| t.in_induction_zone(p))
                            .map(|(i, _)| i)
                            .collect()
                    })
                    .collect();
                let sums = cells
                    .iter()
                    .map(|c| c.iter().map(|&i| u[i].x).fold(0.0, |acc, v| acc + v))
                    .collect();
                (cells, sums)
            })
            .collect();

        let (per_rank, partial_sums): (Vec<_>, Vec<_>) = partials.into_iter().unzip();
        let partial_counts: Vec<Vec<usize>> = per_rank
            .iter()
            .map(|per_turbine: &Vec<Vec<usize>>| per_turbine.iter().map(Vec::len).collect())
            .collect();
        let counts = if per_rank.is_empty() {
            vec![0; turbines.len()]
        } else {
            reduce::sum_counts_elementwise(&partial_counts)
        };
        let sums = if per_rank.is_empty() {
            vec![0.0; turbines.len()]
        } else {
            reduce::sum_elementwise(&partial_sums)
        };

        let samples = sums
            .into_iter()
            .zip(&counts)
            .map(|(sum, &count)| InflowSample { sum, count })
            .collect();

        let layout = decomposition.subdomains().iter().map(|s| s.cell_count()).collect();

        Ok((
            InductionCache {
                per_rank,
                counts,
                layout,
            },
            samples,
        ))
    }
}
