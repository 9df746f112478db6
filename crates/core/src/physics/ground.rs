//! Turbine ground projection
//!
//! Hub heights are given above local ground, so each turbine is attached to
//! the ground element nearest to it in the horizontal plane. Subdomains search
//! their own elements, the minimum distance is reduced globally and then every
//! subdomain reports the elements that match it.

use crate::core_types::Vec3;
use crate::grid::{reduce, Decomposition, Subdomain};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::turbine::Turbine;

/// Which element wins when several match the minimum distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroundTieBreak {
    /// Smallest `(rank, element index)`
    #[default]
    FirstSeen,
    /// Largest `(rank, element index)`
    LastSeen,
}

/// Result of projecting one turbine onto the ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundProjection {
    /// 0-based turbine index
    pub turbine: usize,
    /// Rank owning the chosen element (0 without a match)
    pub rank: usize,
    /// Global minimum distance, capped by the search radius
    pub distance: f64,
    /// Chosen element centroid
    pub position: Option<Vec3>,
    /// Hub elevation after projection
    pub hub_height: f64,
    /// Number of elements that matched the minimum
    pub matches: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rank: usize,
    index: usize,
    position: Vec3,
}

/// Nearest-ground-element search
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundProjector {
    tolerance: f64,
    tie_break: GroundTieBreak,
}

impl GroundProjector {
    /// Projector matching within `tolerance` of the reduced minimum
    /// (0 for exact equality)
    pub fn new(tolerance: f64, tie_break: GroundTieBreak) -> Self {
        Self {
            tolerance,
            tie_break,
        }
    }

    #[inline]
    fn horizontal_distance(turbine: &Turbine, p: &Vec3) -> f64 {
        let dx = p.x - turbine.position.x;
        let dy = p.y - turbine.position.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Per-turbine minimum distance within one subdomain, starting from the
    /// turbine's length scale
    fn local_minima(subdomain: &Subdomain, turbines: &[Turbine]) -> Vec<f64> {
        turbines
            .iter()
            .map(|t| {
                subdomain
                    .ground()
                    .iter()
                    .map(|p| Self::horizontal_distance(t, p))
                    .fold(t.length_scale, f64::min)
            })
            .collect()
    }

    fn local_matches(
        &self,
        subdomain: &Subdomain,
        turbines: &[Turbine],
        minima: &[f64],
    ) -> Vec<Vec<Candidate>> {
        turbines
            .iter()
            .zip(minima)
            .map(|(t, &d_min)| {
                subdomain
                    .ground()
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| {
                        let d = Self::horizontal_distance(t, p);
                        if self.tolerance > 0.0 {
                            (d - d_min).abs() <= self.tolerance
                        } else {
                            d == d_min
                        }
                    })
                    .map(|(index, p)| Candidate {
                        rank: subdomain.rank(),
                        index,
                        position: *p,
                    })
                    .collect()
            })
            .collect()
    }

    /// Attach every turbine to its nearest ground element and update the
    /// owning rank and hub height
    pub fn project(&self, decomposition: &Decomposition, turbines: &mut [Turbine]) -> Vec<GroundProjection> {
        let subdomains = decomposition.subdomains();
        let placed: &[Turbine] = turbines;

        let partial_minima: Vec<Vec<f64>> = subdomains
            .par_iter()
            .map(|s| Self::local_minima(s, placed))
            .collect();
        let minima: Vec<f64> = (0..placed.len())
            .map(|t| {
                let per_rank: Vec<f64> = partial_minima.iter().map(|m| m[t]).collect();
                reduce::min(&per_rank)
            })
            .collect();

        // Ranks come back in order, and elements within a rank in index order
        let partial_matches: Vec<Vec<Vec<Candidate>>> = subdomains
            .par_iter()
            .map(|s| self.local_matches(s, placed, &minima))
            .collect();

        turbines
            .iter_mut()
            .enumerate()
            .map(|(t, turbine)| {
                let label = turbine.label();
                let candidates: Vec<Candidate> = partial_matches
                    .iter()
                    .flat_map(|per_rank| per_rank[t].iter().copied())
                    .collect();
                let chosen = match self.tie_break {
                    GroundTieBreak::FirstSeen => candidates.first(),
                    GroundTieBreak::LastSeen => candidates.last(),
                };

                match candidates.len() {
                    0 => warn!(
                        "{}: no ground element within {:.3} of the hub; hub height stays {:.3}",
                        label,
                        turbine.length_scale,
                        turbine.hub_offset
                    ),
                    1 => {}
                    n => warn!(
                        "{}: {} ground elements at distance {:.6}, using rank {} element {}",
                        label,
                        n,
                        minima[t],
                        chosen.map_or(0, |c| c.rank),
                        chosen.map_or(0, |c| c.index)
                    ),
                }

                let state = &mut turbine.state;
                state.ground_distance = minima[t];
                state.ground = chosen.map(|c| c.position);
                state.rank = chosen.map_or(0, |c| c.rank);
                state.hub_height = turbine.hub_offset + chosen.map_or(0.0, |c| c.position.z);

                debug!(
                    "{}: rank {} distance {:.4} hub height {:.3}",
                    label,
                    state.rank,
                    state.ground_distance,
                    state.hub_height
                );

                GroundProjection {
                    turbine: t,
                    rank: state.rank,
                    distance: state.ground_distance,
                    position: state.ground,
                    hub_height: state.hub_height,
                    matches: candidates.len(),
                }
            })
            .collect()
    }
}
