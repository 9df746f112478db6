//! Distributed mesh view
//!
//! The host solver owns the real mesh and its decomposition. The source terms
//! only need cell centres and the centroids of the cells that sit on the
//! ground patch, split by owning subdomain.

use crate::core_types::vec3::Vec3;
use serde::{Deserialize, Serialize};

/// Cells and ground elements owned by one subdomain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdomain {
    rank: usize,
    /// Cell centres, indexed by subdomain-local cell index
    cells: Vec<Vec3>,
    /// Centroids of the near-ground cells adjacent to the ground patch.
    /// In a layered mesh these are the first-layer cell centres, so their
    /// horizontal position identifies a vertical column.
    ground: Vec<Vec3>,
}

impl Subdomain {
    /// Create a subdomain from its cell centres and ground element centroids
    pub fn new(rank: usize, cells: Vec<Vec3>, ground: Vec<Vec3>) -> Self {
        Self {
            rank,
            cells,
            ground,
        }
    }

    /// Rank of this subdomain within the decomposition
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Cell centres
    pub fn cells(&self) -> &[Vec3] {
        &self.cells
    }

    /// Ground element centroids
    pub fn ground(&self) -> &[Vec3] {
        &self.ground
    }

    /// Number of cells owned
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of ground elements owned
    pub fn ground_count(&self) -> usize {
        self.ground.len()
    }
}

/// All subdomains of one run, in rank order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    subdomains: Vec<Subdomain>,
}

impl Decomposition {
    /// Build a decomposition, renumbering ranks to match positions
    pub fn new(subdomains: Vec<Subdomain>) -> Self {
        let subdomains = subdomains
            .into_iter()
            .enumerate()
            .map(|(rank, s)| Subdomain { rank, ..s })
            .collect();
        Self { subdomains }
    }

    /// Single-subdomain decomposition (serial run)
    pub fn serial(cells: Vec<Vec3>, ground: Vec<Vec3>) -> Self {
        Self::new(vec![Subdomain::new(0, cells, ground)])
    }

    /// Subdomains in rank order
    pub fn subdomains(&self) -> &[Subdomain] {
        &self.subdomains
    }

    /// Number of subdomains
    pub fn rank_count(&self) -> usize {
        self.subdomains.len()
    }

    /// Total cells across all subdomains
    pub fn total_cells(&self) -> usize {
        self.subdomains.iter().map(Subdomain::cell_count).sum()
    }

    /// Total ground elements across all subdomains
    pub fn total_ground(&self) -> usize {
        self.subdomains.iter().map(Subdomain::ground_count).sum()
    }
}
