//! Per-subdomain field storage
//!
//! Every volumetric field handed to or received from the host solver is split
//! the same way the mesh is: one contiguous `Vec` per subdomain, indexed by the
//! subdomain-local cell index.

use crate::core_types::vec3::Vec3;
use crate::grid::Decomposition;
use serde::{Deserialize, Serialize};

/// A field partitioned across subdomains (`parts[rank][cell]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposedField<T> {
    parts: Vec<Vec<T>>,
}

impl<T: Clone> DecomposedField<T> {
    /// Create a field matching the cell layout of `decomposition`, filled with `value`
    pub fn filled(decomposition: &Decomposition, value: T) -> Self {
        let parts = decomposition
            .subdomains()
            .iter()
            .map(|s| vec![value.clone(); s.cell_count()])
            .collect();
        Self { parts }
    }

    /// Overwrite every value with `value`
    pub fn fill(&mut self, value: T) {
        for part in &mut self.parts {
            for v in part.iter_mut() {
                *v = value.clone();
            }
        }
    }
}

impl<T> DecomposedField<T> {
    /// Wrap already partitioned data
    pub fn from_parts(parts: Vec<Vec<T>>) -> Self {
        Self { parts }
    }

    /// Values owned by subdomain `rank`
    pub fn part(&self, rank: usize) -> &[T] {
        &self.parts[rank]
    }

    /// Mutable values owned by subdomain `rank`
    pub fn part_mut(&mut self, rank: usize) -> &mut [T] {
        &mut self.parts[rank]
    }

    /// All partitions in rank order
    pub fn parts(&self) -> &[Vec<T>] {
        &self.parts
    }

    /// Mutable partitions in rank order
    pub fn parts_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.parts
    }

    /// Number of partitions
    pub fn rank_count(&self) -> usize {
        self.parts.len()
    }

    /// Total number of values across all partitions
    pub fn len(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    /// True when no partition holds any value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the field and return its partitions
    pub fn into_parts(self) -> Vec<Vec<T>> {
        self.parts
    }

    /// Check that every partition matches the cell count of its subdomain
    pub fn matches(&self, decomposition: &Decomposition) -> bool {
        self.parts.len() == decomposition.subdomains().len()
            && self
                .parts
                .iter()
                .zip(decomposition.subdomains())
                .all(|(p, s)| p.len() == s.cell_count())
    }
}

/// Volumetric vector field (velocity, body force, drag coefficient)
pub type VectorField = DecomposedField<Vec3>;

/// Volumetric scalar field (pressure)
pub type ScalarField = DecomposedField<f64>;
