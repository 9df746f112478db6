//! Tab-delimited diagnostic tables
//!
//! Every table is rewritten in full each time it is produced. Write failures
//! are returned to the caller, which logs them and carries on.

use crate::core_types::Vec3;
use crate::error::OutputError;
use crate::grid::RoughnessLattice;
use crate::physics::{GroundProjection, IterationReport, SamplingPhase, Turbine};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::roughness::SampleRecord;

pub const TURBINE_POSITIONS: &str = "turbine_positions.tsv";
pub const GROUND_PROJECTION: &str = "ground_projection.tsv";
pub const ROUGHNESS_SAMPLES: &str = "roughness_samples.tsv";
pub const ROUGHNESS_LATTICE: &str = "roughness_lattice.tsv";
pub const PERFORMANCE_DIR: &str = "performance";
pub const SLICES_DIR: &str = "slices";

/// Writes diagnostic tables below one output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticWriter {
    dir: PathBuf,
}

impl DiagnosticWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory receiving height slices
    pub fn slices_dir(&self) -> PathBuf {
        self.dir.join(SLICES_DIR)
    }

    fn write_table(&self, relative: &str, contents: &str) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OutputError::CreateDir(parent.to_path_buf(), e))?;
        }
        fs::write(&path, contents).map_err(|e| OutputError::Write(path.clone(), e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Domain-frame turbine layout: `WT-n x y hub D type`
    pub fn turbine_positions(&self, turbines: &[Turbine]) -> Result<PathBuf, OutputError> {
        let mut s = String::new();
        for t in turbines {
            let _ = writeln!(
                s,
                "{}\t{}\t{}\t{}\t{}\t{}",
                t.label(),
                t.position.x,
                t.position.y,
                t.hub_offset,
                t.diameter,
                t.type_id
            );
        }
        self.write_table(TURBINE_POSITIONS, &s)
    }

    /// Ground projection: `WT-n rank distance x y z hub`
    pub fn ground_projection(&self, projections: &[GroundProjection]) -> Result<PathBuf, OutputError> {
        let mut s = String::new();
        for p in projections {
            let ground = p.position.unwrap_or_else(Vec3::zeros);
            let _ = writeln!(
                s,
                "WT-{}\t{}\t{}\t{}\t{}\t{}\t{}",
                p.turbine + 1,
                p.rank,
                p.distance,
                ground.x,
                ground.y,
                ground.z,
                p.hub_height
            );
        }
        self.write_table(GROUND_PROJECTION, &s)
    }

    /// Inflow samples and operating points of one update
    pub fn iteration(&self, report: &IterationReport) -> Result<(), OutputError> {
        let suffix = match report.phase {
            SamplingPhase::Scan => "init",
            SamplingPhase::Refresh => "adjust",
        };

        let mut inflow = String::new();
        for (i, sample) in report.samples.iter().enumerate() {
            let _ = writeln!(
                inflow,
                "WT-{}\t{}\t{}\t{}",
                i + 1,
                sample.sum,
                sample.count,
                sample.mean().unwrap_or(f64::NAN)
            );
        }
        self.write_table(&format!("inflow_{suffix}.tsv"), &inflow)?;
        self.write_table(
            &format!("performance_{suffix}.tsv"),
            &performance_table(report),
        )?;
        Ok(())
    }

    /// Final operating points, named by the reference inlet speed
    pub fn final_performance(&self, report: &IterationReport, reference_speed: i64) -> Result<PathBuf, OutputError> {
        self.write_table(
            &format!("{PERFORMANCE_DIR}/{reference_speed}.tsv"),
            &performance_table(report),
        )
    }

    /// Every vegetation point with its domain-frame coordinates
    pub fn roughness_samples(&self, records: &[SampleRecord]) -> Result<PathBuf, OutputError> {
        let mut s = String::new();
        for r in records {
            let _ = writeln!(s, "{}\t{}\t{}\t{}", r.easting, r.northing, r.a, r.b);
        }
        self.write_table(ROUGHNESS_SAMPLES, &s)
    }

    /// Lattice nodes: `x y height`
    pub fn roughness_lattice(&self, lattice: &RoughnessLattice) -> Result<PathBuf, OutputError> {
        let mut s = String::new();
        for (i, h) in lattice.heights().iter().enumerate() {
            let p = lattice.node_position(i);
            let _ = writeln!(s, "{}\t{}\t{}", p.x, p.y, h);
        }
        self.write_table(ROUGHNESS_LATTICE, &s)
    }
}

fn performance_table(report: &IterationReport) -> String {
    let mut s = String::new();
    for (i, p) in report.performance.iter().enumerate() {
        let _ = writeln!(s, "WT-{}\t{}\t{}\t{}\t{}", i + 1, p.speed, p.power, p.ct, p.force);
    }
    s
}

/// Log a failed diagnostic write and carry on
pub fn warn_on_error<T>(result: Result<T, OutputError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Diagnostic output skipped: {}", e);
            None
        }
    }
}
