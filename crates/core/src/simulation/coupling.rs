//! Source-term coupling with a host flow solver
//!
//! One `SourceTermCoupling` serves one run. Construction does the static work
//! (turbine placement, ground projection, roughness lattice, canopy
//! coefficients). The host then calls `initialize` once with its first
//! velocity field, `refresh` after every outer iteration, and `finalize` with
//! the converged solution.

use crate::config::CaseConfig;
use crate::core_types::{DecomposedField, ScalarField, Vec3, VectorField};
use crate::error::ConfigError;
use crate::grid::{Decomposition, RasterStats, RasterStrategy, RoughnessLattice};
use crate::io::{warn_on_error, CaseInputs, DiagnosticWriter, RoughnessSource};
use crate::physics::{
    apply_drag, CanopyFieldBuilder, CanopyParams, CanopyStats, GroundProjection, GroundProjector,
    GroundTieBreak, IterationReport, Turbine, TurbineForceModel,
};
use crate::post::{HeightSlice, LayeredSolution, VerticalProfileInterpolator};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Run options that are not part of the case file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouplingOptions {
    /// Directory for diagnostic tables; none are written when unset
    pub diagnostics: Option<PathBuf>,
    /// Nearest-node search used when rasterizing vegetation samples
    pub raster_strategy: RasterStrategy,
    /// Ground element chosen when several are equally near a turbine
    pub tie_break: GroundTieBreak,
}

/// Outcome of `finalize`
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    /// First turbine's inflow rounded to an integer
    pub reference_speed: Option<i64>,
    /// Extracts at the requested heights that fell inside the profile
    pub slices: Vec<HeightSlice>,
    /// Files written, when diagnostics are enabled
    pub written: Vec<PathBuf>,
}

/// Turbine body force and canopy drag for one run
#[derive(Debug)]
pub struct SourceTermCoupling {
    config: CaseConfig,
    decomposition: Decomposition,
    model: TurbineForceModel,
    ground: Vec<GroundProjection>,
    lattice: RoughnessLattice,
    raster: RasterStats,
    canopy_stats: CanopyStats,
    canopy: VectorField,
    drag: VectorField,
    last_report: Option<IterationReport>,
    diagnostics: Option<DiagnosticWriter>,
}

impl SourceTermCoupling {
    /// Load a case directory and prepare the static fields
    ///
    /// # Errors
    /// Returns any `ConfigError` from loading or validating the case
    pub fn from_case_dir<P: AsRef<Path>>(
        case_dir: P,
        decomposition: Decomposition,
        options: CouplingOptions,
    ) -> Result<Self, ConfigError> {
        let inputs = CaseInputs::load(case_dir)?;
        Self::new(inputs, decomposition, options)
    }

    /// Prepare the static fields from already loaded inputs
    ///
    /// # Errors
    /// Returns `ConfigError::MissingPowerCurve` when a turbine type has no curve
    pub fn new(inputs: CaseInputs, decomposition: Decomposition, options: CouplingOptions) -> Result<Self, ConfigError> {
        let CaseInputs {
            config,
            turbines,
            curves,
            roughness,
            ..
        } = inputs;
        let diagnostics = options.diagnostics.map(DiagnosticWriter::new);

        info!(
            "Coupling: {} cells, {} ground elements in {} subdomains",
            decomposition.total_cells(),
            decomposition.total_ground(),
            decomposition.rank_count()
        );

        let mut model = TurbineForceModel::new(turbines, curves, config.wind.speed)?;
        let projector = GroundProjector::new(config.ground.tolerance, options.tie_break);
        let ground = model.project_ground(&projector, &decomposition);
        if let Some(writer) = &diagnostics {
            warn_on_error(writer.turbine_positions(model.turbines()));
            warn_on_error(writer.ground_projection(&ground));
        }

        let (lattice, raster) = Self::build_lattice(
            &config,
            roughness.as_ref(),
            options.raster_strategy,
            diagnostics.as_ref(),
        );
        let builder = CanopyFieldBuilder::new(&lattice, config.layering(), CanopyParams::from_config(&config));
        let (canopy, canopy_stats) = builder.build(&decomposition);
        let drag = DecomposedField::filled(&decomposition, Vec3::zeros());

        Ok(Self {
            config,
            decomposition,
            model,
            ground,
            lattice,
            raster,
            canopy_stats,
            canopy,
            drag,
            last_report: None,
            diagnostics,
        })
    }

    fn build_lattice(
        config: &CaseConfig,
        source: Option<&RoughnessSource>,
        strategy: RasterStrategy,
        diagnostics: Option<&DiagnosticWriter>,
    ) -> (RoughnessLattice, RasterStats) {
        let mut lattice = RoughnessLattice::new(config.domain.size, config.roughness.lattice_spacing);
        let Some(source) = source else {
            return (lattice, RasterStats::default());
        };

        let samples = source.domain_samples(
            &config.frame(),
            config.domain.size,
            config.roughness.vegetation_multiplier,
        );
        let stats = lattice.rasterize(&samples.accepted, strategy);
        info!(
            "Roughness lattice: {} of {} samples in the domain, {} of {} nodes written ({} overwrites)",
            stats.samples,
            samples.records.len(),
            stats.nodes_written,
            lattice.node_count(),
            stats.overwrites
        );

        if let Some(writer) = diagnostics {
            warn_on_error(writer.roughness_samples(&samples.records));
            warn_on_error(writer.roughness_lattice(&lattice));
        }
        (lattice, stats)
    }

    /// Case configuration
    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    /// Mesh view the coupling was built on
    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Turbines with their current state
    pub fn turbines(&self) -> &[Turbine] {
        self.model.turbines()
    }

    /// Turbine force model
    pub fn model(&self) -> &TurbineForceModel {
        &self.model
    }

    /// Ground projection of every turbine
    pub fn ground_projections(&self) -> &[GroundProjection] {
        &self.ground
    }

    /// Rasterized canopy heights
    pub fn lattice(&self) -> &RoughnessLattice {
        &self.lattice
    }

    /// Rasterization summary
    pub fn raster_stats(&self) -> RasterStats {
        self.raster
    }

    /// Canopy coefficient summary
    pub fn canopy_stats(&self) -> CanopyStats {
        self.canopy_stats
    }

    /// Static canopy drag coefficients
    pub fn canopy_coefficients(&self) -> &VectorField {
        &self.canopy
    }

    /// Turbine body force (`SourceT`), once `initialize` has run
    pub fn body_force(&self) -> Option<&VectorField> {
        self.model.body_force()
    }

    /// Canopy drag force (`RoughT`) from the last velocity seen
    pub fn drag_force(&self) -> &VectorField {
        &self.drag
    }

    /// Most recent turbine update
    pub fn last_report(&self) -> Option<&IterationReport> {
        self.last_report.as_ref()
    }

    /// First update: scan the sampling bands and build both force fields
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` does not match the mesh
    pub fn initialize(&mut self, velocity: &VectorField) -> Result<&IterationReport, ConfigError> {
        let report = self.model.initialize(&self.decomposition, velocity)?;
        self.finish_update(velocity, report)
    }

    /// Per-iteration update from the cached sampling cells
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` does not match the mesh
    pub fn refresh(&mut self, velocity: &VectorField) -> Result<&IterationReport, ConfigError> {
        let report = self.model.refresh(&self.decomposition, velocity)?;
        self.finish_update(velocity, report)
    }

    fn finish_update(&mut self, velocity: &VectorField, report: IterationReport) -> Result<&IterationReport, ConfigError> {
        self.model.rebuild_body_force(&self.decomposition);
        self.update_drag(velocity)?;
        if let Some(writer) = &self.diagnostics {
            warn_on_error(writer.iteration(&report));
        }
        Ok(self.last_report.insert(report))
    }

    /// Recompute the canopy drag force from `velocity`
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` does not match the mesh
    pub fn update_drag(&mut self, velocity: &VectorField) -> Result<&VectorField, ConfigError> {
        apply_drag(&self.canopy, velocity, &mut self.drag)?;
        Ok(&self.drag)
    }

    /// Extract the requested heights from the converged solution and write
    /// the final performance table
    ///
    /// Every cell must sit above one ground element of any subdomain; columns
    /// are gathered across ranks and stacked by elevation.
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if the fields do not match the
    /// mesh or the cells do not stack into columns of at least two layers
    pub fn finalize(&self, velocity: &VectorField, pressure: &ScalarField) -> Result<FinalReport, ConfigError> {
        if !velocity.matches(&self.decomposition) || !pressure.matches(&self.decomposition) {
            return Err(ConfigError::LayoutMismatch(
                "final velocity or pressure does not match the decomposition".to_string(),
            ));
        }

        let reference_speed = self.model.reference_inlet_speed();
        let mut written = Vec::new();

        if let (Some(writer), Some(report), Some(speed)) =
            (&self.diagnostics, &self.last_report, reference_speed)
        {
            written.extend(warn_on_error(writer.final_performance(report, speed)));
        }

        let heights = &self.config.post.heights;
        if heights.is_empty() {
            return Ok(FinalReport {
                reference_speed,
                slices: Vec::new(),
                written,
            });
        }

        let positions: Vec<Vec3> = self
            .decomposition
            .subdomains()
            .iter()
            .flat_map(|s| s.cells().iter().copied())
            .collect();
        let ground: Vec<Vec3> = self
            .decomposition
            .subdomains()
            .iter()
            .flat_map(|s| s.ground().iter().copied())
            .collect();
        let solution = LayeredSolution::from_columns(
            &ground,
            positions,
            velocity.parts().concat(),
            pressure.parts().concat(),
        )?;

        let interpolator = VerticalProfileInterpolator::new(self.config.layering());
        let slices = interpolator.extract(&solution, heights);
        if slices.len() < heights.len() {
            warn!("{} of {} requested heights extracted", slices.len(), heights.len());
        }

        if let Some(writer) = &self.diagnostics {
            let dir = writer.slices_dir();
            for slice in &slices {
                written.extend(warn_on_error(slice.write(&dir)));
            }
        }

        info!(
            "Finalized: reference speed {:?}, {} height slices",
            reference_speed,
            slices.len()
        );

        Ok(FinalReport {
            reference_speed,
            slices,
            written,
        })
    }
}
