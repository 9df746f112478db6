//! Full coupling runs against small synthetic meshes

mod common;

use approx::assert_relative_eq;
use common::*;
use std::fs;
use windsim_core::physics::SamplingPhase;
use windsim_core::{
    ConfigError, CouplingOptions, DecomposedField, Decomposition, ScalarField, SourceTermCoupling, Subdomain, Vec3,
    VectorField,
};

/// Two subdomains: half the sampling band plus the disk on rank 0, the other
/// half plus unrelated cells on rank 1. One flat ground element under the hub.
fn turbine_mesh() -> Decomposition {
    let band = induction_cells();
    let mut rank0 = band[..100].to_vec();
    rank0.extend(disk_cells());
    let mut rank1 = band[100..].to_vec();
    rank1.extend(far_cells());

    Decomposition::new(vec![
        Subdomain::new(0, rank0, vec![Vec3::new(0.0, 0.0, 0.0)]),
        Subdomain::new(1, rank1, vec![Vec3::new(60.0, 0.0, 5.0)]),
    ])
}

/// `band` speed in the sampling band, 3 m/s everywhere else
fn velocity(mesh: &Decomposition, band: f64) -> VectorField {
    DecomposedField::from_parts(
        mesh.subdomains()
            .iter()
            .map(|s| {
                s.cells()
                    .iter()
                    .map(|p| {
                        if p.x == -80.0 && p.z == 80.0 {
                            Vec3::new(band, 0.0, 0.0)
                        } else {
                            Vec3::new(3.0, 0.0, 0.0)
                        }
                    })
                    .collect()
            })
            .collect(),
    )
}

#[test]
fn test_reference_scenario_exact_values() {
    let case = TempCase::reference("reference");
    let mesh = turbine_mesh();
    let options = CouplingOptions {
        diagnostics: Some(case.output_dir()),
        ..CouplingOptions::default()
    };
    let mut coupling = SourceTermCoupling::from_case_dir(case.path(), mesh.clone(), options).unwrap();

    assert_eq!(coupling.ground_projections()[0].rank, 0);
    assert_eq!(coupling.turbines()[0].state.hub_height, 80.0);

    let report = coupling.initialize(&velocity(&mesh, 8.0)).unwrap().clone();

    let w = (8.0 - 3.0) / (12.0 - 3.0);
    let ct = 0.9 + (0.3 - 0.9) * w;
    let power = 0.0 + (1000.0 - 0.0) * w;
    let force = 0.25 / 20.0 * 1.225 * ct * 8.0 * 8.0;

    assert_eq!(report.phase, SamplingPhase::Scan);
    assert_eq!(report.samples[0].count, 200);
    assert_eq!(report.samples[0].mean(), Some(8.0));
    assert_eq!(report.performance[0].ct, ct);
    assert_eq!(report.performance[0].power, power);
    assert_eq!(report.performance[0].force, force);
    assert_relative_eq!(power, 555.555_555_555_555_6, epsilon = 1e-9);

    // Disk cells on rank 0 follow the 100 band cells
    let body = coupling.body_force().unwrap();
    for cell in &body.part(0)[100..] {
        assert_eq!(*cell, Vec3::new(-force, 0.0, 0.0));
    }
    assert!(body.part(0)[..100].iter().all(|f| *f == Vec3::zeros()));
    assert!(body.part(1).iter().all(|f| *f == Vec3::zeros()));

    // No vegetation source: no drag anywhere
    assert!(coupling.drag_force().parts().iter().flatten().all(|f| *f == Vec3::zeros()));
    assert_eq!(coupling.model().reference_inlet_speed(), Some(8));

    for table in [
        "turbine_positions.tsv",
        "ground_projection.tsv",
        "inflow_init.tsv",
        "performance_init.tsv",
    ] {
        assert!(case.output_dir().join(table).is_file(), "{table} missing");
    }
}

#[test]
fn test_refresh_follows_cached_cells() {
    let case = TempCase::reference("refresh");
    let mesh = turbine_mesh();
    let mut coupling = SourceTermCoupling::from_case_dir(case.path(), mesh.clone(), CouplingOptions::default()).unwrap();
    coupling.initialize(&velocity(&mesh, 8.0)).unwrap();

    let report = coupling.refresh(&velocity(&mesh, 10.0)).unwrap();

    assert_eq!(report.phase, SamplingPhase::Refresh);
    assert_eq!(report.samples[0].count, 200);
    assert_eq!(report.samples[0].mean(), Some(10.0));
    assert_eq!(coupling.turbines()[0].state.inflow_speed, 10.0);
    assert_eq!(coupling.model().reference_inlet_speed(), Some(10));
}

#[test]
fn test_turbine_outside_mesh_keeps_inlet_speed() {
    let case = TempCase::reference("starved");
    case.write_input("Turbines.txt", "5000 5000 80 80 1\n");
    let mesh = turbine_mesh();
    let mut coupling = SourceTermCoupling::from_case_dir(case.path(), mesh.clone(), CouplingOptions::default()).unwrap();

    let report = coupling.initialize(&velocity(&mesh, 8.0)).unwrap().clone();
    let report_again = coupling.refresh(&velocity(&mesh, 12.0)).unwrap();

    assert_eq!(report.samples[0].count, 0);
    assert_eq!(report_again.samples[0].count, 0);
    assert_eq!(coupling.turbines()[0].state.inflow_speed, 8.0);
    // Nothing matched within the search radius
    assert_eq!(coupling.ground_projections()[0].matches, 0);
    assert_eq!(coupling.turbines()[0].state.hub_height, 80.0);
}

#[test]
fn test_canopy_drag_and_height_slices() {
    let case = TempCase::reference("canopy");
    case.write_input("rou", ROU_AROUND_ORIGIN);
    let mesh = layered_serial();
    let options = CouplingOptions {
        diagnostics: Some(case.output_dir()),
        ..CouplingOptions::default()
    };
    let mut coupling = SourceTermCoupling::from_case_dir(case.path(), mesh.clone(), options).unwrap();

    assert_eq!(coupling.raster_stats().samples, 4);
    // Cells up to z = 17.5 sit inside the 20 m canopy, four columns each
    assert_eq!(coupling.canopy_stats().cells_with_drag, 16);

    let u: VectorField = DecomposedField::from_parts(vec![mesh.subdomains()[0]
        .cells()
        .iter()
        .map(|p| Vec3::new(p.z, 0.0, 0.0))
        .collect()]);
    coupling.initialize(&u).unwrap();

    // Cell 4 is column 0 of layer 1 (z = 7.5)
    let s: f64 = 7.5 / 20.0 - 0.5;
    let c = 0.2 * 0.1 * (-10.0 * s * s).exp();
    let coefficient = coupling.canopy_coefficients().part(0)[4];
    assert_relative_eq!(coefficient.x, c, epsilon = 1e-12);
    assert_eq!(coefficient.x, coefficient.y);

    let drag = coupling.drag_force().part(0)[4];
    assert_relative_eq!(drag.x, -0.5 * 1.22 * 7.5 * 7.5 * c, epsilon = 1e-12);
    assert_eq!(drag.y, 0.0);
    // Above the canopy
    assert_eq!(coupling.drag_force().part(0)[4 * 4], Vec3::zeros());

    let pressure: ScalarField =
        DecomposedField::from_parts(vec![mesh.subdomains()[0].cells().iter().map(|p| -p.z).collect()]);
    let report = coupling.finalize(&u, &pressure).unwrap();

    // 500 m lies above the mesh and is skipped
    assert_eq!(report.slices.len(), 2);
    let ten = &report.slices[0];
    assert_eq!(ten.rows.len(), 4);
    assert_relative_eq!(ten.rows[2].velocity.x, 10.0, epsilon = 1e-12);
    assert_relative_eq!(ten.rows[2].pressure, -10.0, epsilon = 1e-12);
    assert_relative_eq!(ten.rows[2].position.z, 10.0, epsilon = 1e-12);

    let slice_file = case.output_dir().join("slices").join("10");
    let contents = fs::read_to_string(slice_file).unwrap();
    assert_eq!(contents.lines().count(), 4);
    assert!(case.output_dir().join("performance").join("8.tsv").is_file());
    assert!(case.output_dir().join("roughness_lattice.tsv").is_file());
}

#[test]
fn test_finalize_without_cells_is_an_error() {
    let case = TempCase::reference("empty_mesh");
    let mesh = Decomposition::serial(Vec::new(), vec![Vec3::new(0.0, 0.0, 0.0)]);
    let coupling = SourceTermCoupling::from_case_dir(case.path(), mesh.clone(), CouplingOptions::default()).unwrap();

    let u: VectorField = DecomposedField::filled(&mesh, Vec3::zeros());
    let p: ScalarField = DecomposedField::filled(&mesh, 0.0);

    assert!(matches!(coupling.finalize(&u, &p), Err(ConfigError::LayoutMismatch(_))));
}
