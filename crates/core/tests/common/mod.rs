//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use windsim_core::{Decomposition, Subdomain, Vec3};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Westerly wind so the site frame equals the domain frame
pub const CASE_JSON: &str = r#"{
    "domain": { "long": 0.0, "lat": 0.0, "lt": 4000.0, "h": 1000.0 },
    "wind": { "angle": -90.0, "speed": 8.0 },
    "mesh": { "h1": 40.0, "ceng": 8, "q1": 1.2, "lc2": [20.0], "scale": 1.0 },
    "terrain": { "r1": 1500.0, "r2": 1900.0 },
    "roughness": { "Cd": 0.2, "lad_max": 0.1, "vege_times": 1.0 },
    "post": { "udh": [10.0, 20.0, 500.0], "meshSize": 20.0 }
}"#;

/// One turbine at the origin, hub 80, diameter 80, type 1
pub const SINGLE_TURBINE: &str = "0 0 80 80 1\n";

/// Type 1 curve of the reference scenario
pub const CURVE_TYPE_1: &str = "3 0 0.9\n12 1000 0.3\n";

/// Canopy of height 20 on the four lattice nodes around the origin
pub const ROU_AROUND_ORIGIN: &str = "survey\nv1\nunits m\ncolumns e n\n\
    2 20 4\n\
    -50 -50\n\
    50 -50\n\
    -50 50\n\
    50 50\n\
    0\n";

static CASE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Case directory under the system temp dir, removed on drop
pub struct TempCase {
    root: PathBuf,
}

impl TempCase {
    pub fn new(name: &str) -> Self {
        let n = CASE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!("windsim_{name}_{}_{n}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("Input")).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("Output")
    }

    pub fn write_input(&self, name: &str, contents: &str) -> &Self {
        fs::write(self.root.join("Input").join(name), contents).unwrap();
        self
    }

    /// Case with the reference config, one turbine and its curve
    pub fn reference(name: &str) -> Self {
        let case = Self::new(name);
        case.write_input("input.json", CASE_JSON)
            .write_input("Turbines.txt", SINGLE_TURBINE)
            .write_input("1-U-P-Ct.txt", CURVE_TYPE_1);
        case
    }
}

impl Drop for TempCase {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Ground element centres of a 2×2 column block around the origin
pub fn column_bases() -> Vec<Vec3> {
    vec![
        Vec3::new(-10.0, -10.0, 2.5),
        Vec3::new(10.0, -10.0, 2.5),
        Vec3::new(-10.0, 10.0, 2.5),
        Vec3::new(10.0, 10.0, 2.5),
    ]
}

/// Cell centres of 8 uniform 5 m layers over flat ground, layer-major
pub fn layered_cells() -> Vec<Vec3> {
    let bases = column_bases();
    (0..8)
        .flat_map(|j| {
            let z = 2.5 + 5.0 * j as f64;
            bases.iter().map(move |b| Vec3::new(b.x, b.y, z)).collect::<Vec<_>>()
        })
        .collect()
}

/// Layered block as a single subdomain
pub fn layered_serial() -> Decomposition {
    Decomposition::serial(layered_cells(), column_bases())
}

/// Layered block with columns 0-1 on rank 0 and columns 2-3 on rank 1
pub fn layered_by_columns() -> Decomposition {
    let cells = layered_cells();
    let bases = column_bases();
    let split = |lo: usize, hi: usize| {
        let c = cells
            .iter()
            .enumerate()
            .filter(|(i, _)| (lo..hi).contains(&(i % 4)))
            .map(|(_, p)| *p)
            .collect();
        Subdomain::new(0, c, bases[lo..hi].to_vec())
    };
    Decomposition::new(vec![split(0, 2), split(2, 4)])
}

/// 200 cells one diameter upstream of the origin at hub height, spread
/// across the rotor axis
pub fn induction_cells() -> Vec<Vec3> {
    (0..200)
        .map(|i| Vec3::new(-80.0, -10.0 + 0.1 * i as f64, 80.0))
        .collect()
}

/// Cells that neither sample inflow nor sit in the disk
pub fn far_cells() -> Vec<Vec3> {
    vec![
        Vec3::new(-80.0, 0.0, 200.0),
        Vec3::new(500.0, 0.0, 80.0),
        Vec3::new(-300.0, 0.0, 80.0),
    ]
}

/// Cells inside the rotor disk of the origin turbine
pub fn disk_cells() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 80.0),
        Vec3::new(15.0, 30.0, 80.0),
        Vec3::new(-20.0, 0.0, 120.0),
    ]
}
