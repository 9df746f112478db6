use std::os::raw::c_char;
use std::ptr;
use std::sync::RwLock;
use tracing::info;
use windsim_core::{CouplingOptions, Decomposition, SourceTermCoupling, Subdomain};

use crate::error::{DefaultWindSimError, WindSimErrorCode};
use crate::helpers::{path_from_cstr, read_points, track_error, track_result};

/// One subdomain of the host mesh as packed xyz triples.
///
/// Both buffers are copied during `windsim_new`; the caller may free them
/// afterwards.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WindSimMeshPart {
    /// Cell centres, `3 * cell_count` doubles
    pub cells: *const f64,
    /// Number of cells in this subdomain
    pub cell_count: usize,
    /// Ground element centroids, `3 * ground_count` doubles
    pub ground: *const f64,
    /// Number of ground elements in this subdomain
    pub ground_count: usize,
}

/// Source-term coupling for one run of the host solver.
///
/// # Thread Safety
/// The coupling sits behind an `RwLock`: field copies take the read lock,
/// `windsim_initialize` and `windsim_refresh` take the write lock.
pub struct WindSimInstance {
    pub(crate) coupling: RwLock<SourceTermCoupling>,
}

impl WindSimInstance {
    /// Load the case and build the coupling for the given mesh.
    ///
    /// # Errors
    ///
    /// Returns `NullPointer` for a missing case path or mesh buffer,
    /// `InvalidConfig`/`Io` when the case fails to load.
    pub(crate) fn new(
        case_dir: *const c_char,
        parts: &[WindSimMeshPart],
        diagnostics_dir: *const c_char,
    ) -> Result<Box<Self>, DefaultWindSimError> {
        let case_dir = path_from_cstr(case_dir, "case_dir")?.ok_or_else(|| DefaultWindSimError::null_pointer("case_dir"))?;
        let diagnostics = path_from_cstr(diagnostics_dir, "diagnostics_dir")?;

        let subdomains = parts
            .iter()
            .enumerate()
            .map(|(rank, part)| {
                // SAFETY: buffer lengths are part of the `WindSimMeshPart` contract
                let cells = unsafe { read_points(part.cells, part.cell_count, "cells") }?;
                let ground = unsafe { read_points(part.ground, part.ground_count, "ground") }?;
                Ok(Subdomain::new(rank, cells, ground))
            })
            .collect::<Result<Vec<_>, DefaultWindSimError>>()?;

        let options = CouplingOptions {
            diagnostics,
            ..CouplingOptions::default()
        };
        let coupling = SourceTermCoupling::from_case_dir(&case_dir, Decomposition::new(subdomains), options)?;
        info!(
            "Coupling ready for {} over {} subdomains",
            case_dir.display(),
            parts.len()
        );

        Ok(Box::new(Self {
            coupling: RwLock::new(coupling),
        }))
    }
}

/// Create a coupling instance and return it via out-parameter.
///
/// Parameters
/// - `case_dir`: Case directory holding `Input/`. Must be non-null.
/// - `parts`: `rank_count` mesh parts in rank order.
/// - `diagnostics_dir`: Directory for diagnostic tables, or null to disable them.
/// - `out_instance`: Pointer to receive the created instance. Must be non-null.
///   Set to null on failure.
///
/// Returns
/// - `WindSimErrorCode::Ok` (0) on success
/// - `WindSimErrorCode::NullPointer` for null required arguments
/// - `WindSimErrorCode::InvalidConfig` when the case fails validation
/// - `WindSimErrorCode::Io` when a case file cannot be read
///
/// # Safety
///
/// - `out_instance` must be a valid pointer to writable memory.
/// - `parts` must point to `rank_count` valid `WindSimMeshPart` values.
/// - The caller owns the returned instance and MUST call `windsim_destroy`
///   exactly once.
///
/// Example (C++)
/// ```cpp
/// WindSimInstance* sim = nullptr;
/// if (windsim_new("case", parts, rank_count, "case/Output", &sim) != WindSimErrorCode::Ok) {
///     fprintf(stderr, "%s\n", windsim_get_last_error());
///     return;
/// }
/// // ... outer iterations ...
/// windsim_destroy(sim);
/// ```
#[no_mangle]
pub unsafe extern "C" fn windsim_new(
    case_dir: *const c_char,
    parts: *const WindSimMeshPart,
    rank_count: usize,
    diagnostics_dir: *const c_char,
    out_instance: *mut *mut WindSimInstance,
) -> WindSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultWindSimError::null_pointer("out_instance"));
    }
    if parts.is_null() && rank_count > 0 {
        unsafe {
            *out_instance = ptr::null_mut();
        }
        return track_error(&DefaultWindSimError::null_pointer("parts"));
    }

    let parts = if rank_count == 0 {
        &[][..]
    } else {
        // SAFETY: non-null, `rank_count` parts guaranteed by the caller
        unsafe { std::slice::from_raw_parts(parts, rank_count) }
    };

    match track_result(WindSimInstance::new(case_dir, parts, diagnostics_dir)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            WindSimErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys an instance previously created by `windsim_new`.
///
/// A null `ptr` is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `windsim_new` and not freed already.
/// - The caller must not use the pointer again afterwards.
#[no_mangle]
pub unsafe extern "C" fn windsim_destroy(ptr: *mut WindSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: created by `Box::into_raw` in `windsim_new`, checked non-null above
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
