//! C API for the wind farm source terms
//!
//! A host solver creates one `WindSimInstance` per run with `windsim_new`,
//! calls `windsim_initialize` with its first velocity field and
//! `windsim_refresh` after every outer iteration, copying the body and drag
//! forces back into its momentum equation. `windsim_finalize` writes the
//! height slices of the converged solution.
//!
//! Fields cross the boundary as one buffer per subdomain, in rank order.
//! Vector fields are packed xyz triples.

mod error;
mod helpers;
mod instance;

pub use error::{windsim_get_last_error, windsim_get_last_error_code, WindSimErrorCode};
pub use instance::{windsim_destroy, windsim_new, WindSimInstance, WindSimMeshPart};

use error::DefaultWindSimError;
use helpers::{
    instance_from_ptr, read_scalar_field, read_vector_field, status, track_error, with_coupling, with_coupling_mut,
    write_part,
};

/// Per-turbine state after the latest update.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindSimTurbineState {
    /// Hub position in the domain frame
    pub x: f64,
    pub y: f64,
    /// Hub elevation in the mesh
    pub hub_height: f64,
    /// Subdomain owning the matched ground element
    pub rank: usize,
    /// Inflow speed estimate (m/s)
    pub inflow_speed: f64,
    /// Thrust coefficient
    pub ct: f64,
    /// Power (kW)
    pub power: f64,
    /// Body force magnitude inside the disk
    pub force: f64,
}

/// First update: scan for the sampling cells and build the source terms.
///
/// # Safety
/// - `ptr` must be a live instance from `windsim_new`.
/// - `velocity` must point to one buffer per subdomain, each holding
///   `3 * cell_count` doubles.
#[no_mangle]
pub unsafe extern "C" fn windsim_initialize(ptr: *const WindSimInstance, velocity: *const *const f64) -> WindSimErrorCode {
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling_mut(instance, |coupling| {
            // SAFETY: layout guaranteed by the caller
            let u = unsafe { read_vector_field(velocity, coupling.decomposition(), "velocity") }?;
            coupling.initialize(&u)?;
            Ok(())
        })
    }))
}

/// Per-iteration update from the cached sampling cells.
///
/// # Safety
/// Same contract as `windsim_initialize`.
#[no_mangle]
pub unsafe extern "C" fn windsim_refresh(ptr: *const WindSimInstance, velocity: *const *const f64) -> WindSimErrorCode {
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling_mut(instance, |coupling| {
            // SAFETY: layout guaranteed by the caller
            let u = unsafe { read_vector_field(velocity, coupling.decomposition(), "velocity") }?;
            coupling.refresh(&u)?;
            Ok(())
        })
    }))
}

/// Copy the turbine body force of one subdomain into `out`.
///
/// Returns `InvalidParameter` before the first `windsim_initialize`, for an
/// out-of-range `rank`, or when `out_len` is not `3 * cell_count`.
///
/// # Safety
/// `out` must point to `out_len` writable doubles.
#[no_mangle]
pub unsafe extern "C" fn windsim_copy_body_force(
    ptr: *const WindSimInstance,
    rank: usize,
    out: *mut f64,
    out_len: usize,
) -> WindSimErrorCode {
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling(instance, |coupling| {
            let field = coupling.body_force().ok_or_else(|| {
                DefaultWindSimError::invalid_parameter("body force requested before windsim_initialize".to_string())
            })?;
            write_part(field, rank, out, out_len)
        })
    }))
}

/// Copy the canopy drag force of one subdomain into `out`.
///
/// # Safety
/// `out` must point to `out_len` writable doubles.
#[no_mangle]
pub unsafe extern "C" fn windsim_copy_drag_force(
    ptr: *const WindSimInstance,
    rank: usize,
    out: *mut f64,
    out_len: usize,
) -> WindSimErrorCode {
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling(instance, |coupling| write_part(coupling.drag_force(), rank, out, out_len))
    }))
}

/// Number of turbines in the case.
///
/// # Safety
/// `out_count` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn windsim_turbine_count(ptr: *const WindSimInstance, out_count: *mut usize) -> WindSimErrorCode {
    if out_count.is_null() {
        return track_error(&DefaultWindSimError::null_pointer("out_count"));
    }
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling(instance, |coupling| {
            // SAFETY: checked non-null above
            unsafe {
                *out_count = coupling.turbines().len();
            }
            Ok(())
        })
    }))
}

/// State of turbine `index` (0-based, reported as `WT-{index + 1}`).
///
/// # Safety
/// `out_state` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn windsim_turbine_state(
    ptr: *const WindSimInstance,
    index: usize,
    out_state: *mut WindSimTurbineState,
) -> WindSimErrorCode {
    if out_state.is_null() {
        return track_error(&DefaultWindSimError::null_pointer("out_state"));
    }
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling(instance, |coupling| {
            let turbine = coupling.turbines().get(index).ok_or_else(|| {
                DefaultWindSimError::invalid_parameter(format!(
                    "turbine {index} out of range, {} turbines",
                    coupling.turbines().len()
                ))
            })?;
            let state = WindSimTurbineState {
                x: turbine.position.x,
                y: turbine.position.y,
                hub_height: turbine.state.hub_height,
                rank: turbine.state.rank,
                inflow_speed: turbine.state.inflow_speed,
                ct: turbine.state.ct,
                power: turbine.state.power,
                force: turbine.state.force,
            };
            // SAFETY: checked non-null above
            unsafe {
                *out_state = state;
            }
            Ok(())
        })
    }))
}

/// Interpolate the converged solution to the configured heights and write
/// the slices and final performance table.
///
/// `out_slice_count` may be null; otherwise it receives the number of
/// heights that fell inside the vertical profile.
///
/// # Safety
/// - `velocity` as in `windsim_initialize`.
/// - `pressure` must point to one buffer per subdomain of `cell_count` doubles.
#[no_mangle]
pub unsafe extern "C" fn windsim_finalize(
    ptr: *const WindSimInstance,
    velocity: *const *const f64,
    pressure: *const *const f64,
    out_slice_count: *mut usize,
) -> WindSimErrorCode {
    status(instance_from_ptr(ptr).and_then(|instance| {
        with_coupling(instance, |coupling| {
            let decomposition = coupling.decomposition();
            // SAFETY: layouts guaranteed by the caller
            let u = unsafe { read_vector_field(velocity, decomposition, "velocity") }?;
            let p = unsafe { read_scalar_field(pressure, decomposition, "pressure") }?;
            let report = coupling.finalize(&u, &p)?;
            if !out_slice_count.is_null() {
                // SAFETY: checked non-null
                unsafe {
                    *out_slice_count = report.slices.len();
                }
            }
            Ok(())
        })
    }))
}
