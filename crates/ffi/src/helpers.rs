use crate::error::{with_last_error_mut, DefaultWindSimError, WindSimError, WindSimErrorCode};
use crate::instance::WindSimInstance;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use windsim_core::{DecomposedField, Decomposition, ScalarField, SourceTermCoupling, Vec3, VectorField};

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl WindSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = WindSimErrorCode::Ok;
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl WindSimError) -> WindSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, or clear the last error on success.
pub(crate) fn track_result<T>(result: Result<T, DefaultWindSimError>) -> Result<T, WindSimErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(e) => Err(track_error(&e)),
    }
}

/// Collapse a unit result into the code returned across the boundary.
pub(crate) fn status(result: Result<(), DefaultWindSimError>) -> WindSimErrorCode {
    match track_result(result) {
        Ok(()) => WindSimErrorCode::Ok,
        Err(code) => code,
    }
}

/// Borrow an instance from a raw pointer.
pub(crate) fn instance_from_ptr<'a>(ptr: *const WindSimInstance) -> Result<&'a WindSimInstance, DefaultWindSimError> {
    // SAFETY: caller guarantees `ptr` came from `windsim_new` and is still live
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultWindSimError::null_pointer("ptr"))
}

/// Run `f` under the instance's read lock.
pub(crate) fn with_coupling<F, T>(instance: &WindSimInstance, f: F) -> Result<T, DefaultWindSimError>
where
    F: FnOnce(&SourceTermCoupling) -> Result<T, DefaultWindSimError>,
{
    let coupling = instance
        .coupling
        .read()
        .map_err(|_| DefaultWindSimError::lock_poisoned("RwLock"))?;
    f(&coupling)
}

/// Run `f` under the instance's write lock.
pub(crate) fn with_coupling_mut<F, T>(instance: &WindSimInstance, f: F) -> Result<T, DefaultWindSimError>
where
    F: FnOnce(&mut SourceTermCoupling) -> Result<T, DefaultWindSimError>,
{
    let mut coupling = instance
        .coupling
        .write()
        .map_err(|_| DefaultWindSimError::lock_poisoned("RwLock"))?;
    f(&mut coupling)
}

/// Read an optional null-terminated path.
pub(crate) fn path_from_cstr(ptr: *const c_char, name: &str) -> Result<Option<PathBuf>, DefaultWindSimError> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null, caller guarantees a null-terminated string
    let text = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| DefaultWindSimError::invalid_parameter(format!("{name} is not valid UTF-8")))?;
    Ok(Some(PathBuf::from(text)))
}

/// Copy `count` packed xyz triples.
///
/// # Safety
/// `data` must point to `3 * count` readable doubles when `count > 0`.
pub(crate) unsafe fn read_points(data: *const f64, count: usize, name: &str) -> Result<Vec<Vec3>, DefaultWindSimError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if data.is_null() {
        return Err(DefaultWindSimError::null_pointer(name));
    }
    let len = count
        .checked_mul(3)
        .ok_or_else(|| DefaultWindSimError::invalid_parameter(format!("{name}: {count} points overflow")))?;
    // SAFETY: non-null, length guaranteed by the caller
    let values = unsafe { std::slice::from_raw_parts(data, len) };
    Ok(values.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect())
}

/// Copy one packed xyz buffer per subdomain into a vector field.
///
/// # Safety
/// `parts` must point to `rank_count` pointers, each to `3 * cells` doubles.
pub(crate) unsafe fn read_vector_field(
    parts: *const *const f64,
    decomposition: &Decomposition,
    name: &str,
) -> Result<VectorField, DefaultWindSimError> {
    if parts.is_null() {
        return Err(DefaultWindSimError::null_pointer(name));
    }
    // SAFETY: one pointer per subdomain, guaranteed by the caller
    let pointers = unsafe { std::slice::from_raw_parts(parts, decomposition.rank_count()) };
    let parts = pointers
        .iter()
        .zip(decomposition.subdomains())
        .map(|(&data, sub)| unsafe { read_points(data, sub.cell_count(), name) })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecomposedField::from_parts(parts))
}

/// Copy one scalar buffer per subdomain.
///
/// # Safety
/// `parts` must point to `rank_count` pointers, each to `cells` doubles.
pub(crate) unsafe fn read_scalar_field(
    parts: *const *const f64,
    decomposition: &Decomposition,
    name: &str,
) -> Result<ScalarField, DefaultWindSimError> {
    if parts.is_null() {
        return Err(DefaultWindSimError::null_pointer(name));
    }
    // SAFETY: one pointer per subdomain, guaranteed by the caller
    let pointers = unsafe { std::slice::from_raw_parts(parts, decomposition.rank_count()) };
    let parts = pointers
        .iter()
        .zip(decomposition.subdomains())
        .map(|(&data, sub)| {
            let n = sub.cell_count();
            if n == 0 {
                Ok(Vec::new())
            } else if data.is_null() {
                Err(DefaultWindSimError::null_pointer(name))
            } else {
                // SAFETY: non-null, length guaranteed by the caller
                Ok(unsafe { std::slice::from_raw_parts(data, n) }.to_vec())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecomposedField::from_parts(parts))
}

/// Write one subdomain of a vector field as packed xyz triples.
pub(crate) fn write_part(
    field: &VectorField,
    rank: usize,
    out: *mut f64,
    out_len: usize,
) -> Result<(), DefaultWindSimError> {
    if rank >= field.rank_count() {
        return Err(DefaultWindSimError::invalid_parameter(format!(
            "rank {rank} out of range, {} subdomains",
            field.rank_count()
        )));
    }
    let part = field.part(rank);
    if out_len != 3 * part.len() {
        return Err(DefaultWindSimError::invalid_parameter(format!(
            "rank {rank} needs {} values, buffer holds {out_len}",
            3 * part.len()
        )));
    }
    if part.is_empty() {
        return Ok(());
    }
    if out.is_null() {
        return Err(DefaultWindSimError::null_pointer("out"));
    }
    // SAFETY: non-null, caller provides `out_len` writable doubles
    let out = unsafe { std::slice::from_raw_parts_mut(out, out_len) };
    for (dst, v) in out.chunks_exact_mut(3).zip(part) {
        dst.copy_from_slice(&[v.x, v.y, v.z]);
    }
    Ok(())
}
