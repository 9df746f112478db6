use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use windsim_core::ConfigError;

/// Common interface for errors crossing the FFI boundary.
///
/// - `code()` - Returns the error code handed back to the caller
/// - `msg()` - Returns the message stored for `windsim_get_last_error`
pub(crate) trait WindSimError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> WindSimErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `WindSimError` for the common failure cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultWindSimError {
    code: WindSimErrorCode,
    msg: String,
}

impl DefaultWindSimError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: WindSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: WindSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for invalid parameter.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: WindSimErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl From<ConfigError> for DefaultWindSimError {
    fn from(error: ConfigError) -> Self {
        let code = match error {
            ConfigError::Io { .. } => WindSimErrorCode::Io,
            ConfigError::LayoutMismatch(_) => WindSimErrorCode::InvalidParameter,
            _ => WindSimErrorCode::InvalidConfig,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl WindSimError for DefaultWindSimError {
    fn code(&self) -> WindSimErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by the coupling functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindSimErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// The case directory failed validation (bad parameter, turbine type or power curve).
    InvalidConfig = 3,

    /// Invalid parameter passed to function (rank out of range, wrong buffer length).
    InvalidParameter = 4,

    /// A case file could not be read.
    Io = 5,
}

impl From<DefaultWindSimError> for WindSimErrorCode {
    fn from(error: DefaultWindSimError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (C string, error code).
    static LAST_ERROR: RefCell<(Option<CString>, WindSimErrorCode)> = const { RefCell::new((None, WindSimErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, WindSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, WindSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if no error has occurred on this thread.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that
/// sets or clears the error. **DO NOT FREE THIS POINTER**.
///
/// Example:
/// ```cpp
/// WindSimInstance* sim = nullptr;
/// WindSimErrorCode err = windsim_new("case", parts, rank_count, nullptr, &sim);
/// if (err != WindSimErrorCode::Ok) {
///     const char* error = windsim_get_last_error();
///     if (error) {
///         printf("Case setup failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn windsim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `WindSimErrorCode::Ok` (0) if no error has occurred on this thread.
#[no_mangle]
pub extern "C" fn windsim_get_last_error_code() -> WindSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
