//! Error types for the Stratum renderer
//!
//! This module defines the error type shared by the rendering core and its
//! backends, plus the `engine_err!` / `engine_bail!` helpers and the
//! pool-growth retry used by descriptor allocation.

use std::fmt;

/// Result type for Stratum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stratum renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (a native call returned an unexpected code)
    BackendError(String),

    /// Out of GPU or host memory
    OutOfMemory,

    /// Invalid resource (unknown handle, out-of-range index, wrong state)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, render passes)
    InitializationFailed(String),

    /// Invalid configuration (bad render mask, empty capability lists, bad config values)
    ConfigurationError(String),

    /// The device was lost or stopped responding
    DeviceLost(String),

    /// A fixed-size pool ran out of entries
    PoolExhausted(String),
}

impl Error {
    /// Whether the error ends the render loop
    ///
    /// Every error except `PoolExhausted` is fatal for the frame loop:
    /// pool exhaustion is recovered by growing the pool and retrying once.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::PoolExhausted(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::PoolExhausted(msg) => write!(f, "Pool exhausted: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Run `allocate`, and if it fails with `PoolExhausted`, call `grow` once and retry
///
/// Any other error is returned unchanged. A second exhaustion after growing is
/// escalated to a fatal `BackendError`.
pub fn retry_with_fresh_pool<S, T>(
    state: &mut S,
    mut allocate: impl FnMut(&mut S) -> Result<T>,
    grow: impl FnOnce(&mut S) -> Result<()>,
) -> Result<T> {
    match allocate(state) {
        Err(Error::PoolExhausted(msg)) => {
            crate::engine_debug!("stratum::Pool", "Pool exhausted ({}), growing and retrying", msg);
            grow(state)?;
            allocate(state).map_err(|e| match e {
                Error::PoolExhausted(msg) => {
                    Error::BackendError(format!("Pool still exhausted after growing: {}", msg))
                }
                other => other,
            })
        }
        other => other,
    }
}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` from it
///
/// # Example
///
/// ```no_run
/// use stratum_engine::engine_err;
///
/// let err = engine_err!("stratum::vulkan", "vkQueueSubmit failed: {}", -4);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::stratum::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
///
/// # Example
///
/// ```no_run
/// use stratum_engine::engine_bail;
///
/// fn check(count: u32) -> stratum_engine::stratum::Result<()> {
///     if count == 0 {
///         engine_bail!("stratum::Presenter", "Swapchain returned no images");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
