//! Fatal policy violations.
//!
//! Two error classes are distinguished throughout this crate, matching the
//! allocator it models: a recoverable allocation failure (the underlying
//! storage allocator returned null) is surfaced as `None` from `allocate`
//! and `resize` and is not an error type at all. A fatal policy violation
//! — edge-allocation failure, a forbidden null argument, `unref` with no
//! matching edge, re-entrant destruction — is a programmer error that this
//! module reports and then aborts the process over, rather than unwinding
//! into a graph that is known to be inconsistent.

use core::fmt;

/// Diagnostic describing the fatal policy violation that caused
/// [`fatal`] to abort the process.
///
/// Constructing a `FatalError` never fails and carries no allocation; it
/// exists to give the log line (and, on `std`, `Error::source`-style
/// chains built by callers who intercept panics from [`fatal`]'s
/// non-`std` fallback) a structured shape instead of a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalError {
    message: &'static str,
}

impl FatalError {
    #[inline]
    const fn new(message: &'static str) -> Self {
        Self { message }
    }

    /// The static diagnostic message describing the violation.
    #[inline]
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "burrow: fatal policy violation: {}", self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FatalError {}

/// Log `message` at `error` level and abort the process.
///
/// This never returns. It is used exclusively for the fatal class of
/// error in spec: an edge allocation failing (the graph cannot be left
/// half-attached), `unref` being asked to remove an edge that does not
/// exist, or a null argument where the contract forbids one. These are
/// programmer errors, not conditions a caller can recover from, so this
/// mirrors the `abort()`-on-overflow pattern already used for strong/weak
/// count bookkeeping elsewhere in this crate rather than threading a
/// `Result` through every call site for conditions that are never meant
/// to occur in correct programs.
#[cold]
#[track_caller]
pub(crate) fn fatal(message: &'static str) -> ! {
    let err = FatalError::new(message);
    error!("{err}");
    #[cfg(feature = "std")]
    {
        std::process::abort();
    }
    #[cfg(not(feature = "std"))]
    {
        // No portable process-abort primitive is available without `std`.
        // Panicking is a degraded fallback: it unwinds rather than aborting
        // outright, but it still stops forward progress instead of running
        // further operations against a graph known to be inconsistent.
        panic!("{err}");
    }
}
