//! Element-wise `pow` over two `f64` arrays on an OpenCL GPU.
//!
//! The crate picks a platform and a GPU device, builds a one-line kernel,
//! dispatches it once and reads the result back. Selection logic lives in
//! [`select`] and is pure over descriptor lists, so it can be tested without
//! hardware; everything that touches the runtime goes through `opencl3`.

// ─── Feature modules ──────────────────────────────────────────────────
#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::{record, summary, BYTES_MOVED};

pub mod app;
pub mod buffer;
pub mod kernel;
pub mod report;
pub mod run;
pub mod select;
pub mod version;

pub use buffer::{DeviceArray, EventGuard, InFlight, Queued, Ready, State};
pub use run::{PowJob, RunConfig};
pub use select::{DeviceCandidate, PlatformCandidate, SelectError};
pub use version::ClVersion;

// ─── Error type ───────────────────────────────────────────────────────
#[derive(thiserror::Error, Debug)]
pub enum ClError {
    #[error("OpenCL error code {0}")]
    Api(i32),
    #[error("CL program compilation error ({code})")]
    Build { code: i32, log: String },
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),
    #[error("Host length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ClError {
    /// Process exit code: 1 for runtime failures, 2 for domain failures.
    /// Panics are mapped to 3 by [`app::launch`].
    pub fn exit_code(&self) -> u8 {
        match self {
            ClError::Api(_) | ClError::Build { .. } => 1,
            ClError::Select(_) | ClError::InvalidSize(_) | ClError::LengthMismatch { .. } => 2,
        }
    }

    /// Numeric OpenCL status, if this error came from the runtime.
    pub fn code(&self) -> Option<i32> {
        match self {
            ClError::Api(code) | ClError::Build { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<opencl3::error_codes::ClError> for ClError {
    fn from(err: opencl3::error_codes::ClError) -> Self {
        ClError::Api(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        assert_eq!(ClError::Api(-5).exit_code(), 1);
        assert_eq!(ClError::Build { code: -11, log: String::new() }.exit_code(), 1);
        assert_eq!(ClError::Select(SelectError::NoPlatforms).exit_code(), 2);
        assert_eq!(ClError::Select(SelectError::NoDevice).exit_code(), 2);
        assert_eq!(ClError::InvalidSize(0).exit_code(), 2);
    }

    #[test]
    fn runtime_errors_keep_their_code() {
        let err: ClError = opencl3::error_codes::ClError(-34).into();
        assert_eq!(err.code(), Some(-34));
        assert_eq!(err.to_string(), "OpenCL error code -34");
        assert_eq!(ClError::Select(SelectError::NoDevice).code(), None);
    }

    #[test]
    fn select_errors_display_transparently() {
        let err = ClError::from(SelectError::NoQualifyingPlatform);
        assert_eq!(err.to_string(), "OpenCL 1.2 platform is not found.");
    }
}
