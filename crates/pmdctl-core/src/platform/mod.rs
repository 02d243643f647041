//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here rather than being
//! scattered through the planner and telemetry code.
//!
//! - `affinity` - pin the calling thread to a CPU, read the current mask
//!
//! # Supported Platforms
//!
//! - **Linux**: Full support
//! - **Others**: Telemetry only; affinity calls return an error

pub mod affinity;

pub use affinity::{current_affinity, pin_current_thread};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        "unknown"
    }
}
