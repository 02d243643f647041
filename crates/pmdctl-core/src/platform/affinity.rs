//! Scheduler affinity of the calling thread.
//!
//! # Platform Behavior
//! - **Linux**: `sched_setaffinity(0, ...)` / `sched_getaffinity(0)` via `nix`
//! - **Other**: returns [`PmdError::Affinity`]

use crate::cpu::{CpuId, CpuSet};
use crate::error::{PmdError, Result};
use tracing::debug;

/// Restrict the calling thread to a single CPU.
///
/// Threads spawned afterwards inherit the mask, so calling this early in
/// `main` pins the whole control plane.
pub fn pin_current_thread(cpu: CpuId) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        use nix::sched::{sched_setaffinity, CpuSet as NixCpuSet};
        use nix::unistd::Pid;

        let mut mask = NixCpuSet::new();
        mask.set(cpu).map_err(|e| PmdError::Affinity {
            cpu,
            message: e.to_string(),
        })?;
        sched_setaffinity(Pid::from_raw(0), &mask).map_err(|e| PmdError::Affinity {
            cpu,
            message: e.to_string(),
        })?;

        debug!("Pinned current thread to CPU {}", cpu);
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(PmdError::Affinity {
            cpu,
            message: format!(
                "CPU affinity is not supported on {}",
                super::current_platform()
            ),
        })
    }
}

/// CPUs the calling thread may currently run on.
pub fn current_affinity() -> Result<CpuSet> {
    #[cfg(target_os = "linux")]
    {
        use nix::sched::{sched_getaffinity, CpuSet as NixCpuSet};
        use nix::unistd::Pid;

        let mask = sched_getaffinity(Pid::from_raw(0)).map_err(|e| PmdError::EnvironmentRead {
            path: "sched_getaffinity".into(),
            message: e.to_string(),
            source: None,
        })?;

        Ok((0..NixCpuSet::count())
            .filter(|&cpu| mask.is_set(cpu).unwrap_or(false))
            .collect())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(PmdError::EnvironmentRead {
            path: "sched_getaffinity".into(),
            message: format!(
                "CPU affinity is not supported on {}",
                super::current_platform()
            ),
            source: None,
        })
    }
}
