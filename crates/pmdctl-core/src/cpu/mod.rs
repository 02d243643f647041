//! CPU topology planning.
//!
//! Decides which logical CPUs a poll-mode engine gets:
//! 1. read the process's allowed CPUs (`/proc/self/status`)
//! 2. keep one hardware thread per physical core (sysfs `thread_siblings_list`)
//! 3. reserve the lowest remaining core for management
//!
//! # Example
//!
//! ```rust,no_run
//! use pmdctl_core::cpu::{current_allowed_cpu_set, reduce_to_physical_cores, CorePlan};
//!
//! fn main() -> pmdctl_core::Result<()> {
//!     let allowed = current_allowed_cpu_set()?;
//!     let cores = reduce_to_physical_cores(&allowed)?;
//!     let plan = CorePlan::from_cores(&cores)?;
//!     println!("management core {}, engine cores {}", plan.management, plan.core_list());
//!     Ok(())
//! }
//! ```

mod cpuset;
mod plan;
mod topology;

pub use cpuset::{CpuId, CpuSet};
pub use plan::CorePlan;
pub use topology::{current_allowed_cpu_set, first_cpu, reduce_to_physical_cores, CpuTopology};
