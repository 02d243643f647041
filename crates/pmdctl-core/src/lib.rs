//! pmdctl Core - control plane for a CPU-pinned DPDK poll-mode engine.
//!
//! Two independent pieces:
//! - [`cpu`] picks physical cores for the engine's polling threads and
//!   reserves one for management, never counting SMT siblings twice.
//! - [`telemetry`] talks to a running engine over its telemetry socket and
//!   returns port lists, link info, and packet counters.
//!
//! Everything here is blocking and keeps no background state. Callers that
//! need deadlines wrap calls themselves (the `pmdctl` binary runs them on
//! `spawn_blocking` under a tokio timeout).
//!
//! # Example
//!
//! ```rust,no_run
//! use pmdctl_core::{CorePlan, CpuTopology, TelemetryClient};
//!
//! fn main() -> pmdctl_core::Result<()> {
//!     let plan = CorePlan::detect(&CpuTopology::system())?;
//!     println!("launch with -l {}", plan.core_list());
//!
//!     let client = TelemetryClient::for_instance("rte");
//!     println!("ports: {:?}", client.list_ports()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cpu;
pub mod error;
pub mod platform;
pub mod telemetry;

// Re-export commonly used types
pub use config::{TelemetryConfig, TopologyConfig};
pub use cpu::{CorePlan, CpuId, CpuSet, CpuTopology};
pub use error::{ErrorCategory, PmdError, Result};
pub use telemetry::{
    discover_instances, EngineInstance, PortId, PortInfo, PortMac, PortStats, TelemetryClient,
};
