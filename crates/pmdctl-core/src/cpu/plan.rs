//! Split of physical cores between the control plane and the engine.

use super::cpuset::{CpuId, CpuSet};
use super::topology::{first_cpu, CpuTopology};
use crate::error::Result;
use serde::Serialize;

/// Management core plus the cores left for the engine's polling threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorePlan {
    /// Reserved for the control plane and the engine's main lcore.
    pub management: CpuId,
    /// Remaining physical cores, ascending.
    pub data_plane: Vec<CpuId>,
}

impl CorePlan {
    /// Build a plan from an already reduced core set.
    pub fn from_cores(cores: &CpuSet) -> Result<Self> {
        let management = first_cpu(cores)?;
        let data_plane = cores.iter().filter(|&cpu| cpu != management).collect();
        Ok(Self {
            management,
            data_plane,
        })
    }

    /// Read the allowed set, drop SMT siblings, and split the result.
    pub fn detect(topology: &CpuTopology) -> Result<Self> {
        let allowed = topology.current_allowed_cpu_set()?;
        let cores = topology.reduce_to_physical_cores(&allowed)?;
        Self::from_cores(&cores)
    }

    /// All planned cores, management first.
    pub fn cores(&self) -> impl Iterator<Item = CpuId> + '_ {
        std::iter::once(self.management).chain(self.data_plane.iter().copied())
    }

    /// Comma-separated core list for the engine's `-l` launch argument.
    pub fn core_list(&self) -> String {
        self.cores()
            .map(|cpu| cpu.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
