//! CPU topology planner.
//!
//! Reads the allowed-CPU mask of the current process and collapses SMT
//! siblings so that each physical core is represented by one logical CPU.
//!
//! Nothing is cached: every call re-reads procfs and sysfs.

use super::cpuset::{CpuId, CpuSet};
use crate::config::TopologyConfig;
use crate::error::{PmdError, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Topology sources rooted at configurable paths.
///
/// [`CpuTopology::system`] points at the live `/proc` and `/sys` files; tests
/// and containers with relocated mounts use [`CpuTopology::with_roots`].
#[derive(Debug, Clone)]
pub struct CpuTopology {
    proc_status_path: PathBuf,
    sysfs_cpu_dir: PathBuf,
}

impl Default for CpuTopology {
    fn default() -> Self {
        Self::system()
    }
}

impl CpuTopology {
    pub fn system() -> Self {
        Self::with_roots(TopologyConfig::PROC_STATUS_PATH, TopologyConfig::SYSFS_CPU_DIR)
    }

    pub fn with_roots(
        proc_status_path: impl Into<PathBuf>,
        sysfs_cpu_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            proc_status_path: proc_status_path.into(),
            sysfs_cpu_dir: sysfs_cpu_dir.into(),
        }
    }

    /// Read `Cpus_allowed_list` of the calling process.
    pub fn current_allowed_cpu_set(&self) -> Result<CpuSet> {
        let path = &self.proc_status_path;
        let content = std::fs::read_to_string(path).map_err(|e| PmdError::EnvironmentRead {
            path: path.clone(),
            message: e.to_string(),
            source: Some(e),
        })?;

        let list = content
            .lines()
            .find_map(|line| line.strip_prefix(TopologyConfig::CPUS_ALLOWED_FIELD))
            .ok_or_else(|| PmdError::EnvironmentRead {
                path: path.clone(),
                message: format!("no {} field", TopologyConfig::CPUS_ALLOWED_FIELD),
                source: None,
            })?;

        let set = CpuSet::parse(list).map_err(|e| PmdError::EnvironmentRead {
            path: path.clone(),
            message: e.to_string(),
            source: None,
        })?;

        debug!("Allowed CPUs: {}", set);
        Ok(set)
    }

    /// Path of the sibling list for `cpu`.
    pub fn siblings_path(&self, cpu: CpuId) -> PathBuf {
        self.sysfs_cpu_dir
            .join(format!("cpu{}", cpu))
            .join(TopologyConfig::SIBLINGS_FILE)
    }

    /// Hardware threads sharing a physical core with `cpu`, `cpu` included.
    pub fn sibling_group(&self, cpu: CpuId) -> Result<CpuSet> {
        let path = self.siblings_path(cpu);
        let content = std::fs::read_to_string(&path).map_err(|e| PmdError::TopologyRead {
            cpu,
            path: path.clone(),
            message: e.to_string(),
            source: Some(e),
        })?;

        let mut group = CpuSet::parse(&content).map_err(|e| PmdError::TopologyRead {
            cpu,
            path: path.clone(),
            message: e.to_string(),
            source: None,
        })?;
        group.insert(cpu);
        Ok(group)
    }

    /// Keep one logical CPU per physical core.
    ///
    /// CPUs are visited in ascending order, so the representative of each core
    /// is its lowest allowed sibling. Any unreadable sibling list fails the
    /// whole call.
    pub fn reduce_to_physical_cores(&self, set: &CpuSet) -> Result<CpuSet> {
        let mut seen: HashSet<CpuId> = HashSet::with_capacity(set.len());
        let mut cores = CpuSet::new();

        for cpu in set.iter() {
            if seen.contains(&cpu) {
                continue;
            }
            let group = self.sibling_group(cpu)?;
            cores.insert(cpu);
            seen.extend(group.iter());
        }

        info!("CPU list after removing siblings: {}", cores);
        Ok(cores)
    }
}

/// Lowest member of a non-empty set.
pub fn first_cpu(set: &CpuSet) -> Result<CpuId> {
    set.first().ok_or(PmdError::EmptySet)
}

/// [`CpuTopology::current_allowed_cpu_set`] on the live system.
pub fn current_allowed_cpu_set() -> Result<CpuSet> {
    CpuTopology::system().current_allowed_cpu_set()
}

/// [`CpuTopology::reduce_to_physical_cores`] on the live system.
pub fn reduce_to_physical_cores(set: &CpuSet) -> Result<CpuSet> {
    CpuTopology::system().reduce_to_physical_cores(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Lay out `cpu<N>/topology/thread_siblings_list` for each entry.
    fn fake_sysfs(groups: &[(CpuId, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (cpu, siblings) in groups {
            let topo = dir.path().join(format!("cpu{}", cpu)).join("topology");
            std::fs::create_dir_all(&topo).unwrap();
            std::fs::write(topo.join("thread_siblings_list"), format!("{}\n", siblings)).unwrap();
        }
        dir
    }

    fn fake_status(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("status");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_current_allowed_cpu_set_reads_field() {
        let dir = TempDir::new().unwrap();
        let status = fake_status(
            &dir,
            "Name:\ttestpmd\nCpus_allowed:\tff\nCpus_allowed_list:\t2-5,8\nMems_allowed_list:\t0\n",
        );
        let topo = CpuTopology::with_roots(status, dir.path());

        let set = topo.current_allowed_cpu_set().unwrap();
        assert_eq!(set.to_vec(), vec![2, 3, 4, 5, 8]);
    }

    #[test]
    fn test_current_allowed_cpu_set_missing_field() {
        let dir = TempDir::new().unwrap();
        let status = fake_status(&dir, "Name:\ttestpmd\nCpus_allowed:\tff\n");
        let topo = CpuTopology::with_roots(status, dir.path());

        let err = topo.current_allowed_cpu_set().unwrap_err();
        assert!(matches!(err, PmdError::EnvironmentRead { source: None, .. }));
    }

    #[test]
    fn test_current_allowed_cpu_set_unparsable_field() {
        let dir = TempDir::new().unwrap();
        let status = fake_status(&dir, "Cpus_allowed_list:\t3-1\n");
        let topo = CpuTopology::with_roots(status, dir.path());

        let err = topo.current_allowed_cpu_set().unwrap_err();
        assert!(matches!(err, PmdError::EnvironmentRead { .. }));
    }

    #[test]
    fn test_current_allowed_cpu_set_huge_range() {
        let dir = TempDir::new().unwrap();
        let status = fake_status(&dir, "Cpus_allowed_list:\t0-18446744073709551615\n");
        let topo = CpuTopology::with_roots(status, dir.path());

        let err = topo.current_allowed_cpu_set().unwrap_err();
        assert!(matches!(err, PmdError::EnvironmentRead { source: None, .. }));
    }

    #[test]
    fn test_current_allowed_cpu_set_unreadable() {
        let dir = TempDir::new().unwrap();
        let topo = CpuTopology::with_roots(dir.path().join("missing"), dir.path());

        let err = topo.current_allowed_cpu_set().unwrap_err();
        assert!(matches!(err, PmdError::EnvironmentRead { source: Some(_), .. }));
    }

    #[test]
    fn test_reduce_keeps_lowest_sibling() {
        // 4 cores, 2 threads each: N and N+4 are siblings
        let sysfs = fake_sysfs(&[
            (0, "0,4"),
            (1, "1,5"),
            (2, "2,6"),
            (3, "3,7"),
            (4, "0,4"),
            (5, "1,5"),
            (6, "2,6"),
            (7, "3,7"),
        ]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let allowed = CpuSet::parse("0-7").unwrap();
        let cores = topo.reduce_to_physical_cores(&allowed).unwrap();
        assert_eq!(cores.to_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reduce_sibling_outside_allowed_set() {
        let sysfs = fake_sysfs(&[(2, "2,6"), (3, "3,7"), (6, "2,6")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        // 7 is not allowed, so 3 stays as the representative of its core
        let allowed = CpuSet::parse("2-3,6").unwrap();
        let cores = topo.reduce_to_physical_cores(&allowed).unwrap();
        assert_eq!(cores.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_reduce_without_smt_is_identity() {
        let sysfs = fake_sysfs(&[(0, "0"), (1, "1"), (2, "2")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let allowed = CpuSet::parse("0-2").unwrap();
        assert_eq!(topo.reduce_to_physical_cores(&allowed).unwrap(), allowed);
    }

    #[test]
    fn test_reduce_fails_on_missing_topology() {
        let sysfs = fake_sysfs(&[(0, "0,2")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let allowed = CpuSet::parse("0-1").unwrap();
        let err = topo.reduce_to_physical_cores(&allowed).unwrap_err();
        match err {
            PmdError::TopologyRead { cpu, .. } => assert_eq!(cpu, 1),
            other => panic!("Expected TopologyRead, got: {:?}", other),
        }
    }

    #[test]
    fn test_reduce_fails_on_garbage_topology() {
        let sysfs = fake_sysfs(&[(0, "zero")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let err = topo
            .reduce_to_physical_cores(&CpuSet::from_iter([0]))
            .unwrap_err();
        assert!(matches!(err, PmdError::TopologyRead { cpu: 0, source: None, .. }));
    }

    #[test]
    fn test_reduce_fails_on_huge_sibling_range() {
        let sysfs = fake_sysfs(&[(0, "0-18446744073709551615")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let err = topo
            .reduce_to_physical_cores(&CpuSet::from_iter([0]))
            .unwrap_err();
        assert!(matches!(err, PmdError::TopologyRead { cpu: 0, source: None, .. }));
    }

    #[test]
    fn test_reduce_skipped_siblings_are_not_read() {
        // cpu1 has no topology file, but it is a sibling of cpu0 and never visited
        let sysfs = fake_sysfs(&[(0, "0-1")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        let cores = topo
            .reduce_to_physical_cores(&CpuSet::parse("0-1").unwrap())
            .unwrap();
        assert_eq!(cores.to_vec(), vec![0]);
        assert!(!topo.siblings_path(1).exists());
    }

    #[test]
    fn test_sibling_group_includes_self() {
        let sysfs = fake_sysfs(&[(3, "7")]);
        let topo = CpuTopology::with_roots("/nonexistent", sysfs.path());

        assert_eq!(topo.sibling_group(3).unwrap().to_vec(), vec![3, 7]);
    }

    #[test]
    fn test_first_cpu() {
        assert_eq!(first_cpu(&CpuSet::parse("5,3,9").unwrap()).unwrap(), 3);
        assert!(matches!(first_cpu(&CpuSet::new()), Err(PmdError::EmptySet)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_live_allowed_cpu_set_is_not_empty() {
        let set = current_allowed_cpu_set().unwrap();
        assert!(!set.is_empty());
    }
}
