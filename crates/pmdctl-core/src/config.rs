//! Centralized configuration for pmdctl.
//!
//! Well-known OS paths, telemetry socket layout, and protocol limits.

/// CPU topology sources.
pub struct TopologyConfig;

impl TopologyConfig {
    pub const PROC_STATUS_PATH: &'static str = "/proc/self/status";
    pub const CPUS_ALLOWED_FIELD: &'static str = "Cpus_allowed_list:";
    pub const SYSFS_CPU_DIR: &'static str = "/sys/devices/system/cpu";
    /// Relative to `cpu<N>/` under [`Self::SYSFS_CPU_DIR`].
    pub const SIBLINGS_FILE: &'static str = "topology/thread_siblings_list";
    /// CPU ids must be below this (the kernel's largest `NR_CPUS`).
    pub const MAX_CPUS: usize = 8192;
}

/// Telemetry socket layout and protocol limits.
pub struct TelemetryConfig;

impl TelemetryConfig {
    /// Runtime directory holding one subdirectory per engine instance (file prefix).
    pub const DEFAULT_RUNTIME_DIR: &'static str = "/var/run/dpdk";
    pub const DEFAULT_INSTANCE: &'static str = "rte";
    pub const SOCKET_NAME: &'static str = "dpdk_telemetry.v2";

    /// Upper bound for the greeting the engine sends on connect.
    pub const MAX_INIT_MESSAGE_LEN: usize = 2048;
    /// Largest `max_output_len` accepted from a greeting (16 MiB).
    pub const MAX_OUTPUT_LEN_LIMIT: usize = 16 * 1024 * 1024;

    pub const CMD_PORT_LIST: &'static str = "/ethdev/list";
    pub const CMD_PORT_INFO: &'static str = "/ethdev/info";
    pub const CMD_PORT_STATS: &'static str = "/ethdev/stats";
}
