//! Error types for pmdctl.
//!
//! Every failure the planner or the telemetry client can hit is a variant of
//! [`PmdError`]. Variants carry the CPU id, path, or command that failed so the
//! caller can report it without extra bookkeeping.

use crate::cpu::CpuId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pmdctl.
#[derive(Debug, Error)]
pub enum PmdError {
    // Topology planner errors
    #[error("Failed to read allowed CPUs from {path:?}: {message}")]
    EnvironmentRead {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("CPU set is empty")]
    EmptySet,

    #[error("Failed to read sibling list of CPU {cpu} at {path:?}: {message}")]
    TopologyRead {
        cpu: CpuId,
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid CPU list {input:?}: {message}")]
    InvalidCpuList { input: String, message: String },

    #[error("Failed to pin to CPU {cpu}: {message}")]
    Affinity { cpu: CpuId, message: String },

    // Telemetry errors
    #[error("Failed to connect to telemetry socket {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry handshake with {path:?} failed: {message}")]
    Handshake { path: PathBuf, message: String },

    #[error("Failed to send '{command}' command: {message}")]
    Write {
        command: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to read response of '{command}' command: {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Got empty response during execution of '{command}' command")]
    EmptyResponse { command: String },

    #[error("Failed to parse JSON response of '{command}' command: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Got empty JSON value for '{command}' command")]
    EmptyValue { command: String },

    #[error("Invalid {record} data: field '{field}' {message}")]
    DataValidity {
        record: String,
        field: String,
        message: String,
    },
}

/// Result type alias for pmdctl operations.
pub type Result<T> = std::result::Result<T, PmdError>;

/// Coarse grouping of errors for callers that map failures to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The host environment (procfs, sysfs, scheduler) could not be used.
    Environment,
    /// The telemetry socket could not be reached or stopped responding.
    Transport,
    /// The engine answered, but not in the telemetry protocol.
    Protocol,
    /// The engine answered with well-formed JSON that lacks required fields.
    InvalidData,
}

impl ErrorCategory {
    /// Process exit status used by the `pmdctl` binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::Environment => 2,
            ErrorCategory::Transport => 3,
            ErrorCategory::Protocol => 4,
            ErrorCategory::InvalidData => 5,
        }
    }
}

impl PmdError {
    /// Group this error for response mapping.
    ///
    /// A REST facade answers `Transport` and `Protocol` with "telemetry not
    /// working" and `InvalidData` with "invalid data".
    pub fn category(&self) -> ErrorCategory {
        match self {
            PmdError::EnvironmentRead { .. }
            | PmdError::EmptySet
            | PmdError::TopologyRead { .. }
            | PmdError::InvalidCpuList { .. }
            | PmdError::Affinity { .. } => ErrorCategory::Environment,

            PmdError::Connection { .. }
            | PmdError::Write { .. }
            | PmdError::Read { .. }
            | PmdError::EmptyResponse { .. } => ErrorCategory::Transport,

            PmdError::Handshake { .. } | PmdError::Parse { .. } | PmdError::EmptyValue { .. } => {
                ErrorCategory::Protocol
            }

            PmdError::DataValidity { .. } => ErrorCategory::InvalidData,
        }
    }

    /// Build a `DataValidity` error for `record.field`.
    pub fn invalid_field(
        record: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PmdError::DataValidity {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}
