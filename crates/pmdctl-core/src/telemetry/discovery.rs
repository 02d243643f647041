//! Find engine instances under a runtime directory.
//!
//! Every instance gets `<runtime_dir>/<file-prefix>/` and creates its
//! telemetry socket inside it.

use super::client::TelemetryClient;
use crate::config::TelemetryConfig;
use crate::error::{PmdError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A running (or recently running) engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInstance {
    pub name: String,
    pub socket_path: PathBuf,
}

impl EngineInstance {
    pub fn client(&self) -> TelemetryClient {
        TelemetryClient::with_socket_path(&self.socket_path)
    }
}

/// Instances under `runtime_dir` that expose a telemetry socket, sorted by name.
///
/// A stale socket left by a crashed engine is still listed; connecting to it
/// fails with a connection error.
pub fn discover_instances(runtime_dir: impl AsRef<Path>) -> Result<Vec<EngineInstance>> {
    let runtime_dir = runtime_dir.as_ref();
    let read_error = |e: std::io::Error| PmdError::EnvironmentRead {
        path: runtime_dir.to_path_buf(),
        message: e.to_string(),
        source: Some(e),
    };

    let mut instances = Vec::new();
    for entry in std::fs::read_dir(runtime_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.path().is_dir() {
            continue;
        }

        let socket_path = entry.path().join(TelemetryConfig::SOCKET_NAME);
        if !socket_path.exists() {
            continue;
        }

        instances.push(EngineInstance {
            name: entry.file_name().to_string_lossy().into_owned(),
            socket_path,
        });
    }

    instances.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(
        "Found {} engine instance(s) under {}",
        instances.len(),
        runtime_dir.display()
    );
    Ok(instances)
}
