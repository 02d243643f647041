//! Blocking client for the engine's telemetry socket.
//!
//! A [`TelemetrySession`] is one connection: it is opened and greeted in
//! [`TelemetrySession::connect`], carries exactly one command in
//! [`TelemetrySession::issue`], and is closed when `issue` returns. The
//! engine serves each accepted connection on its own thread, so a fresh
//! connection per command keeps nothing open between calls.
//!
//! [`TelemetryClient`] only remembers where the socket lives and opens a
//! session per call, so it can be cloned and shared across threads.

use super::protocol::{extract_value, InitMessage};
use crate::config::TelemetryConfig;
use crate::error::{PmdError, Result};
use serde_json::Value;
use socket2::{Domain, SockAddr, Socket, Type};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One connected, greeted telemetry connection.
#[derive(Debug)]
pub struct TelemetrySession {
    socket: Socket,
    path: PathBuf,
    init: InitMessage,
}

impl TelemetrySession {
    /// Connect to `path` and consume the engine's greeting.
    ///
    /// On any failure the partially opened socket is dropped and no session
    /// is returned.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut socket = open_seqpacket(&path).map_err(|e| PmdError::Connection {
            path: path.clone(),
            source: e,
        })?;
        debug!("Connected to telemetry socket {}", path.display());

        let init = read_greeting(&mut socket, &path)?;
        debug!(
            "Telemetry handshake done (version {:?}, pid {}, max_output_len {})",
            init.version, init.pid, init.max_output_len
        );

        Ok(Self { socket, path, init })
    }

    /// Send `command` and return the raw response bytes.
    ///
    /// Consumes the session; the connection is closed on every exit path.
    pub fn issue(mut self, command: &str) -> Result<Vec<u8>> {
        let written = self
            .socket
            .write(command.as_bytes())
            .map_err(|e| PmdError::Write {
                command: command.to_string(),
                message: e.to_string(),
                source: Some(e),
            })?;
        if written != command.len() {
            return Err(PmdError::Write {
                command: command.to_string(),
                message: format!("wrote {} of {} bytes", written, command.len()),
                source: None,
            });
        }

        let mut buf = vec![0u8; self.init.max_output_len];
        let read = self.socket.read(&mut buf).map_err(|e| PmdError::Read {
            command: command.to_string(),
            source: e,
        })?;
        if read == 0 {
            return Err(PmdError::EmptyResponse {
                command: command.to_string(),
            });
        }
        buf.truncate(read);

        debug!(
            "Command '{}' on {} returned {} bytes",
            command,
            self.path.display(),
            read
        );
        Ok(buf)
    }
}

fn open_seqpacket(path: &Path) -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::UNIX, Type::SEQPACKET, None)?;
    socket.connect(&SockAddr::unix(path)?)?;
    Ok(socket)
}

fn read_greeting(socket: &mut Socket, path: &Path) -> Result<InitMessage> {
    let mut buf = [0u8; TelemetryConfig::MAX_INIT_MESSAGE_LEN];
    let read = socket.read(&mut buf).map_err(|e| PmdError::Handshake {
        path: path.to_path_buf(),
        message: format!("failed to read init message: {}", e),
    })?;

    InitMessage::parse(&buf[..read]).map_err(|message| PmdError::Handshake {
        path: path.to_path_buf(),
        message,
    })
}

/// Handle to one engine instance's telemetry socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryClient {
    socket_path: PathBuf,
}

impl TelemetryClient {
    /// Client for `instance` under the default runtime directory.
    pub fn for_instance(instance: &str) -> Self {
        Self::with_runtime_dir(TelemetryConfig::DEFAULT_RUNTIME_DIR, instance)
    }

    /// Client for `<runtime_dir>/<instance>/dpdk_telemetry.v2`.
    pub fn with_runtime_dir(runtime_dir: impl AsRef<Path>, instance: &str) -> Self {
        Self::with_socket_path(
            runtime_dir
                .as_ref()
                .join(instance)
                .join(TelemetryConfig::SOCKET_NAME),
        )
    }

    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Open and greet a new session.
    pub fn connect(&self) -> Result<TelemetrySession> {
        TelemetrySession::connect(&self.socket_path)
    }

    /// Run one command on a fresh session and return the raw response.
    pub fn issue_command(&self, command: &str) -> Result<Vec<u8>> {
        debug!("Issuing telemetry command '{}'", command);
        self.connect()?.issue(command)
    }

    /// Run one command and return the value under its path token.
    pub fn query_command(&self, command: &str) -> Result<Value> {
        let response = self.issue_command(command)?;
        extract_value(command, &response)
    }
}

impl Default for TelemetryClient {
    fn default() -> Self {
        Self::for_instance(TelemetryConfig::DEFAULT_INSTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_socket_path_layout() {
        let client = TelemetryClient::with_runtime_dir("/run/engine", "fwd0");
        assert_eq!(
            client.socket_path(),
            Path::new("/run/engine/fwd0/dpdk_telemetry.v2")
        );
    }

    #[test]
    fn test_default_client_path() {
        let client = TelemetryClient::default();
        assert_eq!(
            client.socket_path(),
            Path::new("/var/run/dpdk/rte/dpdk_telemetry.v2")
        );
    }

    #[test]
    fn test_connect_missing_socket_fails() {
        let temp_dir = TempDir::new().unwrap();
        let client = TelemetryClient::with_socket_path(temp_dir.path().join("absent.sock"));

        let err = client.issue_command("/ethdev/list").unwrap_err();
        match err {
            PmdError::Connection { path, .. } => assert_eq!(path, client.socket_path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
