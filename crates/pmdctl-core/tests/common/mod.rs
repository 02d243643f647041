//! Shared fixtures for integration tests.

#![allow(dead_code)]

use socket2::{Domain, SockAddr, Socket, Type};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const GREETING: &str = r#"{"version":"DPDK 23.11.0","pid":4242,"max_output_len":16384}"#;

/// Scripted telemetry peer listening on a `SOCK_SEQPACKET` socket.
///
/// Each accepted connection gets the greeting, then one command. The reply
/// function returns the bytes to send back, or `None` to hang up without
/// answering. An empty greeting hangs up right after accept.
pub struct FakeEngine {
    _dir: TempDir,
    socket_path: PathBuf,
    commands: Arc<Mutex<Vec<String>>>,
    hang_ups: Receiver<()>,
}

impl FakeEngine {
    pub fn start<F>(greeting: &str, reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + 'static,
    {
        Self::spawn(greeting, false, reply)
    }

    /// Peer that greets and then closes the connection without reading.
    pub fn greet_then_hang_up(greeting: &str) -> Self {
        Self::spawn(greeting, true, |_| None)
    }

    fn spawn<F>(greeting: &str, hang_up_after_greeting: bool, reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + 'static,
    {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("dpdk_telemetry.v2");

        let listener = Socket::new(Domain::UNIX, Type::SEQPACKET, None).unwrap();
        listener.bind(&SockAddr::unix(&socket_path).unwrap()).unwrap();
        listener.listen(8).unwrap();

        let commands = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&commands);
        let greeting = greeting.as_bytes().to_vec();
        let (hung_up, hang_ups) = mpsc::channel();

        std::thread::spawn(move || loop {
            let Ok((mut conn, _)) = listener.accept() else {
                return;
            };
            if greeting.is_empty() || conn.write_all(&greeting).is_err() {
                continue;
            }
            if hang_up_after_greeting {
                drop(conn);
                let _ = hung_up.send(());
                continue;
            }

            let mut buf = [0u8; 4096];
            let Ok(read) = conn.read(&mut buf) else {
                continue;
            };
            if read == 0 {
                continue;
            }
            let command = String::from_utf8_lossy(&buf[..read]).into_owned();
            seen.lock().unwrap().push(command.clone());

            if let Some(body) = reply(&command) {
                let _ = conn.write_all(body.as_bytes());
            }
        });

        Self {
            _dir: dir,
            socket_path,
            commands,
            hang_ups,
        }
    }

    /// Block until the peer has closed one connection after greeting it.
    pub fn wait_for_hang_up(&self) {
        self.hang_ups
            .recv_timeout(Duration::from_secs(5))
            .expect("peer did not hang up");
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Commands received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

/// Fake `/sys/devices/system/cpu` plus a `/proc/self/status` with the given
/// allowed list. `groups` maps each CPU to its sibling list.
pub fn fake_host(allowed: &str, groups: &[(usize, &str)]) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();

    let sysfs = dir.path().join("cpu");
    for (cpu, siblings) in groups {
        let topology = sysfs.join(format!("cpu{}", cpu)).join("topology");
        std::fs::create_dir_all(&topology).unwrap();
        std::fs::write(topology.join("thread_siblings_list"), format!("{}\n", siblings)).unwrap();
    }

    let status = dir.path().join("status");
    std::fs::write(
        &status,
        format!(
            "Name:\tpmdctl\nState:\tR (running)\nCpus_allowed:\tff\n\
             Cpus_allowed_list:\t{}\nMems_allowed_list:\t0\n",
            allowed
        ),
    )
    .unwrap();

    (dir, status, sysfs)
}
