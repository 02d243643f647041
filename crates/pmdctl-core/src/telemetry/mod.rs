//! Client for the engine's telemetry socket.
//!
//! - `protocol` - greeting, command syntax, envelope extraction
//! - `client` - single-command sessions over `SOCK_SEQPACKET`
//! - `ports` - port list, per-port queries, typed port records
//! - `discovery` - engine instances under a runtime directory
//!
//! # Example
//!
//! ```rust,no_run
//! use pmdctl_core::telemetry::TelemetryClient;
//!
//! fn main() -> pmdctl_core::Result<()> {
//!     let client = TelemetryClient::for_instance("rte");
//!     for stats in client.ports_stats()? {
//!         println!("port {}: rx {} tx {}", stats.port, stats.ipackets, stats.opackets);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod discovery;
pub mod ports;
pub mod protocol;

pub use client::{TelemetryClient, TelemetrySession};
pub use discovery::{discover_instances, EngineInstance};
pub use ports::{parse_port_list, PortId, PortInfo, PortMac, PortStats};
pub use protocol::InitMessage;
