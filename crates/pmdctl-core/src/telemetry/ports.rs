//! Ethernet port queries and typed records.
//!
//! Records are extracted field by field from the engine's loosely typed JSON.
//! A field that is missing or has the wrong JSON type rejects the whole record
//! with [`PmdError::DataValidity`]; nothing is defaulted.

use super::client::TelemetryClient;
use super::protocol::with_param;
use crate::config::TelemetryConfig;
use crate::error::{PmdError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Ethernet port identifier as assigned by the engine.
pub type PortId = u16;

/// Link-level description of one port (`/ethdev/info`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub port_id: PortId,
    pub name: String,
    pub state: i64,
    pub mac_addr: String,
    /// -1 when the device is not bound to a NUMA node.
    pub numa_node: i64,
    pub mtu: u64,
    pub promiscuous: i64,
}

impl PortInfo {
    pub fn from_value(value: &Value) -> Result<Self> {
        let record = Record::new("port info", value)?;
        Ok(Self {
            port_id: record.port_id("port_id")?,
            name: record.string("name")?,
            state: record.i64("state")?,
            mac_addr: record.string("mac_addr")?,
            numa_node: record.i64("numa_node")?,
            mtu: record.u64("mtu")?,
            promiscuous: record.i64("promiscuous")?,
        })
    }
}

/// Packet counters of one port (`/ethdev/stats`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStats {
    /// Port as it appeared in the command parameter.
    #[serde(rename = "port_id")]
    pub port: String,
    pub ipackets: u64,
    pub opackets: u64,
    pub imissed: u64,
}

impl PortStats {
    /// The engine's stats object does not repeat the port id, so the caller
    /// passes the one it asked for.
    pub fn from_value(port: impl Into<String>, value: &Value) -> Result<Self> {
        let record = Record::new("port stats", value)?;
        Ok(Self {
            port: port.into(),
            ipackets: record.u64("ipackets")?,
            opackets: record.u64("opackets")?,
            imissed: record.u64("imissed")?,
        })
    }
}

/// MAC address of one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMac {
    #[serde(rename = "port_id")]
    pub port: String,
    #[serde(rename = "mac_address")]
    pub mac: String,
}

impl PortMac {
    pub fn from_value(port: impl Into<String>, value: &Value) -> Result<Self> {
        let record = Record::new("port info", value)?;
        Ok(Self {
            port: port.into(),
            mac: record.string("mac_addr")?,
        })
    }
}

/// Type-checked field access over one JSON object.
struct Record<'a> {
    kind: &'static str,
    fields: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    fn new(kind: &'static str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { kind, fields }),
            other => Err(PmdError::invalid_field(
                kind,
                "<root>",
                format!("expected object, got {}", json_type(other)),
            )),
        }
    }

    fn field(&self, name: &str) -> Result<&'a Value> {
        self.fields
            .get(name)
            .ok_or_else(|| PmdError::invalid_field(self.kind, name, "is missing"))
    }

    fn mistyped(&self, name: &str, expected: &str, got: &Value) -> PmdError {
        PmdError::invalid_field(
            self.kind,
            name,
            format!("expected {}, got {}", expected, json_type(got)),
        )
    }

    fn string(&self, name: &str) -> Result<String> {
        let value = self.field(name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mistyped(name, "string", value))
    }

    fn u64(&self, name: &str) -> Result<u64> {
        let value = self.field(name)?;
        value
            .as_u64()
            .ok_or_else(|| self.mistyped(name, "unsigned integer", value))
    }

    fn i64(&self, name: &str) -> Result<i64> {
        let value = self.field(name)?;
        value
            .as_i64()
            .ok_or_else(|| self.mistyped(name, "integer", value))
    }

    fn port_id(&self, name: &str) -> Result<PortId> {
        let value = self.field(name)?;
        value
            .as_u64()
            .and_then(|id| PortId::try_from(id).ok())
            .ok_or_else(|| self.mistyped(name, "port id", value))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert the `/ethdev/list` value into port ids.
///
/// Elements that are not port ids are logged and skipped; anything other than
/// an array fails.
pub fn parse_port_list(value: &Value) -> Result<Vec<PortId>> {
    let items = value.as_array().ok_or_else(|| {
        PmdError::invalid_field(
            "port list",
            TelemetryConfig::CMD_PORT_LIST,
            format!("expected array, got {}", json_type(value)),
        )
    })?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let port = item.as_u64().and_then(|id| PortId::try_from(id).ok());
            if port.is_none() {
                warn!("Skipping invalid port list entry: {}", item);
            }
            port
        })
        .collect())
}

impl TelemetryClient {
    /// Port ids the engine currently knows.
    pub fn list_ports(&self) -> Result<Vec<PortId>> {
        let value = self.query_command(TelemetryConfig::CMD_PORT_LIST)?;
        parse_port_list(&value)
    }

    /// Run `<command_path>,<port>` and return its value.
    pub fn fetch_per_port(&self, command_path: &str, port: PortId) -> Result<Value> {
        self.query_command(&with_param(command_path, port))
    }

    /// Run `command_path` for every listed port in ascending order.
    ///
    /// Fails as a whole if any single port fails.
    pub fn fetch_all_ports(&self, command_path: &str) -> Result<Vec<Value>> {
        Ok(self
            .fetch_all_ports_with_ids(command_path)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    fn fetch_all_ports_with_ids(&self, command_path: &str) -> Result<Vec<(PortId, Value)>> {
        let mut ports = self.list_ports()?;
        ports.sort_unstable();
        ports.dedup();
        debug!("Querying '{}' for ports {:?}", command_path, ports);

        ports
            .into_iter()
            .map(|port| Ok((port, self.fetch_per_port(command_path, port)?)))
            .collect()
    }

    pub fn port_info(&self, port: PortId) -> Result<PortInfo> {
        PortInfo::from_value(&self.fetch_per_port(TelemetryConfig::CMD_PORT_INFO, port)?)
    }

    pub fn ports_info(&self) -> Result<Vec<PortInfo>> {
        self.fetch_all_ports(TelemetryConfig::CMD_PORT_INFO)?
            .iter()
            .map(PortInfo::from_value)
            .collect()
    }

    pub fn port_stats(&self, port: PortId) -> Result<PortStats> {
        let value = self.fetch_per_port(TelemetryConfig::CMD_PORT_STATS, port)?;
        PortStats::from_value(port.to_string(), &value)
    }

    pub fn ports_stats(&self) -> Result<Vec<PortStats>> {
        self.fetch_all_ports_with_ids(TelemetryConfig::CMD_PORT_STATS)?
            .iter()
            .map(|(port, value)| PortStats::from_value(port.to_string(), value))
            .collect()
    }

    pub fn port_mac(&self, port: PortId) -> Result<PortMac> {
        let value = self.fetch_per_port(TelemetryConfig::CMD_PORT_INFO, port)?;
        PortMac::from_value(port.to_string(), &value)
    }
}
