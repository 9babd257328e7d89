//! Observed container model
//!
//! Everything here is produced by a `RuntimeClient` call and is treated as
//! immutable afterwards. A refresh replaces the whole unit list rather than
//! patching individual snapshots.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an observed unit (container id)
pub type UnitId = String;

/// Lifecycle state as reported by the runtime
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Other(String),
}

impl UnitState {
    /// Parse the runtime's state string (`"running"`, `"exited"`, ...)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => UnitState::Created,
            "running" => UnitState::Running,
            "paused" => UnitState::Paused,
            "restarting" => UnitState::Restarting,
            "removing" => UnitState::Removing,
            "exited" => UnitState::Exited,
            "dead" => UnitState::Dead,
            other => UnitState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, UnitState::Running)
    }

    pub fn label(&self) -> &str {
        match self {
            UnitState::Created => "created",
            UnitState::Running => "running",
            UnitState::Paused => "paused",
            UnitState::Restarting => "restarting",
            UnitState::Removing => "removing",
            UnitState::Exited => "exited",
            UnitState::Dead => "dead",
            UnitState::Other(s) => s.as_str(),
        }
    }
}

impl Default for UnitState {
    fn default() -> Self {
        UnitState::Other("unknown".into())
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A published or exposed port
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    #[serde(default)]
    pub public_port: Option<u16>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".into()
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_port {
            Some(public) if public != 0 => {
                write!(f, "{}->{}/{}", public, self.private_port, self.protocol)
            }
            _ => write!(f, "{}/{}", self.private_port, self.protocol),
        }
    }
}

/// Format a port list the way the unit list shows it ("none" when empty)
pub fn format_ports(ports: &[PortMapping]) -> String {
    if ports.is_empty() {
        return "none".into();
    }
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One observed unit, as returned by a single `list_units` call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub image: String,
    /// Human status line from the runtime, e.g. "Up 3 minutes"
    pub status: String,
    pub state: UnitState,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl UnitSnapshot {
    /// First 12 characters of the id, as `docker ps` prints it
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn ports_label(&self) -> String {
        format_ports(&self.ports)
    }

    pub fn created_label(&self) -> String {
        self.created
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into())
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Resource usage for one unit at one instant
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// CPU usage as percentage of host capacity
    pub cpu_percent: f64,
    /// Memory usage as percentage of the unit's limit
    pub mem_percent: f64,
    pub mem_usage: u64,
    pub mem_limit: u64,
    pub net_rx: u64,
    pub net_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
    pub pids: u64,
}

impl UnitStats {
    pub fn mem_label(&self) -> String {
        format!(
            "{} / {}",
            format_bytes(self.mem_usage),
            format_bytes(self.mem_limit)
        )
    }

    pub fn net_label(&self) -> String {
        format!(
            "↓ {} / ↑ {}",
            format_bytes(self.net_rx),
            format_bytes(self.net_tx)
        )
    }

    pub fn block_label(&self) -> String {
        format!(
            "↓ {} / ↑ {}",
            format_bytes(self.block_read),
            format_bytes(self.block_write)
        )
    }
}

/// A mount as shown by Inspect
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInfo {
    pub source: String,
    pub destination: String,
    pub kind: String,
}

/// Structured detail returned by an Inspect call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitDetail {
    pub id: UnitId,
    pub name: String,
    pub image: String,
    pub created: String,
    pub status: String,
    pub running: bool,
    pub paused: bool,
    pub restarting: bool,
    pub pid: i64,
    pub exit_code: i64,
    pub started_at: String,
    pub finished_at: String,
    pub ip_address: String,
    pub gateway: String,
    pub mac_address: String,
    pub ports: Vec<PortMapping>,
    /// Memory limit in bytes (0 = unlimited)
    pub memory_limit: i64,
    pub cpu_shares: i64,
    pub mounts: Vec<MountInfo>,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl UnitDetail {
    /// Render as labelled sections, one display line per entry
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![
            "Basic Information".to_string(),
            format!("  ID:           {}", short_id(&self.id)),
            format!("  Name:         {}", self.name.trim_start_matches('/')),
            format!("  Image:        {}", self.image),
            format!("  Created:      {}", self.created),
            format!("  Status:       {}", self.status),
            String::new(),
            "State".to_string(),
            format!("  Running:      {}", self.running),
            format!("  Paused:       {}", self.paused),
            format!("  Restarting:   {}", self.restarting),
            format!("  PID:          {}", self.pid),
            format!("  Exit Code:    {}", self.exit_code),
            format!("  Started At:   {}", self.started_at),
            format!("  Finished At:  {}", self.finished_at),
            String::new(),
            "Network Settings".to_string(),
            format!("  IP Address:   {}", self.ip_address),
            format!("  Gateway:      {}", self.gateway),
            format!("  MAC Address:  {}", self.mac_address),
            format!("  Ports:        {}", format_ports(&self.ports)),
            String::new(),
            "Resource Limits".to_string(),
            format!("  Memory:       {} MB", self.memory_limit / 1024 / 1024),
            format!("  CPU Shares:   {}", self.cpu_shares),
            String::new(),
            "Mounts".to_string(),
        ];

        for mount in &self.mounts {
            out.push(format!(
                "  {} → {} ({})",
                mount.source, mount.destination, mount.kind
            ));
        }

        out.push(String::new());
        out.push("Environment Variables".to_string());
        out.extend(self.env.iter().map(|e| format!("  {}", e)));

        if !self.labels.is_empty() {
            out.push(String::new());
            out.push("Labels".to_string());
            out.extend(self.labels.iter().map(|(k, v)| format!("  {}: {}", k, v)));
        }

        out
    }
}

/// Format bytes with binary units and two decimals (`1.50 KB`)
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp.min(5)];
    format!("{:.2} {}B", bytes as f64 / div as f64, suffix)
}
