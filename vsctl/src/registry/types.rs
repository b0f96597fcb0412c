use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Protocol mode of the front-end listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerMode {
    Http,
    Https,
}

impl ListenerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl Display for ListenerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strategy used to spread incoming connections across the backend pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceAlgorithm {
    /// Cycle through the pool in order.
    Roundrobin,
    /// Pin a client to one backend via a session cookie.
    Cookie,
}

impl BalanceAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roundrobin => "roundrobin",
            Self::Cookie => "cookie",
        }
    }
}

impl Display for BalanceAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational status of a virtual server.
///
/// This is the canonical set. The console historically used two overlapping
/// vocabularies (`online`/`offline` and `active`/`deactivated`/`error`);
/// those survive only as input aliases in [`FromStr`] and are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VsStatus {
    /// Not serving traffic.
    #[default]
    Inactive,
    /// Serving traffic.
    Active,
    /// A configuration push failed; the record needs attention.
    Degraded,
    /// Administrative override, independent of traffic.
    Maintenance,
}

impl VsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Degraded => "degraded",
            Self::Maintenance => "maintenance",
        }
    }
}

impl FromStr for VsStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inactive" | "offline" | "deactivated" => Ok(Self::Inactive),
            "active" | "online" => Ok(Self::Active),
            "degraded" | "error" => Ok(Self::Degraded),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("'{}' is not a known status (expected one of: inactive, active, degraded, maintenance)", other)),
        }
    }
}

impl Display for VsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-phase timeout budget in whole seconds.
///
/// Canonical representation is numeric; older console builds sent values like
/// `"30s"`, which the forgiving deserializers below canonicalize on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(deserialize_with = "seconds_or_string")]
    pub connect: u32,
    #[serde(deserialize_with = "seconds_or_string")]
    pub client: u32,
    #[serde(deserialize_with = "seconds_or_string")]
    pub server: u32,
    #[serde(deserialize_with = "seconds_or_string")]
    pub queue: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { connect: 5, client: 30, server: 30, queue: 30 }
    }
}

/// A virtual server: one front-end listener definition plus the pool it routes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub status: VsStatus,
    pub port: u16,
    pub mode: ListenerMode,
    pub balance: BalanceAlgorithm,
    /// Ordered `IPv4:port` endpoints; never empty once stored.
    pub backends: Vec<String>,
    pub max_conn: u32,
    pub max_queue: u32,
    pub timeouts: Timeouts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VirtualServer {
    /// Build a fresh record from a creation payload. Ids are assigned exactly
    /// once and never reused; new records always start inactive.
    pub fn from_spec(spec: VirtualServerSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: spec.name.trim().to_string(),
            status: VsStatus::Inactive,
            port: spec.port,
            mode: spec.mode,
            balance: spec.balance,
            backends: spec.backends,
            max_conn: spec.max_conn,
            max_queue: spec.max_queue,
            timeouts: spec.timeouts,
            created_at: now,
            updated_at: now,
        }
    }

    /// The definition fields of this record, without id/status bookkeeping.
    pub fn spec(&self) -> VirtualServerSpec {
        VirtualServerSpec {
            name: self.name.clone(),
            port: self.port,
            mode: self.mode,
            balance: self.balance,
            backends: self.backends.clone(),
            max_conn: self.max_conn,
            max_queue: self.max_queue,
            timeouts: self.timeouts,
        }
    }

    /// A copy of this record with the patch's provided fields applied.
    /// Timestamps are left untouched so callers can detect no-op patches.
    pub fn merged_with(&self, patch: &VirtualServerPatch) -> Self {
        let mut merged = self.clone();
        if let Some(name) = &patch.name {
            merged.name = name.trim().to_string();
        }
        if let Some(port) = patch.port {
            merged.port = port;
        }
        if let Some(mode) = patch.mode {
            merged.mode = mode;
        }
        if let Some(balance) = patch.balance {
            merged.balance = balance;
        }
        if let Some(backends) = &patch.backends {
            merged.backends = backends.clone();
        }
        if let Some(max_conn) = patch.max_conn {
            merged.max_conn = max_conn;
        }
        if let Some(max_queue) = patch.max_queue {
            merged.max_queue = max_queue;
        }
        if let Some(timeouts) = patch.timeouts {
            merged.timeouts = timeouts;
        }
        merged
    }
}

/// Creation payload: everything except the generated id and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerSpec {
    pub name: String,
    pub port: u16,
    pub mode: ListenerMode,
    pub balance: BalanceAlgorithm,
    pub backends: Vec<String>,
    pub max_conn: u32,
    pub max_queue: u32,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Partial update; only provided fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerPatch {
    pub name: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<ListenerMode>,
    pub balance: Option<BalanceAlgorithm>,
    pub backends: Option<Vec<String>>,
    pub max_conn: Option<u32>,
    pub max_queue: Option<u32>,
    pub timeouts: Option<Timeouts>,
}

// Forgiving seconds: accepts a plain number or the legacy "30s"/"30" string
// form. Values that parse to nothing become 0 and are rejected by validation,
// so the caller still gets a message naming the field.
fn seconds_or_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SecondsValue {
        Number(u32),
        Text(String),
    }

    match SecondsValue::deserialize(deserializer) {
        Ok(SecondsValue::Number(n)) => Ok(n),
        Ok(SecondsValue::Text(s)) => match s.trim().trim_end_matches('s').trim().parse::<u32>() {
            Ok(n) => Ok(n),
            Err(e) => {
                warn!("Failed to parse timeout value '{}': {}, using 0", s, e);
                Ok(0)
            }
        },
        Err(e) => {
            warn!("Failed to deserialize timeout value: {}, using 0", e);
            Ok(0)
        }
    }
}
