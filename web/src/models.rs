use serde::{Deserialize, Serialize};
use vsctl::registry::types::VirtualServer;

/// Response wrapper the console expects from every mutating endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerResponse {
    pub virtual_server: VirtualServer,
}

/// Body of a status change request. Accepts the canonical status values plus
/// the console's legacy display aliases (`online`, `offline`, `deactivated`,
/// `error`).
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Aggregate counters for the console's dashboard cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub degraded: usize,
    pub maintenance: usize,
    pub total_backends: usize,
}

/// Summary returned once a configuration artifact has been generated.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedConfigResponse {
    pub filename: String,
    pub bytes: usize,
}
