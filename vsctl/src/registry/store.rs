use crate::error::{Error, Result, Violation};
use crate::registry::types::{VirtualServer, VirtualServerPatch, VirtualServerSpec, VsStatus};
use crate::registry::validator::check_definition;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Durable store of virtual server definitions.
///
/// Records live in memory behind a single writer lock and are snapshotted to a
/// pretty-printed JSON file after every successful mutation. While the process
/// runs, the in-memory map is the source of truth; the file exists so a
/// restart picks up where the previous instance left off.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    servers: Arc<RwLock<HashMap<Uuid, VirtualServer>>>,
}

impl Registry {
    /// Create an empty registry that will persist to the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), servers: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Load the registry file. A missing file starts an empty registry; an
    /// unreadable one is moved aside as a backup so nothing is overwritten.
    pub async fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading registry from: {}", path.display());
        let registry = Self::new(path);

        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            match serde_json::from_str::<Vec<VirtualServer>>(&content) {
                Ok(records) => {
                    let mut servers = registry.servers.write().await;
                    for record in records {
                        servers.insert(record.id, record);
                    }
                    info!("Loaded {} virtual servers from {}", servers.len(), path.display());
                }
                Err(e) => {
                    error!("Failed to parse registry file: {}", e);
                    let mut attempt = 1;
                    let mut backup_path = path.with_extension(format!("corrupted.{}", attempt));
                    while backup_path.exists() {
                        attempt += 1;
                        backup_path = path.with_extension(format!("corrupted.{}", attempt));
                    }
                    std::fs::rename(path, &backup_path)?;
                    warn!("Registry file corrupted, moved to {} and starting empty", backup_path.display());
                }
            }
        } else {
            warn!("Registry file not found, starting empty");
        }

        Ok(registry)
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    /// Validate a definition, assign it a fresh id and store it inactive.
    /// Every violated field is reported, not just the first.
    pub async fn create(&self, spec: VirtualServerSpec) -> Result<VirtualServer> {
        let mut violations = check_definition(&spec);
        let record = VirtualServer::from_spec(spec);

        let snapshot = {
            let mut servers = self.servers.write().await;
            if name_taken(&servers, &record.name, None) {
                violations.push(Violation::new("name", format!("Name already in use: {}", record.name)));
            }
            if !violations.is_empty() {
                return Err(Error::Validation { violations });
            }
            servers.insert(record.id, record.clone());
            sorted_snapshot(&servers)
        };
        self.persist(&snapshot).await?;

        info!("Created virtual server: {} ({})", record.name, record.id);
        Ok(record)
    }

    /// Fetch a copy of one record.
    pub async fn get(&self, id: Uuid) -> Result<VirtualServer> {
        self.servers.read().await.get(&id).cloned().ok_or(Error::NotFound(id))
    }

    /// Copies of all records, sorted by creation time then name.
    pub async fn list(&self) -> Vec<VirtualServer> {
        let servers = self.servers.read().await;
        sorted_snapshot(&servers)
    }

    pub async fn count(&self) -> usize {
        self.servers.read().await.len()
    }

    /// Apply a partial update, re-validating the merged definition before it
    /// replaces the stored one. A patch that changes nothing returns the
    /// current record untouched, timestamps included.
    pub async fn update(&self, id: Uuid, patch: VirtualServerPatch) -> Result<VirtualServer> {
        let (record, snapshot) = {
            let mut servers = self.servers.write().await;
            let current = servers.get(&id).ok_or(Error::NotFound(id))?;

            let mut merged = current.merged_with(&patch);
            if merged == *current {
                debug!("Update for {} contains no changes", id);
                return Ok(current.clone());
            }

            let mut violations = check_definition(&merged.spec());
            if name_taken(&servers, &merged.name, Some(id)) {
                violations.push(Violation::new("name", format!("Name already in use: {}", merged.name)));
            }
            if !violations.is_empty() {
                return Err(Error::Validation { violations });
            }

            merged.updated_at = Utc::now();
            servers.insert(id, merged.clone());
            (merged, sorted_snapshot(&servers))
        };
        self.persist(&snapshot).await?;

        info!("Updated virtual server: {} ({})", record.name, record.id);
        Ok(record)
    }

    /// Remove a record. Anything that may still be routing traffic goes
    /// through the lifecycle controller, which stops traffic before calling
    /// this; the registry itself only guards existence.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let snapshot = {
            let mut servers = self.servers.write().await;
            if servers.remove(&id).is_none() {
                return Err(Error::NotFound(id));
            }
            sorted_snapshot(&servers)
        };
        self.persist(&snapshot).await?;

        info!("Deleted virtual server: {}", id);
        Ok(())
    }

    /// Status flips are reserved for the lifecycle controller; nothing else
    /// may touch the status field.
    pub(crate) async fn set_status(&self, id: Uuid, status: VsStatus) -> Result<VirtualServer> {
        let (record, snapshot) = {
            let mut servers = self.servers.write().await;
            let record = servers.get_mut(&id).ok_or(Error::NotFound(id))?;
            record.status = status;
            record.updated_at = Utc::now();
            let record = record.clone();
            (record, sorted_snapshot(&servers))
        };
        self.persist(&snapshot).await?;

        debug!("Status of {} is now {}", record.name, record.status);
        Ok(record)
    }

    async fn persist(&self, snapshot: &[VirtualServer]) -> Result<()> {
        debug!("Saving registry to: {}", self.path.display());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

fn sorted_snapshot(servers: &HashMap<Uuid, VirtualServer>) -> Vec<VirtualServer> {
    let mut snapshot: Vec<VirtualServer> = servers.values().cloned().collect();
    snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
    snapshot
}

fn name_taken(servers: &HashMap<Uuid, VirtualServer>, name: &str, exclude: Option<Uuid>) -> bool {
    let name = name.trim();
    servers.values().any(|s| Some(s.id) != exclude && s.name == name)
}
