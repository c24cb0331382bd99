//! Entity Store Port and In-Memory Implementation

use crate::record::{is_firing, EntityId, StoredAlert};
use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Alert history state of one entity as read from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub alerts: Vec<StoredAlert>,
    /// History format version
    pub version: u32,
    pub base_title: Option<String>,
    pub title: Option<String>,
}

/// Display revision requested after a history change.
///
/// Title and body rendering belong to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRevision {
    pub base_title: Option<String>,
    pub fallback_title: String,
    pub alerts: Vec<StoredAlert>,
    pub firing: bool,
    pub datacenters: Vec<String>,
}

/// Host storage for entities carrying an alert history.
///
/// Implementations must be usable from several reconciliation threads at
/// once; serialization per entity is the caller's job.
pub trait EntityStore: Send + Sync {
    /// Entities that are open and carry an alert history
    fn open_entities(&self) -> Result<Vec<EntityId>, StorageError>;

    /// Current history of one entity, `None` if it no longer exists
    fn load(&self, id: EntityId) -> Result<Option<EntitySnapshot>, StorageError>;

    /// Replace the stored history and stamp its format version
    fn save_history(
        &self,
        id: EntityId,
        alerts: &[StoredAlert],
        version: u32,
    ) -> Result<(), StorageError>;

    /// Apply a display revision
    fn revise(&self, id: EntityId, revision: &EntityRevision) -> Result<(), StorageError>;

    /// Number of open entities currently firing
    fn firing_count(&self) -> Result<usize, StorageError>;

    /// Number of open entities with an alert history
    fn open_count(&self) -> Result<usize, StorageError>;
}

/// Entity row kept by the in-memory store.
///
/// Only `alerts` is required when decoding; `firing` is derived from the
/// alerts whenever the row is inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRecord {
    pub alerts: Vec<StoredAlert>,
    pub version: u32,
    pub base_title: Option<String>,
    pub title: Option<String>,
    pub firing: bool,
    pub closed: bool,
    /// Number of revisions applied
    pub revisions: u32,
}

impl Default for EntityRecord {
    fn default() -> Self {
        Self {
            alerts: Vec::new(),
            version: 1,
            base_title: None,
            title: None,
            firing: false,
            closed: false,
            revisions: 0,
        }
    }
}

impl EntityRecord {
    /// Open entity with the given history
    pub fn open(alerts: Vec<StoredAlert>) -> Self {
        Self {
            firing: is_firing(&alerts),
            alerts,
            ..Default::default()
        }
    }

    fn is_open(&self) -> bool {
        !self.closed && !self.alerts.is_empty()
    }
}

/// Entity store held in memory
pub struct InMemoryEntityStore {
    entities: Mutex<BTreeMap<EntityId, EntityRecord>>,
}

impl InMemoryEntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        info!("Creating in-memory entity store");
        Self {
            entities: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert or replace an entity
    pub fn insert(&self, id: EntityId, mut record: EntityRecord) -> Result<(), StorageError> {
        record.firing = is_firing(&record.alerts);
        self.lock()?.insert(id, record);
        Ok(())
    }

    /// Insert every entity of a JSON object keyed by entity id
    pub fn seed_json(&self, raw: &str) -> Result<usize, StorageError> {
        let entities: BTreeMap<EntityId, EntityRecord> = serde_json::from_str(raw)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let count = entities.len();
        for (id, record) in entities {
            self.insert(id, record)?;
        }
        info!("Seeded {} entities", count);
        Ok(count)
    }

    /// Copy of an entity row
    pub fn get(&self, id: EntityId) -> Result<Option<EntityRecord>, StorageError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    /// Mark an entity closed
    pub fn close(&self, id: EntityId) -> Result<(), StorageError> {
        let mut entities = self.lock()?;
        let record = entities.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        record.closed = true;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<EntityId, EntityRecord>>, StorageError> {
        self.entities
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn open_entities(&self) -> Result<Vec<EntityId>, StorageError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, r)| r.is_open())
            .map(|(id, _)| *id)
            .collect())
    }

    fn load(&self, id: EntityId) -> Result<Option<EntitySnapshot>, StorageError> {
        Ok(self.lock()?.get(&id).map(|r| EntitySnapshot {
            id,
            alerts: r.alerts.clone(),
            version: r.version,
            base_title: r.base_title.clone(),
            title: r.title.clone(),
        }))
    }

    fn save_history(
        &self,
        id: EntityId,
        alerts: &[StoredAlert],
        version: u32,
    ) -> Result<(), StorageError> {
        let mut entities = self.lock()?;
        let record = entities.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        record.alerts = alerts.to_vec();
        record.version = version;
        debug!(entity_id = id, alerts = alerts.len(), "saved alert history");
        Ok(())
    }

    fn revise(&self, id: EntityId, revision: &EntityRevision) -> Result<(), StorageError> {
        let mut entities = self.lock()?;
        let record = entities.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        record.firing = revision.firing;
        record.revisions += 1;
        if revision.base_title.is_none() {
            record.title = Some(revision.fallback_title.clone());
        }
        debug!(entity_id = id, firing = revision.firing, "revised entity");
        Ok(())
    }

    fn firing_count(&self) -> Result<usize, StorageError> {
        Ok(self
            .lock()?
            .values()
            .filter(|r| r.is_open() && r.firing)
            .count())
    }

    fn open_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.values().filter(|r| r.is_open()).count())
    }
}
