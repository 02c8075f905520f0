use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::builder::{self, ExpansionState, MindMapGraph, MindMapNode};
use crate::error::{MindMapError, Result};
use crate::ingest::IngestionAdapter;

/// One upload's worth of state: the ingestion adapter for its exchange,
/// the expansion flags, and the last clicked node. A new upload gets a
/// fresh session; nothing persists across sessions.
pub struct MapSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// SHA-256 fingerprint of the uploaded document.
    pub fingerprint: String,
    pub adapter: IngestionAdapter,
    expansion: RwLock<ExpansionState>,
    selected: RwLock<Option<MindMapNode>>,
}

impl MapSession {
    pub fn create(fingerprint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            fingerprint: fingerprint.into(),
            adapter: IngestionAdapter::new(),
            expansion: RwLock::new(ExpansionState::new()),
            selected: RwLock::new(None),
        })
    }

    pub fn expansion(&self) -> ExpansionState {
        self.expansion.read().unwrap().clone()
    }

    pub fn selected(&self) -> Option<MindMapNode> {
        self.selected.read().unwrap().clone()
    }

    /// Rebuild the positioned graph from the current extraction and
    /// expansion state.
    pub fn graph(&self) -> MindMapGraph {
        builder::build(&self.adapter.current(), &self.expansion())
    }

    /// Route a click: record the selection, toggle when the node has
    /// children, and return the clicked node's data. `None` for ids not in
    /// the current tree.
    ///
    /// The expansion write lock is held across the whole read-modify-write
    /// so concurrent clicks serialize instead of overwriting each other's
    /// toggles.
    pub fn click(&self, node_id: &str) -> Option<MindMapNode> {
        let tree = builder::assemble(&self.adapter.current())?;
        let mut expansion = self.expansion.write().unwrap();
        let outcome = builder::dispatch_click(&tree, &expansion, node_id)?;
        *expansion = outcome.expansion;
        drop(expansion);
        let selected = outcome.selected;
        *self.selected.write().unwrap() = Some(selected.clone());
        Some(selected)
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Arc<MapSession>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Arc<MapSession>>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Fetch a session, failing with `SessionNotFound` when the id is unknown.
pub async fn require_session(
    storage: &dyn SessionStorage,
    id: &str,
) -> Result<Arc<MapSession>> {
    storage
        .get(id)
        .await?
        .ok_or_else(|| MindMapError::SessionNotFound(id.to_string()))
}

/// How long a session stays retrievable after its upload.
pub const SESSION_TTL_HOURS: i64 = 24;

/// In-memory implementation of SessionStorage.
///
/// Sessions expire after a TTL so the map does not grow for the process
/// lifetime: an expired entry is dropped on the read that finds it, and
/// every save sweeps whatever else has aged out.
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Arc<MapSession>>>,
    ttl: Duration,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Arc<MapSession>) -> Result<()> {
        let now = Utc::now();
        self.sessions.retain(|_, s| now - s.created_at <= self.ttl);
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<MapSession>>> {
        let expired = match self.sessions.get(id) {
            Some(entry) => {
                if Utc::now() - entry.created_at <= self.ttl {
                    return Ok(Some(entry.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.sessions.remove(id);
        }
        Ok(None)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
