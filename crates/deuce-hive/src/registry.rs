use crate::coordinator::{CoordinatorSettings, MatchHandle};
use crate::store::{Store, StoreError};
use deuce_core::protocol::ScoreUpdate;
use deuce_core::types::MatchId;
use deuce_core::{Command, EngineError, MatchLog, ScoringError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Maps match ids to running coordinators, spawning them on first use.
#[derive(Clone)]
pub struct Registry {
    store: Store,
    settings: CoordinatorSettings,
    handles: Arc<Mutex<HashMap<MatchId, MatchHandle>>>,
}

impl Registry {
    pub fn new(store: Store, settings: CoordinatorSettings) -> Self {
        Self {
            store,
            settings,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persists a new match and starts its coordinator.
    pub async fn create(&self, log: MatchLog) -> Result<MatchHandle, EngineError> {
        self.store.create(&log).await.map_err(store_error)?;
        let id = log.record.id.clone();
        let handle = MatchHandle::spawn(log, self.store.clone(), self.settings);
        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_closed());
        handles.insert(id.clone(), handle.clone());
        info!("🎾 Match {} created", id);
        Ok(handle)
    }

    /// Returns the live coordinator, loading the match from the store if no
    /// running one exists.
    pub async fn get(&self, id: &MatchId) -> Result<MatchHandle, EngineError> {
        if let Some(h) = self.running(id).await {
            return Ok(h);
        }

        let log = self.store.load(id).await.map_err(store_error)?;

        let mut handles = self.handles.lock().await;
        // Another caller may have spawned one while the store was read.
        if let Some(h) = handles.get(id).filter(|h| !h.is_closed()) {
            return Ok(h.clone());
        }
        handles.retain(|_, h| !h.is_closed());
        let handle = MatchHandle::spawn(log, self.store.clone(), self.settings);
        info!("🔄 Coordinator spawned for {}", handle.id());
        handles.insert(id.clone(), handle.clone());
        Ok(handle)
    }

    /// Submits through the running coordinator. A coordinator that stopped
    /// between lookup and send never saw the command, so it is sent once more
    /// to a fresh one.
    pub async fn submit(
        &self,
        id: &MatchId,
        command: Command,
        expected_version: Option<u64>,
    ) -> Result<ScoreUpdate, EngineError> {
        let handle = self.get(id).await?;
        match handle.submit(command.clone(), expected_version).await {
            Err(EngineError::Unavailable(_)) if handle.is_closed() => {
                self.get(id).await?.submit(command, expected_version).await
            }
            other => other,
        }
    }

    /// Current log of a match, with the same retry as [`Registry::submit`].
    pub async fn snapshot(&self, id: &MatchId) -> Result<MatchLog, EngineError> {
        let handle = self.get(id).await?;
        match handle.snapshot().await {
            Err(EngineError::Unavailable(_)) if handle.is_closed() => {
                self.get(id).await?.snapshot().await
            }
            other => other,
        }
    }

    async fn running(&self, id: &MatchId) -> Option<MatchHandle> {
        let handles = self.handles.lock().await;
        handles.get(id).filter(|h| !h.is_closed()).cloned()
    }

    /// Running coordinators. Stopped ones are forgotten here.
    pub async fn tracked(&self) -> usize {
        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_closed());
        handles.len()
    }

    /// Drains every coordinator.
    pub async fn shutdown(&self) {
        let handles: Vec<MatchHandle> = self
            .handles
            .lock()
            .await
            .drain()
            .map(|(_, h)| h)
            .collect();
        info!("🛑 Shutting down {} coordinators...", handles.len());
        for h in handles {
            h.shutdown().await;
        }
    }
}

fn store_error(e: StoreError) -> EngineError {
    match e {
        StoreError::NotFound(id) => EngineError::NotFound(id),
        StoreError::Duplicate(id) => ScoringError::DuplicateMatch(id).into(),
        StoreError::Conflict { expected, actual } => EngineError::Concurrency { expected, actual },
        other => EngineError::Persistence(other.to_string()),
    }
}
