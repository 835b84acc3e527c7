//! One task per live match.
//!
//! The task owns the match's `MatchLog` outright. Commands arrive over a
//! bounded channel and are applied strictly in arrival order: reduce, persist,
//! then publish. A command that fails at any step leaves the owned log as it
//! was and is never published.
//!
//! Once the match is completed or cancelled the task stops taking new
//! envelopes, answers what is already queued and exits. Idle tasks do the
//! same after `idle_timeout`.

use crate::store::{Commit, Store, StoreError};
use chrono::Utc;
use deuce_core::protocol::ScoreUpdate;
use deuce_core::types::MatchId;
use deuce_core::{apply, Command, EngineError, MatchLog};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    /// Commands buffered per match before submitters wait.
    pub queue_depth: usize,
    /// Updates a slow subscriber may fall behind before frames are skipped.
    pub live_buffer: usize,
    /// A coordinator with no commands and no live subscribers for this long
    /// stops; the registry reloads it from the store on next use.
    pub idle_timeout: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            live_buffer: 128,
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

enum Envelope {
    Submit {
        command: Command,
        expected_version: Option<u64>,
        reply: Reply<Result<ScoreUpdate, EngineError>>,
    },
    Snapshot(Reply<MatchLog>),
    Shutdown(Reply<()>),
}

/// Cheap, cloneable handle to a running coordinator.
#[derive(Clone)]
pub struct MatchHandle {
    id: MatchId,
    sender: mpsc::Sender<Envelope>,
    live: broadcast::Sender<ScoreUpdate>,
}

impl MatchHandle {
    pub fn spawn(log: MatchLog, store: Store, settings: CoordinatorSettings) -> Self {
        let id = log.record.id.clone();
        let (tx, mut rx) = mpsc::channel(settings.queue_depth.max(1));
        let (live, _) = broadcast::channel(settings.live_buffer.max(1));

        let mut coordinator = Coordinator {
            log,
            store,
            live: live.clone(),
        };

        tokio::spawn(async move {
            let mut shutdown_signal: Option<Reply<()>> = None;

            loop {
                let next = match settings.idle_timeout {
                    Some(idle) => match tokio::time::timeout(idle, rx.recv()).await {
                        Ok(next) => next,
                        Err(_) => {
                            if coordinator.live.receiver_count() == 0 {
                                info!("💤 Coordinator for {} idle", coordinator.log.record.id);
                                // Anything already queued is still answered.
                                rx.close();
                            }
                            continue;
                        }
                    },
                    None => rx.recv().await,
                };
                let Some(msg) = next else { break };

                match msg {
                    Envelope::Submit {
                        command,
                        expected_version,
                        reply,
                    } => {
                        let result = coordinator.handle(command, expected_version).await;
                        if coordinator.log.record.status.is_terminal() {
                            rx.close();
                        }
                        let _ = reply.send(result);
                    }
                    Envelope::Snapshot(reply) => {
                        if coordinator.log.record.status.is_terminal() {
                            rx.close();
                        }
                        let _ = reply.send(coordinator.log.clone());
                    }
                    Envelope::Shutdown(signal) => {
                        shutdown_signal = Some(signal);
                        break;
                    }
                }
            }

            drop(rx);
            info!(
                "🛑 Coordinator for {} stopped at v{}",
                coordinator.log.record.id, coordinator.log.record.version
            );
            if let Some(s) = shutdown_signal {
                let _ = s.send(());
            }
        });

        Self {
            id,
            sender: tx,
            live,
        }
    }

    pub fn id(&self) -> &MatchId {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn submit(
        &self,
        command: Command,
        expected_version: Option<u64>,
    ) -> Result<ScoreUpdate, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Envelope::Submit {
                command,
                expected_version,
                reply,
            })
            .await
            .map_err(|_| EngineError::Unavailable(self.id.clone()))?;
        rx.await
            .map_err(|_| EngineError::Unavailable(self.id.clone()))?
    }

    /// The log as of every command accepted before this call.
    pub async fn snapshot(&self) -> Result<MatchLog, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Envelope::Snapshot(reply))
            .await
            .map_err(|_| EngineError::Unavailable(self.id.clone()))?;
        rx.await
            .map_err(|_| EngineError::Unavailable(self.id.clone()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScoreUpdate> {
        self.live.subscribe()
    }

    /// Processes everything already queued, then stops the task.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Envelope::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

struct Coordinator {
    log: MatchLog,
    store: Store,
    live: broadcast::Sender<ScoreUpdate>,
}

impl Coordinator {
    async fn handle(
        &mut self,
        command: Command,
        expected_version: Option<u64>,
    ) -> Result<ScoreUpdate, EngineError> {
        let id = self.log.record.id.clone();
        let current = self.log.record.version;

        if let Some(expected) = expected_version {
            if expected != current {
                warn!(
                    "⚠️  {} rejected for {}: stale v{} (now v{})",
                    command.label(),
                    id,
                    expected,
                    current
                );
                return Err(EngineError::Concurrency {
                    expected,
                    actual: current,
                });
            }
        }

        let transition = apply(&self.log, &command, Utc::now()).inspect_err(|e| {
            warn!("⚠️  {} rejected for {}: {}", command.label(), id, e);
        })?;

        let commit = Commit {
            record: transition.log.record.clone(),
            expected_version: current,
            change: transition.change.clone(),
        };
        if let Err(e) = self.store.save(&commit).await {
            error!("❌ Failed to persist {} for {}: {}", transition.action, id, e);
            return Err(self.persistence_failure(e).await);
        }

        let update = transition.update();
        if transition.completed_match() {
            info!(
                "🏆 Match {} completed, winner {}",
                id,
                update.winner_id.as_ref().map_or("-", |w| w.as_str())
            );
        }
        self.log = transition.log;

        // No subscribers is not an error.
        let _ = self.live.send(update.clone());
        Ok(update)
    }

    /// Maps a store failure to the caller-facing error. A version conflict
    /// means another writer moved the row, so the owned log is reloaded.
    async fn persistence_failure(&mut self, e: StoreError) -> EngineError {
        match e {
            StoreError::Conflict { expected, actual } => {
                let id = self.log.record.id.clone();
                match self.store.load(&id).await {
                    Ok(fresh) => self.log = fresh,
                    Err(reload) => error!("❌ Reload after conflict failed: {}", reload),
                }
                EngineError::Concurrency { expected, actual }
            }
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Persistence(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use deuce_core::types::{MatchStatus, PointType, Players};
    use deuce_core::MatchSetup;

    fn point(who: &str) -> Command {
        Command::AwardPoint {
            winning_player_id: who.into(),
            point_type: PointType::Normal,
        }
    }

    async fn spawn_with(store: Store) -> MatchHandle {
        spawn_with_settings(store, CoordinatorSettings::default()).await
    }

    async fn spawn_with_settings(store: Store, settings: CoordinatorSettings) -> MatchHandle {
        let record = MatchSetup::builder()
            .id("m1")
            .players(Players::new("a", "b"))
            .build()
            .create()
            .unwrap();
        let log = MatchLog::new(record);
        store.create(&log).await.unwrap();
        MatchHandle::spawn(log, store, settings)
    }

    #[tokio::test]
    async fn subscribers_see_every_accepted_command() {
        let handle = spawn_with(Store::memory()).await;
        let mut rx = handle.subscribe();

        handle.submit(Command::Start, None).await.unwrap();
        handle.submit(point("a"), Some(1)).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.status, MatchStatus::InProgress);
        assert_eq!(first.version, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.score.current_game.display_pair().0, "15");
    }

    #[tokio::test]
    async fn rejected_commands_are_not_broadcast() {
        let handle = spawn_with(Store::memory()).await;
        let mut rx = handle.subscribe();

        let err = handle.submit(point("a"), None).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = handle.submit(Command::Start, Some(7)).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Concurrency {
                expected: 7,
                actual: 0
            }
        );

        let nothing = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(nothing.is_err());
        assert_eq!(handle.snapshot().await.unwrap().record.version, 0);
    }

    #[tokio::test]
    async fn persistence_failure_discards_the_new_state() {
        let memory = MemoryStore::default();
        let store = Store::Memory(memory.clone());
        let handle = spawn_with(store.clone()).await;
        handle.submit(Command::Start, None).await.unwrap();

        let mut rx = handle.subscribe();
        memory.fail_next_saves(1);
        let err = handle.submit(point("b"), Some(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        assert!(err.is_retryable());

        let log = handle.snapshot().await.unwrap();
        assert_eq!(log.record.version, 1);
        assert_eq!(log.history.len(), 1);
        assert!(rx.try_recv().is_err());

        // Same command again succeeds.
        let update = handle.submit(point("b"), Some(1)).await.unwrap();
        assert_eq!(update.version, 2);
        assert_eq!(store.load(&"m1".into()).await.unwrap().record.version, 2);
    }

    #[tokio::test]
    async fn concurrent_submitters_are_serialised() {
        let handle = spawn_with(Store::memory()).await;
        handle.submit(Command::Start, None).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let h = handle.clone();
                let who = if i % 2 == 0 { "a" } else { "b" };
                tokio::spawn(async move { h.submit(point(who), None).await })
            })
            .collect();

        let mut versions = Vec::new();
        for t in tasks {
            versions.push(t.await.unwrap().unwrap().version);
        }
        versions.sort_unstable();
        assert_eq!(versions, (2..=21).collect::<Vec<u64>>());

        let log = handle.snapshot().await.unwrap();
        assert_eq!(log.history.len(), 21);
        assert_eq!(log.record.version, 21);
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_commands() {
        let handle = spawn_with(Store::memory()).await;
        handle.shutdown().await;
        assert!(handle.is_closed());
        assert_eq!(
            handle.submit(Command::Start, None).await.unwrap_err(),
            EngineError::Unavailable("m1".into())
        );
    }

    #[tokio::test]
    async fn terminal_transition_stops_the_task() {
        let handle = spawn_with(Store::memory()).await;
        handle.submit(Command::Start, None).await.unwrap();
        let update = handle
            .submit(
                Command::ForceComplete {
                    winner_id: "b".into(),
                },
                Some(1),
            )
            .await
            .unwrap();
        assert_eq!(update.status, MatchStatus::Completed);

        // Closed before the reply was sent.
        assert!(handle.is_closed());
        assert_eq!(
            handle.snapshot().await.unwrap_err(),
            EngineError::Unavailable("m1".into())
        );
    }

    #[tokio::test]
    async fn idle_coordinator_stops_unless_watched() {
        let settings = CoordinatorSettings {
            idle_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let watched = spawn_with_settings(Store::memory(), settings).await;
        let _rx = watched.subscribe();
        let idle = spawn_with_settings(Store::memory(), settings).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(idle.is_closed());
        assert!(!watched.is_closed());
        assert_eq!(watched.snapshot().await.unwrap().record.version, 0);
    }
}
