use crate::error::AppResult;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use deuce_core::protocol::ScoreUpdate;
use deuce_core::types::MatchId;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// `GET /matches/{id}/live`: the current score first, then every update.
pub async fn live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<MatchId>,
) -> AppResult<Response> {
    let handle = state.matches.get(&id).await?;
    // Subscribe before the snapshot so nothing falls between the two.
    let rx = handle.subscribe();
    let record = handle.snapshot().await?.record;

    let first = ScoreUpdate {
        match_id: record.id,
        version: record.version,
        status: record.status,
        winner_id: record.winner_id,
        action: "snapshot".to_string(),
        score: record.score,
    };
    Ok(ws.on_upgrade(move |socket| live_socket(socket, first, rx)))
}

pub async fn live_socket<S, E>(
    mut socket: S,
    first: ScoreUpdate,
    mut rx: broadcast::Receiver<ScoreUpdate>,
) where
    S: Sink<Message, Error = E> + Stream<Item = Result<Message, E>> + Unpin,
{
    let mut seen = first.version;
    if send(&mut socket, &first).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(update) => {
                    if update.version <= seen {
                        continue;
                    }
                    seen = update.version;
                    if send(&mut socket, &update).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Live subscriber lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Server-to-client only.
                _ => {}
            },
        }
    }
}

async fn send<S, E>(socket: &mut S, update: &ScoreUpdate) -> Result<(), ()>
where
    S: Sink<Message, Error = E> + Unpin,
{
    let payload = match serde_json::to_string(update) {
        Ok(p) => p,
        Err(e) => {
            warn!("Failed to encode update for {}: {}", update.match_id, e);
            return Ok(());
        }
    };
    socket.send(Message::Text(payload.into())).await.map_err(|_| ())
}
