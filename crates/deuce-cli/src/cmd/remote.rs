use crate::reports;
use clap::{Args, Subcommand};
use deuce_core::config::MatchFormat;
use deuce_core::protocol::{
    AwardPointRequest, CreateMatchRequest, CreateMatchResponse, ErrorResponse,
    ForceCompleteRequest, MatchView, ScoreUpdate, UndoRequest,
};
use deuce_core::types::{MatchId, PlayerId, PointType};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

const UMPIRE_HEADER: &str = "X-Deuce-Umpire";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Hive unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Hive rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        retryable: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RemoteCommand {
    /// Create a pending match
    Create(CreateArgs),
    /// Move a pending match to in progress
    Start(TargetArgs),
    /// Award one point
    Point(PointArgs),
    /// Revert the last scoring action
    Undo(UndoArgs),
    /// Declare a winner without further points (umpire only)
    ForceComplete(ForceCompleteArgs),
    /// Cancel a match (umpire only)
    Cancel(TargetArgs),
    /// Print the current scoreboard
    Show(ShowArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(long)]
    pub player1: PlayerId,
    #[arg(long)]
    pub player2: PlayerId,
    /// Defaults to player1
    #[arg(long)]
    pub first_server: Option<PlayerId>,
    #[command(flatten)]
    pub format: MatchFormat,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    pub match_id: MatchId,
}

#[derive(Args, Debug, Clone)]
pub struct UndoArgs {
    pub match_id: MatchId,
    /// Reject the undo unless the match is at this version
    #[arg(long)]
    pub expect_version: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct PointArgs {
    pub match_id: MatchId,
    pub winner: PlayerId,
    #[arg(long, default_value_t = PointType::Normal)]
    pub point_type: PointType,
    #[arg(long)]
    pub expect_version: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ForceCompleteArgs {
    pub match_id: MatchId,
    pub winner: PlayerId,
    #[arg(long)]
    pub expect_version: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    pub match_id: MatchId,
    /// Print the raw view as JSON
    #[arg(long)]
    pub json: bool,
}

/// Thin HTTP client for a running hive.
pub struct HiveClient {
    client: Client,
    base: String,
    umpire_secret: Option<String>,
}

impl HiveClient {
    pub fn new(hive_url: &str, umpire_secret: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base: hive_url.trim_end_matches('/').to_string(),
            umpire_secret,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn umpire(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.umpire_secret {
            Some(secret) => req.header(UMPIRE_HEADER, secret),
            None => req,
        }
    }

    pub async fn create(&self, req: &CreateMatchRequest) -> Result<MatchId, RemoteError> {
        let res = self.client.post(self.url("/matches")).json(req).send().await?;
        let body: CreateMatchResponse = decode(res).await?;
        Ok(body.match_id)
    }

    pub async fn view(&self, id: &MatchId) -> Result<MatchView, RemoteError> {
        let res = self
            .client
            .get(self.url(&format!("/matches/{}", id)))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn start(&self, id: &MatchId) -> Result<ScoreUpdate, RemoteError> {
        let res = self
            .client
            .post(self.url(&format!("/matches/{}/start", id)))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn point(
        &self,
        id: &MatchId,
        req: &AwardPointRequest,
    ) -> Result<ScoreUpdate, RemoteError> {
        let res = self
            .client
            .post(self.url(&format!("/matches/{}/points", id)))
            .json(req)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn undo(&self, id: &MatchId, req: &UndoRequest) -> Result<ScoreUpdate, RemoteError> {
        let res = self
            .client
            .post(self.url(&format!("/matches/{}/undo", id)))
            .json(req)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn force_complete(
        &self,
        id: &MatchId,
        req: &ForceCompleteRequest,
    ) -> Result<ScoreUpdate, RemoteError> {
        let req = self
            .client
            .post(self.url(&format!("/matches/{}/force-complete", id)))
            .json(req);
        let res = self.umpire(req).send().await?;
        decode(res).await
    }

    pub async fn cancel(&self, id: &MatchId) -> Result<ScoreUpdate, RemoteError> {
        let req = self.client.post(self.url(&format!("/matches/{}/cancel", id)));
        let res = self.umpire(req).send().await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, RemoteError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }

    let text = res.text().await.unwrap_or_default();
    let (message, retryable) = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => (body.error, body.retryable),
        Err(_) => (text, false),
    };
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
        retryable,
    })
}

pub async fn run(
    hive_url: &str,
    umpire_secret: Option<String>,
    cmd: RemoteCommand,
) -> anyhow::Result<()> {
    let hive = HiveClient::new(hive_url, umpire_secret);

    let update = match cmd {
        RemoteCommand::Create(args) => {
            let id = hive
                .create(&CreateMatchRequest {
                    player1_id: args.player1,
                    player2_id: args.player2,
                    format: Some(args.format),
                    first_server: args.first_server,
                })
                .await
                .inspect_err(warn_retry)?;
            info!("🎾 Match created");
            println!("{}", id);
            return Ok(());
        }
        RemoteCommand::Show(args) => {
            let view = hive.view(&args.match_id).await.inspect_err(warn_retry)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", reports::scoreboard(&view));
                println!("Status: {} (v{})", view.status, view.version);
            }
            return Ok(());
        }
        RemoteCommand::Start(args) => hive.start(&args.match_id).await,
        RemoteCommand::Point(args) => {
            let req = AwardPointRequest {
                winning_player_id: args.winner,
                point_type: args.point_type,
                expected_version: args.expect_version,
            };
            hive.point(&args.match_id, &req).await
        }
        RemoteCommand::Undo(args) => {
            let req = UndoRequest {
                expected_version: args.expect_version,
            };
            hive.undo(&args.match_id, &req).await
        }
        RemoteCommand::ForceComplete(args) => {
            let req = ForceCompleteRequest {
                winner_id: args.winner,
                expected_version: args.expect_version,
            };
            hive.force_complete(&args.match_id, &req).await
        }
        RemoteCommand::Cancel(args) => hive.cancel(&args.match_id).await,
    };

    let update = update.inspect_err(warn_retry)?;
    println!("{}", reports::summary_line(&update));
    Ok(())
}

fn warn_retry(e: &RemoteError) {
    if let RemoteError::Rejected {
        retryable: true, ..
    } = e
    {
        warn!("⚠️  Temporary failure; the same command can be retried");
    }
}
