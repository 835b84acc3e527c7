use crate::reports;
use chrono::Utc;
use clap::Args;
use deuce_core::config::MatchFormat;
use deuce_core::replay::ReplayScript;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON script: player ids, optional format and first server, and points
    #[arg(short, long)]
    pub file: PathBuf,

    /// Print the final match view and fingerprint as JSON
    #[arg(long)]
    pub json: bool,

    /// Used when the script carries no format of its own
    #[command(flatten)]
    pub format: MatchFormat,
}

pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    info!("📂 Loading script: {:?}", args.file);
    let script = ReplayScript::load_from_file(&args.file)?;
    info!(
        "🎾 Replaying {} points between {} and {}",
        script.points.len(),
        script.player1_id,
        script.player2_id
    );

    let log = script.run(args.format, Utc::now())?;
    let view = log.record.view();
    let fingerprint = view.score.fingerprint()?;

    if args.json {
        let out = json!({
            "view": view,
            "fingerprint": fingerprint,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let tally = log.history.tally(&log.record.players);
    println!("\n{}", reports::scoreboard(&view));
    println!(
        "\n{}",
        reports::tally(&tally, &view.player1_id, &view.player2_id)
    );
    println!("\nStatus: {}", view.status);
    if let Some(w) = &view.winner_id {
        println!("Winner: {}", w);
    }
    println!("Fingerprint: {}", fingerprint);
    Ok(())
}
