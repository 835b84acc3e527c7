use clap::{Parser, Subcommand};
use std::process;
use tracing::error;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(
    name = "deuce",
    author,
    version,
    about = "Tennis scoring from the terminal",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the scoring hive
    #[arg(
        global = true,
        long,
        env = "DEUCE_HIVE",
        default_value = "http://localhost:3000"
    )]
    hive: String,

    /// Sent in X-Deuce-Umpire for force-complete and cancel
    #[arg(global = true, long, env = "DEUCE_UMPIRE_SECRET")]
    umpire_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a recorded match offline and print the result
    Replay(cmd::replay::ReplayArgs),
    #[command(flatten)]
    Remote(cmd::remote::RemoteCommand),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so --json output stays parseable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => cmd::replay::run(args),
        Commands::Remote(remote) => {
            cmd::remote::run(&cli.hive, cli.umpire_secret, remote).await
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
