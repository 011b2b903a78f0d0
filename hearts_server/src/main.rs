//! Hearts lobby server.
//!
//! Seats players four at a time and runs each full table as its own
//! async actor.

mod config;

use std::net::SocketAddr;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use tokio::net::TcpListener;

use config::ServerConfig;

const HELP: &str = "\
Run a Hearts server

USAGE:
  hearts_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --points-limit  N        Points that end the game    [default: env POINTS_LIMIT or 100]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:6969)
  POINTS_LIMIT             Points that end the game
  HOLD_ROUNDS              Skip passing every fourth round (true/false)
  TURN_TIMEOUT_SECS        Seconds before an idle player is pinged (0 = never)
  LOBBY_POLL_MS            Lobby poll interval in milliseconds
  RUST_LOG                 Log filter (e.g., info, debug)
  (A .env file in the working directory is loaded if present)
";

struct Args {
    bind: Option<SocketAddr>,
    points_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        points_limit: pargs.opt_value_from_str("--points-limit")?,
    };
    let config = ServerConfig::from_env(args.bind, args.points_limit)?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();
    info!("Starting Hearts server at {}", config.bind);
    info!(
        "Points limit {}, hold rounds {}, turn timeout {:?}",
        config.points_limit, config.hold_rounds, config.turn_timeout
    );

    let listener = TcpListener::bind(config.bind).await?;
    hearts::server::serve(listener, config.hearts_config()).await
}
