//! Headless Hearts bots.
//!
//! Each bot runs on its own thread with a blocking client, readies up in
//! the lobby, and plays until its game ends.

use std::{net::SocketAddr, thread, time::Duration};

use anyhow::Error;
use ctrlc::set_handler;
use hearts::{
    Client,
    bot::BotPlayer,
    messages::{NetworkCode, Packet},
};
use log::{info, warn};
use pico_args::Arguments;
use rand::Rng;

const HELP: &str = "\
Fill a Hearts server with bots

USAGE:
  hearts_bots [OPTIONS]

OPTIONS:
  --connect       IP:PORT  Server socket connection address       [default: 127.0.0.1:6969]
  --bots          N        Number of bots to start                [default: 4]
  --name          PREFIX   Bot name prefix                        [default: bot]
  --think-ms      MS       Upper bound on random think time       [default: 0]
  --read-timeout  SECS     Give up on a silent server, 0 = never  [default: 0]

FLAGS:
  -h, --help               Print help information
";

struct Args {
    addr: SocketAddr,
    bots: usize,
    name: String,
    think_ms: u64,
    read_timeout: Option<Duration>,
}

/// Bots sit in the lobby until the table fills, so zero means no limit.
fn read_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn play(args: &Args, index: usize) -> Result<(), Error> {
    let name = format!("{}{index}", args.name);
    let mut client = Client::connect(&args.addr)?;
    client.set_read_timeout(args.read_timeout)?;
    client.start_game(Some(&name))?;
    info!("{name} seated as player {}", client.player_num);

    let mut bot = BotPlayer::new();
    // The lobby already seated us, so the bot hasn't seen its seat yet.
    bot.handle(
        &Packet::new(NetworkCode::ConnectionAccepted)
            .with_seat("player_num", client.player_num)
            .with_str("name", &client.name),
    );

    let mut rng = rand::rng();
    while !bot.is_finished() {
        let packet = client.recv()?;
        if let Some(reply) = bot.handle(&packet) {
            if args.think_ms > 0 {
                thread::sleep(Duration::from_millis(rng.random_range(0..=args.think_ms)));
            }
            client.send(&reply)?;
        }
        if packet.code == NetworkCode::GameEnd {
            info!("{name} finished: {packet}");
        }
    }
    info!("{name} done with {:?}", bot.stats());
    Ok(())
}

fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        addr: pargs
            .value_from_str("--connect")
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 6969))),
        bots: pargs.value_from_str("--bots").unwrap_or(4),
        name: pargs
            .value_from_str("--name")
            .unwrap_or_else(|_| "bot".to_string()),
        think_ms: pargs.value_from_str("--think-ms").unwrap_or(0),
        read_timeout: read_timeout(pargs.value_from_str("--read-timeout").unwrap_or(0)),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..args.bots)
            .map(|index| {
                let args = &args;
                scope.spawn(move || play(args, index))
            })
            .collect();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!("bot {index} stopped: {error}"),
                Err(_) => warn!("bot {index} panicked"),
            }
        }
    });
    Ok(())
}
