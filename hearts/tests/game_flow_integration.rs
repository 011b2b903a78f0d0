/// Integration tests for game flow scenarios
///
/// These tests run a real server on a local port and drive it with
/// blocking clients, covering the lobby, a full game, and a player
/// dropping mid-round.
use std::{
    net::{SocketAddr, TcpListener},
    thread,
    time::Duration,
};

use hearts::{
    Client, GameSettings,
    bot::BotPlayer,
    messages::{NetworkCode, Packet},
    server::{self, HeartsConfig},
};

fn get_random_open_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn start_server(points_limit: u32) -> SocketAddr {
    let port = get_random_open_port();
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    let config = HeartsConfig {
        game: GameSettings::new(points_limit, false, None),
        lobby_poll: Duration::from_millis(10),
    };
    thread::spawn(move || server::run(addr, config));
    thread::sleep(Duration::from_millis(50));
    addr
}

fn seat_four(addr: &SocketAddr) -> Vec<Client> {
    (0..4)
        .map(|seat| {
            let client = Client::connect(addr).unwrap();
            assert_eq!(client.player_num, seat);
            client
        })
        .collect()
}

/// Play with a bot until the game ends, returning the last packet.
fn play_out(mut client: Client, seed: u64) -> (Packet, usize) {
    let mut bot = BotPlayer::with_seed(seed);
    let mut hands = 0;
    loop {
        let packet = client.recv().unwrap();
        if packet.code == NetworkCode::WaitForHand {
            hands += 1;
        }
        if let Some(reply) = bot.handle(&packet) {
            client.send(&reply).unwrap();
        }
        if bot.is_finished() {
            return (packet, hands);
        }
    }
}

#[test]
fn test_fifth_player_is_denied() {
    let addr = start_server(100);
    let _seated = seat_four(&addr);
    let err = Client::connect(&addr).err().unwrap();
    assert!(err.to_string().contains("lobby is full"));
}

#[test]
fn test_full_game_ends_with_game_end() {
    let addr = start_server(1);
    let mut clients = seat_four(&addr);
    for (i, client) in clients.iter_mut().enumerate() {
        client.start_game(Some(&format!("bot{i}"))).unwrap();
    }

    let handles: Vec<_> = clients
        .into_iter()
        .enumerate()
        .map(|(i, client)| thread::spawn(move || play_out(client, i as u64)))
        .collect();

    let mut ends = Vec::new();
    for handle in handles {
        let (last, hands) = handle.join().unwrap();
        assert_eq!(last.code, NetworkCode::GameEnd);
        // Dealt hand plus the hand after passing
        assert_eq!(hands, 2);
        ends.push(last);
    }

    // Everyone sees the same final scores, and a single round hands out
    // all 26 points.
    let totals = ends[0].int_list("total_points").unwrap().to_vec();
    assert!(ends.iter().all(|p| p.int_list("total_points").unwrap() == totals.as_slice()));
    let sum: i64 = totals.iter().sum();
    assert_eq!(sum, 26);

    let lowest = totals.iter().min().copied().unwrap();
    let winners = ends[0].int_list("winners").unwrap();
    assert!(!winners.is_empty());
    assert!(winners.iter().all(|w| totals[*w as usize] == lowest));
}

#[test]
fn test_disconnect_during_passing_ends_table() {
    let addr = start_server(100);
    let mut clients = seat_four(&addr);
    for client in clients.iter_mut() {
        client.start_game(None).unwrap();
    }

    // Seat 3 leaves once it has its hand, before passing.
    let mut leaver = clients.pop().unwrap();
    leaver.recv_code(NetworkCode::SendWarheads).unwrap();
    drop(leaver);

    for mut client in clients {
        let packet = client.recv_code(NetworkCode::PlayerDisconnected).unwrap();
        assert_eq!(packet.int_list("players").unwrap(), &[3]);
    }
}

#[test]
fn test_ping_is_answered_at_table() {
    let addr = start_server(100);
    let mut clients = seat_four(&addr);
    for client in clients.iter_mut() {
        client.start_game(None).unwrap();
    }

    let first = &mut clients[0];
    first.recv_code(NetworkCode::SendWarheads).unwrap();
    first.ping().unwrap();
    first.recv_code(NetworkCode::Ping).unwrap();
}
