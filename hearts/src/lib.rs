//! # Hearts
//!
//! A networked, four-player Hearts server and the pieces to talk to it.
//!
//! Players connect over TCP and wait in a lobby. Once four are seated and
//! ready, a table actor takes over their connections and plays rounds until
//! someone reaches the points limit:
//!
//! - **Round**: deal 13 cards each, pass three warheads (left, right,
//!   across), then play 13 tricks
//! - **Trick**: the two of clubs opens the round; everyone follows suit if
//!   they can, and the highest card of the led suit takes the trick
//! - **Scoring**: each heart is a point, the queen of spades thirteen;
//!   lowest total wins
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, rules, state, and the trick/round engines
//! - [`net`]: Framing, packets, connections, the lobby server, and a client
//! - [`table`]: The actor owning one game
//! - [`bot`]: Packet-driven bot players
//!
//! ## Example
//!
//! ```
//! use hearts::game::entities::{Card, Rank, Suit};
//!
//! let queen = Card::new(Rank::Queen, Suit::Spade).unwrap();
//! assert_eq!(queen, Card::QUEEN_OF_SPADES);
//! assert_eq!(queen.points(), 13);
//! ```

/// Packet-driven bot players.
pub mod bot;

/// Core game logic, entities, and engines.
pub mod game;
pub use game::{
    GameSettings, GameState,
    constants::{self, NUM_PLAYERS},
    entities::{self, Card, Seat, Username},
};

/// Networking components for client-server communication.
pub mod net;
pub use net::{client::Client, messages, server, utils};

/// Table actors running full games.
pub mod table;
