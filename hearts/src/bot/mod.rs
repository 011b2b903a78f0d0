//! Bot players for filling a table.
//!
//! A [`BotPlayer`] is transport-agnostic: feed it every packet the server
//! sends and write back whatever it returns. It keeps just enough of the
//! table in view (its hand, the led suit, whether hearts are broken) to
//! always answer with a legal move.
//!
//! ## Example
//!
//! ```
//! use hearts::bot::BotPlayer;
//! use hearts::game::entities::Card;
//! use hearts::net::messages::{NetworkCode, Packet};
//!
//! let mut bot = BotPlayer::with_seed(7);
//! bot.handle(&Packet::new(NetworkCode::WaitForHand).with_cards("hand", &[Card::TWO_OF_CLUBS]));
//! bot.handle(&Packet::new(NetworkCode::TrickStart).with_int("trick", 0));
//! let reply = bot.handle(&Packet::new(NetworkCode::MakePlay));
//! assert_eq!(reply, Some(Packet::play(Card::TWO_OF_CLUBS)));
//! ```

pub mod decision;
pub mod models;

pub use decision::BotDecisionMaker;
pub use models::{BotPlayer, BotStats};
