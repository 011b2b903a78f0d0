//! Hearts game engine.
//!
//! This module provides the game itself, independent of who is on the
//! other end of each seat:
//! - Cards, hands, decks, and pass directions
//! - Pure play and pass rules shared with client bots
//! - Per-game state mutated only by a table's coordinator
//! - Trick and round engines that drive the state over a roster

pub mod constants;
pub mod entities;
pub mod errors;
pub mod round;
pub mod rules;
pub mod state;
pub mod trick;

pub use errors::{CardError, PlayError, WarheadError};
pub use round::{RoundEngine, RoundSummary};
pub use state::{GameSettings, GameState, Player, TrickSummary};
pub use trick::{TrickEngine, TrickPhase};
