//! Table module running full games with an async actor model.
//!
//! Each table runs in its own Tokio task. The lobby hands a full
//! [`PlayerRoster`](crate::net::roster::PlayerRoster) to a new
//! [`TableActor`], which then owns both the connections and the game state
//! until the game is over or a player drops.
//!
//! ## Example
//!
//! ```ignore
//! use hearts::game::GameSettings;
//! use hearts::table::TableActor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let roster = fill_roster().await;
//!     let actor = TableActor::new(1, roster, GameSettings::default());
//!     let outcome = tokio::spawn(actor.run()).await;
//! }
//! ```

pub mod actor;

pub use actor::{TableActor, TableId, TableOutcome};
