//! Networking layer for client-server communication.
//!
//! Packets travel as length-prefixed bincode frames over TCP. The server
//! side runs on tokio: every player gets a [`connection::PlayerConnection`]
//! with its own reader task, and a lobby groups four of them into a table.

/// TCP client for connecting to a Hearts server.
pub mod client;

/// A single player's channel and its receive queue.
pub mod connection;

/// Serialization and channel errors.
pub mod errors;

/// Packets and network codes for the wire protocol.
pub mod messages;

/// Protocol versioning for backward compatibility.
pub mod protocol_version;

/// The seated connections of a lobby or table.
pub mod roster;

/// Lobby server accepting players and starting tables.
pub mod server;

/// Utilities for binary message serialization and framing.
pub mod utils;
