/// Seats at a Hearts table.
pub const NUM_PLAYERS: usize = 4;

/// Cards dealt to each seat from a 52-card deck.
pub const HAND_SIZE: usize = 13;

/// Tricks played per round. Every card in every hand gets played.
pub const TRICKS_PER_ROUND: usize = HAND_SIZE;

/// Cards each seat passes during the warhead phase.
pub const WARHEAD_COUNT: usize = 3;

/// Points for each heart taken.
pub const HEART_POINTS: u32 = 1;

/// Points for taking the queen of spades.
pub const QUEEN_OF_SPADES_POINTS: u32 = 13;

/// Accumulated points that end a game unless configured otherwise.
pub const DEFAULT_POINTS_LIMIT: u32 = 100;

/// Longest allowed username. Longer names are truncated.
pub const MAX_NAME_LENGTH: usize = 16;
