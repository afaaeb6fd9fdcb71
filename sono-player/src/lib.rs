//! Playback core for Sono
//!
//! Owns everything between the user's controls and the transport:
//! - Playlist: track list plus linear or shuffled play order
//! - Player: the playback state machine reacting to transport lifecycle
//! - PositionSync: seek control arbitration against live position updates

mod playlist;
mod position;
mod state;

pub use playlist::{PlayOrder, Playlist};
pub use position::{format_time, PositionSync};
pub use state::{PlayState, Player, PlayerError};
