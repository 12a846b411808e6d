mod manager;
pub mod session;

pub use manager::{PlayerManager, PROGRESS_TICK};
pub use session::{
    PlaybackState, PlayerEvent, PlayerSession, PlayerSnapshot, SurfaceCommand,
    MAX_CONSECUTIVE_ERRORS,
};
