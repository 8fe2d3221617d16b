//! Operations the UI invokes. Each takes the shared [`AppState`](crate::AppState).

pub mod auth_commands;
pub mod favorites_commands;
pub mod playback_commands;
pub mod playlist_commands;
pub mod queue_commands;
pub mod search_commands;
