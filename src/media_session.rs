//! OS media-session surface: a one-way mirror of the transport state plus
//! inbound transport commands from media keys and lock-screen controls.

use crate::audio::controller::PlaybackController;
use crate::audio::transport::TransportState;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const MEDIA_KEY_TOGGLE_PLAY: &str = "media-key:toggle-play";
pub const MEDIA_KEY_NEXT: &str = "media-key:next";
pub const MEDIA_KEY_PREVIOUS: &str = "media-key:previous";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub duration: f64,
    pub elapsed: f64,
    pub is_playing: bool,
}

impl NowPlaying {
    pub fn from_transport(state: &TransportState) -> Option<Self> {
        let track = state.current.as_ref()?;
        Some(Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_url: track.artwork_url_sized(512, 512),
            duration: if state.duration_known && state.duration > 0.0 {
                state.duration
            } else {
                track.duration_hint
            },
            elapsed: state.progress,
            is_playing: state.playing,
        })
    }
}

/// Platform now-playing center.
pub trait MediaSession: Send + Sync {
    fn update_now_playing(&self, info: &NowPlaying);
    fn clear_now_playing(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// Absolute position in seconds.
    SeekTo(f64),
}

impl FromStr for MediaCommand {
    type Err = String;

    /// Accepts the media-key event names and the short payloads `play`,
    /// `pause`, `toggle`, `next`, `previous`, `seek:<seconds>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "play" => Ok(MediaCommand::Play),
            "pause" => Ok(MediaCommand::Pause),
            "toggle" | MEDIA_KEY_TOGGLE_PLAY => Ok(MediaCommand::Toggle),
            "next" | MEDIA_KEY_NEXT => Ok(MediaCommand::Next),
            "previous" | "prev" | MEDIA_KEY_PREVIOUS => Ok(MediaCommand::Previous),
            other => other
                .strip_prefix("seek:")
                .and_then(|secs| secs.parse::<f64>().ok())
                .filter(|secs| secs.is_finite())
                .map(MediaCommand::SeekTo)
                .ok_or_else(|| format!("unknown media command: {}", other)),
        }
    }
}

/// Run `command` through the same controller operations the UI uses.
pub async fn handle_media_command(controller: &PlaybackController, command: MediaCommand) {
    log::info!("[media-key] {:?}", command);
    match command {
        MediaCommand::Play => {
            controller.resume();
        }
        MediaCommand::Pause => {
            controller.pause();
        }
        MediaCommand::Toggle => {
            controller.toggle();
        }
        MediaCommand::Next => {
            controller.next().await;
        }
        MediaCommand::Previous => {
            controller.previous().await;
        }
        MediaCommand::SeekTo(seconds) => {
            controller.seek_to_seconds(seconds);
        }
    }
}

/// Mirror every transport snapshot into `session` until aborted.
pub fn spawn_media_session_bridge(
    controller: &PlaybackController,
    session: Arc<dyn MediaSession>,
) -> JoinHandle<()> {
    let mut snapshots = controller.watch_transport();
    tokio::spawn(async move {
        let mut last: Option<NowPlaying> = None;
        loop {
            let info = NowPlaying::from_transport(&snapshots.borrow_and_update());
            if info != last {
                match &info {
                    Some(info) => session.update_now_playing(info),
                    None => session.clear_now_playing(),
                }
                last = info;
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    })
}
