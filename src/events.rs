use crate::api::models::Track;
use crate::audio::transport::{TransportPhase, TransportState};
use crate::error::{AppError, FailureKind};
use serde::Serialize;

pub const PLAYBACK_PROGRESS: &str = "playback:progress";
pub const PLAYBACK_TRACK_CHANGED: &str = "playback:track-changed";
pub const PLAYBACK_STATE_CHANGED: &str = "playback:state-changed";
pub const PLAYBACK_TRACK_ENDED: &str = "playback:track-ended";
pub const PLAYBACK_QUEUE_CHANGED: &str = "playback:queue-changed";
pub const PLAYBACK_RESOLUTION_FAILED: &str = "playback:resolution-failed";
pub const APP_NOTICE: &str = "app:notice";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPayload {
    pub position: f64,
    pub duration: f64,
    pub position_fraction: f64,
}

impl From<&TransportState> for ProgressPayload {
    fn from(state: &TransportState) -> Self {
        Self {
            position: state.progress,
            duration: state.duration,
            position_fraction: state.progress_fraction(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackChangedPayload {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub artwork_url: Option<String>,
}

impl From<&Track> for TrackChangedPayload {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            duration: track.duration_hint,
            artwork_url: track.artwork_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChangedPayload {
    pub state: PlaybackState,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    Buffering,
}

impl PlaybackState {
    pub fn of(state: &TransportState) -> Self {
        match state.phase() {
            TransportPhase::Idle => PlaybackState::Stopped,
            TransportPhase::Loading => PlaybackState::Buffering,
            TransportPhase::Playing => PlaybackState::Playing,
            TransportPhase::Paused => PlaybackState::Paused,
            TransportPhase::Unplayable if state.playing => PlaybackState::Playing,
            TransportPhase::Unplayable => PlaybackState::Paused,
        }
    }
}

/// User-facing message for a recoverable failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticePayload {
    pub message: String,
    pub failure: Option<FailureKind>,
}

impl NoticePayload {
    pub fn from_error(context: &str, err: &AppError) -> Self {
        Self {
            message: format!("{}: {}", context, err),
            failure: Some(err.failure_kind()),
        }
    }
}

/// Everything the playback core announces to front-ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum PlayerEvent {
    Progress(ProgressPayload),
    TrackChanged(TrackChangedPayload),
    StateChanged(StateChangedPayload),
    TrackEnded { track_id: String },
    QueueChanged,
    ResolutionFailed { track_id: String },
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Progress(_) => PLAYBACK_PROGRESS,
            PlayerEvent::TrackChanged(_) => PLAYBACK_TRACK_CHANGED,
            PlayerEvent::StateChanged(_) => PLAYBACK_STATE_CHANGED,
            PlayerEvent::TrackEnded { .. } => PLAYBACK_TRACK_ENDED,
            PlayerEvent::QueueChanged => PLAYBACK_QUEUE_CHANGED,
            PlayerEvent::ResolutionFailed { .. } => PLAYBACK_RESOLUTION_FAILED,
        }
    }

    pub(crate) fn state(state: PlaybackState) -> Self {
        PlayerEvent::StateChanged(StateChangedPayload { state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::transport::LoadStatus;

    #[test]
    fn playback_state_tracks_phase() {
        let mut state = TransportState::default();
        assert_eq!(PlaybackState::of(&state), PlaybackState::Stopped);

        state.current = Some(Track::new("a", "A", "X"));
        state.playing = true;
        state.load = LoadStatus::Resolving;
        assert_eq!(PlaybackState::of(&state), PlaybackState::Buffering);

        state.load = LoadStatus::Unplayable;
        assert_eq!(PlaybackState::of(&state), PlaybackState::Playing);

        state.load = LoadStatus::Ready;
        state.playing = false;
        assert_eq!(PlaybackState::of(&state), PlaybackState::Paused);
    }

    #[test]
    fn event_names_match_channels() {
        assert_eq!(PlayerEvent::QueueChanged.name(), "playback:queue-changed");
        let failed = PlayerEvent::ResolutionFailed {
            track_id: "t".into(),
        };
        assert_eq!(failed.name(), PLAYBACK_RESOLUTION_FAILED);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["event"], "resolution-failed");
        assert_eq!(json["payload"]["track_id"], "t");
    }
}
