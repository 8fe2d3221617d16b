use crate::api::models::Track;
use serde::Serialize;

/// Where the current track is in acquiring a playable handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Resolving,
    Ready,
    /// Resolution came back empty; nothing will be mounted for this load.
    Unplayable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    Idle,
    Loading,
    Playing,
    Paused,
    Unplayable,
}

/// Logical transport state owned by the controller.
///
/// `generation` is bumped on every load; resolutions and backend telemetry
/// carry the generation they belong to so stale ones can be dropped.
/// `duration` may still hold the previous track's length after a load;
/// `duration_known` says whether the current load has reported its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportState {
    pub current: Option<Track>,
    pub playing: bool,
    pub progress: f64,
    pub duration: f64,
    pub duration_known: bool,
    pub volume: f32,
    pub generation: u64,
    pub load: LoadStatus,
}

impl TransportState {
    pub fn new(volume: f32) -> Self {
        Self {
            current: None,
            playing: false,
            progress: 0.0,
            duration: 0.0,
            duration_known: false,
            volume,
            generation: 0,
            load: LoadStatus::Idle,
        }
    }

    pub fn phase(&self) -> TransportPhase {
        if self.current.is_none() {
            return TransportPhase::Idle;
        }
        match self.load {
            LoadStatus::Idle => TransportPhase::Idle,
            LoadStatus::Resolving => TransportPhase::Loading,
            LoadStatus::Unplayable => TransportPhase::Unplayable,
            LoadStatus::Ready if self.playing => TransportPhase::Playing,
            LoadStatus::Ready => TransportPhase::Paused,
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.id.as_str())
    }

    pub fn is_current(&self, track_id: &str, generation: u64) -> bool {
        self.generation == generation && self.current_id() == Some(track_id)
    }

    /// Duration a seek may target: the current load must be mounted and
    /// have reported a positive length.
    pub fn seekable_duration(&self) -> Option<f64> {
        let mounted = self.current.is_some() && self.load == LoadStatus::Ready;
        (mounted && self.duration_known && self.duration > 0.0).then_some(self.duration)
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.duration_known && self.duration > 0.0 {
            (self.progress / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Progress is clamped to `[0, duration]` once the duration is known.
    pub(crate) fn set_progress(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.progress = if self.duration_known && self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        };
    }

    pub(crate) fn set_duration(&mut self, seconds: f64) {
        self.duration = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        self.duration_known = true;
        let progress = self.progress;
        self.set_progress(progress);
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
