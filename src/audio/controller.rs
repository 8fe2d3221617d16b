use crate::api::models::Track;
use crate::api::resolver::VideoResolver;
use crate::audio::queue::{Direction, PersistedQueueState, PlaybackQueue, QueueState};
use crate::audio::transport::{LoadStatus, TransportPhase, TransportState};
use crate::config::sanitize_volume;
use crate::events::{PlaybackState, PlayerEvent, ProgressPayload, TrackChangedPayload};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc, watch};

const EVENT_CAPACITY: usize = 256;

/// Imperative requests the controller sends to whichever backend is mounted.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCommand {
    Seek {
        track_id: String,
        generation: u64,
        position: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    Progress(f64),
    Duration(f64),
    Ended,
}

/// Backend report, tagged with the load it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub track_id: String,
    pub generation: u64,
    pub kind: Telemetry,
}

/// Outcome of moving through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Loaded,
    /// The current track is not in the queue.
    Nowhere,
    /// A newer load or a stop got there first.
    Superseded,
}

struct ControllerState {
    queue: PlaybackQueue,
    transport: TransportState,
}

struct Shared {
    state: Mutex<ControllerState>,
    resolver: Arc<dyn VideoResolver>,
    snapshots: watch::Sender<TransportState>,
    events: broadcast::Sender<PlayerEvent>,
    commands: mpsc::UnboundedSender<AdapterCommand>,
}

/// Owns the play queue and transport state. Cheap to clone; every clone
/// drives the same player.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    pub fn new(
        resolver: Arc<dyn VideoResolver>,
        volume: f32,
    ) -> (Self, mpsc::UnboundedReceiver<AdapterCommand>) {
        let transport = TransportState::new(sanitize_volume(volume));
        let (snapshots, _) = watch::channel(transport.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (commands, command_rx) = mpsc::unbounded_channel();

        let controller = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState {
                    queue: PlaybackQueue::new(),
                    transport,
                }),
                resolver,
                snapshots,
                events,
                commands,
            }),
        };
        (controller, command_rx)
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        // State stays consistent across every mutation, so a poisoned lock is still usable.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, transport: &TransportState) {
        self.shared.snapshots.send_replace(transport.clone());
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.shared.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    pub fn watch_transport(&self) -> watch::Receiver<TransportState> {
        self.shared.snapshots.subscribe()
    }

    pub fn transport(&self) -> TransportState {
        self.lock().transport.clone()
    }

    pub fn phase(&self) -> TransportPhase {
        self.lock().transport.phase()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().transport.current.clone()
    }

    // -- queue ---------------------------------------------------------------

    pub fn queue(&self) -> QueueState {
        self.lock().queue.state()
    }

    pub fn persisted_queue(&self) -> PersistedQueueState {
        self.lock().queue.persisted_state()
    }

    /// Replace the queue wholesale. Current playback is untouched.
    pub fn set_queue(&self, tracks: Vec<Track>) {
        log::info!("[set_queue] {} tracks", tracks.len());
        self.edit_queue(|queue| queue.set_tracks(tracks));
    }

    pub fn enqueue(&self, track: Track) {
        self.edit_queue(|queue| queue.add_track(track));
    }

    pub fn remove_from_queue(&self, index: usize) -> Option<Track> {
        self.edit_queue(|queue| queue.remove_track(index))
    }

    pub fn move_in_queue(&self, from: usize, to: usize) {
        self.edit_queue(|queue| queue.move_track(from, to));
    }

    pub fn clear_queue(&self) {
        self.edit_queue(PlaybackQueue::clear);
    }

    pub fn restore_queue(&self, persisted: PersistedQueueState) {
        self.edit_queue(|queue| queue.restore_from_persisted(persisted));
    }

    fn edit_queue<R>(&self, edit: impl FnOnce(&mut PlaybackQueue) -> R) -> R {
        let result = {
            let mut state = self.lock();
            let current = state.transport.current_id().map(String::from);
            let result = edit(&mut state.queue);
            // Keep the cursor on the playing track when an edit dropped it.
            if let Some(id) = current {
                if state.queue.cursor().is_none() {
                    let index = state.queue.locate(&id);
                    state.queue.set_cursor(index);
                }
            }
            result
        };
        self.emit(PlayerEvent::QueueChanged);
        result
    }

    // -- transport -----------------------------------------------------------

    /// Make `track` current and start it. Unresolved tracks are resolved
    /// first; a newer load supersedes this one while it waits.
    pub async fn play(&self, track: Track) -> TransportPhase {
        match self.load(track, None, None).await {
            Some(phase) => phase,
            None => self.phase(),
        }
    }

    /// Play the queue entry at `index`.
    pub async fn play_index(&self, index: usize) -> Option<TransportPhase> {
        let track = self.lock().queue.get(index).cloned()?;
        self.load(track, Some(index), None).await
    }

    /// With `expected` set, the load only happens if no other load or stop
    /// has moved the generation past it.
    async fn load(
        &self,
        track: Track,
        queue_index: Option<usize>,
        expected: Option<u64>,
    ) -> Option<TransportPhase> {
        log::info!(
            "[play] id={} title='{}' artist='{}'",
            track.id,
            track.title,
            track.artist
        );
        let needs_resolution = track.source.is_unresolved();

        let generation = {
            let mut state = self.lock();
            if expected.is_some_and(|g| g != state.transport.generation) {
                log::debug!("[play] {} superseded before it started", track.id);
                return None;
            }
            match queue_index {
                Some(index) => state.queue.set_cursor(Some(index)),
                None => {
                    let index = state.queue.locate(&track.id);
                    state.queue.set_cursor(index);
                }
            }

            let transport = &mut state.transport;
            transport.generation += 1;
            transport.current = Some(track.clone());
            transport.playing = true;
            transport.progress = 0.0;
            transport.duration_known = false;
            transport.load = if needs_resolution {
                LoadStatus::Resolving
            } else {
                LoadStatus::Ready
            };
            self.publish(transport);
            transport.generation
        };

        self.emit(PlayerEvent::TrackChanged(TrackChangedPayload::from(&track)));
        self.emit(PlayerEvent::state(if needs_resolution {
            PlaybackState::Buffering
        } else {
            PlaybackState::Playing
        }));

        if !needs_resolution {
            return Some(self.phase());
        }

        let video_id = match self.shared.resolver.resolve(&track.title, &track.artist).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                log::warn!(
                    "[play] no video found for '{}' by '{}'",
                    track.title,
                    track.artist
                );
                None
            }
            Err(e) => {
                log::warn!("[play] resolving '{}' failed: {}", track.title, e);
                None
            }
        };
        Some(self.apply_resolution(&track, generation, video_id))
    }

    fn apply_resolution(
        &self,
        track: &Track,
        generation: u64,
        video_id: Option<String>,
    ) -> TransportPhase {
        let (phase, state_event) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let transport = &mut state.transport;
            if !transport.is_current(&track.id, generation) {
                log::debug!(
                    "[play] discarding stale resolution for {} (generation {})",
                    track.id,
                    generation
                );
                return transport.phase();
            }

            let resolved = video_id.is_some();
            match video_id {
                Some(id) => {
                    let playable = track.with_video_id(id);
                    if let Some(index) = state.queue.cursor() {
                        state.queue.resolve_entry(index, &playable);
                    }
                    transport.current = Some(playable);
                    transport.load = LoadStatus::Ready;
                }
                None => transport.load = LoadStatus::Unplayable,
            }
            self.publish(transport);
            (transport.phase(), resolved.then(|| PlaybackState::of(transport)))
        };

        match state_event {
            Some(state) => self.emit(PlayerEvent::state(state)),
            None => self.emit(PlayerEvent::ResolutionFailed {
                track_id: track.id.clone(),
            }),
        }
        phase
    }

    /// Returns whether anything changed.
    pub fn pause(&self) -> bool {
        {
            let mut state = self.lock();
            if !state.transport.playing {
                return false;
            }
            state.transport.playing = false;
            self.publish(&state.transport);
        }
        log::info!("[pause]");
        self.emit(PlayerEvent::state(PlaybackState::Paused));
        true
    }

    /// Returns whether anything changed.
    pub fn resume(&self) -> bool {
        let playback_state = {
            let mut state = self.lock();
            if state.transport.current.is_none() || state.transport.playing {
                return false;
            }
            state.transport.playing = true;
            self.publish(&state.transport);
            PlaybackState::of(&state.transport)
        };
        log::info!("[resume]");
        self.emit(PlayerEvent::state(playback_state));
        true
    }

    pub fn toggle(&self) -> bool {
        let playing = self.lock().transport.playing;
        if playing {
            self.pause()
        } else {
            self.resume()
        }
    }

    /// Clear the current track. Pending resolutions and backend telemetry
    /// for the old load are invalidated.
    pub fn stop(&self) {
        self.stop_load(None);
    }

    /// Returns false when `expected` no longer matches the current load.
    fn stop_load(&self, expected: Option<u64>) -> bool {
        {
            let mut state = self.lock();
            let transport = &mut state.transport;
            if expected.is_some_and(|g| g != transport.generation) {
                return false;
            }
            transport.generation += 1;
            transport.current = None;
            transport.playing = false;
            transport.progress = 0.0;
            transport.duration = 0.0;
            transport.duration_known = false;
            transport.load = LoadStatus::Idle;
            self.publish(transport);
        }
        log::info!("[stop]");
        self.emit(PlayerEvent::state(PlaybackState::Stopped));
        true
    }

    /// Advance with wraparound. Returns false when there was nowhere to go.
    pub async fn next(&self) -> bool {
        self.step(Direction::Forward, None).await == Advance::Loaded
    }

    pub async fn previous(&self) -> bool {
        self.step(Direction::Backward, None).await == Advance::Loaded
    }

    async fn step(&self, direction: Direction, expected: Option<u64>) -> Advance {
        let target = {
            let state = self.lock();
            if expected.is_some_and(|g| g != state.transport.generation) {
                return Advance::Superseded;
            }
            state.transport.current_id().and_then(|id| {
                state
                    .queue
                    .neighbor(id, direction)
                    .map(|(index, track)| (index, track.clone()))
            })
        };

        match target {
            Some((index, track)) => match self.load(track, Some(index), expected).await {
                Some(_) => Advance::Loaded,
                None => Advance::Superseded,
            },
            None => {
                log::debug!("[step] {:?}: current track not in queue, ignoring", direction);
                Advance::Nowhere
            }
        }
    }

    /// Seek to a fraction of the current load's reported duration.
    /// Out-of-range fractions are clamped. Non-finite fractions are ignored,
    /// as is any seek before the load is mounted and has reported a duration.
    pub fn seek_to(&self, fraction: f64) -> bool {
        if !fraction.is_finite() {
            log::warn!("[seek] rejecting non-finite fraction");
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        let (command, progress) = {
            let mut state = self.lock();
            let transport = &mut state.transport;
            let (Some(track_id), Some(duration)) = (
                transport.current_id().map(String::from),
                transport.seekable_duration(),
            ) else {
                return false;
            };

            let position = fraction * duration;
            transport.set_progress(position);
            self.publish(transport);
            (
                AdapterCommand::Seek {
                    track_id,
                    generation: transport.generation,
                    position,
                },
                ProgressPayload::from(&*transport),
            )
        };

        log::info!("[seek] {:.2}s", progress.position);
        let _ = self.shared.commands.send(command);
        self.emit(PlayerEvent::Progress(progress));
        true
    }

    /// Absolute-time seek, as requested by OS media controls.
    pub fn seek_to_seconds(&self, seconds: f64) -> bool {
        let Some(duration) = self.lock().transport.seekable_duration() else {
            return false;
        };
        self.seek_to(seconds / duration)
    }

    /// Returns the volume actually applied.
    pub fn set_volume(&self, level: f32) -> f32 {
        let mut state = self.lock();
        if !level.is_finite() {
            log::warn!("[set_volume] rejecting non-finite level");
            return state.transport.volume;
        }
        state.transport.volume = level.clamp(0.0, 1.0);
        self.publish(&state.transport);
        state.transport.volume
    }

    pub fn volume(&self) -> f32 {
        self.lock().transport.volume
    }

    // -- telemetry -----------------------------------------------------------

    /// Apply a report from the mounted backend. Reports for any load other
    /// than the current one are dropped.
    pub async fn report(&self, event: BackendEvent) {
        let progress = {
            let mut state = self.lock();
            let transport = &mut state.transport;
            if !transport.is_current(&event.track_id, event.generation) {
                log::debug!(
                    "[telemetry] ignoring {:?} for stale load {}#{}",
                    event.kind,
                    event.track_id,
                    event.generation
                );
                return;
            }

            let ended = match event.kind {
                Telemetry::Progress(seconds) => {
                    transport.set_progress(seconds);
                    false
                }
                Telemetry::Duration(seconds) => {
                    transport.set_duration(seconds);
                    false
                }
                Telemetry::Ended => true,
            };
            if ended {
                None
            } else {
                self.publish(transport);
                Some(ProgressPayload::from(&*transport))
            }
        };

        match progress {
            Some(payload) => self.emit(PlayerEvent::Progress(payload)),
            None => self.finish_track(event.track_id, event.generation).await,
        }
    }

    /// Advance past the load that just ended, or go idle. Both steps are
    /// skipped if a user action replaced that load in the meantime.
    async fn finish_track(&self, track_id: String, generation: u64) {
        log::info!("[ended] {}", track_id);
        self.emit(PlayerEvent::TrackEnded { track_id });
        match self.step(Direction::Forward, Some(generation)).await {
            Advance::Loaded => {}
            Advance::Nowhere => {
                if self.stop_load(Some(generation)) {
                    log::info!("[ended] nothing to advance to, went idle");
                }
            }
            Advance::Superseded => {
                log::debug!("[ended] load {} was superseded, leaving it", generation);
            }
        }
    }
}
