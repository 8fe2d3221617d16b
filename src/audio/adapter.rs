use crate::api::models::PlayableSource;
use crate::audio::controller::{AdapterCommand, BackendEvent, Telemetry};
use crate::audio::transport::TransportState;
use crate::error::AppResult;
use serde::Serialize;
use tokio::sync::mpsc;

/// A mounted renderer for one load of one track.
pub trait MediaBackend: Send {
    /// Start or pause. Pausing must keep the position.
    fn set_playing(&mut self, playing: bool) -> AppResult<()>;
    fn set_volume(&mut self, volume: f32);
    /// Absolute position in seconds.
    fn seek(&mut self, position: f64);
    /// Called right before the backend is dropped.
    fn unmount(&mut self) {}
}

/// Produces backends for one kind of source: a video id or a direct URL.
pub trait BackendFactory: Send {
    fn mount(&mut self, target: &str, telemetry: TelemetrySink) -> AppResult<Box<dyn MediaBackend>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Video,
    NativeAudio,
}

/// Where a backend reports elapsed time, duration and completion. Every
/// report is tagged with the load the backend was mounted for.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    track_id: String,
    generation: u64,
    tx: mpsc::UnboundedSender<BackendEvent>,
}

impl TelemetrySink {
    pub fn new(
        track_id: impl Into<String>,
        generation: u64,
        tx: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            generation,
            tx,
        }
    }

    pub fn progress(&self, seconds: f64) {
        self.send(Telemetry::Progress(seconds));
    }

    /// `0.0` when the backend cannot tell.
    pub fn duration(&self, seconds: f64) {
        self.send(Telemetry::Duration(seconds));
    }

    pub fn ended(&self) {
        self.send(Telemetry::Ended);
    }

    fn send(&self, kind: Telemetry) {
        let _ = self.tx.send(BackendEvent {
            track_id: self.track_id.clone(),
            generation: self.generation,
            kind,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MountKey {
    track_id: String,
    generation: u64,
    source: PlayableSource,
}

impl MountKey {
    fn of(transport: &TransportState) -> Option<Self> {
        let track = transport.current.as_ref()?;
        select_backend(&track.source)?;
        Some(Self {
            track_id: track.id.clone(),
            generation: transport.generation,
            source: track.source.clone(),
        })
    }
}

struct Mounted {
    key: MountKey,
    kind: BackendKind,
    backend: Box<dyn MediaBackend>,
    playing: bool,
    volume: f32,
}

/// Video id first, then direct URL, else nothing.
pub fn select_backend(source: &PlayableSource) -> Option<(BackendKind, &str)> {
    match source {
        PlayableSource::ExternalVideo(id) => Some((BackendKind::Video, id.as_str())),
        PlayableSource::DirectUrl(url) => Some((BackendKind::NativeAudio, url.as_str())),
        PlayableSource::Unresolved => None,
    }
}

/// Keeps at most one backend mounted, matching the latest transport snapshot.
pub struct PlaybackAdapter {
    video: Option<Box<dyn BackendFactory>>,
    audio: Option<Box<dyn BackendFactory>>,
    mounted: Option<Mounted>,
    failed: Option<MountKey>,
    telemetry: mpsc::UnboundedSender<BackendEvent>,
}

impl PlaybackAdapter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BackendEvent>) {
        let (telemetry, rx) = mpsc::unbounded_channel();
        let adapter = Self {
            video: None,
            audio: None,
            mounted: None,
            failed: None,
            telemetry,
        };
        (adapter, rx)
    }

    pub fn with_video(mut self, factory: impl BackendFactory + 'static) -> Self {
        self.video = Some(Box::new(factory));
        self
    }

    pub fn with_audio(mut self, factory: impl BackendFactory + 'static) -> Self {
        self.audio = Some(Box::new(factory));
        self
    }

    pub fn mounted_kind(&self) -> Option<BackendKind> {
        self.mounted.as_ref().map(|m| m.kind)
    }

    /// Bring the mounted backend in line with `transport`. Only a change of
    /// load or source remounts; `playing` and `volume` are forwarded.
    pub fn sync(&mut self, transport: &TransportState) {
        let desired = MountKey::of(transport);
        let unchanged = match (&self.mounted, &desired) {
            (Some(mounted), Some(key)) => mounted.key == *key,
            (None, None) => true,
            (None, Some(key)) => self.failed.as_ref() == Some(key),
            (Some(_), None) => false,
        };

        if !unchanged {
            self.unmount();
            if let Some(key) = desired {
                self.mount(key, transport);
            }
            return;
        }

        if let Some(mounted) = self.mounted.as_mut() {
            if mounted.volume != transport.volume {
                mounted.backend.set_volume(transport.volume);
                mounted.volume = transport.volume;
            }
            if mounted.playing != transport.playing {
                start_or_pause(mounted, transport.playing);
            }
        }
    }

    pub fn apply(&mut self, command: AdapterCommand) {
        match command {
            AdapterCommand::Seek {
                track_id,
                generation,
                position,
            } => match self.mounted.as_mut() {
                Some(m) if m.key.track_id == track_id && m.key.generation == generation => {
                    m.backend.seek(position);
                }
                _ => log::debug!("[adapter] dropping seek for unmounted {}#{}", track_id, generation),
            },
        }
    }

    pub fn unmount(&mut self) {
        if let Some(mut mounted) = self.mounted.take() {
            log::debug!(
                "[adapter] unmounting {:?} for {}",
                mounted.kind,
                mounted.key.track_id
            );
            mounted.backend.unmount();
        }
        self.failed = None;
    }

    fn mount(&mut self, key: MountKey, transport: &TransportState) {
        let Some((kind, target)) = select_backend(&key.source) else {
            return;
        };
        let factory = match kind {
            BackendKind::Video => self.video.as_mut(),
            BackendKind::NativeAudio => self.audio.as_mut(),
        };
        let Some(factory) = factory else {
            log::warn!("[adapter] no {:?} backend available for {}", kind, key.track_id);
            self.failed = Some(key);
            return;
        };

        let sink = TelemetrySink::new(key.track_id.clone(), key.generation, self.telemetry.clone());
        match factory.mount(target, sink) {
            Ok(mut backend) => {
                log::info!("[adapter] mounted {:?} for {}", kind, key.track_id);
                backend.set_volume(transport.volume);
                let mut mounted = Mounted {
                    key,
                    kind,
                    backend,
                    playing: false,
                    volume: transport.volume,
                };
                if transport.playing {
                    start_or_pause(&mut mounted, true);
                }
                self.mounted = Some(mounted);
            }
            Err(e) => {
                log::warn!("[adapter] failed to mount {:?} for {}: {}", kind, key.track_id, e);
                self.failed = Some(key);
            }
        }
    }
}

fn start_or_pause(mounted: &mut Mounted, playing: bool) {
    mounted.playing = playing;
    if let Err(e) = mounted.backend.set_playing(playing) {
        log::debug!(
            "[adapter] set_playing({}) on {} failed: {}",
            playing,
            mounted.key.track_id,
            e
        );
    }
}
