//! In-memory stand-ins for the external collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use pocketplay_lib::api::auth::AuthProvider;
use pocketplay_lib::api::models::{AuthUser, PlayableSource, Playlist, Track};
use pocketplay_lib::api::resolver::VideoResolver;
use pocketplay_lib::api::search::CatalogSearch;
use pocketplay_lib::api::store::PersistenceStore;
use pocketplay_lib::audio::adapter::{BackendFactory, MediaBackend, TelemetrySink};
use pocketplay_lib::error::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

pub fn direct(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "Artist")
        .with_source(PlayableSource::DirectUrl(format!("https://cdn.test/{}.m4a", id)))
}

pub fn unresolved(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "Artist")
}

pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Resolver that finds nothing.
pub struct NullResolver;

#[async_trait]
impl VideoResolver for NullResolver {
    async fn resolve(&self, _title: &str, _artist: &str) -> AppResult<Option<String>> {
        Ok(None)
    }
}

/// Resolver whose upstream is down.
pub struct FailingResolver;

#[async_trait]
impl VideoResolver for FailingResolver {
    async fn resolve(&self, _title: &str, _artist: &str) -> AppResult<Option<String>> {
        Err(AppError::Api {
            status: 503,
            message: "quota exceeded".into(),
        })
    }
}

/// Resolves `Song <id>` to `vid-<id>` and counts lookups.
#[derive(Default)]
pub struct TitleResolver {
    pub calls: AtomicUsize,
}

#[async_trait]
impl VideoResolver for TitleResolver {
    async fn resolve(&self, title: &str, _artist: &str) -> AppResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(title.strip_prefix("Song ").map(|id| format!("vid-{}", id)))
    }
}

/// Each lookup blocks until the test releases it.
#[derive(Default)]
pub struct GatedResolver {
    gates: Mutex<HashMap<String, oneshot::Receiver<Option<String>>>>,
}

impl GatedResolver {
    pub fn gate(&self, title: &str) -> oneshot::Sender<Option<String>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(title.to_string(), rx);
        tx
    }
}

#[async_trait]
impl VideoResolver for GatedResolver {
    async fn resolve(&self, title: &str, _artist: &str) -> AppResult<Option<String>> {
        let gate = self.gates.lock().unwrap().remove(title);
        match gate {
            Some(rx) => Ok(rx.await.ok().flatten()),
            None => Ok(None),
        }
    }
}

pub struct FixedCatalog(pub Vec<Track>);

#[async_trait]
impl CatalogSearch for FixedCatalog {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<Track>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.0.iter().take(limit as usize).cloned().collect())
    }
}

#[derive(Default)]
struct StoreData {
    playlists: Vec<Playlist>,
    playlist_tracks: HashMap<String, Vec<Track>>,
    likes: HashMap<String, Vec<Track>>,
}

/// Store that keeps everything in memory. `fail_writes` makes every write
/// return a transient error.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
    pub fail_writes: AtomicBool,
    pub inserts: AtomicUsize,
}

impl MemoryStore {
    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                status: 503,
                message: "store unavailable".into(),
            });
        }
        Ok(())
    }

    pub fn liked_count(&self, user_id: &str) -> usize {
        self.data
            .lock()
            .unwrap()
            .likes
            .get(user_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn list_playlists(&self, user_id: &str) -> AppResult<Vec<Playlist>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .playlists
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Playlist> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        let playlist = Playlist {
            id: format!("pl-{}", data.playlists.len() + 1),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: description.map(String::from),
            created_at: None,
        };
        data.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> AppResult<()> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        data.playlists
            .retain(|p| !(p.id == playlist_id && p.user_id == user_id));
        data.playlist_tracks.remove(playlist_id);
        Ok(())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> AppResult<Vec<Track>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .playlist_tracks
            .get(playlist_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> AppResult<()> {
        self.check_write()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap();
        data.playlist_tracks
            .entry(playlist_id.to_string())
            .or_default()
            .push(track.clone());
        Ok(())
    }

    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> AppResult<()> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        if let Some(tracks) = data.playlist_tracks.get_mut(playlist_id) {
            tracks.retain(|t| t.id != track_id);
        }
        Ok(())
    }

    async fn liked_tracks(&self, user_id: &str) -> AppResult<Vec<Track>> {
        let data = self.data.lock().unwrap();
        Ok(data.likes.get(user_id).cloned().unwrap_or_default())
    }

    async fn add_like(&self, user_id: &str, track: &Track) -> AppResult<()> {
        self.check_write()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock().unwrap();
        data.likes
            .entry(user_id.to_string())
            .or_default()
            .push(track.clone());
        Ok(())
    }

    async fn remove_like(&self, user_id: &str, track_id: &str) -> AppResult<()> {
        self.check_write()?;
        let mut data = self.data.lock().unwrap();
        if let Some(tracks) = data.likes.get_mut(user_id) {
            tracks.retain(|t| t.id != track_id);
        }
        Ok(())
    }

    async fn is_liked(&self, user_id: &str, track_id: &str) -> AppResult<bool> {
        let data = self.data.lock().unwrap();
        Ok(data
            .likes
            .get(user_id)
            .is_some_and(|tracks| tracks.iter().any(|t| t.id == track_id)))
    }
}

/// Accepts any password except "wrong".
pub struct FakeAuth {
    user: watch::Sender<Option<AuthUser>>,
}

impl FakeAuth {
    pub fn new() -> Self {
        Self {
            user: watch::channel(None).0,
        }
    }

    pub fn signed_in(user_id: &str) -> Self {
        let auth = Self::new();
        auth.user.send_replace(Some(AuthUser {
            id: user_id.to_string(),
            email: None,
        }));
        auth
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthUser> {
        if password == "wrong" {
            return Err(AppError::AuthRequired);
        }
        let user = AuthUser {
            id: format!("user-{}", email),
            email: Some(email.to_string()),
        };
        self.user.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthUser> {
        self.sign_in(email, password).await
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.user.send_replace(None);
        Ok(())
    }

    async fn restore_session(&self) -> AppResult<Option<AuthUser>> {
        Ok(self.current_user())
    }
}

/// What a fake backend was asked to do, in order.
#[derive(Default)]
pub struct BackendLog {
    pub calls: Mutex<Vec<String>>,
    pub sinks: Mutex<Vec<TelemetrySink>>,
}

impl BackendLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> Option<TelemetrySink> {
        self.sinks.lock().unwrap().last().cloned()
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct RecordingFactory(pub Arc<BackendLog>);

impl BackendFactory for RecordingFactory {
    fn mount(
        &mut self,
        target: &str,
        telemetry: TelemetrySink,
    ) -> AppResult<Box<dyn MediaBackend>> {
        self.0.push(format!("mount {}", target));
        self.0.sinks.lock().unwrap().push(telemetry);
        Ok(Box::new(RecordingBackend(Arc::clone(&self.0))))
    }
}

struct RecordingBackend(Arc<BackendLog>);

impl MediaBackend for RecordingBackend {
    fn set_playing(&mut self, playing: bool) -> AppResult<()> {
        self.0.push(format!("playing {}", playing));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.push(format!("volume {}", volume));
    }

    fn seek(&mut self, position: f64) {
        self.0.push(format!("seek {}", position));
    }

    fn unmount(&mut self) {
        self.0.push("unmount".into());
    }
}
