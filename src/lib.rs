pub mod api;
pub mod audio;
pub mod collection;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod media_session;

use api::auth::{AuthProvider, SupabaseAuth};
use api::client::RestClient;
use api::resolver::{VideoResolver, YoutubeResolver};
use api::search::{CatalogSearch, ItunesCatalog};
use api::store::{PersistenceStore, SupabaseStore};
use audio::adapter::PlaybackAdapter;
use audio::controller::{BackendEvent, PlaybackController};
use collection::Collection;
use config::AppConfig;
use error::{AppError, AppResult};
use events::NoticePayload;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

const NOTICE_CAPACITY: usize = 64;

/// Install the `env_logger` backend. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("pocketplay_lib=info"),
    )
    .try_init();
}

/// External collaborators the playback core talks to.
pub struct Services {
    pub catalog: Arc<dyn CatalogSearch>,
    pub resolver: Arc<dyn VideoResolver>,
    pub store: Arc<dyn PersistenceStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Services {
    /// The hosted implementations: iTunes search, YouTube resolution and Supabase.
    pub fn connect(config: Arc<RwLock<AppConfig>>) -> AppResult<Self> {
        let rest = RestClient::new(Arc::clone(&config))?;
        let http = rest.http_client().clone();
        Ok(Self {
            catalog: Arc::new(ItunesCatalog::new(http.clone(), Arc::clone(&config))),
            resolver: Arc::new(YoutubeResolver::new(http.clone(), Arc::clone(&config))),
            auth: Arc::new(SupabaseAuth::new(http, config)),
            store: Arc::new(SupabaseStore::new(rest)),
        })
    }
}

pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,
    pub controller: PlaybackController,
    pub catalog: Arc<dyn CatalogSearch>,
    pub auth: Arc<dyn AuthProvider>,
    pub collection: Arc<Collection>,
    notices: broadcast::Sender<NoticePayload>,
    tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Wire the controller to `adapter` and start the background tasks.
    /// `config` must be the same handle the services were built with.
    pub async fn new(
        config: Arc<RwLock<AppConfig>>,
        services: Services,
        adapter: PlaybackAdapter,
        telemetry: mpsc::UnboundedReceiver<BackendEvent>,
    ) -> Self {
        let restored_volume = config.read().await.volume;

        let (controller, commands) =
            PlaybackController::new(Arc::clone(&services.resolver), restored_volume);
        let engine =
            audio::engine::spawn_playback_loop(controller.clone(), adapter, commands, telemetry);

        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let collection = Arc::new(Collection::new(services.store, notices.clone()));
        let mirror = spawn_auth_mirror(services.auth.as_ref(), Arc::clone(&collection));

        Self {
            config,
            controller,
            catalog: services.catalog,
            auth: services.auth,
            collection,
            notices,
            tasks: vec![engine, mirror],
        }
    }

    /// Load the config from disk, connect the hosted services, restore the
    /// last queue and session.
    pub async fn start(
        adapter: PlaybackAdapter,
        telemetry: mpsc::UnboundedReceiver<BackendEvent>,
    ) -> AppResult<Self> {
        let config = Arc::new(RwLock::new(AppConfig::load_or_default()));
        let services = Services::connect(Arc::clone(&config))?;
        let state = Self::new(config, services, adapter, telemetry).await;

        if let Err(e) = commands::queue_commands::load_saved_queue(&state).await {
            log::warn!("Failed to restore queue: {}", e);
        }
        match state.auth.restore_session().await {
            Ok(Some(user)) => log::info!("Restored session for {}", user.id),
            Ok(None) => log::info!("No stored session"),
            Err(e) => log::warn!("Failed to restore session: {}", e),
        }
        Ok(state)
    }

    pub fn user_id(&self) -> AppResult<String> {
        self.auth
            .current_user()
            .map(|u| u.id)
            .ok_or(AppError::AuthRequired)
    }

    /// User-facing failure notices, for the host to forward as
    /// [`events::APP_NOTICE`].
    pub fn subscribe_notices(&self) -> broadcast::Receiver<NoticePayload> {
        self.notices.subscribe()
    }

    pub(crate) fn notify(&self, context: &str, err: &AppError) {
        log::warn!("{}: {}", context, err);
        let _ = self.notices.send(NoticePayload::from_error(context, err));
    }

    /// Stop the background tasks. Dropping the adapter unmounts its backend.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keep the liked set in step with whoever is signed in.
fn spawn_auth_mirror(auth: &dyn AuthProvider, collection: Arc<Collection>) -> JoinHandle<()> {
    let mut users = auth.subscribe();
    tokio::spawn(async move {
        loop {
            let user = users.borrow_and_update().clone();
            match user {
                Some(user) => {
                    // Failures already reach the notice channel.
                    let _ = collection.refresh_likes(&user.id).await;
                }
                None => collection.clear(),
            }
            if users.changed().await.is_err() {
                break;
            }
        }
    })
}
