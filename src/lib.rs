pub mod api;
pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod lyrics;
pub mod media_session;
pub mod session;
pub mod store;

use api::Backend;
use audio::sink::AudioSink;
use commands::SessionHandle;
use config::AppConfig;
use media_session::{MediaSessionBridge, MediaSessionSurface};
use session::{SessionController, SessionRuntime, SessionSettings};
use std::sync::Arc;
use store::SessionStore;
use tokio::task::JoinHandle;

/// `RUST_LOG` wins over the default filter.
pub fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("mobify_player=info"),
    )
    .init();
}

/// Builds a session from its collaborators and starts its task.
pub fn launch(
    config: &AppConfig,
    backend: Arc<dyn Backend>,
    sink: Box<dyn AudioSink>,
    store: SessionStore,
    surface: Box<dyn MediaSessionSurface>,
) -> (SessionHandle, JoinHandle<()>) {
    let (events, _) = events::channel();
    let (controller, completions) = SessionController::new(
        SessionSettings::from(config),
        backend,
        sink,
        store,
        MediaSessionBridge::new(surface),
        events.clone(),
    );
    let (runtime, handle) =
        SessionRuntime::new(controller, completions, events, config.progress_interval());
    (handle, runtime.spawn())
}
