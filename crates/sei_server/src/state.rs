use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use sei_core::service::registro_service::{LogNotifier, Notifier};

use super::{
    config::Config,
    error::{AppError, AppResult},
    storage::{BlobStore, FsBlobStore},
};

/// Shared, cheaply clonable request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    db: Arc<Mutex<Connection>>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: SharedNotifier,
}

impl AppState {
    pub fn new(config: Config, conn: Connection) -> Self {
        let blobs = Arc::new(FsBlobStore::new(config.upload_dir.clone(), "/uploads"));
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(conn)),
            blobs,
            notifier: SharedNotifier(Arc::new(LogNotifier)),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        self.notifier = SharedNotifier(notifier);
        self
    }

    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = blobs;
        self
    }

    /// Runs `job` against the database on the blocking pool.
    pub async fn db<T, F>(&self, job: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock();
            job(&conn)
        })
        .await
        .map_err(AppError::from)?
    }
}

/// Clonable handle that lets services own a notifier.
#[derive(Clone)]
pub struct SharedNotifier(pub Arc<dyn Notifier + Send + Sync>);

impl Notifier for SharedNotifier {
    fn enviar_codigo(&self, correo: &str, nombre: &str, codigo: &str) -> Result<(), String> {
        self.0.enviar_codigo(correo, nombre, codigo)
    }
}
