//! Shared application state, injected into every handler via `axum::extract::State`.

use tower_cookies::Key;

use crate::{config::Config, db::Db, session, uploads::UploadStore};

/// Application-wide state passed via axum `State<AppState>`.
///
/// Everything here is cheap to clone: `MySqlPool` is `Arc`-backed, `Key` is
/// 64 bytes, and `Config` holds only strings and primitives.
#[derive(Clone)]
pub struct AppState {
    pub pool:       Db,
    pub config:     Config,
    pub cookie_key: Key,
    pub uploads:    UploadStore,
}

impl AppState {
    pub fn new(pool: Db, config: Config) -> Self {
        let cookie_key = session::derive_key(&config.session_secret);
        let uploads = UploadStore::new(&config.upload_dir);
        Self { pool, config, cookie_key, uploads }
    }
}
