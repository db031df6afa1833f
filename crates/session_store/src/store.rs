//! Visitor identity and active-session pointer

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::Mutex;

use widget_core::constants::storage_keys;

use crate::kv::KeyValueStore;

/// Durable per-device identity and session pointer.
///
/// All operations absorb backend failures: reads yield `None`, writes
/// become no-ops. The in-memory chat flow must never die on storage.
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    // Serializes get-or-create so a second concurrent caller observes the
    // first caller's generated id instead of minting its own.
    create_guard: Mutex<()>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            create_guard: Mutex::new(()),
        }
    }

    /// Read the persisted visitor id, generating and persisting one on
    /// first use. The id is immutable once created.
    pub async fn get_or_create_visitor_id(&self) -> String {
        let _guard = self.create_guard.lock().await;

        if let Some(id) = self.read(storage_keys::VISITOR_ID).await {
            return id;
        }

        let id = generate_visitor_id();
        self.write(storage_keys::VISITOR_ID, &id).await;
        id
    }

    pub async fn visitor_id(&self) -> Option<String> {
        self.read(storage_keys::VISITOR_ID).await
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.read(storage_keys::ACTIVE_SESSION_ID).await
    }

    pub async fn set_active_session_id(&self, session_id: Option<&str>) {
        match session_id {
            Some(id) => self.write(storage_keys::ACTIVE_SESSION_ID, id).await,
            None => self.clear_key(storage_keys::ACTIVE_SESSION_ID).await,
        }
    }

    /// Remove everything, including the visitor identity.
    pub async fn clear(&self) {
        self.clear_key(storage_keys::VISITOR_ID).await;
        self.clear_key(storage_keys::ACTIVE_SESSION_ID).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("storage read failed for {key}: {e}");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value).await {
            warn!("storage write failed for {key}: {e}");
        }
    }

    async fn clear_key(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            warn!("storage remove failed for {key}: {e}");
        }
    }
}

/// Collision-resistant visitor id: 8 random alphanumerics plus the current
/// millisecond timestamp in base 36.
fn generate_visitor_id() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("visitor_{random}{}", to_base36(millis))
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
