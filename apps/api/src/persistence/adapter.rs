//! Persistence Adapter: remote store first, local store on any failure.
//!
//! Once a remote operation fails for a session, that session is marked
//! local-only and every later read/write for it goes to the local store.
//! Failures are logged, never surfaced to the caller's critical path.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::models::Message;
use crate::conversation::transcripts::StageTranscripts;
use crate::persistence::keys::{
    chat_history_key, scoped, CURRENT_STAGE_KEY, SESSION_ID_KEY, USER_ID_KEY, WHITEBOARD_KEY,
};
use crate::persistence::{KvStore, StoreError};
use crate::stages::Stage;
use crate::whiteboard::models::Whiteboard;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHint {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// Transcript of `current_stage`.
    pub messages: Vec<Message>,
    /// Every stage's transcript in stage order, with boundary markers.
    pub all_history: Vec<Message>,
    pub whiteboard: Whiteboard,
    pub current_stage: Stage,
    pub use_local_storage: bool,
}

impl SessionSnapshot {
    /// What callers get when the remote store is unreachable and nothing is
    /// held locally: the client keeps using its own storage.
    pub fn local_default() -> Self {
        Self {
            user_id: None,
            session_id: None,
            messages: Vec::new(),
            all_history: Vec::new(),
            whiteboard: Whiteboard::default(),
            current_stage: Stage::FIRST,
            use_local_storage: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SaveKind {
    Whiteboard(Whiteboard),
    Stage(Stage),
    Messages { stage: Stage, messages: Vec<Message> },
    UserId(String),
}

impl SaveKind {
    fn key(&self) -> String {
        match self {
            SaveKind::Whiteboard(_) => WHITEBOARD_KEY.to_string(),
            SaveKind::Stage(_) => CURRENT_STAGE_KEY.to_string(),
            SaveKind::Messages { stage, .. } => chat_history_key(*stage),
            SaveKind::UserId(_) => USER_ID_KEY.to_string(),
        }
    }

    fn to_value(&self) -> Result<Value, StoreError> {
        Ok(match self {
            SaveKind::Whiteboard(wb) => serde_json::to_value(wb)?,
            SaveKind::Stage(stage) => json!(stage.id()),
            SaveKind::Messages { messages, .. } => serde_json::to_value(messages)?,
            SaveKind::UserId(id) => json!(id),
        })
    }
}

struct StoredSession {
    user_id: Option<String>,
    whiteboard: Option<Whiteboard>,
    stage: Option<Stage>,
    transcripts: StageTranscripts,
}

impl StoredSession {
    fn has_data(&self) -> bool {
        self.user_id.is_some()
            || self.whiteboard.is_some()
            || self.stage.is_some()
            || !self.transcripts.is_empty()
    }
}

pub struct PersistenceAdapter {
    remote: Option<Arc<dyn KvStore>>,
    local: Arc<dyn KvStore>,
    local_only: Mutex<HashSet<String>>,
    /// Serializes whiteboard read-modify-write cycles within this process.
    whiteboard_lock: tokio::sync::Mutex<()>,
    /// Same for transcript appends.
    history_lock: tokio::sync::Mutex<()>,
}

impl PersistenceAdapter {
    pub fn new(remote: Option<Arc<dyn KvStore>>, local: Arc<dyn KvStore>) -> Self {
        Self {
            remote,
            local,
            local_only: Mutex::new(HashSet::new()),
            whiteboard_lock: tokio::sync::Mutex::new(()),
            history_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn is_local_only(&self, session_id: &str) -> bool {
        self.remote.is_none()
            || self
                .local_only
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(session_id)
    }

    fn mark_local_only(&self, session_id: &str) {
        let newly_marked = self
            .local_only
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string());
        if newly_marked {
            warn!("Session {session_id} switched to local storage");
        }
    }

    fn remote_for(&self, session_id: &str) -> Option<&Arc<dyn KvStore>> {
        if self.is_local_only(session_id) {
            None
        } else {
            self.remote.as_ref()
        }
    }

    async fn read(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let scoped_key = scoped(session_id, key);
        if let Some(remote) = self.remote_for(session_id) {
            match remote.get(&scoped_key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Remote read of {scoped_key} failed: {e}");
                    self.mark_local_only(session_id);
                }
            }
        }
        self.local.get(&scoped_key).await
    }

    async fn write(&self, session_id: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let scoped_key = scoped(session_id, key);
        if let Some(remote) = self.remote_for(session_id) {
            match remote.set(&scoped_key, value.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Remote write of {scoped_key} failed: {e}");
                    self.mark_local_only(session_id);
                }
            }
        }
        self.local.set(&scoped_key, value).await
    }

    // ────────────────────────────────────────────────────────────────────────
    // Load
    // ────────────────────────────────────────────────────────────────────────

    /// Re-associates a client with its stored session, creating one when no
    /// session id is given. Never fails.
    pub async fn load(&self, hint: &SessionHint) -> SessionSnapshot {
        let remote = match (&self.remote, hint.session_id.as_deref()) {
            (Some(_), Some(sid)) if self.is_local_only(sid) => None,
            (remote, _) => remote.clone(),
        };

        let Some(remote) = remote else {
            // Local store is primary: no remote configured, or the session already fell back.
            return match self.load_from(self.local.as_ref(), hint, true).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Local load failed: {e}");
                    SessionSnapshot::local_default()
                }
            };
        };

        match self.load_from(remote.as_ref(), hint, false).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Remote load failed, falling back to local storage: {e}");
                let Some(sid) = hint.session_id.as_deref() else {
                    return SessionSnapshot::local_default();
                };
                self.mark_local_only(sid);
                match read_session(self.local.as_ref(), sid).await {
                    Ok(stored) if stored.has_data() => {
                        snapshot_from(stored, sid, hint.user_id.clone(), true)
                    }
                    _ => SessionSnapshot::local_default(),
                }
            }
        }
    }

    async fn load_from(
        &self,
        store: &dyn KvStore,
        hint: &SessionHint,
        use_local_storage: bool,
    ) -> Result<SessionSnapshot, StoreError> {
        if let Some(sid) = hint.session_id.as_deref() {
            let stored = read_session(store, sid).await?;
            return Ok(snapshot_from(stored, sid, hint.user_id.clone(), use_local_storage));
        }

        let session_id = Uuid::new_v4().to_string();
        let user_id = hint
            .user_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        store
            .set(&scoped(&session_id, USER_ID_KEY), json!(user_id))
            .await?;
        store
            .set(&scoped(&session_id, SESSION_ID_KEY), json!(session_id))
            .await?;
        store
            .set(&scoped(&session_id, CURRENT_STAGE_KEY), json!(Stage::FIRST.id()))
            .await?;
        info!("Created session {session_id} for user {user_id}");

        Ok(SessionSnapshot {
            user_id: Some(user_id),
            session_id: Some(session_id),
            messages: Vec::new(),
            all_history: Vec::new(),
            whiteboard: Whiteboard::default(),
            current_stage: Stage::FIRST,
            use_local_storage,
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Save
    // ────────────────────────────────────────────────────────────────────────

    /// Fire-and-forget save. Failures are logged.
    pub fn save(self: &Arc<Self>, session_id: impl Into<String>, kind: SaveKind) {
        let adapter = Arc::clone(self);
        let session_id = session_id.into();
        tokio::spawn(async move {
            if let Err(e) = adapter.save_now(&session_id, kind).await {
                warn!("Failed to save session {session_id}: {e}");
            }
        });
    }

    pub async fn save_now(&self, session_id: &str, kind: SaveKind) -> Result<(), StoreError> {
        let value = kind.to_value()?;
        self.write(session_id, &kind.key(), value).await
    }

    pub async fn load_whiteboard(&self, session_id: &str) -> Whiteboard {
        match self.read(session_id, WHITEBOARD_KEY).await {
            Ok(Some(value)) => decode_or_default(value, "whiteboard"),
            Ok(None) => Whiteboard::default(),
            Err(e) => {
                warn!("Failed to load whiteboard for session {session_id}: {e}");
                Whiteboard::default()
            }
        }
    }

    /// Read-modify-write of the stored whiteboard. Returns the new document,
    /// even when saving it failed.
    pub async fn update_whiteboard<F>(&self, session_id: &str, update: F) -> Whiteboard
    where
        F: FnOnce(&Whiteboard) -> Whiteboard,
    {
        let _guard = self.whiteboard_lock.lock().await;
        let current = self.load_whiteboard(session_id).await;
        let next = update(&current);
        if next != current {
            if let Err(e) = self
                .save_now(session_id, SaveKind::Whiteboard(next.clone()))
                .await
            {
                warn!("Failed to save whiteboard for session {session_id}: {e}");
            }
        }
        next
    }

    pub async fn load_messages(&self, session_id: &str, stage: Stage) -> Vec<Message> {
        match self.read(session_id, &chat_history_key(stage)).await {
            Ok(Some(value)) => decode_or_default(value, "chat history"),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load {stage} history for session {session_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Appends to one stage's transcript.
    pub async fn append_messages(&self, session_id: &str, stage: Stage, new_messages: &[Message]) {
        let _guard = self.history_lock.lock().await;
        let mut messages = self.load_messages(session_id, stage).await;
        messages.extend_from_slice(new_messages);
        if let Err(e) = self
            .save_now(session_id, SaveKind::Messages { stage, messages })
            .await
        {
            warn!("Failed to append {stage} history for session {session_id}: {e}");
        }
    }
}

async fn read_session(store: &dyn KvStore, session_id: &str) -> Result<StoredSession, StoreError> {
    let user_id = store
        .get(&scoped(session_id, USER_ID_KEY))
        .await?
        .and_then(|v| v.as_str().map(str::to_string));
    let whiteboard = store
        .get(&scoped(session_id, WHITEBOARD_KEY))
        .await?
        .map(|v| decode_or_default::<Whiteboard>(v, "whiteboard"));
    let stage = store
        .get(&scoped(session_id, CURRENT_STAGE_KEY))
        .await?
        .and_then(|v| v.as_str().and_then(|s| s.parse::<Stage>().ok()));
    let mut transcripts = StageTranscripts::default();
    for each in Stage::ALL {
        if let Some(value) = store.get(&scoped(session_id, &chat_history_key(each))).await? {
            transcripts.extend(each, decode_or_default::<Vec<Message>>(value, "chat history"));
        }
    }
    Ok(StoredSession {
        user_id,
        whiteboard,
        stage,
        transcripts,
    })
}

fn snapshot_from(
    stored: StoredSession,
    session_id: &str,
    user_hint: Option<String>,
    use_local_storage: bool,
) -> SessionSnapshot {
    let current_stage = stored.stage.unwrap_or(Stage::FIRST);
    SessionSnapshot {
        user_id: stored.user_id.or(user_hint),
        session_id: Some(session_id.to_string()),
        messages: stored.transcripts.get(current_stage).to_vec(),
        all_history: stored.transcripts.all_history(),
        whiteboard: stored.whiteboard.unwrap_or_default(),
        current_stage,
        use_local_storage,
    }
}

fn decode_or_default<T: serde::de::DeserializeOwned + Default>(value: Value, what: &str) -> T {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Stored {what} could not be decoded, using empty value: {e}");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use crate::test_support::FailingStore;

    fn adapter_with(remote: Option<Arc<dyn KvStore>>) -> Arc<PersistenceAdapter> {
        Arc::new(PersistenceAdapter::new(
            remote,
            Arc::new(MemoryStore::default()),
        ))
    }

    #[tokio::test]
    async fn test_failing_remote_load_returns_local_default() {
        let adapter = adapter_with(Some(Arc::new(FailingStore)));
        let snapshot = adapter
            .load(&SessionHint {
                user_id: None,
                session_id: Some("s-1".into()),
            })
            .await;
        assert_eq!(snapshot, SessionSnapshot::local_default());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            json!({
                "userId": null,
                "sessionId": null,
                "messages": [],
                "allHistory": [],
                "whiteboard": {},
                "currentStage": "career_planning",
                "useLocalStorage": true
            })
        );
        assert!(adapter.is_local_only("s-1"));
    }

    #[tokio::test]
    async fn test_failing_remote_without_hint_returns_local_default() {
        let adapter = adapter_with(Some(Arc::new(FailingStore)));
        let snapshot = adapter.load(&SessionHint::default()).await;
        assert_eq!(snapshot, SessionSnapshot::local_default());
    }

    #[tokio::test]
    async fn test_remote_load_creates_then_restores_session() {
        let adapter = adapter_with(Some(Arc::new(MemoryStore::default())));
        let created = adapter.load(&SessionHint::default()).await;
        assert!(!created.use_local_storage);
        let sid = created.session_id.clone().unwrap();

        let wb = Whiteboard {
            intent_role: Some("产品经理".into()),
            ..Default::default()
        };
        adapter
            .save_now(&sid, SaveKind::Whiteboard(wb.clone()))
            .await
            .unwrap();
        adapter
            .save_now(&sid, SaveKind::Stage(Stage::ProjectReview))
            .await
            .unwrap();
        adapter
            .append_messages(&sid, Stage::ProjectReview, &[Message::user("hi")])
            .await;

        let restored = adapter
            .load(&SessionHint {
                user_id: None,
                session_id: Some(sid.clone()),
            })
            .await;
        assert_eq!(restored.user_id, created.user_id);
        assert_eq!(restored.whiteboard, wb);
        assert_eq!(restored.current_stage, Stage::ProjectReview);
        assert_eq!(restored.messages.len(), 1);
        // Boundary marker plus the one message.
        assert_eq!(restored.all_history.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_remote_save_falls_back_and_sticks() {
        let adapter = adapter_with(Some(Arc::new(FailingStore)));
        let wb = Whiteboard {
            key_skills: vec!["SQL".into()],
            ..Default::default()
        };
        adapter
            .save_now("s-2", SaveKind::Whiteboard(wb.clone()))
            .await
            .unwrap();
        assert!(adapter.is_local_only("s-2"));
        assert_eq!(adapter.load_whiteboard("s-2").await, wb);

        let snapshot = adapter
            .load(&SessionHint {
                user_id: None,
                session_id: Some("s-2".into()),
            })
            .await;
        assert!(snapshot.use_local_storage);
        assert_eq!(snapshot.whiteboard, wb);
    }

    #[tokio::test]
    async fn test_without_remote_sessions_live_locally() {
        let adapter = adapter_with(None);
        let snapshot = adapter.load(&SessionHint::default()).await;
        assert!(snapshot.use_local_storage);
        assert!(snapshot.session_id.is_some());
    }

    #[tokio::test]
    async fn test_update_whiteboard_applies_and_persists() {
        let adapter = adapter_with(Some(Arc::new(MemoryStore::default())));
        let next = adapter
            .update_whiteboard("s-3", |wb| Whiteboard {
                intent_role: Some("运营".into()),
                ..wb.clone()
            })
            .await;
        assert_eq!(next.intent_role.as_deref(), Some("运营"));
        assert_eq!(adapter.load_whiteboard("s-3").await, next);
    }

    #[tokio::test]
    async fn test_fire_and_forget_save_lands() {
        let adapter = adapter_with(Some(Arc::new(MemoryStore::default())));
        adapter.save("s-4", SaveKind::Stage(Stage::Offer));
        // Let the spawned save run.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let snapshot = adapter
            .load(&SessionHint {
                user_id: None,
                session_id: Some("s-4".into()),
            })
            .await;
        assert_eq!(snapshot.current_stage, Stage::Offer);
    }
}
