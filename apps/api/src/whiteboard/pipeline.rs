//! Debounced extraction: transcript → extractor → merge → persist.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::conversation::models::Message;
use crate::llm_client::{Completer, CompletionOptions};
use crate::persistence::adapter::PersistenceAdapter;
use crate::stages::Stage;
use crate::whiteboard::extractor::extract_whiteboard;
use crate::whiteboard::merge::merge_whiteboard;
use crate::whiteboard::models::Whiteboard;

#[derive(Default)]
struct DebounceState {
    next_generation: u64,
    pending: HashMap<String, (u64, JoinHandle<()>)>,
}

/// Trailing-edge debouncer keyed by session: scheduling a job for a key
/// cancels that key's job if it has not started yet.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn schedule<F>(&self, key: impl Into<String>, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let generation = state.next_generation;
        state.next_generation += 1;

        let shared = Arc::clone(&self.state);
        let delay = self.delay;
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
                match state.pending.get(&task_key) {
                    Some((current, _)) if *current == generation => {
                        state.pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            // Once started, a job is no longer cancellable by newer schedules.
            job.await;
        });

        if let Some((_, previous)) = state.pending.insert(key, (generation, handle)) {
            previous.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .len()
    }

    /// Drops every pending timer. In-flight jobs are left to finish.
    pub fn cancel_all(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for (_, (_, handle)) in state.pending.drain() {
            handle.abort();
        }
    }
}

/// One extraction pass for a session: extract, merge into the stored whiteboard, save.
pub async fn run_extraction_pass(
    completer: Arc<dyn Completer>,
    options: CompletionOptions,
    persistence: Arc<PersistenceAdapter>,
    session_id: String,
    stage: Stage,
    transcript: Vec<Message>,
) -> Whiteboard {
    let patch = extract_whiteboard(completer.as_ref(), &options, stage, &transcript).await;
    if patch.is_empty() {
        debug!("Extraction for session {session_id} ({stage}) found nothing new");
        return persistence.load_whiteboard(&session_id).await;
    }
    let merged = persistence
        .update_whiteboard(&session_id, |previous| merge_whiteboard(previous, &patch))
        .await;
    info!("Whiteboard updated for session {session_id} from {stage}");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::persistence::memory::MemoryStore;
    use crate::test_support::{extraction_options, ScriptedCompleter};

    #[tokio::test(start_paused = true)]
    async fn test_only_trailing_job_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=3 {
            let runs = Arc::clone(&runs);
            let last = Arc::clone(&last);
            debouncer.schedule("session-a", async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let runs = Arc::new(AtomicUsize::new(0));
        for key in ["a", "b"] {
            let runs = Arc::clone(&runs);
            debouncer.schedule(key, async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_clears_pending_timers() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        debouncer.schedule("a", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel_all();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test]
    async fn test_extraction_pass_merges_into_stored_whiteboard() {
        let completer: Arc<dyn Completer> = Arc::new(ScriptedCompleter::new(|_, _| {
            Ok(r#"{"intentRole": "产品经理", "keySkills": ["需求分析"]}"#.to_string())
        }));
        let persistence = Arc::new(PersistenceAdapter::new(
            Some(Arc::new(MemoryStore::default())),
            Arc::new(MemoryStore::default()),
        ));
        let transcript = vec![Message::user("我想找产品经理的工作")];

        for _ in 0..2 {
            run_extraction_pass(
                Arc::clone(&completer),
                extraction_options(),
                Arc::clone(&persistence),
                "s".into(),
                Stage::CareerPlanning,
                transcript.clone(),
            )
            .await;
        }

        let stored = persistence.load_whiteboard("s").await;
        assert_eq!(stored.intent_role.as_deref(), Some("产品经理"));
        assert_eq!(stored.key_skills, vec!["需求分析".to_string()]);
    }
}
