//! Realtime list synchronizer
//!
//! Keeps a [`ListSnapshot`] of one list current with the backend's change
//! stream. A single worker task per watched list owns the feed
//! subscription and applies, in order, the initial bulk fetch followed by
//! every notification.
//!
//! ```text
//! consumer ── switch_list(L) ──► worker(gen N)
//!                                 ├── subscribe(L)
//!                                 ├── fetch_items(L) ──► snapshot { items, loading: false }
//!                                 └── loop recv() ─────► snapshot (insert/update/delete)
//! consumer ◄── observe() ─────── watch::Receiver<ListSnapshot>
//! ```
//!
//! Every state change is checked against the worker's generation under the
//! state lock. `stop`, `switch_list` and drop bump the generation first, so
//! a worker that has been torn down can never touch observable state again,
//! and a new list never shares a snapshot with the previous one.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::ChangeEvent;
use super::mirror::ItemMirror;
use crate::backend::{Backend, RawChange};
use crate::config::Ordering;
use crate::types::{ListId, ListItem};

/// Immutable view of a synchronized list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSnapshot {
    /// The list being mirrored, `None` before the first `switch_list`
    pub list_id: Option<ListId>,
    /// Items in display order
    pub items: Arc<Vec<ListItem>>,
    /// True while the initial bulk fetch is outstanding
    pub loading: bool,
}

impl ListSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.label.as_str()).collect()
    }
}

struct State {
    generation: u64,
    list_id: Option<ListId>,
    mirror: ItemMirror,
    loading: bool,
}

impl State {
    fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            list_id: self.list_id.clone(),
            items: Arc::new(self.mirror.items().to_vec()),
            loading: self.loading,
        }
    }
}

struct Shared {
    state: Mutex<State>,
    tx: watch::Sender<ListSnapshot>,
}

impl Shared {
    /// Run `f` only if `generation` is still current, publishing a new
    /// snapshot when it reports a change.
    fn update(&self, generation: u64, f: impl FnOnce(&mut State) -> bool) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        let changed = f(&mut state);
        if changed {
            self.tx.send_replace(state.snapshot());
        }
        changed
    }

    /// Start a new generation, discarding the mirrored items
    fn reset(&self, list_id: Option<ListId>, loading: bool) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.list_id = list_id;
        state.mirror.clear();
        state.loading = loading;
        self.tx.send_replace(state.snapshot());
        state.generation
    }

    /// Retire the current generation without touching the snapshot
    fn retire(&self) {
        self.state.lock().generation += 1;
    }
}

struct Worker {
    list_id: ListId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps one list's items in sync with the backend.
///
/// Watching starts with [`switch_list`](Self::switch_list) and ends with
/// [`stop`](Self::stop), [`shutdown`](Self::shutdown) or drop. Both spawn
/// onto the current Tokio runtime and return immediately.
pub struct ListSynchronizer {
    backend: Arc<dyn Backend>,
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl ListSynchronizer {
    /// An idle synchronizer that is not watching any list yet
    pub fn new(backend: Arc<dyn Backend>, ordering: Ordering) -> Self {
        let state = State {
            generation: 0,
            list_id: None,
            mirror: ItemMirror::new(ordering),
            loading: false,
        };
        let (tx, _rx) = watch::channel(state.snapshot());
        Self {
            backend,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                tx,
            }),
            worker: None,
        }
    }

    /// Start watching `list_id` right away
    pub fn watch(backend: Arc<dyn Backend>, list_id: ListId, ordering: Ordering) -> Self {
        let mut sync = Self::new(backend, ordering);
        sync.switch_list(list_id);
        sync
    }

    /// Watch a different list.
    ///
    /// The previous list's state is discarded before this returns; the new
    /// list starts empty with `loading == true` until its fetch resolves.
    pub fn switch_list(&mut self, list_id: ListId) {
        self.stop_worker();

        let generation = self.shared.reset(Some(list_id.clone()), true);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(
            self.backend.clone(),
            self.shared.clone(),
            generation,
            list_id.clone(),
            cancel.clone(),
        ));
        info!(%list_id, generation, "Watching list");

        self.worker = Some(Worker {
            list_id,
            cancel,
            handle,
        });
    }

    /// Stop watching. The last snapshot stays readable but never changes
    /// again.
    pub fn stop(&mut self) {
        self.stop_worker();
    }

    /// Stop watching and wait until the feed subscription has been released.
    pub async fn shutdown(mut self) {
        if let Some(worker) = self.take_worker() {
            if let Err(e) = worker.handle.await {
                if !e.is_cancelled() {
                    warn!(list_id = %worker.list_id, error = %e, "Sync worker failed");
                }
            }
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ListSnapshot {
        self.shared.tx.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn observe(&self) -> watch::Receiver<ListSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Wait until the initial fetch of the current list has resolved
    pub async fn wait_loaded(&self) -> ListSnapshot {
        let mut rx = self.observe();
        let loaded = match rx.wait_for(|snapshot| !snapshot.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        loaded
    }

    /// The list being watched, if any
    pub fn list_id(&self) -> Option<&ListId> {
        self.worker.as_ref().map(|w| &w.list_id)
    }

    pub fn is_watching(&self) -> bool {
        self.worker.is_some()
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.take_worker() {
            debug!(list_id = %worker.list_id, "Stopping list watch");
        }
    }

    fn take_worker(&mut self) -> Option<Worker> {
        let worker = self.worker.take()?;
        self.shared.retire();
        worker.cancel.cancel();
        Some(worker)
    }
}

impl Drop for ListSynchronizer {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

async fn run_worker(
    backend: Arc<dyn Backend>,
    shared: Arc<Shared>,
    generation: u64,
    list_id: ListId,
    cancel: CancellationToken,
) {
    let subscription = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = backend.subscribe(&list_id) => result,
    };
    // Fetch failures below still return through here, dropping (and so
    // releasing) the subscription.
    let subscription = match subscription {
        Ok(sub) => Some(sub),
        Err(e) => {
            warn!(%list_id, error = %e, "Change feed subscription failed");
            None
        }
    };

    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = backend.fetch_items(&list_id) => result,
    };
    match fetched {
        Ok(rows) => {
            let count = rows.len();
            shared.update(generation, |state| {
                state.mirror.load(rows);
                state.loading = false;
                true
            });
            debug!(%list_id, count, "Initial fetch complete");
        }
        Err(e) => {
            warn!(%list_id, error = %e, "Initial fetch failed");
            shared.update(generation, |state| {
                state.loading = false;
                true
            });
        }
    }

    let Some(mut subscription) = subscription else {
        return;
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = subscription.recv() => match next {
                Some(raw) => apply_raw(&shared, generation, &list_id, &raw),
                None => {
                    warn!(%list_id, "Change feed closed");
                    break;
                }
            },
        }
    }

    subscription.unsubscribe();
    debug!(%list_id, generation, "Sync worker finished");
}

fn apply_raw(shared: &Shared, generation: u64, list_id: &ListId, raw: &RawChange) {
    let event = match ChangeEvent::from_raw(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!(%list_id, event = %raw.event_type, error = %e, "Ignoring malformed change");
            return;
        }
    };
    if let Some(item) = event.item() {
        if &item.list_id != list_id {
            debug!(%list_id, other = %item.list_id, "Ignoring change for another list");
            return;
        }
    }

    let applied = shared.update(generation, |state| state.mirror.apply(&event));
    debug!(%list_id, kind = event.kind(), item_id = %event.item_id(), applied, "Change received");
}
