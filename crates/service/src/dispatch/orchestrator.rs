//! Latest-wins dispatch: one worker slot per category, a new intent cancels
//! the worker currently occupying its slot.
//!
//! The process-wide loading flag is written by whichever worker last started
//! or finished. It is not reference counted across categories, so two
//! overlapping categories can clear it while one of them is still running.
//!
//! A worker commits its lease once the backend call resolves. Cancelling a
//! committed worker does not undo it: its effects and its own
//! `SetLoading(false)` still follow, in that order.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::ApiService;
use crate::dispatch::events::{EventSink, Notification, UiEvent};
use crate::dispatch::handler::Handler;
use crate::dispatch::intent::{Category, Intent};
use crate::errors::DispatchError;
use crate::observability::{
    WORKERS_FAILED_TOTAL, WORKERS_STARTED_TOTAL, WORKERS_SUCCEEDED_TOTAL, WORKERS_SUPERSEDED_TOTAL,
    WORKER_DURATION,
};
use crate::pagination::ListDefaults;

/// 进程级状态：仅持有 loading 标志
#[derive(Debug, Default)]
pub struct OrchestrationState {
    loading: AtomicBool,
}

impl OrchestrationState {
    pub fn is_loading(&self) -> bool { self.loading.load(Ordering::Acquire) }
}

const ACTIVE: u8 = 0;
const COMMITTED: u8 = 1;
const RELEASED: u8 = 2;

/// One worker's hold on the loading flag. Released exactly once, either by
/// the worker on exit or by whoever cancels it before the worker commits.
struct LoadingLease {
    sink: Arc<dyn EventSink>,
    state: Arc<OrchestrationState>,
    phase: AtomicU8,
}

impl LoadingLease {
    fn acquire(sink: Arc<dyn EventSink>, state: Arc<OrchestrationState>) -> Arc<Self> {
        state.loading.store(true, Ordering::Release);
        sink.emit(UiEvent::SetLoading(true));
        Arc::new(Self { sink, state, phase: AtomicU8::new(ACTIVE) })
    }

    /// worker 在产生副作用前认领；已被取消则返回 false
    fn commit(&self) -> bool {
        self.phase.compare_exchange(ACTIVE, COMMITTED, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// 取消方调用。已认领的 worker 会自行走完副作用并释放，这里不再插手
    fn revoke(&self) -> bool {
        if self.phase.compare_exchange(ACTIVE, RELEASED, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return false;
        }
        self.clear();
        true
    }

    fn release(&self) -> bool {
        if self.phase.swap(RELEASED, Ordering::AcqRel) == RELEASED {
            return false;
        }
        self.clear();
        true
    }

    fn clear(&self) {
        self.state.loading.store(false, Ordering::Release);
        self.sink.emit(UiEvent::SetLoading(false));
    }
}

/// Moved into the worker future; dropping the future (abort included)
/// releases the lease, then closes `done`.
struct LeaseGuard {
    lease: Arc<LoadingLease>,
    category: Category,
    worker_id: Uuid,
    _done: watch::Sender<()>,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!(category = %self.category, worker_id = %self.worker_id, "worker panicked");
        }
        self.lease.release();
    }
}

/// 槽位在 worker 结束后仍保留，直到被同类的下一个 worker 覆盖
struct Slot {
    worker_id: Uuid,
    lease: Arc<LoadingLease>,
    handle: JoinHandle<()>,
    done: watch::Receiver<()>,
}

impl Slot {
    /// 取消：先释放 loading，再中止任务
    fn cancel(&self, category: Category, reason: &'static str) {
        if self.handle.is_finished() {
            return;
        }
        if self.lease.revoke() {
            WORKERS_SUPERSEDED_TOTAL.inc();
            debug!(%category, worker_id = %self.worker_id, reason, "worker cancelled");
        } else {
            debug!(%category, worker_id = %self.worker_id, reason, "worker already committed");
        }
        self.handle.abort();
    }

    /// `done` 的发送端随 worker future 一同销毁
    fn is_settled(&self) -> bool { self.done.has_changed().is_err() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    pub list_defaults: ListDefaults,
}

struct Inner {
    handlers: DashMap<Category, Arc<Handler>>,
    slots: DashMap<Category, Slot>,
    sink: Arc<dyn EventSink>,
    state: Arc<OrchestrationState>,
    options: OrchestratorOptions,
}

/// 异步调度中心
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_options(sink, OrchestratorOptions::default())
    }

    pub fn with_options(sink: Arc<dyn EventSink>, options: OrchestratorOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                handlers: DashMap::new(),
                slots: DashMap::new(),
                sink,
                state: Arc::new(OrchestrationState::default()),
                options,
            }),
        }
    }

    /// 注册全部内置模板
    pub fn with_api_service(service: Arc<dyn ApiService>, sink: Arc<dyn EventSink>) -> Self {
        let orchestrator = Self::new(sink);
        orchestrator.register_builtin(service);
        orchestrator
    }

    pub fn register_builtin(&self, service: Arc<dyn ApiService>) {
        for category in Category::ALL {
            self.register(category, Handler::builtin(category, Arc::clone(&service)));
        }
    }

    /// Binds `category` to `handler`, replacing any previous binding.
    pub fn register(&self, category: Category, handler: Handler) {
        if self.inner.handlers.insert(category, Arc::new(handler)).is_some() {
            debug!(%category, "handler replaced");
        }
    }

    pub fn is_loading(&self) -> bool { self.inner.state.is_loading() }

    /// Starts a worker for the intent, cancelling the one already running in its category.
    pub fn dispatch(&self, intent: Intent) -> Result<Uuid, DispatchError> {
        let category = intent.category();
        let handler = self
            .inner
            .handlers
            .get(&category)
            .map(|h| Arc::clone(h.value()))
            .ok_or(DispatchError::Unregistered(category))?;
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let worker_id = Uuid::new_v4();

        // 持有槽位锁完成 取消旧 worker -> 置 loading -> 启动新 worker，保证事件顺序
        match self.inner.slots.entry(category) {
            Entry::Occupied(mut occupied) => {
                occupied.get().cancel(category, "superseded");
                occupied.insert(self.spawn_worker(&runtime, handler, intent, worker_id));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.spawn_worker(&runtime, handler, intent, worker_id));
            }
        }
        Ok(worker_id)
    }

    fn spawn_worker(&self, runtime: &Handle, handler: Arc<Handler>, intent: Intent, worker_id: Uuid) -> Slot {
        let lease = LoadingLease::acquire(Arc::clone(&self.inner.sink), Arc::clone(&self.inner.state));
        let (done_tx, done) = watch::channel(());
        let guard = LeaseGuard { lease: Arc::clone(&lease), category: intent.category, worker_id, _done: done_tx };
        let sink = Arc::clone(&self.inner.sink);
        let defaults = self.inner.options.list_defaults;
        WORKERS_STARTED_TOTAL.inc();
        debug!(category = %intent.category, %worker_id, "worker started");
        let handle = runtime.spawn(run_worker(worker_id, handler, intent, guard, sink, defaults));
        Slot { worker_id, lease, handle, done }
    }

    /// Consumes an intent stream until every sender is dropped.
    pub async fn watch(&self, mut rx: mpsc::Receiver<Intent>) {
        while let Some(intent) = rx.recv().await {
            let category = intent.category();
            if let Err(e) = self.dispatch(intent) {
                warn!(%category, error = %e, "intent dropped");
            }
        }
        debug!("intent stream closed");
    }

    pub fn spawn_watcher(&self, capacity: usize) -> Result<(mpsc::Sender<Intent>, JoinHandle<()>), DispatchError> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let this = self.clone();
        let handle = runtime.spawn(async move { this.watch(rx).await });
        Ok((tx, handle))
    }

    /// 等待所有在途 worker 结束，包括等待期间新派发的
    pub async fn wait_idle(&self) {
        loop {
            // 槽位留在表中，等待期间到达的同类意图照常取消旧 worker
            let pending: Vec<watch::Receiver<()>> = self
                .inner
                .slots
                .iter()
                .filter(|slot| !slot.is_settled())
                .map(|slot| slot.done.clone())
                .collect();
            if pending.is_empty() {
                return;
            }
            for mut done in pending {
                while done.changed().await.is_ok() {}
            }
        }
    }

    /// 取消所有在途 worker 并等待其退出
    pub async fn shutdown(&self) {
        for slot in self.inner.slots.iter() {
            slot.cancel(*slot.key(), "shutdown");
        }
        self.wait_idle().await;
        info!(event = "orchestrator_shutdown", "all workers settled");
    }
}

async fn run_worker(
    worker_id: Uuid,
    handler: Arc<Handler>,
    intent: Intent,
    guard: LeaseGuard,
    sink: Arc<dyn EventSink>,
    defaults: ListDefaults,
) {
    let started = Instant::now();
    let Intent { category, payload, on_complete } = intent;

    let result = handler.operation.invoke(&payload).await;
    // 认领后取消方不再释放 loading，副作用必然先于本 worker 的 SetLoading(false)
    if !guard.lease.commit() {
        debug!(%category, %worker_id, "superseded after backend resolved");
        return;
    }

    match result.and_then(|outcome| handler.effect.events(&payload, outcome, defaults)) {
        Ok(events) => {
            for event in events {
                sink.emit(event);
            }
            if let Some(msg) = &handler.success_message {
                sink.emit(UiEvent::Notify(Notification::success(msg.to_string())));
            }
            if let Some(cb) = on_complete {
                cb();
            }
            WORKERS_SUCCEEDED_TOTAL.inc();
            info!(%category, %worker_id, elapsed_ms = started.elapsed().as_millis() as u64, "worker succeeded");
        }
        Err(e) => {
            error!(%category, %worker_id, error = %e, "{}", handler.failure_label);
            sink.emit(UiEvent::Notify(Notification::failure(handler.failure_notice(&e))));
            WORKERS_FAILED_TOTAL.inc();
        }
    }
    WORKER_DURATION.observe(started.elapsed().as_secs_f64());
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorder, Step};

    fn lease(rec: &Arc<Recorder>) -> (Arc<LoadingLease>, Arc<OrchestrationState>) {
        let state = Arc::new(OrchestrationState::default());
        (LoadingLease::acquire(rec.clone(), Arc::clone(&state)), state)
    }

    #[test]
    fn revoke_after_commit_leaves_release_to_the_worker() {
        let rec = Recorder::new();
        let (lease, state) = lease(&rec);

        assert!(lease.commit());
        assert!(!lease.revoke());
        assert!(state.is_loading());
        assert_eq!(rec.count(&Step::Event(UiEvent::SetLoading(false))), 0);

        assert!(lease.release());
        assert!(!lease.release());
        assert!(!state.is_loading());
        assert_eq!(rec.count(&Step::Event(UiEvent::SetLoading(false))), 1);
    }

    #[test]
    fn revoked_lease_cannot_be_committed() {
        let rec = Recorder::new();
        let (lease, state) = lease(&rec);

        assert!(lease.revoke());
        assert!(!lease.commit());
        assert!(!lease.release());
        assert!(!state.is_loading());
        assert_eq!(
            rec.steps(),
            vec![Step::Event(UiEvent::SetLoading(true)), Step::Event(UiEvent::SetLoading(false))]
        );
    }
}
