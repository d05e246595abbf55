//! Per-widget scheduler lifecycle.
//!
//! A [`SchedulerHandle`] creates at most one worker per [`TimerId`], forwards
//! control messages and delivers ticks to a handler through a
//! [`Subscription`]. The handler can be swapped while ticks are flowing: the
//! swap happens under the same lock the dispatcher holds while delivering, so
//! every tick reaches exactly one handler. Destroying a worker closes its
//! subscription before anything else, and a closed subscription drops ticks
//! that were already queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use super::worker::TickScheduler;
use super::{Control, StartRequest, TickMessage, TickSettings};
use crate::lock;
use crate::timer::TimerId;

/// Receives the ticks of one scheduler.
pub type TickHandler = Box<dyn FnMut(TickMessage) + Send + 'static>;

/// Identifies one binding of a handler to a scheduler. A rebind produces a
/// token with a higher version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken {
    pub id: TimerId,
    pub version: u64,
}

struct Subscription {
    closed: AtomicBool,
    version: AtomicU64,
    handler: Mutex<Option<TickHandler>>,
}

impl Subscription {
    fn new(handler: TickHandler) -> Self {
        Self {
            closed: AtomicBool::new(false),
            version: AtomicU64::new(1),
            handler: Mutex::new(Some(handler)),
        }
    }

    /// Returns false once the subscription is closed.
    fn deliver(&self, tick: TickMessage) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut slot = lock(&self.handler);
        // Closed while waiting for the lock.
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        if let Some(handler) = slot.as_mut() {
            handler(tick);
        }
        true
    }

    fn rebind(&self, handler: TickHandler) -> u64 {
        let previous = {
            let mut slot = lock(&self.handler);
            slot.replace(handler)
        };
        drop(previous);
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

struct WorkerSlot {
    control: UnboundedSender<Control>,
    subscription: Arc<Subscription>,
    worker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl WorkerSlot {
    fn shut_down(self) {
        self.subscription.close();
        let _ = self.control.send(Control::Stop);
        self.worker.abort();
        self.dispatcher.abort();
    }
}

/// Owns the workers created on behalf of one widget.
pub struct SchedulerHandle {
    runtime: Handle,
    settings: TickSettings,
    slots: Mutex<HashMap<TimerId, WorkerSlot>>,
}

impl SchedulerHandle {
    pub fn new(runtime: Handle, settings: TickSettings) -> Self {
        Self {
            runtime,
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Create the worker for `request.id` and bind `handler` to it. Returns
    /// `None` without touching anything when a worker for that id is live.
    pub fn init_worker(
        &self,
        request: StartRequest,
        handler: TickHandler,
    ) -> Option<SubscriptionToken> {
        let mut slots = lock(&self.slots);
        if slots.contains_key(&request.id) {
            tracing::debug!(id = %request.id, "scheduler already live");
            return None;
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
        let interval = self.settings.interval_for(request.mode);
        let worker = self
            .runtime
            .spawn(TickScheduler::new(request, interval).run(control_rx, tick_tx));

        let subscription = Arc::new(Subscription::new(handler));
        let dispatcher = self.runtime.spawn({
            let subscription = Arc::clone(&subscription);
            async move {
                while let Some(tick) = tick_rx.recv().await {
                    if !subscription.deliver(tick) {
                        break;
                    }
                }
            }
        });

        let token = SubscriptionToken {
            id: request.id,
            version: subscription.version(),
        };
        slots.insert(
            request.id,
            WorkerSlot {
                control: control_tx,
                subscription,
                worker,
                dispatcher,
            },
        );
        Some(token)
    }

    /// Swap the handler of a live worker. The previous handler is detached
    /// before the new one can receive anything.
    pub fn rebind(&self, id: TimerId, handler: TickHandler) -> Option<SubscriptionToken> {
        // Never hold the slot table while waiting on a subscription: the
        // handler being replaced may itself be calling into this handle.
        let subscription = lock(&self.slots)
            .get(&id)
            .map(|slot| Arc::clone(&slot.subscription))?;
        let version = subscription.rebind(handler);
        Some(SubscriptionToken { id, version })
    }

    /// Current binding of a live worker.
    pub fn token(&self, id: TimerId) -> Option<SubscriptionToken> {
        lock(&self.slots).get(&id).map(|slot| SubscriptionToken {
            id,
            version: slot.subscription.version(),
        })
    }

    /// Replace the remaining countdown without restarting the schedule.
    pub fn update_duration(&self, id: TimerId, duration: i64) -> bool {
        match lock(&self.slots).get(&id) {
            Some(slot) => slot.control.send(Control::UpdateDuration(duration)).is_ok(),
            None => false,
        }
    }

    /// Tear down the worker for `id`. Safe on an id with no worker.
    pub fn destroy_worker(&self, id: TimerId) -> bool {
        let slot = lock(&self.slots).remove(&id);
        match slot {
            Some(slot) => {
                slot.shut_down();
                tracing::debug!(%id, "scheduler destroyed");
                true
            }
            None => false,
        }
    }

    pub fn destroy_workers(&self) {
        let slots: Vec<WorkerSlot> = lock(&self.slots).drain().map(|(_, s)| s).collect();
        for slot in slots {
            slot.shut_down();
        }
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        lock(&self.slots).contains_key(&id)
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.destroy_workers();
    }
}
