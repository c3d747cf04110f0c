#![forbid(unsafe_code)]

//! Thread-safe observable for multi-threaded hosts.
//!
//! [`SharedObservable<A>`] has the same contract as
//! [`Observable<A>`](crate::Observable) but keeps its registry behind a
//! single `Mutex`. The lock is held only while the registry is mutated or
//! snapshotted, never while a subscriber runs, so a subscriber may itself
//! subscribe, dispose, unsubscribe, or notify without deadlocking.
//!
//! Notifications issued concurrently from several threads each see their
//! own snapshot; ordering is guaranteed within one notify call only.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::channel::oneshot;
use tracing::{debug, debug_span, trace};

use crate::event::NotificationEvent;
use crate::handler::RefreshHook;
use crate::observable::{ObservableConfig, UNNAMED};
use crate::wait::NextNotification;

type SharedCallback<A> = Arc<dyn Fn(&mut NotificationEvent, &A) + Send + Sync>;

/// Recover from poisoning: a panicking subscriber never runs under the lock,
/// so the registry is consistent even if another thread panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A `Send + Sync` subscriber callback with stable identity.
///
/// The thread-safe counterpart of [`Handler`](crate::Handler).
pub struct SharedHandler<A> {
    callback: SharedCallback<A>,
}

impl<A> SharedHandler<A> {
    /// Wrap a closure as a handler.
    pub fn new(callback: impl Fn(&mut NotificationEvent, &A) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl<A> Clone for SharedHandler<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<A> PartialEq for SharedHandler<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<A> Eq for SharedHandler<A> {}

impl<A> fmt::Debug for SharedHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandler")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

trait SharedSlot: Send + Sync {
    fn dispose(&self);
    fn is_active(&self) -> bool;
}

struct SharedEntry<A> {
    handler: SharedHandler<A>,
    active: AtomicBool,
    owner: Weak<SharedInner<A>>,
}

impl<A> SharedSlot for SharedEntry<A> {
    fn dispose(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        let removed = {
            let mut subscribers = lock(&owner.subscribers);
            subscribers
                .iter()
                .position(|e| std::ptr::eq(Arc::as_ptr(e), self))
                .map(|idx| subscribers.remove(idx))
        };
        trace!(
            label = owner.label(),
            removed = removed.is_some(),
            "subscription disposed"
        );
        drop(removed);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

struct SharedInner<A> {
    label: Option<Cow<'static, str>>,
    subscribers: Mutex<Vec<Arc<SharedEntry<A>>>>,
    refresh: Mutex<Option<Arc<dyn RefreshHook + Send + Sync>>>,
}

impl<A> SharedInner<A> {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNNAMED)
    }
}

/// Handle to one registration on a [`SharedObservable`].
#[derive(Clone)]
pub struct SharedSubscription {
    slot: Weak<dyn SharedSlot>,
}

impl SharedSubscription {
    /// Remove exactly this subscription. Idempotent.
    pub fn dispose(&self) {
        if let Some(slot) = self.slot.upgrade() {
            slot.dispose();
        }
    }

    /// Whether the subscription will still receive notifications.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| slot.is_active())
    }
}

impl fmt::Debug for SharedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Thread-safe observable. Clones share the registry.
pub struct SharedObservable<A = ()> {
    inner: Arc<SharedInner<A>>,
}

impl<A> Clone for SharedObservable<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for SharedObservable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for SharedObservable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedObservable")
            .field("label", &self.inner.label())
            .field("subscriber_count", &lock(&self.inner.subscribers).len())
            .finish()
    }
}

impl<A: 'static> SharedObservable<A> {
    /// Create an observable with no subscribers and no refresh hook.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    /// Create an observable from config.
    #[must_use]
    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                label: config.label,
                subscribers: Mutex::new(Vec::new()),
                refresh: Mutex::new(None),
            }),
        }
    }

    /// Install or replace the post-notify refresh hook.
    pub fn set_refresh_hook(&self, hook: impl RefreshHook + Send + Sync + 'static) {
        *lock(&self.inner.refresh) = Some(Arc::new(hook));
    }

    /// Remove the refresh hook.
    pub fn clear_refresh_hook(&self) {
        lock(&self.inner.refresh).take();
    }

    /// The label from [`ObservableConfig`], or `"<unnamed>"`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Append `callback` to the subscriber list.
    ///
    /// Dropping the returned handle does not unsubscribe.
    pub fn subscribe(
        &self,
        callback: impl Fn(&mut NotificationEvent, &A) + Send + Sync + 'static,
    ) -> SharedSubscription {
        self.attach(|_| SharedHandler::new(callback))
    }

    /// Append a shared [`SharedHandler`]; may be registered more than once.
    pub fn subscribe_handler(&self, handler: &SharedHandler<A>) -> SharedSubscription {
        self.attach(|_| handler.clone())
    }

    /// One-shot subscriber: disposes itself before running `callback`.
    pub fn subscribe_once(
        &self,
        callback: impl FnOnce(&mut NotificationEvent, &A) + Send + 'static,
    ) -> SharedSubscription {
        self.attach(|this| {
            let this = this.clone();
            let callback = Mutex::new(Some(callback));
            SharedHandler::new(move |event, args| {
                if let Some(entry) = this.upgrade() {
                    entry.dispose();
                }
                let callback = lock(&callback).take();
                if let Some(callback) = callback {
                    callback(event, args);
                }
            })
        })
    }

    /// Remove every registration of `handler`.
    pub fn unsubscribe(&self, handler: &SharedHandler<A>) {
        let removed: Vec<Arc<SharedEntry<A>>> = {
            let mut subscribers = lock(&self.inner.subscribers);
            let (removed, kept) = std::mem::take(&mut *subscribers)
                .into_iter()
                .partition(|entry| entry.handler == *handler);
            *subscribers = kept;
            removed
        };
        for entry in &removed {
            entry.active.store(false, Ordering::Release);
        }
        trace!(
            label = self.label(),
            removed = removed.len(),
            "handler unsubscribed"
        );
    }

    /// Notify subscribers in subscribe order; `false` if one prevented default.
    pub fn notify(&self, args: A) -> bool {
        let _span = debug_span!("notify", label = self.label()).entered();

        let snapshot: Vec<Arc<SharedEntry<A>>> = lock(&self.inner.subscribers).clone();

        let mut event = NotificationEvent::new();
        let mut delivered = 0usize;
        for entry in &snapshot {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            (entry.handler.callback)(&mut event, &args);
            delivered += 1;
            if event.default_prevented() {
                break;
            }
        }
        drop(snapshot);

        let prevented = event.default_prevented();
        debug!(delivered, prevented, "notify complete");

        let hook = lock(&self.inner.refresh).clone();
        if let Some(hook) = hook {
            hook.refresh();
        }
        !prevented
    }

    /// A future resolved by the next `notify`, from any thread.
    pub fn wait_for_single_callback(&self) -> NextNotification {
        let (sender, receiver) = oneshot::channel();
        self.subscribe_once(move |_, _| {
            let _ = sender.send(());
        });
        NextNotification::new(receiver)
    }

    fn attach(
        &self,
        make: impl FnOnce(&Weak<SharedEntry<A>>) -> SharedHandler<A>,
    ) -> SharedSubscription {
        let entry = Arc::new_cyclic(|this| SharedEntry {
            handler: make(this),
            active: AtomicBool::new(true),
            owner: Arc::downgrade(&self.inner),
        });
        let slot: Weak<SharedEntry<A>> = Arc::downgrade(&entry);
        let count = {
            let mut subscribers = lock(&self.inner.subscribers);
            subscribers.push(entry);
            subscribers.len()
        };
        trace!(label = self.label(), count, "subscribed");
        SharedSubscription { slot }
    }
}
