#![forbid(unsafe_code)]

//! Per-instance observable with ordered, cancellable notification.
//!
//! # Design
//!
//! [`Observable<A>`] owns an ordered registry of subscribers in shared,
//! reference-counted storage (`Rc<..>` + `RefCell`). `notify(args)` creates
//! one fresh [`NotificationEvent`] and calls every active subscriber with
//! `(&mut event, &args)` in subscribe order, stopping early once a
//! subscriber prevents default.
//!
//! Notification walks a snapshot of the registry taken at call start, and
//! the registry is never borrowed while user code runs. Subscribers may
//! therefore subscribe, dispose, unsubscribe, or notify re-entrantly.
//! Entries disposed mid-notify are skipped if their turn has not come yet;
//! entries added mid-notify wait for the next call.
//!
//! # Performance
//!
//! | Operation       | Complexity                  |
//! |-----------------|-----------------------------|
//! | `subscribe()`   | O(1) amortized              |
//! | `dispose()`     | O(S) where S = subscribers  |
//! | `unsubscribe()` | O(S)                        |
//! | `notify()`      | O(S), one snapshot `Vec`    |
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: not caught. The panic unwinds out of
//!   `notify`, later subscribers are not invoked and the refresh hook does
//!   not run for that call. The observable stays usable.
//! - **Never-resolving wait**: [`Observable::wait_for_single_callback`]
//!   has no timeout. If `notify` is never called again, the future stays
//!   pending for as long as the observable is alive.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use tracing::{debug, debug_span, trace};

use crate::event::NotificationEvent;
use crate::handler::{Handler, RefreshHook};
use crate::subscription::{Slot, Subscription};
use crate::wait::NextNotification;

pub(crate) const UNNAMED: &str = "<unnamed>";

/// Configuration for an [`Observable`].
#[derive(Debug, Clone, Default)]
pub struct ObservableConfig {
    /// Name of the event stream, used in logs and `Debug` output.
    pub label: Option<Cow<'static, str>>,
}

impl ObservableConfig {
    /// Set the event stream label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One registered callback.
struct Entry<A> {
    handler: Handler<A>,
    active: Cell<bool>,
    /// Back-reference for removal only.
    owner: Weak<ObservableInner<A>>,
}

impl<A> Slot for Entry<A> {
    fn dispose(&self) {
        if !self.active.replace(false) {
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        // Take the entry out before dropping it: its callback may own
        // guards whose drop re-enters this registry.
        let removed = {
            let mut subscribers = owner.subscribers.borrow_mut();
            subscribers
                .iter()
                .position(|e| std::ptr::eq(Rc::as_ptr(e), self))
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
        self.active.get()
    }
}

/// Shared interior for [`Observable<A>`].
struct ObservableInner<A> {
    label: Option<Cow<'static, str>>,
    subscribers: RefCell<Vec<Rc<Entry<A>>>>,
    refresh: RefCell<Option<Rc<dyn RefreshHook>>>,
}

impl<A> ObservableInner<A> {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNNAMED)
    }
}

/// An ordered, per-instance subscriber registry.
///
/// Create one per logical event stream and expose it from the owning
/// service; there is no global bus. `A` is the argument payload forwarded
/// to subscribers (use a tuple for several values, `()` for none).
///
/// Cloning an `Observable` creates a new handle to the **same** registry.
///
/// # Invariants
///
/// 1. Subscribers are notified in subscribe order, each at most once per
///    `notify` call.
/// 2. A subscriber that prevents default is the last one invoked.
/// 3. Disposed subscriptions never receive a later notification.
/// 4. The refresh hook runs exactly once per completed `notify`.
///
/// ```
/// use dx_events::Observable;
///
/// let saved: Observable<(u32, &'static str)> = Observable::new();
/// let sub = saved.subscribe(|_event, (id, name)| {
///     assert_eq!((*id, *name), (7, "draft"));
/// });
/// assert!(saved.notify((7, "draft")));
/// sub.dispose();
/// ```
pub struct Observable<A = ()> {
    inner: Rc<ObservableInner<A>>,
}

// Manual Clone: shares the same Rc.
impl<A> Clone for Observable<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for Observable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Observable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("label", &self.inner.label())
            .field("subscriber_count", &self.inner.subscribers.borrow().len())
            .field("refresh_hook", &self.inner.refresh.borrow().is_some())
            .finish()
    }
}

impl<A: 'static> Observable<A> {
    /// Create an observable with no subscribers and no refresh hook.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    /// Create an observable from config.
    #[must_use]
    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                label: config.label,
                subscribers: RefCell::new(Vec::new()),
                refresh: RefCell::new(None),
            }),
        }
    }

    /// Shorthand for a labelled observable.
    #[must_use]
    pub fn labelled(label: impl Into<Cow<'static, str>>) -> Self {
        Self::with_config(ObservableConfig::default().with_label(label))
    }

    /// Install the post-notify refresh hook, builder style.
    #[must_use]
    pub fn with_refresh_hook(self, hook: impl RefreshHook + 'static) -> Self {
        self.set_refresh_hook(hook);
        self
    }

    /// Install or replace the post-notify refresh hook.
    ///
    /// Shared by every clone of this observable.
    pub fn set_refresh_hook(&self, hook: impl RefreshHook + 'static) {
        *self.inner.refresh.borrow_mut() = Some(Rc::new(hook));
    }

    /// Remove the refresh hook.
    pub fn clear_refresh_hook(&self) {
        self.inner.refresh.borrow_mut().take();
    }

    /// The label from [`ObservableConfig`], or `"<unnamed>"`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether no subscription is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }

    /// Append `callback` to the subscriber list.
    ///
    /// The returned handle's [`dispose`](Subscription::dispose) removes
    /// exactly this registration. Dropping the handle does not.
    pub fn subscribe(
        &self,
        callback: impl Fn(&mut NotificationEvent, &A) + 'static,
    ) -> Subscription {
        self.attach(|_| Handler::new(callback))
    }

    /// Append a shared [`Handler`].
    ///
    /// Subscribing the same handler more than once registers it more than
    /// once; [`unsubscribe`](Self::unsubscribe) later removes all of them.
    pub fn subscribe_handler(&self, handler: &Handler<A>) -> Subscription {
        self.attach(|_| handler.clone())
    }

    /// Append a one-shot subscriber.
    ///
    /// On its first invocation the subscription disposes itself and then
    /// runs `callback`, so it fires at most once even under re-entrant
    /// notification.
    pub fn subscribe_once(
        &self,
        callback: impl FnOnce(&mut NotificationEvent, &A) + 'static,
    ) -> Subscription {
        self.attach(|this| {
            let this = this.clone();
            let callback = Cell::new(Some(callback));
            Handler::new(move |event, args| {
                if let Some(entry) = this.upgrade() {
                    entry.dispose();
                }
                if let Some(callback) = callback.take() {
                    callback(event, args);
                }
            })
        })
    }

    /// Remove **every** subscription registered with `handler`.
    ///
    /// Other handlers are untouched. Unknown handlers are a no-op.
    pub fn unsubscribe(&self, handler: &Handler<A>) {
        let removed: Vec<Rc<Entry<A>>> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            let (removed, kept) = std::mem::take(&mut *subscribers)
                .into_iter()
                .partition(|entry| entry.handler == *handler);
            *subscribers = kept;
            removed
        };
        for entry in &removed {
            entry.active.set(false);
        }
        trace!(
            label = self.label(),
            removed = removed.len(),
            "handler unsubscribed"
        );
    }

    /// Notify all subscribers in subscribe order.
    ///
    /// Returns `false` if a subscriber called
    /// [`prevent_default`](NotificationEvent::prevent_default), in which
    /// case no later subscriber was invoked. The refresh hook runs once
    /// afterwards either way.
    pub fn notify(&self, args: A) -> bool {
        let _span = debug_span!("notify", label = self.label()).entered();

        // Snapshot first, so no borrow is held while callbacks run.
        let snapshot: Vec<Rc<Entry<A>>> = self.inner.subscribers.borrow().clone();

        let mut event = NotificationEvent::new();
        let mut delivered = 0usize;
        for entry in &snapshot {
            if !entry.active.get() {
                continue;
            }
            entry.handler.call(&mut event, &args);
            delivered += 1;
            if event.default_prevented() {
                break;
            }
        }
        drop(snapshot);

        let prevented = event.default_prevented();
        debug!(delivered, prevented, "notify complete");

        let hook = self.inner.refresh.borrow().clone();
        if let Some(hook) = hook {
            hook.refresh();
        }
        !prevented
    }

    /// A future that resolves on the next `notify` call.
    ///
    /// Backed by a one-shot subscription that disposes itself when it
    /// fires. There is no timeout and no cancellation: if `notify` is
    /// never called again the future stays pending. If every handle to
    /// this observable is dropped first, it resolves to
    /// [`ObservableError::Closed`](crate::ObservableError::Closed).
    pub fn wait_for_single_callback(&self) -> NextNotification {
        let (sender, receiver) = oneshot::channel();
        self.subscribe_once(move |_, _| {
            // The receiver may already be gone; nothing to report then.
            let _ = sender.send(());
        });
        NextNotification::new(receiver)
    }

    fn attach(&self, make: impl FnOnce(&Weak<Entry<A>>) -> Handler<A>) -> Subscription {
        let entry = Rc::new_cyclic(|this| Entry {
            handler: make(this),
            active: Cell::new(true),
            owner: Rc::downgrade(&self.inner),
        });
        let slot: Weak<Entry<A>> = Rc::downgrade(&entry);
        let count = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.push(entry);
            subscribers.len()
        };
        trace!(label = self.label(), count, "subscribed");
        Subscription::new(slot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
