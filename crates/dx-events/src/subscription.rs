#![forbid(unsafe_code)]

//! Subscription handles.
//!
//! A subscription has two states, `active` and `disposed`. The only
//! transition is `active -> disposed`, triggered by [`Subscription::dispose`]
//! or by a matching `unsubscribe`. Disposed is terminal; disposing again is
//! a no-op.
//!
//! Handles hold a weak back-reference to their registry slot, never an
//! owning one. Dropping a handle therefore leaves the subscription in place.
//! Use [`Subscription::guard`] for scope-bound subscriptions.

use std::fmt;
use std::rc::Weak;

/// One registry entry, seen from its handle.
pub(crate) trait Slot {
    /// Transition to disposed and leave the registry. Idempotent.
    fn dispose(&self);
    fn is_active(&self) -> bool;
}

/// Handle to one registered callback of an [`Observable`](crate::Observable).
///
/// Clones refer to the same subscription.
#[derive(Clone)]
pub struct Subscription {
    slot: Weak<dyn Slot>,
}

impl Subscription {
    pub(crate) fn new(slot: Weak<dyn Slot>) -> Self {
        Self { slot }
    }

    /// Remove exactly this subscription from its observable.
    ///
    /// Safe to call any number of times, including from inside the
    /// subscriber's own callback during a notify.
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

    /// Tie the subscription to a scope: the returned guard disposes it on drop.
    #[must_use = "dropping the guard immediately disposes the subscription"]
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// RAII guard that disposes its subscription when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// The guarded subscription.
    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}
