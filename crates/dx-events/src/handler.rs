#![forbid(unsafe_code)]

//! Subscriber callbacks and the host refresh hook.

use std::fmt;
use std::rc::Rc;

use crate::event::NotificationEvent;

/// A subscriber callback with stable identity.
///
/// Cloning a `Handler` shares the same callback, and two handlers compare
/// equal exactly when they share it. That identity is what
/// [`Observable::unsubscribe`](crate::Observable::unsubscribe) matches on,
/// so subscribing one handler twice and unsubscribing it once removes both
/// registrations.
pub struct Handler<A> {
    callback: Rc<dyn Fn(&mut NotificationEvent, &A)>,
}

impl<A> Handler<A> {
    /// Wrap a closure as a handler.
    pub fn new(callback: impl Fn(&mut NotificationEvent, &A) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub(crate) fn call(&self, event: &mut NotificationEvent, args: &A) {
        (self.callback)(event, args);
    }
}

// Manual Clone: `A` need not be Clone.
impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<A> PartialEq for Handler<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<A> Eq for Handler<A> {}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Host integration point run once after each completed `notify`.
///
/// This stands in for whatever re-render or refresh step the embedding
/// environment needs after subscribers have reacted. Any `Fn()` closure is
/// a hook.
pub trait RefreshHook {
    /// Called once per completed notify call, after subscriber delivery.
    fn refresh(&self);
}

impl<F: Fn()> RefreshHook for F {
    fn refresh(&self) {
        self();
    }
}
