#![forbid(unsafe_code)]

//! Per-instance observables for dotjem.
//!
//! Instead of broadcasting every event over one application-wide bus, each
//! service owns an [`Observable`] per event it exposes and callers subscribe
//! to exactly that stream.
//!
//! - [`Observable`]: ordered subscriber registry with cancellable
//!   notification (single-threaded, `Rc` based).
//! - [`SharedObservable`]: the same contract for multi-threaded hosts.
//! - [`Subscription`] / [`SubscriptionGuard`]: explicit and scope-bound
//!   disposal.
//! - [`NotificationEvent`]: per-notify event carrying the
//!   prevent-default flag.
//! - [`RefreshHook`]: host step run once after every completed notify.
//! - [`NextNotification`]: future returned by
//!   [`Observable::wait_for_single_callback`].
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscribe order.
//! 2. Preventing default stops delivery to later subscribers and makes
//!    `notify` return `false`.
//! 3. `dispose` removes exactly one subscription; `unsubscribe` removes
//!    every subscription of a handler. Both are no-ops when nothing matches.
//! 4. A subscriber panic propagates out of `notify` and aborts the rest of
//!    that delivery.
//!
//! ```
//! use dx_events::Observable;
//!
//! struct Documents {
//!     saved: Observable<String>,
//! }
//!
//! impl Documents {
//!     fn save(&self, name: &str) -> bool {
//!         // ... persist ...
//!         self.saved.notify(name.to_owned())
//!     }
//! }
//!
//! let docs = Documents { saved: Observable::labelled("saved") };
//! let sub = docs.saved.subscribe(|_event, name| println!("saved {name}"));
//! assert!(docs.save("notes.txt"));
//! sub.dispose();
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod observable;
pub mod subscription;
pub mod sync;
pub mod wait;

pub use error::ObservableError;
pub use event::NotificationEvent;
pub use handler::{Handler, RefreshHook};
pub use observable::{Observable, ObservableConfig};
pub use subscription::{Subscription, SubscriptionGuard};
pub use sync::{SharedHandler, SharedObservable, SharedSubscription};
pub use wait::NextNotification;
