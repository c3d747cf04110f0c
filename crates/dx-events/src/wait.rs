#![forbid(unsafe_code)]

//! The future returned by `wait_for_single_callback`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::error::ObservableError;

/// Resolves on the next notification of the observable that created it.
///
/// Carries no value. Pending forever if no notification ever comes while
/// the observable is alive; there is no built-in timeout or cancellation,
/// so callers that need either should race it against their own timer.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct NextNotification {
    receiver: oneshot::Receiver<()>,
}

impl NextNotification {
    pub(crate) fn new(receiver: oneshot::Receiver<()>) -> Self {
        Self { receiver }
    }
}

impl Future for NextNotification {
    type Output = Result<(), ObservableError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|oneshot::Canceled| ObservableError::Closed))
    }
}
