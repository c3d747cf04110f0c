#![forbid(unsafe_code)]

//! The per-notify event handed to every subscriber.

/// Ephemeral value created fresh for each `notify` call.
///
/// Subscribers receive it as their first argument. Calling
/// [`prevent_default`](Self::prevent_default) stops delivery to every
/// subscriber registered after the current one, and makes `notify` return
/// `false`.
#[derive(Debug, Default)]
pub struct NotificationEvent {
    default_prevented: bool,
}

impl NotificationEvent {
    /// A fresh, not-yet-prevented event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop propagation to the remaining subscribers of this notify call.
    ///
    /// Calling it more than once has no further effect.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether some subscriber has called [`prevent_default`](Self::prevent_default).
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}
