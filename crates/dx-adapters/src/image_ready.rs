#![forbid(unsafe_code)]

//! Image readiness polling.
//!
//! A host image reports two facts: whether loading has finished, and its
//! natural height. [`ImageReadyWatcher`] polls those on a fixed interval
//! (100 ms by default) until loading finishes, then signals exactly one of:
//!
//! - `ready`: complete with a non-zero natural height;
//! - `failed`: complete but zero height, i.e. the resource is broken.
//!
//! Both signals are per-watcher [`Observable`]s, so failures reach only the
//! code that asked about this image.
//!
//! The first outcome is latched: later checks return it without touching
//! the probe or signalling again. Each [`watch`](ImageReadyWatcher::watch)
//! or [`watch_blocking`](ImageReadyWatcher::watch_blocking) call starts a
//! fresh session with its own poll count and outcome.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Broken image | complete, height 0 | `failed` notified, `PollOutcome::Failed` |
//! | Never completes | host never finishes | polls forever unless `max_polls` is set |
//! | Poll limit hit | `max_polls` reached | `AdapterError::PollLimitExceeded`, no signal |

use std::cell::Cell;
use std::future::Future;
use std::thread;
use std::time::Duration;

use dx_events::{Observable, ObservableConfig};
use tracing::debug;

use crate::error::AdapterError;

/// Default interval between readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Host view of an image element.
pub trait ImageProbe {
    /// Whether the host has finished loading (successfully or not).
    fn is_complete(&self) -> bool;
    /// Intrinsic height in pixels; 0 for broken or not-yet-decoded images.
    fn natural_height(&self) -> u32;
}

/// Payload of both the `ready` and `failed` signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageReadyEvent {
    pub natural_height: u32,
    /// Checks made before the outcome, including the final one.
    pub polls: u32,
}

/// Result of one readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Ready,
    Failed,
}

/// Polling configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReadyConfig {
    /// Delay between checks while the image is still loading.
    pub poll_interval: Duration,
    /// Give up after this many checks. `None` polls until complete.
    pub max_polls: Option<u32>,
}

impl Default for ImageReadyConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

impl ImageReadyConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

/// Watches one image until it is ready or known broken.
#[derive(Debug)]
pub struct ImageReadyWatcher {
    config: ImageReadyConfig,
    ready: Observable<ImageReadyEvent>,
    failed: Observable<ImageReadyEvent>,
    polls: Cell<u32>,
    outcome: Cell<Option<PollOutcome>>,
}

impl Default for ImageReadyWatcher {
    fn default() -> Self {
        Self::new(ImageReadyConfig::default())
    }
}

impl ImageReadyWatcher {
    #[must_use]
    pub fn new(config: ImageReadyConfig) -> Self {
        Self {
            config,
            ready: Observable::with_config(ObservableConfig::default().with_label("image.ready")),
            failed: Observable::with_config(
                ObservableConfig::default().with_label("image.failed"),
            ),
            polls: Cell::new(0),
            outcome: Cell::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ImageReadyConfig {
        &self.config
    }

    /// Notified once the image is complete with a non-zero height.
    #[must_use]
    pub fn ready(&self) -> &Observable<ImageReadyEvent> {
        &self.ready
    }

    /// Notified once the image is complete but has zero height.
    #[must_use]
    pub fn failed(&self) -> &Observable<ImageReadyEvent> {
        &self.failed
    }

    /// Checks made in the current session.
    #[must_use]
    pub fn polls(&self) -> u32 {
        self.polls.get()
    }

    /// The latched `Ready` or `Failed` outcome, if the session has one.
    #[must_use]
    pub fn outcome(&self) -> Option<PollOutcome> {
        self.outcome.get()
    }

    /// Start a new session: clear the poll count and the latched outcome.
    pub fn reset(&self) {
        self.polls.set(0);
        self.outcome.set(None);
    }

    /// Check `probe` once and fire the matching signal if it is complete.
    ///
    /// Once an outcome is latched this returns it without signalling again.
    pub fn poll_once(&self, probe: &impl ImageProbe) -> PollOutcome {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }
        let polls = self.polls.get().saturating_add(1);
        self.polls.set(polls);

        if !probe.is_complete() {
            return PollOutcome::Pending;
        }

        let event = ImageReadyEvent {
            natural_height: probe.natural_height(),
            polls,
        };
        let (outcome, signal) = if event.natural_height > 0 {
            debug!(polls, natural_height = event.natural_height, "image ready");
            (PollOutcome::Ready, &self.ready)
        } else {
            debug!(polls, "image complete without content");
            (PollOutcome::Failed, &self.failed)
        };
        self.outcome.set(Some(outcome));
        signal.notify(event);
        outcome
    }

    /// Poll on the calling thread, sleeping `poll_interval` between checks.
    pub fn watch_blocking(&self, probe: &impl ImageProbe) -> Result<PollOutcome, AdapterError> {
        self.reset();
        loop {
            if let Some(outcome) = self.step(probe)? {
                return Ok(outcome);
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Poll asynchronously; `sleep` is the host's timer.
    ///
    /// ```
    /// # use dx_adapters::image_ready::{ImageProbe, ImageReadyWatcher, PollOutcome};
    /// struct Loaded;
    /// impl ImageProbe for Loaded {
    ///     fn is_complete(&self) -> bool { true }
    ///     fn natural_height(&self) -> u32 { 64 }
    /// }
    ///
    /// let watcher = ImageReadyWatcher::default();
    /// let outcome = futures::executor::block_on(
    ///     watcher.watch(&Loaded, |_interval| async {}),
    /// );
    /// assert_eq!(outcome, Ok(PollOutcome::Ready));
    /// ```
    pub async fn watch<S, F>(
        &self,
        probe: &impl ImageProbe,
        mut sleep: S,
    ) -> Result<PollOutcome, AdapterError>
    where
        S: FnMut(Duration) -> F,
        F: Future<Output = ()>,
    {
        self.reset();
        loop {
            if let Some(outcome) = self.step(probe)? {
                return Ok(outcome);
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// One check plus the poll-limit rule. `None` means poll again.
    fn step(&self, probe: &impl ImageProbe) -> Result<Option<PollOutcome>, AdapterError> {
        match self.poll_once(probe) {
            PollOutcome::Pending => match self.config.max_polls {
                Some(max) if self.polls() >= max => {
                    debug!(polls = self.polls(), "image poll limit reached");
                    Err(AdapterError::PollLimitExceeded { polls: self.polls() })
                }
                _ => Ok(None),
            },
            outcome => Ok(Some(outcome)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Completes after `ready_after` checks with the given height.
    struct FakeImage {
        checks: Cell<u32>,
        ready_after: u32,
        height: u32,
    }

    impl FakeImage {
        fn new(ready_after: u32, height: u32) -> Self {
            Self {
                checks: Cell::new(0),
                ready_after,
                height,
            }
        }
    }

    impl ImageProbe for FakeImage {
        fn is_complete(&self) -> bool {
            self.checks.set(self.checks.get() + 1);
            self.checks.get() >= self.ready_after
        }

        fn natural_height(&self) -> u32 {
            self.height
        }
    }

    fn record(obs: &Observable<ImageReadyEvent>) -> Rc<RefCell<Vec<ImageReadyEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let _ = obs.subscribe(move |_, event| log_clone.borrow_mut().push(*event));
        log
    }

    #[test]
    fn default_interval_is_100ms() {
        assert_eq!(
            ImageReadyConfig::default().poll_interval,
            Duration::from_millis(100)
        );
    }

    #[test]
    fn pending_until_complete() {
        let watcher = ImageReadyWatcher::default();
        let image = FakeImage::new(3, 20);
        let ready = record(watcher.ready());

        assert_eq!(watcher.poll_once(&image), PollOutcome::Pending);
        assert_eq!(watcher.poll_once(&image), PollOutcome::Pending);
        assert!(ready.borrow().is_empty());
        assert_eq!(watcher.poll_once(&image), PollOutcome::Ready);
        assert_eq!(
            *ready.borrow(),
            vec![ImageReadyEvent {
                natural_height: 20,
                polls: 3
            }]
        );
    }

    #[test]
    fn zero_height_signals_failure_only() {
        let watcher = ImageReadyWatcher::default();
        let image = FakeImage::new(1, 0);
        let ready = record(watcher.ready());
        let failed = record(watcher.failed());

        assert_eq!(watcher.poll_once(&image), PollOutcome::Failed);
        assert!(ready.borrow().is_empty());
        assert_eq!(failed.borrow().len(), 1);
    }

    #[test]
    fn watch_blocking_retries_until_ready() {
        let watcher = ImageReadyWatcher::new(
            ImageReadyConfig::default().with_poll_interval(Duration::from_millis(1)),
        );
        let image = FakeImage::new(4, 10);
        assert_eq!(watcher.watch_blocking(&image), Ok(PollOutcome::Ready));
        assert_eq!(watcher.polls(), 4);
    }

    #[test]
    fn watch_blocking_respects_poll_limit() {
        let watcher = ImageReadyWatcher::new(
            ImageReadyConfig::default()
                .with_poll_interval(Duration::ZERO)
                .with_max_polls(2),
        );
        let failed = record(watcher.failed());
        let image = FakeImage::new(10, 10);

        assert_eq!(
            watcher.watch_blocking(&image),
            Err(AdapterError::PollLimitExceeded { polls: 2 })
        );
        assert!(failed.borrow().is_empty());
    }

    #[test]
    fn watch_sleeps_the_configured_interval_between_polls() {
        let watcher = ImageReadyWatcher::default();
        let image = FakeImage::new(3, 5);
        let sleeps = RefCell::new(Vec::new());

        let outcome = block_on(watcher.watch(&image, |interval| {
            sleeps.borrow_mut().push(interval);
            async {}
        }));

        assert_eq!(outcome, Ok(PollOutcome::Ready));
        assert_eq!(*sleeps.borrow(), vec![DEFAULT_POLL_INTERVAL; 2]);
    }

    #[test]
    fn completed_image_signals_only_once() {
        let watcher = ImageReadyWatcher::default();
        let image = FakeImage::new(1, 12);
        let ready = record(watcher.ready());

        assert_eq!(watcher.poll_once(&image), PollOutcome::Ready);
        assert_eq!(watcher.poll_once(&image), PollOutcome::Ready);
        assert_eq!(ready.borrow().len(), 1);
        assert_eq!(watcher.polls(), 1);
        assert_eq!(watcher.outcome(), Some(PollOutcome::Ready));
    }

    #[test]
    fn each_watch_gets_its_own_poll_budget() {
        let watcher = ImageReadyWatcher::new(
            ImageReadyConfig::default()
                .with_poll_interval(Duration::ZERO)
                .with_max_polls(3),
        );
        let ready = record(watcher.ready());

        assert_eq!(
            watcher.watch_blocking(&FakeImage::new(3, 10)),
            Ok(PollOutcome::Ready)
        );
        assert_eq!(watcher.polls(), 3);

        assert_eq!(
            block_on(watcher.watch(&FakeImage::new(2, 10), |_| async {})),
            Ok(PollOutcome::Ready)
        );
        assert_eq!(watcher.polls(), 2);
        assert_eq!(ready.borrow().len(), 2);
        assert_eq!(ready.borrow()[1].polls, 2);
    }

    #[test]
    fn reset_allows_a_new_signal() {
        let watcher = ImageReadyWatcher::default();
        let failed = record(watcher.failed());
        let image = FakeImage::new(1, 0);

        watcher.poll_once(&image);
        watcher.reset();
        assert_eq!(watcher.outcome(), None);
        assert_eq!(watcher.poll_once(&image), PollOutcome::Failed);
        assert_eq!(failed.borrow().len(), 2);
    }

    #[test]
    fn wait_for_ready_through_observable() {
        let watcher = ImageReadyWatcher::default();
        let image = FakeImage::new(2, 8);
        let next = watcher.ready().wait_for_single_callback();

        watcher.poll_once(&image);
        watcher.poll_once(&image);
        assert_eq!(block_on(next), Ok(()));
    }
}
