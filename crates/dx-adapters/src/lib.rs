#![forbid(unsafe_code)]

//! Host adapters built on [`dx_events`].
//!
//! These are plain consumers of the observable contract. They hold no
//! shared state with the observables they feed and know nothing about any
//! particular UI toolkit: the host hands them raw inputs and a timer.
//!
//! - [`wheel`]: fold legacy and standard wheel events into one pixel delta.
//! - [`image_ready`]: poll an image until it is ready or known broken.

pub mod error;
pub mod image_ready;
pub mod wheel;

pub use error::AdapterError;
pub use image_ready::{
    DEFAULT_POLL_INTERVAL, ImageProbe, ImageReadyConfig, ImageReadyEvent, ImageReadyWatcher,
    PollOutcome,
};
pub use wheel::{
    DeltaMode, ScrollAxis, WheelAdapter, WheelConfig, WheelDelta, WheelEventKind, WheelInput,
    WheelNormalizer, parse_wheel_json,
};
