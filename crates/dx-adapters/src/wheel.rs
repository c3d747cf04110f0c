#![forbid(unsafe_code)]

//! Mouse-wheel normalization.
//!
//! Hosts report wheel motion through several incompatible events: the
//! standard `wheel` event, the legacy `mousewheel` event (120 units per
//! notch, positive = up), and Gecko's `DOMMouseScroll` (lines) and
//! `MozMousePixelScroll` (pixels). [`WheelNormalizer`] folds all of them into
//! one [`WheelDelta`] in pixels with positive = right/down, and
//! [`WheelAdapter`] forwards each non-zero delta through an
//! [`Observable`].
//!
//! Host events arrive either already typed as [`WheelInput`] or as a JSON
//! object (see [`parse_wheel_json`]) such as:
//!
//! ```json
//! {"kind":"DOMMouseScroll","detail":3,"axis":2}
//! ```

use std::fmt;
use std::str::FromStr;

use dx_events::{Observable, ObservableConfig};
use serde::Deserialize;
use tracing::trace;

use crate::error::AdapterError;

/// Legacy `mousewheel` units per notch.
pub const WHEEL_DELTA_PER_NOTCH: f64 = 120.0;

/// Host event names a wheel adapter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelEventKind {
    Wheel,
    MouseWheel,
    DomMouseScroll,
    MozMousePixelScroll,
}

impl WheelEventKind {
    /// Every kind, in the order hosts should bind them.
    pub const ALL: [Self; 4] = [
        Self::Wheel,
        Self::MouseWheel,
        Self::DomMouseScroll,
        Self::MozMousePixelScroll,
    ];

    /// The host event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wheel => "wheel",
            Self::MouseWheel => "mousewheel",
            Self::DomMouseScroll => "DOMMouseScroll",
            Self::MozMousePixelScroll => "MozMousePixelScroll",
        }
    }
}

impl fmt::Display for WheelEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WheelEventKind {
    type Err = AdapterError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| AdapterError::UnknownWheelEvent(name.to_owned()))
    }
}

/// Unit of a standard wheel event's deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

impl DeltaMode {
    /// Decode the host's numeric `deltaMode`.
    pub fn from_raw(mode: u32) -> Result<Self, AdapterError> {
        match mode {
            0 => Ok(Self::Pixel),
            1 => Ok(Self::Line),
            2 => Ok(Self::Page),
            other => Err(AdapterError::InvalidDeltaMode(other)),
        }
    }
}

/// Axis of a Gecko scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAxis {
    Horizontal,
    #[default]
    Vertical,
}

impl ScrollAxis {
    /// Gecko reports 1 for horizontal and 2 for vertical; anything else is
    /// treated as vertical.
    #[must_use]
    pub fn from_raw(axis: u32) -> Self {
        if axis == 1 {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }
}

/// One host wheel event, in its native units and sign convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelInput {
    /// Standard `wheel`: positive = right/down.
    Wheel {
        delta_x: f64,
        delta_y: f64,
        mode: DeltaMode,
    },
    /// Legacy `mousewheel`: 120 per notch, positive = left/up.
    MouseWheel { wheel_delta: i32, wheel_delta_x: i32 },
    /// Gecko `DOMMouseScroll`: lines, positive = right/down.
    DomMouseScroll { detail: i32, axis: ScrollAxis },
    /// Gecko `MozMousePixelScroll`: pixels, positive = right/down.
    MozMousePixelScroll { detail: i32, axis: ScrollAxis },
}

impl WheelInput {
    #[must_use]
    pub fn kind(&self) -> WheelEventKind {
        match self {
            Self::Wheel { .. } => WheelEventKind::Wheel,
            Self::MouseWheel { .. } => WheelEventKind::MouseWheel,
            Self::DomMouseScroll { .. } => WheelEventKind::DomMouseScroll,
            Self::MozMousePixelScroll { .. } => WheelEventKind::MozMousePixelScroll,
        }
    }
}

/// Normalized scroll motion in pixels; positive = right/down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelDelta {
    pub x: f64,
    pub y: f64,
}

impl WheelDelta {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Unit sizes used to turn lines, pages, and notches into pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelConfig {
    /// Pixels per line.
    pub line_height: f64,
    /// Pixels per page.
    pub page_height: f64,
    /// Lines scrolled by one legacy wheel notch.
    pub lines_per_notch: f64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            line_height: 40.0,
            page_height: 800.0,
            lines_per_notch: 3.0,
        }
    }
}

impl WheelConfig {
    #[must_use]
    pub fn with_line_height(mut self, px: f64) -> Self {
        self.line_height = px;
        self
    }

    #[must_use]
    pub fn with_page_height(mut self, px: f64) -> Self {
        self.page_height = px;
        self
    }

    #[must_use]
    pub fn with_lines_per_notch(mut self, lines: f64) -> Self {
        self.lines_per_notch = lines;
        self
    }
}

/// Converts host wheel events into [`WheelDelta`]s.
#[derive(Debug, Clone, Default)]
pub struct WheelNormalizer {
    config: WheelConfig,
}

impl WheelNormalizer {
    #[must_use]
    pub fn new(config: WheelConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    #[must_use]
    pub fn normalize(&self, input: WheelInput) -> WheelDelta {
        let config = &self.config;
        match input {
            WheelInput::Wheel {
                delta_x,
                delta_y,
                mode,
            } => {
                let scale = match mode {
                    DeltaMode::Pixel => 1.0,
                    DeltaMode::Line => config.line_height,
                    DeltaMode::Page => config.page_height,
                };
                WheelDelta {
                    x: delta_x * scale,
                    y: delta_y * scale,
                }
            }
            WheelInput::MouseWheel {
                wheel_delta,
                wheel_delta_x,
            } => {
                let px_per_notch = config.lines_per_notch * config.line_height;
                let notches = |units: i32| -f64::from(units) / WHEEL_DELTA_PER_NOTCH;
                WheelDelta {
                    x: notches(wheel_delta_x) * px_per_notch,
                    y: notches(wheel_delta) * px_per_notch,
                }
            }
            WheelInput::DomMouseScroll { detail, axis } => {
                along(axis, f64::from(detail) * config.line_height)
            }
            WheelInput::MozMousePixelScroll { detail, axis } => along(axis, f64::from(detail)),
        }
    }
}

fn along(axis: ScrollAxis, px: f64) -> WheelDelta {
    match axis {
        ScrollAxis::Horizontal => WheelDelta { x: px, y: 0.0 },
        ScrollAxis::Vertical => WheelDelta { x: 0.0, y: px },
    }
}

/// Internal deserialization target for host wheel events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWheel {
    kind: String,
    #[serde(default)]
    delta_x: Option<f64>,
    #[serde(default)]
    delta_y: Option<f64>,
    #[serde(default)]
    delta_mode: Option<u32>,
    #[serde(default)]
    wheel_delta: Option<i32>,
    #[serde(default)]
    wheel_delta_x: Option<i32>,
    #[serde(default)]
    detail: Option<i32>,
    #[serde(default)]
    axis: Option<u32>,
}

/// Parse a JSON-encoded host wheel event.
///
/// Returns `Err` for malformed JSON, unknown event kinds, invalid delta
/// modes, or a legacy event missing its delta field.
pub fn parse_wheel_json(json: &str) -> Result<WheelInput, AdapterError> {
    let raw: RawWheel =
        serde_json::from_str(json).map_err(|e| AdapterError::Json(e.to_string()))?;

    let axis = ScrollAxis::from_raw(raw.axis.unwrap_or(2));
    match raw.kind.parse::<WheelEventKind>()? {
        WheelEventKind::Wheel => Ok(WheelInput::Wheel {
            delta_x: raw.delta_x.unwrap_or(0.0),
            delta_y: raw.delta_y.unwrap_or(0.0),
            mode: DeltaMode::from_raw(raw.delta_mode.unwrap_or(0))?,
        }),
        WheelEventKind::MouseWheel => Ok(WheelInput::MouseWheel {
            wheel_delta: raw
                .wheel_delta
                .ok_or(AdapterError::MissingField("wheelDelta"))?,
            wheel_delta_x: raw.wheel_delta_x.unwrap_or(0),
        }),
        WheelEventKind::DomMouseScroll => Ok(WheelInput::DomMouseScroll {
            detail: raw.detail.ok_or(AdapterError::MissingField("detail"))?,
            axis,
        }),
        WheelEventKind::MozMousePixelScroll => Ok(WheelInput::MozMousePixelScroll {
            detail: raw.detail.ok_or(AdapterError::MissingField("detail"))?,
            axis,
        }),
    }
}

/// Forwards normalized wheel motion to subscribers.
///
/// Subscribers may call `prevent_default()` to claim the scroll; the host
/// should then suppress its own scrolling for that event.
#[derive(Debug)]
pub struct WheelAdapter {
    normalizer: WheelNormalizer,
    scrolled: Observable<WheelDelta>,
}

impl Default for WheelAdapter {
    fn default() -> Self {
        Self::new(WheelConfig::default())
    }
}

impl WheelAdapter {
    #[must_use]
    pub fn new(config: WheelConfig) -> Self {
        Self {
            normalizer: WheelNormalizer::new(config),
            scrolled: Observable::with_config(ObservableConfig::default().with_label("wheel")),
        }
    }

    /// The stream of normalized deltas.
    #[must_use]
    pub fn scrolled(&self) -> &Observable<WheelDelta> {
        &self.scrolled
    }

    /// Normalize `input` and notify subscribers.
    ///
    /// Returns the notify result: `false` if a subscriber prevented default.
    /// Zero motion is dropped and reported as `true`.
    pub fn dispatch(&self, input: WheelInput) -> bool {
        let delta = self.normalizer.normalize(input);
        if delta.is_zero() {
            trace!(kind = %input.kind(), "zero wheel delta dropped");
            return true;
        }
        self.scrolled.notify(delta)
    }

    /// Parse a JSON host event, then [`dispatch`](Self::dispatch) it.
    pub fn dispatch_json(&self, json: &str) -> Result<bool, AdapterError> {
        let input = parse_wheel_json(json)?;
        Ok(self.dispatch(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn normalize(input: WheelInput) -> WheelDelta {
        WheelNormalizer::default().normalize(input)
    }

    #[test]
    fn event_names_round_trip() {
        for kind in WheelEventKind::ALL {
            assert_eq!(kind.as_str().parse::<WheelEventKind>(), Ok(kind));
        }
        assert_eq!(
            "scroll".parse::<WheelEventKind>(),
            Err(AdapterError::UnknownWheelEvent("scroll".into()))
        );
    }

    #[test]
    fn standard_wheel_scales_by_mode() {
        let pixels = normalize(WheelInput::Wheel {
            delta_x: 0.0,
            delta_y: 12.5,
            mode: DeltaMode::Pixel,
        });
        assert_eq!(pixels, WheelDelta { x: 0.0, y: 12.5 });

        let lines = normalize(WheelInput::Wheel {
            delta_x: -1.0,
            delta_y: 3.0,
            mode: DeltaMode::Line,
        });
        assert_eq!(lines, WheelDelta { x: -40.0, y: 120.0 });

        let pages = normalize(WheelInput::Wheel {
            delta_x: 0.0,
            delta_y: 1.0,
            mode: DeltaMode::Page,
        });
        assert_eq!(pages, WheelDelta { x: 0.0, y: 800.0 });
    }

    #[test]
    fn legacy_mousewheel_flips_sign() {
        // One notch towards the user (scroll down) is -120.
        let down = normalize(WheelInput::MouseWheel {
            wheel_delta: -120,
            wheel_delta_x: 0,
        });
        assert_eq!(down, WheelDelta { x: 0.0, y: 120.0 });

        let up_left = normalize(WheelInput::MouseWheel {
            wheel_delta: 240,
            wheel_delta_x: 120,
        });
        assert_eq!(up_left, WheelDelta { x: -120.0, y: -240.0 });
    }

    #[test]
    fn gecko_events_follow_axis() {
        let lines = normalize(WheelInput::DomMouseScroll {
            detail: 3,
            axis: ScrollAxis::Vertical,
        });
        assert_eq!(lines, WheelDelta { x: 0.0, y: 120.0 });

        let pixels = normalize(WheelInput::MozMousePixelScroll {
            detail: -17,
            axis: ScrollAxis::Horizontal,
        });
        assert_eq!(pixels, WheelDelta { x: -17.0, y: 0.0 });
    }

    #[test]
    fn config_changes_units() {
        let normalizer = WheelNormalizer::new(
            WheelConfig::default()
                .with_line_height(16.0)
                .with_lines_per_notch(1.0),
        );
        let delta = normalizer.normalize(WheelInput::MouseWheel {
            wheel_delta: -120,
            wheel_delta_x: 0,
        });
        assert_eq!(delta, WheelDelta { x: 0.0, y: 16.0 });
    }

    #[test]
    fn parse_each_kind() {
        assert_eq!(
            parse_wheel_json(r#"{"kind":"wheel","deltaX":1.5,"deltaY":-2,"deltaMode":1}"#),
            Ok(WheelInput::Wheel {
                delta_x: 1.5,
                delta_y: -2.0,
                mode: DeltaMode::Line
            })
        );
        assert_eq!(
            parse_wheel_json(r#"{"kind":"mousewheel","wheelDelta":120}"#),
            Ok(WheelInput::MouseWheel {
                wheel_delta: 120,
                wheel_delta_x: 0
            })
        );
        assert_eq!(
            parse_wheel_json(r#"{"kind":"DOMMouseScroll","detail":3,"axis":1}"#),
            Ok(WheelInput::DomMouseScroll {
                detail: 3,
                axis: ScrollAxis::Horizontal
            })
        );
        assert_eq!(
            parse_wheel_json(r#"{"kind":"MozMousePixelScroll","detail":-9}"#),
            Ok(WheelInput::MozMousePixelScroll {
                detail: -9,
                axis: ScrollAxis::Vertical
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            parse_wheel_json("{not json"),
            Err(AdapterError::Json(_))
        ));
        assert_eq!(
            parse_wheel_json(r#"{"kind":"mousewheel"}"#),
            Err(AdapterError::MissingField("wheelDelta"))
        );
        assert_eq!(
            parse_wheel_json(r#"{"kind":"DOMMouseScroll"}"#),
            Err(AdapterError::MissingField("detail"))
        );
        assert_eq!(
            parse_wheel_json(r#"{"kind":"wheel","deltaY":1,"deltaMode":7}"#),
            Err(AdapterError::InvalidDeltaMode(7))
        );
    }

    #[test]
    fn adapter_forwards_non_zero_deltas() {
        let adapter = WheelAdapter::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = adapter
            .scrolled()
            .subscribe(move |_, delta| seen_clone.borrow_mut().push(*delta));

        assert!(adapter.dispatch(WheelInput::MozMousePixelScroll {
            detail: 5,
            axis: ScrollAxis::Vertical,
        }));
        assert!(adapter.dispatch(WheelInput::Wheel {
            delta_x: 0.0,
            delta_y: 0.0,
            mode: DeltaMode::Line,
        }));

        assert_eq!(*seen.borrow(), vec![WheelDelta { x: 0.0, y: 5.0 }]);
    }

    #[test]
    fn adapter_reports_claimed_scroll() {
        let adapter = WheelAdapter::default();
        let _claim = adapter
            .scrolled()
            .subscribe(|event, delta| {
                if delta.y > 0.0 {
                    event.prevent_default();
                }
            });

        assert_eq!(
            adapter.dispatch_json(r#"{"kind":"DOMMouseScroll","detail":1}"#),
            Ok(false)
        );
        assert_eq!(
            adapter.dispatch_json(r#"{"kind":"DOMMouseScroll","detail":-1}"#),
            Ok(true)
        );
        assert_eq!(adapter.scrolled().label(), "wheel");
    }
}
