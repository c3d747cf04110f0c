//! Property-based invariant tests for wheel normalization.
//!
//! 1. Scrolling down in any host encoding yields a positive `y`.
//! 2. Gecko events move along exactly one axis.
//! 3. Zero motion never reaches subscribers.
//! 4. Every event kind name parses back to itself.

use std::cell::Cell;
use std::rc::Rc;

use dx_adapters::{
    DeltaMode, ScrollAxis, WheelAdapter, WheelEventKind, WheelInput, WheelNormalizer,
};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn axis_strategy() -> impl Strategy<Value = ScrollAxis> {
    prop_oneof![Just(ScrollAxis::Horizontal), Just(ScrollAxis::Vertical)]
}

fn mode_strategy() -> impl Strategy<Value = DeltaMode> {
    prop_oneof![
        Just(DeltaMode::Pixel),
        Just(DeltaMode::Line),
        Just(DeltaMode::Page)
    ]
}

proptest! {
    #[test]
    fn downward_scroll_is_positive_in_every_encoding(steps in 1i32..=50, mode in mode_strategy()) {
        let normalizer = WheelNormalizer::default();
        let inputs = [
            WheelInput::Wheel { delta_x: 0.0, delta_y: f64::from(steps), mode },
            WheelInput::MouseWheel { wheel_delta: -120 * steps, wheel_delta_x: 0 },
            WheelInput::DomMouseScroll { detail: steps, axis: ScrollAxis::Vertical },
            WheelInput::MozMousePixelScroll { detail: steps, axis: ScrollAxis::Vertical },
        ];
        for input in inputs {
            let delta = normalizer.normalize(input);
            prop_assert!(delta.y > 0.0, "{:?} gave {:?}", input, delta);
            prop_assert_eq!(delta.x, 0.0);
        }
    }
}

proptest! {
    #[test]
    fn gecko_events_use_one_axis(detail in -500i32..=500, axis in axis_strategy(), pixels in proptest::bool::ANY) {
        let input = if pixels {
            WheelInput::MozMousePixelScroll { detail, axis }
        } else {
            WheelInput::DomMouseScroll { detail, axis }
        };
        let delta = WheelNormalizer::default().normalize(input);
        match axis {
            ScrollAxis::Horizontal => prop_assert_eq!(delta.y, 0.0),
            ScrollAxis::Vertical => prop_assert_eq!(delta.x, 0.0),
        }
    }
}

proptest! {
    #[test]
    fn zero_motion_is_not_forwarded(axis in axis_strategy(), mode in mode_strategy()) {
        let adapter = WheelAdapter::default();
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _sub = adapter.scrolled().subscribe(move |_, _| hits_clone.set(hits_clone.get() + 1));

        let inputs = [
            WheelInput::Wheel { delta_x: 0.0, delta_y: 0.0, mode },
            WheelInput::MouseWheel { wheel_delta: 0, wheel_delta_x: 0 },
            WheelInput::DomMouseScroll { detail: 0, axis },
            WheelInput::MozMousePixelScroll { detail: 0, axis },
        ];
        for input in inputs {
            let not_prevented = adapter.dispatch(input);
            prop_assert!(not_prevented, "{:?} was reported as prevented", input);
        }
        prop_assert_eq!(hits.get(), 0);
    }
}

#[test]
fn kind_names_parse_back() {
    for kind in WheelEventKind::ALL {
        assert_eq!(kind.to_string().parse::<WheelEventKind>(), Ok(kind));
    }
}
