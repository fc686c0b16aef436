// Tests for gesture-to-intent resolution
//
// Press/hold, toggle, and key-hold are all front-ends to one start/stop
// state machine; each transition yields at most one intent.

use voicelink::session::{GestureAdapter, GestureEvent, GestureMode, Intent};

#[test]
fn test_toggle_alternates_start_stop() {
    let mut adapter = GestureAdapter::new(GestureMode::Toggle);

    assert_eq!(adapter.resolve(GestureEvent::Toggled), Intent::Start);
    assert!(adapter.is_active());
    assert_eq!(adapter.resolve(GestureEvent::Toggled), Intent::Stop);
    assert!(!adapter.is_active());
    assert_eq!(adapter.resolve(GestureEvent::Toggled), Intent::Start);
}

#[test]
fn test_toggle_mode_treats_press_as_toggle() {
    let mut adapter = GestureAdapter::new(GestureMode::Toggle);

    assert_eq!(adapter.resolve(GestureEvent::Pressed), Intent::Start);
    assert_eq!(adapter.resolve(GestureEvent::Released), Intent::Ignore);
    assert_eq!(adapter.resolve(GestureEvent::Pressed), Intent::Stop);
}

#[test]
fn test_hold_maps_press_release() {
    let mut adapter = GestureAdapter::new(GestureMode::Hold);

    assert_eq!(adapter.resolve(GestureEvent::Pressed), Intent::Start);
    assert_eq!(adapter.resolve(GestureEvent::Released), Intent::Stop);
}

#[test]
fn test_hold_ignores_repeats() {
    let mut adapter = GestureAdapter::new(GestureMode::Hold);

    assert_eq!(adapter.resolve(GestureEvent::Pressed), Intent::Start);
    // Key auto-repeat while held must not restart capture.
    assert_eq!(adapter.resolve(GestureEvent::Pressed), Intent::Ignore);
    assert_eq!(adapter.resolve(GestureEvent::KeyDown), Intent::Ignore);

    assert_eq!(adapter.resolve(GestureEvent::Released), Intent::Stop);
    assert_eq!(adapter.resolve(GestureEvent::Released), Intent::Ignore);
}

#[test]
fn test_key_hold_is_equivalent_to_press_hold() {
    let mut keys = GestureAdapter::new(GestureMode::Hold);
    let mut buttons = GestureAdapter::new(GestureMode::Hold);

    assert_eq!(
        keys.resolve(GestureEvent::KeyDown),
        buttons.resolve(GestureEvent::Pressed)
    );
    assert_eq!(
        keys.resolve(GestureEvent::KeyUp),
        buttons.resolve(GestureEvent::Released)
    );
}

#[test]
fn test_reset_forgets_refused_start() {
    let mut adapter = GestureAdapter::new(GestureMode::Toggle);

    assert_eq!(adapter.resolve(GestureEvent::Toggled), Intent::Start);
    // Downstream refused the start (gated or device failure).
    adapter.reset();
    assert_eq!(
        adapter.resolve(GestureEvent::Toggled),
        Intent::Start,
        "next gesture must retry the start, not emit a stop"
    );
}
