//! Session orchestration
//!
//! This module provides the `SessionController` that wires:
//! - User gestures (press/hold, toggle, key-hold) to capture start/stop
//! - The transport's inbound message stream to playback and UI events
//! - Connection state to the capture gate and status surface
//! - Session identity and statistics

mod controller;
mod gesture;

pub use controller::{SessionController, SessionStats, UiEvent};
pub use gesture::{GestureAdapter, GestureEvent, GestureMode, Intent};
