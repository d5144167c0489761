//! Debounced fist-gesture detection from hand landmarks.
//!
//! Landmarks from an external tracker flow through `PoseClassifier`
//! (one frame, one bool) and `GestureDebouncer` (frame stream, at most
//! one fire per gesture and cooldown) before a `DetectionSession`
//! dispatches the configured host `Action`.

pub mod action;
pub mod error;
pub mod frame_source;
pub mod gesture;
pub mod session;
pub mod tracking;

pub use error::{ActionError, GestureError};
