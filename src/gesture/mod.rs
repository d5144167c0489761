//! Gesture recognition: per-frame pose classification followed by
//! cross-frame debouncing.  No I/O; compiled and tested without a camera.

pub mod classifier;
pub mod debounce;

pub use classifier::{ClassifierConfig, DigitStates, PoseClassifier};
pub use debounce::{DebounceConfig, FireDecision, GestureDebouncer, GestureState};
