//! Hand tracking data model consumed from the external tracker.

pub mod hand_landmarks;

pub use hand_landmarks::{Hand, HandLandmark, Landmark, LANDMARK_COUNT};
