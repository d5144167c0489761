//! Hand landmark data structures.
//!
//! Models the 21 landmarks per hand reported by MediaPipe-style hand
//! trackers, in normalized image coordinates (x right, y down, both in
//! [0, 1]).  A `Hand` always carries exactly `LANDMARK_COUNT` points.

use tracing::debug;

use crate::error::GestureError;

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks, in tracker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// All landmarks in index order.
const ALL_LANDMARKS: [HandLandmark; LANDMARK_COUNT] = [
    HandLandmark::Wrist,
    HandLandmark::ThumbCmc,
    HandLandmark::ThumbMcp,
    HandLandmark::ThumbIp,
    HandLandmark::ThumbTip,
    HandLandmark::IndexMcp,
    HandLandmark::IndexPip,
    HandLandmark::IndexDip,
    HandLandmark::IndexTip,
    HandLandmark::MiddleMcp,
    HandLandmark::MiddlePip,
    HandLandmark::MiddleDip,
    HandLandmark::MiddleTip,
    HandLandmark::RingMcp,
    HandLandmark::RingPip,
    HandLandmark::RingDip,
    HandLandmark::RingTip,
    HandLandmark::PinkyMcp,
    HandLandmark::PinkyPip,
    HandLandmark::PinkyDip,
    HandLandmark::PinkyTip,
];

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Landmark at a given array index.
    pub fn from_index(index: usize) -> Option<HandLandmark> {
        ALL_LANDMARKS.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    /// (tip, PIP) pairs for the four non-thumb fingers.
    pub fn finger_tip_pip_pairs() -> [(HandLandmark, HandLandmark); 4] {
        [
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Landmark point ─────────────────────────────────────────

/// A single landmark position.  `z` is carried through but ignored by
/// the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn with_depth(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar Euclidean distance, ignoring depth.
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Horizontally flipped copy, as seen in a mirror.
    pub fn mirrored(&self) -> Landmark {
        Landmark {
            x: 1.0 - self.x,
            y: self.y,
            z: self.z,
        }
    }
}

// ── Hand ───────────────────────────────────────────────────

/// Landmarks for one detected hand, indexed by `HandLandmark`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl Hand {
    /// Build a hand from tracker output.
    ///
    /// Any count other than `LANDMARK_COUNT` is rejected rather than
    /// padded or truncated.
    pub fn from_landmarks(landmarks: Vec<Landmark>) -> Result<Self, GestureError> {
        Self::from_slice(&landmarks)
    }

    pub fn from_slice(landmarks: &[Landmark]) -> Result<Self, GestureError> {
        let landmarks: [Landmark; LANDMARK_COUNT] =
            landmarks.try_into().map_err(|_| {
                debug!(
                    "Hand: expected {} landmarks, got {}",
                    LANDMARK_COUNT,
                    landmarks.len(),
                );
                GestureError::InvalidInput {
                    expected: LANDMARK_COUNT,
                    got: landmarks.len(),
                }
            })?;
        Ok(Self { landmarks })
    }

    /// Position of a single landmark.
    pub fn landmark(&self, which: HandLandmark) -> &Landmark {
        &self.landmarks[which.index()]
    }

    /// Mutable access, mainly for building fixtures.
    pub fn landmark_mut(&mut self, which: HandLandmark) -> &mut Landmark {
        &mut self.landmarks[which.index()]
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    /// Planar distance between two landmarks of this hand.
    pub fn distance(&self, a: HandLandmark, b: HandLandmark) -> f32 {
        self.landmark(a).distance_2d(self.landmark(b))
    }

    /// Hand with every landmark flipped horizontally.
    pub fn mirrored(&self) -> Hand {
        Hand {
            landmarks: self.landmarks.map(|l| l.mirrored()),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn test_points(n: usize) -> Vec<Landmark> {
    (0..n).map(|i| Landmark::new(i as f32 * 0.01, 0.5)).collect()
}
