//! Fist pose classification from a single frame of hand landmarks.
//!
//! A finger counts as closed when its tip sits below its PIP joint in
//! image coordinates (y grows downward).  The thumb does not curl along
//! one axis, so it counts as closed when its tip is near the index base.
//! The pose is a fist only when all five digits are closed.

use crate::error::GestureError;
use crate::tracking::{Hand, HandLandmark, Landmark};

// ── Config ─────────────────────────────────────────────────

/// Thresholds for pose classification.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Maximum normalized distance between thumb tip and index MCP for
    /// the thumb to count as closed.
    pub thumb_closed_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            thumb_closed_threshold: 0.1,
        }
    }
}

// ── Per-digit result ───────────────────────────────────────

/// Closed/open state of each digit for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitStates {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl DigitStates {
    pub fn all_closed(&self) -> bool {
        self.thumb && self.index && self.middle && self.ring && self.pinky
    }

    pub fn closed_count(&self) -> usize {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|c| **c)
            .count()
    }

    pub fn to_sexp(&self) -> String {
        let flag = |b: bool| if b { "t" } else { "nil" };
        format!(
            "(:thumb {} :index {} :middle {} :ring {} :pinky {})",
            flag(self.thumb),
            flag(self.index),
            flag(self.middle),
            flag(self.ring),
            flag(self.pinky),
        )
    }
}

// ── Classifier ─────────────────────────────────────────────

/// Stateless fist detector.
#[derive(Debug, Clone, Default)]
pub struct PoseClassifier {
    pub config: ClassifierConfig,
}

impl PoseClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Whether the hand forms a fist.  No hand is never a fist.
    pub fn classify(&self, hand: Option<&Hand>) -> bool {
        match hand {
            Some(hand) => self.closed_digits(hand).all_closed(),
            None => false,
        }
    }

    /// Classify a raw landmark slice, rejecting anything that is not a
    /// full hand.
    pub fn classify_landmarks(&self, landmarks: &[Landmark]) -> Result<bool, GestureError> {
        let hand = Hand::from_slice(landmarks)?;
        Ok(self.classify(Some(&hand)))
    }

    /// Per-digit closed flags.
    pub fn closed_digits(&self, hand: &Hand) -> DigitStates {
        let [index, middle, ring, pinky] =
            HandLandmark::finger_tip_pip_pairs().map(|(tip, pip)| finger_closed(hand, tip, pip));
        DigitStates {
            thumb: self.thumb_closed(hand),
            index,
            middle,
            ring,
            pinky,
        }
    }

    fn thumb_closed(&self, hand: &Hand) -> bool {
        hand.distance(HandLandmark::ThumbTip, HandLandmark::IndexMcp)
            < self.config.thumb_closed_threshold
    }
}

/// Tip below PIP means the finger is curled.
fn finger_closed(hand: &Hand, tip: HandLandmark, pip: HandLandmark) -> bool {
    hand.landmark(tip).y > hand.landmark(pip).y
}

// ── Test helpers ───────────────────────────────────────────

/// An open hand: fingertips above their PIPs, thumb far from the index base.
#[cfg(test)]
pub(crate) fn make_open_hand() -> Hand {
    let mut points = vec![Landmark::new(0.5, 0.8); crate::tracking::LANDMARK_COUNT];
    for (i, x) in [(1usize, 0.40), (2, 0.35), (3, 0.30), (4, 0.25)] {
        points[i] = Landmark::new(x, 0.70);
    }
    for (base, x) in [(5usize, 0.45), (9, 0.50), (13, 0.55), (17, 0.60)] {
        points[base] = Landmark::new(x, 0.60); // MCP
        points[base + 1] = Landmark::new(x, 0.50); // PIP
        points[base + 2] = Landmark::new(x, 0.40); // DIP
        points[base + 3] = Landmark::new(x, 0.30); // tip
    }
    Hand::from_landmarks(points).unwrap()
}

/// A closed fist: fingertips folded below their PIPs, thumb over the index base.
#[cfg(test)]
pub(crate) fn make_fist() -> Hand {
    let mut hand = make_open_hand();
    for (tip, pip) in HandLandmark::finger_tip_pip_pairs() {
        let pip_y = hand.landmark(pip).y;
        hand.landmark_mut(tip).y = pip_y + 0.05;
    }
    let base = *hand.landmark(HandLandmark::IndexMcp);
    *hand.landmark_mut(HandLandmark::ThumbTip) = Landmark::new(base.x + 0.03, base.y + 0.02);
    hand
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hand_is_not_fist() {
        let c = PoseClassifier::default();
        assert!(!c.classify(None));
    }

    #[test]
    fn test_fist_detected() {
        let c = PoseClassifier::default();
        let hand = make_fist();
        assert!(c.classify(Some(&hand)));
        assert_eq!(c.closed_digits(&hand).closed_count(), 5);
    }

    #[test]
    fn test_open_hand_not_fist() {
        let c = PoseClassifier::default();
        let hand = make_open_hand();
        assert!(!c.classify(Some(&hand)));
        assert_eq!(c.closed_digits(&hand).closed_count(), 0);
    }

    #[test]
    fn test_single_extended_finger_negates() {
        let c = PoseClassifier::default();
        for (tip, pip) in HandLandmark::finger_tip_pip_pairs() {
            let mut hand = make_fist();
            let pip_y = hand.landmark(pip).y;
            hand.landmark_mut(tip).y = pip_y - 0.1;
            let digits = c.closed_digits(&hand);
            assert!(!c.classify(Some(&hand)), "{} extended", tip.as_str());
            assert_eq!(digits.closed_count(), 4);
        }
    }

    #[test]
    fn test_tip_level_with_pip_is_open() {
        let c = PoseClassifier::default();
        let mut hand = make_fist();
        let pip_y = hand.landmark(HandLandmark::MiddlePip).y;
        hand.landmark_mut(HandLandmark::MiddleTip).y = pip_y;
        assert!(!c.closed_digits(&hand).middle);
        assert!(!c.classify(Some(&hand)));
    }

    #[test]
    fn test_thumb_threshold_boundary() {
        let c = PoseClassifier::default();
        let mut hand = make_fist();
        let base = *hand.landmark(HandLandmark::IndexMcp);

        // Exactly at the threshold is not closed
        *hand.landmark_mut(HandLandmark::ThumbTip) = Landmark::new(base.x, base.y - 0.1);
        assert!(!c.closed_digits(&hand).thumb);
        assert!(!c.classify(Some(&hand)));

        *hand.landmark_mut(HandLandmark::ThumbTip) = Landmark::new(base.x, base.y - 0.09);
        assert!(c.classify(Some(&hand)));
    }

    #[test]
    fn test_thumb_depth_ignored() {
        let c = PoseClassifier::default();
        let mut hand = make_fist();
        hand.landmark_mut(HandLandmark::ThumbTip).z = 3.0;
        assert!(c.classify(Some(&hand)));
    }

    #[test]
    fn test_custom_thumb_threshold() {
        let c = PoseClassifier::new(ClassifierConfig {
            thumb_closed_threshold: 0.02,
        });
        // make_fist places the thumb ~0.036 from the index base
        assert!(!c.classify(Some(&make_fist())));
    }

    #[test]
    fn test_mirrored_fist_still_fist() {
        let c = PoseClassifier::default();
        assert!(c.classify(Some(&make_fist().mirrored())));
    }

    #[test]
    fn test_classify_landmarks_rejects_short_hand() {
        let c = PoseClassifier::default();
        let points = vec![Landmark::new(0.5, 0.5); 5];
        let err = c.classify_landmarks(&points).unwrap_err();
        assert!(matches!(err, GestureError::InvalidInput { expected: 21, got: 5 }));
    }

    #[test]
    fn test_classify_landmarks_full_hand() {
        let c = PoseClassifier::default();
        let fist = make_fist();
        assert!(c.classify_landmarks(fist.landmarks()).unwrap());
    }

    #[test]
    fn test_digit_states_sexp() {
        let c = PoseClassifier::default();
        let sexp = c.closed_digits(&make_fist()).to_sexp();
        assert_eq!(sexp, "(:thumb t :index t :middle t :ring t :pinky t)");
    }
}
