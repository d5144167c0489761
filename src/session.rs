//! Detection session. Owns the classifier, debouncer and action for one
//! run of the frame loop.
//!
//! Frames must be fed in capture order from a single thread.  Action
//! failures are logged here and never reach the debouncer.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::error::GestureError;
use crate::frame_source::Frame;
use crate::gesture::{
    ClassifierConfig, DebounceConfig, FireDecision, GestureDebouncer, PoseClassifier,
};
use crate::tracking::{Hand, Landmark};

// ── Config ─────────────────────────────────────────────────

/// Capture resolution requested from the camera collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureResolution {
    pub width: u32,
    pub height: u32,
}

/// Settings for one detection session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum seconds between fired actions.
    pub cooldown_secs: f64,
    /// Positive frames in a row before the pose counts as a gesture.
    pub required_consecutive_frames: u32,
    /// Thumb-tip to index-base distance below which the thumb is closed.
    pub thumb_closed_threshold: f32,
    /// Ask the capture collaborator for 720p instead of 480p.
    pub high_resolution: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 1.0,
            required_consecutive_frames: 3,
            thumb_closed_threshold: 0.1,
            high_resolution: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), GestureError> {
        if !self.cooldown_secs.is_finite() || self.cooldown_secs <= 0.0 {
            return Err(GestureError::Configuration(format!(
                "cooldown must be a positive number of seconds, got {}",
                self.cooldown_secs
            )));
        }
        if self.required_consecutive_frames == 0 {
            return Err(GestureError::Configuration(
                "required consecutive frames must be at least 1".to_string(),
            ));
        }
        if !self.thumb_closed_threshold.is_finite() || self.thumb_closed_threshold <= 0.0 {
            return Err(GestureError::Configuration(format!(
                "thumb threshold must be positive, got {}",
                self.thumb_closed_threshold
            )));
        }
        Ok(())
    }

    pub fn capture_resolution(&self) -> CaptureResolution {
        if self.high_resolution {
            CaptureResolution {
                width: 1280,
                height: 720,
            }
        } else {
            CaptureResolution {
                width: 640,
                height: 480,
            }
        }
    }

    fn debounce_config(&self) -> Result<DebounceConfig, GestureError> {
        let cooldown = Duration::try_from_secs_f64(self.cooldown_secs).map_err(|e| {
            GestureError::Configuration(format!("cooldown {}s: {}", self.cooldown_secs, e))
        })?;
        Ok(DebounceConfig {
            required_consecutive: self.required_consecutive_frames,
            cooldown,
        })
    }

    fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            thumb_closed_threshold: self.thumb_closed_threshold,
        }
    }
}

// ── Stats ──────────────────────────────────────────────────

/// Running counters for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub frames_with_hand: u64,
    pub pose_frames: u64,
    pub fires: u64,
    pub suppressed: u64,
    pub action_failures: u64,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub pose_active: bool,
    pub decision: FireDecision,
    /// Whether the action ran without error.  `None` when it did not run.
    pub action_ok: Option<bool>,
}

// ── Session ────────────────────────────────────────────────

pub struct DetectionSession {
    config: SessionConfig,
    classifier: PoseClassifier,
    debouncer: GestureDebouncer,
    action: Box<dyn Action>,
    stats: SessionStats,
}

impl DetectionSession {
    /// Validate the config and build the classifier and debouncer.
    pub fn new(config: SessionConfig, action: Box<dyn Action>) -> Result<Self, GestureError> {
        config.validate()?;
        let debouncer = GestureDebouncer::new(config.debounce_config()?)?;
        let classifier = PoseClassifier::new(config.classifier_config());
        info!(
            "Detection session started: action={} cooldown={:.2}s frames={}",
            action.name(),
            config.cooldown_secs,
            config.required_consecutive_frames,
        );
        Ok(Self {
            config,
            classifier,
            debouncer,
            action,
            stats: SessionStats::default(),
        })
    }

    /// Classify, debounce, and fire the action if due.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        self.step(frame.hand.as_ref(), frame.timestamp)
    }

    /// Like `process_frame`, for raw tracker output.  A malformed hand is
    /// rejected before any state changes.
    pub fn process_landmarks(
        &mut self,
        landmarks: Option<&[Landmark]>,
        now: Duration,
    ) -> Result<FrameOutcome, GestureError> {
        let hand = landmarks.map(Hand::from_slice).transpose()?;
        Ok(self.step(hand.as_ref(), now))
    }

    fn step(&mut self, hand: Option<&Hand>, now: Duration) -> FrameOutcome {
        self.stats.frames += 1;
        if hand.is_some() {
            self.stats.frames_with_hand += 1;
        }

        let pose_active = self.classifier.classify(hand);
        if pose_active {
            self.stats.pose_frames += 1;
        }

        let decision = self.debouncer.update(pose_active, now);
        debug!(
            t = now.as_secs_f64(),
            decision = decision.as_str(),
            "digits {}",
            hand.map(|h| self.classifier.closed_digits(h).to_sexp())
                .unwrap_or_else(|| "nil".to_string()),
        );
        let action_ok = match decision {
            FireDecision::Fire => {
                self.stats.fires += 1;
                Some(self.run_action())
            }
            FireDecision::Suppressed => {
                self.stats.suppressed += 1;
                None
            }
            FireDecision::NoFire => None,
        };

        FrameOutcome {
            pose_active,
            decision,
            action_ok,
        }
    }

    fn run_action(&mut self) -> bool {
        debug!("Triggering action {}", self.action.name());
        match self.action.perform() {
            Ok(()) => true,
            Err(e) => {
                self.stats.action_failures += 1;
                warn!("Action {} failed: {}", self.action.name(), e);
                false
            }
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn debouncer(&self) -> &GestureDebouncer {
        &self.debouncer
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Generate s-expression for session status.
    pub fn status_sexp(&self) -> String {
        let res = self.config.capture_resolution();
        format!(
            "(:action \"{}\" :resolution (:width {} :height {}) :frames {} :hand-frames {} :pose-frames {} :fires {} :suppressed {} :action-failures {} :debounce {})",
            self.action.name(),
            res.width,
            res.height,
            self.stats.frames,
            self.stats.frames_with_hand,
            self.stats.pose_frames,
            self.stats.fires,
            self.stats.suppressed,
            self.stats.action_failures,
            self.debouncer.status_sexp(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::gesture::classifier::{make_fist, make_open_hand};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts invocations; optionally fails every call.
    struct CountingAction {
        calls: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Action for CountingAction {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn perform(&mut self) -> Result<(), ActionError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ActionError::Spawn {
                    program: "counting".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            Ok(())
        }
    }

    fn make_session(fail: bool) -> (DetectionSession, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let action = CountingAction {
            calls: calls.clone(),
            fail,
        };
        let session = DetectionSession::new(SessionConfig::default(), Box::new(action)).unwrap();
        (session, calls)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_config_defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.cooldown_secs, 1.0);
        assert_eq!(c.required_consecutive_frames, 3);
        assert!((c.thumb_closed_threshold - 0.1).abs() < f32::EPSILON);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let bad = [
            SessionConfig {
                cooldown_secs: 0.0,
                ..Default::default()
            },
            SessionConfig {
                cooldown_secs: -1.0,
                ..Default::default()
            },
            SessionConfig {
                cooldown_secs: f64::NAN,
                ..Default::default()
            },
            SessionConfig {
                required_consecutive_frames: 0,
                ..Default::default()
            },
            SessionConfig {
                thumb_closed_threshold: 0.0,
                ..Default::default()
            },
        ];
        for config in bad {
            let calls = Rc::new(Cell::new(0));
            let action = CountingAction { calls, fail: false };
            let result = DetectionSession::new(config, Box::new(action));
            assert!(matches!(result, Err(GestureError::Configuration(_))));
        }
    }

    #[test]
    fn test_capture_resolution() {
        let mut c = SessionConfig::default();
        assert_eq!(c.capture_resolution(), CaptureResolution { width: 640, height: 480 });
        c.high_resolution = true;
        assert_eq!(c.capture_resolution(), CaptureResolution { width: 1280, height: 720 });
    }

    #[test]
    fn test_fist_fires_action_once() {
        let (mut session, calls) = make_session(false);
        let fist = make_fist();
        let mut decisions = Vec::new();
        for i in 0..10 {
            let outcome = session.process_frame(&Frame::new(ms(i * 33), Some(fist.clone())));
            assert!(outcome.pose_active);
            decisions.push(outcome.decision);
        }
        assert_eq!(decisions[2], FireDecision::Fire);
        assert_eq!(calls.get(), 1);
        assert_eq!(session.stats().fires, 1);
        assert_eq!(session.stats().pose_frames, 10);
    }

    #[test]
    fn test_open_hand_and_no_hand_never_fire() {
        let (mut session, calls) = make_session(false);
        let open = make_open_hand();
        for i in 0..10 {
            let hand = if i % 2 == 0 { Some(open.clone()) } else { None };
            let outcome = session.process_frame(&Frame::new(ms(i * 33), hand));
            assert_eq!(outcome.decision, FireDecision::NoFire);
        }
        assert_eq!(calls.get(), 0);
        assert_eq!(session.stats().frames, 10);
        assert_eq!(session.stats().frames_with_hand, 5);
    }

    #[test]
    fn test_lost_hand_resets_debounce() {
        let (mut session, calls) = make_session(false);
        let fist = make_fist();
        session.process_frame(&Frame::new(ms(0), Some(fist.clone())));
        session.process_frame(&Frame::new(ms(33), Some(fist.clone())));
        session.process_frame(&Frame::empty(ms(66)));
        assert_eq!(session.debouncer().state().consecutive_matches, 0);
        session.process_frame(&Frame::new(ms(99), Some(fist.clone())));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_action_failure_is_contained() {
        let (mut session, calls) = make_session(true);
        let fist = make_fist();
        let mut last = None;
        for i in 0..3 {
            last = Some(session.process_frame(&Frame::new(ms(i * 33), Some(fist.clone()))));
        }
        let outcome = last.unwrap();
        assert_eq!(outcome.decision, FireDecision::Fire);
        assert_eq!(outcome.action_ok, Some(false));
        assert_eq!(calls.get(), 1);
        assert_eq!(session.stats().action_failures, 1);

        let state = session.debouncer().state();
        assert!(state.armed);
        assert_eq!(state.last_fire_time, Some(ms(66)));

        // Session keeps processing after the failure
        let outcome = session.process_frame(&Frame::new(ms(99), Some(fist)));
        assert_eq!(outcome.decision, FireDecision::NoFire);
    }

    #[test]
    fn test_quick_repeat_suppressed() {
        let (mut session, calls) = make_session(false);
        let fist = make_fist();
        let mut t = 0;
        for round in 0..2 {
            for _ in 0..3 {
                session.process_frame(&Frame::new(ms(t), Some(fist.clone())));
                t += 33;
            }
            session.process_frame(&Frame::empty(ms(t)));
            t += 33;
            assert_eq!(calls.get(), 1, "round {round}");
        }
        assert_eq!(session.stats().suppressed, 1);
    }

    #[test]
    fn test_process_landmarks_rejects_bad_hand() {
        let (mut session, _) = make_session(false);
        let points = vec![Landmark::new(0.5, 0.5); 12];
        let err = session.process_landmarks(Some(points.as_slice()), ms(0)).unwrap_err();
        assert!(matches!(err, GestureError::InvalidInput { got: 12, .. }));
        assert_eq!(session.stats().frames, 0);

        let outcome = session.process_landmarks(None, ms(33)).unwrap();
        assert!(!outcome.pose_active);
        assert_eq!(session.stats().frames, 1);
    }

    #[test]
    fn test_process_landmarks_fist() {
        let (mut session, calls) = make_session(false);
        let fist = make_fist();
        for i in 0..3 {
            session
                .process_landmarks(Some(fist.landmarks().as_slice()), ms(i * 33))
                .unwrap();
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_status_sexp() {
        let (session, _) = make_session(false);
        let sexp = session.status_sexp();
        assert!(sexp.starts_with("(:action \"counting\""));
        assert!(sexp.contains(":resolution (:width 640 :height 480)"));
        assert!(sexp.contains(":fires 0"));
        assert!(sexp.contains(":debounce (:consecutive 0"));
    }

    #[test]
    fn test_rejected_hand_mid_gesture_keeps_state() {
        let (mut session, calls) = make_session(false);
        let fist = make_fist();
        for i in 0..2 {
            let outcome = session
                .process_landmarks(Some(fist.landmarks().as_slice()), ms(i * 33))
                .unwrap();
            assert_eq!(outcome.decision, FireDecision::NoFire);
        }

        let before = session.debouncer().state().clone();
        let points = vec![Landmark::new(0.5, 0.5); 12];
        let err = session.process_landmarks(Some(points.as_slice()), ms(66)).unwrap_err();
        assert!(matches!(err, GestureError::InvalidInput { got: 12, .. }));
        assert_eq!(session.debouncer().state(), &before);
        assert_eq!(before.consecutive_matches, 2);
        assert!(!before.armed);
        assert_eq!(session.stats().frames, 2);

        let outcome = session
            .process_landmarks(Some(fist.landmarks().as_slice()), ms(99))
            .unwrap();
        assert_eq!(outcome.decision, FireDecision::Fire);
        assert_eq!(calls.get(), 1);
    }
}
