//! Cross-frame debouncing of pose decisions.
//!
//! A pose must hold for `required_consecutive` frames before it counts as
//! a gesture.  Once counted, the debouncer stays armed until a negative
//! frame releases it, so a held pose is one gesture rather than one per
//! frame.  The cooldown then gates whether that gesture may fire.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::GestureError;

// ── Decisions ──────────────────────────────────────────────

/// Outcome of feeding one frame to the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// Gesture edge detected and cooldown elapsed: run the action.
    Fire,
    /// Gesture edge detected while the cooldown was still active.
    Suppressed,
    /// No new gesture this frame.
    NoFire,
}

impl FireDecision {
    pub fn should_fire(&self) -> bool {
        matches!(self, Self::Fire)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Suppressed => "suppressed",
            Self::NoFire => "no-fire",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Debounce and cooldown parameters.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Consecutive positive frames needed before a gesture is recognized.
    pub required_consecutive: u32,
    /// Minimum time between two fired actions.
    pub cooldown: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            required_consecutive: 3,
            cooldown: Duration::from_secs(1),
        }
    }
}

impl DebounceConfig {
    pub fn validate(&self) -> Result<(), GestureError> {
        if self.required_consecutive == 0 {
            return Err(GestureError::Configuration(
                "required consecutive frames must be at least 1".to_string(),
            ));
        }
        if self.cooldown.is_zero() {
            return Err(GestureError::Configuration(
                "cooldown must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ── State ──────────────────────────────────────────────────

/// Per-session debounce state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureState {
    /// Positive frames in a row, including the current one.
    pub consecutive_matches: u32,
    /// Set when the gesture edge has been taken; cleared by a negative frame.
    pub armed: bool,
    /// Session time of the last fired action, `None` if never fired.
    pub last_fire_time: Option<Duration>,
}

/// Rising-edge debouncer with cooldown.
#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    config: DebounceConfig,
    state: GestureState,
}

impl GestureDebouncer {
    pub fn new(config: DebounceConfig) -> Result<Self, GestureError> {
        config.validate()?;
        Ok(Self {
            config,
            state: GestureState::default(),
        })
    }

    /// Feed one frame's pose decision.  `now` is monotonic time since the
    /// session started; frames must arrive in order.
    pub fn update(&mut self, pose_active: bool, now: Duration) -> FireDecision {
        let st = &mut self.state;

        if !pose_active {
            if st.armed {
                debug!("Gesture released after {} frames", st.consecutive_matches);
            }
            st.consecutive_matches = 0;
            st.armed = false;
            return FireDecision::NoFire;
        }

        st.consecutive_matches = st.consecutive_matches.saturating_add(1);

        if st.consecutive_matches < self.config.required_consecutive || st.armed {
            return FireDecision::NoFire;
        }

        // Rising edge: latch until the pose is released
        st.armed = true;

        let cooled_down = match st.last_fire_time {
            None => true,
            Some(last) => now.saturating_sub(last) > self.config.cooldown,
        };

        if cooled_down {
            st.last_fire_time = Some(now);
            info!("Fist gesture detected at {:.3}s", now.as_secs_f64());
            FireDecision::Fire
        } else {
            debug!(
                "Fist gesture at {:.3}s suppressed by cooldown ({:.3}s)",
                now.as_secs_f64(),
                self.config.cooldown.as_secs_f64(),
            );
            FireDecision::Suppressed
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed
    }

    /// Forget all cross-frame state, as at session start.
    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }

    pub fn status_sexp(&self) -> String {
        let last = self
            .state
            .last_fire_time
            .map(|t| format!("{:.3}", t.as_secs_f64()))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:consecutive {} :required {} :armed {} :cooldown-s {:.3} :last-fire {})",
            self.state.consecutive_matches,
            self.config.required_consecutive,
            if self.state.armed { "t" } else { "nil" },
            self.config.cooldown.as_secs_f64(),
            last,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[cfg(test)]
fn make_debouncer(cooldown_s: f64) -> GestureDebouncer {
    GestureDebouncer::new(DebounceConfig {
        required_consecutive: 3,
        cooldown: secs(cooldown_s),
    })
    .unwrap()
}
