//! Frame sources: turn tracker output into ordered `Frame` values.
//!
//! The line format is one s-expression plist per frame:
//!
//! ```text
//! (:t 0.033 :hand ((0.51 0.62) (0.49 0.58 -0.01) ...))   ; 21 points
//! (:t 0.066 :hand nil)                                   ; no hand
//! (:t 0.100 :hands (((...)) ((...))))                    ; first hand used
//! ```
//!
//! `:t` is seconds since the start of the stream.  Without it the frame is
//! stamped with the time elapsed since the source was opened.  Timestamps
//! must not go backwards; a frame stamped earlier than its predecessor is
//! rejected.

use std::collections::VecDeque;
use std::io::BufRead;
use std::time::{Duration, Instant};

use lexpr::Value;
use tracing::debug;

use crate::error::GestureError;
use crate::tracking::{Hand, HandLandmark, Landmark};

/// One tracker tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonic time since the stream started.
    pub timestamp: Duration,
    /// First detected hand, if any.
    pub hand: Option<Hand>,
    /// Number of hands the tracker reported.
    pub hand_count: usize,
}

impl Frame {
    pub fn new(timestamp: Duration, hand: Option<Hand>) -> Self {
        let hand_count = usize::from(hand.is_some());
        Self {
            timestamp,
            hand,
            hand_count,
        }
    }

    pub fn empty(timestamp: Duration) -> Self {
        Self::new(timestamp, None)
    }
}

/// Source of frames in capture order.
pub trait FrameSource {
    /// Next frame, `Ok(None)` at end of stream.  A malformed frame is an
    /// error for that frame only; callers may keep reading.
    fn next_frame(&mut self) -> Result<Option<Frame>, GestureError>;
}

// ── S-expression lines ─────────────────────────────────────

/// Reads one s-expression frame per line.
pub struct SexpFrameSource<R: BufRead> {
    reader: R,
    line_no: usize,
    epoch: Instant,
    last_timestamp: Option<Duration>,
    /// Flip x for frames that were not mirrored before landmark extraction.
    pub mirror: bool,
}

impl<R: BufRead> SexpFrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            epoch: Instant::now(),
            last_timestamp: None,
            mirror: false,
        }
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Lines consumed so far, including skipped ones.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> FrameSource for SexpFrameSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, GestureError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.reader.read_until(b'\n', &mut buf)? == 0 {
                debug!("frame source exhausted after {} lines", self.line_no);
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.line_no;

            let text = std::str::from_utf8(&buf).map_err(|e| GestureError::Frame {
                line,
                reason: format!("invalid UTF-8: {e}"),
            })?;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            let mut frame = parse_frame(line, trimmed, self.epoch.elapsed())?;
            if let Some(last) = self.last_timestamp {
                if frame.timestamp < last {
                    return Err(GestureError::Frame {
                        line,
                        reason: format!(
                            "timestamp {:.3}s is earlier than previous {:.3}s",
                            frame.timestamp.as_secs_f64(),
                            last.as_secs_f64(),
                        ),
                    });
                }
            }
            self.last_timestamp = Some(frame.timestamp);

            if self.mirror {
                frame.hand = frame.hand.map(|h| h.mirrored());
            }
            return Ok(Some(frame));
        }
    }
}

/// Parse a single frame record.  `fallback` stamps frames without `:t`.
pub fn parse_frame(line: usize, raw: &str, fallback: Duration) -> Result<Frame, GestureError> {
    let frame_err = |reason: String| GestureError::Frame { line, reason };

    let value =
        lexpr::from_str(raw).map_err(|e| frame_err(format!("malformed s-expression: {e}")))?;

    let timestamp = match plist_get(&value, "t") {
        None => fallback,
        Some(v) => {
            let secs = as_f64(v).ok_or_else(|| frame_err(":t must be a number".to_string()))?;
            Duration::try_from_secs_f64(secs)
                .map_err(|_| frame_err(format!(":t must be a non-negative time, got {secs}")))?
        }
    };

    let hands: Vec<&Value> = match (plist_get(&value, "hand"), plist_get(&value, "hands")) {
        (Some(h), _) if !is_nil(h) => vec![h],
        (_, Some(hs)) if !is_nil(hs) => {
            list_items(hs).ok_or_else(|| frame_err(":hands must be a list".to_string()))?
        }
        _ => Vec::new(),
    };

    let hand = match hands.first() {
        Some(points) => Some(parse_hand(points).map_err(|e| match e {
            GestureError::Frame { reason, .. } => GestureError::Frame { line, reason },
            other => other,
        })?),
        None => None,
    };

    Ok(Frame {
        timestamp,
        hand,
        hand_count: hands.len(),
    })
}

/// Parse a list of `(x y)` or `(x y z)` points into a hand.
fn parse_hand(value: &Value) -> Result<Hand, GestureError> {
    let bad = |reason: String| GestureError::Frame { line: 0, reason };
    let name = |i: usize| match HandLandmark::from_index(i) {
        Some(lm) => lm.as_str().to_string(),
        None => format!("point {i}"),
    };

    let points =
        list_items(value).ok_or_else(|| bad("hand must be a list of points".to_string()))?;
    let landmarks = points
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let coords = list_items(p).ok_or_else(|| bad(format!("{} must be a list", name(i))))?;
            let nums: Option<Vec<f64>> = coords.into_iter().map(as_f64).collect();
            match nums.as_deref() {
                Some([x, y]) => Ok(Landmark::new(*x as f32, *y as f32)),
                Some([x, y, z]) => Ok(Landmark::with_depth(*x as f32, *y as f32, *z as f32)),
                Some(_) => Err(bad(format!("{} must have 2 or 3 coordinates", name(i)))),
                None => Err(bad(format!("{} coordinates must be numbers", name(i)))),
            }
        })
        .collect::<Result<Vec<Landmark>, GestureError>>()?;

    Hand::from_landmarks(landmarks)
}

/// Look up `:key` in a plist.  Accepts both `Value::Keyword` and the
/// `:`-prefixed `Value::Symbol` that the default parser produces.
fn plist_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Elements of a proper list, `None` if `value` is not a list.
fn list_items(value: &Value) -> Option<Vec<&Value>> {
    let mut items = Vec::new();
    let mut current = value;
    loop {
        match current {
            Value::Cons(pair) => {
                items.push(pair.car());
                current = pair.cdr();
            }
            Value::Null | Value::Nil => return Some(items),
            _ => return None,
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn is_nil(value: &Value) -> bool {
    match value {
        Value::Nil | Value::Null => true,
        Value::Bool(b) => !b,
        Value::Symbol(s) => s.as_ref() == "nil",
        _ => false,
    }
}

// ── Replay ─────────────────────────────────────────────────

/// Yields a prebuilt sequence of frames.
#[derive(Debug, Default)]
pub struct ReplayFrameSource {
    frames: VecDeque<Frame>,
}

impl ReplayFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplayFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, GestureError> {
        Ok(self.frames.pop_front())
    }
}

// ── Tests ──────────────────────────────────────────────────

/// Format a hand as a frame line.
#[cfg(test)]
pub(crate) fn frame_line(t: f64, hand: Option<&Hand>) -> String {
    match hand {
        None => format!("(:t {t} :hand nil)"),
        Some(hand) => {
            let points: Vec<String> = hand
                .landmarks()
                .iter()
                .map(|l| format!("({} {})", l.x, l.y))
                .collect();
            format!("(:t {t} :hand ({}))", points.join(" "))
        }
    }
}
