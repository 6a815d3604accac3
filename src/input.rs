//! Player input sources.
//!
//! The device mode picks one implementation of [`InputSource`]; both turn
//! host events into the same small set of [`Intent`]s.

use crate::config::{DeviceMode, SWIPE_MAX_TIME_MS, SWIPE_MIN_DIST_PX};
use crate::grid::Direction;

/// Host-neutral key identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Escape,
    Backspace,
    Char(char),
}

/// A raw host event. Touch coordinates are in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawInput {
    Key(Key),
    TouchStart { x: f64, y: f64 },
    TouchEnd { x: f64, y: f64 },
    /// The on-screen pause/resume button.
    PauseButton,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Steer(Direction),
    Fire,
    TogglePause,
}

pub trait InputSource {
    /// Translate a gameplay event; `None` when it means nothing in play.
    fn translate(&mut self, input: &RawInput, now_ms: f64) -> Option<Intent>;

    /// Whether `input` dismisses the instructions screen.
    fn proceeds(&self, input: &RawInput) -> bool;

    fn instructions(&self) -> &'static str;
}

pub fn source_for(mode: DeviceMode) -> Box<dyn InputSource> {
    match mode {
        DeviceMode::Desktop => Box::new(KeyboardInput),
        DeviceMode::Mobile => Box::new(SwipeInput::default()),
    }
}

// ── Desktop ──────────────────────────────────────────────────────────────────

/// Arrows or WASD steer, Space fires, P or Escape pauses.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyboardInput;

impl InputSource for KeyboardInput {
    fn translate(&mut self, input: &RawInput, _now_ms: f64) -> Option<Intent> {
        let key = match input {
            RawInput::Key(key) => *key,
            RawInput::PauseButton => return Some(Intent::TogglePause),
            _ => return None,
        };
        match key {
            Key::Up | Key::Char('w') => Some(Intent::Steer(Direction::Up)),
            Key::Right | Key::Char('d') => Some(Intent::Steer(Direction::Right)),
            Key::Down | Key::Char('s') => Some(Intent::Steer(Direction::Down)),
            Key::Left | Key::Char('a') => Some(Intent::Steer(Direction::Left)),
            Key::Space | Key::Char(' ') => Some(Intent::Fire),
            Key::Char('p') | Key::Char('P') | Key::Escape => Some(Intent::TogglePause),
            _ => None,
        }
    }

    fn proceeds(&self, input: &RawInput) -> bool {
        matches!(input, RawInput::Key(_))
    }

    fn instructions(&self) -> &'static str {
        "Desktop: arrows or WASD to move, Space to fire. P or Esc to pause."
    }
}

// ── Mobile ───────────────────────────────────────────────────────────────────

/// Short swipes steer; firing is automatic. Keys are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwipeInput {
    /// Where and when the current touch began.
    start: Option<(f64, f64, f64)>,
}

impl SwipeInput {
    /// Direction of a completed gesture, if it was short and long enough.
    pub fn classify(dx: f64, dy: f64, dt_ms: f64) -> Option<Direction> {
        if dt_ms > SWIPE_MAX_TIME_MS || dx.hypot(dy) < SWIPE_MIN_DIST_PX {
            return None;
        }
        Some(if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }
}

impl InputSource for SwipeInput {
    fn translate(&mut self, input: &RawInput, now_ms: f64) -> Option<Intent> {
        match *input {
            RawInput::TouchStart { x, y } => {
                self.start = Some((x, y, now_ms));
                None
            }
            RawInput::TouchEnd { x, y } => {
                let (sx, sy, t0) = self.start.take()?;
                Self::classify(x - sx, y - sy, now_ms - t0).map(Intent::Steer)
            }
            RawInput::PauseButton => Some(Intent::TogglePause),
            RawInput::Key(_) => None,
        }
    }

    fn proceeds(&self, input: &RawInput) -> bool {
        matches!(input, RawInput::TouchStart { .. })
    }

    fn instructions(&self) -> &'static str {
        "Mobile: change direction with a short swipe (up/down/left/right). Firing is automatic."
    }
}
