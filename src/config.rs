//! Gameplay constants and the difficulty tables.

// ── Timing ───────────────────────────────────────────────────────────────────

/// Movement period at slow factor 1.0.
pub const BASE_MOVE_MS: f64 = 150.0;
/// Minimum time an enemy keeps a chosen direction.
pub const DIR_PERSIST_MS: f64 = 800.0;
/// Auto-fire period in mobile mode.
pub const MOBILE_FIRE_PERIOD_MS: f64 = 170.0;
/// Delay between an enemy crash and the defeat screen.
pub const CRASH_DEFEAT_DELAY_MS: f64 = 280.0;
/// Extra delay before an enemy aligned vertically opens fire.
pub const VERTICAL_FIRE_DELAY_MS: f64 = 180.0;
/// Interval between countdown ticks.
pub const COUNTDOWN_STEP_MS: f64 = 1000.0;
pub const COUNTDOWN_FROM: u8 = 3;

// ── Session ──────────────────────────────────────────────────────────────────

pub const START_LIVES: i32 = 3;
pub const HAPTIC_HIT_MS: u32 = 35;

// ── Scoring ──────────────────────────────────────────────────────────────────

pub const SCORE_PER_KILL: i64 = 150;
pub const SCORE_PER_LIFE: i64 = 300;
pub const PENALTY_PER_SECOND: i64 = 3;
pub const PENALTY_PER_SHOT: i64 = 2;

// ── Leaderboard ──────────────────────────────────────────────────────────────

pub const LEADERBOARD_KEY: &str = "leaderboard";
pub const LEADERBOARD_SHOWN: usize = 10;
pub const NAME_MAX_CHARS: usize = 10;
pub const DEFAULT_NAME: &str = "Anonimo";

// ── Swipe gestures ───────────────────────────────────────────────────────────

pub const SWIPE_MIN_DIST_PX: f64 = 18.0;
pub const SWIPE_MAX_TIME_MS: f64 = 450.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeviceMode {
    #[default]
    Desktop,
    Mobile,
}

/// Fixed per-difficulty tuning tuple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyProfile {
    /// Multiplier on [`BASE_MOVE_MS`]; larger is slower.
    pub slow_factor: f64,
    /// Probability an enemy heads toward its target instead of wandering.
    pub bias: f64,
    /// How far enemies fan out around the player's column.
    pub fan_spread: f64,
    pub enemy_fire_ms: f64,
}

impl Difficulty {
    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                slow_factor: 2.2,
                bias: 0.30,
                fan_spread: 0.6,
                enemy_fire_ms: 320.0,
            },
            Difficulty::Normal => DifficultyProfile {
                slow_factor: 1.4,
                bias: 0.45,
                fan_spread: 0.85,
                enemy_fire_ms: 220.0,
            },
            Difficulty::Hard => DifficultyProfile {
                slow_factor: 1.1,
                bias: 0.58,
                fan_spread: 1.1,
                enemy_fire_ms: 160.0,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl DeviceMode {
    pub fn label(self) -> &'static str {
        match self {
            DeviceMode::Desktop => "desktop",
            DeviceMode::Mobile => "mobile",
        }
    }
}

/// Everything the scheduler and the AI need, resolved once per session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    pub move_interval_ms: f64,
    /// Shots travel twice as fast as ships.
    pub shot_interval_ms: f64,
    pub enemy_bias: f64,
    pub fan_spread: f64,
    pub enemy_fire_period_ms: f64,
    /// `Some(period)` when the player fires automatically.
    pub auto_fire_ms: Option<f64>,
}

impl Tuning {
    pub fn new(difficulty: Difficulty, mode: DeviceMode) -> Self {
        let profile = difficulty.profile();
        let move_interval_ms = BASE_MOVE_MS * profile.slow_factor;
        Tuning {
            move_interval_ms,
            shot_interval_ms: move_interval_ms / 2.0,
            enemy_bias: profile.bias,
            fan_spread: profile.fan_spread,
            enemy_fire_period_ms: profile.enemy_fire_ms,
            auto_fire_ms: match mode {
                DeviceMode::Desktop => None,
                DeviceMode::Mobile => Some(MOBILE_FIRE_PERIOD_MS),
            },
        }
    }
}
