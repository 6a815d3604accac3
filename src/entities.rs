//! All game entity types: plain data, no logic.
use crate::grid::Direction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    Won,
    Lost,
}

// ── Player & enemy ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub x: i32,
    pub y: i32,
    /// Movement direction; `None` until the first steer input.
    pub heading: Option<Direction>,
    /// Drawn orientation and the direction new shots travel.
    pub facing: Direction,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    /// Simulation time of the last direction re-evaluation.
    pub last_change_ms: f64,
    /// Signed offset in [-1, 1] fanning this enemy's target column.
    pub fan_index: f64,
}

/// A spawn slot. Destroyed slots keep their index so the victory check
/// is simply "every slot destroyed".
#[derive(Clone, Debug, PartialEq)]
pub enum EnemySlot {
    Alive(Enemy),
    Destroyed,
}

impl EnemySlot {
    pub fn alive(&self) -> Option<&Enemy> {
        match self {
            EnemySlot::Alive(e) => Some(e),
            EnemySlot::Destroyed => None,
        }
    }

    pub fn alive_mut(&mut self) -> Option<&mut Enemy> {
        match self {
            EnemySlot::Alive(e) => Some(e),
            EnemySlot::Destroyed => None,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, EnemySlot::Destroyed)
    }
}

// ── Projectiles ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Shot {
    pub x: i32,
    pub y: i32,
    /// Position before the latest shot step (crossing interception).
    pub px: i32,
    pub py: i32,
    pub dir: Direction,
    pub active: bool,
}

impl Shot {
    pub fn new(x: i32, y: i32, dir: Direction) -> Self {
        Shot {
            x,
            y,
            px: x,
            py: y,
            dir,
            active: true,
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Side effects produced by the game logic, drained by the session which
/// turns them into sounds, particles, haptics and delayed actions.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerFired,
    EnemyFired,
    EnemyDestroyed { x: i32, y: i32 },
    PlayerHit { x: i32, y: i32 },
    /// An enemy rammed the player; defeat follows after a short delay.
    Crash { x: i32, y: i32 },
    /// A vertically aligned enemy will fire after the vertical delay.
    EnemyFireQueued { slot: usize },
}

// ── Master game state ─────────────────────────────────────────────────────────

/// The state of one play session, owned by the session controller.
#[derive(Clone, Debug)]
pub struct GameState {
    pub player: Player,
    pub enemies: Vec<EnemySlot>,
    pub player_shots: Vec<Shot>,
    pub enemy_shots: Vec<Shot>,
    pub kills: u32,
    /// Player shots fired this session.
    pub total_shots: u32,
    /// Signed: several hits in one tick may push it below zero.
    pub lives: i32,
    /// Host timestamp the session started at.
    pub started_at_ms: f64,
    pub status: GameStatus,
    /// Set once a crash has been detected so it only triggers once.
    pub crash_pending: bool,
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }

    pub fn alive_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter_map(EnemySlot::alive)
    }

    pub fn all_enemies_destroyed(&self) -> bool {
        self.enemies.iter().all(EnemySlot::is_destroyed)
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
