//! Game-logic functions.
//!
//! Every public function takes the current `GameState` by mutable reference
//! and records its side effects as `GameEvent`s instead of performing them.
//! Randomness comes in through an injected RNG and time through explicit
//! timestamps, so every function is deterministic under test.

use rand::Rng;

use crate::config::{Tuning, DIR_PERSIST_MS, PENALTY_PER_SECOND, PENALTY_PER_SHOT};
use crate::config::{SCORE_PER_KILL, SCORE_PER_LIFE, START_LIVES};
use crate::entities::{Enemy, EnemySlot, GameEvent, GameState, GameStatus, Player, Shot};
use crate::grid::{self, Direction, COLS, ROWS};

// ── Constructors ─────────────────────────────────────────────────────────────

/// Build a fresh session: player in the bottom-right corner facing up,
/// one enemy per column along the top row heading down.
pub fn init_state(started_at_ms: f64) -> GameState {
    let mid = (COLS - 1) as f64 / 2.0;
    let enemies = (0..COLS)
        .map(|i| {
            EnemySlot::Alive(Enemy {
                x: i,
                y: 0,
                dir: Direction::Down,
                last_change_ms: 0.0,
                fan_index: (i as f64 - mid) / mid.max(1.0),
            })
        })
        .collect();

    GameState {
        player: Player {
            x: COLS - 1,
            y: ROWS - 1,
            heading: None,
            facing: Direction::Up,
        },
        enemies,
        player_shots: Vec::new(),
        enemy_shots: Vec::new(),
        kills: 0,
        total_shots: 0,
        lives: START_LIVES,
        started_at_ms,
        status: GameStatus::Running,
        crash_pending: false,
        events: Vec::new(),
    }
}

// ── Input-driven transitions ─────────────────────────────────────────────────

/// Steer the player. Takes effect on the next movement tick.
pub fn set_direction(state: &mut GameState, dir: Direction) {
    state.player.heading = Some(dir);
    state.player.facing = dir;
}

/// Fire a shot from the player's cell along its facing.
pub fn player_fire(state: &mut GameState) {
    if !state.is_running() {
        return;
    }
    let p = &state.player;
    state.player_shots.push(Shot::new(p.x, p.y, p.facing));
    state.total_shots += 1;
    state.events.push(GameEvent::PlayerFired);
}

// ── Movement & AI ────────────────────────────────────────────────────────────

/// Advance the player one cell along its heading. Moves that would leave
/// the grid are dropped; the heading is kept for the next tick.
pub fn move_player(state: &mut GameState) {
    if let Some(dir) = state.player.heading {
        let (nx, ny) = grid::step(state.player.x, state.player.y, dir);
        if grid::in_bounds(nx, ny) {
            state.player.x = nx;
            state.player.y = ny;
        }
    }
    check_crash(state);
}

/// Column an enemy aims for: the player's column shifted by its fan offset.
pub fn target_column(enemy: &Enemy, player_x: i32, fan_spread: f64) -> i32 {
    let raw = player_x as f64 + enemy.fan_index * fan_spread;
    // Round half up, then keep inside the grid.
    ((raw + 0.5).floor() as i32).clamp(0, COLS - 1)
}

/// The biased-random direction choice made at each re-evaluation.
///
/// With probability `bias` the enemy closes the larger of the two gaps to
/// its target (vertical on ties, downward when level with or above the
/// player); otherwise it picks any of the four directions uniformly.
pub fn choose_direction(
    enemy: &Enemy,
    player: &Player,
    tuning: &Tuning,
    rng: &mut impl Rng,
) -> Direction {
    let target = target_column(enemy, player.x, tuning.fan_spread);
    let dx = target - enemy.x;
    let dy = player.y - enemy.y;

    if rng.gen::<f64>() < tuning.enemy_bias {
        if dx.abs() > dy.abs() {
            if dx > 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy >= 0 {
            Direction::Down
        } else {
            Direction::Up
        }
    } else {
        Direction::ALL[rng.gen_range(0..4)]
    }
}

/// Move every alive enemy one cell. Directions are only re-evaluated once
/// `DIR_PERSIST_MS` has passed since the enemy's last change.
pub fn move_enemies(state: &mut GameState, now_ms: f64, tuning: &Tuning, rng: &mut impl Rng) {
    let player = state.player.clone();
    for enemy in state.enemies.iter_mut().filter_map(EnemySlot::alive_mut) {
        if now_ms - enemy.last_change_ms >= DIR_PERSIST_MS {
            enemy.dir = choose_direction(enemy, &player, tuning, rng);
            enemy.last_change_ms = now_ms;
        }
        let (nx, ny) = grid::step(enemy.x, enemy.y, enemy.dir);
        if grid::in_bounds(nx, ny) {
            enemy.x = nx;
            enemy.y = ny;
        }
    }
    check_crash(state);
}

/// Entity-vs-entity collision. Only the first enemy found on the player's
/// cell counts, and only once per session.
pub fn check_crash(state: &mut GameState) -> bool {
    if state.crash_pending || !state.is_running() {
        return false;
    }
    let (px, py) = (state.player.x, state.player.y);
    if state.alive_enemies().any(|e| e.x == px && e.y == py) {
        state.crash_pending = true;
        state.events.push(GameEvent::Crash { x: px, y: py });
        return true;
    }
    false
}

// ── Combat ───────────────────────────────────────────────────────────────────

fn advance_shots(shots: &mut [Shot]) {
    for s in shots.iter_mut().filter(|s| s.active) {
        let (nx, ny) = grid::step(s.x, s.y, s.dir);
        s.x = nx;
        s.y = ny;
        if !grid::in_bounds(nx, ny) {
            s.active = false;
        }
    }
}

/// One combat tick. The order of the phases below is significant.
pub fn step_shots(state: &mut GameState) {
    // 1. Snapshot previous positions
    for s in state
        .player_shots
        .iter_mut()
        .chain(state.enemy_shots.iter_mut())
        .filter(|s| s.active)
    {
        s.px = s.x;
        s.py = s.y;
    }

    // 2. Advance, dropping anything that leaves the grid
    advance_shots(&mut state.player_shots);
    advance_shots(&mut state.enemy_shots);

    // 3. Crossing interception: shots that swapped cells this tick
    for p in state.player_shots.iter_mut() {
        if !p.active {
            continue;
        }
        for e in state.enemy_shots.iter_mut() {
            if !e.active {
                continue;
            }
            if p.px == e.x && p.py == e.y && e.px == p.x && e.py == p.y {
                p.active = false;
                e.active = false;
            }
        }
    }

    // 4. Player shots ↔ enemies: first slot in order wins the shot
    for p in state.player_shots.iter_mut() {
        if !p.active {
            continue;
        }
        let (x, y) = (p.x, p.y);
        let hit = state
            .enemies
            .iter()
            .position(|s| s.alive().is_some_and(|e| e.x == x && e.y == y));
        if let Some(idx) = hit {
            state.enemies[idx] = EnemySlot::Destroyed;
            state.kills += 1;
            p.active = false;
            state.events.push(GameEvent::EnemyDestroyed { x: p.x, y: p.y });
        }
    }

    // 5. Enemy shots ↔ player
    let (px, py) = (state.player.x, state.player.y);
    for s in state.enemy_shots.iter_mut() {
        if s.active && s.x == px && s.y == py {
            s.active = false;
            state.lives -= 1;
            state.events.push(GameEvent::PlayerHit { x: px, y: py });
        }
    }

    // 6. Compact
    state.player_shots.retain(|s| s.active);
    state.enemy_shots.retain(|s| s.active);

    // 7. Terminal check
    if state.lives <= 0 {
        end_game(state, false);
    } else if state.all_enemies_destroyed() {
        end_game(state, true);
    }
}

// ── Enemy fire control ───────────────────────────────────────────────────────

/// Enemies facing the player along their row fire at once; those facing it
/// along their column are queued and fire after the vertical delay.
pub fn enemy_fire_check(state: &mut GameState) {
    let (px, py) = (state.player.x, state.player.y);
    for (slot, enemy) in state
        .enemies
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.alive().map(|e| (i, e)))
    {
        if enemy.dir.is_horizontal() && enemy.y == py {
            let dx = px - enemy.x;
            if (dx > 0 && enemy.dir == Direction::Right) || (dx < 0 && enemy.dir == Direction::Left)
            {
                state
                    .enemy_shots
                    .push(Shot::new(enemy.x, enemy.y, enemy.dir));
                state.events.push(GameEvent::EnemyFired);
            }
        }
        if enemy.dir.is_vertical() && enemy.x == px {
            let dy = py - enemy.y;
            if (dy > 0 && enemy.dir == Direction::Down) || (dy < 0 && enemy.dir == Direction::Up) {
                state.events.push(GameEvent::EnemyFireQueued { slot });
            }
        }
    }
}

/// Resolve a queued vertical shot from `slot`'s current position, if the
/// enemy is still alive and the session still running.
pub fn spawn_enemy_shot(state: &mut GameState, slot: usize) -> bool {
    if !state.is_running() {
        return false;
    }
    let Some(enemy) = state.enemies.get(slot).and_then(EnemySlot::alive) else {
        return false;
    };
    let shot = Shot::new(enemy.x, enemy.y, enemy.dir);
    state.enemy_shots.push(shot);
    state.events.push(GameEvent::EnemyFired);
    true
}

// ── Session end & scoring ────────────────────────────────────────────────────

/// Mark the session finished. Only the first call has any effect.
pub fn end_game(state: &mut GameState, victory: bool) -> bool {
    if !state.is_running() {
        return false;
    }
    state.status = if victory {
        GameStatus::Won
    } else {
        GameStatus::Lost
    };
    true
}

/// Whole seconds elapsed since the session started.
pub fn elapsed_seconds(state: &GameState, now_ms: f64) -> i64 {
    ((now_ms - state.started_at_ms).max(0.0) / 1000.0).floor() as i64
}

pub fn final_score(kills: u32, lives: i32, elapsed_s: i64, total_shots: u32) -> i64 {
    kills as i64 * SCORE_PER_KILL + lives as i64 * SCORE_PER_LIFE
        - elapsed_s * PENALTY_PER_SECOND
        - total_shots as i64 * PENALTY_PER_SHOT
}
