//! The session controller: owns the game state and drives the
//! Menu → Instructions → Countdown → Playing ⇄ Paused → GameOver flow.
//!
//! The host calls [`Session::handle_input`] for every input event and
//! [`Session::frame`] once per rendered frame with a monotonic timestamp in
//! milliseconds. Everything else (scheduling, delayed actions, sound,
//! effects, persistence) happens inside.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{AudioEngine, SoundCue};
use crate::compute;
use crate::config::{
    DeviceMode, Difficulty, Tuning, COUNTDOWN_FROM, COUNTDOWN_STEP_MS, CRASH_DEFEAT_DELAY_MS,
    HAPTIC_HIT_MS, NAME_MAX_CHARS, VERTICAL_FIRE_DELAY_MS,
};
use crate::effects::{Burst, Effects};
use crate::entities::{GameEvent, GameState, GameStatus};
use crate::input::{self, InputSource, Intent, Key, RawInput};
use crate::leaderboard::{self, KeyValueStore, LeaderboardEntry};
use crate::scheduler::Scheduler;
use crate::timers::Timers;

/// Final numbers of a finished game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSummary {
    pub victory: bool,
    pub kills: u32,
    pub lives: i32,
    pub elapsed_s: i64,
    pub total_shots: u32,
    pub score: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Menu,
    Instructions,
    Countdown { remaining: u8, next_tick_ms: f64 },
    Playing,
    Paused,
    GameOver(GameSummary),
}

/// Vibration capability of the host, when it has one.
pub trait Haptics {
    fn vibrate(&mut self, ms: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delayed {
    /// Defeat following a crash, once the explosion has been seen.
    Defeat,
    EnemyFire { slot: usize },
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct Session {
    phase: Phase,
    difficulty: Difficulty,
    mode: DeviceMode,
    tuning: Tuning,
    input: Box<dyn InputSource>,
    game: Option<GameState>,
    scheduler: Scheduler,
    /// Delayed actions, on the simulation clock.
    timers: Timers<Delayed>,
    /// Unpaused play time of the current game.
    sim_ms: f64,
    effects: Effects,
    audio: AudioEngine,
    haptics: Option<Box<dyn Haptics>>,
    store: Box<dyn KeyValueStore>,
    leaderboard: Vec<LeaderboardEntry>,
    name_input: String,
    wall_clock: fn() -> u64,
    rng: StdRng,
}

impl Session {
    pub fn new(store: Box<dyn KeyValueStore>, audio: AudioEngine, seed: u64) -> Self {
        let difficulty = Difficulty::default();
        let mode = DeviceMode::default();
        let tuning = Tuning::new(difficulty, mode);
        let leaderboard = leaderboard::load(store.as_ref());
        Session {
            phase: Phase::Menu,
            difficulty,
            mode,
            tuning,
            input: input::source_for(mode),
            game: None,
            scheduler: Scheduler::new(&tuning),
            timers: Timers::new(),
            sim_ms: 0.0,
            effects: Effects::new(),
            audio,
            haptics: None,
            store,
            leaderboard,
            name_input: String::new(),
            wall_clock: epoch_ms,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_haptics(mut self, haptics: Box<dyn Haptics>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    /// Source of leaderboard timestamps (ms since the Unix epoch).
    pub fn with_wall_clock(mut self, clock: fn() -> u64) -> Self {
        self.wall_clock = clock;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Direct access for hosts and tests that stage positions.
    pub fn game_mut(&mut self) -> Option<&mut GameState> {
        self.game.as_mut()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn sim_ms(&self) -> f64 {
        self.sim_ms
    }

    pub fn instructions(&self) -> &'static str {
        self.input.instructions()
    }

    pub fn leaderboard_top(&self) -> &[LeaderboardEntry] {
        leaderboard::top(&self.leaderboard)
    }

    pub fn name_input(&self) -> &str {
        &self.name_input
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    /// Whole seconds played so far, for the HUD.
    pub fn elapsed_seconds(&self, now_ms: f64) -> i64 {
        self.game
            .as_ref()
            .map(|g| compute::elapsed_seconds(g, now_ms))
            .unwrap_or(0)
    }

    // ── Menu ─────────────────────────────────────────────────────────────────

    pub fn select_difficulty(&mut self, difficulty: Difficulty) {
        if self.phase == Phase::Menu {
            self.difficulty = difficulty;
        }
    }

    pub fn select_mode(&mut self, mode: DeviceMode) {
        if self.phase == Phase::Menu {
            self.mode = mode;
        }
    }

    /// Leave the menu with the selected settings. This is the first user
    /// gesture, so the audio output is unlocked here.
    pub fn start(&mut self) {
        if self.phase != Phase::Menu {
            return;
        }
        self.tuning = Tuning::new(self.difficulty, self.mode);
        self.input = input::source_for(self.mode);
        self.audio.unlock();
        self.phase = Phase::Instructions;
        tracing::info!(
            difficulty = self.difficulty.label(),
            mode = self.mode.label(),
            "Session configured"
        );
    }

    fn begin_countdown(&mut self, now_ms: f64) {
        self.phase = Phase::Countdown {
            remaining: COUNTDOWN_FROM,
            next_tick_ms: now_ms + COUNTDOWN_STEP_MS,
        };
        self.audio.play(SoundCue::Countdown(COUNTDOWN_FROM));
    }

    fn start_game(&mut self, now_ms: f64) {
        self.game = Some(compute::init_state(now_ms));
        self.scheduler = Scheduler::new(&self.tuning);
        self.timers.clear();
        self.sim_ms = 0.0;
        self.effects.clear();
        self.phase = Phase::Playing;
        self.audio.play(SoundCue::Start);
        tracing::info!(
            move_ms = self.tuning.move_interval_ms,
            enemy_fire_ms = self.tuning.enemy_fire_period_ms,
            "Game started"
        );
    }

    // ── Input ────────────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, raw: RawInput, now_ms: f64) {
        match self.phase {
            Phase::Menu => match raw {
                RawInput::Key(Key::Char('1')) => self.select_difficulty(Difficulty::Easy),
                RawInput::Key(Key::Char('2')) => self.select_difficulty(Difficulty::Normal),
                RawInput::Key(Key::Char('3')) => self.select_difficulty(Difficulty::Hard),
                RawInput::Key(Key::Char('m')) | RawInput::Key(Key::Char('M')) => {
                    let next = match self.mode {
                        DeviceMode::Desktop => DeviceMode::Mobile,
                        DeviceMode::Mobile => DeviceMode::Desktop,
                    };
                    self.select_mode(next);
                }
                RawInput::Key(Key::Enter) => self.start(),
                _ => {}
            },
            Phase::Instructions => {
                if self.input.proceeds(&raw) {
                    self.begin_countdown(now_ms);
                }
            }
            Phase::Countdown { .. } => {}
            Phase::Playing | Phase::Paused => {
                if let Some(intent) = self.input.translate(&raw, now_ms) {
                    self.apply_intent(intent);
                }
            }
            Phase::GameOver(_) => match raw {
                RawInput::Key(Key::Enter) => self.save_score(),
                RawInput::Key(Key::Backspace) => {
                    self.name_input.pop();
                }
                RawInput::Key(Key::Char(c)) if !c.is_control() => {
                    if self.name_input.chars().count() < NAME_MAX_CHARS {
                        self.name_input.push(c);
                    }
                }
                RawInput::Key(Key::Space) => {
                    if self.name_input.chars().count() < NAME_MAX_CHARS {
                        self.name_input.push(' ');
                    }
                }
                _ => {}
            },
        }
    }

    pub fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::TogglePause => self.toggle_pause(),
            Intent::Steer(dir) => {
                if let Some(game) = self.game.as_mut() {
                    compute::set_direction(game, dir);
                }
            }
            Intent::Fire => {
                if self.phase != Phase::Playing {
                    return;
                }
                if let Some(game) = self.game.as_mut() {
                    compute::player_fire(game);
                }
                self.dispatch_events();
            }
        }
    }

    /// Flip between Playing and Paused. Has no effect in any other phase.
    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            Phase::Playing => {
                tracing::debug!(sim_ms = self.sim_ms, "Paused");
                Phase::Paused
            }
            Phase::Paused => {
                tracing::debug!(sim_ms = self.sim_ms, "Resumed");
                Phase::Playing
            }
            _ => return,
        };
    }

    // ── Frame ────────────────────────────────────────────────────────────────

    pub fn frame(&mut self, now_ms: f64) {
        match self.phase {
            Phase::Countdown {
                remaining,
                next_tick_ms,
            } if now_ms >= next_tick_ms => {
                if remaining > 1 {
                    self.phase = Phase::Countdown {
                        remaining: remaining - 1,
                        next_tick_ms: next_tick_ms + COUNTDOWN_STEP_MS,
                    };
                    self.audio.play(SoundCue::Countdown(remaining - 1));
                } else {
                    self.start_game(now_ms);
                }
            }
            Phase::Playing => self.simulate(now_ms),
            // Keep the frame clock moving so resuming does not jump.
            Phase::Paused => {
                self.scheduler.frame_delta(now_ms);
            }
            Phase::GameOver(_) => {
                let dt = self.scheduler.frame_delta(now_ms);
                self.effects.update(dt);
            }
            _ => {}
        }
    }

    fn simulate(&mut self, now_ms: f64) {
        let dt = self.scheduler.frame_delta(now_ms);
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if !game.is_running() {
            return;
        }
        self.sim_ms += dt;

        for action in self.timers.take_due(self.sim_ms) {
            match action {
                Delayed::Defeat => {
                    compute::end_game(game, false);
                }
                Delayed::EnemyFire { slot } => {
                    compute::spawn_enemy_shot(game, slot);
                }
            }
        }

        let due = self.scheduler.advance(dt);
        if due.player_move && game.is_running() {
            compute::move_player(game);
        }
        if due.enemy_move && game.is_running() {
            compute::move_enemies(game, self.sim_ms, &self.tuning, &mut self.rng);
        }
        if due.shot_step && game.is_running() {
            compute::step_shots(game);
        }
        if due.enemy_fire && game.is_running() {
            compute::enemy_fire_check(game);
        }
        if due.auto_fire && game.is_running() {
            compute::player_fire(game);
        }

        self.effects.update(dt);
        self.dispatch_events();

        let ended = self.game.as_ref().map(|g| g.status).filter(|s| *s != GameStatus::Running);
        if let Some(status) = ended {
            self.finish(status == GameStatus::Won, now_ms);
        }
    }

    /// Turn game events into sounds, particles, haptics and delayed actions.
    fn dispatch_events(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        for event in game.drain_events() {
            match event {
                GameEvent::PlayerFired => self.audio.play(SoundCue::PlayerShot),
                GameEvent::EnemyFired => self.audio.play(SoundCue::EnemyShot),
                GameEvent::EnemyDestroyed { x, y } => {
                    tracing::debug!(x, y, kills = game.kills, "Enemy destroyed");
                    self.effects.spawn(Burst::Hit, x, y, &mut self.rng);
                    self.audio.play(SoundCue::Explode);
                }
                GameEvent::PlayerHit { x, y } => {
                    tracing::debug!(lives = game.lives, "Player hit");
                    self.effects.spawn(Burst::Hit, x, y, &mut self.rng);
                    self.audio.play(SoundCue::Hit);
                    if let Some(haptics) = self.haptics.as_mut() {
                        haptics.vibrate(HAPTIC_HIT_MS);
                    }
                }
                GameEvent::Crash { x, y } => {
                    tracing::debug!(x, y, "Crash");
                    self.effects.spawn(Burst::Crash, x, y, &mut self.rng);
                    self.audio.play(SoundCue::Explode);
                    self.timers
                        .schedule(self.sim_ms, CRASH_DEFEAT_DELAY_MS, Delayed::Defeat);
                }
                GameEvent::EnemyFireQueued { slot } => {
                    self.timers.schedule(
                        self.sim_ms,
                        VERTICAL_FIRE_DELAY_MS,
                        Delayed::EnemyFire { slot },
                    );
                }
            }
        }
    }

    fn finish(&mut self, victory: bool, now_ms: f64) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let elapsed_s = compute::elapsed_seconds(game, now_ms);
        let summary = GameSummary {
            victory,
            kills: game.kills,
            lives: game.lives,
            elapsed_s,
            total_shots: game.total_shots,
            score: compute::final_score(game.kills, game.lives, elapsed_s, game.total_shots),
        };
        tracing::info!(
            victory,
            score = summary.score,
            kills = summary.kills,
            elapsed_s,
            "Game over"
        );
        self.timers.clear();
        self.audio.play(SoundCue::GameOver { victory });
        self.leaderboard = leaderboard::load(self.store.as_ref());
        self.name_input.clear();
        self.phase = Phase::GameOver(summary);
    }

    /// Store the final score under the typed name and return to the menu.
    pub fn save_score(&mut self) {
        let Phase::GameOver(summary) = &self.phase else {
            return;
        };
        let score = summary.score;
        let name = leaderboard::sanitize_name(&self.name_input);
        match leaderboard::record(self.store.as_mut(), &name, score, (self.wall_clock)()) {
            Ok(entries) => {
                tracing::info!(name = %name, score, "Score saved");
                self.leaderboard = entries;
            }
            Err(e) => tracing::warn!(error = %e, "Could not save score"),
        }
        self.name_input.clear();
        self.game = None;
        self.effects.clear();
        self.phase = Phase::Menu;
    }
}
