use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use grid_shooter::audio::{AudioEngine, AudioOutput, OutputFactory, SoundCue};
use grid_shooter::compute;
use grid_shooter::config::{
    DeviceMode, Difficulty, Tuning, CRASH_DEFEAT_DELAY_MS, LEADERBOARD_KEY,
};
use grid_shooter::entities::{Enemy, EnemySlot, Shot};
use grid_shooter::grid::Direction;
use grid_shooter::input::{Key, RawInput};
use grid_shooter::leaderboard::{KeyValueStore, MemoryStore};
use grid_shooter::session::{Haptics, Phase, Session};
use grid_shooter::GameError;

type CueLog = Rc<RefCell<Vec<SoundCue>>>;

struct RecordingOutput(CueLog);

impl AudioOutput for RecordingOutput {
    fn play(
        &mut self,
        cue: SoundCue,
        samples: &[f32],
        _sample_rate: u32,
    ) -> grid_shooter::Result<()> {
        assert!(!samples.is_empty());
        self.0.borrow_mut().push(cue);
        Ok(())
    }
}

struct RecordingHaptics(Rc<RefCell<Vec<u32>>>);

impl Haptics for RecordingHaptics {
    fn vibrate(&mut self, ms: u32) {
        self.0.borrow_mut().push(ms);
    }
}

fn fixed_clock() -> u64 {
    1_700_000_000_000
}

fn recording_session() -> (Session, CueLog) {
    let log: CueLog = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let factory: OutputFactory = Box::new(move || -> grid_shooter::Result<Box<dyn AudioOutput>> {
        Ok(Box::new(RecordingOutput(sink.clone())))
    });
    let session = Session::new(Box::new(MemoryStore::new()), AudioEngine::new(factory, 1), 7)
        .with_wall_clock(fixed_clock);
    (session, log)
}

fn key(k: Key) -> RawInput {
    RawInput::Key(k)
}

/// Walk menu → instructions → countdown until play begins. Returns the
/// timestamp the game started at.
fn start_playing(session: &mut Session) -> f64 {
    session.handle_input(key(Key::Enter), 0.0);
    assert_eq!(*session.phase(), Phase::Instructions);
    session.handle_input(key(Key::Char('x')), 0.0);
    for t in [1000.0, 2000.0, 3000.0] {
        session.frame(t);
    }
    assert_eq!(*session.phase(), Phase::Playing);
    // First simulated frame only primes the frame clock
    session.frame(3000.0);
    3000.0
}

/// Replace the enemy row with a single enemy that never changes direction.
fn stage_single_enemy(session: &mut Session, x: i32, y: i32, dir: Direction) {
    let game = session.game_mut().expect("game in progress");
    for slot in game.enemies.iter_mut() {
        *slot = EnemySlot::Destroyed;
    }
    game.enemies[0] = EnemySlot::Alive(Enemy {
        x,
        y,
        dir,
        last_change_ms: 1.0e12,
        fan_index: 0.0,
    });
}

// ── Flow ──────────────────────────────────────────────────────────────────────

#[test]
fn countdown_ticks_then_starts() {
    let (mut session, log) = recording_session();
    assert_eq!(*session.phase(), Phase::Menu);
    session.handle_input(key(Key::Enter), 0.0);
    assert!(session.audio().is_available());
    session.handle_input(key(Key::Char('x')), 0.0);

    assert_eq!(
        *session.phase(),
        Phase::Countdown {
            remaining: 3,
            next_tick_ms: 1000.0
        }
    );
    session.frame(999.0);
    assert!(matches!(session.phase(), Phase::Countdown { remaining: 3, .. }));
    session.frame(1000.0);
    assert!(matches!(session.phase(), Phase::Countdown { remaining: 2, .. }));
    session.frame(2000.0);
    assert!(matches!(session.phase(), Phase::Countdown { remaining: 1, .. }));
    session.frame(3000.0);
    assert_eq!(*session.phase(), Phase::Playing);

    assert_eq!(
        *log.borrow(),
        vec![
            SoundCue::Countdown(3),
            SoundCue::Countdown(2),
            SoundCue::Countdown(1),
            SoundCue::Start,
        ]
    );
    let game = session.game().unwrap();
    assert_eq!(game.started_at_ms, 3000.0);
    assert_eq!((game.player.x, game.player.y), (15, 23));
}

#[test]
fn menu_selections_shape_tuning() {
    let (mut session, _) = recording_session();
    session.handle_input(key(Key::Char('3')), 0.0);
    assert_eq!(session.difficulty(), Difficulty::Hard);
    session.handle_input(key(Key::Char('m')), 0.0);
    assert_eq!(session.mode(), DeviceMode::Mobile);
    session.handle_input(key(Key::Char('M')), 0.0);
    assert_eq!(session.mode(), DeviceMode::Desktop);

    session.handle_input(key(Key::Enter), 0.0);
    assert_eq!(*session.tuning(), Tuning::new(Difficulty::Hard, DeviceMode::Desktop));
    // Settings are locked once the menu is left
    session.select_difficulty(Difficulty::Easy);
    assert_eq!(session.difficulty(), Difficulty::Hard);
}

#[test]
fn instructions_follow_mode() {
    let (mut session, _) = recording_session();
    session.handle_input(key(Key::Enter), 0.0);
    assert!(session.instructions().starts_with("Desktop"));

    let (mut session, _) = recording_session();
    session.select_mode(DeviceMode::Mobile);
    session.handle_input(key(Key::Enter), 0.0);
    assert!(session.instructions().contains("swipe"));
}

#[test]
fn toggle_pause_outside_play_is_ignored() {
    let (mut session, _) = recording_session();
    session.toggle_pause();
    assert_eq!(*session.phase(), Phase::Menu);
    session.handle_input(RawInput::PauseButton, 0.0);
    assert_eq!(*session.phase(), Phase::Menu);
}

// ── Pause ─────────────────────────────────────────────────────────────────────

#[test]
fn pause_freezes_simulation_and_keeps_carry() {
    let (mut session, _) = recording_session();
    let t0 = start_playing(&mut session);

    session.frame(t0 + 100.0);
    assert_relative_eq!(session.sim_ms(), 100.0);

    session.handle_input(key(Key::Char('p')), t0 + 100.0);
    assert!(session.is_paused());
    let enemies_before = session.game().unwrap().enemies.clone();
    for i in 1..=20 {
        session.frame(t0 + 100.0 + i as f64 * 100.0);
    }
    assert_relative_eq!(session.sim_ms(), 100.0);
    assert_eq!(session.game().unwrap().enemies, enemies_before);

    session.handle_input(key(Key::Escape), t0 + 2100.0);
    assert_eq!(*session.phase(), Phase::Playing);
    session.frame(t0 + 2150.0);
    // Only the 50 ms after resuming counts
    assert_relative_eq!(session.sim_ms(), 150.0);

    let shot_period = session.tuning().shot_interval_ms;
    assert_relative_eq!(
        session.scheduler().shot_step.acc_ms,
        150.0 - shot_period,
        epsilon = 1e-9
    );
}

#[test]
fn steering_is_allowed_while_paused_but_firing_is_not() {
    let (mut session, log) = recording_session();
    let t0 = start_playing(&mut session);
    session.handle_input(RawInput::PauseButton, t0);
    assert!(session.is_paused());

    session.handle_input(key(Key::Left), t0);
    session.handle_input(key(Key::Space), t0);
    let game = session.game().unwrap();
    assert_eq!(game.player.heading, Some(Direction::Left));
    assert_eq!(game.total_shots, 0);
    assert!(game.player_shots.is_empty());
    assert!(!log.borrow().contains(&SoundCue::PlayerShot));
}

// ── Combat through the session ────────────────────────────────────────────────

#[test]
fn firing_plays_shot_sound() {
    let (mut session, log) = recording_session();
    let t0 = start_playing(&mut session);
    session.handle_input(key(Key::Space), t0);

    let game = session.game().unwrap();
    assert_eq!(game.total_shots, 1);
    assert_eq!(game.player_shots.len(), 1);
    assert_eq!(log.borrow().last(), Some(&SoundCue::PlayerShot));
}

#[test]
fn crash_leads_to_defeat_after_delay() {
    let (mut session, log) = recording_session();
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 15, 22, Direction::Down);

    let t1 = t0 + session.tuning().move_interval_ms + 1.0;
    session.frame(t1);
    assert!(session.game().unwrap().crash_pending);
    assert_eq!(*session.phase(), Phase::Playing);
    assert_eq!(log.borrow().last(), Some(&SoundCue::Explode));
    assert!(!session.effects().is_empty());

    session.frame(t1 + CRASH_DEFEAT_DELAY_MS - 80.0);
    assert_eq!(*session.phase(), Phase::Playing);

    session.frame(t1 + CRASH_DEFEAT_DELAY_MS + 20.0);
    let Phase::GameOver(summary) = session.phase().clone() else {
        panic!("expected game over, got {:?}", session.phase());
    };
    assert!(!summary.victory);
    // A crash ends the game without costing lives
    assert_eq!(summary.lives, 3);
    assert_eq!(
        log.borrow().last(),
        Some(&SoundCue::GameOver { victory: false })
    );
}

#[test]
fn destroying_last_enemy_wins_and_saves_score() {
    let (mut session, log) = recording_session();
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 0, 0, Direction::Up);
    session
        .game_mut()
        .unwrap()
        .player_shots
        .push(Shot::new(0, 1, Direction::Up));

    session.frame(t0 + session.tuning().shot_interval_ms + 1.0);
    let Phase::GameOver(summary) = session.phase().clone() else {
        panic!("expected game over, got {:?}", session.phase());
    };
    assert!(summary.victory);
    assert_eq!(summary.kills, 1);
    assert_eq!(summary.lives, 3);
    assert_eq!(summary.elapsed_s, 0);
    assert_eq!(summary.total_shots, 0);
    assert_eq!(summary.score, 1050);
    assert!(log.borrow().contains(&SoundCue::Explode));
    assert_eq!(log.borrow().last(), Some(&SoundCue::GameOver { victory: true }));

    for c in "Ace".chars() {
        session.handle_input(key(Key::Char(c)), t0);
    }
    assert_eq!(session.name_input(), "Ace");
    session.handle_input(key(Key::Enter), t0);

    assert_eq!(*session.phase(), Phase::Menu);
    assert!(session.game().is_none());
    let top = session.leaderboard_top();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "Ace");
    assert_eq!(top[0].score, 1050);
    assert_eq!(top[0].ts, fixed_clock());
}

#[test]
fn name_entry_is_capped_and_defaulted() {
    let (mut session, _) = recording_session();
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 0, 0, Direction::Up);
    session
        .game_mut()
        .unwrap()
        .player_shots
        .push(Shot::new(0, 1, Direction::Up));
    session.frame(t0 + session.tuning().shot_interval_ms + 1.0);
    assert!(matches!(session.phase(), Phase::GameOver(_)));

    for c in "ABCDEFGHIJKL".chars() {
        session.handle_input(key(Key::Char(c)), t0);
    }
    assert_eq!(session.name_input(), "ABCDEFGHIJ");
    for _ in 0..10 {
        session.handle_input(key(Key::Backspace), t0);
    }
    session.handle_input(key(Key::Space), t0);
    session.handle_input(key(Key::Enter), t0);

    assert_eq!(session.leaderboard_top()[0].name, "Anonimo");
}

#[test]
fn player_hit_vibrates_and_costs_a_life() {
    let buzzes = Rc::new(RefCell::new(Vec::new()));
    let (session, log) = recording_session();
    let mut session = session.with_haptics(Box::new(RecordingHaptics(buzzes.clone())));
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 0, 0, Direction::Up);
    session
        .game_mut()
        .unwrap()
        .enemy_shots
        .push(Shot::new(15, 22, Direction::Down));

    session.frame(t0 + session.tuning().shot_interval_ms + 1.0);
    assert_eq!(session.game().unwrap().lives, 2);
    assert_eq!(*buzzes.borrow(), vec![35]);
    assert!(log.borrow().contains(&SoundCue::Hit));
    assert_eq!(*session.phase(), Phase::Playing);
}

#[test]
fn vertical_enemy_fires_after_delay_from_current_cell() {
    let (mut session, log) = recording_session();
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 15, 5, Direction::Down);

    // Move + fire check in the same frame: the enemy steps to row 6, then queues
    let t1 = t0 + session.tuning().enemy_fire_period_ms + 1.0;
    session.frame(t1);
    assert!(session.game().unwrap().enemy_shots.is_empty());

    session.frame(t1 + 79.0);
    assert!(session.game().unwrap().enemy_shots.is_empty());
    assert!(!log.borrow().contains(&SoundCue::EnemyShot));

    session.frame(t1 + 181.0);
    let game = session.game().unwrap();
    assert_eq!(game.enemy_shots.len(), 1);
    assert_eq!(game.enemy_shots[0].dir, Direction::Down);
    assert_eq!(game.enemy_shots[0].x, 15);
    assert!(log.borrow().contains(&SoundCue::EnemyShot));
}

// ── Mobile ────────────────────────────────────────────────────────────────────

#[test]
fn mobile_mode_swipes_and_auto_fires() {
    let (mut session, log) = recording_session();
    session.handle_input(key(Key::Char('m')), 0.0);
    session.handle_input(key(Key::Enter), 0.0);

    // Keys do not dismiss the mobile instructions; a touch does
    session.handle_input(key(Key::Char('x')), 0.0);
    assert_eq!(*session.phase(), Phase::Instructions);
    session.handle_input(RawInput::TouchStart { x: 10.0, y: 10.0 }, 0.0);
    for t in [1000.0, 2000.0, 3000.0, 3000.0] {
        session.frame(t);
    }
    assert_eq!(*session.phase(), Phase::Playing);
    let t0 = 3000.0;

    session.handle_input(key(Key::Space), t0);
    assert_eq!(session.game().unwrap().total_shots, 0);

    session.handle_input(RawInput::TouchStart { x: 100.0, y: 100.0 }, t0);
    session.handle_input(RawInput::TouchEnd { x: 100.0, y: 40.0 }, t0 + 100.0);
    assert_eq!(session.game().unwrap().player.heading, Some(Direction::Up));

    session.frame(t0 + session.tuning().auto_fire_ms.unwrap() + 1.0);
    assert_eq!(session.game().unwrap().total_shots, 1);
    assert_eq!(log.borrow().last(), Some(&SoundCue::PlayerShot));
}

// ── Audio failures ────────────────────────────────────────────────────────────

#[test]
fn missing_audio_does_not_block_play() {
    let factory: OutputFactory = Box::new(|| -> grid_shooter::Result<Box<dyn AudioOutput>> {
        Err(GameError::Audio("no device".into()))
    });
    let mut session = Session::new(Box::new(MemoryStore::new()), AudioEngine::new(factory, 1), 3);
    let t0 = start_playing(&mut session);
    assert!(!session.audio().is_available());

    session.handle_input(key(Key::Space), t0);
    session.frame(t0 + 500.0);
    assert_eq!(session.game().unwrap().total_shots, 1);
}

#[test]
fn elapsed_time_counts_from_game_start() {
    let (mut session, _) = recording_session();
    assert_eq!(session.elapsed_seconds(10_000.0), 0);
    let t0 = start_playing(&mut session);
    assert_eq!(session.elapsed_seconds(t0 + 2500.0), 2);
    assert_eq!(compute::elapsed_seconds(session.game().unwrap(), t0 + 999.0), 0);
}

/// Shared with the test so the stored value can be inspected; reads fail
/// once `broken` is set.
#[derive(Clone, Default)]
struct SharedStore {
    values: Rc<RefCell<MemoryStore>>,
    broken: Rc<RefCell<bool>>,
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> grid_shooter::Result<Option<String>> {
        if *self.broken.borrow() {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into());
        }
        self.values.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> grid_shooter::Result<()> {
        self.values.borrow_mut().set(key, value)
    }
}

#[test]
fn failed_save_leaves_stored_scores_alone() {
    let store = SharedStore::default();
    grid_shooter::leaderboard::record(&mut *store.values.borrow_mut(), "a", 900, 1).unwrap();
    let before = store.values.borrow().get(LEADERBOARD_KEY).unwrap();

    let mut session = Session::new(Box::new(store.clone()), AudioEngine::silent(), 5);
    let t0 = start_playing(&mut session);
    stage_single_enemy(&mut session, 0, 0, Direction::Up);
    session
        .game_mut()
        .unwrap()
        .player_shots
        .push(Shot::new(0, 1, Direction::Up));
    session.frame(t0 + session.tuning().shot_interval_ms + 1.0);
    assert!(matches!(session.phase(), Phase::GameOver(_)));

    *store.broken.borrow_mut() = true;
    session.handle_input(key(Key::Enter), t0);

    assert_eq!(*session.phase(), Phase::Menu);
    assert_eq!(store.values.borrow().get(LEADERBOARD_KEY).unwrap(), before);
}
