mod display;

use std::fs::OpenOptions;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    terminal, ExecutableCommand,
};
use tracing_subscriber::EnvFilter;

use grid_shooter::audio::{self, AudioEngine, SAMPLE_RATE};
use grid_shooter::config::{DeviceMode, Difficulty};
use grid_shooter::input::{Key, RawInput};
use grid_shooter::leaderboard::FileStore;
use grid_shooter::session::{Phase, Session};

const FRAME: Duration = Duration::from_millis(16); // ≈60 FPS

/// Pixel size assumed for one terminal cell when mouse drags stand in for
/// touch swipes.
const TOUCH_PX_PER_COL: f64 = 8.0;
const TOUCH_PX_PER_ROW: f64 = 16.0;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(d: DifficultyArg) -> Self {
        match d {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Desktop,
    Mobile,
}

impl From<ModeArg> for DeviceMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Desktop => DeviceMode::Desktop,
            ModeArg::Mobile => DeviceMode::Mobile,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "grid_shooter")]
#[command(about = "Grid arcade shooter for the terminal")]
struct Args {
    /// Preselected difficulty in the menu
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// Preselected input mode (mobile = mouse-drag swipes with auto fire)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Where the leaderboard and log live
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Disable sound
    #[arg(long)]
    mute: bool,

    /// RNG seed for a reproducible game
    #[arg(long)]
    seed: Option<u64>,

    /// Log file (defaults to <data-dir>/grid_shooter.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Render every sound cue as WAV into this directory and exit
    #[arg(long, value_name = "DIR")]
    export_sounds: Option<PathBuf>,
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// The terminal is in raw mode while playing, so logs go to a file.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ── Input translation ─────────────────────────────────────────────────────────

fn translate_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    })
}

fn translate_mouse(ev: &MouseEvent) -> Option<RawInput> {
    let (x, y) = (
        ev.column as f64 * TOUCH_PX_PER_COL,
        ev.row as f64 * TOUCH_PX_PER_ROW,
    );
    match ev.kind {
        MouseEventKind::Down(MouseButton::Left) if display::pause_button_hit(ev.column, ev.row) => {
            Some(RawInput::PauseButton)
        }
        MouseEventKind::Down(MouseButton::Left) => Some(RawInput::TouchStart { x, y }),
        MouseEventKind::Up(MouseButton::Left) => Some(RawInput::TouchEnd { x, y }),
        _ => None,
    }
}

// ── Main loop ─────────────────────────────────────────────────────────────────

/// Run until the player quits from the menu or presses Ctrl-C.
fn run<W: Write>(
    out: &mut W,
    session: &mut Session,
    rx: &mpsc::Receiver<Event>,
) -> std::io::Result<()> {
    let clock = Instant::now();

    loop {
        let frame_start = Instant::now();
        let now_ms = clock.elapsed().as_secs_f64() * 1000.0;

        // ── Drain all pending input events (non-blocking) ─────────────────────
        while let Ok(ev) = rx.try_recv() {
            let raw = match ev {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    modifiers,
                    ..
                }) => {
                    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }
                    if *session.phase() == Phase::Menu
                        && matches!(code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
                    {
                        return Ok(());
                    }
                    translate_key(code).map(RawInput::Key)
                }
                Event::Mouse(mouse) => translate_mouse(&mouse),
                _ => None,
            };
            if let Some(raw) = raw {
                session.handle_input(raw, now_ms);
            }
        }

        session.frame(now_ms);
        display::render(out, session, now_ms)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    if let Some(dir) = &args.export_sounds {
        let written = audio::export_cues(dir, SAMPLE_RATE, seed)
            .with_context(|| format!("exporting sounds to {}", dir.display()))?;
        for path in written {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let data_dir = args.data_dir.clone().unwrap_or_else(FileStore::default_dir);
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| data_dir.join("grid_shooter.log"));
    init_logging(&log_path)?;
    tracing::info!(data_dir = %data_dir.display(), seed, "Starting");

    let mut audio = AudioEngine::new(audio::system_output(), seed);
    audio.set_muted(args.mute);
    let mut session = Session::new(Box::new(FileStore::new(data_dir)), audio, seed);
    if let Some(d) = args.difficulty {
        session.select_difficulty(d.into());
    }
    if let Some(m) = args.mode {
        session.select_mode(m.into());
    }

    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;
    out.execute(EnableMouseCapture)?;

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the game loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    break; // receiver dropped → program exiting
                }
            }
            Err(_) => break,
        }
    });

    let result = run(&mut out, &mut session, &rx);

    // Always restore the terminal
    let _ = out.execute(DisableMouseCapture);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    tracing::info!("Exiting");
    result.context("terminal I/O failed")
}
