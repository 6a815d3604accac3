//! Rendering layer. All terminal I/O lives here.
//!
//! Each function receives a mutable writer and an immutable view of the
//! session. No game logic is performed; this module only translates state
//! into terminal commands.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use grid_shooter::config::{DeviceMode, Difficulty};
use grid_shooter::effects::{Effects, Rgb, EFFECT_CELL_PX};
use grid_shooter::entities::{GameState, Shot};
use grid_shooter::grid::{self, Direction, COLS, ROWS};
use grid_shooter::session::{GameSummary, Phase, Session};

// ── Layout ────────────────────────────────────────────────────────────────────

/// Top-left corner of the board frame.
pub const BOARD_X: u16 = 1;
pub const BOARD_Y: u16 = 2;
/// Terminal columns per grid cell (cells are roughly square this way).
const CELL_W: u16 = 2;
const PANEL_X: u16 = BOARD_X + COLS as u16 * CELL_W + 4;
/// Row of the clickable pause button in the side panel.
const PAUSE_BUTTON_Y: u16 = BOARD_Y + 9;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::Grey;
const C_GRID: Color = Color::Rgb {
    r: 31,
    g: 51,
    b: 78,
};
const C_TITLE: Color = Color::Cyan;
const C_PLAYER: Color = Color::Rgb {
    r: 122,
    g: 225,
    b: 255,
};
const C_ENEMY: Color = Color::Rgb {
    r: 255,
    g: 90,
    b: 90,
};
const C_SHOT_PLAYER: Color = Color::Rgb {
    r: 156,
    g: 255,
    b: 87,
};
const C_SHOT_ENEMY: Color = Color::Rgb {
    r: 255,
    g: 68,
    b: 68,
};
const C_PANEL: Color = Color::White;
const C_HINT: Color = Color::DarkGrey;

/// Whether a click at terminal cell `(col, row)` lands on the pause button.
pub fn pause_button_hit(col: u16, row: u16) -> bool {
    row == PAUSE_BUTTON_Y && (PANEL_X..PANEL_X + 10).contains(&col)
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render<W: Write>(out: &mut W, session: &Session, now_ms: f64) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    draw_title(out, session)?;
    draw_border(out)?;

    if let Some(game) = session.game() {
        draw_board(out, game)?;
        draw_effects(out, session.effects())?;
        draw_panel(out, session, game, now_ms)?;
    }

    match session.phase() {
        Phase::Menu => draw_menu(out, session)?,
        Phase::Instructions => draw_box(out, &wrap(session.instructions(), 26), C_PANEL)?,
        Phase::Countdown { remaining, .. } => {
            draw_box(out, &[format!("Starting in {remaining}")], Color::Yellow)?
        }
        Phase::Playing => {}
        Phase::Paused => draw_box(
            out,
            &["PAUSED".to_string(), "P / Esc to resume".to_string()],
            Color::Yellow,
        )?,
        Phase::GameOver(summary) => draw_game_over(out, session, summary)?,
    }

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, BOARD_Y + ROWS as u16 + 3))?;
    out.flush()?;
    Ok(())
}

fn screen_pos(x: i32, y: i32) -> (u16, u16) {
    (
        BOARD_X + 1 + x as u16 * CELL_W,
        BOARD_Y + 1 + y as u16,
    )
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb {
        r: c.0,
        g: c.1,
        b: c.2,
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

fn draw_title<W: Write>(out: &mut W, session: &Session) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(BOARD_X, 0))?;
    out.queue(style::SetForegroundColor(C_TITLE))?;
    out.queue(Print("★ GRID SHOOTER ★"))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(format!(
        "  [{} · {}]",
        session.difficulty().label(),
        session.mode().label()
    )))?;
    Ok(())
}

fn draw_border<W: Write>(out: &mut W) -> std::io::Result<()> {
    let inner = (COLS as u16 * CELL_W) as usize;
    out.queue(style::SetForegroundColor(C_BORDER))?;
    out.queue(cursor::MoveTo(BOARD_X, BOARD_Y))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(inner))))?;
    for row in 1..=ROWS as u16 {
        out.queue(cursor::MoveTo(BOARD_X, BOARD_Y + row))?;
        out.queue(Print("│"))?;
        out.queue(style::SetForegroundColor(C_GRID))?;
        out.queue(Print("· ".repeat(COLS as usize)))?;
        out.queue(style::SetForegroundColor(C_BORDER))?;
        out.queue(Print("│"))?;
    }
    out.queue(cursor::MoveTo(BOARD_X, BOARD_Y + ROWS as u16 + 1))?;
    out.queue(Print(format!("└{}┘", "─".repeat(inner))))?;
    Ok(())
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn player_glyph(dir: Direction) -> &'static str {
    match dir {
        Direction::Up => "▲",
        Direction::Right => "▶",
        Direction::Down => "▼",
        Direction::Left => "◀",
    }
}

fn enemy_glyph(dir: Direction) -> &'static str {
    match dir {
        Direction::Up => "△",
        Direction::Right => "▷",
        Direction::Down => "▽",
        Direction::Left => "◁",
    }
}

fn draw_shot<W: Write>(out: &mut W, shot: &Shot, color: Color) -> std::io::Result<()> {
    let (col, row) = screen_pos(shot.x, shot.y);
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print("•"))?;
    Ok(())
}

fn draw_board<W: Write>(out: &mut W, game: &GameState) -> std::io::Result<()> {
    for shot in &game.player_shots {
        draw_shot(out, shot, C_SHOT_PLAYER)?;
    }
    for shot in &game.enemy_shots {
        draw_shot(out, shot, C_SHOT_ENEMY)?;
    }

    out.queue(style::SetForegroundColor(C_ENEMY))?;
    for enemy in game.alive_enemies() {
        let (col, row) = screen_pos(enemy.x, enemy.y);
        out.queue(cursor::MoveTo(col, row))?;
        out.queue(Print(enemy_glyph(enemy.dir)))?;
    }

    let p = &game.player;
    let (col, row) = screen_pos(p.x, p.y);
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(C_PLAYER))?;
    out.queue(Print(player_glyph(p.facing)))?;
    Ok(())
}

/// Particles collapse onto the cell they are over; rings are sampled at
/// eight compass points.
fn draw_effects<W: Write>(out: &mut W, effects: &Effects) -> std::io::Result<()> {
    for p in &effects.particles {
        if let Some((gx, gy)) = grid::cell_at(p.x, p.y, EFFECT_CELL_PX) {
            let (col, row) = screen_pos(gx, gy);
            out.queue(cursor::MoveTo(col + 1, row))?;
            out.queue(style::SetForegroundColor(rgb(p.color)))?;
            out.queue(Print(if p.size > 2.0 { "*" } else { "·" }))?;
        }
    }
    for r in &effects.rings {
        let glyph = if r.alpha > 0.4 { "o" } else { "∘" };
        for k in 0..8 {
            let ang = k as f32 * std::f32::consts::FRAC_PI_4;
            let (px, py) = (r.x + ang.cos() * r.r, r.y + ang.sin() * r.r);
            if let Some((gx, gy)) = grid::cell_at(px, py, EFFECT_CELL_PX) {
                let (col, row) = screen_pos(gx, gy);
                out.queue(cursor::MoveTo(col + 1, row))?;
                out.queue(style::SetForegroundColor(rgb(r.color)))?;
                out.queue(Print(glyph))?;
            }
        }
    }
    Ok(())
}

// ── Side panel ────────────────────────────────────────────────────────────────

fn draw_panel<W: Write>(
    out: &mut W,
    session: &Session,
    game: &GameState,
    now_ms: f64,
) -> std::io::Result<()> {
    let rows = [
        format!("Lives: {}", game.lives),
        format!("Shots: {}", game.total_shots),
        format!("Time:  {}", session.elapsed_seconds(now_ms)),
        format!("Kills: {}", game.kills),
    ];
    out.queue(style::SetForegroundColor(C_PANEL))?;
    for (i, line) in rows.iter().enumerate() {
        out.queue(cursor::MoveTo(PANEL_X, BOARD_Y + 1 + i as u16 * 2))?;
        out.queue(Print(line))?;
    }

    out.queue(cursor::MoveTo(PANEL_X, PAUSE_BUTTON_Y))?;
    out.queue(style::SetForegroundColor(Color::Yellow))?;
    out.queue(Print(if session.is_paused() {
        "[ ▶ Resume ]"
    } else {
        "[ ❚❚ Pause ]"
    }))?;

    let hint = match session.mode() {
        DeviceMode::Desktop => "WASD/↑↓←→ move  SPACE fire",
        DeviceMode::Mobile => "drag to swipe  auto fire",
    };
    out.queue(cursor::MoveTo(PANEL_X, PAUSE_BUTTON_Y + 2))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(hint))?;
    Ok(())
}

// ── Overlays ──────────────────────────────────────────────────────────────────

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// A framed block of centred lines over the middle of the board.
fn draw_box<W: Write>(out: &mut W, lines: &[String], color: Color) -> std::io::Result<()> {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
    let cx = BOARD_X + 1 + COLS as u16 * CELL_W / 2;
    let top = BOARD_Y + (ROWS as u16 / 2).saturating_sub(lines.len() as u16 / 2 + 1);
    let left = cx.saturating_sub(width as u16 / 2 + 1);

    out.queue(style::SetForegroundColor(color))?;
    out.queue(cursor::MoveTo(left, top))?;
    out.queue(Print(format!("╔{}╗", "═".repeat(width))))?;
    for (i, line) in lines.iter().enumerate() {
        out.queue(cursor::MoveTo(left, top + 1 + i as u16))?;
        out.queue(Print(format!("║{:^width$}║", line, width = width)))?;
    }
    out.queue(cursor::MoveTo(left, top + 1 + lines.len() as u16))?;
    out.queue(Print(format!("╚{}╝", "═".repeat(width))))?;
    Ok(())
}

fn draw_menu<W: Write>(out: &mut W, session: &Session) -> std::io::Result<()> {
    let mark = |d: Difficulty| if session.difficulty() == d { "●" } else { "○" };
    let mut lines = vec![
        "SELECT DIFFICULTY".to_string(),
        format!("{} [1] Easy", mark(Difficulty::Easy)),
        format!("{} [2] Normal", mark(Difficulty::Normal)),
        format!("{} [3] Hard", mark(Difficulty::Hard)),
        String::new(),
        format!("[M] Mode: {}", session.mode().label()),
        String::new(),
        "ENTER start   Q quit".to_string(),
    ];
    let top = session.leaderboard_top();
    if !top.is_empty() {
        lines.push(String::new());
        lines.push("LEADERBOARD".to_string());
        lines.extend(top.iter().map(|e| format!("{:<10} {:>6}", e.name, e.score)));
    }
    draw_box(out, &lines, C_TITLE)
}

fn draw_game_over<W: Write>(
    out: &mut W,
    session: &Session,
    summary: &GameSummary,
) -> std::io::Result<()> {
    let mut lines = vec![
        if summary.victory {
            "VICTORY!".to_string()
        } else {
            "GAME OVER".to_string()
        },
        format!("Kills: {}  Time: {}s", summary.kills, summary.elapsed_s),
        format!("Lives: {}  Score: {}", summary.lives, summary.score),
        String::new(),
        format!("Name: {}_", session.name_input()),
        "ENTER to save".to_string(),
    ];
    let top = session.leaderboard_top();
    if !top.is_empty() {
        lines.push(String::new());
        lines.push("LEADERBOARD".to_string());
        lines.extend(top.iter().map(|e| format!("{:<10} {:>6}", e.name, e.score)));
    }
    let color = if summary.victory {
        Color::Green
    } else {
        Color::Red
    };
    draw_box(out, &lines, color)
}
