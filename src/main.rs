/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use config::GameConfig;
use domain::error::LadderError;
use domain::ladder::RngSource;
use domain::path::StepKind;
use sim::event::GameEvent;
use sim::session::{Phase, Session};
use sim::step;
use ui::gamepad::{GamepadState, PadAction, PadDir};
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Status message lifetime, in ticks.
const MESSAGE_TICKS: u32 = 150;

fn main() -> anyhow::Result<()> {
    logging::init()?;

    let config = GameConfig::load();
    info!(?config, "starting");

    let mut session = Session::new(&config);
    let mut rng = RngSource::<StdRng>::seeded_or_entropy(config.ladder.seed);

    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let sound = SoundEngine::new(config.sound.sfx);
    if let Some(sfx) = &sound {
        sfx.set_bgm(session.bgm_on);
    }

    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &mut rng, &config);
    let cleanup = renderer.cleanup().context("terminal cleanup failed");

    result?;
    cleanup?;

    println!();
    println!("Thanks for playing Ladder Run!");
    Ok(())
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    rng: &mut RngSource<StdRng>,
    config: &GameConfig,
) -> anyhow::Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_input(session, sound, rng, &kb, &gp) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            let events = step::step(session);
            process_sound_events(sound, &events);
            last_tick = Instant::now();
        }

        renderer.render(session).context("render failed")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    info!("quit");
    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match *event {
            GameEvent::SegmentStarted { participant, kind } => {
                trace!(participant, ?kind, "segment");
                if let Some(sfx) = sound {
                    sfx.play_step(kind == StepKind::Horizontal);
                }
            }
            GameEvent::TraceFinished { participant, final_column } => {
                debug!(participant, final_column, "trace reached the bottom");
            }
            GameEvent::ResultRevealed { participant, win } => {
                info!(participant, win, "result revealed");
                if let Some(sfx) = sound {
                    if win { sfx.play_win(); } else { sfx.play_lose(); }
                }
            }
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_MUSIC: &[KeyCode] = &[KeyCode::Char('m'), KeyCode::Char('M')];
const KEYS_RESET: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_GO: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

/// One frame of navigation intent, keyboard and gamepad merged.
struct Nav {
    confirm: bool,
    cancel: bool,
    reset: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl Nav {
    /// `typing`: letter keys are text, so only non-printing keys and the
    /// gamepad count as commands.
    fn read(kb: &InputState, gp: &GamepadState, typing: bool) -> Self {
        Nav {
            confirm: kb.any_pressed(&[KeyCode::Enter]) || gp.action(PadAction::Confirm),
            cancel: kb.any_pressed(&[KeyCode::Esc]) || gp.action(PadAction::Cancel),
            reset: (!typing && kb.any_pressed(KEYS_RESET)) || gp.action(PadAction::Reset),
            left: kb.any_pressed(KEYS_LEFT) || gp.dir(PadDir::Left),
            right: kb.any_pressed(KEYS_RIGHT) || gp.dir(PadDir::Right),
            up: kb.any_pressed(KEYS_UP) || gp.dir(PadDir::Up),
            down: kb.any_pressed(KEYS_DOWN) || gp.dir(PadDir::Down),
        }
    }
}

/// Returns true when the player asked to quit.
fn handle_input(
    session: &mut Session,
    sound: Option<&SoundEngine>,
    rng: &mut RngSource<StdRng>,
    kb: &InputState,
    gp: &GamepadState,
) -> bool {
    let typing = session.phase == Phase::Input;

    if !typing && kb.any_pressed(KEYS_QUIT) {
        return true;
    }
    if gp.action(PadAction::Music) || (!typing && kb.any_pressed(KEYS_MUSIC)) {
        toggle_music(session, sound);
    }

    let nav = Nav::read(kb, gp, typing);
    match session.phase {
        Phase::Setup => handle_setup(session, sound, kb, &nav),
        Phase::Input => handle_entries(session, sound, rng, kb, &nav),
        Phase::Game => handle_game(session, sound, kb, &nav),
    }
    false
}

fn toggle_music(session: &mut Session, sound: Option<&SoundEngine>) {
    let on = session.toggle_bgm();
    if let Some(sfx) = sound {
        sfx.set_bgm(on);
    }
    info!(on, "background music toggled");
    session.set_message(if on { "Music on" } else { "Music off" }, MESSAGE_TICKS / 3);
}

fn reset(session: &mut Session, sound: Option<&SoundEngine>) {
    session.reset();
    if let Some(sfx) = sound {
        sfx.play_reset();
    }
}

/// Status text for a rejected participant count.
fn count_error_message(e: &LadderError) -> String {
    match e {
        LadderError::InvalidColumnCount { min, max, .. } => {
            format!("Please enter a number between {min} and {max}.")
        }
        other => other.to_string(),
    }
}

// ── Per-phase handlers ──

fn handle_setup(session: &mut Session, sound: Option<&SoundEngine>, kb: &InputState, nav: &Nav) {
    let mut changed = false;
    for c in kb.typed_chars() {
        changed |= session.type_count_digit(c);
    }
    if kb.any_pressed(&[KeyCode::Backspace]) {
        changed |= session.backspace_count();
    }
    if nav.right || nav.up {
        changed |= session.step_count(1);
    }
    if nav.left || nav.down {
        changed |= session.step_count(-1);
    }
    if changed {
        if let Some(sfx) = sound { sfx.play_count_change(); }
    }

    if nav.confirm {
        match session.apply_setup() {
            Ok(_) => {
                if let Some(sfx) = sound { sfx.play_apply(); }
            }
            Err(e) => {
                warn!("setup rejected: {e}");
                session.set_message(&count_error_message(&e), MESSAGE_TICKS);
            }
        }
    }
}

fn handle_entries(
    session: &mut Session,
    sound: Option<&SoundEngine>,
    rng: &mut RngSource<StdRng>,
    kb: &InputState,
    nav: &Nav,
) {
    if nav.cancel || nav.reset {
        reset(session, sound);
        return;
    }

    for c in kb.typed_chars() {
        session.type_char(c);
    }
    if kb.any_pressed(&[KeyCode::Backspace]) {
        session.backspace();
    }
    if kb.any_pressed(&[KeyCode::Tab]) {
        session.focus_next();
    }
    if nav.left { session.move_focus(-1, 0); }
    if nav.right { session.move_focus(1, 0); }
    if nav.up || nav.down { session.move_focus(0, 1); }

    if nav.confirm && session.start_game(rng) {
        if let Some(sfx) = sound { sfx.play_start(); }
    }
}

fn handle_game(session: &mut Session, sound: Option<&SoundEngine>, kb: &InputState, nav: &Nav) {
    if nav.reset {
        reset(session, sound);
        return;
    }

    // An open result modal takes every confirm/cancel until closed
    if session.modal().is_some() {
        if nav.confirm || nav.cancel || kb.any_pressed(KEYS_GO) {
            session.close_modal();
        }
        return;
    }

    if nav.left { session.move_cursor(-1); }
    if nav.right { session.move_cursor(1); }

    if nav.confirm || kb.any_pressed(KEYS_GO) {
        let index = session.cursor;
        if session.go(index) {
            if let Some(sfx) = sound { sfx.play_go(); }
            if session.all_done() {
                session.set_message("Everyone has gone. Press R for a new ladder.", MESSAGE_TICKS * 2);
            }
        } else if let Some(p) = session.participants.get(index) {
            let msg = format!("{} has already gone.", p.name);
            session.set_message(&msg, MESSAGE_TICKS / 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_error_reads_like_a_prompt() {
        let e = LadderError::InvalidColumnCount { count: 20, min: 2, max: 14 };
        assert_eq!(count_error_message(&e), "Please enter a number between 2 and 14.");
    }
}
