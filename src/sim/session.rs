/// Session: the complete state of one ladder game.
///
/// ## Phases
///
///   Setup  — choose the participant count (validated before anything
///            is generated)
///   Input  — edit participant names (top) and results (bottom)
///   Game   — ladder generated; each participant may press GO once
///
/// ## Ownership
///
/// The ladder is generated once on entering `Game` and never mutated.
/// Every GO resolves a fresh path against it; the `done` flag on the
/// participant rejects a second GO. `reset()` discards the ladder.
///
/// ## Layout
///
/// The renderer computes a `Geometry` from the terminal size every frame
/// and hands it over via `set_layout()`. Paths in flight are re-resolved
/// when it changes; resolution is pure, so only coordinates move.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::{GameConfig, LadderConfig, SpeedConfig};
use crate::domain::error::LadderError;
use crate::domain::geometry::{resolve_path, Geometry, ResolvedPath};
use crate::domain::ladder::{generate_ladder, validate_column_count, Ladder, RandomSource, MIN_COLUMNS};
use crate::domain::outcome::is_win_result;
use crate::domain::path::end_mapping;

/// Participant count offered on a fresh setup screen.
pub const DEFAULT_COUNT: usize = 4;
/// Longest name or result accepted in the input phase (chars).
pub const MAX_INPUT_CHARS: usize = 12;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Setup,
    Input,
    Game,
}

/// Focused text field in the input phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    Name(usize),
    Result(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub name: String,
    pub done: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceState {
    /// Drawing `segment`, `segment_tick` ticks in.
    Running,
    /// Reached the bottom; result shows after `ticks_left`.
    Arrived { ticks_left: u32 },
    Revealed,
}

/// One participant's animated traversal.
#[derive(Clone, Debug)]
pub struct Trace {
    pub participant: usize,
    pub path: ResolvedPath,
    pub segment: usize,
    pub segment_tick: u32,
    pub state: TraceState,
}

impl Trace {
    fn new(participant: usize, path: ResolvedPath) -> Self {
        Trace { participant, path, segment: 0, segment_tick: 0, state: TraceState::Running }
    }

    /// Fraction of the current segment drawn so far.
    pub fn progress(&self, segment_ticks: u32) -> f32 {
        self.segment_tick as f32 / segment_ticks.max(1) as f32
    }

    pub fn is_running(&self) -> bool {
        self.state == TraceState::Running
    }
}

/// Content of the result modal.
#[derive(Clone, Debug, PartialEq)]
pub struct Reveal {
    pub participant: usize,
    pub name: String,
    pub result: String,
    pub win: bool,
}

pub struct Session {
    pub phase: Phase,

    // ── Setup ──
    pub count_input: String,

    // ── Input ──
    pub name_inputs: Vec<String>,
    pub result_inputs: Vec<String>,
    pub focus: Field,

    // ── Game ──
    pub participants: Vec<Participant>,
    pub results: Vec<String>,
    pub ladder: Option<Ladder>,
    pub geometry: Option<Geometry>,
    pub traces: Vec<Trace>,
    pub cursor: usize,
    /// Result modals waiting to be shown; the front one is visible.
    pub reveals: VecDeque<Reveal>,

    // ── UI ──
    pub bgm_on: bool,
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,

    // ── Config ──
    pub ladder_cfg: LadderConfig,
    pub speed: SpeedConfig,
}

// ── Construction ──

impl Session {
    pub fn new(config: &GameConfig) -> Self {
        let count = DEFAULT_COUNT.clamp(MIN_COLUMNS, config.ladder.max_participants);
        Session {
            phase: Phase::Setup,
            count_input: count.to_string(),
            name_inputs: vec![],
            result_inputs: vec![],
            focus: Field::Name(0),
            participants: vec![],
            results: vec![],
            ladder: None,
            geometry: None,
            traces: vec![],
            cursor: 0,
            reveals: VecDeque::new(),
            bgm_on: config.sound.bgm,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            ladder_cfg: config.ladder.clone(),
            speed: config.speed.clone(),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Back to setup. The ladder and every path are discarded.
    pub fn reset(&mut self) {
        info!("session reset");
        self.phase = Phase::Setup;
        self.name_inputs.clear();
        self.result_inputs.clear();
        self.focus = Field::Name(0);
        self.participants.clear();
        self.results.clear();
        self.ladder = None;
        self.geometry = None;
        self.traces.clear();
        self.cursor = 0;
        self.reveals.clear();
        self.message.clear();
        self.message_timer = 0;
    }

    pub fn toggle_bgm(&mut self) -> bool {
        self.bgm_on = !self.bgm_on;
        self.bgm_on
    }
}

// ── Setup phase ──

impl Session {
    /// Parsed participant count, if the field holds a number.
    pub fn count_value(&self) -> Option<usize> {
        self.count_input.parse().ok()
    }

    /// Append a digit to the count field (max two digits).
    pub fn type_count_digit(&mut self, c: char) -> bool {
        if self.phase != Phase::Setup || !c.is_ascii_digit() || self.count_input.len() >= 2 {
            return false;
        }
        self.count_input.push(c);
        true
    }

    pub fn backspace_count(&mut self) -> bool {
        self.phase == Phase::Setup && self.count_input.pop().is_some()
    }

    /// Nudge the count by `delta`, staying inside the accepted range.
    /// Returns whether the value changed.
    pub fn step_count(&mut self, delta: i32) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }
        let max = self.ladder_cfg.max_participants;
        let current = self.count_value().unwrap_or(MIN_COLUMNS).clamp(MIN_COLUMNS, max);
        let next = (current as i64 + delta as i64).clamp(MIN_COLUMNS as i64, max as i64) as usize;
        let changed = self.count_value() != Some(next);
        self.count_input = next.to_string();
        changed
    }

    /// Validate the count and move to the input phase with default entries.
    pub fn apply_setup(&mut self) -> Result<usize, LadderError> {
        let raw = self.count_value().unwrap_or(0);
        let count = validate_column_count(raw, self.ladder_cfg.max_participants)?;

        self.name_inputs = (0..count).map(|i| format!("P{}", i + 1)).collect();
        self.result_inputs = (0..count)
            .map(|i| if i % 2 == 0 { "Win".to_string() } else { "Lose".to_string() })
            .collect();
        self.focus = Field::Name(0);
        self.phase = Phase::Input;
        info!(count, "setup applied");
        Ok(count)
    }
}

// ── Input phase ──

impl Session {
    pub fn input_count(&self) -> usize {
        self.name_inputs.len()
    }

    /// Move focus: `dx` along the row, `dy` switches between names and results.
    pub fn move_focus(&mut self, dx: i32, dy: i32) {
        let n = self.input_count();
        if self.phase != Phase::Input || n == 0 {
            return;
        }
        let (row, col) = match self.focus {
            Field::Name(i) => (0, i),
            Field::Result(i) => (1, i),
        };
        let col = (col as i64 + dx as i64).rem_euclid(n as i64) as usize;
        let row = if dy != 0 { 1 - row } else { row };
        self.focus = if row == 0 { Field::Name(col) } else { Field::Result(col) };
    }

    /// Tab order: all names, then all results, wrapping.
    pub fn focus_next(&mut self) {
        let n = self.input_count();
        if self.phase != Phase::Input || n == 0 {
            return;
        }
        self.focus = match self.focus {
            Field::Name(i) if i + 1 < n => Field::Name(i + 1),
            Field::Name(_) => Field::Result(0),
            Field::Result(i) if i + 1 < n => Field::Result(i + 1),
            Field::Result(_) => Field::Name(0),
        };
    }

    fn focused_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Name(i) => self.name_inputs.get_mut(i),
            Field::Result(i) => self.result_inputs.get_mut(i),
        }
    }

    pub fn type_char(&mut self, c: char) -> bool {
        if self.phase != Phase::Input || c.is_control() {
            return false;
        }
        match self.focused_mut() {
            Some(text) if text.chars().count() < MAX_INPUT_CHARS => {
                text.push(c);
                true
            }
            _ => false,
        }
    }

    pub fn backspace(&mut self) -> bool {
        if self.phase != Phase::Input {
            return false;
        }
        self.focused_mut().map_or(false, |text| text.pop().is_some())
    }

    /// Freeze names/results, generate the ladder and enter the game.
    /// Empty names become `P{n}`, empty results `R{n}`.
    pub fn start_game<S: RandomSource + ?Sized>(&mut self, rng: &mut S) -> bool {
        if self.phase != Phase::Input || self.input_count() < MIN_COLUMNS {
            return false;
        }

        self.participants = self
            .name_inputs
            .iter()
            .enumerate()
            .map(|(i, name)| Participant { name: fallback(name, 'P', i), done: false })
            .collect();
        self.results = self
            .result_inputs
            .iter()
            .enumerate()
            .map(|(i, r)| fallback(r, 'R', i))
            .collect();

        let columns = self.participants.len();
        let ladder = generate_ladder(
            columns,
            self.ladder_cfg.rows,
            self.ladder_cfg.rung_probability,
            rng,
        );
        info!(columns, rows = ladder.rows(), rungs = ladder.rung_count(), "ladder generated");
        debug!(mapping = ?end_mapping(&ladder), "lane outcomes");

        self.ladder = Some(ladder);
        self.geometry = None;
        self.traces.clear();
        self.reveals.clear();
        self.cursor = 0;
        self.phase = Phase::Game;
        true
    }
}

fn fallback(text: &str, prefix: char, index: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        format!("{}{}", prefix, index + 1)
    } else {
        trimmed.to_string()
    }
}

// ── Game phase ──

impl Session {
    pub fn columns(&self) -> usize {
        self.participants.len()
    }

    pub fn move_cursor(&mut self, delta: i32) {
        let n = self.columns();
        if n == 0 {
            return;
        }
        self.cursor = (self.cursor as i64 + delta as i64).rem_euclid(n as i64) as usize;
    }

    /// Layout in use: the renderer's, or unit cells before the first frame.
    fn layout(&self, ladder: &Ladder) -> Result<Geometry, LadderError> {
        match self.geometry {
            Some(g) => Ok(g),
            None => Geometry::new(1.0, 0.0, ladder.rows().max(1) as f32, ladder.rows()),
        }
    }

    /// Adopt a new layout, re-resolving any path already in flight.
    pub fn set_layout(&mut self, geometry: Geometry) {
        if self.geometry == Some(geometry) {
            return;
        }
        self.geometry = Some(geometry);
        let ladder = match &self.ladder {
            Some(l) => l,
            None => return,
        };
        for trace in &mut self.traces {
            match resolve_path(ladder, trace.participant, &geometry) {
                Ok(path) => trace.path = path,
                Err(e) => warn!(participant = trace.participant, "relayout failed: {e}"),
            }
        }
    }

    /// Send participant `index` down the ladder.
    ///
    /// Rejected (returns false) outside the game, for unknown indices and
    /// for participants who already went.
    pub fn go(&mut self, index: usize) -> bool {
        if self.phase != Phase::Game {
            return false;
        }
        let ladder = match &self.ladder {
            Some(l) => l,
            None => return false,
        };
        match self.participants.get(index) {
            Some(p) if p.done => {
                debug!(index, "participant already went");
                return false;
            }
            Some(_) => {}
            None => return false,
        }

        let path = match self.layout(ladder).and_then(|g| resolve_path(ladder, index, &g)) {
            Ok(p) => p,
            Err(e) => {
                warn!(index, "path resolution failed: {e}");
                return false;
            }
        };
        debug!(index, final_column = path.final_column, segments = path.segments.len(), "go");

        self.participants[index].done = true;
        self.traces.push(Trace::new(index, path));
        true
    }

    /// Visible result modal, if any.
    pub fn modal(&self) -> Option<&Reveal> {
        self.reveals.front()
    }

    pub fn close_modal(&mut self) -> bool {
        self.reveals.pop_front().is_some()
    }

    /// Result text for a participant whose result has been revealed.
    pub fn revealed_result(&self, participant: usize) -> Option<&str> {
        self.traces
            .iter()
            .find(|t| t.participant == participant && t.state == TraceState::Revealed)
            .and_then(|t| self.results.get(t.path.final_column))
            .map(String::as_str)
    }

    /// Build the modal content for a finished trace.
    pub(crate) fn reveal_for(&self, participant: usize, final_column: usize) -> Option<Reveal> {
        let name = self.participants.get(participant)?.name.clone();
        let result = self.results.get(final_column)?.clone();
        let win = is_win_result(&result);
        Some(Reveal { participant, name, result, win })
    }

    pub fn all_done(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.done)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::ladder::tests::Scripted;
    use crate::domain::path::walk;

    pub(crate) fn session() -> Session {
        Session::new(&GameConfig::default())
    }

    /// Session in the game phase with `count` default participants.
    pub(crate) fn game(count: usize, samples: &[f64]) -> Session {
        let mut s = session();
        s.count_input = count.to_string();
        s.apply_setup().unwrap();
        assert!(s.start_game(&mut Scripted::new(samples)));
        s
    }

    // ── Setup ──

    #[test]
    fn starts_in_setup_with_default_count() {
        let s = session();
        assert_eq!(s.phase, Phase::Setup);
        assert_eq!(s.count_value(), Some(DEFAULT_COUNT));
    }

    #[test]
    fn count_out_of_range_is_rejected() {
        let mut s = session();
        s.count_input = "1".into();
        assert_eq!(
            s.apply_setup(),
            Err(LadderError::InvalidColumnCount { count: 1, min: 2, max: 14 })
        );
        s.count_input = "15".into();
        assert!(s.apply_setup().is_err());
        s.count_input.clear();
        assert!(s.apply_setup().is_err());
        assert_eq!(s.phase, Phase::Setup);
    }

    #[test]
    fn step_count_clamps() {
        let mut s = session();
        s.count_input = "14".into();
        assert!(!s.step_count(1));
        assert_eq!(s.count_value(), Some(14));
        s.count_input = "3".into();
        assert!(s.step_count(-1));
        assert!(!s.step_count(-1));
        assert_eq!(s.count_value(), Some(2));
    }

    #[test]
    fn count_field_accepts_two_digits() {
        let mut s = session();
        s.count_input.clear();
        assert!(s.type_count_digit('1'));
        assert!(s.type_count_digit('2'));
        assert!(!s.type_count_digit('3'));
        assert!(!s.type_count_digit('x'));
        assert_eq!(s.count_value(), Some(12));
    }

    #[test]
    fn apply_fills_defaults() {
        let mut s = session();
        s.count_input = "3".into();
        assert_eq!(s.apply_setup(), Ok(3));
        assert_eq!(s.phase, Phase::Input);
        assert_eq!(s.name_inputs, vec!["P1", "P2", "P3"]);
        assert_eq!(s.result_inputs, vec!["Win", "Lose", "Win"]);
    }

    // ── Input ──

    #[test]
    fn editing_focused_field() {
        let mut s = session();
        s.count_input = "2".into();
        s.apply_setup().unwrap();
        s.move_focus(1, 0);
        assert_eq!(s.focus, Field::Name(1));
        assert!(s.backspace());
        assert!(s.backspace());
        assert!(s.type_char('Z'));
        assert_eq!(s.name_inputs[1], "Z");
        s.move_focus(0, 1);
        assert_eq!(s.focus, Field::Result(1));
        assert!(s.type_char('!'));
        assert_eq!(s.result_inputs[1], "Lose!");
    }

    #[test]
    fn input_length_is_capped() {
        let mut s = session();
        s.count_input = "2".into();
        s.apply_setup().unwrap();
        s.name_inputs[0].clear();
        for _ in 0..MAX_INPUT_CHARS {
            assert!(s.type_char('a'));
        }
        assert!(!s.type_char('a'));
    }

    #[test]
    fn tab_order_wraps_through_results() {
        let mut s = session();
        s.count_input = "2".into();
        s.apply_setup().unwrap();
        let order: Vec<Field> = (0..4).map(|_| { s.focus_next(); s.focus }).collect();
        assert_eq!(order, vec![Field::Name(1), Field::Result(0), Field::Result(1), Field::Name(0)]);
    }

    #[test]
    fn empty_entries_fall_back() {
        let mut s = session();
        s.count_input = "3".into();
        s.apply_setup().unwrap();
        s.name_inputs[1] = "  ".into();
        s.result_inputs[2].clear();
        assert!(s.start_game(&mut Scripted::new(&[0.9])));
        assert_eq!(s.participants[1].name, "P2");
        assert_eq!(s.results[2], "R3");
        assert_eq!(s.results[0], "Win");
    }

    #[test]
    fn start_game_generates_configured_ladder() {
        let s = game(5, &[0.1, 0.7]);
        let ladder = s.ladder.as_ref().unwrap();
        assert_eq!(ladder.columns(), 5);
        assert_eq!(ladder.rows(), 15);
        assert!(ladder.first_collision().is_none());
        assert_eq!(s.phase, Phase::Game);
    }

    // ── Game ──

    #[test]
    fn go_marks_done_and_rejects_repeat() {
        let mut s = game(3, &[0.0]);
        assert!(s.go(1));
        assert!(s.participants[1].done);
        assert!(!s.go(1));
        assert_eq!(s.traces.len(), 1);
        assert!(!s.go(3));
    }

    #[test]
    fn concurrent_traces_follow_their_walks() {
        let mut s = game(4, &[0.3, 0.8, 0.5]);
        for i in 0..4 {
            assert!(s.go(i));
        }
        assert!(s.all_done());
        let ladder = s.ladder.as_ref().unwrap();
        for t in &s.traces {
            assert_eq!(t.path.final_column, walk(ladder, t.participant).unwrap().final_column);
        }
    }

    #[test]
    fn go_outside_game_is_rejected() {
        let mut s = session();
        assert!(!s.go(0));
    }

    #[test]
    fn relayout_keeps_final_columns() {
        let mut s = game(4, &[0.2, 0.6]);
        s.go(0);
        let before = s.traces[0].path.clone();
        let g = Geometry::fit(80.0, 20.0, 4, 15, 0.0, 1.0).unwrap();
        s.set_layout(g);
        let after = &s.traces[0].path;
        assert_eq!(after.final_column, before.final_column);
        assert_eq!(after.segments.len(), before.segments.len());
        assert_eq!(after.segments[0].start(), (g.column_x(0), 0.0));
    }

    #[test]
    fn cursor_wraps() {
        let mut s = game(3, &[0.9]);
        s.move_cursor(-1);
        assert_eq!(s.cursor, 2);
        s.move_cursor(1);
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn reset_discards_ladder() {
        let mut s = game(3, &[0.0]);
        s.go(0);
        s.reset();
        assert_eq!(s.phase, Phase::Setup);
        assert!(s.ladder.is_none());
        assert!(s.traces.is_empty());
        assert!(s.participants.is_empty());
        assert_eq!(s.count_value(), Some(3));
    }
}
