/// Terminal front end for the ladder game.
///
/// Each frame is composed into `front`, compared cell by cell against
/// `back` (what the terminal already shows), and only the differences are
/// queued and flushed in one write. The buffers then swap.
///
/// The ladder is laid out through `Geometry` in terminal cells: one lane
/// per participant, the board filling whatever rows the terminal has.
/// Rails and traces are collected as box-drawing stroke masks first and
/// turned into glyphs afterwards, so crossings and corners join up.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::geometry::Geometry;
use crate::domain::ladder::{Ladder, MIN_COLUMNS};
use crate::domain::outcome::is_win_result;
use crate::domain::path::Level;
use crate::sim::session::{Field, Phase, Session, Trace, TraceState, MAX_INPUT_CHARS};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    bold: bool,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
        bold: false,
        wide: false,
        cont: false,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
        bold: false,
        wide: false,
        cont: false,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color, bold: bool) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg), bold, wide: false, cont: false }
    }

    fn wide(ch: char, fg: Color, bg: Color, bold: bool) -> Self {
        Cell { wide: true, ..Cell::new(ch, fg, bg, bold) }
    }

    fn continuation(bg: Color) -> Self {
        Cell { ch: ' ', cont: true, ..Cell::new(' ', Color::White, bg, false) }
    }
}

// ── Text width ──

/// Terminal columns taken by `c`: 2 for Hangul, CJK, fullwidth forms and
/// pictographs, 0 for combining marks and controls, 1 otherwise.
fn char_width(c: char) -> usize {
    let cp = c as u32;
    if c.is_control() {
        return 0;
    }
    if matches!(cp, 0x0300..=0x036F | 0x200B..=0x200F | 0xFE00..=0xFE0F) {
        return 0;
    }
    let wide = matches!(
        cp,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xA960..=0xA97F
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x1F900..=0x1F9FF
            | 0x20000..=0x3FFFD
    );
    if wide { 2 } else { 1 }
}

fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Longest prefix of `s` that fits in `max` columns.
fn truncate_to_width(s: &str, max: usize) -> String {
    let mut used = 0;
    s.chars()
        .take_while(|&c| {
            used += char_width(c);
            used <= max
        })
        .collect()
}

/// Longest suffix of `s` that fits in `max` columns.
fn tail_to_width(s: &str, max: usize) -> String {
    let mut used = 0;
    let mut tail: Vec<char> = s
        .chars()
        .rev()
        .take_while(|&c| {
            used += char_width(c);
            used <= max
        })
        .collect();
    tail.reverse();
    tail.into_iter().collect()
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    /// Place a cell. Overwriting either half of a wide char blanks the
    /// other half so no orphaned glyph survives.
    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        let old = self.cells[idx];
        if old.cont && x > 0 && !cell.cont {
            let left = &mut self.cells[idx - 1];
            if left.wide {
                *left = Cell::new(' ', Color::White, left.bg, false);
            }
        }
        if old.wide && x + 1 < self.width {
            let right = &mut self.cells[idx + 1];
            if right.cont {
                *right = Cell::new(' ', Color::White, right.bg, false);
            }
        }
        self.cells[idx] = cell;
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Wide chars take two columns; a char that
    /// would straddle the right edge is dropped. Returns the column after
    /// the last char written.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color, bold: bool) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            let w = char_width(ch);
            if w == 0 { continue; }
            if cx + w > self.width { break; }
            if w == 2 {
                self.set(cx, y, Cell::wide(ch, fg, bg, bold));
                self.set(cx + 1, y, Cell::continuation(bg));
            } else {
                self.set(cx, y, Cell::new(ch, fg, bg, bold));
            }
            cx += w;
        }
        cx
    }

    /// Write `s` centred on column `center`, truncated to `max` columns.
    #[allow(clippy::too_many_arguments)]
    fn put_centered(&mut self, center: usize, y: usize, s: &str, max: usize, fg: Color, bg: Color, bold: bool) {
        let text = truncate_to_width(s, max);
        let x = center.saturating_sub(display_width(&text) / 2);
        self.put_str(x, y, &text, fg, bg, bold);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg, false));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::new(' ', Color::White, bg, false));
            }
        }
    }
}

// ── Strokes: box-drawing connection masks ──

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

const LIGHT_BOX: [char; 16] = [
    ' ', '│', '│', '│', '─', '┘', '┐', '┤', '─', '└', '┌', '├', '─', '┴', '┬', '┼',
];
const HEAVY_BOX: [char; 16] = [
    ' ', '┃', '┃', '┃', '━', '┛', '┓', '┫', '━', '┗', '┏', '┣', '━', '┻', '┳', '╋',
];

fn box_char(mask: u8, heavy: bool) -> char {
    let table = if heavy { &HEAVY_BOX } else { &LIGHT_BOX };
    table[(mask & 0x0F) as usize]
}

/// Per-cell connection masks for one layer of lines.
struct Strokes {
    width: usize,
    height: usize,
    masks: Vec<u8>,
}

impl Strokes {
    fn new(width: usize, height: usize) -> Self {
        Strokes { width, height, masks: vec![0; width * height] }
    }

    fn add(&mut self, x: usize, y: usize, bits: u8) {
        if x < self.width && y < self.height {
            self.masks[y * self.width + x] |= bits;
        }
    }

    fn get(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.masks[y * self.width + x]
        } else {
            0
        }
    }

    /// Axis-aligned line between two cells (either direction).
    fn line(&mut self, a: (usize, usize), b: (usize, usize)) {
        if a.0 == b.0 {
            let (lo, hi) = (a.1.min(b.1), a.1.max(b.1));
            for y in lo..hi {
                self.add(a.0, y, DOWN);
                self.add(a.0, y + 1, UP);
            }
        } else if a.1 == b.1 {
            let (lo, hi) = (a.0.min(b.0), a.0.max(b.0));
            for x in lo..hi {
                self.add(x, a.1, RIGHT);
                self.add(x + 1, a.1, LEFT);
            }
        }
    }
}

// ── Board layout ──

/// Vertical offsets
const HUD_ROW: usize = 0;
const NAMES_ROW: usize = 2;
const BOARD_ROW: usize = 3;
/// Rows under the board: results, arrivals, message, help.
const BELOW_BOARD: usize = 4;

const MIN_LANE_W: usize = 3;
const MAX_LANE_W: usize = 12;
const MIN_BOARD_H: usize = 3;

/// Board height that gives every rung row its own terminal line, plus the
/// bottom padding row.
fn min_board_h(rows: usize) -> usize {
    (rows.max(1) + 1).max(MIN_BOARD_H)
}

/// The ladder placed on the terminal: a `Geometry` in cell units plus
/// the offset that centres it.
#[derive(Clone, Copy, Debug, PartialEq)]
struct BoardLayout {
    geometry: Geometry,
    origin_x: usize,
    board_h: usize,
}

impl BoardLayout {
    fn fit(term_w: usize, term_h: usize, columns: usize, rows: usize) -> Option<Self> {
        if columns == 0 {
            return None;
        }
        let lane_w = (term_w / columns).min(MAX_LANE_W);
        if lane_w < MIN_LANE_W {
            return None;
        }
        let board_h = term_h.checked_sub(BOARD_ROW + BELOW_BOARD)?;
        if board_h < min_board_h(rows) {
            return None;
        }
        let width = lane_w * columns;
        // One row of bottom padding keeps the lowest rung off the rail ends
        let geometry = Geometry::fit(width as f32, board_h as f32, columns, rows, 0.0, 1.0).ok()?;
        Some(BoardLayout { geometry, origin_x: (term_w - width) / 2, board_h })
    }

    /// Terminal cell holding a geometry point.
    fn cell(&self, (x, y): (f32, f32)) -> (usize, usize) {
        (self.origin_x + x.max(0.0) as usize, BOARD_ROW + y.max(0.0) as usize)
    }

    fn lane_x(&self, column: usize) -> usize {
        self.cell((self.geometry.column_x(column), 0.0)).0
    }

    /// Room for a name or result under one lane.
    fn label_w(&self) -> usize {
        (self.geometry.column_width() as usize).saturating_sub(1)
    }

    fn results_row(&self) -> usize {
        BOARD_ROW + self.board_h
    }
}

fn draw_ladder(strokes: &mut Strokes, ladder: &Ladder, layout: &BoardLayout) {
    let g = &layout.geometry;
    for c in 0..ladder.columns() {
        let x = g.column_x(c);
        strokes.line(
            layout.cell((x, g.level_y(Level::Top))),
            layout.cell((x, g.level_y(Level::Bottom))),
        );
    }
    for row in 0..ladder.rows() {
        let y = g.level_y(Level::Rung(row));
        for gap in 0..ladder.gaps() {
            if ladder.has_rung(row, gap) {
                strokes.line(
                    layout.cell((g.column_x(gap), y)),
                    layout.cell((g.column_x(gap + 1), y)),
                );
            }
        }
    }
}

/// Lay down the drawn part of a trace. Returns the head cell while the
/// trace is still running.
fn draw_trace(strokes: &mut Strokes, trace: &Trace, layout: &BoardLayout, segment_ticks: u32) -> Option<(usize, usize)> {
    let segments = &trace.path.segments;
    let finished = if trace.is_running() { trace.segment.min(segments.len()) } else { segments.len() };
    for seg in &segments[..finished] {
        strokes.line(layout.cell(seg.start()), layout.cell(seg.end()));
    }
    if !trace.is_running() {
        return None;
    }
    let seg = segments.get(trace.segment)?;
    let head = layout.cell(seg.point_at(trace.progress(segment_ticks)));
    strokes.line(layout.cell(seg.start()), head);
    Some(head)
}

// ── Palette ──

const TRACE_COLORS: [Color; 5] = [
    Color::Rgb { r: 0xff, g: 0x6b, b: 0x6b },
    Color::Rgb { r: 0x4e, g: 0xcd, b: 0xc4 },
    Color::Rgb { r: 0xff, g: 0xe6, b: 0x6d },
    Color::Rgb { r: 0xff, g: 0x9f, b: 0xf3 },
    Color::Rgb { r: 0x54, g: 0xa0, b: 0xff },
];

/// Trace colour for a participant (by starting lane).
fn trace_color(participant: usize) -> Color {
    TRACE_COLORS[participant % TRACE_COLORS.len()]
}

const HUD_BG: Color = Color::Rgb { r: 40, g: 40, b: 70 };
const TITLE_FG: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const RAIL_FG: Color = Color::Rgb { r: 150, g: 150, b: 170 };
const HI_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const DIM_FG: Color = Color::DarkGrey;
const KEY_FG: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const WIN_FG: Color = Color::Rgb { r: 255, g: 215, b: 0 };
const LOSE_FG: Color = Color::Rgb { r: 170, g: 170, b: 190 };
const SELECT_BG: Color = Color::Rgb { r: 60, g: 60, b: 110 };
const FIELD_BG: Color = Color::Rgb { r: 35, g: 35, b: 55 };
const FOCUS_BG: Color = Color::Rgb { r: 70, g: 70, b: 130 };
const MODAL_BG: Color = Color::Rgb { r: 30, g: 30, b: 50 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            SetAttribute(Attribute::Reset),
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Draw one frame. In the game phase this also hands the current
    /// board layout to the session.
    pub fn render(&mut self, session: &mut Session) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect phase change → clear for clean transition
        if self.last_phase != Some(session.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(session.phase);
        }

        let layout = match (session.phase, &session.ladder) {
            (Phase::Game, Some(ladder)) => {
                BoardLayout::fit(self.term_w, self.term_h, ladder.columns(), ladder.rows())
            }
            _ => None,
        };
        if let Some(l) = &layout {
            session.set_layout(l.geometry);
        }

        // Build front buffer
        self.front.clear();
        self.compose_hud(session);

        match session.phase {
            Phase::Setup => self.compose_setup(session),
            Phase::Input => self.compose_input(session),
            Phase::Game => match &layout {
                Some(l) => self.compose_game(session, l),
                None => self.compose_too_small(session),
            },
        }

        self.compose_modal(session);
        self.compose_message(session);
        self.compose_help(session);

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut last_bold = false;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at start of frame. ResetColor would fall
        // back to the terminal default and leave line artifacts.
        queue!(
            self.writer,
            SetAttribute(Attribute::NormalIntensity),
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                // Skip continuation cells (right half of wide chars)
                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                // For wide cells, also check if the continuation changed
                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                if cell.bold != last_bold {
                    let attr = if cell.bold { Attribute::Bold } else { Attribute::NormalIntensity };
                    queue!(self.writer, SetAttribute(attr))?;
                    last_bold = cell.bold;
                }

                queue!(self.writer, Print(cell.ch))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, s: &Session) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let end = self.front.put_str(0, HUD_ROW, " ╫ LADDER RUN ", TITLE_FG, HUD_BG, true);

        let status = match s.phase {
            Phase::Setup => " Setup".to_string(),
            Phase::Input => format!(" Names & results  ({} players)", s.input_count()),
            Phase::Game => {
                let done = s.participants.iter().filter(|p| p.done).count();
                let rungs = s.ladder.as_ref().map_or(0, Ladder::rung_count);
                let mut line = format!(" Game  {}/{} gone  {} rungs", done, s.columns(), rungs);
                if let (Some(p), Some(result)) = (s.participants.get(s.cursor), s.revealed_result(s.cursor)) {
                    line.push_str(&format!("   {} → {}", p.name, result));
                }
                line
            }
        };
        self.front.put_str(end, HUD_ROW, &status, Color::White, HUD_BG, false);

        let bgm = if s.bgm_on { "♪ BGM on " } else { "♪ BGM off " };
        let x = self.front.width.saturating_sub(display_width(bgm));
        let fg = if s.bgm_on { HI_FG } else { DIM_FG };
        self.front.put_str(x, HUD_ROW, bgm, fg, HUD_BG, false);
    }

    fn compose_setup(&mut self, s: &Session) {
        let title = [
            r" _           _    _           ___              ",
            r"| |   __ _ __| |__| |___ _ _  | _ \_  _ _ _     ",
            r"| |__/ _` / _` / _` / -_) '_| |   / || | ' \    ",
            r"|____\__,_\__,_\__,_\___|_|   |_|_\\_,_|_||_|   ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(4, 2 + i, line, TITLE_FG, Color::Reset, true);
        }
        self.front.put_str(6, 7, "━━━ Amidakuji for the terminal ━━━", DIM_FG, Color::Reset, false);

        let max = s.ladder_cfg.max_participants;
        let prompt = format!("How many participants? ({}-{})", MIN_COLUMNS, max);
        self.front.put_str(6, 10, &prompt, Color::White, Color::Reset, false);

        let caret = if (s.anim_tick / 15) % 2 == 0 { "_" } else { " " };
        let field = format!(" {:>2}{} ", s.count_input, caret);
        let x = self.front.put_str(8, 12, "◀ ", KEY_FG, Color::Reset, false);
        let x = self.front.put_str(x, 12, &field, HI_FG, FOCUS_BG, true);
        self.front.put_str(x, 12, " ▶", KEY_FG, Color::Reset, false);

        self.front.put_str(6, 15, "Type a number or use ←→ / ↑↓, then ENTER.", DIM_FG, Color::Reset, false);
    }

    fn compose_input(&mut self, s: &Session) {
        let n = s.input_count();
        if n == 0 {
            return;
        }
        self.front.put_str(2, 2, "Who is playing, and what is at the bottom of each lane?", Color::White, Color::Reset, false);

        let lane_w = (self.front.width.saturating_sub(4) / n).clamp(MIN_LANE_W, MAX_LANE_W + 2);
        let origin = self.front.width.saturating_sub(lane_w * n) / 2;
        let caret = (s.anim_tick / 15) % 2 == 0;

        self.front.put_str(origin, 4, "NAMES", TITLE_FG, Color::Reset, true);
        self.front.put_str(origin, 7, "RESULTS", TITLE_FG, Color::Reset, true);
        for i in 0..n {
            let x = origin + i * lane_w;
            let w = lane_w - 1;
            if let Some(text) = s.name_inputs.get(i) {
                self.compose_field(x, 5, w, text, s.focus == Field::Name(i), caret, Color::White);
            }
            if let Some(text) = s.result_inputs.get(i) {
                let fg = if is_win_result(text) { WIN_FG } else { LOSE_FG };
                self.compose_field(x, 8, w, text, s.focus == Field::Result(i), caret, fg);
            }
        }

        // Full text of the focused field
        let (label, text) = match s.focus {
            Field::Name(i) => (format!("Name {}", i + 1), s.name_inputs.get(i)),
            Field::Result(i) => (format!("Result {}", i + 1), s.result_inputs.get(i)),
        };
        let text = text.map(String::as_str).unwrap_or("");
        let x = self.front.put_str(2, 10, &format!("{label}: "), KEY_FG, Color::Reset, false);
        let x = self.front.put_str(x, 10, text, Color::White, Color::Reset, true);
        if caret {
            self.front.put_str(x, 10, "_", HI_FG, Color::Reset, false);
        }
        let count = format!("{}/{} chars, empty falls back to a default", text.chars().count(), MAX_INPUT_CHARS);
        self.front.put_str(2, 11, &count, DIM_FG, Color::Reset, false);
    }

    #[allow(clippy::too_many_arguments)]
    fn compose_field(&mut self, x: usize, y: usize, w: usize, text: &str, focused: bool, caret: bool, fg: Color) {
        let bg = if focused { FOCUS_BG } else { FIELD_BG };
        self.front.fill_rect(x, y, w, 1, bg);
        if focused {
            // Show the end being typed, leaving room for the caret
            let shown = tail_to_width(text, w.saturating_sub(1));
            let end = self.front.put_str(x, y, &shown, fg, bg, true);
            if caret {
                self.front.put_str(end, y, "_", HI_FG, bg, false);
            }
        } else {
            self.front.put_str(x, y, &truncate_to_width(text, w), fg, bg, false);
        }
    }

    fn compose_game(&mut self, s: &Session, layout: &BoardLayout) {
        let ladder = match &s.ladder {
            Some(l) => l,
            None => return,
        };
        let (w, h) = (self.front.width, self.front.height);

        // Rails and rungs
        let mut rails = Strokes::new(w, h);
        draw_ladder(&mut rails, ladder, layout);
        for y in 0..h {
            for x in 0..w {
                let mask = rails.get(x, y);
                if mask != 0 {
                    self.front.set(x, y, Cell::new(box_char(mask, false), RAIL_FG, Color::Reset, false));
                }
            }
        }

        // Traces over the rails, in GO order
        let segment_ticks = s.speed.segment_ticks();
        for trace in &s.traces {
            let color = trace_color(trace.participant);
            let mut strokes = Strokes::new(w, h);
            let head = draw_trace(&mut strokes, trace, layout, segment_ticks);
            for y in 0..h {
                for x in 0..w {
                    let mask = strokes.get(x, y);
                    if mask != 0 {
                        self.front.set(x, y, Cell::new(box_char(mask, true), color, Color::Reset, true));
                    }
                }
            }
            if let Some((hx, hy)) = head {
                self.front.set(hx, hy, Cell::new('●', color, Color::Reset, true));
            }
        }

        // Names row
        let label_w = layout.label_w();
        let choosing = s.modal().is_none();
        for (i, p) in s.participants.iter().enumerate() {
            let selected = choosing && i == s.cursor;
            let fg = if p.done { trace_color(i) } else { Color::White };
            let bg = if selected { SELECT_BG } else { Color::Reset };
            if selected {
                let left = layout.lane_x(i).saturating_sub(label_w / 2);
                self.front.fill_rect(left, NAMES_ROW, label_w, 1, bg);
            }
            self.front.put_centered(layout.lane_x(i), NAMES_ROW, &p.name, label_w, fg, bg, selected || p.done);
        }

        // Results row, then who landed where
        let results_row = layout.results_row();
        for (i, r) in s.results.iter().enumerate() {
            let fg = if is_win_result(r) { WIN_FG } else { LOSE_FG };
            self.front.put_centered(layout.lane_x(i), results_row, r, label_w, fg, Color::Reset, false);
        }
        for trace in s.traces.iter().filter(|t| t.state == TraceState::Revealed) {
            if let Some(p) = s.participants.get(trace.participant) {
                self.front.put_centered(
                    layout.lane_x(trace.path.final_column),
                    results_row + 1,
                    &p.name,
                    label_w,
                    trace_color(trace.participant),
                    Color::Reset,
                    false,
                );
            }
        }
    }

    fn compose_too_small(&mut self, s: &Session) {
        let needed = s.columns() * MIN_LANE_W;
        let rows = s.ladder.as_ref().map_or(0, |l| l.rows());
        let msg = format!(
            "Terminal too small: need at least {}×{}",
            needed,
            BOARD_ROW + BELOW_BOARD + min_board_h(rows)
        );
        self.front.put_str(2, BOARD_ROW, &msg, Color::Rgb { r: 255, g: 80, b: 80 }, Color::Reset, true);
    }

    fn compose_modal(&mut self, s: &Session) {
        let reveal = match s.modal() {
            Some(r) => r,
            None => return,
        };
        let (accent, title) = if reveal.win {
            (WIN_FG, "★  WINNER  ★")
        } else {
            (LOSE_FG, "RESULT")
        };

        let box_w = 40.min(self.front.width);
        let box_h = 9.min(self.front.height);
        if box_w < 4 || box_h < 3 {
            return;
        }
        let bx = (self.front.width - box_w) / 2;
        let by = (self.front.height - box_h) / 2;
        let cx = bx + box_w / 2;
        let inner = box_w - 4;

        self.front.fill_rect(bx, by, box_w, box_h, MODAL_BG);
        let bar = "═".repeat(box_w - 2);
        self.front.put_str(bx, by, &format!("╔{bar}╗"), accent, MODAL_BG, true);
        self.front.put_str(bx, by + box_h - 1, &format!("╚{bar}╝"), accent, MODAL_BG, true);
        for y in by + 1..by + box_h - 1 {
            self.front.put_str(bx, y, "║", accent, MODAL_BG, true);
            self.front.put_str(bx + box_w - 1, y, "║", accent, MODAL_BG, true);
        }

        self.front.put_centered(cx, by + 2, title, inner, accent, MODAL_BG, true);
        let who = trace_color(reveal.participant);
        self.front.put_centered(cx, by + 4, &reveal.name, inner, who, MODAL_BG, true);
        self.front.put_centered(cx, by + 5, &format!("▼ {} ▼", reveal.result), inner, accent, MODAL_BG, true);

        let pending = s.reveals.len() - 1;
        let hint = if pending > 0 {
            format!("ENTER / ESC: close  (+{pending} more)")
        } else {
            "ENTER / ESC: close".to_string()
        };
        self.front.put_centered(cx, by + box_h - 2, &hint, inner, DIM_FG, MODAL_BG, false);
    }

    fn compose_message(&mut self, s: &Session) {
        if s.message.is_empty() || self.front.height < 2 {
            return;
        }
        let row = self.front.height - 2;
        self.front.fill_row(row, MSG_BG);
        self.front.put_str(0, row, &format!(" ◈ {} ", s.message), Color::Black, MSG_BG, false);
    }

    fn compose_help(&mut self, s: &Session) {
        if self.front.height == 0 {
            return;
        }
        let help = match s.phase {
            Phase::Setup => " 0-9 Type  ←→↑↓ Adjust  ENTER Apply  M Music  Q Quit",
            Phase::Input => " Type to edit  TAB Next  ←→↑↓ Move  ENTER Start  ESC Back",
            Phase::Game if s.modal().is_some() => " ENTER/ESC Close result",
            Phase::Game => " ←→ Select  ENTER/SPACE GO  R Reset  M Music  Q Quit",
        };
        self.front.put_str(0, self.front.height - 1, help, DIM_FG, Color::Reset, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_for_mixed_scripts() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('당'), 2);
        assert_eq!(char_width('等'), 2);
        assert_eq!(display_width("1등 Win"), 7);
    }

    #[test]
    fn truncation_respects_wide_chars() {
        assert_eq!(truncate_to_width("가나다", 5), "가나");
        assert_eq!(truncate_to_width("abc", 10), "abc");
        assert_eq!(tail_to_width("가나다", 5), "나다");
        assert_eq!(tail_to_width("abcdef", 3), "def");
    }

    #[test]
    fn wide_chars_occupy_two_cells() {
        let mut fb = FrameBuffer::new(6, 1);
        let end = fb.put_str(0, 0, "a당b", Color::White, Color::Reset, false);
        assert_eq!(end, 4);
        assert!(fb.get(1, 0).wide);
        assert!(fb.get(2, 0).cont);
        assert_eq!(fb.get(3, 0).ch, 'b');

        // Overwriting the continuation blanks the orphaned left half
        fb.set(2, 0, Cell::new('x', Color::White, Color::Reset, false));
        assert_eq!(fb.get(1, 0).ch, ' ');
        assert!(!fb.get(1, 0).wide);
    }

    #[test]
    fn wide_char_never_straddles_edge() {
        let mut fb = FrameBuffer::new(3, 1);
        let end = fb.put_str(0, 0, "ab당", Color::White, Color::Reset, false);
        assert_eq!(end, 2);
        assert_eq!(fb.get(2, 0), Cell::BLANK);
    }

    #[test]
    fn box_glyphs_from_masks() {
        assert_eq!(box_char(UP | DOWN, false), '│');
        assert_eq!(box_char(UP | DOWN | RIGHT, false), '├');
        assert_eq!(box_char(UP | RIGHT, true), '┗');
        assert_eq!(box_char(LEFT | DOWN, true), '┓');
        assert_eq!(box_char(0, false), ' ');
    }

    #[test]
    fn strokes_join_lines() {
        let mut st = Strokes::new(5, 5);
        st.line((1, 0), (1, 4));
        st.line((3, 2), (1, 2));
        assert_eq!(st.get(1, 0), DOWN);
        assert_eq!(st.get(1, 2), UP | DOWN | RIGHT);
        assert_eq!(st.get(2, 2), LEFT | RIGHT);
        assert_eq!(st.get(3, 2), LEFT);
        assert_eq!(st.get(1, 4), UP);
    }

    #[test]
    fn layout_centres_and_caps_lanes() {
        let l = BoardLayout::fit(80, 24, 4, 15).unwrap();
        assert_eq!(l.geometry.column_width(), MAX_LANE_W as f32);
        assert_eq!(l.label_w(), MAX_LANE_W - 1);
        assert_eq!(l.origin_x, (80 - 48) / 2);
        assert_eq!(l.board_h, 24 - BOARD_ROW - BELOW_BOARD);
        assert_eq!(l.results_row(), 24 - 4);
        // lane centre: origin + 12/2
        assert_eq!(l.lane_x(0), 16 + 6);
        assert_eq!(l.lane_x(1), 16 + 18);
    }

    #[test]
    fn layout_rejects_cramped_terminals() {
        assert!(BoardLayout::fit(20, 24, 14, 15).is_none());
        assert!(BoardLayout::fit(80, 8, 4, 15).is_none());
        assert!(BoardLayout::fit(80, 24, 0, 15).is_none());
        // 15 rung rows need 16 board rows
        assert!(BoardLayout::fit(80, 12, 4, 15).is_none());
        assert!(BoardLayout::fit(80, BOARD_ROW + BELOW_BOARD + 15, 4, 15).is_none());
        assert!(BoardLayout::fit(80, BOARD_ROW + BELOW_BOARD + 16, 4, 15).is_some());
    }

    #[test]
    fn every_rung_row_gets_its_own_line() {
        for rows in [1, 2, 7, 15, 60] {
            let term_h = BOARD_ROW + BELOW_BOARD + min_board_h(rows);
            let layout = BoardLayout::fit(80, term_h, 4, rows).unwrap();
            let g = layout.geometry;
            let ys: Vec<usize> =
                (0..rows).map(|r| layout.cell((0.0, g.level_y(Level::Rung(r)))).1).collect();
            assert!(ys.windows(2).all(|w| w[0] < w[1]), "rows {rows}: {ys:?}");
            assert!(*ys.last().unwrap() < layout.results_row());
        }
    }

    #[test]
    fn rungs_on_neighbouring_rows_stay_apart() {
        let ladder = Ladder::from_rows(3, vec![vec![true, false], vec![false, true]]).unwrap();
        let layout = BoardLayout::fit(40, BOARD_ROW + BELOW_BOARD + min_board_h(2), 3, 2).unwrap();
        let mut st = Strokes::new(40, 30);
        draw_ladder(&mut st, &ladder, &layout);

        let g = layout.geometry;
        let mid = |r| layout.cell((g.column_x(1), g.level_y(Level::Rung(r))));
        let (x, y0) = mid(0);
        let (_, y1) = mid(1);
        assert_ne!(y0, y1);
        assert_eq!(st.get(x, y0) & (LEFT | RIGHT), LEFT);
        assert_eq!(st.get(x, y1) & (LEFT | RIGHT), RIGHT);
    }

    #[test]
    fn ladder_strokes_cover_rails_and_rungs() {
        let ladder = Ladder::from_rows(2, vec![vec![true]]).unwrap();
        let layout = BoardLayout::fit(40, 17, 2, 1).unwrap();
        let mut st = Strokes::new(40, 17);
        draw_ladder(&mut st, &ladder, &layout);

        let g = layout.geometry;
        let (lx, ry) = layout.cell((g.column_x(0), g.level_y(Level::Rung(0))));
        let (rx, _) = layout.cell((g.column_x(1), g.level_y(Level::Rung(0))));
        assert_eq!(st.get(lx, ry), UP | DOWN | RIGHT);
        assert_eq!(st.get(rx, ry), UP | DOWN | LEFT);
        assert_eq!(st.get(lx, BOARD_ROW), DOWN);
    }

    #[test]
    fn trace_colours_cycle_by_lane() {
        assert_eq!(trace_color(0), trace_color(5));
        assert_ne!(trace_color(0), trace_color(1));
    }
}
