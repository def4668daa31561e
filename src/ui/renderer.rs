/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board is drawn from a `Snapshot`; the HUD and panels read the world
/// immutably. Overlay text lives here and is driven purely by events.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::content::{LevelId, MutationId};
use crate::domain::entity::Orientation;
use crate::domain::grid::{Cell, Dir, WallMode};
use crate::domain::rules::Cause;
use crate::sim::event::{GameEvent, TextChannel};
use crate::sim::world::{Phase, Snapshot, WorldState};

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Glyph {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every glyph keeps
    /// inter-row gaps on VTE terminals the same colour as the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Glyph = Glyph {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Glyph::BASE_BG,
    };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Glyph = Glyph {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so every glyph has an explicit background.
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(c: char, fg: Color, bg: Color) -> Self {
        let mut g = Self::BLANK;
        g.ch_len = c.encode_utf8(&mut g.ch).len() as u8;
        g.fg = fg;
        g.bg = Self::norm_bg(bg);
        g
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Glyph::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column; stops at `limit`.
    fn put_str_clipped(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color, limit: usize) {
        for (i, ch) in s.chars().enumerate() {
            let cx = x + i;
            if cx >= limit.min(self.width) {
                break;
            }
            self.set(cx, y, Glyph::new(ch, fg, bg));
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        self.put_str_clipped(x, y, s, fg, bg, usize::MAX);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::new(' ', Color::White, bg));
        }
    }
}

// ── Overlay: presentation state fed by events ──

#[derive(Clone, Debug)]
struct Ending {
    score: u32,
    cause: Cause,
    epitaph: &'static str,
}

#[derive(Clone, Debug, Default)]
struct Overlay {
    virus: Option<&'static str>,
    host: Option<&'static str>,
    offer: Vec<MutationId>,
    next_level: Option<LevelId>,
    ending: Option<Ending>,
    /// Frames left on the neuroplasticity board flash.
    flash_frames: u8,
}

const FLASH_FRAMES: u8 = 30;

impl Overlay {
    fn observe(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Text { channel: TextChannel::Virus, text } => self.virus = Some(*text),
            GameEvent::Text { channel: TextChannel::Host, text } => self.host = Some(*text),
            GameEvent::TextCleared { channel: TextChannel::Virus } => self.virus = None,
            GameEvent::TextCleared { channel: TextChannel::Host } => self.host = None,
            GameEvent::MutationOffered { options } => self.offer = options.clone(),
            GameEvent::MutationActivated(_) => self.offer.clear(),
            GameEvent::LevelTransitionReady { next } => self.next_level = Some(*next),
            GameEvent::LevelAdvanced(_) => self.next_level = None,
            GameEvent::RunEnded { final_score, cause, epitaph } => {
                self.ending = Some(Ending { score: *final_score, cause: *cause, epitaph: *epitaph })
            }
            GameEvent::Neuroplasticity => self.flash_frames = FLASH_FRAMES,
            GameEvent::SessionReset => *self = Overlay::default(),
            _ => {}
        }
    }
}

fn cause_label(cause: Cause) -> &'static str {
    match cause {
        Cause::Wall => "Splattered against the vessel wall",
        Cause::Pulse => "Fried by an electrical pulse",
        Cause::Obstacle => "Clotted on a blockage",
        Cause::Enemy => "Neutralised by host defences",
        Cause::SelfCollision => "Devoured its own tail",
    }
}

// ── Level palette ──

struct Theme {
    board_bg: Color,
    flash_bg: Color,
    border: Color,
    target: char,
    target_fg: Color,
    obstacle_fg: Color,
}

fn theme(level: LevelId) -> Theme {
    match level {
        LevelId::Circulatory => Theme {
            board_bg: Color::Rgb { r: 40, g: 8, b: 14 },
            flash_bg: Color::Rgb { r: 70, g: 20, b: 30 },
            border: Color::Rgb { r: 200, g: 60, b: 70 },
            target: '●',
            target_fg: Color::Rgb { r: 255, g: 70, b: 70 },
            obstacle_fg: Color::Rgb { r: 150, g: 40, b: 50 },
        },
        LevelId::Nervous => Theme {
            board_bg: Color::Rgb { r: 8, g: 16, b: 40 },
            flash_bg: Color::Rgb { r: 20, g: 35, b: 70 },
            border: Color::Rgb { r: 80, g: 140, b: 255 },
            target: '◆',
            target_fg: Color::Rgb { r: 120, g: 220, b: 255 },
            obstacle_fg: Color::Rgb { r: 60, g: 80, b: 140 },
        },
        LevelId::Brain => Theme {
            board_bg: Color::Rgb { r: 30, g: 12, b: 36 },
            flash_bg: Color::Rgb { r: 80, g: 40, b: 90 },
            border: Color::Rgb { r: 200, g: 120, b: 220 },
            target: '✿',
            target_fg: Color::Rgb { r: 255, g: 160, b: 220 },
            obstacle_fg: Color::Rgb { r: 110, g: 60, b: 120 },
        },
    }
}

// ── Renderer ──

/// Each grid cell = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const EFFECT_ROW: usize = 1;
const MAP_ROW: usize = 3;
/// Board columns start right of the left border.
const MAP_COL: usize = 1;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const VIRUS_FG: Color = Color::Rgb { r: 120, g: 255, b: 120 };
const HOST_FG: Color = Color::Rgb { r: 255, g: 210, b: 120 };
const PANEL_BG: Color = Color::Rgb { r: 12, g: 12, b: 24 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    overlay: Overlay,
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
            overlay: Overlay::default(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Glyph::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Feed session events into the overlay state.
    pub fn observe(&mut self, events: &[GameEvent]) {
        for event in events {
            self.overlay.observe(event);
        }
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();

        let snap = world.snapshot();
        self.compose_hud(world);
        self.compose_effects(&snap, world);
        self.compose_board(&snap, world);
        self.compose_text_bar(world);

        match world.phase {
            Phase::Intro => self.compose_intro(world),
            Phase::MutationSelect => self.compose_mutation_menu(world),
            Phase::LevelTransition => self.compose_level_transition(world),
            Phase::Ended => self.compose_ended(world),
            Phase::Playing => {}
        }

        self.overlay.flash_frames = self.overlay.flash_frames.saturating_sub(1);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Glyph::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let host = w.host();
        let goal = match w.next_level_score() {
            Some(s) => format!("{s}"),
            None => "∞".into(),
        };
        let hud = format!(
            " PARASIGHT  │ Host: {} ({})  │ L{} {}  │ Score:{:<5} Next:{:<4} Mutation@{} ",
            host.name,
            host.title,
            w.level.number(),
            w.level.def().name,
            w.score,
            goal,
            w.next_mutation_at,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Active mutations with remaining time, and the wall-phase window.
    fn compose_effects(&mut self, snap: &Snapshot, w: &WorldState) {
        let mut x = 1;
        if snap.effects.is_empty() {
            self.front.put_str(x, EFFECT_ROW, "no mutations", Color::DarkGrey, Color::Reset);
            return;
        }
        for &(id, remaining) in &snap.effects {
            let def = id.def();
            let label = match remaining {
                Some(ms) => format!("{} {} {:.1}s", def.icon, def.name, ms as f64 / 1000.0),
                None => format!("{} {}", def.icon, def.name),
            };
            let engaged = w.effects.get(id).map_or(false, |i| i.is_engaged(snap.now));
            let fg = if engaged { Color::Rgb { r: 120, g: 255, b: 255 } } else { Color::Rgb { r: 180, g: 255, b: 180 } };
            self.front.put_str(x, EFFECT_ROW, &label, fg, Color::Reset);
            x += label.chars().count() + 3;
        }
    }

    fn compose_board(&mut self, snap: &Snapshot, w: &WorldState) {
        let t = theme(snap.level);
        let gw = w.grid.width as usize;
        let gh = w.grid.height as usize;
        let bg = if self.overlay.flash_frames > 0 { t.flash_bg } else { t.board_bg };
        let right = MAP_COL + gw * CELL_W;
        let bottom = MAP_ROW + gh;

        // ── Border ──
        let wrapping = w.effects.wall_mode(snap.now) == WallMode::Wrapping;
        let (hz, vt) = if wrapping { ('┄', '┆') } else { ('═', '║') };
        for x in MAP_COL..right {
            self.front.set(x, MAP_ROW - 1, Glyph::new(hz, t.border, Color::Reset));
            self.front.set(x, bottom, Glyph::new(hz, t.border, Color::Reset));
        }
        for y in MAP_ROW..bottom {
            self.front.set(MAP_COL - 1, y, Glyph::new(vt, t.border, Color::Reset));
            self.front.set(right, y, Glyph::new(vt, t.border, Color::Reset));
        }
        for (x, y, c) in [
            (MAP_COL - 1, MAP_ROW - 1, '╔'),
            (right, MAP_ROW - 1, '╗'),
            (MAP_COL - 1, bottom, '╚'),
            (right, bottom, '╝'),
        ] {
            self.front.set(x, y, Glyph::new(c, t.border, Color::Reset));
        }

        // ── Floor ──
        for y in 0..gh {
            for x in 0..gw {
                self.put_cell(Cell::new(x as i32, y as i32), '·', ' ', Color::Rgb { r: 60, g: 60, b: 80 }, bg);
            }
        }

        // ── Pulses (under everything else) ──
        for p in &snap.pulses {
            let (ch, fg, pbg) = if p.deadly {
                ('≋', Color::Rgb { r: 255, g: 255, b: 80 }, Color::Rgb { r: 120, g: 110, b: 0 })
            } else {
                ('~', Color::Rgb { r: 255, g: 160, b: 40 }, Color::Rgb { r: 70, g: 35, b: 0 })
            };
            let cells: Vec<Cell> = match p.orientation {
                Orientation::Row => (0..gw as i32).map(|x| Cell::new(x, p.index)).collect(),
                Orientation::Column => (0..gh as i32).map(|y| Cell::new(p.index, y)).collect(),
            };
            for c in cells {
                self.put_cell(c, ch, ch, fg, pbg);
            }
        }

        for &o in &snap.obstacles {
            self.put_cell(o, '▓', '▓', t.obstacle_fg, bg);
        }
        if let Some(target) = snap.target {
            self.put_cell(target, t.target, ' ', t.target_fg, bg);
        }
        for e in &snap.enemies {
            let ch = if e.patrol { 'Ѫ' } else { '✜' };
            let fg = if e.stunned {
                Color::Rgb { r: 120, g: 160, b: 255 }
            } else if e.patrol {
                Color::Rgb { r: 255, g: 255, b: 255 }
            } else {
                Color::Rgb { r: 255, g: 120, b: 40 }
            };
            let tail = if e.stunned { 'z' } else { ' ' };
            self.put_cell(e.cell, ch, tail, fg, bg);
        }
        if let Some(d) = snap.decoy {
            self.put_cell(d, '◌', '◌', Color::Rgb { r: 150, g: 150, b: 200 }, bg);
        }

        // ── Organism: tail first so the head wins on overlap ──
        let phasing = w.effects.phasing(snap.now);
        let body_fg = if phasing { Color::Rgb { r: 100, g: 220, b: 220 } } else { Color::Rgb { r: 90, g: 220, b: 90 } };
        for &c in snap.organism.iter().skip(1).rev() {
            self.put_cell(c, '█', '█', body_fg, bg);
        }
        if let Some(&head) = snap.organism.first() {
            let eyes = match snap.dir {
                Dir::Up => ('▀', '▀'),
                Dir::Down => ('▄', '▄'),
                Dir::Left => ('◀', '█'),
                Dir::Right => ('█', '▶'),
            };
            self.put_cell(head, eyes.0, eyes.1, Color::Rgb { r: 160, g: 255, b: 120 }, bg);
        }

        // ── Thought bubbles (cosmetic, above the board) ──
        for b in &w.bubbles {
            let (col, row) = board_pos(b.cell);
            self.front.put_str_clipped(col, row, &format!("“{}”", b.text), Color::Rgb { r: 230, g: 230, b: 255 }, PANEL_BG, right);
        }
    }

    fn put_cell(&mut self, c: Cell, left: char, right: char, fg: Color, bg: Color) {
        let (col, row) = board_pos(c);
        self.front.set(col, row, Glyph::new(left, fg, bg));
        self.front.set(col + 1, row, Glyph::new(right, fg, bg));
    }

    /// Virus and host text lines, then the key help.
    fn compose_text_bar(&mut self, w: &WorldState) {
        let row = MAP_ROW + w.grid.height as usize + 2;
        if let Some(text) = self.overlay.virus {
            self.front.put_str(1, row, &format!("◈ VIRUS: {text}"), VIRUS_FG, Color::Reset);
        }
        if let Some(text) = self.overlay.host {
            let line = format!("◇ {}: {text}", w.host().name.to_uppercase());
            self.front.put_str(1, row + 1, &line, HOST_FG, Color::Reset);
        }
        let help = " WASD/Arrows:Move  Space:Phase  1-3:Mutate  R:Restart  Esc/Q:Quit";
        self.front.put_str(0, row + 3, help, Color::DarkGrey, Color::Reset);
    }

    // ── Panels ──

    /// Framed box centred over the board.
    fn compose_panel(&mut self, w: &WorldState, title: &str, accent: Color, lines: &[(String, Color)]) {
        let inner = lines
            .iter()
            .map(|(s, _)| s.chars().count())
            .chain(std::iter::once(title.chars().count() + 4))
            .max()
            .unwrap_or(0)
            + 2;
        let board_w = w.grid.width as usize * CELL_W;
        let left = MAP_COL + board_w.saturating_sub(inner + 2) / 2;
        let top = MAP_ROW + (w.grid.height as usize).saturating_sub(lines.len() + 4) / 2;

        let bar = "═".repeat(inner);
        self.front.put_str(left, top, &format!("╔{bar}╗"), accent, PANEL_BG);
        let heading = format!("{:^width$}", format!("◈ {title} ◈"), width = inner);
        self.front.put_str(left, top + 1, &format!("║{heading}║"), accent, PANEL_BG);
        self.front.put_str(left, top + 2, &format!("╟{}╢", "─".repeat(inner)), accent, PANEL_BG);
        for (i, (text, fg)) in lines.iter().enumerate() {
            let row = top + 3 + i;
            self.front.put_str(left, row, "║", accent, PANEL_BG);
            let body = format!(" {:<width$}", text, width = inner - 1);
            self.front.put_str(left + 1, row, &body, *fg, PANEL_BG);
            self.front.put_str(left + 1 + inner, row, "║", accent, PANEL_BG);
        }
        self.front.put_str(left, top + 3 + lines.len(), &format!("╚{bar}╝"), accent, PANEL_BG);
    }

    fn compose_intro(&mut self, w: &WorldState) {
        let host = w.host();
        let level = w.level.def();
        let lines = wrap(host.intro, 44)
            .into_iter()
            .map(|l| (l, Color::White))
            .chain([
                (String::new(), Color::White),
                (format!("Level {}: {}", w.level.number(), level.name), Color::Rgb { r: 255, g: 120, b: 120 }),
                (level.subtitle.to_string(), Color::DarkGrey),
                (String::new(), Color::White),
                ("▸ Press a direction to begin infection".to_string(), Color::Rgb { r: 80, g: 255, b: 80 }),
            ])
            .collect::<Vec<_>>();
        let title = format!("HOST: {} · {}", host.name, host.title);
        self.compose_panel(w, &title, Color::Rgb { r: 120, g: 255, b: 120 }, &lines);
    }

    fn compose_mutation_menu(&mut self, w: &WorldState) {
        let offer = if self.overlay.offer.is_empty() { &w.mutation_offer } else { &self.overlay.offer };
        let mut lines = vec![];
        for (i, id) in offer.iter().enumerate() {
            let def = id.def();
            let held = w.effects.get(*id).map_or(false, |inst| inst.is_live(w.now));
            let suffix = if held { "  (re-arm)" } else { "" };
            lines.push((format!("[{}] {} {}{}", i + 1, def.icon, def.name, suffix), Color::Rgb { r: 255, g: 230, b: 120 }));
            lines.push((format!("    {}", def.summary), Color::White));
            lines.push((format!("    {}", def.tagline), Color::DarkGrey));
        }
        lines.push((String::new(), Color::White));
        lines.push(("▸ Press 1, 2 or 3 to evolve".into(), Color::Rgb { r: 80, g: 255, b: 80 }));
        self.compose_panel(w, "MUTATION AVAILABLE", Color::Rgb { r: 255, g: 200, b: 80 }, &lines);
    }

    fn compose_level_transition(&mut self, w: &WorldState) {
        let Some(next) = self.overlay.next_level.or_else(|| w.level.next()) else {
            return;
        };
        let def = next.def();
        let mut lines = vec![
            (def.subtitle.to_string(), Color::Rgb { r: 255, g: 160, b: 160 }),
            (String::new(), Color::White),
        ];
        lines.extend(wrap(def.description, 44).into_iter().map(|l| (l, Color::White)));
        lines.push((String::new(), Color::White));
        lines.push(("▸ Press any key to continue".into(), Color::Rgb { r: 80, g: 255, b: 80 }));
        let title = format!("LEVEL {}: {}", next.number(), def.name.to_uppercase());
        self.compose_panel(w, &title, Color::Rgb { r: 120, g: 180, b: 255 }, &lines);
    }

    fn compose_ended(&mut self, w: &WorldState) {
        let (score, cause, epitaph) = match &self.overlay.ending {
            Some(e) => (e.score, Some(e.cause), e.epitaph),
            None => (w.score, None, ""),
        };
        let mut lines = vec![];
        if let Some(c) = cause {
            lines.push((cause_label(c).to_string(), Color::Rgb { r: 255, g: 120, b: 120 }));
        }
        lines.push((format!("Final Score: {score}"), Color::White));
        lines.push((format!("Reached: Level {} · {}", w.level.number(), w.level.def().name), Color::White));
        if !epitaph.is_empty() {
            lines.push((String::new(), Color::White));
            lines.extend(wrap(epitaph, 44).into_iter().map(|l| (l, VIRUS_FG)));
        }
        lines.push((String::new(), Color::White));
        lines.push(("▸ R: Infect a new host".into(), Color::Rgb { r: 80, g: 255, b: 80 }));
        lines.push(("▸ Esc: Quit".into(), Color::DarkGrey));
        self.compose_panel(w, "INFECTION TERMINATED", Color::Rgb { r: 255, g: 60, b: 60 }, &lines);
    }
}

/// Terminal (column, row) of the left half of a grid cell.
fn board_pos(c: Cell) -> (usize, usize) {
    (MAP_COL + c.x.max(0) as usize * CELL_W, MAP_ROW + c.y.max(0) as usize)
}

/// Greedy word wrap to at most `width` chars per line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = vec![];
    let mut line = String::new();
    for word in text.split_whitespace() {
        let need = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
        if need > width && !line.is_empty() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::LINE_PHASE;

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("one two three four five six seven", 10);
        assert_eq!(lines, vec!["one two", "three four", "five six", "seven"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn overlay_tracks_text_channels() {
        let mut o = Overlay::default();
        o.observe(&GameEvent::Text { channel: TextChannel::Virus, text: LINE_PHASE });
        assert_eq!(o.virus, Some(LINE_PHASE));
        assert_eq!(o.host, None);
        o.observe(&GameEvent::TextCleared { channel: TextChannel::Virus });
        assert_eq!(o.virus, None);
    }

    #[test]
    fn overlay_resets_with_session() {
        let mut o = Overlay::default();
        o.observe(&GameEvent::MutationOffered { options: vec![MutationId::SpineFangs] });
        o.observe(&GameEvent::RunEnded { final_score: 40, cause: Cause::Wall, epitaph: "x" });
        assert_eq!(o.offer, vec![MutationId::SpineFangs]);
        assert!(o.ending.is_some());
        o.observe(&GameEvent::SessionReset);
        assert!(o.offer.is_empty());
        assert!(o.ending.is_none());
    }

    #[test]
    fn glyph_round_trips_multibyte() {
        let g = Glyph::new('≋', Color::White, Color::Reset);
        assert_eq!(g.as_str(), "≋");
        assert_eq!(g.bg, Glyph::BASE_BG);
    }
}
