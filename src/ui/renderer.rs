/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into `front` (array of Glyph)
///   2. Compare each glyph with `back` (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. Batch with `queue!`, flush once, swap buffers
///
/// The renderer draws what the session already computed: tile kinds,
/// beam cells, preview / overlay tints, occupants. It decides nothing.

use std::collections::HashMap;
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use mirrorgrid::domain::geometry::{Cell, Diagonal};
use mirrorgrid::domain::obstacle::Obstacle;
use mirrorgrid::domain::shape::Shape;
use mirrorgrid::domain::tile::TileKind;
use mirrorgrid::sim::ownership::OwnershipRegistry;
use mirrorgrid::sim::session::{Session, Tint};

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const VOID_BG: Color = Color::Rgb { r: 8, g: 8, b: 12 };
const FLOOR_BG: Color = Color::Rgb { r: 40, g: 40, b: 55 };
const BEAM_FG: Color = Color::Rgb { r: 255, g: 70, b: 90 };
const CURSOR_BG: Color = Color::Rgb { r: 70, g: 90, b: 140 };

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: BASE_BG };
    /// Never drawn; forces a full repaint when it fills the back buffer.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

struct FrameBuffer {
    width: usize,
    height: usize,
    glyphs: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, glyphs: vec![Glyph::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.glyphs.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.glyphs[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.glyphs[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Glyph { ch, fg, bg: BASE_BG });
        }
    }
}

/// Sandbox state the renderer shows next to the session.
pub struct View<'a> {
    pub placing: bool,
    pub cursor: Cell,
    pub shape: &'a Shape,
    pub message: &'a str,
}

/// Each grid cell is two terminal columns wide.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;
        self.fit_terminal()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, session: &Session, view: &View) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.fit_terminal()?;
        }

        self.front.clear();
        self.compose_hud(session, view);
        let map_h = self.compose_map(session, view);
        self.compose_footer(view, MAP_ROW + map_h + 1);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn fit_terminal(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.glyphs.fill(Glyph::INVALID);
        queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, session: &Session, view: &View) {
        let keys: Vec<String> = session
            .inventory
            .summary()
            .into_iter()
            .map(|(k, n)| format!("{k}x{n}"))
            .collect();
        let keys = if keys.is_empty() { "-".to_string() } else { keys.join(" ") };
        let mode = if view.placing { "PLACE" } else { "WALK" };
        let hud = format!(
            " {}  keys:{}  falls:{}  shape:{}  [{}] ",
            session.name(),
            keys,
            session.player.falls,
            view.shape.name,
            mode,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White);
    }

    /// Draw the map. Returns the number of rows used.
    fn compose_map(&mut self, session: &Session, view: &View) -> usize {
        let grid = session.grid();
        let bounds = grid.bounds();
        if bounds.is_empty() { return 0; }

        let footprint = if view.placing { view.shape.footprint(view.cursor) } else { vec![] };
        let beams = beam_glyphs(session);
        let tints = tint_map(session);

        for dy in 0..bounds.height {
            let y = bounds.max_y() - dy;
            let row = MAP_ROW + dy as usize;
            for dx in 0..bounds.width {
                let cell = Cell::new(bounds.origin.x + dx, y);
                let (mut ch, mut fg, mut bg) = tile_glyph(grid.tile_kind(cell), grid.ground_meta(cell).is_some());

                if let Some(&glyph) = beams.get(&cell) {
                    ch = [glyph, glyph];
                    fg = BEAM_FG;
                } else if grid.is_beam_blocked(cell) {
                    // Producers other than mirrors have no segment.
                    ch = ['╳', ' '];
                    fg = BEAM_FG;
                }
                if let Some((_, obstacle)) = grid.try_get_obstacle(cell) {
                    (ch, fg) = obstacle_glyph(obstacle);
                }
                if let Some(e) = session.enemies.iter().find(|e| e.alive && e.cell == cell) {
                    ch = ['x', char::from(b'0' + (e.id % 10) as u8)];
                    fg = Color::Rgb { r: 255, g: 140, b: 0 };
                }
                if session.player.cell == cell {
                    ch = if session.player.is_falling() { ['v', 'v'] } else { ['@', ' '] };
                    fg = Color::Rgb { r: 120, g: 255, b: 160 };
                }

                if let Some(&t) = tints.get(&cell) {
                    bg = t;
                }
                if footprint.contains(&cell) {
                    bg = CURSOR_BG;
                }

                let col = dx as usize * CELL_W;
                self.front.set(col, row, Glyph { ch: ch[0], fg, bg });
                self.front.set(col + 1, row, Glyph { ch: ch[1], fg, bg });
            }
        }
        bounds.height as usize
    }

    fn compose_footer(&mut self, view: &View, row: usize) {
        self.front.put_str(1, row, view.message, Color::Rgb { r: 240, g: 200, b: 80 });
        self.front.put_str(
            1,
            row + 1,
            "arrows/WASD move  E interact  TAB place mode  SPACE place  R rotate  N next shape  X restart  ESC quit",
            Color::DarkGrey,
        );
    }
}

fn tile_glyph(kind: TileKind, painted: bool) -> ([char; 2], Color, Color) {
    match kind {
        TileKind::Floor => (['·', ' '], Color::DarkGrey, FLOOR_BG),
        TileKind::Start => (['S', ' '], Color::Cyan, FLOOR_BG),
        TileKind::Void if painted => ([' ', ' '], Color::DarkGrey, VOID_BG),
        TileKind::Void => ([' ', ' '], Color::White, BASE_BG),
        TileKind::Wall => (['█', '█'], Color::Grey, BASE_BG),
        TileKind::Gate => (['▒', '▒'], Color::Yellow, BASE_BG),
    }
}

fn obstacle_glyph(obstacle: &Obstacle) -> ([char; 2], Color) {
    match obstacle {
        Obstacle::Mirror(m) => {
            let arrow = match m.facing {
                Diagonal::UpRight => '↗',
                Diagonal::UpLeft => '↖',
                Diagonal::DownRight => '↘',
                Diagonal::DownLeft => '↙',
            };
            let fg = match (m.is_emitter, m.beam_active) {
                (_, false) => Color::DarkGrey,
                (true, true) => BEAM_FG,
                (false, true) => Color::Rgb { r: 160, g: 200, b: 255 },
            };
            ([arrow, if m.is_emitter { '*' } else { ' ' }], fg)
        }
        Obstacle::Lever(l) => ([if l.pulled { '\\' } else { '/' }, ' '], Color::Magenta),
    }
}

/// Slanted glyph for every cell a mirror's segment covers. The slant
/// follows the segment's world-space direction (y up, rows drawn top first).
fn beam_glyphs(session: &Session) -> HashMap<Cell, char> {
    let mut out = HashMap::new();
    for seg in session.segments() {
        let rising = (seg.end.x - seg.start.x) * (seg.end.y - seg.start.y) >= 0.0;
        let glyph = if rising { '╱' } else { '╲' };
        for &cell in session.grid().beam_cells_of(seg.owner) {
            out.insert(cell, glyph);
        }
    }
    out
}

/// Cell tints for this frame. Preview wins over overlay; later owners win
/// over earlier ones.
fn tint_map(session: &Session) -> HashMap<Cell, Color> {
    let mut out = HashMap::new();
    paint(&mut out, session.overlays());
    paint(&mut out, session.previews());
    out
}

fn paint(out: &mut HashMap<Cell, Color>, registry: &OwnershipRegistry<Tint>) {
    for (_, cells, t) in registry.entries() {
        for &cell in cells {
            out.insert(cell, Color::Rgb { r: t.r, g: t.g, b: t.b });
        }
    }
}
