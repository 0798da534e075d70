/// Entry point and sandbox loop.

mod ui;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mirrorgrid::config::GameConfig;
use mirrorgrid::domain::geometry::{Cell, MoveDir};
use mirrorgrid::domain::occupant::OccupantKind;
use mirrorgrid::domain::shape::Shape;
use mirrorgrid::sim::event::GameEvent;
use mirrorgrid::sim::level::load_level;
use mirrorgrid::sim::session::{Session, SessionRules};
use mirrorgrid::sim::step::{self, FrameInput, Placement};
use ui::input::InputState;
use ui::renderer::{Renderer, View};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Status line lifetime, in ticks.
const MESSAGE_TICKS: u32 = 40;

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);

    let def = match load_level(config.level.as_deref()) {
        Ok(def) => def,
        Err(e) => {
            error!(error = %e, "level load failed");
            eprintln!("Level load failed: {e}");
            std::process::exit(1);
        }
    };
    let mut session = Session::from_level(def, SessionRules::from_config(&config));
    session.start();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut session, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Sandbox error: {e}");
    }

    println!();
    println!("Left {} after {} fall(s).", session.name(), session.player.falls);
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_tracing(config: &GameConfig) {
    let Some(path) = &config.log_file else { return };
    let file = match std::fs::File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Could not open log file {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

// ══════════════════════════════════════════════════════════════
// Sandbox state (cursor, shape palette, status line)
// ══════════════════════════════════════════════════════════════

struct Sandbox {
    placing: bool,
    cursor: Cell,
    palette: Vec<Shape>,
    shape_idx: usize,
    shape: Shape,
    message: String,
    message_ticks: u32,
}

impl Sandbox {
    fn new(cursor: Cell) -> Self {
        let palette = Shape::palette();
        let shape = palette[0].clone();
        Sandbox {
            placing: false,
            cursor,
            palette,
            shape_idx: 0,
            shape,
            message: String::new(),
            message_ticks: 0,
        }
    }

    fn next_shape(&mut self) {
        self.shape_idx = (self.shape_idx + 1) % self.palette.len();
        self.shape = self.palette[self.shape_idx].clone();
    }

    fn say(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
        self.message_ticks = MESSAGE_TICKS;
    }

    fn tick_message(&mut self) {
        if self.message_ticks > 0 {
            self.message_ticks -= 1;
            if self.message_ticks == 0 { self.message.clear(); }
        }
    }

    fn view(&self) -> View<'_> {
        View { placing: self.placing, cursor: self.cursor, shape: &self.shape, message: &self.message }
    }
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut sandbox = Sandbox::new(session.player.cell);
    let tick_rate = config.timing.tick();
    let mut last_tick = Instant::now();
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }
        handle_keys(session, &mut sandbox, &mut kb, &mut pending);

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed();
            last_tick = Instant::now();
            let input = std::mem::take(&mut pending);
            let events = step::step(session, &input, dt);
            for event in &events {
                if let Some(msg) = describe(event) {
                    sandbox.say(msg);
                }
            }
            sandbox.tick_message();
        }

        renderer.render(session, &sandbox.view())?;
        std::thread::sleep(FRAME_SLEEP);
    }

    info!("sandbox closed");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Key bindings
// ══════════════════════════════════════════════════════════════

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_INTERACT: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E'), KeyCode::Enter];
const KEYS_PLACE_MODE: &[KeyCode] = &[KeyCode::Tab];
const KEYS_PLACE: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_ROTATE: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEXT_SHAPE: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

const MOVE_BINDINGS: &[(MoveDir, &[KeyCode])] = &[
    (MoveDir::Left, KEYS_LEFT),
    (MoveDir::Right, KEYS_RIGHT),
    (MoveDir::Up, KEYS_UP),
    (MoveDir::Down, KEYS_DOWN),
];

/// Turn this frame's keys into sandbox changes and the next `FrameInput`.
fn handle_keys(session: &mut Session, sb: &mut Sandbox, kb: &mut InputState, pending: &mut FrameInput) {
    if kb.any_pressed(KEYS_RESTART) {
        session.restart();
        *pending = FrameInput::default();
        sb.placing = false;
        sb.say("Level restarted");
        return;
    }
    if kb.any_pressed(KEYS_PLACE_MODE) {
        sb.placing = !sb.placing;
        sb.cursor = session.player.cell;
    }
    if kb.any_pressed(KEYS_NEXT_SHAPE) {
        sb.next_shape();
    }
    if kb.any_pressed(KEYS_ROTATE) {
        sb.shape = sb.shape.rotated_cw();
    }

    if let Some(dir) = kb.direction(MOVE_BINDINGS) {
        if sb.placing {
            let (dx, dy) = dir.delta();
            let next = sb.cursor.offset(dx, dy);
            if session.grid().is_in_bounds(next) {
                sb.cursor = next;
            }
        } else {
            pending.movement = Some(dir);
        }
    }

    if sb.placing {
        if kb.any_pressed(KEYS_PLACE) {
            pending.place = Some(Placement { origin: sb.cursor, shape: sb.shape.clone() });
        }
    } else if kb.any_pressed(KEYS_INTERACT) {
        pending.interact = true;
    }
}

fn describe(event: &GameEvent) -> Option<String> {
    let msg = match event {
        GameEvent::GateUnlocked { .. } => "The gate swings open".to_string(),
        GameEvent::GateRefused { reason, .. } => format!("Gate stays shut: {reason}"),
        GameEvent::PlayerFellReset { .. } => "You fell!".to_string(),
        GameEvent::PlayerReset => "Back to the start".to_string(),
        GameEvent::EnemyEliminated { id, .. } => format!("Enemy {id} is gone"),
        GameEvent::OccupantRelocated { kind: OccupantKind::Player, .. } => "A beam pushed you aside".to_string(),
        GameEvent::CellsToggled { cells } => format!("Lever flipped {} tile(s)", cells.len()),
        GameEvent::ShapePlaced { cells } => format!("Filled {} tile(s)", cells.len()),
        GameEvent::ShapeRejected { .. } => "Can't place that there".to_string(),
        GameEvent::BeamCapped { mirror } => format!("Beam from mirror {} never hit a wall", mirror.0),
        _ => return None,
    };
    Some(msg)
}
