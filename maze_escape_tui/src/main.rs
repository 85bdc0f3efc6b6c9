use anyhow::{Context, Result};
use clap::Parser;
use maze_escape_core::{
    Game, GameConfig, Outcome, Phase,
    events::{EventLog, GameEvent, PhaseAnnouncement, TracingObserver},
    map::{Cell, MazeMap},
};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::VecDeque,
    fs::{self, File},
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EVENT_LOG_CAPACITY: usize = 8;
const WIN_BANNER: &str = "Congratulations! The heroes saved the kingdom!";
const LOSE_BANNER: &str = "Game Over! The kingdom has fallen...";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE", default_value = "maps/map01.txt")]
    map: PathBuf,
    /// Seed for placement and tie-breaking; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,
    /// Turn at which the game is lost
    #[arg(long)]
    turn_limit: Option<u32>,
    /// Run without the terminal UI, logging events to stderr
    #[arg(long)]
    headless: bool,
    /// Write logs to this file
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

type MazeGame = Game<StdRng, EventLog>;

struct App {
    /// The core simulation.
    game: MazeGame,
    /// Most recent human-readable events, newest last.
    log: VecDeque<String>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(game: MazeGame) -> Self {
        App {
            game,
            log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.game.is_over() {
            return;
        }
        self.game.step();
        for event in self.game.observer_mut().drain() {
            if let Some(line) = describe(&event, &self.game) {
                if self.log.len() == EVENT_LOG_CAPACITY {
                    self.log.pop_front();
                }
                self.log.push_back(line);
            }
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn hero_name(game: &MazeGame, id: usize) -> &str {
    game.hero(id).map_or("?", |hero| hero.name())
}

fn describe(event: &GameEvent, game: &MazeGame) -> Option<String> {
    let line = match event {
        GameEvent::KeyPickedUp { hero, position } => {
            format!("{} picked up the key at {}", hero_name(game, *hero), position)
        }
        GameEvent::HeroTrapped { hero, position, .. } => {
            format!("{} fell into a trap at {}", hero_name(game, *hero), position)
        }
        GameEvent::HeroRescued {
            rescuer,
            rescued,
            position,
        } => format!(
            "{} freed {} at {}",
            hero_name(game, *rescuer),
            hero_name(game, *rescued),
            position
        ),
        GameEvent::BlockedMove { hero, target } => {
            format!("{} cannot enter {}", hero_name(game, *hero), target)
        }
        GameEvent::PhaseEntered(PhaseAnnouncement::RendezvousFound) => {
            "The heroes found each other!".to_string()
        }
        GameEvent::PhaseEntered(PhaseAnnouncement::WallsDissolving { total }) => {
            format!("Walls disappearing... Total walls: {total}")
        }
        GameEvent::PhaseEntered(PhaseAnnouncement::MovingToExit) => {
            "Moving to the ladder...".to_string()
        }
        GameEvent::WallRemoved {
            position,
            removed,
            total,
        } => format!("Wall disappeared at {position} - {removed}/{total}"),
        GameEvent::Finished(outcome) => format!("Game {outcome}"),
        GameEvent::Turn(_) => return None,
    };
    Some(line)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(&args)?;

    let source = fs::read_to_string(&args.map)
        .with_context(|| format!("Cannot open maze file: {}", args.map.display()))?;
    let maze = MazeMap::parse(&source)
        .with_context(|| format!("Invalid maze file: {}", args.map.display()))?;

    let mut config = GameConfig::default();
    if let Some(turn_limit) = args.turn_limit {
        config.turn_limit = turn_limit;
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, map = %args.map.display(), "Starting game");
    let rng = StdRng::seed_from_u64(seed);

    let (outcome, turns) = if args.headless {
        let mut game = Game::new(maze, config, rng, TracingObserver)?;
        let outcome = game.run(|_| false);
        (outcome, game.turns())
    } else {
        let game = Game::new(maze, config, rng, EventLog::new())?;
        let mut app = App::new(game);

        // Set up the terminal
        let mut terminal = setup_terminal()?;
        let result = run_app(&mut terminal, &mut app);
        // Restore the terminal state even if the loop failed
        restore_terminal(&mut terminal)?;
        result?;

        (app.game.outcome(), app.game.turns())
    };

    match outcome {
        Some(Outcome::Won) => println!("\n{WIN_BANNER}"),
        Some(Outcome::Lost(reason)) => println!("\n{LOSE_BANNER} ({reason})"),
        None => println!("\nGame aborted after {turns} turns."),
    }
    Ok(())
}

/// Installs the global tracing subscriber.
///
/// The TUI owns the terminal, so interactive runs only log when a log file is
/// given; headless runs log to stderr.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("maze_escape_core=info,maze_escape_tui=info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Cannot create log file: {}", path.display()))?;
        let subscriber = builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("setting default subscriber failed")?;
    } else if args.headless {
        let subscriber = builder.with_writer(io::stderr).finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("setting default subscriber failed")?;
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
///
/// One simulation turn per frame; the frame delay depends on the phase. Quit
/// is only honoured between turns.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let tick_rate = app.game.frame_delay();
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Once the game is decided any key dismisses the banner.
                    if app.game.is_over() {
                        app.quit();
                    } else if matches!(
                        key.code,
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
                    ) {
                        app.quit();
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),                                // Maze
            Constraint::Length(6),                             // Status
            Constraint::Length(EVENT_LOG_CAPACITY as u16 + 2), // Events
            Constraint::Length(2),                             // Help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.game);
    render_status(frame, main_layout[1], &app.game);
    render_events(frame, main_layout[2], &app.log);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[3]);

    if let Some(outcome) = app.game.outcome() {
        render_banner(frame, main_layout[0], outcome);
    }
}

/// Renders the maze, objects and heroes.
fn render_map(frame: &mut Frame, area: Rect, game: &MazeGame) {
    let maze = game.maze();
    let mut lines: Vec<Line> = Vec::with_capacity(maze.height());

    for y in 0..maze.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(maze.width());
        for x in 0..maze.width() {
            spans.push(glyph_at(game, maze_escape_core::Position::new(x, y)));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Maze Escape").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Picks the glyph for one cell: untrapped heroes over cages and traps, over
/// the key, over the exit, over terrain.
fn glyph_at(game: &MazeGame, position: maze_escape_core::Position) -> Span<'static> {
    if let Some(hero) = game
        .heroes()
        .iter()
        .find(|hero| !hero.is_trapped() && hero.position() == position)
    {
        return Span::styled(
            hero.symbol().to_string(),
            Style::default().fg(Color::Red).bold(),
        );
    }

    // Armed traps are hidden from the heroes but shown to the viewer.
    if let Some(cage) = game
        .cages()
        .find(|cage| cage.is_at(position) && (cage.is_visible() || cage.is_armed_trap()))
    {
        return Span::styled(
            cage.symbol().to_string(),
            Style::default().fg(Color::Magenta),
        );
    }

    if let Some(key) = game
        .key_object()
        .filter(|key| key.is_active() && key.is_at(position))
    {
        return Span::styled(key.symbol().to_string(), Style::default().fg(Color::Yellow));
    }

    let exit = game.exit_object();
    if exit.is_at(position) {
        return Span::styled(
            exit.symbol().to_string(),
            Style::default().fg(Color::Green).bold(),
        );
    }

    match game.maze().cell_at(position) {
        Cell::Wall => Span::styled("*", Style::default().fg(Color::DarkGray)),
        Cell::Open => Span::raw(" "),
    }
}

/// Renders turn counter, phase announcement and per-hero state.
fn render_status(frame: &mut Frame, area: Rect, game: &MazeGame) {
    let announcement = match game.phase() {
        Phase::Exploring => "Searching for each other...".to_string(),
        Phase::WallDissolving => {
            let (removed, total) = game.wall_removal_progress();
            format!("Heroes found! Walls disappearing... {removed}/{total}")
        }
        Phase::GuidedToExit => "Moving to the ladder...".to_string(),
    };

    let mut lines = vec![
        Line::from(format!(
            "Turn: {}/{}",
            game.turns(),
            game.config().turn_limit
        )),
        Line::styled(announcement, Style::default().fg(Color::Cyan)),
    ];
    for hero in game.heroes() {
        let state = if hero.is_trapped() { "caged" } else { "free" };
        lines.push(Line::from(format!(
            "{} ({}) at {} | key: {} | {} | visited: {}",
            hero.name(),
            hero.symbol(),
            hero.position(),
            if hero.has_key() { "yes" } else { "no" },
            state,
            hero.visited_count()
        )));
    }

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

fn render_events(frame: &mut Frame, area: Rect, log: &VecDeque<String>) {
    let items: Vec<ListItem> = log
        .iter()
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Events"));
    frame.render_widget(list, area);
}

fn render_banner(frame: &mut Frame, area: Rect, outcome: Outcome) {
    let (headline, detail, color) = match outcome {
        Outcome::Won => (WIN_BANNER, String::new(), Color::Green),
        Outcome::Lost(reason) => (LOSE_BANNER, reason.to_string(), Color::Red),
    };
    let text = vec![
        Line::styled(headline, Style::default().fg(color).bold()),
        Line::from(detail),
        Line::from("Press any key to exit..."),
    ];

    let popup = centered(area, 54, 5);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        popup,
    );
}

/// A `width` x `height` rectangle centred in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
