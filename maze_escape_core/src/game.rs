use std::{fmt, time::Duration};

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    agent::{Hero, HeroId, Perception},
    config::GameConfig,
    error::GameError,
    events::{
        GameEvent, GameObserver, HeroSnapshot, ObjectSnapshot, PhaseAnnouncement, TurnSnapshot,
    },
    map::MazeMap,
    object::{InteractiveObject, ObjectId, ObjectKind},
};

/// Stage of the simulation. Rendezvous is instantaneous and folded into the
/// turn that detects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Exploring,
    WallDissolving,
    GuidedToExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossReason {
    TurnLimit,
    BothTrapped,
    /// One hero is caged, the other has no key and the key is gone for good.
    KeyUnobtainable,
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossReason::TurnLimit => write!(f, "the heroes ran out of time"),
            LossReason::BothTrapped => write!(f, "both heroes are trapped"),
            LossReason::KeyUnobtainable => {
                write!(f, "a hero is trapped and the key can no longer be found")
            }
        }
    }
}

/// Terminal result of a game. An aborted run has no outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost(LossReason),
}

impl Outcome {
    pub fn is_won(self) -> bool {
        matches!(self, Outcome::Won)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Won => write!(f, "won"),
            Outcome::Lost(reason) => write!(f, "lost: {reason}"),
        }
    }
}

/// Starting positions of the heroes and objects.
///
/// The first trap becomes cage A, the second cage B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub heroes: [Position; 2],
    pub key: Option<Position>,
    pub traps: Vec<Position>,
}

impl Layout {
    /// Draws a random layout on the free interior cells of `maze`.
    ///
    /// The heroes start at least `min_hero_separation` apart on some axis; the
    /// key and two traps go on distinct remaining cells.
    pub fn random<R: Rng + ?Sized>(
        maze: &MazeMap,
        config: &GameConfig,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let mut free = maze.interior_free_positions();
        if free.len() < config.min_free_cells {
            return Err(GameError::NotEnoughFreeCells {
                found: free.len(),
                required: config.min_free_cells,
            });
        }
        free.shuffle(rng);

        let separation = config.min_hero_separation;
        let mut heroes = None;
        for _ in 0..config.placement_attempts {
            let a = rng.random_range(0..free.len());
            let b = rng.random_range(0..free.len());
            if a == b {
                continue;
            }
            let (first, second) = (free[a], free[b]);
            if first.x.abs_diff(second.x) >= separation || first.y.abs_diff(second.y) >= separation
            {
                free.remove(a.max(b));
                free.remove(a.min(b));
                heroes = Some([first, second]);
                break;
            }
        }
        let heroes = heroes.ok_or(GameError::HeroPlacement {
            separation,
            attempts: config.placement_attempts,
        })?;

        let key = free.remove(rng.random_range(0..free.len()));
        let traps = (0..MAX_TRAPS)
            .map(|_| free.remove(rng.random_range(0..free.len())))
            .collect();

        Ok(Layout {
            heroes,
            key: Some(key),
            traps,
        })
    }
}

/// Traps per game: cage A and cage B.
pub const MAX_TRAPS: usize = 2;

/// The simulation controller.
///
/// Owns the maze, both heroes and every interactive object, drives the turn
/// loop and reports to its observer.
pub struct Game<R, O> {
    config: GameConfig,
    maze: MazeMap,
    heroes: [Hero; 2],
    objects: Vec<InteractiveObject>,
    key: Option<ObjectId>,
    traps: Vec<ObjectId>,
    exit: ObjectId,
    phase: Phase,
    turns: u32,
    outcome: Option<Outcome>,
    heroes_found: bool,
    walls_to_remove: Vec<Position>,
    walls_removed: usize,
    rng: R,
    observer: O,
}

fn spawn(objects: &mut Vec<InteractiveObject>, position: Position, kind: ObjectKind) -> ObjectId {
    objects.push(InteractiveObject::new(position, kind));
    objects.len() - 1
}

impl<R: Rng, O: GameObserver> Game<R, O> {
    /// Creates a game with a random layout drawn from `rng`.
    pub fn new(
        maze: MazeMap,
        config: GameConfig,
        mut rng: R,
        observer: O,
    ) -> Result<Self, GameError> {
        let layout = Layout::random(&maze, &config, &mut rng)?;
        Self::with_layout(maze, layout, config, rng, observer)
    }

    /// Creates a game from an explicit layout.
    ///
    /// Every position must be an open cell of `maze`, there are at most
    /// [`MAX_TRAPS`] traps, and the key, the traps and the exit each get a cell
    /// of their own. Heroes may start on an object.
    pub fn with_layout(
        maze: MazeMap,
        layout: Layout,
        config: GameConfig,
        rng: R,
        observer: O,
    ) -> Result<Self, GameError> {
        config.validate()?;
        if let Some(&position) = layout.traps.get(MAX_TRAPS) {
            return Err(GameError::InvalidLayout {
                what: "a third trap",
                position,
                reason: "only two cages exist",
            });
        }

        let check = |what: &'static str, position: Position| {
            if maze.is_open(position) {
                Ok(())
            } else {
                Err(GameError::InvalidLayout {
                    what,
                    position,
                    reason: "not an open cell",
                })
            }
        };
        check("the first hero", layout.heroes[0])?;
        check("the second hero", layout.heroes[1])?;

        let mut occupied = vec![maze.exit()];
        let placements = layout
            .key
            .map(|key| ("the key", key))
            .into_iter()
            .chain(layout.traps.iter().map(|&trap| ("a trap", trap)));
        for (what, position) in placements {
            check(what, position)?;
            if occupied.contains(&position) {
                return Err(GameError::InvalidLayout {
                    what,
                    position,
                    reason: "another object is already there",
                });
            }
            occupied.push(position);
        }

        let mut objects = Vec::new();
        let exit = spawn(&mut objects, maze.exit(), ObjectKind::Exit);
        let key = layout
            .key
            .map(|position| spawn(&mut objects, position, ObjectKind::Key));
        let traps = layout
            .traps
            .iter()
            .map(|&position| spawn(&mut objects, position, ObjectKind::Trap))
            .collect();

        let (width, height) = (maze.width(), maze.height());
        let [first, second] = layout.heroes;
        let [first_name, second_name] = config.hero_names.clone();
        let [first_symbol, second_symbol] = config.hero_symbols;
        let mut heroes = [
            Hero::new(0, first_name, first_symbol, first, width, height),
            Hero::new(1, second_name, second_symbol, second, width, height),
        ];
        for hero in &mut heroes {
            hero.update_vision(&maze);
        }

        tracing::info!(
            width,
            height,
            exit = %maze.exit(),
            first = %first,
            second = %second,
            key = ?layout.key,
            traps = ?layout.traps,
            "Game initialised"
        );

        Ok(Self {
            config,
            maze,
            heroes,
            objects,
            key,
            traps,
            exit,
            phase: Phase::Exploring,
            turns: 0,
            outcome: None,
            heroes_found: false,
            walls_to_remove: Vec::new(),
            walls_removed: 0,
            rng,
            observer,
        })
    }

    /// Advances the simulation by exactly one turn.
    ///
    /// Returns the outcome once the game is over; stepping a finished game
    /// changes nothing.
    pub fn step(&mut self) -> Option<Outcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        self.turns += 1;

        match self.phase {
            Phase::Exploring => {
                self.process_hero_turn(0);
                self.process_hero_turn(1);
            }
            Phase::WallDissolving => self.update_wall_dissolving(),
            Phase::GuidedToExit => self.move_heroes_to_exit(),
        }

        self.check_game_conditions();

        let snapshot = self.snapshot();
        self.emit(GameEvent::Turn(snapshot));
        if let Some(outcome) = self.outcome {
            self.emit(GameEvent::Finished(outcome));
        }
        self.outcome
    }

    /// Steps until the game ends or `quit_requested` returns true between two
    /// turns. An aborted run returns `None`.
    pub fn run(&mut self, mut quit_requested: impl FnMut(&Self) -> bool) -> Option<Outcome> {
        loop {
            if let Some(outcome) = self.outcome {
                return Some(outcome);
            }
            if quit_requested(self) {
                tracing::info!(turns = self.turns, "Quit requested");
                return None;
            }
            self.step();
        }
    }

    fn process_hero_turn(&mut self, id: HeroId) {
        if self.heroes[id].is_trapped() {
            return;
        }

        self.heroes[id].update_vision(&self.maze);
        let perception = self.perception_for(id);
        let target = self.heroes[id].decide_next_move(&perception, &mut self.rng);

        if self.can_enter(id, target) {
            self.heroes[id].set_position(target);
            tracing::debug!(hero = self.heroes[id].name(), to = %target, "Hero moved");
            self.resolve_collisions(id);
        } else {
            self.heroes[id].notify_blocked_move(target);
            tracing::debug!(hero = self.heroes[id].name(), target = %target, "Move blocked");
            self.emit(GameEvent::BlockedMove { hero: id, target });
        }
    }

    fn perception_for(&self, id: HeroId) -> Perception {
        let hero = &self.heroes[id];
        let visible_key = self
            .key_object()
            .filter(|key| key.is_active() && hero.can_see(key.position()))
            .map(InteractiveObject::position);
        let visible_cages = self
            .traps
            .iter()
            .map(|&cage| &self.objects[cage])
            .filter(|cage| cage.is_closed_cage() && hero.can_see(cage.position()))
            .map(InteractiveObject::position)
            .collect();
        Perception {
            visible_key,
            visible_cages,
        }
    }

    /// Open terrain that is not a closed cage, unless the hero holds the key.
    fn can_enter(&self, id: HeroId, target: Position) -> bool {
        self.maze.is_open(target)
            && (self.heroes[id].has_key() || !self.is_closed_cage_at(target))
    }

    fn is_closed_cage_at(&self, position: Position) -> bool {
        self.traps.iter().any(|&cage| {
            let cage = &self.objects[cage];
            cage.is_closed_cage() && cage.is_at(position)
        })
    }

    fn resolve_collisions(&mut self, id: HeroId) {
        let here = self.heroes[id].position();

        if let Some(key_id) = self.key {
            if self.objects[key_id].is_active() && self.objects[key_id].is_at(here) {
                self.heroes[id].pick_up_key();
                self.objects[key_id].set_active(false);
                tracing::debug!(hero = self.heroes[id].name(), at = %here, "Key picked up");
                self.emit(GameEvent::KeyPickedUp {
                    hero: id,
                    position: here,
                });
            }
        }

        for index in 0..self.traps.len() {
            let trap_id = self.traps[index];
            if self.objects[trap_id].is_armed_trap() && self.objects[trap_id].is_at(here) {
                self.objects[trap_id].trigger_trap();
                self.heroes[id].set_trapped(Some(trap_id));
                tracing::debug!(hero = self.heroes[id].name(), at = %here, "Trap sprung");
                self.emit(GameEvent::HeroTrapped {
                    hero: id,
                    cage: trap_id,
                    position: here,
                });
            }
        }

        self.try_rescue(id);
    }

    /// Frees the other hero when the key holder stands in the very cage that
    /// holds them. The key is spent.
    fn try_rescue(&mut self, rescuer_id: HeroId) {
        let rescued_id = 1 - rescuer_id;
        let rescuer = &self.heroes[rescuer_id];
        if !rescuer.has_key() || rescuer.is_trapped() {
            return;
        }
        let Some(cage_id) = self.heroes[rescued_id].trapped_in() else {
            return;
        };
        let here = rescuer.position();
        let cage = &self.objects[cage_id];
        if !cage.is_closed_cage()
            || !cage.is_at(here)
            || self.heroes[rescued_id].position() != here
        {
            return;
        }

        self.objects[cage_id].set_active(false);
        self.objects[cage_id].set_visible(false);
        let [first, second] = &mut self.heroes;
        let (rescuer, rescued) = if rescuer_id == 0 {
            (first, second)
        } else {
            (second, first)
        };
        rescued.set_trapped(None);
        rescued.snap_to(here);
        rescuer.consume_key();
        tracing::info!(
            rescuer = rescuer.name(),
            rescued = rescued.name(),
            at = %here,
            "Hero rescued"
        );
        self.emit(GameEvent::HeroRescued {
            rescuer: rescuer_id,
            rescued: rescued_id,
            position: here,
        });

        if !self.heroes_found && self.heroes_reunited() {
            self.start_rendezvous();
        }
    }

    fn heroes_reunited(&self) -> bool {
        let [first, second] = &self.heroes;
        !first.is_trapped() && !second.is_trapped() && first.position() == second.position()
    }

    fn start_rendezvous(&mut self) {
        self.heroes_found = true;
        tracing::info!(
            turn = self.turns,
            at = %self.heroes[0].position(),
            "Heroes found each other"
        );
        self.emit(GameEvent::PhaseEntered(PhaseAnnouncement::RendezvousFound));

        self.walls_to_remove = self.maze.wall_positions();
        self.walls_removed = 0;
        self.phase = Phase::WallDissolving;
        let total = self.walls_to_remove.len();
        tracing::info!(total, "Walls disappearing");
        self.emit(GameEvent::PhaseEntered(PhaseAnnouncement::WallsDissolving {
            total,
        }));
    }

    /// Removes one wall from the snapshot per turn; the turn after the last
    /// removal switches to the guided phase.
    fn update_wall_dissolving(&mut self) {
        let total = self.walls_to_remove.len();
        match self.walls_to_remove.get(self.walls_removed).copied() {
            Some(position) => {
                self.maze.remove_wall(position);
                self.walls_removed += 1;
                tracing::trace!(%position, removed = self.walls_removed, total, "Wall disappeared");
                self.emit(GameEvent::WallRemoved {
                    position,
                    removed: self.walls_removed,
                    total,
                });
            }
            None => {
                self.phase = Phase::GuidedToExit;
                tracing::info!(turn = self.turns, "Heroes moving to the exit");
                self.emit(GameEvent::PhaseEntered(PhaseAnnouncement::MovingToExit));
            }
        }
    }

    /// A hero already on the exit is set onto it again, which only feeds its
    /// movement memory.
    fn move_heroes_to_exit(&mut self) {
        let exit = self.maze.exit();
        for hero in &mut self.heroes {
            let next = hero.position().step_toward(exit);
            hero.set_position(next);
        }
    }

    fn check_game_conditions(&mut self) {
        if self.outcome.is_some() {
            return;
        }

        let exit = self.maze.exit();
        if self.heroes_found
            && self.phase == Phase::GuidedToExit
            && self.heroes.iter().all(|hero| hero.position() == exit)
        {
            self.finish(Outcome::Won);
            return;
        }

        if !self.heroes_found && self.heroes_reunited() {
            self.start_rendezvous();
            return;
        }

        if self.turns >= self.config.turn_limit {
            self.finish(Outcome::Lost(LossReason::TurnLimit));
            return;
        }

        let [first, second] = &self.heroes;
        if first.is_trapped() && second.is_trapped() {
            self.finish(Outcome::Lost(LossReason::BothTrapped));
            return;
        }

        let stranded = (first.is_trapped() && !second.has_key())
            || (second.is_trapped() && !first.has_key());
        let key_gone = self.key_object().is_none_or(|key| !key.is_active());
        if stranded && key_gone {
            self.finish(Outcome::Lost(LossReason::KeyUnobtainable));
        }
    }

    /// Records the terminal outcome. The first one wins.
    fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        tracing::info!(turns = self.turns, %outcome, "Game over");
    }

    fn emit(&mut self, event: GameEvent) {
        self.observer.on_event(&event);
    }
}

impl<R, O> Game<R, O> {
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn maze(&self) -> &MazeMap {
        &self.maze
    }

    pub fn heroes(&self) -> &[Hero; 2] {
        &self.heroes
    }

    pub fn hero(&self, id: HeroId) -> Option<&Hero> {
        self.heroes.get(id)
    }

    pub fn objects(&self) -> &[InteractiveObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&InteractiveObject> {
        self.objects.get(id)
    }

    pub fn key_object(&self) -> Option<&InteractiveObject> {
        self.key.map(|id| &self.objects[id])
    }

    /// Traps in placement order; each becomes a cage once sprung.
    pub fn cages(&self) -> impl Iterator<Item = &InteractiveObject> {
        self.traps.iter().map(|&id| &self.objects[id])
    }

    pub fn exit_object(&self) -> &InteractiveObject {
        &self.objects[self.exit]
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn heroes_found(&self) -> bool {
        self.heroes_found
    }

    /// Walls removed so far and the size of the removal snapshot.
    pub fn wall_removal_progress(&self) -> (usize, usize) {
        (self.walls_removed, self.walls_to_remove.len())
    }

    pub fn walls_to_remove(&self) -> &[Position] {
        &self.walls_to_remove
    }

    /// Presentation delay before the next turn.
    pub fn frame_delay(&self) -> Duration {
        self.config.frame_delay(self.phase)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        let [first, second] = &self.heroes;
        TurnSnapshot {
            turn: self.turns,
            phase: self.phase,
            heroes: [HeroSnapshot::from(first), HeroSnapshot::from(second)],
            objects: self
                .objects
                .iter()
                .enumerate()
                .map(|(id, object)| ObjectSnapshot::new(id, object))
                .collect(),
        }
    }
}
