use rand::Rng;

use crate::{
    CARDINAL_STEPS, EntityId, Position,
    map::{Cell, Grid, MazeMap},
    object::ObjectId,
};

/// Index of a hero inside the game (0 or 1).
pub type HeroId = EntityId;

/// What a hero can currently see of the interactive objects around it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Perception {
    /// The active key, if it is within sight.
    pub visible_key: Option<Position>,
    /// Closed cages within sight, cage A before cage B.
    pub visible_cages: Vec<Position>,
}

/// An autonomous explorer with private, partial knowledge of the maze.
///
/// A hero only learns terrain through [`Hero::update_vision`]; its move policy
/// reads that private map, never the real one.
#[derive(Debug, Clone)]
pub struct Hero {
    id: HeroId,
    name: String,
    symbol: char,
    position: Position,
    has_key: bool,
    /// The cage holding this hero, if trapped.
    trapped_in: Option<ObjectId>,
    visited: Grid<bool>,
    known_map: Grid<Option<Cell>>,
    last_move: (isize, isize),
    previous_position: Position,
    stuck_counter: u32,
    blocked_positions: Vec<Position>,
}

impl Hero {
    pub fn new(
        id: HeroId,
        name: impl Into<String>,
        symbol: char,
        start: Position,
        width: usize,
        height: usize,
    ) -> Self {
        let mut visited = Grid::new(width, height);
        if let Some(cell) = visited.get_mut(start) {
            *cell = true;
        }
        Self {
            id,
            name: name.into(),
            symbol,
            position: start,
            has_key: false,
            trapped_in: None,
            visited,
            known_map: Grid::new(width, height),
            last_move: (0, 0),
            previous_position: start,
            stuck_counter: 0,
            blocked_positions: Vec::new(),
        }
    }

    pub fn id(&self) -> HeroId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    pub fn is_trapped(&self) -> bool {
        self.trapped_in.is_some()
    }

    pub fn trapped_in(&self) -> Option<ObjectId> {
        self.trapped_in
    }

    pub fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }

    pub fn last_move(&self) -> (isize, isize) {
        self.last_move
    }

    pub fn blocked_positions(&self) -> &[Position] {
        &self.blocked_positions
    }

    pub fn has_visited(&self, position: Position) -> bool {
        self.visited.get(position).copied().unwrap_or(false)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|seen| **seen).count()
    }

    /// The hero's knowledge of a cell; `None` when never seen or off the grid.
    pub fn known_cell(&self, position: Position) -> Option<Cell> {
        self.known_map.get(position).copied().flatten()
    }

    pub fn known_map(&self) -> &Grid<Option<Cell>> {
        &self.known_map
    }

    /// Copies the 3x3 neighborhood around the hero from the real maze into
    /// its private map, clipped at the maze bounds.
    pub fn update_vision(&mut self, maze: &MazeMap) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(target) = self.position.offset(dx, dy) else {
                    continue;
                };
                if maze.is_valid_position(target) {
                    self.known_map[target] = Some(maze.cell_at(target));
                }
            }
        }
    }

    /// Whether `target` is within one cell in every direction.
    pub fn can_see(&self, target: Position) -> bool {
        self.position.chebyshev_distance(target) <= 1
    }

    /// Moves the hero, updating its movement memory and visited cells.
    ///
    /// Returning to the cell held before the last net move counts as not
    /// progressing and bumps the stuck counter.
    pub fn set_position(&mut self, new_position: Position) {
        if new_position == self.previous_position {
            self.stuck_counter += 1;
        } else {
            self.stuck_counter = 0;
            self.last_move = self.position.delta_to(new_position);
            self.previous_position = self.position;
        }
        self.position = new_position;
        if let Some(cell) = self.visited.get_mut(new_position) {
            *cell = true;
        }
    }

    /// Places the hero without touching movement memory. Used when a rescued
    /// hero is pulled onto its rescuer.
    pub(crate) fn snap_to(&mut self, position: Position) {
        self.position = position;
        if let Some(cell) = self.visited.get_mut(position) {
            *cell = true;
        }
    }

    /// Picks up the key. Acquiring it forgets every blocked position, since the
    /// key grants passage through cages. A trapped hero cannot pick anything up.
    pub fn pick_up_key(&mut self) {
        if self.is_trapped() || self.has_key {
            return;
        }
        self.has_key = true;
        self.blocked_positions.clear();
    }

    /// Spends the key on a rescue.
    pub fn consume_key(&mut self) {
        self.has_key = false;
    }

    pub fn set_trapped(&mut self, cage: Option<ObjectId>) {
        self.trapped_in = cage;
    }

    /// Remembers a position the game refused to let the hero enter.
    pub fn notify_blocked_move(&mut self, position: Position) {
        if !self.blocked_positions.contains(&position) {
            self.blocked_positions.push(position);
        }
    }

    pub fn is_blocked(&self, position: Position) -> bool {
        self.blocked_positions.contains(&position)
    }

    /// True once the hero has failed to progress twice and `target` would
    /// repeat its last displacement.
    pub fn is_repeating_move(&self, target: Position) -> bool {
        self.stuck_counter >= 2 && self.position.delta_to(target) == self.last_move
    }

    /// Axis neighbours the hero knows to be open, in up/right/down/left order.
    pub fn valid_moves(&self) -> Vec<Position> {
        CARDINAL_STEPS
            .iter()
            .filter_map(|&(dx, dy)| self.position.offset(dx, dy))
            .filter(|&target| self.known_cell(target) == Some(Cell::Open))
            .collect()
    }

    /// The valid move that minimises the Manhattan distance to `target`; the
    /// first candidate wins ties. Stays put when boxed in.
    fn move_toward(&self, target: Position) -> Position {
        self.valid_moves()
            .into_iter()
            .min_by_key(|candidate| candidate.manhattan_distance(target))
            .unwrap_or(self.position)
    }

    fn explore<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let valid = self.valid_moves();
        let fresh: Vec<Position> = valid
            .iter()
            .copied()
            .filter(|&m| !self.is_repeating_move(m) && !self.is_blocked(m))
            .collect();
        let unvisited: Vec<Position> = fresh
            .iter()
            .copied()
            .filter(|&m| !self.has_visited(m))
            .collect();

        choose(rng, &unvisited)
            .or_else(|| choose(rng, &fresh))
            .or_else(|| choose(rng, &valid))
            .unwrap_or(self.position)
    }

    /// Picks the next cell to move to.
    ///
    /// In priority order: step toward a visible key while keyless, step toward
    /// the first visible cage while holding the key, otherwise explore,
    /// preferring unvisited cells. A trapped hero always stays put.
    pub fn decide_next_move<R: Rng + ?Sized>(
        &self,
        perception: &Perception,
        rng: &mut R,
    ) -> Position {
        if self.is_trapped() {
            return self.position;
        }

        if !self.has_key {
            if let Some(key) = perception.visible_key.filter(|&k| self.can_see(k)) {
                let step = self.move_toward(key);
                if !self.is_repeating_move(step) && !self.is_blocked(step) {
                    return step;
                }
            }
        }

        if self.has_key {
            if let Some(&cage) = perception.visible_cages.first() {
                let step = self.move_toward(cage);
                if !self.is_repeating_move(step) {
                    return step;
                }
            }
        }

        self.explore(rng)
    }
}

fn choose<R: Rng + ?Sized>(rng: &mut R, moves: &[Position]) -> Option<Position> {
    if moves.is_empty() {
        None
    } else {
        Some(moves[rng.random_range(0..moves.len())])
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    // Row 1 is an open corridor from x=1 to x=8.
    const CORRIDOR: &str = "**********\n*       L*\n**********";

    fn corridor() -> MazeMap {
        MazeMap::parse(CORRIDOR).expect("maze")
    }

    fn hero_at(maze: &MazeMap, x: usize, y: usize) -> Hero {
        let mut hero = Hero::new(0, "Tester", 'H', Position::new(x, y), maze.width(), maze.height());
        hero.update_vision(maze);
        hero
    }

    #[test]
    fn vision_fills_neighbourhood_only() {
        let maze = corridor();
        let hero = hero_at(&maze, 1, 1);
        assert_eq!(hero.known_cell(Position::new(0, 0)), Some(Cell::Wall));
        assert_eq!(hero.known_cell(Position::new(2, 1)), Some(Cell::Open));
        assert_eq!(hero.known_cell(Position::new(3, 1)), None);
        assert_eq!(hero.known_cell(Position::new(40, 1)), None);
    }

    #[test]
    fn vision_is_clipped_at_bounds() {
        let maze = corridor();
        let hero = hero_at(&maze, 0, 0);
        assert_eq!(hero.known_cell(Position::new(1, 1)), Some(Cell::Open));
        assert_eq!(
            hero.known_map().iter().filter(|cell| cell.is_some()).count(),
            4
        );
    }

    #[test]
    fn can_see_uses_chebyshev_distance() {
        let maze = corridor();
        let hero = hero_at(&maze, 3, 1);
        assert!(hero.can_see(Position::new(4, 2)));
        assert!(hero.can_see(Position::new(3, 1)));
        assert!(!hero.can_see(Position::new(5, 1)));
    }

    #[test]
    fn oscillation_bumps_stuck_counter() {
        let maze = corridor();
        let mut hero = hero_at(&maze, 3, 1);
        hero.set_position(Position::new(4, 1));
        assert_eq!(hero.stuck_counter(), 0);
        assert_eq!(hero.last_move(), (1, 0));

        hero.set_position(Position::new(3, 1));
        assert_eq!(hero.stuck_counter(), 1);
        hero.set_position(Position::new(3, 1));
        assert_eq!(hero.stuck_counter(), 2);

        // Repeating the remembered displacement is now suppressed.
        assert!(hero.is_repeating_move(Position::new(4, 1)));
        assert!(!hero.is_repeating_move(Position::new(2, 1)));

        hero.set_position(Position::new(2, 1));
        assert_eq!(hero.stuck_counter(), 0);
        assert!(!hero.is_repeating_move(Position::new(1, 1)));
    }

    #[test]
    fn blocked_positions_are_deduplicated_and_cleared_by_key() {
        let maze = corridor();
        let mut hero = hero_at(&maze, 3, 1);
        hero.notify_blocked_move(Position::new(4, 1));
        hero.notify_blocked_move(Position::new(4, 1));
        assert_eq!(hero.blocked_positions(), &[Position::new(4, 1)]);

        hero.pick_up_key();
        assert!(hero.has_key());
        assert!(hero.blocked_positions().is_empty());
    }

    #[test]
    fn trapped_hero_cannot_take_key_or_move() {
        let maze = corridor();
        let mut rng = StdRng::seed_from_u64(7);
        let mut hero = hero_at(&maze, 3, 1);
        hero.set_trapped(Some(1));
        hero.pick_up_key();
        assert!(!hero.has_key());

        let perception = Perception {
            visible_key: Some(Position::new(4, 1)),
            visible_cages: Vec::new(),
        };
        assert_eq!(
            hero.decide_next_move(&perception, &mut rng),
            Position::new(3, 1)
        );
    }

    #[test]
    fn visible_key_is_approached() {
        let maze = corridor();
        let mut rng = StdRng::seed_from_u64(1);
        let hero = hero_at(&maze, 3, 1);
        let perception = Perception {
            visible_key: Some(Position::new(2, 1)),
            visible_cages: Vec::new(),
        };
        assert_eq!(
            hero.decide_next_move(&perception, &mut rng),
            Position::new(2, 1)
        );
    }

    #[test]
    fn blocked_key_step_falls_back_to_exploring() {
        let maze = corridor();
        let mut rng = StdRng::seed_from_u64(3);
        let mut hero = hero_at(&maze, 3, 1);
        hero.notify_blocked_move(Position::new(2, 1));
        let perception = Perception {
            visible_key: Some(Position::new(2, 1)),
            visible_cages: Vec::new(),
        };
        assert_eq!(
            hero.decide_next_move(&perception, &mut rng),
            Position::new(4, 1)
        );
    }

    #[test]
    fn key_holder_heads_for_first_visible_cage() {
        let maze = corridor();
        let mut rng = StdRng::seed_from_u64(5);
        let mut hero = hero_at(&maze, 4, 1);
        hero.pick_up_key();
        let perception = Perception {
            visible_key: None,
            visible_cages: vec![Position::new(5, 1), Position::new(3, 1)],
        };
        assert_eq!(
            hero.decide_next_move(&perception, &mut rng),
            Position::new(5, 1)
        );
    }

    #[test]
    fn exploration_prefers_unvisited_cells() {
        let maze = corridor();
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut hero = hero_at(&maze, 3, 1);
            hero.set_position(Position::new(4, 1));
            hero.update_vision(&maze);
            // (3, 1) is visited, (5, 1) is not.
            assert_eq!(
                hero.decide_next_move(&Perception::default(), &mut rng),
                Position::new(5, 1)
            );
        }
    }

    #[test]
    fn boxed_in_hero_stays_put() {
        let maze = MazeMap::parse("***\n* *\n*L*\n***").expect("maze");
        let mut hero = hero_at(&maze, 1, 2);
        hero.set_position(Position::new(1, 1));
        let mut rng = StdRng::seed_from_u64(9);

        let walled = MazeMap::parse("***\n* *\n***\n*L*").expect("maze");
        let boxed = hero_at(&walled, 1, 1);
        assert_eq!(
            boxed.decide_next_move(&Perception::default(), &mut rng),
            Position::new(1, 1)
        );

        // The only way out is already visited but still taken.
        hero.update_vision(&maze);
        assert_eq!(
            hero.decide_next_move(&Perception::default(), &mut rng),
            Position::new(1, 2)
        );
    }
}
