use maze_escape_core::{
    Game, GameConfig, Layout, LossReason, Outcome, Phase, Position,
    events::{EventLog, GameEvent, NullObserver, PhaseAnnouncement},
    map::MazeMap,
};
use rand::{SeedableRng, rngs::StdRng};

const MAZE: &str = include_str!("../../maps/map01.txt");

// Row 1 is an open corridor from x=1 to x=8 with the exit at its east end.
const CORRIDOR: &str = "**********\n*       L*\n**********";

fn scripted(map: &str, layout: Layout) -> Game<StdRng, EventLog> {
    let maze = MazeMap::parse(map).expect("maze");
    Game::with_layout(
        maze,
        layout,
        GameConfig::default(),
        StdRng::seed_from_u64(42),
        EventLog::new(),
    )
    .expect("game")
}

#[test]
fn exploration_never_forgets_and_never_enters_walls() {
    for seed in 0..8 {
        let maze = MazeMap::parse(MAZE).expect("maze");
        let mut game = Game::new(
            maze,
            GameConfig::default(),
            StdRng::seed_from_u64(seed),
            NullObserver,
        )
        .expect("game");

        let [a, b] = game.heroes();
        let start_a = a.position();
        let start_b = b.position();
        assert!(start_a.x.abs_diff(start_b.x) >= 7 || start_a.y.abs_diff(start_b.y) >= 7);

        let mut visited = [a.visited_count(), b.visited_count()];
        let mut turns = 0;
        while !game.is_over() && turns < 300 {
            game.step();
            turns += 1;
            assert_eq!(game.turns(), turns);

            for (id, hero) in game.heroes().iter().enumerate() {
                assert!(
                    game.maze().is_open(hero.position()),
                    "seed {seed}: {} stands in a wall at {}",
                    hero.name(),
                    hero.position()
                );
                assert!(hero.visited_count() >= visited[id]);
                visited[id] = hero.visited_count();
            }
        }
    }
}

#[test]
fn random_games_always_terminate() {
    for seed in 0..4 {
        let maze = MazeMap::parse(MAZE).expect("maze");
        let mut game = Game::new(
            maze,
            GameConfig::default(),
            StdRng::seed_from_u64(seed),
            NullObserver,
        )
        .expect("game");

        let outcome = game.run(|_| false).expect("run was not aborted");
        assert!(game.turns() <= 1000);
        match outcome {
            Outcome::Won => {
                let exit = game.maze().exit();
                assert!(game.heroes().iter().all(|hero| hero.position() == exit));
                assert!(game.heroes_found());
            }
            Outcome::Lost(LossReason::TurnLimit) => assert_eq!(game.turns(), 1000),
            Outcome::Lost(LossReason::BothTrapped) => {
                assert!(game.heroes().iter().all(|hero| hero.is_trapped()));
            }
            Outcome::Lost(LossReason::KeyUnobtainable) => {
                assert!(game.heroes().iter().any(|hero| hero.is_trapped()));
                assert!(!game.key_object().expect("key").is_active());
            }
        }
    }
}

#[test]
fn picking_up_the_key_deactivates_it() {
    let mut game = scripted(
        CORRIDOR,
        Layout {
            heroes: [Position::new(1, 1), Position::new(7, 1)],
            key: Some(Position::new(2, 1)),
            traps: Vec::new(),
        },
    );

    game.step();

    let [hero, other] = game.heroes();
    assert_eq!(hero.position(), Position::new(2, 1));
    assert!(hero.has_key());
    assert!(!other.has_key());
    let key = game.key_object().expect("key");
    assert!(!key.is_active());
    assert!(game.observer().events().contains(&GameEvent::KeyPickedUp {
        hero: 0,
        position: Position::new(2, 1),
    }));
}

#[test]
fn both_heroes_trapped_loses() {
    let mut game = scripted(
        "*********\n*   L   *\n*********",
        Layout {
            heroes: [Position::new(1, 1), Position::new(7, 1)],
            key: None,
            traps: vec![Position::new(2, 1), Position::new(6, 1)],
        },
    );

    let outcome = game.step();

    assert!(game.heroes().iter().all(|hero| hero.is_trapped()));
    assert_eq!(outcome, Some(Outcome::Lost(LossReason::BothTrapped)));
    assert!(game.cages().all(|cage| cage.is_closed_cage()));
    assert_eq!(
        game.observer().events().last(),
        Some(&GameEvent::Finished(Outcome::Lost(LossReason::BothTrapped)))
    );
}

/// Hero 0 walks into a trap; hero 1 grabs the key, finds the cage and frees it.
fn rescue_game() -> Game<StdRng, EventLog> {
    scripted(
        CORRIDOR,
        Layout {
            heroes: [Position::new(1, 1), Position::new(5, 1)],
            key: Some(Position::new(4, 1)),
            traps: vec![Position::new(2, 1)],
        },
    )
}

#[test]
fn rescue_frees_the_caged_hero_and_starts_rendezvous() {
    let mut game = rescue_game();

    game.step();
    assert!(game.heroes()[0].is_trapped());
    assert!(game.heroes()[1].has_key());

    game.step();
    assert_eq!(game.heroes()[1].position(), Position::new(3, 1));
    assert!(!game.heroes_found());

    let walls_before = game.maze().wall_count();
    game.step();

    let [rescued, rescuer] = game.heroes();
    assert!(!rescued.is_trapped());
    assert!(!rescuer.has_key(), "the key is spent on the rescue");
    assert_eq!(rescued.position(), rescuer.position());
    let cage = game.cages().next().expect("cage");
    assert!(!cage.is_active() && !cage.is_visible());

    assert!(game.heroes_found());
    assert_eq!(game.phase(), Phase::WallDissolving);
    assert_eq!(game.walls_to_remove().len(), walls_before);
    assert_eq!(game.wall_removal_progress(), (0, walls_before));

    let rescues = game
        .observer()
        .events()
        .iter()
        .filter(|event| matches!(event, GameEvent::HeroRescued { .. }))
        .count();
    assert_eq!(rescues, 1);
}

#[test]
fn guided_heroes_close_in_on_the_exit_and_win() {
    let mut game = rescue_game();
    for _ in 0..3 {
        game.step();
    }
    assert_eq!(game.phase(), Phase::WallDissolving);

    while game.phase() == Phase::WallDissolving {
        assert_eq!(game.step(), None);
    }
    assert_eq!(game.maze().wall_count(), 0);

    let exit = game.maze().exit();
    let mut distances: Vec<usize> = game
        .heroes()
        .iter()
        .map(|hero| hero.position().manhattan_distance(exit))
        .collect();
    let turns_before = game.turns();

    while !game.is_over() {
        game.step();
        for (hero, previous) in game.heroes().iter().zip(distances.iter_mut()) {
            let distance = hero.position().manhattan_distance(exit);
            assert!(distance < *previous || (*previous == 0 && distance == 0));
            *previous = distance;
        }
    }

    assert_eq!(game.outcome(), Some(Outcome::Won));
    assert_eq!(game.turns() - turns_before, 6);

    let announcements: Vec<PhaseAnnouncement> = game
        .observer()
        .events()
        .iter()
        .filter_map(|event| match event {
            GameEvent::PhaseEntered(announcement) => Some(*announcement),
            _ => None,
        })
        .collect();
    assert_eq!(
        announcements,
        vec![
            PhaseAnnouncement::RendezvousFound,
            PhaseAnnouncement::WallsDissolving { total: 22 },
            PhaseAnnouncement::MovingToExit,
        ]
    );
}

#[test]
fn quitting_leaves_the_game_undecided() {
    let maze = MazeMap::parse(MAZE).expect("maze");
    let mut game = Game::new(
        maze,
        GameConfig::default(),
        StdRng::seed_from_u64(5),
        NullObserver,
    )
    .expect("game");

    assert_eq!(game.run(|_| true), None);
    assert_eq!(game.turns(), 0);
    assert_eq!(game.outcome(), None);
}
