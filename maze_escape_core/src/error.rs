use crate::Position;

/// Errors raised while turning a maze source into a [`crate::map::MazeMap`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Maze source is empty.")]
    Empty,
    #[error("No exit ('{marker}') found in maze.")]
    MissingExit { marker: char },
    #[error("Multiple exits found in maze: {first} and {second}.")]
    MultipleExits { first: Position, second: Position },
}

/// Fatal errors while setting up a game. No partial game is ever started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("Not enough free positions in maze: found {found}, need at least {required}.")]
    NotEnoughFreeCells { found: usize, required: usize },
    #[error("Could not place heroes at least {separation} cells apart after {attempts} attempts.")]
    HeroPlacement { separation: usize, attempts: u32 },
    #[error("Cannot place {what} at {position}: {reason}.")]
    InvalidLayout {
        what: &'static str,
        position: Position,
        reason: &'static str,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
