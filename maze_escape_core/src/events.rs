use serde::Serialize;

use crate::{
    Position,
    agent::{Hero, HeroId},
    game::{Outcome, Phase},
    object::{InteractiveObject, ObjectId, ObjectKind},
};

/// Phase announcements a front end shows to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseAnnouncement {
    RendezvousFound,
    WallsDissolving { total: usize },
    MovingToExit,
}

/// Hero state as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroSnapshot {
    pub id: HeroId,
    pub name: String,
    pub symbol: char,
    pub position: Position,
    pub has_key: bool,
    pub trapped: bool,
}

impl From<&Hero> for HeroSnapshot {
    fn from(hero: &Hero) -> Self {
        Self {
            id: hero.id(),
            name: hero.name().to_string(),
            symbol: hero.symbol(),
            position: hero.position(),
            has_key: hero.has_key(),
            trapped: hero.is_trapped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub symbol: char,
    pub position: Position,
    pub visible: bool,
    pub active: bool,
}

impl ObjectSnapshot {
    pub fn new(id: ObjectId, object: &InteractiveObject) -> Self {
        Self {
            id,
            kind: object.kind(),
            symbol: object.symbol(),
            position: object.position(),
            visible: object.is_visible(),
            active: object.is_active(),
        }
    }
}

/// Everything a renderer needs to draw one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub phase: Phase,
    pub heroes: [HeroSnapshot; 2],
    pub objects: Vec<ObjectSnapshot>,
}

/// Semantic events the simulation emits for its output sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    KeyPickedUp {
        hero: HeroId,
        position: Position,
    },
    HeroTrapped {
        hero: HeroId,
        cage: ObjectId,
        position: Position,
    },
    HeroRescued {
        rescuer: HeroId,
        rescued: HeroId,
        position: Position,
    },
    BlockedMove {
        hero: HeroId,
        target: Position,
    },
    PhaseEntered(PhaseAnnouncement),
    WallRemoved {
        position: Position,
        removed: usize,
        total: usize,
    },
    /// Emitted exactly once per turn, after the turn is fully resolved.
    Turn(TurnSnapshot),
    Finished(Outcome),
}

/// Output sink for game events.
pub trait GameObserver {
    fn on_event(&mut self, event: &GameEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl GameObserver for NullObserver {
    fn on_event(&mut self, _event: &GameEvent) {}
}

/// Buffers events until the owner drains them.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

impl GameObserver for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}

/// Writes every event to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl GameObserver for TracingObserver {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Turn(snapshot) => {
                let [first, second] = &snapshot.heroes;
                tracing::debug!(
                    turn = snapshot.turn,
                    phase = ?snapshot.phase,
                    first = %first.position,
                    first_trapped = first.trapped,
                    second = %second.position,
                    second_trapped = second.trapped,
                    "Turn resolved"
                );
            }
            GameEvent::WallRemoved {
                position,
                removed,
                total,
            } => {
                tracing::trace!(%position, removed, total, "Wall disappeared");
            }
            GameEvent::PhaseEntered(announcement) => {
                tracing::info!(?announcement, "Phase entered");
            }
            GameEvent::Finished(outcome) => {
                tracing::info!(%outcome, "Game finished");
            }
            other => tracing::info!(event = ?other, "Game event"),
        }
    }
}
