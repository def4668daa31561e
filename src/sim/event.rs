/// Events emitted by the session.
/// The presentation layer consumes these for text overlays and sound;
/// nothing here feeds back into the simulation.

use crate::domain::content::{LevelId, MutationId};
use crate::domain::entity::Orientation;
use crate::domain::grid::Cell;
use crate::domain::rules::Cause;

use super::world::Snapshot;

/// Overlay line a text event targets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextChannel {
    Virus,
    Host,
}

#[derive(Clone, Debug)]
pub enum GameEvent {
    RunStarted,
    Consumed { cell: Cell, score: u32 },
    MutationOffered { options: Vec<MutationId> },
    MutationActivated(MutationId),
    MutationExpired(MutationId),
    PhaseEngaged { until: u64 },
    PhaseEnded,
    LevelTransitionReady { next: LevelId },
    LevelAdvanced(LevelId),
    EnemyAbsorbed { cell: Cell },
    HazardWarning { orientation: Orientation, index: i32 },
    HazardDeadly { orientation: Orientation, index: i32 },
    SelfHealTriggered,
    TeleportBurst,
    Neuroplasticity,
    ThoughtBubble { cell: Cell, text: &'static str },
    Text { channel: TextChannel, text: &'static str },
    TextCleared { channel: TextChannel },
    RunEnded { final_score: u32, cause: Cause, epitaph: &'static str },
    SessionReset,
    TickComplete(Box<Snapshot>),
}
