/// WorldState: the complete, exclusively owned state of a run.
///
/// Only `sim::*` mutates it. Collaborators read it through `&WorldState`
/// or take an owned `Snapshot` from `GameEvent::TickComplete`.
///
/// ## Clock
///
/// `now` is a logical millisecond clock advanced by the session, and only
/// while `Phase::Playing`. Every timestamp in the world (effect expiry,
/// pulse activation, pursuit throttle, stun expiry, next movement tick)
/// is on this clock.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::TimingConfig;
use crate::domain::content::{HostProfile, LevelId, MutationId, FIRST_MUTATION_SCORE, HOSTS};
use crate::domain::effects::ActiveEffects;
use crate::domain::entity::{Enemy, Orientation, Organism, Pulse, ThoughtBubble};
use crate::domain::grid::{Cell, Dir, Grid};
use crate::domain::rules::Field;

pub const START_HEAD: Cell = Cell::new(12, 10);
pub const START_DIR: Dir = Dir::Right;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Intro,
    Playing,
    MutationSelect,
    LevelTransition,
    Ended,
}

pub struct WorldState {
    pub grid: Grid,
    pub phase: Phase,
    pub level: LevelId,

    // ── Entities ──
    pub organism: Organism,
    pub target: Option<Cell>,
    pub obstacles: Vec<Cell>,
    pub enemies: Vec<Enemy>,
    pub pulses: Vec<Pulse>,
    pub bubbles: Vec<ThoughtBubble>,

    // ── Mutations ──
    pub effects: ActiveEffects,
    pub mutation_offer: Vec<MutationId>,
    pub next_mutation_at: u32,

    // ── Progress ──
    pub score: u32,
    pub host: usize,
    /// Speed effect latched at the last level advance.
    pub speed_boost: bool,

    // ── Clock ──
    pub now: u64,
    pub next_tick_at: u64,
    pub tick: u64,
    pub timing: TimingConfig,

    pub rng: Pcg32,
    next_enemy_id: usize,
}

// ── Construction ──

impl WorldState {
    pub fn new(seed: u64, timing: TimingConfig) -> Self {
        WorldState {
            grid: Grid::default(),
            phase: Phase::Intro,
            level: LevelId::Circulatory,
            organism: Organism::spawn(START_HEAD, START_DIR),
            target: None,
            obstacles: vec![],
            enemies: vec![],
            pulses: vec![],
            bubbles: vec![],
            effects: ActiveEffects::new(),
            mutation_offer: vec![],
            next_mutation_at: FIRST_MUTATION_SCORE,
            score: 0,
            host: 0,
            speed_boost: false,
            now: 0,
            next_tick_at: 0,
            tick: 0,
            timing,
            rng: Pcg32::seed_from_u64(seed),
            next_enemy_id: 0,
        }
    }

    pub fn alloc_enemy_id(&mut self) -> usize {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }
}

// ── Queries ──

impl WorldState {
    pub fn host(&self) -> &'static HostProfile {
        &HOSTS[self.host % HOSTS.len()]
    }

    pub fn tick_interval(&self) -> u64 {
        self.timing.tick_interval(self.level.number(), self.speed_boost)
    }

    /// Collision view for `domain::rules`.
    pub fn field(&self) -> Field<'_> {
        Field {
            grid: self.grid,
            level: self.level,
            organism: &self.organism,
            obstacles: &self.obstacles,
            enemies: &self.enemies,
            pulses: &self.pulses,
            now: self.now,
        }
    }

    /// Cell blocked for target placement.
    pub fn blocks_target(&self, c: Cell) -> bool {
        self.organism.contains(c) || self.obstacles.contains(&c) || self.enemies.iter().any(|e| e.cell == c)
    }

    /// Cell blocked for obstacle/enemy/bubble placement.
    pub fn blocks_spawn(&self, c: Cell) -> bool {
        self.blocks_target(c) || self.target == Some(c)
    }

    /// Score needed for the next level, `None` on the last level.
    pub fn next_level_score(&self) -> Option<u32> {
        self.level.next_threshold()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            now: self.now,
            tick: self.tick,
            phase: self.phase,
            level: self.level,
            score: self.score,
            organism: self.organism.cells(),
            dir: self.organism.dir,
            target: self.target,
            obstacles: self.obstacles.clone(),
            enemies: self
                .enemies
                .iter()
                .map(|e| EnemyView { cell: e.cell, patrol: e.is_patrol(), stunned: e.is_stunned(self.now) })
                .collect(),
            pulses: self
                .pulses
                .iter()
                .map(|p| PulseView { orientation: p.orientation, index: p.index, deadly: p.is_deadly(self.now) })
                .collect(),
            effects: self
                .effects
                .active(self.now)
                .map(|i| (i.id, i.remaining_ms(self.now)))
                .collect(),
            decoy: self.effects.decoy(self.now),
        }
    }
}

// ── Snapshot ──

#[derive(Clone, Debug, PartialEq)]
pub struct EnemyView {
    pub cell: Cell,
    pub patrol: bool,
    pub stunned: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PulseView {
    pub orientation: Orientation,
    pub index: i32,
    pub deadly: bool,
}

/// Owned copy of the entity state after a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub now: u64,
    pub tick: u64,
    pub phase: Phase,
    pub level: LevelId,
    pub score: u32,
    pub organism: Vec<Cell>,
    pub dir: Dir,
    pub target: Option<Cell>,
    pub obstacles: Vec<Cell>,
    pub enemies: Vec<EnemyView>,
    pub pulses: Vec<PulseView>,
    /// Live mutations with milliseconds remaining where bounded.
    pub effects: Vec<(MutationId, Option<u64>)>,
    pub decoy: Option<Cell>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_world_matches_starting_layout() {
        let w = WorldState::new(1, TimingConfig::default());
        assert_eq!(w.phase, Phase::Intro);
        assert_eq!(w.organism.cells(), vec![Cell::new(12, 10), Cell::new(11, 10), Cell::new(10, 10)]);
        assert_eq!(w.next_mutation_at, 30);
        assert_eq!(w.tick_interval(), 200);
        assert_eq!(w.next_level_score(), Some(100));
    }

    #[test]
    fn next_level_score_is_stable_per_level() {
        let mut w = WorldState::new(1, TimingConfig::default());
        for (level, expected) in [
            (LevelId::Circulatory, Some(100)),
            (LevelId::Nervous, Some(250)),
            (LevelId::Brain, None),
        ] {
            w.level = level;
            let first = w.next_level_score();
            assert_eq!(first, expected);
            for _ in 0..5 {
                assert_eq!(w.next_level_score(), first);
            }
        }
    }

    #[test]
    fn snapshot_is_detached() {
        let mut w = WorldState::new(1, TimingConfig::default());
        let snap = w.snapshot();
        w.score = 999;
        w.organism.advance(Cell::new(13, 10));
        assert_eq!(snap.score, 0);
        assert_eq!(snap.organism[0], Cell::new(12, 10));
    }
}
