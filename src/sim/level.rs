/// Level setup and handoff.
///
/// ## Per-level content
/// ┌──────────────┬──────────────────────────────┬──────────────────────────────┐
/// │ Level         │ Spawned on entry              │ Level timers                 │
/// ├──────────────┼──────────────────────────────┼──────────────────────────────┤
/// │ Circulatory   │ 3–5 cholesterol obstacles     │ none                         │
/// │ Nervous       │ 2–3 antibody drones (patrol)  │ pulse now, then every 8 s    │
/// │ Brain         │ 2 microdrones (pursuit)       │ neuroplasticity 45 s,        │
/// │               │                               │ thought bubble 12 s          │
/// └──────────────┴──────────────────────────────┴──────────────────────────────┘
///
/// Placement is retried a bounded number of times against occupied cells;
/// an entity that cannot be placed is skipped and logged.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::content::{self, LevelId, MutationId, FIRST_MUTATION_SCORE, HOSTS, OFFER_SIZE, THOUGHT_BUBBLES};
use crate::domain::effects::DecisionPoint;
use crate::domain::entity::{Enemy, Orientation, Organism, Pulse, ThoughtBubble};
use crate::domain::grid::Cell;

use super::event::GameEvent;
use super::schedule::{Scheduler, Scope, TimerKind};
use super::world::{Phase, WorldState, START_DIR, START_HEAD};

pub const PLACEMENT_ATTEMPTS: u32 = 50;
pub const TARGET_ATTEMPTS: u32 = 200;
pub const BUBBLE_ATTEMPTS: u32 = 20;
pub const BUBBLE_LIFETIME_MS: u64 = 6000;

pub const PULSE_PERIOD_MS: u64 = 8000;
pub const PULSE_WARNING_MS: u64 = 1000;
pub const PULSE_LIFETIME_MS: u64 = 2000;
pub const NEUROPLASTICITY_PERIOD_MS: u64 = 45_000;
pub const THOUGHT_BUBBLE_PERIOD_MS: u64 = 12_000;

// ══════════════════════════════════════════════════════════════
// Placement
// ══════════════════════════════════════════════════════════════

fn random_cell(world: &mut WorldState) -> Cell {
    let (w, h) = (world.grid.width, world.grid.height);
    Cell::new(world.rng.random_range(0..w), world.rng.random_range(0..h))
}

/// Up to `attempts` random draws; first cell not rejected by `blocked`.
fn try_place(world: &mut WorldState, attempts: u32, blocked: impl Fn(&WorldState, Cell) -> bool) -> Option<Cell> {
    for _ in 0..attempts {
        let c = random_cell(world);
        if !blocked(world, c) {
            return Some(c);
        }
    }
    None
}

/// Place a new target. Random draws first, then a scan of free cells so a
/// crowded grid still finds one. `None` only when the grid is full.
pub fn spawn_target(world: &mut WorldState) -> Option<Cell> {
    let cell = try_place(world, TARGET_ATTEMPTS, WorldState::blocks_target).or_else(|| {
        let free: Vec<Cell> = world.grid.cells().filter(|&c| !world.blocks_target(c)).collect();
        if free.is_empty() {
            None
        } else {
            let i = world.rng.random_range(0..free.len());
            Some(free[i])
        }
    });
    if cell.is_none() {
        log::warn!("no free cell for a new target");
    }
    world.target = cell;
    cell
}

fn spawn_obstacles(world: &mut WorldState) {
    let count = world.rng.random_range(3..=5);
    for _ in 0..count {
        match try_place(world, PLACEMENT_ATTEMPTS, WorldState::blocks_spawn) {
            Some(c) => world.obstacles.push(c),
            None => log::warn!("obstacle placement exhausted {PLACEMENT_ATTEMPTS} attempts"),
        }
    }
}

fn spawn_enemies(world: &mut WorldState, count: usize, patrol: bool) {
    for _ in 0..count {
        let Some(cell) = try_place(world, PLACEMENT_ATTEMPTS, WorldState::blocks_spawn) else {
            log::warn!("enemy placement exhausted {PLACEMENT_ATTEMPTS} attempts");
            continue;
        };
        let id = world.alloc_enemy_id();
        let enemy = if patrol {
            let dx = if world.rng.random_bool(0.5) { 1 } else { -1 };
            let dy = if world.rng.random_bool(0.5) { 1 } else { -1 };
            Enemy::patrol(id, cell, dx, dy)
        } else {
            Enemy::pursuit(id, cell, world.now)
        };
        world.enemies.push(enemy);
    }
}

/// Spawn everything the current level starts with.
fn populate(world: &mut WorldState) {
    match world.level {
        LevelId::Circulatory => spawn_obstacles(world),
        LevelId::Nervous => {
            let n = world.rng.random_range(2..=3);
            spawn_enemies(world, n, true);
        }
        LevelId::Brain => spawn_enemies(world, 2, false),
    }

    // A mind-control effect still running freezes newcomers too.
    if let Some(until) = world
        .effects
        .handler(DecisionPoint::EnemyStun, world.now)
        .and_then(|i| i.expires_at)
    {
        for e in &mut world.enemies {
            e.stun(until);
        }
    }
    log::debug!(
        "populated {:?}: {} obstacles, {} enemies",
        world.level,
        world.obstacles.len(),
        world.enemies.len()
    );
}

fn schedule_level_timers(world: &WorldState, sched: &mut Scheduler) {
    let now = world.now;
    match world.level {
        LevelId::Circulatory => {}
        LevelId::Nervous => sched.every(TimerKind::ImpulsePulse, now, PULSE_PERIOD_MS, Scope::Level),
        LevelId::Brain => {
            sched.every(TimerKind::Neuroplasticity, now + NEUROPLASTICITY_PERIOD_MS, NEUROPLASTICITY_PERIOD_MS, Scope::Level);
            sched.every(TimerKind::ThoughtBubble, now + THOUGHT_BUBBLE_PERIOD_MS, THOUGHT_BUBBLE_PERIOD_MS, Scope::Level);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Hazards and cosmetic events
// ══════════════════════════════════════════════════════════════

/// New pulse across a random row or column, starting in its warning phase.
pub fn spawn_pulse(world: &mut WorldState) -> GameEvent {
    let orientation = if world.rng.random_bool(0.5) { Orientation::Row } else { Orientation::Column };
    let span = match orientation {
        Orientation::Row => world.grid.height,
        Orientation::Column => world.grid.width,
    };
    let index = world.rng.random_range(0..span);
    world
        .pulses
        .push(Pulse::new(orientation, index, world.now, PULSE_WARNING_MS, PULSE_LIFETIME_MS));
    log::debug!("pulse {orientation:?} {index} at {}", world.now);
    GameEvent::HazardWarning { orientation, index }
}

pub fn spawn_bubble(world: &mut WorldState) -> Option<GameEvent> {
    let cell = try_place(world, BUBBLE_ATTEMPTS, WorldState::blocks_spawn)?;
    let text = THOUGHT_BUBBLES[world.rng.random_range(0..THOUGHT_BUBBLES.len())];
    world.bubbles.push(ThoughtBubble { cell, text, expires_at: world.now + BUBBLE_LIFETIME_MS });
    Some(GameEvent::ThoughtBubble { cell, text })
}

/// Three distinct mutations available on the current level.
pub fn draw_offer(world: &mut WorldState) -> Vec<MutationId> {
    let mut pool: Vec<MutationId> = content::offerable(world.level).collect();
    pool.shuffle(&mut world.rng);
    pool.truncate(OFFER_SIZE);
    pool
}

// ══════════════════════════════════════════════════════════════
// Level handoff
// ══════════════════════════════════════════════════════════════

/// Enter the next level from `LevelTransition`. Clears transient entities,
/// re-seeds the level, latches the speed effect and swaps level timers.
pub fn advance_level(world: &mut WorldState, sched: &mut Scheduler) -> Vec<GameEvent> {
    let Some(next) = world.level.next() else {
        log::warn!("no level after {:?}, resuming play", world.level);
        world.phase = Phase::Playing;
        return vec![];
    };

    world.level = next;
    world.enemies.clear();
    world.pulses.clear();
    world.obstacles.clear();
    world.bubbles.clear();
    populate(world);

    if world.effects.speed_effect(world.now) {
        world.speed_boost = true;
    }

    sched.cancel_scope(Scope::Level);
    schedule_level_timers(world, sched);

    world.next_tick_at = world.now + world.tick_interval();
    world.phase = Phase::Playing;
    log::info!(
        "entered {} (tick {} ms, boost {}, {} timers)",
        next.def().name,
        world.tick_interval(),
        world.speed_boost,
        sched.len()
    );
    vec![GameEvent::LevelAdvanced(next)]
}

/// Build the first level of a run.
pub fn start_level_one(world: &mut WorldState, sched: &mut Scheduler) {
    world.level = LevelId::Circulatory;
    spawn_target(world);
    populate(world);
    schedule_level_timers(world, sched);
}

/// Full reset: new host, level 1, zero score, no mutations. Phase → Intro.
pub fn reset_run(world: &mut WorldState, sched: &mut Scheduler) {
    sched.clear();

    let previous = world.host;
    world.host = if HOSTS.len() > 1 {
        let pick = world.rng.random_range(0..HOSTS.len() - 1);
        if pick >= previous { pick + 1 } else { pick }
    } else {
        0
    };

    world.organism = Organism::spawn(START_HEAD, START_DIR);
    world.target = None;
    world.obstacles.clear();
    world.enemies.clear();
    world.pulses.clear();
    world.bubbles.clear();
    world.effects.clear();
    world.mutation_offer.clear();
    world.next_mutation_at = FIRST_MUTATION_SCORE;
    world.score = 0;
    world.speed_boost = false;
    world.tick = 0;
    world.next_tick_at = world.now;
    world.phase = Phase::Intro;

    start_level_one(world, sched);
    log::info!("run reset, host {}", world.host().name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;

    fn world(seed: u64) -> WorldState {
        WorldState::new(seed, TimingConfig::default())
    }

    #[test]
    fn level_one_spawns_obstacles_clear_of_organism_and_target() {
        for seed in 0..20 {
            let mut w = world(seed);
            let mut s = Scheduler::new();
            start_level_one(&mut w, &mut s);
            assert!((3..=5).contains(&w.obstacles.len()));
            let t = w.target.expect("empty grid has room");
            assert!(!w.organism.contains(t));
            assert!(!w.obstacles.contains(&t));
            for o in &w.obstacles {
                assert!(!w.organism.contains(*o));
            }
            assert_eq!(s.len(), 0);
        }
    }

    #[test]
    fn target_scan_finds_last_free_cell() {
        let mut w = world(3);
        let free = Cell::new(7, 7);
        w.obstacles = w.grid.cells().filter(|&c| c != free && !w.organism.contains(c)).collect();
        assert_eq!(spawn_target(&mut w), Some(free));
        w.obstacles.push(free);
        assert_eq!(spawn_target(&mut w), None);
    }

    #[test]
    fn advance_to_nervous_swaps_entities_and_timers() {
        let mut w = world(5);
        let mut s = Scheduler::new();
        start_level_one(&mut w, &mut s);
        w.phase = Phase::LevelTransition;
        let events = advance_level(&mut w, &mut s);
        assert!(matches!(events.as_slice(), [GameEvent::LevelAdvanced(LevelId::Nervous)]));
        assert!(w.obstacles.is_empty());
        assert!((2..=3).contains(&w.enemies.len()));
        assert!(w.enemies.iter().all(|e| e.is_patrol()));
        assert!(s.is_pending(TimerKind::ImpulsePulse));
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.tick_interval(), 180);
    }

    #[test]
    fn speed_effect_latches_on_advance() {
        let mut w = world(5);
        let mut s = Scheduler::new();
        w.level = LevelId::Nervous;
        w.effects.grant(MutationId::CaffeineGland, 0);
        assert_eq!(w.tick_interval(), 180);
        advance_level(&mut w, &mut s);
        assert!(w.speed_boost);
        assert_eq!(w.level, LevelId::Brain);
        assert_eq!(w.enemies.len(), 2);
        assert_eq!(w.tick_interval(), 113);
    }

    #[test]
    fn offers_are_distinct_and_level_gated() {
        let mut w = world(11);
        for _ in 0..50 {
            let offer = draw_offer(&mut w);
            assert_eq!(offer.len(), 3);
            assert!(offer.iter().all(|m| m.def().level == LevelId::Circulatory));
        }
        w.level = LevelId::Brain;
        for _ in 0..50 {
            let offer = draw_offer(&mut w);
            let distinct: std::collections::HashSet<_> = offer.iter().collect();
            assert_eq!(distinct.len(), 3);
        }
    }

    #[test]
    fn reset_picks_a_different_host() {
        let mut w = world(9);
        let mut s = Scheduler::new();
        for _ in 0..10 {
            let before = w.host;
            w.score = 120;
            reset_run(&mut w, &mut s);
            assert_ne!(w.host, before);
            assert_eq!(w.score, 0);
            assert_eq!(w.phase, Phase::Intro);
            assert_eq!(w.level, LevelId::Circulatory);
        }
    }
}
