/// The per-frame update and the movement tick.
///
/// Frame processing order (`frame`):
///   1. Advance the logical clock
///   2. Effect expiry, phase-window close
///   3. Pulse phase updates (warning → deadly → removed), bubble expiry
///   4. Pursuit controllers
///   5. Scheduler timers, deadline order
///   6. Teleport burst, if one is due
///   7. At most one movement tick
///
/// Movement tick order (`movement_tick`):
///   1. Apply the queued direction
///   2. Resolve the candidate head (`domain::rules`) and apply the outcome
///   3. Consumption → score, new target, growth, progression check
///   4. Patrol controllers
///
/// Everything returns to the caller as `GameEvent`s; nothing here touches
/// the screen or the speakers.

use rand::Rng;

use crate::domain::ai;
use crate::domain::content::{
    LevelId, CONSUME_LINES, GAME_OVER_LINES, IDLE_LINES, LINE_ABSORB, LINE_HEAL, LINE_PULSE,
    LINE_SKIP, NEUROPLASTICITY_LINES, TARGET_SCORE,
};
use crate::domain::entity::PulsePhase;
use crate::domain::grid::Cell;
use crate::domain::rules::{self, Absorbed, Cause, Outcome};
use super::event::{GameEvent, TextChannel};
use super::level;
use super::schedule::{Scheduler, Scope, TimerKind};
use super::world::{Phase, WorldState};

pub const VIRUS_CHATTER_MS: u64 = 6000;
pub const HOST_THOUGHT_MS: u64 = 8000;
pub const FIRST_HOST_THOUGHT_MS: u64 = 2000;
pub const VIRUS_TEXT_MS: u64 = 6000;
pub const HOST_TEXT_MS: u64 = 7000;
pub const EVENT_TEXT_MS: u64 = 5000;
pub const NEUROPLASTICITY_TEXT_CHANCE: f64 = 0.4;

// ══════════════════════════════════════════════════════════════
// Text helper
// ══════════════════════════════════════════════════════════════

/// Show a line and (re)arm its clear timer.
pub fn say(
    world: &WorldState,
    sched: &mut Scheduler,
    channel: TextChannel,
    text: &'static str,
    clear_after: u64,
    events: &mut Vec<GameEvent>,
) {
    sched.once(TimerKind::ClearText(channel), world.now + clear_after, Scope::Level);
    events.push(GameEvent::Text { channel, text });
}

fn pick(world: &mut WorldState, pool: &[&'static str]) -> &'static str {
    pool[world.rng.random_range(0..pool.len())]
}

// ══════════════════════════════════════════════════════════════
// Frame
// ══════════════════════════════════════════════════════════════

pub fn frame(world: &mut WorldState, sched: &mut Scheduler, dt: u64) -> Vec<GameEvent> {
    if world.phase != Phase::Playing {
        return vec![];
    }

    let mut events = Vec::new();
    world.now += dt;
    let now = world.now;

    for id in world.effects.expire(now) {
        log::debug!("{} expired", id.def().name);
        events.push(GameEvent::MutationExpired(id));
    }
    if world.effects.close_phase_windows(now) {
        events.push(GameEvent::PhaseEnded);
    }

    update_pulses(world, &mut events);
    world.bubbles.retain(|b| now < b.expires_at);

    let chase = world.effects.decoy(now).unwrap_or_else(|| world.organism.head());
    ai::update_pursuers(&world.grid, &mut world.enemies, chase, now);

    while let Some(kind) = sched.pop_due(now) {
        fire_timer(world, sched, kind, &mut events);
    }

    if let Some(cells) = world.effects.take_due_burst(now) {
        teleport_burst(world, sched, cells, &mut events);
    }

    if world.phase == Phase::Playing && now >= world.next_tick_at {
        world.next_tick_at += world.tick_interval();
        if world.next_tick_at <= now {
            world.next_tick_at = now + world.tick_interval();
        }
        events.extend(movement_tick(world, sched));
    }

    events
}

fn update_pulses(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let now = world.now;
    for p in &mut world.pulses {
        if !p.deadly && p.phase(now) == PulsePhase::Deadly {
            p.deadly = true;
            events.push(GameEvent::HazardDeadly { orientation: p.orientation, index: p.index });
        }
    }
    world.pulses.retain(|p| p.phase(now) != PulsePhase::Expired);
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

fn fire_timer(world: &mut WorldState, sched: &mut Scheduler, kind: TimerKind, events: &mut Vec<GameEvent>) {
    match kind {
        TimerKind::ImpulsePulse => {
            if world.level != LevelId::Nervous {
                return;
            }
            events.push(level::spawn_pulse(world));
            say(world, sched, TextChannel::Virus, LINE_PULSE, EVENT_TEXT_MS, events);
        }
        TimerKind::Neuroplasticity => {
            if world.level != LevelId::Brain {
                return;
            }
            events.push(GameEvent::Neuroplasticity);
            if world.rng.random_bool(NEUROPLASTICITY_TEXT_CHANCE) {
                let line = pick(world, &NEUROPLASTICITY_LINES);
                say(world, sched, TextChannel::Virus, line, VIRUS_TEXT_MS, events);
            }
        }
        TimerKind::ThoughtBubble => {
            if world.level != LevelId::Brain {
                return;
            }
            match level::spawn_bubble(world) {
                Some(ev) => events.push(ev),
                None => log::debug!("no room for a thought bubble"),
            }
        }
        TimerKind::VirusChatter => {
            let line = pick(world, &IDLE_LINES);
            say(world, sched, TextChannel::Virus, line, VIRUS_TEXT_MS, events);
        }
        TimerKind::HostThought => {
            let thoughts = world.host().thoughts;
            let line = pick(world, &thoughts);
            say(world, sched, TextChannel::Host, line, HOST_TEXT_MS, events);
        }
        TimerKind::ClearText(channel) => events.push(GameEvent::TextCleared { channel }),
    }
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

pub fn movement_tick(world: &mut WorldState, sched: &mut Scheduler) -> Vec<GameEvent> {
    let mut events = Vec::new();
    world.tick += 1;
    world.organism.apply_queued();

    step_head(world, sched, &mut events);
    debug_assert!(!world.organism.has_duplicates(), "organism overlaps itself");

    if world.phase != Phase::Ended {
        ai::tick_patrols(&world.grid, &mut world.enemies, world.now);
    }
    events.push(GameEvent::TickComplete(Box::new(world.snapshot())));
    events
}

/// Head advances `cells` times along the current heading, each through the
/// full collision pipeline. Stops early if the run ends or leaves Playing.
fn teleport_burst(world: &mut WorldState, sched: &mut Scheduler, cells: u32, events: &mut Vec<GameEvent>) {
    events.push(GameEvent::TeleportBurst);
    say(world, sched, TextChannel::Virus, LINE_SKIP, EVENT_TEXT_MS, events);
    for _ in 0..cells {
        step_head(world, sched, events);
        if world.phase != Phase::Playing {
            break;
        }
    }
    events.push(GameEvent::TickComplete(Box::new(world.snapshot())));
}

/// Move the head one cell through the collision pipeline. An absorbed enemy
/// is applied before the outcome.
fn step_head(world: &mut WorldState, sched: &mut Scheduler, events: &mut Vec<GameEvent>) {
    let candidate = world.organism.head().step(world.organism.dir);
    let resolution = rules::resolve(&world.field(), &world.effects, candidate);
    if let Some(Absorbed { index, bonus }) = resolution.absorbed {
        let enemy = world.enemies.remove(index);
        world.score += bonus;
        world.organism.grow(1);
        log::info!("absorbed enemy {} (+{bonus})", enemy.id);
        events.push(GameEvent::EnemyAbsorbed { cell: enemy.cell });
        say(world, sched, TextChannel::Virus, LINE_ABSORB, EVENT_TEXT_MS, events);
    }
    match resolution.outcome {
        Outcome::Terminal(cause) => end_run(world, sched, cause, events),
        Outcome::Heal { bonus } => {
            world.effects.consume_heal(world.now);
            world.score += bonus;
            log::info!("self-collision healed (+{bonus})");
            events.push(GameEvent::SelfHealTriggered);
            say(world, sched, TextChannel::Virus, LINE_HEAL, EVENT_TEXT_MS, events);
        }
        Outcome::Advance { head } => place_head(world, sched, head, events),
    }
}

fn place_head(world: &mut WorldState, sched: &mut Scheduler, head: Cell, events: &mut Vec<GameEvent>) {
    world.organism.push_head(head);

    let rear = world.effects.rear_consumption(world.now);
    if rules::consumes(&world.organism, world.target, rear) {
        let eaten = world.target.unwrap_or(head);
        let extra = match world.effects.max_extra_growth(world.now) {
            0 => 0,
            max => world.rng.random_range(1..=max),
        };
        world.organism.grow(1 + extra);
        world.score += TARGET_SCORE;
        level::spawn_target(world);
        events.push(GameEvent::Consumed { cell: eaten, score: world.score });
        let line = pick(world, &CONSUME_LINES);
        say(world, sched, TextChannel::Virus, line, EVENT_TEXT_MS, events);
        world.organism.settle_tail();
        check_progression(world, events);
    } else {
        world.organism.settle_tail();
    }
}

/// Level threshold first; only if it did not fire, the mutation threshold.
fn check_progression(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing {
        return;
    }
    if let (Some(threshold), Some(next)) = (world.next_level_score(), world.level.next()) {
        if world.score >= threshold {
            world.phase = Phase::LevelTransition;
            log::info!("score {} reached {}, transition to {:?}", world.score, threshold, next);
            events.push(GameEvent::LevelTransitionReady { next });
            return;
        }
    }
    if world.score >= world.next_mutation_at {
        let options = level::draw_offer(world);
        world.mutation_offer = options.clone();
        world.phase = Phase::MutationSelect;
        log::debug!("offering {:?}", options);
        events.push(GameEvent::MutationOffered { options });
    }
}

pub fn end_run(world: &mut WorldState, sched: &mut Scheduler, cause: Cause, events: &mut Vec<GameEvent>) {
    world.phase = Phase::Ended;
    sched.cancel_scope(Scope::Level);
    let epitaph = pick(world, &GAME_OVER_LINES);
    log::info!("run ended by {cause:?} at score {} on {:?}", world.score, world.level);
    events.push(GameEvent::RunEnded { final_score: world.score, cause, epitaph });
}
