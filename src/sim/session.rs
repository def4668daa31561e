/// Session: owns the world and the scheduler, dispatches intents.
///
/// ## Run State Machine
/// ┌──────────────────┬─────────────────────┬──────────────────────────────────┐
/// │ Phase             │ Accepted intent      │ Transition                       │
/// ├──────────────────┼─────────────────────┼──────────────────────────────────┤
/// │ Intro             │ Move(dir)            │ → Playing, heading = dir         │
/// │ Playing           │ Move(dir)            │ queue (reversal ignored)         │
/// │                   │ Ability              │ open phase window if held        │
/// │ MutationSelect    │ Choose(1..=3)        │ grant, → Playing                 │
/// │ LevelTransition   │ any                  │ next level, → Playing            │
/// │ Ended             │ Restart              │ full reset, → Intro              │
/// │ (any)             │ other                │ ignored                          │
/// └──────────────────┴─────────────────────┴──────────────────────────────────┘

use rand::Rng;

use crate::config::TimingConfig;
use crate::domain::content::{HOSTS, LINE_LEVEL, LINE_PHASE, LINE_RUN_START, MUTATION_LINES, MUTATION_SCORE_STEP};
use crate::domain::effects::{DecisionPoint, EffectKind, Grant};
use crate::domain::grid::Dir;

use super::event::{GameEvent, TextChannel};
use super::level;
use super::schedule::{Scheduler, Scope, TimerKind};
use super::step::{self, EVENT_TEXT_MS, FIRST_HOST_THOUGHT_MS, HOST_THOUGHT_MS, VIRUS_CHATTER_MS, VIRUS_TEXT_MS};
use super::world::{Phase, WorldState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intent {
    Move(Dir),
    Ability,
    /// 1-based menu choice.
    Choose(u8),
    Restart,
    /// Generic "any key".
    Advance,
}

pub struct Session {
    world: WorldState,
    sched: Scheduler,
}

impl Session {
    pub fn new(seed: u64, timing: TimingConfig) -> Self {
        let mut world = WorldState::new(seed, timing);
        let mut sched = Scheduler::new();
        world.host = world.rng.random_range(0..HOSTS.len());
        level::start_level_one(&mut world, &mut sched);
        log::info!("session seeded with {seed}, host {}", world.host().name);
        Session { world, sched }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn phase(&self) -> Phase {
        self.world.phase
    }

    /// Per-frame update. See `sim::step::frame`.
    pub fn advance(&mut self, dt_ms: u64) -> Vec<GameEvent> {
        step::frame(&mut self.world, &mut self.sched, dt_ms)
    }

    pub fn input(&mut self, intent: Intent) -> Vec<GameEvent> {
        match (self.world.phase, intent) {
            (Phase::Intro, Intent::Move(dir)) => self.start_run(dir),
            (Phase::Playing, Intent::Move(dir)) => {
                self.world.organism.queue_dir(dir);
                vec![]
            }
            (Phase::Playing, Intent::Ability) => self.engage_phase(),
            (Phase::MutationSelect, Intent::Choose(n)) => self.choose(n),
            (Phase::LevelTransition, _) => self.enter_next_level(),
            (Phase::Ended, Intent::Restart) => self.restart(),
            _ => vec![],
        }
    }

    // ── Transitions ──

    fn start_run(&mut self, dir: Dir) -> Vec<GameEvent> {
        let w = &mut self.world;
        w.organism.queue_dir(dir);
        w.organism.apply_queued();
        w.phase = Phase::Playing;
        w.next_tick_at = w.now + w.tick_interval();

        let now = w.now;
        self.sched.every(TimerKind::VirusChatter, now + VIRUS_CHATTER_MS, VIRUS_CHATTER_MS, Scope::Session);
        self.sched.every(TimerKind::HostThought, now + HOST_THOUGHT_MS, HOST_THOUGHT_MS, Scope::Session);
        self.sched.once(TimerKind::HostThought, now + FIRST_HOST_THOUGHT_MS, Scope::Session);

        log::debug!("run started heading {:?}", w.organism.dir);
        let mut events = vec![GameEvent::RunStarted];
        step::say(&self.world, &mut self.sched, TextChannel::Virus, LINE_RUN_START, VIRUS_TEXT_MS, &mut events);
        events
    }

    fn engage_phase(&mut self) -> Vec<GameEvent> {
        let Some(until) = self.world.effects.engage_phase(self.world.now) else {
            return vec![];
        };
        log::debug!("phase engaged until {until}");
        let mut events = vec![GameEvent::PhaseEngaged { until }];
        step::say(&self.world, &mut self.sched, TextChannel::Virus, LINE_PHASE, EVENT_TEXT_MS, &mut events);
        events
    }

    fn choose(&mut self, n: u8) -> Vec<GameEvent> {
        let w = &mut self.world;
        let Some(&id) = (n as usize).checked_sub(1).and_then(|i| w.mutation_offer.get(i)) else {
            return vec![];
        };
        let now = w.now;

        if w.effects.grant(id, now) == Grant::Rearmed {
            log::info!("{} re-armed", id.def().name);
        } else {
            log::info!("{} acquired", id.def().name);
        }

        match id.def().effect {
            EffectKind::MindControl => {
                let until = w
                    .effects
                    .handler(DecisionPoint::EnemyStun, now)
                    .and_then(|i| i.expires_at)
                    .unwrap_or(now);
                for e in &mut w.enemies {
                    e.stun(until);
                }
            }
            EffectKind::PhantomClone => {
                let head = w.organism.head();
                if let Some(inst) = w.effects.get_mut(id) {
                    inst.decoy = Some(head);
                }
            }
            _ => {}
        }

        w.next_mutation_at += MUTATION_SCORE_STEP;
        w.mutation_offer.clear();
        w.phase = Phase::Playing;
        w.next_tick_at = w.now + w.tick_interval();

        let line = MUTATION_LINES[w.rng.random_range(0..MUTATION_LINES.len())];
        let mut events = vec![GameEvent::MutationActivated(id)];
        step::say(&self.world, &mut self.sched, TextChannel::Virus, line, VIRUS_TEXT_MS, &mut events);
        events
    }

    fn enter_next_level(&mut self) -> Vec<GameEvent> {
        let mut events = level::advance_level(&mut self.world, &mut self.sched);
        events.push(GameEvent::TextCleared { channel: TextChannel::Host });
        step::say(&self.world, &mut self.sched, TextChannel::Virus, LINE_LEVEL, VIRUS_TEXT_MS, &mut events);
        events
    }

    fn restart(&mut self) -> Vec<GameEvent> {
        level::reset_run(&mut self.world, &mut self.sched);
        vec![GameEvent::SessionReset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::{LevelId, MutationId};
    use crate::domain::entity::Enemy;
    use crate::domain::grid::Cell;
    use crate::domain::rules::Cause;
    use proptest::prelude::*;

    fn session() -> Session {
        Session::new(42, TimingConfig::default())
    }

    fn started() -> Session {
        let mut s = session();
        s.input(Intent::Move(Dir::Up));
        s
    }

    /// Run frames until a predicate holds or the budget runs out.
    fn run_until(s: &mut Session, budget_ms: u64, mut pred: impl FnMut(&Session) -> bool) -> Vec<GameEvent> {
        let mut all = Vec::new();
        let mut t = 0;
        while t < budget_ms && !pred(s) {
            all.extend(s.advance(16));
            t += 16;
        }
        all
    }

    #[test]
    fn intro_waits_for_direction() {
        let mut s = session();
        assert_eq!(s.phase(), Phase::Intro);
        assert!(s.input(Intent::Ability).is_empty());
        assert!(s.input(Intent::Advance).is_empty());
        assert!(s.advance(5000).is_empty());
        assert_eq!(s.world().now, 0);

        let events = s.input(Intent::Move(Dir::Up));
        assert!(matches!(events[0], GameEvent::RunStarted));
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.world().organism.dir, Dir::Up);
    }

    #[test]
    fn intro_reversal_keeps_default_heading() {
        let mut s = session();
        s.input(Intent::Move(Dir::Left));
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.world().organism.dir, Dir::Right);
    }

    #[test]
    fn direction_applies_on_next_tick() {
        let mut s = started();
        s.world.target = Some(Cell::new(0, 0));
        s.world.obstacles.clear();
        s.input(Intent::Move(Dir::Right));
        s.input(Intent::Move(Dir::Down));
        assert_eq!(s.world().organism.dir, Dir::Up);
        s.advance(200);
        assert_eq!(s.world().organism.dir, Dir::Right);
        assert_eq!(s.world().organism.head(), Cell::new(13, 10));
    }

    #[test]
    fn first_host_thought_after_two_seconds() {
        let mut s = started();
        s.world.obstacles.clear();
        s.world.next_tick_at = u64::MAX;
        let early = s.advance(1999);
        assert!(!early.iter().any(|e| matches!(e, GameEvent::Text { channel: TextChannel::Host, .. })));
        let events = s.advance(1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Text { channel: TextChannel::Host, .. })));
    }

    #[test]
    fn choose_ignores_out_of_range() {
        let mut s = started();
        s.world.phase = Phase::MutationSelect;
        s.world.mutation_offer = vec![MutationId::SpineFangs, MutationId::LeechLoop, MutationId::CapillaryPhase];
        assert!(s.input(Intent::Choose(0)).is_empty());
        assert!(s.input(Intent::Choose(4)).is_empty());
        assert!(s.input(Intent::Move(Dir::Left)).is_empty());
        assert_eq!(s.phase(), Phase::MutationSelect);

        let events = s.input(Intent::Choose(2));
        assert!(matches!(events[0], GameEvent::MutationActivated(MutationId::LeechLoop)));
        assert_eq!(s.phase(), Phase::Playing);
        assert_eq!(s.world().next_mutation_at, 80);
        assert!(s.world().mutation_offer.is_empty());
    }

    #[test]
    fn ability_without_mutation_is_ignored() {
        let mut s = started();
        assert!(s.input(Intent::Ability).is_empty());
        s.world.effects.grant(MutationId::CapillaryPhase, 0);
        let events = s.input(Intent::Ability);
        assert!(matches!(events[0], GameEvent::PhaseEngaged { until: 8000 }));
        assert!(s.input(Intent::Ability).is_empty());
    }

    #[test]
    fn dream_parasite_stuns_everyone() {
        let mut s = started();
        s.world.enemies.push(Enemy::patrol(0, Cell::new(1, 1), 1, 1));
        s.world.enemies.push(Enemy::pursuit(1, Cell::new(20, 15), 0));
        s.world.phase = Phase::MutationSelect;
        s.world.mutation_offer = vec![MutationId::DreamParasite, MutationId::NeuronLace, MutationId::CortexMirage];
        s.input(Intent::Choose(1));
        assert!(s.world().enemies.iter().all(|e| e.stunned_until == Some(5000)));
    }

    #[test]
    fn level_transition_accepts_any_key() {
        let mut s = started();
        s.world.phase = Phase::LevelTransition;
        let events = s.input(Intent::Choose(3));
        assert!(events.iter().any(|e| matches!(e, GameEvent::LevelAdvanced(LevelId::Nervous))));
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn restart_only_after_end() {
        let mut s = started();
        assert!(s.input(Intent::Restart).is_empty());
        s.world.organism = crate::domain::entity::Organism::spawn(Cell::new(12, 0), Dir::Up);
        s.world.obstacles.clear();
        let events = run_until(&mut s, 1000, |s| s.phase() == Phase::Ended);
        assert!(events.iter().any(|e| matches!(e, GameEvent::RunEnded { cause: Cause::Wall, .. })));

        s.world.score = 70;
        s.world.effects.grant(MutationId::SpineFangs, 0);
        let events = s.input(Intent::Restart);
        assert!(matches!(events.as_slice(), [GameEvent::SessionReset]));
        assert_eq!(s.phase(), Phase::Intro);
        assert_eq!(s.world().score, 0);
        assert_eq!(s.world().effects.iter().count(), 0);
        assert_eq!(s.world().organism.head(), Cell::new(12, 10));
    }

    #[test]
    fn level_threshold_blocks_simultaneous_offer() {
        let mut s = started();
        s.world.obstacles.clear();
        s.world.organism = crate::domain::entity::Organism::spawn(Cell::new(5, 10), Dir::Right);
        s.world.score = 90;
        s.world.next_mutation_at = 30;
        s.world.target = Some(Cell::new(6, 10));
        let events = run_until(&mut s, 1000, |s| s.phase() != Phase::Playing);
        assert_eq!(s.phase(), Phase::LevelTransition);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::MutationOffered { .. })));

        s.input(Intent::Advance);
        assert_eq!(s.world().level, LevelId::Nervous);
        assert_eq!(s.phase(), Phase::Playing);
    }

    fn intent_strategy() -> impl Strategy<Value = Intent> {
        prop_oneof![
            (0usize..4).prop_map(|i| Intent::Move(Dir::ALL[i])),
            Just(Intent::Ability),
            (0u8..5).prop_map(Intent::Choose),
            Just(Intent::Restart),
            Just(Intent::Advance),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_play_keeps_invariants(
            seed in any::<u64>(),
            script in prop::collection::vec((intent_strategy(), 1u64..400), 1..150),
        ) {
            let mut s = Session::new(seed, TimingConfig::default());
            let mut last_score = 0;
            for (intent, dt) in script {
                let mut events = s.input(intent);
                if events.iter().any(|e| matches!(e, GameEvent::SessionReset)) {
                    last_score = 0;
                }
                events.extend(s.advance(dt));
                let w = s.world();

                prop_assert!(w.score >= last_score);
                last_score = w.score;
                prop_assert!(w.organism.len() >= 1);
                prop_assert!(!w.organism.has_duplicates());
                if let Some(t) = w.target {
                    prop_assert!(!w.obstacles.contains(&t));
                    prop_assert!(!w.organism.contains(t));
                }
                let respawned = events
                    .iter()
                    .any(|e| matches!(e, GameEvent::Consumed { .. } | GameEvent::LevelAdvanced(_)));
                if respawned {
                    prop_assert!(w.target.is_some_and(|t| !w.organism.contains(t) && !w.obstacles.contains(&t)));
                }
                if w.phase == Phase::MutationSelect {
                    prop_assert_eq!(w.mutation_offer.len(), 3);
                }
            }
        }

        #[test]
        fn same_seed_same_run(seed in any::<u64>(), dirs in prop::collection::vec(0usize..4, 1..40)) {
            let mut a = Session::new(seed, TimingConfig::default());
            let mut b = Session::new(seed, TimingConfig::default());
            for d in dirs {
                let intent = Intent::Move(Dir::ALL[d]);
                a.input(intent);
                b.input(intent);
                a.advance(120);
                b.advance(120);
                prop_assert_eq!(a.world().snapshot(), b.world().snapshot());
            }
        }
    }
}
