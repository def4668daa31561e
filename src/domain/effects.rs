/// Mutation effects: the registry consulted at each decision point.
///
/// Every mutation is a tagged `EffectKind` with its parameters. The
/// simulation never branches on mutation ids; it asks the registry
/// "who intercepts this decision point right now?" and acts on the answer.
///
/// ## Decision points (queried in this order during a tick)
/// ┌──────────────────┬──────────────────────┬──────────────────────────────┐
/// │ Point             │ Intercepted by        │ Effect                       │
/// ├──────────────────┼──────────────────────┼──────────────────────────────┤
/// │ WallHandling      │ WallPhase (engaged)   │ bounded → wrapping           │
/// │ HazardContact     │ WallPhase (engaged)   │ deadly pulse ignored         │
/// │ ObstacleContact   │ WallPhase (engaged)   │ obstacle ignored             │
/// │ EnemyContact      │ AbsorbEnemies         │ stunned enemy absorbed       │
/// │                   │ WallPhase (engaged)   │ enemy ignored                │
/// │ SelfContact       │ CollisionHeal         │ one-shot survive + bonus     │
/// │ Consumption       │ RearConsumption       │ second segment also eats     │
/// │ GrowthAmount      │ FractalGrowth         │ extra segments on eat        │
/// │ TickInterval      │ PermanentSpeed        │ latched at next level        │
/// │ PursuitTarget     │ PhantomClone          │ pursuers chase a decoy       │
/// │ EnemyStun         │ MindControl           │ enemies frozen on grant      │
/// │ Burst             │ TeleportBurst         │ head skips ahead on a timer  │
/// └──────────────────┴──────────────────────┴──────────────────────────────┘

use super::content::MutationId;
use super::grid::{Cell, WallMode};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectDuration {
    /// Lasts until the session ends (or, for one-shots, until consumed).
    Permanent,
    /// Milliseconds of wall-clock time from activation.
    Timed(u64),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectKind {
    RearConsumption,
    CollisionHeal { bonus: u32 },
    WallPhase { window_ms: u64 },
    TeleportBurst { cells: u32, period_ms: u64 },
    AbsorbEnemies { bonus: u32 },
    PermanentSpeed,
    MindControl,
    FractalGrowth { max_extra: u32 },
    PhantomClone,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecisionPoint {
    WallHandling,
    HazardContact,
    ObstacleContact,
    EnemyContact,
    SelfContact,
    Consumption,
    GrowthAmount,
    TickInterval,
    PursuitTarget,
    EnemyStun,
    Burst,
}

impl EffectKind {
    pub fn intercepts(self) -> &'static [DecisionPoint] {
        use DecisionPoint::*;
        match self {
            EffectKind::RearConsumption => &[Consumption],
            EffectKind::CollisionHeal { .. } => &[SelfContact],
            EffectKind::WallPhase { .. } => &[WallHandling, HazardContact, ObstacleContact, EnemyContact],
            EffectKind::TeleportBurst { .. } => &[Burst],
            EffectKind::AbsorbEnemies { .. } => &[EnemyContact],
            EffectKind::PermanentSpeed => &[TickInterval],
            EffectKind::MindControl => &[EnemyStun],
            EffectKind::FractalGrowth { .. } => &[GrowthAmount],
            EffectKind::PhantomClone => &[PursuitTarget],
        }
    }

    /// Wall phase only intercepts while an engagement window is open.
    fn needs_engagement(self) -> bool {
        matches!(self, EffectKind::WallPhase { .. })
    }
}

/// One granted mutation.
#[derive(Clone, Debug)]
pub struct EffectInstance {
    pub id: MutationId,
    pub kind: EffectKind,
    pub active: bool,
    /// Wall-clock expiry for timed effects.
    pub expires_at: Option<u64>,
    /// Open wall-phase window.
    pub engaged_until: Option<u64>,
    /// Last teleport burst, or grant time.
    pub last_burst_at: u64,
    /// Phantom clone position.
    pub decoy: Option<Cell>,
}

impl EffectInstance {
    fn new(id: MutationId, now: u64) -> Self {
        let def = id.def();
        let mut inst = EffectInstance {
            id,
            kind: def.effect,
            active: true,
            expires_at: None,
            engaged_until: None,
            last_burst_at: now,
            decoy: None,
        };
        inst.arm(now);
        inst
    }

    fn arm(&mut self, now: u64) {
        self.active = true;
        self.last_burst_at = now;
        self.expires_at = match self.id.def().duration {
            EffectDuration::Permanent => None,
            EffectDuration::Timed(ms) => Some(now + ms),
        };
    }

    /// Active and not past its wall-clock expiry.
    pub fn is_live(&self, now: u64) -> bool {
        self.active && self.expires_at.map_or(true, |t| now < t)
    }

    pub fn is_engaged(&self, now: u64) -> bool {
        self.engaged_until.map_or(false, |t| now < t)
    }

    pub fn intercepts(&self, point: DecisionPoint, now: u64) -> bool {
        self.is_live(now)
            && self.kind.intercepts().contains(&point)
            && (!self.kind.needs_engagement() || self.is_engaged(now))
    }

    /// Milliseconds left on a timed effect or an engaged phase window.
    pub fn remaining_ms(&self, now: u64) -> Option<u64> {
        if let Some(until) = self.engaged_until.filter(|&t| now < t) {
            return Some(until - now);
        }
        self.expires_at.map(|t| t.saturating_sub(now))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Grant {
    Added,
    /// Already held: re-armed in place, never stacked.
    Rearmed,
}

/// The set of mutations granted this session. At most one instance per id.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffects {
    instances: Vec<EffectInstance>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        ActiveEffects { instances: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn grant(&mut self, id: MutationId, now: u64) -> Grant {
        if let Some(inst) = self.instances.iter_mut().find(|i| i.id == id) {
            inst.arm(now);
            Grant::Rearmed
        } else {
            self.instances.push(EffectInstance::new(id, now));
            Grant::Added
        }
    }

    pub fn get(&self, id: MutationId) -> Option<&EffectInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: MutationId) -> Option<&mut EffectInstance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.iter()
    }

    /// Instances whose `active` flag is still set, in grant order.
    pub fn active(&self, now: u64) -> impl Iterator<Item = &EffectInstance> {
        self.instances.iter().filter(move |i| i.is_live(now))
    }

    /// First live instance intercepting `point`.
    pub fn handler(&self, point: DecisionPoint, now: u64) -> Option<&EffectInstance> {
        self.instances.iter().find(|i| i.intercepts(point, now))
    }

    pub fn intercepts(&self, point: DecisionPoint, now: u64) -> bool {
        self.handler(point, now).is_some()
    }

    // ── Queries used by the collision pipeline ──

    pub fn wall_mode(&self, now: u64) -> WallMode {
        if self.intercepts(DecisionPoint::WallHandling, now) {
            WallMode::Wrapping
        } else {
            WallMode::Bounded
        }
    }

    pub fn phasing(&self, now: u64) -> bool {
        self.intercepts(DecisionPoint::HazardContact, now)
    }

    pub fn absorb_bonus(&self, now: u64) -> Option<u32> {
        self.instances.iter().find_map(|i| match i.kind {
            EffectKind::AbsorbEnemies { bonus } if i.intercepts(DecisionPoint::EnemyContact, now) => Some(bonus),
            _ => None,
        })
    }

    pub fn heal_bonus(&self, now: u64) -> Option<u32> {
        self.handler(DecisionPoint::SelfContact, now).and_then(|i| match i.kind {
            EffectKind::CollisionHeal { bonus } => Some(bonus),
            _ => None,
        })
    }

    /// Fire the one-shot heal. Returns the bonus and deactivates the effect.
    pub fn consume_heal(&mut self, now: u64) -> Option<u32> {
        let inst = self
            .instances
            .iter_mut()
            .find(|i| i.intercepts(DecisionPoint::SelfContact, now))?;
        inst.active = false;
        match inst.kind {
            EffectKind::CollisionHeal { bonus } => Some(bonus),
            _ => None,
        }
    }

    pub fn rear_consumption(&self, now: u64) -> bool {
        self.intercepts(DecisionPoint::Consumption, now)
    }

    pub fn max_extra_growth(&self, now: u64) -> u32 {
        match self.handler(DecisionPoint::GrowthAmount, now).map(|i| i.kind) {
            Some(EffectKind::FractalGrowth { max_extra }) => max_extra,
            _ => 0,
        }
    }

    pub fn speed_effect(&self, now: u64) -> bool {
        self.intercepts(DecisionPoint::TickInterval, now)
    }

    pub fn decoy(&self, now: u64) -> Option<Cell> {
        self.handler(DecisionPoint::PursuitTarget, now).and_then(|i| i.decoy)
    }

    // ── Ability / timers ──

    /// Open a wall-phase window. Ignored without the mutation or while a
    /// window is already open. Returns the window end.
    pub fn engage_phase(&mut self, now: u64) -> Option<u64> {
        let inst = self.instances.iter_mut().find(|i| {
            matches!(i.kind, EffectKind::WallPhase { .. }) && i.is_live(now)
        })?;
        if inst.is_engaged(now) {
            return None;
        }
        let EffectKind::WallPhase { window_ms } = inst.kind else { return None };
        let until = now + window_ms;
        inst.engaged_until = Some(until);
        Some(until)
    }

    /// Close phase windows that have run out. Returns true if one closed.
    pub fn close_phase_windows(&mut self, now: u64) -> bool {
        let mut closed = false;
        for inst in &mut self.instances {
            if inst.engaged_until.map_or(false, |t| now >= t) {
                inst.engaged_until = None;
                closed = true;
            }
        }
        closed
    }

    /// Teleport bursts that are due; resets their timer.
    pub fn take_due_burst(&mut self, now: u64) -> Option<u32> {
        let inst = self
            .instances
            .iter_mut()
            .find(|i| i.intercepts(DecisionPoint::Burst, now))?;
        let EffectKind::TeleportBurst { cells, period_ms } = inst.kind else { return None };
        if now.saturating_sub(inst.last_burst_at) < period_ms {
            return None;
        }
        inst.last_burst_at = now;
        Some(cells)
    }

    /// Deactivate timed effects whose expiry has passed.
    pub fn expire(&mut self, now: u64) -> Vec<MutationId> {
        let mut expired = Vec::new();
        for inst in &mut self.instances {
            if inst.active && inst.expires_at.map_or(false, |t| now >= t) {
                inst.active = false;
                inst.decoy = None;
                expired.push(inst.id);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_phase_requires_engagement() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::CapillaryPhase, 0);
        assert_eq!(fx.wall_mode(10), WallMode::Bounded);
        assert!(!fx.phasing(10));

        assert_eq!(fx.engage_phase(100), Some(8100));
        assert_eq!(fx.wall_mode(100), WallMode::Wrapping);
        assert!(fx.phasing(8099));
        // Second press while engaged is ignored.
        assert_eq!(fx.engage_phase(200), None);

        assert!(!fx.phasing(8100));
        assert!(fx.close_phase_windows(8100));
        assert_eq!(fx.engage_phase(9000), Some(17000));
    }

    #[test]
    fn engage_without_mutation_is_ignored() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::SpineFangs, 0);
        assert_eq!(fx.engage_phase(0), None);
    }

    #[test]
    fn heal_is_one_shot() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::LeechLoop, 0);
        assert_eq!(fx.heal_bonus(5), Some(20));
        assert_eq!(fx.consume_heal(5), Some(20));
        assert_eq!(fx.consume_heal(6), None);
        assert!(!fx.get(MutationId::LeechLoop).map_or(true, |i| i.active));
    }

    #[test]
    fn regrant_rearms_instead_of_stacking() {
        let mut fx = ActiveEffects::new();
        assert_eq!(fx.grant(MutationId::LeechLoop, 0), Grant::Added);
        fx.consume_heal(1);
        assert_eq!(fx.grant(MutationId::LeechLoop, 50), Grant::Rearmed);
        assert_eq!(fx.iter().count(), 1);
        assert_eq!(fx.heal_bonus(51), Some(20));
    }

    #[test]
    fn timed_effects_expire_by_clock() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::DreamParasite, 1000);
        assert!(fx.intercepts(DecisionPoint::EnemyStun, 5999));
        assert!(fx.expire(5999).is_empty());
        assert_eq!(fx.expire(6000), vec![MutationId::DreamParasite]);
        assert!(!fx.intercepts(DecisionPoint::EnemyStun, 6000));
        assert!(fx.expire(7000).is_empty());
    }

    #[test]
    fn burst_fires_on_period() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::SynapticSkip, 0);
        assert_eq!(fx.take_due_burst(7999), None);
        assert_eq!(fx.take_due_burst(8000), Some(2));
        assert_eq!(fx.take_due_burst(8001), None);
        assert_eq!(fx.take_due_burst(16000), Some(2));
    }

    #[test]
    fn decision_points_map_to_single_handlers() {
        let mut fx = ActiveEffects::new();
        fx.grant(MutationId::SpineFangs, 0);
        fx.grant(MutationId::NeuronLace, 0);
        fx.grant(MutationId::NeuroleechTendril, 0);
        assert!(fx.rear_consumption(1));
        assert_eq!(fx.max_extra_growth(1), 2);
        assert_eq!(fx.absorb_bonus(1), Some(30));
        assert!(!fx.speed_effect(1));
        assert_eq!(fx.handler(DecisionPoint::SelfContact, 1).map(|i| i.id), None);
    }
}
