/// Collision resolution: a fixed precedence table.
///
/// Pure functions. `resolve` decides what happens to a candidate head cell;
/// the caller (`sim::step`) applies the outcome.
///
/// ## Collision Precedence (first match wins)
/// ┌───┬──────────────────────────────────┬───────────────────┬──────────────────────┐
/// │ # │ Condition                         │ Level gate         │ Outcome              │
/// ├───┼──────────────────────────────────┼───────────────────┼──────────────────────┤
/// │ 1 │ candidate off-grid                │ any                │ Terminal(Wall),      │
/// │   │                                   │                    │ phasing: wrap        │
/// │ 2 │ deadly pulse on row/column        │ Nervous            │ Terminal(Pulse),     │
/// │   │                                   │                    │ phasing: ignore      │
/// │ 3 │ obstacle at candidate             │ Circulatory        │ Terminal(Obstacle),  │
/// │   │                                   │                    │ phasing: ignore      │
/// │ 4 │ enemy at candidate                │ any                │ absorb if stunned +  │
/// │   │                                   │                    │ absorb effect, then  │
/// │   │                                   │                    │ fall through to 5;   │
/// │   │                                   │                    │ else                 │
/// │   │                                   │                    │ Terminal(Enemy),     │
/// │   │                                   │                    │ phasing: ignore      │
/// │ 5 │ candidate on any organism cell    │ any                │ Heal if available,   │
/// │   │                                   │                    │ else Terminal(Self)  │
/// │ 6 │ otherwise                         │ any                │ Advance              │
/// └───┴──────────────────────────────────┴───────────────────┴──────────────────────┘
///
/// ## Consumption (after the head is placed)
/// ┌───────────────────────────────┬─────────────┐
/// │ Condition                      │ Consumes?   │
/// ├───────────────────────────────┼─────────────┤
/// │ head == target                 │ YES         │
/// │ rear consumption, neck == target │ YES       │
/// │ Otherwise                      │ NO → tail drops │
/// └───────────────────────────────┴─────────────┘

use super::content::LevelId;
use super::effects::ActiveEffects;
use super::entity::{Enemy, Organism, Pulse};
use super::grid::{Cell, Grid};

/// Immutable view of everything a tick collides against.
pub struct Field<'a> {
    pub grid: Grid,
    pub level: LevelId,
    pub organism: &'a Organism,
    pub obstacles: &'a [Cell],
    pub enemies: &'a [Enemy],
    pub pulses: &'a [Pulse],
    pub now: u64,
}

impl<'a> Field<'a> {
    pub fn deadly_pulse_at(&self, c: Cell) -> bool {
        self.pulses.iter().any(|p| p.covers(c) && p.is_deadly(self.now))
    }

    pub fn obstacle_at(&self, c: Cell) -> bool {
        self.obstacles.contains(&c)
    }

    pub fn enemy_at(&self, c: Cell) -> Option<usize> {
        self.enemies.iter().position(|e| e.cell == c)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cause {
    Wall,
    Pulse,
    Obstacle,
    Enemy,
    SelfCollision,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Advance { head: Cell },
    /// One-shot heal fires: no insertion this tick.
    Heal { bonus: u32 },
    Terminal(Cause),
}

/// Stunned enemy at `index` is removed before the self check; one segment
/// is grown.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Absorbed {
    pub index: usize,
    pub bonus: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Resolution {
    /// Applied first, whatever the outcome.
    pub absorbed: Option<Absorbed>,
    pub outcome: Outcome,
}

impl Resolution {
    fn only(outcome: Outcome) -> Self {
        Resolution { absorbed: None, outcome }
    }
}

/// Resolve a candidate head. See the precedence table above.
pub fn resolve(field: &Field, fx: &ActiveEffects, candidate: Cell) -> Resolution {
    let now = field.now;
    let phasing = fx.phasing(now);

    // 1. Wall
    let head = match field.grid.resolve_wall(candidate, fx.wall_mode(now)) {
        Some(c) => c,
        None => return Resolution::only(Outcome::Terminal(Cause::Wall)),
    };

    // 2. Deadly pulse
    if field.level == LevelId::Nervous && !phasing && field.deadly_pulse_at(head) {
        return Resolution::only(Outcome::Terminal(Cause::Pulse));
    }

    // 3. Obstacle
    if field.level == LevelId::Circulatory && !phasing && field.obstacle_at(head) {
        return Resolution::only(Outcome::Terminal(Cause::Obstacle));
    }

    // 4. Enemy
    let mut absorbed = None;
    if let Some(index) = field.enemy_at(head) {
        let stunned = field.enemies[index].is_stunned(now);
        match fx.absorb_bonus(now) {
            Some(bonus) if stunned => absorbed = Some(Absorbed { index, bonus }),
            _ if phasing => {}
            _ => return Resolution::only(Outcome::Terminal(Cause::Enemy)),
        }
    }

    // 5. Self
    let outcome = if field.organism.contains(head) {
        match fx.heal_bonus(now) {
            Some(bonus) => Outcome::Heal { bonus },
            None => Outcome::Terminal(Cause::SelfCollision),
        }
    } else {
        Outcome::Advance { head }
    };
    Resolution { absorbed, outcome }
}

/// Does the organism, head already placed, eat `target`?
pub fn consumes(organism: &Organism, target: Option<Cell>, rear: bool) -> bool {
    let Some(t) = target else { return false };
    organism.head() == t || (rear && organism.neck() == Some(t))
}
