/// Entities: the organism, enemies, electrical pulses and thought bubbles.
///
/// Obstacles and the target are bare `Cell`s held by the world.

use std::collections::VecDeque;

use super::grid::{Cell, Dir};

// ── Organism ──

/// The player's segment chain. Head = front of the deque.
///
/// Invariant: never empty. Growth is modelled as `pending_growth`: each
/// pending unit suppresses one tail removal.
#[derive(Clone, Debug)]
pub struct Organism {
    segments: VecDeque<Cell>,
    /// Direction of the last applied movement.
    pub dir: Dir,
    /// Latest valid direction requested since the last tick.
    pub queued: Option<Dir>,
    pub pending_growth: u32,
}

impl Organism {
    pub fn new(cells: &[Cell], dir: Dir) -> Self {
        assert!(!cells.is_empty(), "organism needs at least one segment");
        Organism {
            segments: cells.iter().copied().collect(),
            dir,
            queued: None,
            pending_growth: 0,
        }
    }

    /// Length-3 organism with its head at `head`, trailing opposite `dir`.
    pub fn spawn(head: Cell, dir: Dir) -> Self {
        let back = dir.reverse();
        let cells = [head, head.step(back), head.step(back).step(back)];
        Organism::new(&cells, dir)
    }

    pub fn head(&self) -> Cell {
        *self.segments.front().expect("organism is never empty")
    }

    /// Segment directly behind the head.
    pub fn neck(&self) -> Option<Cell> {
        self.segments.get(1).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn contains(&self, c: Cell) -> bool {
        self.segments.contains(&c)
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.segments.iter().copied()
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.iter().collect()
    }

    /// Request a direction. Reversals of the current heading are ignored;
    /// otherwise the newest request replaces any earlier one.
    pub fn queue_dir(&mut self, d: Dir) -> bool {
        if d == self.dir.reverse() {
            return false;
        }
        self.queued = Some(d);
        true
    }

    /// Apply the queued direction at the start of a tick.
    pub fn apply_queued(&mut self) {
        if let Some(d) = self.queued.take() {
            self.dir = d;
        }
    }

    pub fn push_head(&mut self, head: Cell) {
        self.segments.push_front(head);
    }

    /// Drop the tail unless growth is pending.
    pub fn settle_tail(&mut self) {
        if self.pending_growth > 0 {
            self.pending_growth -= 1;
        } else if self.segments.len() > 1 {
            self.segments.pop_back();
        }
    }

    #[cfg(test)]
    pub fn advance(&mut self, head: Cell) {
        self.push_head(head);
        self.settle_tail();
    }

    pub fn grow(&mut self, n: u32) {
        self.pending_growth += n;
    }

    pub fn has_duplicates(&self) -> bool {
        let v: Vec<Cell> = self.cells();
        v.iter().enumerate().any(|(i, a)| v[i + 1..].contains(a))
    }
}

// ── Enemies ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Behavior {
    /// Antibody drone: bounces off the grid border, one axis at a time.
    Patrol { dx: i32, dy: i32 },
    /// Microdrone: closes in on its target, throttled by wall-clock.
    Pursuit { last_move_at: u64 },
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub cell: Cell,
    pub behavior: Behavior,
    pub stunned_until: Option<u64>,
}

impl Enemy {
    pub fn patrol(id: usize, cell: Cell, dx: i32, dy: i32) -> Self {
        Enemy { id, cell, behavior: Behavior::Patrol { dx, dy }, stunned_until: None }
    }

    pub fn pursuit(id: usize, cell: Cell, now: u64) -> Self {
        Enemy { id, cell, behavior: Behavior::Pursuit { last_move_at: now }, stunned_until: None }
    }

    pub fn is_patrol(&self) -> bool {
        matches!(self.behavior, Behavior::Patrol { .. })
    }

    pub fn is_stunned(&self, now: u64) -> bool {
        self.stunned_until.map_or(false, |t| now <= t)
    }

    pub fn stun(&mut self, until: u64) {
        self.stunned_until = Some(self.stunned_until.map_or(until, |t| t.max(until)));
    }

    /// Clear an elapsed stun. Returns true while still stunned.
    pub fn refresh_stun(&mut self, now: u64) -> bool {
        match self.stunned_until {
            Some(t) if now > t => {
                self.stunned_until = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

// ── Electrical pulses ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    Row,
    Column,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PulsePhase {
    Warning,
    Deadly,
    Expired,
}

/// A full row or column that warns, then kills, then disappears.
///
/// ```text
///  activated_at      +warning_ms          +lifetime_ms
///       │── Warning ──────│── Deadly ──────────│ removed
/// ```
#[derive(Clone, Debug)]
pub struct Pulse {
    pub orientation: Orientation,
    pub index: i32,
    pub activated_at: u64,
    pub warning_ms: u64,
    pub lifetime_ms: u64,
    /// Latched once the deadly phase has been reported.
    pub deadly: bool,
}

impl Pulse {
    pub fn new(orientation: Orientation, index: i32, now: u64, warning_ms: u64, lifetime_ms: u64) -> Self {
        Pulse { orientation, index, activated_at: now, warning_ms, lifetime_ms, deadly: false }
    }

    pub fn covers(&self, c: Cell) -> bool {
        match self.orientation {
            Orientation::Row => c.y == self.index,
            Orientation::Column => c.x == self.index,
        }
    }

    pub fn phase(&self, now: u64) -> PulsePhase {
        let elapsed = now.saturating_sub(self.activated_at);
        if elapsed >= self.lifetime_ms {
            PulsePhase::Expired
        } else if elapsed >= self.warning_ms || self.deadly {
            PulsePhase::Deadly
        } else {
            PulsePhase::Warning
        }
    }

    pub fn is_deadly(&self, now: u64) -> bool {
        self.phase(now) == PulsePhase::Deadly
    }
}

// ── Thought bubbles (brain level, cosmetic) ──

#[derive(Clone, Debug)]
pub struct ThoughtBubble {
    pub cell: Cell,
    pub text: &'static str,
    pub expires_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_trails_behind_head() {
        let o = Organism::spawn(Cell::new(12, 10), Dir::Right);
        assert_eq!(o.cells(), vec![Cell::new(12, 10), Cell::new(11, 10), Cell::new(10, 10)]);
        assert_eq!(o.neck(), Some(Cell::new(11, 10)));
    }

    #[test]
    fn queue_ignores_reversal_and_keeps_latest() {
        let mut o = Organism::spawn(Cell::new(5, 5), Dir::Right);
        assert!(!o.queue_dir(Dir::Left));
        assert!(o.queue_dir(Dir::Up));
        assert!(o.queue_dir(Dir::Down));
        o.apply_queued();
        assert_eq!(o.dir, Dir::Down);
        assert_eq!(o.queued, None);
    }

    #[test]
    fn advance_respects_pending_growth() {
        let mut o = Organism::spawn(Cell::new(5, 5), Dir::Right);
        o.grow(2);
        o.advance(Cell::new(6, 5));
        o.advance(Cell::new(7, 5));
        assert_eq!(o.len(), 5);
        o.advance(Cell::new(8, 5));
        assert_eq!(o.len(), 5);
        assert_eq!(o.head(), Cell::new(8, 5));
        assert!(!o.has_duplicates());
    }

    #[test]
    fn stun_expires_strictly_after_deadline() {
        let mut e = Enemy::patrol(0, Cell::new(1, 1), 1, 1);
        e.stun(1000);
        assert!(e.refresh_stun(1000));
        assert!(!e.refresh_stun(1001));
        assert_eq!(e.stunned_until, None);
    }

    #[test]
    fn pulse_phases_over_lifetime() {
        let p = Pulse::new(Orientation::Column, 3, 10_000, 1000, 2000);
        assert!(p.covers(Cell::new(3, 17)));
        assert!(!p.covers(Cell::new(4, 3)));
        assert_eq!(p.phase(10_500), PulsePhase::Warning);
        assert_eq!(p.phase(11_000), PulsePhase::Deadly);
        assert_eq!(p.phase(11_500), PulsePhase::Deadly);
        assert_eq!(p.phase(12_100), PulsePhase::Expired);
    }
}
