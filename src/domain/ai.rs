/// Enemy controllers.
///
/// Two policies:
///   1. **Patrol**: antibody drones. One cell per movement tick along a
///      fixed ±1 vector; a step that would leave the grid reflects one
///      axis (x first) and the drone holds for that tick.
///   2. **Pursuit**: microdrones. Wall-clock throttled; close in on the
///      target but keep a buffer so contact is never forced.
///
/// Stunned enemies are skipped until the clock passes their stun expiry.

use super::entity::{Behavior, Enemy};
use super::grid::{Cell, Grid};

/// Minimum milliseconds between pursuit moves.
pub const PURSUIT_INTERVAL_MS: u64 = 400;
/// Pursuers hold position at this Manhattan distance or closer.
pub const PURSUIT_BUFFER: i32 = 2;

// ── Patrol ──

/// One patrol step. Returns the new cell and (possibly reflected) vector.
///
/// If the next x leaves the grid, dx flips; otherwise if the next y leaves
/// it, dy flips. Either way the drone stays put this step. In a corner only
/// dx flips; dy follows on the next step.
pub fn patrol_step(grid: &Grid, at: Cell, dx: i32, dy: i32) -> (Cell, i32, i32) {
    let next = at.offset(dx, dy);
    if next.x < 0 || next.x >= grid.width {
        (at, -dx, dy)
    } else if next.y < 0 || next.y >= grid.height {
        (at, dx, -dy)
    } else {
        (next, dx, dy)
    }
}

// ── Pursuit ──

/// Single pursuit decision, ignoring the throttle.
///
/// Moves along the axis with the strictly larger |delta|; ties go vertical.
pub fn pursuit_step(grid: &Grid, at: Cell, target: Cell) -> Cell {
    let dx = target.x - at.x;
    let dy = target.y - at.y;
    if at.manhattan(target) <= PURSUIT_BUFFER {
        return at;
    }
    let next = if dx.abs() > dy.abs() {
        at.offset(dx.signum(), 0)
    } else {
        at.offset(0, dy.signum())
    };
    grid.clamp(next)
}

// ── Controllers ──

/// Advance all patrol enemies by one movement tick.
pub fn tick_patrols(grid: &Grid, enemies: &mut [Enemy], now: u64) {
    for e in enemies.iter_mut() {
        if e.refresh_stun(now) {
            continue;
        }
        if let Behavior::Patrol { dx, dy } = e.behavior {
            let (cell, dx, dy) = patrol_step(grid, e.cell, dx, dy);
            e.cell = cell;
            e.behavior = Behavior::Patrol { dx, dy };
        }
    }
}

/// Per-frame pursuit update. The throttle stamp is taken before the buffer
/// check, so a pursuer holding position still waits a full interval.
pub fn update_pursuers(grid: &Grid, enemies: &mut [Enemy], target: Cell, now: u64) {
    for e in enemies.iter_mut() {
        if e.refresh_stun(now) {
            continue;
        }
        if let Behavior::Pursuit { last_move_at } = e.behavior {
            if now.saturating_sub(last_move_at) < PURSUIT_INTERVAL_MS {
                continue;
            }
            e.behavior = Behavior::Pursuit { last_move_at: now };
            e.cell = pursuit_step(grid, e.cell, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g() -> Grid {
        Grid::new(10, 8)
    }

    #[test]
    fn patrol_moves_diagonally() {
        assert_eq!(patrol_step(&g(), Cell::new(3, 3), 1, -1), (Cell::new(4, 2), 1, -1));
    }

    #[test]
    fn patrol_bounce_holds_position() {
        // Right edge: x flips, no movement on either axis.
        assert_eq!(patrol_step(&g(), Cell::new(9, 3), 1, 1), (Cell::new(9, 3), -1, 1));
        // Bottom edge: y flips.
        assert_eq!(patrol_step(&g(), Cell::new(4, 7), 1, 1), (Cell::new(4, 7), 1, -1));
    }

    #[test]
    fn patrol_corner_flips_one_axis_per_step() {
        let (at, dx, dy) = patrol_step(&g(), Cell::new(0, 0), -1, -1);
        assert_eq!((at, dx, dy), (Cell::new(0, 0), 1, -1));
        let (at, dx, dy) = patrol_step(&g(), at, dx, dy);
        assert_eq!((at, dx, dy), (Cell::new(0, 0), 1, 1));
        assert_eq!(patrol_step(&g(), at, dx, dy), (Cell::new(1, 1), 1, 1));
    }

    #[test]
    fn pursuit_holds_inside_buffer() {
        let at = Cell::new(5, 5);
        assert_eq!(pursuit_step(&g(), at, Cell::new(6, 6)), at);
        assert_eq!(pursuit_step(&g(), at, Cell::new(7, 5)), at);
        assert_eq!(pursuit_step(&g(), at, Cell::new(5, 3)), at);
    }

    #[test]
    fn pursuit_prefers_larger_axis_then_vertical() {
        let at = Cell::new(2, 2);
        assert_eq!(pursuit_step(&g(), at, Cell::new(7, 3)), Cell::new(3, 2));
        assert_eq!(pursuit_step(&g(), at, Cell::new(3, 7)), Cell::new(2, 3));
        // Tie: vertical.
        assert_eq!(pursuit_step(&g(), at, Cell::new(0, 0)), Cell::new(2, 1));
    }

    #[test]
    fn pursuit_throttled_by_clock() {
        let mut es = vec![Enemy::pursuit(0, Cell::new(0, 0), 0)];
        let target = Cell::new(9, 0);
        update_pursuers(&g(), &mut es, target, 399);
        assert_eq!(es[0].cell, Cell::new(0, 0));
        update_pursuers(&g(), &mut es, target, 400);
        assert_eq!(es[0].cell, Cell::new(1, 0));
        update_pursuers(&g(), &mut es, target, 700);
        assert_eq!(es[0].cell, Cell::new(1, 0));
        update_pursuers(&g(), &mut es, target, 800);
        assert_eq!(es[0].cell, Cell::new(2, 0));
    }

    #[test]
    fn pursuit_at_distance_two_never_moves() {
        let mut es = vec![Enemy::pursuit(0, Cell::new(4, 4), 0)];
        let target = Cell::new(5, 5);
        for t in [400, 10_000, 1_000_000] {
            update_pursuers(&g(), &mut es, target, t);
            assert_eq!(es[0].cell, Cell::new(4, 4));
        }
    }

    #[test]
    fn stunned_enemies_are_skipped_until_expiry() {
        let mut es = vec![Enemy::patrol(0, Cell::new(3, 3), 1, 0)];
        es[0].stun(1000);
        tick_patrols(&g(), &mut es, 500);
        tick_patrols(&g(), &mut es, 1000);
        assert_eq!(es[0].cell, Cell::new(3, 3));
        tick_patrols(&g(), &mut es, 1001);
        assert_eq!(es[0].cell, Cell::new(4, 3));
        assert_eq!(es[0].stunned_until, None);
    }
}
