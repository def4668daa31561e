/// Cooperative timer scheduler.
///
/// All timers run off the session's logical millisecond clock. `pop_due`
/// hands back one expired timer at a time in deadline order (insertion
/// order on ties), so every callback runs to completion before the next
/// one is looked at.
///
/// ## Scopes
///   - `Session`: ambient text cadence; survives level changes.
///   - `Level`:   hazards and level events; dropped on level change and
///     when the run ends.
///
/// One-shot timers of the same kind replace each other, so a fresh text
/// line always gets its full display time.

use super::event::TextChannel;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerKind {
    ImpulsePulse,
    Neuroplasticity,
    ThoughtBubble,
    VirusChatter,
    HostThought,
    ClearText(TextChannel),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    Session,
    Level,
}

#[derive(Clone, Debug)]
struct Timer {
    kind: TimerKind,
    due: u64,
    period: Option<u64>,
    scope: Scope,
    seq: u64,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler { timers: Vec::new(), seq: 0 }
    }

    fn push(&mut self, kind: TimerKind, due: u64, period: Option<u64>, scope: Scope) {
        self.seq += 1;
        self.timers.push(Timer { kind, due, period, scope, seq: self.seq });
    }

    /// Repeating timer, first firing at `first_due`.
    pub fn every(&mut self, kind: TimerKind, first_due: u64, period: u64, scope: Scope) {
        assert!(period > 0, "periodic timer needs a non-zero period");
        self.push(kind, first_due, Some(period), scope);
    }

    /// One-shot timer. Replaces any pending one-shot of the same kind.
    pub fn once(&mut self, kind: TimerKind, due: u64, scope: Scope) {
        self.timers.retain(|t| !(t.kind == kind && t.period.is_none()));
        self.push(kind, due, None, scope);
    }

    pub fn cancel_scope(&mut self, scope: Scope) {
        self.timers.retain(|t| t.scope != scope);
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    #[cfg(test)]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Earliest timer with `due <= now`. Periodic timers are re-armed one
    /// period later; one-shots are removed.
    pub fn pop_due(&mut self, now: u64) -> Option<TimerKind> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;

        let kind = self.timers[idx].kind;
        match self.timers[idx].period {
            Some(p) => self.timers[idx].due += p,
            None => {
                self.timers.remove(idx);
            }
        }
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler, now: u64) -> Vec<TimerKind> {
        std::iter::from_fn(|| s.pop_due(now)).collect()
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut s = Scheduler::new();
        s.once(TimerKind::HostThought, 300, Scope::Session);
        s.once(TimerKind::VirusChatter, 100, Scope::Session);
        s.once(TimerKind::Neuroplasticity, 200, Scope::Level);
        assert_eq!(
            drain(&mut s, 1000),
            vec![TimerKind::VirusChatter, TimerKind::Neuroplasticity, TimerKind::HostThought]
        );
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn periodic_timer_catches_up_one_at_a_time() {
        let mut s = Scheduler::new();
        s.every(TimerKind::ImpulsePulse, 8000, 8000, Scope::Level);
        assert_eq!(s.pop_due(7999), None);
        // A long frame fires each missed period once.
        assert_eq!(drain(&mut s, 24_000), vec![TimerKind::ImpulsePulse; 3]);
        assert_eq!(s.pop_due(24_000), None);
        assert!(s.is_pending(TimerKind::ImpulsePulse));
    }

    #[test]
    fn once_replaces_pending_clear() {
        let mut s = Scheduler::new();
        let clear = TimerKind::ClearText(TextChannel::Virus);
        s.once(clear, 5000, Scope::Level);
        s.once(clear, 9000, Scope::Level);
        assert_eq!(s.pop_due(6000), None);
        assert_eq!(s.pop_due(9000), Some(clear));
    }

    #[test]
    fn level_scope_cancellation_keeps_session_timers() {
        let mut s = Scheduler::new();
        s.every(TimerKind::VirusChatter, 6000, 6000, Scope::Session);
        s.every(TimerKind::ImpulsePulse, 0, 8000, Scope::Level);
        s.once(TimerKind::ClearText(TextChannel::Virus), 5000, Scope::Level);
        s.cancel_scope(Scope::Level);
        assert_eq!(drain(&mut s, 6000), vec![TimerKind::VirusChatter]);
    }
}
