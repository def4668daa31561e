/// Keyboard input: drains crossterm events once per frame and maps
/// fresh key presses to session intents.
///
/// Key map:
///   W/A/S/D, arrows    →  Move
///   Space              →  Ability (wall phase)
///   1 / 2 / 3          →  Choose mutation
///   R                  →  Restart (after a run ends)
///   Enter              →  Advance
///   Esc / Q / Ctrl+C   →  Quit
///
/// Any other key is forwarded as `Advance`, so the level transition
/// panel accepts "any key". Other phases ignore it.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Dir;
use crate::sim::session::Intent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Play(Intent),
    Quit,
}

pub struct InputState {
    /// Key presses collected during the most recent `drain_events()`.
    fresh_presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { fresh_presses: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame, before advancing the session.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                // Release events only arrive with keyboard enhancement; presses are enough here.
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    self.fresh_presses.push(key);
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }
    }

    /// Actions for this frame's presses, in arrival order.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.fresh_presses.iter().filter_map(|k| map_key(k))
    }
}

/// Translate one key press. Modifier-only and unmapped function keys yield `None`.
pub fn map_key(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    {
        return Some(Action::Quit);
    }

    let intent = match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Action::Quit),

        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Intent::Move(Dir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Intent::Move(Dir::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Intent::Move(Dir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Intent::Move(Dir::Right),

        KeyCode::Char(' ') => Intent::Ability,
        KeyCode::Char(c @ '1'..='3') => Intent::Choose(c as u8 - b'0'),
        KeyCode::Char('r') | KeyCode::Char('R') => Intent::Restart,

        KeyCode::Enter | KeyCode::Char(_) | KeyCode::Tab | KeyCode::Backspace => Intent::Advance,
        _ => return None,
    };
    Some(Action::Play(intent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn movement_keys_cover_wasd_and_arrows() {
        for (codes, dir) in [
            ([KeyCode::Char('w'), KeyCode::Up], Dir::Up),
            ([KeyCode::Char('S'), KeyCode::Down], Dir::Down),
            ([KeyCode::Char('a'), KeyCode::Left], Dir::Left),
            ([KeyCode::Char('D'), KeyCode::Right], Dir::Right),
        ] {
            for code in codes {
                assert_eq!(map_key(&press(code)), Some(Action::Play(Intent::Move(dir))));
            }
        }
    }

    #[test]
    fn digits_choose_one_based() {
        assert_eq!(map_key(&press(KeyCode::Char('1'))), Some(Action::Play(Intent::Choose(1))));
        assert_eq!(map_key(&press(KeyCode::Char('3'))), Some(Action::Play(Intent::Choose(3))));
        // Out-of-menu digits fall through to the generic advance.
        assert_eq!(map_key(&press(KeyCode::Char('4'))), Some(Action::Play(Intent::Advance)));
    }

    #[test]
    fn quit_keys() {
        assert_eq!(map_key(&press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(map_key(&press(KeyCode::Char('q'))), Some(Action::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ctrl_c), Some(Action::Quit));
    }

    #[test]
    fn space_restart_and_any_key() {
        assert_eq!(map_key(&press(KeyCode::Char(' '))), Some(Action::Play(Intent::Ability)));
        assert_eq!(map_key(&press(KeyCode::Char('r'))), Some(Action::Play(Intent::Restart)));
        assert_eq!(map_key(&press(KeyCode::Enter)), Some(Action::Play(Intent::Advance)));
        assert_eq!(map_key(&press(KeyCode::Char('x'))), Some(Action::Play(Intent::Advance)));
        assert_eq!(map_key(&press(KeyCode::F(5))), None);
    }
}
