/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move
///   A                     →  Ability (wall phase)
///   X / Y / B             →  Choose mutation 1 / 2 / 3
///   Start                 →  Restart
///   Select                →  Quit
///   any other button      →  Advance
///
/// Built without the "gamepad" feature, the tracker never reports input.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::grid::Dir;
use crate::sim::session::Intent;

use super::input::Action;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

const ALL_BTNS: [Btn; 10] = [
    Btn::A, Btn::B, Btn::X, Btn::Y, Btn::L1, Btn::R1, Btn::L2, Btn::R2, Btn::Start, Btn::Select,
];

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-input state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug)]
struct ActionMap {
    ability: Vec<Btn>,
    choices: [Vec<Btn>; 3],
    restart: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            ability: vec![Btn::A],
            choices: [vec![Btn::X], vec![Btn::Y], vec![Btn::B]],
            restart: vec![Btn::Start],
            quit:    vec![Btn::Select],
        }
    }
}

impl ActionMap {
    fn resolve(&self, btn: Btn) -> Action {
        if self.quit.contains(&btn) {
            Action::Quit
        } else if self.ability.contains(&btn) {
            Action::Play(Intent::Ability)
        } else if self.restart.contains(&btn) {
            Action::Play(Intent::Restart)
        } else if let Some(i) = self.choices.iter().position(|c| c.contains(&btn)) {
            Action::Play(Intent::Choose(i as u8 + 1))
        } else {
            Action::Play(Intent::Advance)
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; 10],

    // Digital directions: D-pad and stick share one slot per direction.
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

fn dir_index(d: Dir) -> usize {
    match d {
        Dir::Up => 0,
        Dir::Down => 1,
        Dir::Left => 2,
        Dir::Right => 3,
    }
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    log::info!("gamepad support unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 10],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Lists with no recognised names keep the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        fn apply(slot: &mut Vec<Btn>, names: &[String]) {
            let parsed = parse_list(names);
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
        let map = &mut self.action_map;
        apply(&mut map.ability, &cfg.ability);
        apply(&mut map.choices[0], &cfg.choice_1);
        apply(&mut map.choices[1], &cfg.choice_2);
        apply(&mut map.choices[2], &cfg.choice_3);
        apply(&mut map.restart, &cfg.restart);
        apply(&mut map.quit, &cfg.quit);
        log::debug!("gamepad mapping: {:?}", self.action_map);
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    /// Actions for inputs that went down this frame.
    pub fn actions(&self) -> Vec<Action> {
        let mut out = vec![];
        for d in Dir::ALL {
            let i = dir_index(d);
            if self.dpad[i].just_pressed || self.stick[i].just_pressed {
                out.push(Action::Play(Intent::Move(d)));
            }
        }
        for btn in ALL_BTNS {
            if self.buttons[btn_index(btn)].just_pressed {
                out.push(self.action_map.resolve(btn));
            }
        }
        out
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    self.update_axis(axis, value);
                }
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // Derive stick digital states
        let next = [
            self.stick_y > STICK_DEADZONE,
            self.stick_y < -STICK_DEADZONE,
            self.stick_x < -STICK_DEADZONE,
            self.stick_x > STICK_DEADZONE,
        ];
        for (state, held) in self.stick.iter_mut().zip(next) {
            if held && !state.held {
                state.just_pressed = true;
            }
            state.held = held;
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dpad = match gilrs_btn {
            Button::DPadUp    => Some(Dir::Up),
            Button::DPadDown  => Some(Dir::Down),
            Button::DPadLeft  => Some(Dir::Left),
            Button::DPadRight => Some(Dir::Right),
            _ => None,
        };
        let state = match (dpad, Btn::from_gilrs(gilrs_btn)) {
            (Some(d), _) => &mut self.dpad[dir_index(d)],
            (None, Some(btn)) => &mut self.buttons[btn_index(btn)],
            (None, None) => return,
        };
        state.held = held;
        if held {
            state.just_pressed = true;
        }
    }

    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::LeftStickX => self.stick_x = value,
            Axis::LeftStickY => self.stick_y = value,
            _ => {}
        }
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_resolves_buttons() {
        let map = ActionMap::default();
        assert_eq!(map.resolve(Btn::A), Action::Play(Intent::Ability));
        assert_eq!(map.resolve(Btn::Y), Action::Play(Intent::Choose(2)));
        assert_eq!(map.resolve(Btn::Start), Action::Play(Intent::Restart));
        assert_eq!(map.resolve(Btn::Select), Action::Quit);
        assert_eq!(map.resolve(Btn::L1), Action::Play(Intent::Advance));
    }

    #[test]
    fn config_overrides_and_ignores_unknown_names() {
        let mut pad = GamepadState::new();
        let mut cfg = crate::config::GameConfig::default().gamepad;
        cfg.ability = vec!["rb".into()];
        cfg.quit = vec!["nonsense".into()];
        pad.load_button_config(&cfg);
        assert_eq!(pad.action_map.resolve(Btn::R1), Action::Play(Intent::Ability));
        assert_eq!(pad.action_map.resolve(Btn::Select), Action::Quit);
    }

    #[test]
    fn idle_pad_reports_nothing() {
        let pad = GamepadState::new();
        assert!(pad.actions().is_empty());
    }
}
