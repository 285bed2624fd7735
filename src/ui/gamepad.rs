/// Controller support through gilrs.
///
/// Four actions are bindable from the `[gamepad]` table of config.toml:
///
///   action     default         used for
///   confirm    South, Start    apply count, start, GO, close result
///   cancel     East            close result, back to setup
///   reset      Select          new ladder
///   music      North           background music on/off
///
/// D-pad, left stick and shoulder buttons steer the cursor. Everything is
/// edge-triggered, one event per physical press.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_THRESHOLD: f32 = 0.5;

/// Physical buttons, named by position on the pad.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadButton {
    South,
    East,
    West,
    North,
    LeftShoulder,
    RightShoulder,
    Start,
    Select,
}

impl PadButton {
    fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Accepts positional names and the usual face/shoulder labels.
    fn parse(name: &str) -> Option<PadButton> {
        let button = match name.trim().to_ascii_lowercase().as_str() {
            "south" | "a" | "cross" => PadButton::South,
            "east" | "b" | "circle" => PadButton::East,
            "west" | "x" | "square" => PadButton::West,
            "north" | "y" | "triangle" => PadButton::North,
            "l1" | "lb" | "left_shoulder" => PadButton::LeftShoulder,
            "r1" | "rb" | "right_shoulder" => PadButton::RightShoulder,
            "start" | "options" => PadButton::Start,
            "select" | "back" | "share" => PadButton::Select,
            _ => return None,
        };
        Some(button)
    }
}

#[cfg(feature = "gamepad")]
impl TryFrom<Button> for PadButton {
    type Error = ();

    fn try_from(b: Button) -> Result<Self, ()> {
        Ok(match b {
            Button::South => PadButton::South,
            Button::East => PadButton::East,
            Button::West => PadButton::West,
            Button::North => PadButton::North,
            Button::LeftTrigger => PadButton::LeftShoulder,
            Button::RightTrigger => PadButton::RightShoulder,
            Button::Start => PadButton::Start,
            Button::Select => PadButton::Select,
            _ => return Err(()),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadDir {
    Up,
    Down,
    Left,
    Right,
}

impl PadDir {
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadAction {
    Confirm,
    Cancel,
    Reset,
    Music,
}

/// Button mask per action, indexed by `PadAction as usize`.
#[derive(Debug, PartialEq)]
struct Bindings([u8; 4]);

impl Default for Bindings {
    fn default() -> Self {
        Bindings([
            PadButton::South.bit() | PadButton::Start.bit(),
            PadButton::East.bit(),
            PadButton::Select.bit(),
            PadButton::North.bit(),
        ])
    }
}

impl Bindings {
    /// Config lists replace the default only when at least one name parses.
    fn from_config(cfg: &GamepadConfig) -> Self {
        let mut bindings = Bindings::default();
        let lists = [
            (PadAction::Confirm, &cfg.confirm),
            (PadAction::Cancel, &cfg.cancel),
            (PadAction::Reset, &cfg.reset),
            (PadAction::Music, &cfg.bgm_toggle),
        ];
        for (action, names) in lists {
            let mask = names
                .iter()
                .filter_map(|n| PadButton::parse(n))
                .fold(0u8, |m, b| m | b.bit());
            if mask != 0 {
                bindings.0[action as usize] = mask;
            } else if !names.is_empty() {
                tracing::warn!(?action, ?names, "no usable gamepad button names, keeping default");
            }
        }
        bindings
    }

    fn mask(&self, action: PadAction) -> u8 {
        self.0[action as usize]
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    bindings: Bindings,
    /// Buttons and directions that went down this frame.
    buttons: u8,
    dirs: u8,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick: [f32; 2],
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: Gilrs::new()
                .map_err(|e| tracing::debug!("gamepad support unavailable: {e}"))
                .ok(),
            bindings: Bindings::from_config(cfg),
            buttons: 0,
            dirs: 0,
            stick: [0.0; 2],
        }
    }

    /// Clear last frame's edges and collect new ones.
    pub fn update(&mut self) {
        self.buttons = 0;
        self.dirs = 0;
        #[cfg(feature = "gamepad")]
        self.poll();
    }

    #[cfg(feature = "gamepad")]
    fn poll(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else { return };
        let mut pending = Vec::new();
        while let Some(ev) = gilrs.next_event() {
            pending.push(ev.event);
        }
        for event in pending {
            match event {
                EventType::ButtonPressed(Button::DPadUp, _) => self.dirs |= PadDir::Up.bit(),
                EventType::ButtonPressed(Button::DPadDown, _) => self.dirs |= PadDir::Down.bit(),
                EventType::ButtonPressed(Button::DPadLeft, _) => self.dirs |= PadDir::Left.bit(),
                EventType::ButtonPressed(Button::DPadRight, _) => self.dirs |= PadDir::Right.bit(),
                EventType::ButtonPressed(b, _) => {
                    if let Ok(b) = PadButton::try_from(b) {
                        self.buttons |= b.bit();
                    }
                }
                EventType::AxisChanged(Axis::LeftStickX, v, _) => {
                    self.stick_moved(0, v, PadDir::Left, PadDir::Right)
                }
                // gilrs reports up as positive
                EventType::AxisChanged(Axis::LeftStickY, v, _) => {
                    self.stick_moved(1, v, PadDir::Down, PadDir::Up)
                }
                EventType::Connected => tracing::info!("gamepad connected"),
                EventType::Disconnected => {
                    tracing::info!("gamepad disconnected");
                    self.stick = [0.0; 2];
                }
                _ => {}
            }
        }
    }

    /// A stick direction fires once when the axis leaves the dead zone.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn stick_moved(&mut self, axis: usize, value: f32, neg: PadDir, pos: PadDir) {
        let was_centred = self.stick[axis].abs() <= STICK_THRESHOLD;
        self.stick[axis] = value;
        if was_centred && value.abs() > STICK_THRESHOLD {
            self.dirs |= if value < 0.0 { neg.bit() } else { pos.bit() };
        }
    }

    pub fn action(&self, action: PadAction) -> bool {
        self.buttons & self.bindings.mask(action) != 0
    }

    /// Shoulder buttons double as left/right.
    pub fn dir(&self, dir: PadDir) -> bool {
        let shoulder = match dir {
            PadDir::Left => PadButton::LeftShoulder.bit(),
            PadDir::Right => PadButton::RightShoulder.bit(),
            _ => 0,
        };
        self.dirs & dir.bit() != 0 || self.buttons & shoulder != 0
    }
}
