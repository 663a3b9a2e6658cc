use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// The buttons of a standard controller.
///
/// Declaration order matches the order in which the controller shifts its buttons out, see [ControllerState::bits].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    /// The bit this button occupies in [ControllerState::bits].
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

/// Level state of every controller button.
///
/// The engine is always handed a complete copy of this vector, never a delta.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerState {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl ControllerState {
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::Select => self.select,
            Button::Start => self.start,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
        }
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        let field = match button {
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Select => &mut self.select,
            Button::Start => &mut self.start,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
        };

        *field = pressed;
    }

    /// All buttons which are currently held.
    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        enum_iterator::all::<Button>().filter(|button| self.is_pressed(*button))
    }

    /// The shift register layout, `A` in bit 0 through `Right` in bit 7.
    pub fn bits(&self) -> u8 {
        self.pressed().fold(0, |acc, button| acc | (1 << button.bit()))
    }
}
