use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use winit::event::VirtualKeyCode;

use rnes_core::{Button, ControllerState};

use crate::runner::messages::EngineRequest;
use crate::runner::EngineChannel;
use crate::session::errors::DispatchError;

/// Receives the complete controller vector after every button edge.
pub trait InputSink {
    fn dispatch(&mut self, state: ControllerState) -> Result<(), DispatchError>;
}

impl InputSink for EngineChannel {
    fn dispatch(&mut self, state: ControllerState) -> Result<(), DispatchError> {
        self.send(EngineRequest::SetInputState(state))
            .map_err(|_| DispatchError::Disconnected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: VirtualKeyCode,
    pub button: Button,
}

pub const DEFAULT_BINDINGS: [KeyBinding; 8] = [
    KeyBinding {
        key: VirtualKeyCode::Z,
        button: Button::A,
    },
    KeyBinding {
        key: VirtualKeyCode::X,
        button: Button::B,
    },
    KeyBinding {
        key: VirtualKeyCode::RShift,
        button: Button::Select,
    },
    KeyBinding {
        key: VirtualKeyCode::Return,
        button: Button::Start,
    },
    KeyBinding {
        key: VirtualKeyCode::Up,
        button: Button::Up,
    },
    KeyBinding {
        key: VirtualKeyCode::Down,
        button: Button::Down,
    },
    KeyBinding {
        key: VirtualKeyCode::Left,
        button: Button::Left,
    },
    KeyBinding {
        key: VirtualKeyCode::Right,
        button: Button::Right,
    },
];

pub const DEFAULT_TEST_MODE_KEY: VirtualKeyCode = VirtualKeyCode::Space;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("{key:?} is bound to both {first:?} and {second:?}")]
    DuplicateKey {
        key: VirtualKeyCode,
        first: Button,
        second: Button,
    },
    #[error("{0:?} is reserved for toggling test mode")]
    ReservedKey(VirtualKeyCode),
}

/// The immutable key to button map, validated once at startup.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    buttons: HashMap<VirtualKeyCode, Button>,
    test_mode_key: VirtualKeyCode,
}

impl KeyBindings {
    pub fn new(bindings: &[KeyBinding], test_mode_key: VirtualKeyCode) -> Result<Self, BindingError> {
        let mut buttons = HashMap::with_capacity(bindings.len());

        for binding in bindings {
            if binding.key == test_mode_key {
                return Err(BindingError::ReservedKey(binding.key));
            }

            if let Some(first) = buttons.insert(binding.key, binding.button) {
                return Err(BindingError::DuplicateKey {
                    key: binding.key,
                    first,
                    second: binding.button,
                });
            }
        }

        Ok(Self { buttons, test_mode_key })
    }

    pub fn button(&self, key: VirtualKeyCode) -> Option<Button> {
        self.buttons.get(&key).copied()
    }

    pub fn test_mode_key(&self) -> VirtualKeyCode {
        self.test_mode_key
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            buttons: DEFAULT_BINDINGS.iter().map(|binding| (binding.key, binding.button)).collect(),
            test_mode_key: DEFAULT_TEST_MODE_KEY,
        }
    }
}

/// Whether a key event should still reach the rest of the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Passthrough,
    Consumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    pub disposition: KeyDisposition,
    /// Set on the press edge of the test mode key.
    pub toggle_test_mode: bool,
}

impl KeyOutcome {
    const PASSTHROUGH: KeyOutcome = KeyOutcome {
        disposition: KeyDisposition::Passthrough,
        toggle_test_mode: false,
    };
    const CONSUMED: KeyOutcome = KeyOutcome {
        disposition: KeyDisposition::Consumed,
        toggle_test_mode: false,
    };
}

/// Turns key edges into controller levels.
///
/// Owns the session's only [ControllerState]. Every key edge of a mapped key is followed by a dispatch of the
/// entire vector, even when the level did not change.
pub struct InputTranslator {
    bindings: KeyBindings,
    state: ControllerState,
    /// Mapped keys which are physically down.
    held_keys: HashSet<VirtualKeyCode>,
    test_key_held: bool,
}

impl InputTranslator {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            state: ControllerState::default(),
            held_keys: HashSet::new(),
            test_key_held: false,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Apply one key edge.
    ///
    /// Key repeats of an already held key are not edges: they are consumed without touching the state.
    pub fn on_key_event(&mut self, key: VirtualKeyCode, pressed: bool, sink: &mut dyn InputSink) -> KeyOutcome {
        if key == self.bindings.test_mode_key() {
            let toggle_test_mode = pressed && !self.test_key_held;
            self.test_key_held = pressed;

            return KeyOutcome {
                disposition: KeyDisposition::Consumed,
                toggle_test_mode,
            };
        }

        let Some(button) = self.bindings.button(key) else {
            return if pressed && is_navigation_key(key) {
                KeyOutcome::CONSUMED
            } else {
                KeyOutcome::PASSTHROUGH
            };
        };

        if pressed {
            if !self.held_keys.insert(key) {
                return KeyOutcome::CONSUMED;
            }
        } else {
            self.held_keys.remove(&key);
        }

        // A button stays down while any key bound to it is held.
        let level = self
            .held_keys
            .iter()
            .any(|held| self.bindings.button(*held) == Some(button));
        self.state.set(button, level);
        self.dispatch(sink);

        KeyOutcome::CONSUMED
    }

    /// Release every held button, one dispatch per button.
    ///
    /// The window stops receiving key events once it loses focus, so releases would otherwise be missed.
    pub fn release_all(&mut self, sink: &mut dyn InputSink) {
        self.test_key_held = false;
        self.held_keys.clear();

        let held: Vec<Button> = self.state.pressed().collect();

        for button in held {
            self.state.set(button, false);
            self.dispatch(sink);
        }
    }

    fn dispatch(&self, sink: &mut dyn InputSink) {
        if let Err(e) = sink.dispatch(self.state) {
            log::warn!("Failed to dispatch input {:?}: {}", self.state, e);
        }
    }
}

/// Keys which would scroll or move focus in the UI.
fn is_navigation_key(key: VirtualKeyCode) -> bool {
    matches!(
        key,
        VirtualKeyCode::Up
            | VirtualKeyCode::Down
            | VirtualKeyCode::Left
            | VirtualKeyCode::Right
            | VirtualKeyCode::Space
            | VirtualKeyCode::PageUp
            | VirtualKeyCode::PageDown
            | VirtualKeyCode::Home
            | VirtualKeyCode::End
            | VirtualKeyCode::Tab
    )
}

#[cfg(test)]
mod tests {
    use enum_iterator::{all, reverse_all};

    use super::*;

    impl InputSink for Vec<ControllerState> {
        fn dispatch(&mut self, state: ControllerState) -> Result<(), DispatchError> {
            self.push(state);
            Ok(())
        }
    }

    struct BrokenSink(usize);

    impl InputSink for BrokenSink {
        fn dispatch(&mut self, _state: ControllerState) -> Result<(), DispatchError> {
            self.0 += 1;
            Err(DispatchError::Disconnected)
        }
    }

    fn key_for(button: Button) -> VirtualKeyCode {
        DEFAULT_BINDINGS
            .iter()
            .find(|binding| binding.button == button)
            .map(|binding| binding.key)
            .unwrap()
    }

    #[test]
    fn test_each_edge_updates_one_field() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();
        let mut expected = ControllerState::default();

        // Press everything, then release in a different order.
        let presses = all::<Button>().map(|button| (button, true));
        let releases = reverse_all::<Button>().map(|button| (button, false));

        for (button, pressed) in presses.chain(releases) {
            translator.on_key_event(key_for(button), pressed, &mut sink);
            expected.set(button, pressed);

            assert_eq!(sink.last(), Some(&expected));
        }

        assert_eq!(sink.len(), 16);
        assert_eq!(translator.state(), ControllerState::default());
    }

    #[test]
    fn test_repeats_do_not_dispatch() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();

        let first = translator.on_key_event(VirtualKeyCode::Z, true, &mut sink);
        let repeat = translator.on_key_event(VirtualKeyCode::Z, true, &mut sink);

        assert_eq!(first.disposition, KeyDisposition::Consumed);
        assert_eq!(repeat.disposition, KeyDisposition::Consumed);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_release_without_press_is_dispatched() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();

        let release = translator.on_key_event(VirtualKeyCode::X, false, &mut sink);

        assert_eq!(release.disposition, KeyDisposition::Consumed);
        assert_eq!(sink, vec![ControllerState::default()]);
    }

    #[test]
    fn test_two_keys_on_one_button() {
        let bindings = [
            KeyBinding {
                key: VirtualKeyCode::Z,
                button: Button::A,
            },
            KeyBinding {
                key: VirtualKeyCode::J,
                button: Button::A,
            },
        ];
        let mut translator = InputTranslator::new(KeyBindings::new(&bindings, DEFAULT_TEST_MODE_KEY).unwrap());
        let mut sink = Vec::new();
        let a_held = ControllerState {
            a: true,
            ..Default::default()
        };

        translator.on_key_event(VirtualKeyCode::Z, true, &mut sink);
        translator.on_key_event(VirtualKeyCode::J, true, &mut sink);
        translator.on_key_event(VirtualKeyCode::Z, false, &mut sink);

        assert_eq!(sink, vec![a_held, a_held, a_held]);

        translator.on_key_event(VirtualKeyCode::J, false, &mut sink);

        assert_eq!(sink.len(), 4);
        assert_eq!(sink.last(), Some(&ControllerState::default()));
    }

    #[test]
    fn test_unmapped_keys() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();

        let letter = translator.on_key_event(VirtualKeyCode::Q, true, &mut sink);
        let page_down = translator.on_key_event(VirtualKeyCode::PageDown, true, &mut sink);
        let page_down_release = translator.on_key_event(VirtualKeyCode::PageDown, false, &mut sink);

        assert_eq!(letter.disposition, KeyDisposition::Passthrough);
        assert_eq!(page_down.disposition, KeyDisposition::Consumed);
        assert_eq!(page_down_release.disposition, KeyDisposition::Passthrough);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_test_mode_key_is_not_a_button() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();

        let press = translator.on_key_event(VirtualKeyCode::Space, true, &mut sink);
        let repeat = translator.on_key_event(VirtualKeyCode::Space, true, &mut sink);
        let release = translator.on_key_event(VirtualKeyCode::Space, false, &mut sink);

        assert!(press.toggle_test_mode);
        assert!(!repeat.toggle_test_mode);
        assert!(!release.toggle_test_mode);
        assert_eq!(release.disposition, KeyDisposition::Consumed);
        assert!(sink.is_empty());
        assert_eq!(translator.state(), ControllerState::default());
    }

    #[test]
    fn test_failed_dispatch_does_not_block() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = BrokenSink(0);

        translator.on_key_event(VirtualKeyCode::Z, true, &mut sink);
        translator.on_key_event(VirtualKeyCode::X, true, &mut sink);

        assert_eq!(sink.0, 2);
        assert!(translator.state().a && translator.state().b);
    }

    #[test]
    fn test_release_all() {
        let mut translator = InputTranslator::new(KeyBindings::default());
        let mut sink = Vec::new();

        translator.on_key_event(VirtualKeyCode::Z, true, &mut sink);
        translator.on_key_event(VirtualKeyCode::Left, true, &mut sink);
        sink.clear();

        translator.release_all(&mut sink);

        assert_eq!(
            sink,
            vec![
                ControllerState {
                    left: true,
                    ..Default::default()
                },
                ControllerState::default()
            ]
        );
    }

    #[test]
    fn test_binding_validation() {
        let duplicate = [
            KeyBinding {
                key: VirtualKeyCode::A,
                button: Button::A,
            },
            KeyBinding {
                key: VirtualKeyCode::A,
                button: Button::B,
            },
        ];
        let reserved = [KeyBinding {
            key: VirtualKeyCode::Space,
            button: Button::Start,
        }];

        assert_eq!(
            KeyBindings::new(&duplicate, DEFAULT_TEST_MODE_KEY).unwrap_err(),
            BindingError::DuplicateKey {
                key: VirtualKeyCode::A,
                first: Button::A,
                second: Button::B
            }
        );
        assert_eq!(
            KeyBindings::new(&reserved, DEFAULT_TEST_MODE_KEY).unwrap_err(),
            BindingError::ReservedKey(VirtualKeyCode::Space)
        );
        assert!(KeyBindings::new(&DEFAULT_BINDINGS, DEFAULT_TEST_MODE_KEY).is_ok());
    }
}
