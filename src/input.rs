//! Keyboard bindings for the frame parameters.

use winit::keyboard::KeyCode;

/// Actions a key press can trigger. Rotation and light actions feed
/// [`crate::renderer::FrameParams`]; `Quit` ends the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    RotateLeft,
    RotateRight,
    LightNearer,
    LightFarther,
    Quit,
}

/// Maps physical keys to [`KeyAction`]s.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub rotate_left: KeyCode,
    pub rotate_right: KeyCode,
    pub light_farther: KeyCode,
    pub light_nearer: KeyCode,
    pub quit: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            rotate_left: KeyCode::ArrowLeft,
            rotate_right: KeyCode::ArrowRight,
            light_nearer: KeyCode::ArrowUp,
            light_farther: KeyCode::ArrowDown,
            quit: KeyCode::Escape,
        }
    }
}

impl KeyBindings {
    pub fn action(&self, key: KeyCode) -> Option<KeyAction> {
        if key == self.rotate_left {
            Some(KeyAction::RotateLeft)
        } else if key == self.rotate_right {
            Some(KeyAction::RotateRight)
        } else if key == self.light_farther {
            Some(KeyAction::LightFarther)
        } else if key == self.light_nearer {
            Some(KeyAction::LightNearer)
        } else if key == self.quit {
            Some(KeyAction::Quit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arrows_map_to_actions() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.action(KeyCode::ArrowLeft), Some(KeyAction::RotateLeft));
        assert_eq!(bindings.action(KeyCode::ArrowRight), Some(KeyAction::RotateRight));
        assert_eq!(bindings.action(KeyCode::ArrowUp), Some(KeyAction::LightNearer));
        assert_eq!(bindings.action(KeyCode::ArrowDown), Some(KeyAction::LightFarther));
        assert_eq!(bindings.action(KeyCode::Escape), Some(KeyAction::Quit));
    }

    #[test]
    fn up_key_lowers_the_light_distance() {
        let bindings = KeyBindings::default();
        let mut params = crate::renderer::FrameParams::new(0.0);
        let action = bindings.action(KeyCode::ArrowUp).unwrap();
        params.apply(action);
        assert!((params.light_distance + 0.1).abs() < 1e-6);
        let action = bindings.action(KeyCode::ArrowDown).unwrap();
        params.apply(action);
        assert!(params.light_distance.abs() < 1e-6);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(KeyBindings::default().action(KeyCode::Space), None);
    }

    #[test]
    fn rebinding_takes_effect() {
        let bindings = KeyBindings {
            quit: KeyCode::KeyQ,
            ..KeyBindings::default()
        };
        assert_eq!(bindings.action(KeyCode::KeyQ), Some(KeyAction::Quit));
        assert_eq!(bindings.action(KeyCode::Escape), None);
    }
}
