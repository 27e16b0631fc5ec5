use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Physical keys the demo reacts to, independent of the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
    Escape,
}

/// A high-level action produced by input.
///
/// The camera and renderer consume actions, never raw key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Request the window to close.
    Close,
}

impl Action {
    pub fn is_movement(self) -> bool {
        !matches!(self, Self::Close)
    }
}

/// Key to action table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: BTreeMap<Key, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: BTreeMap::from([
                (Key::W, Action::MoveForward),
                (Key::S, Action::MoveBackward),
                (Key::A, Action::MoveLeft),
                (Key::D, Action::MoveRight),
                (Key::Space, Action::MoveUp),
                (Key::LeftShift, Action::MoveDown),
                (Key::Escape, Action::Close),
            ]),
        }
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `key` to `action`, replacing any previous binding of `key`.
    pub fn bind(&mut self, key: Key, action: Action) {
        self.bindings.insert(key, action);
    }

    pub fn unbind(&mut self, key: Key) {
        self.bindings.remove(&key);
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.get(&key).copied()
    }
}

/// Keys currently held down, resolved through a binding table.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    bindings: KeyBindings,
    held: BTreeSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: BTreeSet::new(),
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            if self.held.insert(key) {
                tracing::trace!(?key, "key pressed");
            }
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_active(&self, action: Action) -> bool {
        self.held
            .iter()
            .any(|key| self.bindings.action(*key) == Some(action))
    }

    /// Distinct active actions in declaration order.
    pub fn active_actions(&self) -> Vec<Action> {
        let actions: BTreeSet<Action> = self
            .held
            .iter()
            .filter_map(|key| self.bindings.action(*key))
            .collect();
        actions.into_iter().collect()
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_fly_controls() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.action(Key::W), Some(Action::MoveForward));
        assert_eq!(bindings.action(Key::S), Some(Action::MoveBackward));
        assert_eq!(bindings.action(Key::A), Some(Action::MoveLeft));
        assert_eq!(bindings.action(Key::D), Some(Action::MoveRight));
        assert_eq!(bindings.action(Key::Space), Some(Action::MoveUp));
        assert_eq!(bindings.action(Key::LeftShift), Some(Action::MoveDown));
        assert_eq!(bindings.action(Key::Escape), Some(Action::Close));
    }

    #[test]
    fn held_keys_produce_actions() {
        let mut input = InputState::new();
        input.set_key(Key::D, true);
        input.set_key(Key::W, true);
        assert!(input.is_active(Action::MoveForward));
        assert_eq!(
            input.active_actions(),
            vec![Action::MoveForward, Action::MoveRight]
        );

        input.set_key(Key::W, false);
        assert!(!input.is_active(Action::MoveForward));
        assert_eq!(input.active_actions(), vec![Action::MoveRight]);
    }

    #[test]
    fn rebinding_changes_resolution() {
        let mut bindings = KeyBindings::empty();
        bindings.bind(Key::Space, Action::Close);
        let mut input = InputState::with_bindings(bindings);
        input.set_key(Key::Escape, true);
        assert!(!input.is_active(Action::Close));
        input.set_key(Key::Space, true);
        assert!(input.is_active(Action::Close));
    }

    #[test]
    fn two_keys_one_action_reported_once() {
        let mut bindings = KeyBindings::default();
        bindings.bind(Key::A, Action::MoveForward);
        let mut input = InputState::with_bindings(bindings);
        input.set_key(Key::A, true);
        input.set_key(Key::W, true);
        assert_eq!(input.active_actions(), vec![Action::MoveForward]);
    }

    #[test]
    fn clear_releases_all_keys() {
        let mut input = InputState::new();
        input.set_key(Key::Escape, true);
        input.clear();
        assert!(!input.is_key_down(Key::Escape));
        assert!(input.active_actions().is_empty());
    }

    #[test]
    fn close_is_not_movement() {
        assert!(!Action::Close.is_movement());
        assert!(Action::MoveUp.is_movement());
    }
}
