//! Input events for view windows
//!
//! Hosts translate their toolkit's events into this model and feed them to
//! an [`InteractionMachine`](crate::interaction::InteractionMachine):
//! - keyboard shortcuts for tool-mode changes
//! - pointer press/move/release for crosshair, plane and model drags
//! - wheel notches for slice stepping

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keyboard key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Printable character, stored lowercase
    Char(char),

    Up,
    Down,
    Left,
    Right,

    Shift,
    Control,
    Alt,
    Meta,

    Space,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,

    Unknown(u32),
}

impl Key {
    /// Character key, case-folded so `'D'` and `'d'` are the same key
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_lowercase())
    }
}

/// Modifier key state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }

    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Exact match against the expected modifiers
    pub fn matches(&self, expected: &Modifiers) -> bool {
        self == expected
    }
}

/// Keyboard event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    /// Pressed (true) or released (false)
    pub pressed: bool,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn pressed(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            pressed: true,
            modifiers,
        }
    }

    pub fn released(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            pressed: false,
            modifiers,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button
    Left,
    Right,
    Middle,
    Other(u8),
}

/// Pointer event in display coordinates
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MouseEvent {
    Move {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    Press {
        button: MouseButton,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    Release {
        button: MouseButton,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    /// Wheel notches; positive is forward
    Wheel {
        delta: i32,
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },

    Enter { x: f64, y: f64 },

    Leave,
}

impl MouseEvent {
    pub fn press(button: MouseButton, x: f64, y: f64) -> Self {
        MouseEvent::Press {
            button,
            x,
            y,
            modifiers: Modifiers::new(),
        }
    }

    pub fn release(button: MouseButton, x: f64, y: f64) -> Self {
        MouseEvent::Release {
            button,
            x,
            y,
            modifiers: Modifiers::new(),
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        MouseEvent::Move {
            x,
            y,
            modifiers: Modifiers::new(),
        }
    }

    pub fn wheel(delta: i32) -> Self {
        MouseEvent::Wheel {
            delta,
            x: 0.0,
            y: 0.0,
            modifiers: Modifiers::new(),
        }
    }

    /// Replace the modifier state of events that carry one
    pub fn with_modifiers(mut self, new: Modifiers) -> Self {
        match &mut self {
            MouseEvent::Move { modifiers, .. }
            | MouseEvent::Press { modifiers, .. }
            | MouseEvent::Release { modifiers, .. }
            | MouseEvent::Wheel { modifiers, .. } => *modifiers = new,
            MouseEvent::Enter { .. } | MouseEvent::Leave => {}
        }
        self
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            MouseEvent::Move { x, y, .. }
            | MouseEvent::Press { x, y, .. }
            | MouseEvent::Release { x, y, .. }
            | MouseEvent::Wheel { x, y, .. }
            | MouseEvent::Enter { x, y } => Some((*x, *y)),
            MouseEvent::Leave => None,
        }
    }

    pub fn modifiers(&self) -> Option<Modifiers> {
        match self {
            MouseEvent::Move { modifiers, .. }
            | MouseEvent::Press { modifiers, .. }
            | MouseEvent::Release { modifiers, .. }
            | MouseEvent::Wheel { modifiers, .. } => Some(*modifiers),
            _ => None,
        }
    }
}

/// Keyboard and pointer state of one window
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<Key>,
    pressed_buttons: HashSet<MouseButton>,

    pub modifiers: Modifiers,

    pub mouse_x: f64,
    pub mouse_y: f64,

    pub mouse_in_window: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, event: &KeyEvent) {
        if event.pressed {
            self.pressed_keys.insert(event.key);
        } else {
            self.pressed_keys.remove(&event.key);
        }
        self.modifiers = event.modifiers;
    }

    pub fn handle_mouse(&mut self, event: &MouseEvent) {
        match event {
            MouseEvent::Press { button, .. } => {
                self.pressed_buttons.insert(*button);
            }
            MouseEvent::Release { button, .. } => {
                self.pressed_buttons.remove(button);
            }
            MouseEvent::Enter { .. } => self.mouse_in_window = true,
            MouseEvent::Leave => self.mouse_in_window = false,
            MouseEvent::Move { .. } | MouseEvent::Wheel { .. } => {}
        }
        if let Some((x, y)) = event.position() {
            self.mouse_x = x;
            self.mouse_y = y;
        }
        if let Some(modifiers) = event.modifiers() {
            self.modifiers = modifiers;
        }
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }
}

/// Action bound to a keyboard shortcut
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    // Tool modes
    EnterDistanceMeasure,
    EnterAngleMeasure,
    EnterModelTransform,
    ReturnToNavigation,

    // Model
    ResetModelTransform,

    // Camera
    ResetCamera,
}

/// Keyboard shortcut definition
#[derive(Clone, Debug)]
pub struct Shortcut {
    pub key: Key,
    pub modifiers: Modifiers,
    pub command: Command,
}

impl Shortcut {
    pub fn new(key: Key, modifiers: Modifiers, command: Command) -> Self {
        Self {
            key,
            modifiers,
            command,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.pressed && event.key == self.key && event.modifiers.matches(&self.modifiers)
    }
}

/// Default keyboard shortcuts
pub fn default_shortcuts() -> Vec<Shortcut> {
    vec![
        // Tool modes
        Shortcut::new(Key::char('d'), Modifiers::new(), Command::EnterDistanceMeasure),
        Shortcut::new(Key::char('a'), Modifiers::new(), Command::EnterAngleMeasure),
        Shortcut::new(Key::char('t'), Modifiers::new(), Command::EnterModelTransform),
        Shortcut::new(Key::Escape, Modifiers::new(), Command::ReturnToNavigation),
        // Model
        Shortcut::new(
            Key::char('t'),
            Modifiers::new().with_shift(),
            Command::ResetModelTransform,
        ),
        // Camera
        Shortcut::new(Key::char('r'), Modifiers::new(), Command::ResetCamera),
    ]
}

/// Find command for a key event
pub fn find_command(event: &KeyEvent, shortcuts: &[Shortcut]) -> Option<Command> {
    shortcuts
        .iter()
        .find(|s| s.matches(event))
        .map(|s| s.command.clone())
}
