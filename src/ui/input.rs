/// Keyboard input collector.
///
/// Everything in the ladder game is edge-triggered (menu moves, GO,
/// text entry), so unlike a held-key tracker this only keeps the key
/// presses seen during the most recent `drain_events()` call.
///
/// Release events are ignored; Repeat counts as a press so holding an
/// arrow key keeps moving the cursor.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct InputState {
    /// Presses collected this frame, in arrival order.
    presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { presses: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.presses.push(key);
                }
            }
        }
    }

    /// Was any of these keys pressed this frame (no Ctrl/Alt held)?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        self.presses
            .iter()
            .filter(|k| !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT))
            .any(|k| codes.contains(&k.code))
    }

    /// Printable characters typed this frame, in order.
    pub fn typed_chars(&self) -> Vec<char> {
        self.presses
            .iter()
            .filter(|k| !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT))
            .filter_map(|k| match k.code {
                KeyCode::Char(c) if !c.is_control() => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.presses.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    #[cfg(test)]
    fn push(&mut self, key: KeyEvent) {
        self.presses.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn typed_chars_skip_control_combos() {
        let mut kb = InputState::new();
        kb.push(key(KeyCode::Char('a'), KeyModifiers::NONE));
        kb.push(key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        kb.push(key(KeyCode::Char('B'), KeyModifiers::SHIFT));
        kb.push(key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(kb.typed_chars(), vec!['a', 'B']);
        assert!(kb.ctrl_c_pressed());
        assert!(kb.any_pressed(&[KeyCode::Enter]));
        assert!(!kb.any_pressed(&[KeyCode::Char('c')]));
    }
}
