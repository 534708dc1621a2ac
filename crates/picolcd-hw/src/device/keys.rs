//! Edge-triggered key tracking.

/// A key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(u8),
    Up(u8),
}

/// Pressed state per key index. Index 0 means "no key" and is never tracked.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    pressed: Vec<bool>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a report naming up to two pressed keys and returns the edges,
    /// ordered by key index.
    pub fn update(&mut self, key1: u8, key2: u8) -> Vec<KeyEvent> {
        let needed = usize::from(key1.max(key2)) + 1;
        if self.pressed.len() < needed {
            self.pressed.resize(needed, false);
        }

        let mut events = Vec::new();
        for (index, state) in self.pressed.iter_mut().enumerate().skip(1) {
            let key = index as u8;
            let down = key == key1 || key == key2;
            if *state && !down {
                *state = false;
                events.push(KeyEvent::Up(key));
            } else if down && !*state {
                *state = true;
                events.push(KeyEvent::Down(key));
            }
        }
        events
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        key > 0 && self.pressed.get(usize::from(key)).copied().unwrap_or(false)
    }

    /// Number of tracked slots, including the unused index 0.
    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}
