// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pressed-key bookkeeping.

/// Bitmap of held hardware keycodes `0..256`.
///
/// Keycodes outside that range are ignored: they are never reported as held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    bits: [u64; 4],
}

impl KeyState {
    /// Number of tracked keycodes.
    pub const CAPACITY: u32 = 256;

    /// No key held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press (`true`) or release (`false`).
    pub fn set(&mut self, keycode: u32, down: bool) {
        let Some((word, bit)) = Self::locate(keycode) else {
            return;
        };
        if down {
            self.bits[word] |= bit;
        } else {
            self.bits[word] &= !bit;
        }
    }

    /// Whether `keycode` is held.
    pub fn is_down(&self, keycode: u32) -> bool {
        Self::locate(keycode).is_some_and(|(word, bit)| self.bits[word] & bit != 0)
    }

    /// Release every key.
    pub fn clear(&mut self) {
        self.bits = [0; 4];
    }

    /// Whether any key is held.
    pub fn any_down(&self) -> bool {
        self.bits.iter().any(|&w| w != 0)
    }

    fn locate(keycode: u32) -> Option<(usize, u64)> {
        (keycode < Self::CAPACITY).then(|| ((keycode / 64) as usize, 1_u64 << (keycode % 64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut keys = KeyState::new();
        keys.set(38, true);
        keys.set(255, true);
        assert!(keys.is_down(38));
        assert!(keys.is_down(255));
        assert!(!keys.is_down(39));
        keys.set(38, false);
        assert!(!keys.is_down(38));
        assert!(keys.any_down());
        keys.clear();
        assert!(!keys.any_down());
    }

    #[test]
    fn out_of_range_keycodes_are_ignored() {
        let mut keys = KeyState::new();
        keys.set(256, true);
        keys.set(u32::MAX, true);
        assert!(!keys.is_down(256));
        assert!(!keys.any_down());
    }
}
