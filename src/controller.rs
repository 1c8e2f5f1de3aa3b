//! Key press timing - press, hold-to-repeat and release.
//!
//! [`KeyInputState`] is fed one scan result per main-loop pass together
//! with the current millisecond clock and turns it into [`KeyEvent`]s.
//! A held key fires once on press, again after the initial repeat
//! delay, then once every repeat period. All comparisons use wrapping
//! arithmetic on the `u32` clock.

use crate::keypad::Position;

/// Where the held key is in its press/repeat cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    Released,
    /// Down, waiting out the initial repeat delay.
    Pressed,
    Repeating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    /// First pass with a key down.
    Pressed(Position),
    /// Hold-to-repeat firing.
    Repeat(Position),
    /// The keypad went idle.
    Released,
}

/// At most one press and two repeats come out of a single pass.
pub type KeyEvents = heapless::Vec<KeyEvent, 3>;

/// Returns true once `period` ms have passed since `since`.
pub fn elapsed(now_ms: u32, since_ms: u32, period_ms: u32) -> bool {
    now_ms.wrapping_sub(since_ms) >= period_ms
}

#[derive(Clone, Debug, Default)]
pub struct KeyInputState {
    last_position: Option<Position>,
    phase: Phase,
    press_start_ms: u32,
    last_repeat_ms: u32,
    name_dirty: bool,
}

impl KeyInputState {
    pub const fn new() -> Self {
        Self {
            last_position: None,
            phase: Phase::Released,
            press_start_ms: 0,
            last_repeat_ms: 0,
            name_dirty: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Key whose name was last put on screen (or is about to be).
    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    /// Consume the "show the name" request raised when a different key
    /// is pressed.
    pub fn take_name_dirty(&mut self) -> bool {
        core::mem::take(&mut self.name_dirty)
    }

    /// Forget the last key so its name is drawn again on the next press.
    pub fn forget_last_position(&mut self) {
        self.last_position = None;
    }

    /// Advance by one pass.
    ///
    /// The repeat checks run after the press check within the same pass,
    /// so a zero delay or zero rate fires more than once per pass.
    pub fn update(
        &mut self,
        now_ms: u32,
        scanned: Option<Position>,
        initial_delay_ms: u16,
        repeat_rate_ms: u16,
    ) -> KeyEvents {
        let mut events = KeyEvents::new();

        let Some(pos) = scanned else {
            if self.phase != Phase::Released {
                self.phase = Phase::Released;
                let _ = events.push(KeyEvent::Released);
            }
            return events;
        };

        if self.phase == Phase::Released {
            self.phase = Phase::Pressed;
            self.press_start_ms = now_ms;
            if self.last_position != Some(pos) {
                self.name_dirty = true;
                self.last_position = Some(pos);
            }
            let _ = events.push(KeyEvent::Pressed(pos));
        }

        if self.phase == Phase::Pressed && elapsed(now_ms, self.press_start_ms, initial_delay_ms.into()) {
            self.phase = Phase::Repeating;
            self.last_repeat_ms = now_ms;
            let _ = events.push(KeyEvent::Repeat(pos));
        }

        if self.phase == Phase::Repeating && elapsed(now_ms, self.last_repeat_ms, repeat_rate_ms.into()) {
            self.last_repeat_ms = now_ms;
            let _ = events.push(KeyEvent::Repeat(pos));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Position {
        Position::from_key_number(n).unwrap()
    }

    /// Hold `pos` from 0 to `until` ms, polling every ms, and collect the
    /// times anything fired.
    fn firing_times(delay: u16, rate: u16, until: u32) -> Vec<u32> {
        let mut input = KeyInputState::new();
        let mut times = Vec::new();
        for now in 0..=until {
            for event in input.update(now, Some(key(1)), delay, rate) {
                if matches!(event, KeyEvent::Pressed(_) | KeyEvent::Repeat(_)) {
                    times.push(now);
                }
            }
        }
        times
    }

    #[test]
    fn held_key_fires_at_zero_delay_then_rate() {
        assert_eq!(firing_times(500, 100, 800), vec![0, 500, 600, 700, 800]);
        assert_eq!(firing_times(300, 250, 1000), vec![0, 300, 550, 800]);
    }

    #[test]
    fn short_hold_fires_once() {
        assert_eq!(firing_times(500, 100, 499), vec![0]);
    }

    #[test]
    fn zero_delay_and_rate_fire_three_times_per_first_pass() {
        let mut input = KeyInputState::new();
        let events = input.update(0, Some(key(2)), 0, 0);
        assert_eq!(
            &events[..],
            &[KeyEvent::Pressed(key(2)), KeyEvent::Repeat(key(2)), KeyEvent::Repeat(key(2))]
        );
    }

    #[test]
    fn release_resets_cycle() {
        let mut input = KeyInputState::new();
        input.update(0, Some(key(3)), 500, 100);
        input.update(600, Some(key(3)), 500, 100);
        assert_eq!(input.phase(), Phase::Repeating);

        assert_eq!(&input.update(601, None, 500, 100)[..], &[KeyEvent::Released]);
        assert_eq!(input.phase(), Phase::Released);
        // Idle passes emit nothing further.
        assert!(input.update(602, None, 500, 100).is_empty());

        // Next press starts a fresh delay.
        input.update(700, Some(key(3)), 500, 100);
        assert!(input.update(1100, Some(key(3)), 500, 100).is_empty());
        assert_eq!(&input.update(1200, Some(key(3)), 500, 100)[..], &[KeyEvent::Repeat(key(3))]);
    }

    #[test]
    fn name_dirty_only_when_key_changes() {
        let mut input = KeyInputState::new();
        input.update(0, Some(key(4)), 500, 100);
        assert!(input.take_name_dirty());
        assert!(!input.take_name_dirty());

        input.update(10, None, 500, 100);
        input.update(20, Some(key(4)), 500, 100);
        assert!(!input.take_name_dirty());

        input.update(30, None, 500, 100);
        input.update(40, Some(key(5)), 500, 100);
        assert!(input.take_name_dirty());
        assert_eq!(input.last_position(), Some(key(5)));

        input.forget_last_position();
        input.update(50, None, 500, 100);
        input.update(60, Some(key(5)), 500, 100);
        assert!(input.take_name_dirty());
    }

    #[test]
    fn clock_wrap_keeps_timing() {
        let start = u32::MAX - 100;
        let mut input = KeyInputState::new();
        input.update(start, Some(key(1)), 500, 100);
        assert!(input.update(start.wrapping_add(499), Some(key(1)), 500, 100).is_empty());
        assert_eq!(input.update(start.wrapping_add(500), Some(key(1)), 500, 100).len(), 1);
    }
}
