//! Global matrix debounce.
//!
//! Unlike per-key counter schemes, this filter settles the matrix as a whole:
//! any raw reading that differs from the current candidate restarts one shared
//! timer, and only once the entire candidate has held still for the debounce
//! interval is it committed — all rows at once — into the stable matrix. A
//! single still-bouncing switch therefore delays commitment of every row.
//!
//! Time is a wrapping `u16` tick count supplied by the caller (milliseconds on
//! the firmware, arbitrary units in tests); only monotonicity modulo wrap is
//! assumed.

use crate::{Matrix, RowBits, MATRIX_ROWS};

/// Ticks a candidate must hold still before it is committed.
pub const DEBOUNCE_TICKS: u16 = 5;

/// A raw reading that differed from the candidate while a commit was already
/// pending. Purely diagnostic; consumers format it, nothing acts on it.
#[derive(Copy, Clone, Debug)]
pub struct BounceEvent {
    pub row: u8,
    /// Ticks since the settle timer last restarted.
    pub elapsed: u16,
    /// Bits that changed between the old and new candidate.
    pub delta: RowBits,
}

/// The debounce state machine: candidate matrix, stable matrix, and the
/// shared settle timer. One long-lived instance per device.
pub struct Debouncer {
    candidate: Matrix,
    stable: Matrix,
    pending: bool,
    since: u16,
    interval: u16,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self::with_interval(DEBOUNCE_TICKS)
    }

    pub const fn with_interval(interval: u16) -> Self {
        Self {
            candidate: [RowBits::EMPTY; MATRIX_ROWS],
            stable: [RowBits::EMPTY; MATRIX_ROWS],
            pending: false,
            since: 0,
            interval,
        }
    }

    /// The committed matrix. Stays all-zero until the first commit.
    pub fn stable(&self) -> &Matrix {
        &self.stable
    }

    /// True while a changed candidate is waiting out the settle interval.
    pub fn is_settling(&self) -> bool {
        self.pending
    }

    /// Feed one raw scan at tick `now`. Returns whether the stable matrix was
    /// committed this call. Bounce events are discarded; use [`update_with`]
    /// to observe them.
    ///
    /// [`update_with`]: Self::update_with
    pub fn update(&mut self, raw: &Matrix, now: u16) -> bool {
        self.update_with(raw, now, |_| {})
    }

    /// Like [`update`](Self::update), but reports each bounce observed while
    /// a commit was already pending to `on_bounce`.
    pub fn update_with(
        &mut self,
        raw: &Matrix,
        now: u16,
        mut on_bounce: impl FnMut(BounceEvent),
    ) -> bool {
        for row in 0..MATRIX_ROWS {
            if raw[row] != self.candidate[row] {
                if self.pending {
                    on_bounce(BounceEvent {
                        row: row as u8,
                        elapsed: now.wrapping_sub(self.since),
                        delta: self.candidate[row].delta(raw[row]),
                    });
                }
                self.candidate[row] = raw[row];
                self.pending = true;
                self.since = now;
            }
        }

        if self.pending && now.wrapping_sub(self.since) >= self.interval {
            self.stable = self.candidate;
            self.pending = false;
            return true;
        }
        false
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_with(row: usize, col: usize) -> Matrix {
        let mut m = [RowBits::EMPTY; MATRIX_ROWS];
        m[row] = m[row].with(col);
        m
    }

    #[test]
    fn quiet_input_never_touches_state() {
        let mut d = Debouncer::new();
        let zero = [RowBits::EMPTY; MATRIX_ROWS];
        for t in 0..100 {
            assert!(!d.update(&zero, t));
        }
        assert_eq!(*d.stable(), zero);
        assert!(!d.is_settling());
    }

    #[test]
    fn converges_after_interval() {
        let mut d = Debouncer::new();
        let pressed = matrix_with(1, 0);

        // Held steady from t=0; no commit until the interval elapses.
        for t in 0..DEBOUNCE_TICKS {
            assert!(!d.update(&pressed, t));
            assert_eq!(*d.stable(), [RowBits::EMPTY; MATRIX_ROWS]);
        }
        assert!(d.update(&pressed, DEBOUNCE_TICKS));
        assert_eq!(*d.stable(), pressed);
    }

    #[test]
    fn idempotent_after_commit() {
        let mut d = Debouncer::new();
        let pressed = matrix_with(0, 4);
        for t in 0..=DEBOUNCE_TICKS {
            d.update(&pressed, t);
        }
        assert_eq!(*d.stable(), pressed);

        // Same input forever after: no further commits, no bounce events.
        let mut bounces = 0;
        for t in DEBOUNCE_TICKS + 1..DEBOUNCE_TICKS + 50 {
            let committed = d.update_with(&pressed, t, |_| bounces += 1);
            assert!(!committed);
        }
        assert_eq!(bounces, 0);
        assert_eq!(*d.stable(), pressed);
    }

    #[test]
    fn one_bouncing_row_holds_the_whole_matrix() {
        let mut d = Debouncer::new();

        // Row 0 changes at t=0 and would settle on its own by t=5, but row 2
        // flips again at t=3: the shared timer restarts, so neither row
        // commits until t=3+5.
        let mut m = matrix_with(0, 1);
        assert!(!d.update(&m, 0));
        m[2] = m[2].with(6);
        assert!(!d.update(&m, 3));

        for t in 4..8 {
            assert!(!d.update(&m, t));
            assert_eq!(d.stable()[0], RowBits::EMPTY);
        }
        assert!(d.update(&m, 8));
        assert_eq!(*d.stable(), m);
    }

    #[test]
    fn restart_on_every_further_change() {
        let mut d = Debouncer::new();
        let pressed = matrix_with(1, 0);
        let released = [RowBits::EMPTY; MATRIX_ROWS];

        // Chatter: alternate every tick. The timer restarts each time, so no
        // commit ever happens while the contact is still bouncing.
        for t in 0..20 {
            let raw = if t % 2 == 0 { &pressed } else { &released };
            assert!(!d.update(raw, t));
        }
    }

    #[test]
    fn bounce_events_report_row_elapsed_and_delta() {
        let mut d = Debouncer::new();
        let first = matrix_with(1, 0);
        let second = matrix_with(1, 1);

        // First change arms the timer silently.
        let mut events = Vec::new();
        d.update_with(&first, 10, |e| events.push(e));
        assert!(events.is_empty());

        // Second change while pending is a bounce.
        d.update_with(&second, 13, |e| events.push(e));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].row, 1);
        assert_eq!(events[0].elapsed, 3);
        assert_eq!(events[0].delta.bits(), 0b11);
    }

    #[test]
    fn elapsed_survives_tick_wraparound() {
        let mut d = Debouncer::new();
        let pressed = matrix_with(2, 9);

        assert!(!d.update(&pressed, u16::MAX - 1));
        assert!(!d.update(&pressed, u16::MAX));
        // 5 ticks after MAX-1 is 3 post-wrap.
        assert!(d.update(&pressed, 3));
        assert_eq!(*d.stable(), pressed);
    }

    #[test]
    fn scan_scenario_from_bring_up() {
        // The sequence used when bringing the board up: the B switch at
        // (row 1, col 6) bounces during t=0..4, reads consistently from t=5,
        // commits at t=10, and the built report carries B's bit.
        let mut d = Debouncer::new();
        let (b_row, b_col) = crate::Key::B.position();
        let pressed = matrix_with(b_row, b_col);
        let released = [RowBits::EMPTY; MATRIX_ROWS];

        for t in 0..5u16 {
            let raw = if t % 2 == 0 { &released } else { &pressed };
            assert!(!d.update(raw, t));
        }
        // Last change lands at t=5; commit follows one interval later.
        for t in 5..10u16 {
            assert!(!d.update(&pressed, t));
        }
        assert!(d.update(&pressed, 10));
        assert!(d.stable()[b_row].get(b_col));

        let report = crate::report::build(d.stable());
        assert_eq!(report.buttons, crate::report::buttons::B);
    }
}
