//! Interval timer.
//!
//! A subcycle accumulator collects executed states. Each time it reaches
//! [`TIMER_TICK_STATES`] while the timer is enabled, the 8-bit counter
//! advances; when the counter matches the period register it resets, the
//! sticky `elapsed` bit latches, and (with interrupts enabled) INT0 is
//! requested. The accumulator gains the current instruction's states only
//! after execution, so an instruction never sees a tick it caused.

use crate::timing::{DEFAULT_TIMER_PERIOD, TIMER_TICK_STATES};

/// Interval-timer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    counter: u8,
    period: u8,
    enabled: bool,
    int_enabled: bool,
    elapsed: bool,
    pending: bool,
    subcycles: u16,
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self {
            counter: 0,
            period: DEFAULT_TIMER_PERIOD,
            enabled: false,
            int_enabled: false,
            elapsed: false,
            pending: false,
            subcycles: 0,
        }
    }
}

impl IntervalTimer {
    /// Advances the counter if a full tick's worth of states accumulated.
    ///
    /// Called once before each instruction fetch.
    pub const fn maybe_tick(&mut self) {
        if !self.enabled || self.subcycles < TIMER_TICK_STATES {
            return;
        }
        self.subcycles = 0;
        if self.counter == self.period {
            self.counter = 0;
            self.elapsed = true;
            if self.int_enabled {
                self.pending = true;
            }
        } else {
            self.counter += 1;
        }
    }

    /// Adds a retired instruction's states to the subcycle accumulator.
    pub const fn accumulate(&mut self, states: u8) {
        self.subcycles = self.subcycles.wrapping_add(states as u16);
    }

    /// CPU read of the timer counter port.
    #[must_use]
    pub const fn read_counter(&self) -> u8 {
        self.counter
    }

    /// CPU read of the timer status port: bit 7 = `elapsed`, which the read
    /// clears.
    pub const fn read_status(&mut self) -> u8 {
        let status = if self.elapsed { 0x80 } else { 0x00 };
        self.elapsed = false;
        status
    }

    /// CPU write of the timer period port.
    pub const fn write_period(&mut self, value: u8) {
        self.period = value;
    }

    /// CPU write of the timer control port: bit 7 = interrupt enable,
    /// bit 0 = timer enable. Enabling clears the counter and `elapsed`.
    pub const fn write_control(&mut self, value: u8) {
        self.int_enabled = value & 0x80 != 0;
        self.enabled = value & 0x01 != 0;
        if self.enabled {
            self.elapsed = false;
            self.counter = 0;
        }
    }

    /// Whether timer interrupts are enabled.
    #[must_use]
    pub const fn int_enabled(&self) -> bool {
        self.int_enabled
    }

    /// Whether an INT0 request is latched.
    #[must_use]
    pub const fn interrupt_pending(&self) -> bool {
        self.pending
    }

    /// Clears the latched INT0 request (done when the interrupt is taken).
    pub const fn clear_pending(&mut self) {
        self.pending = false;
    }
}
