//! Memory-mapped peripheral devices.

/// Serial I/O device.
pub mod sio;
pub use sio::Sio;

/// Interval timer.
pub mod timer;
pub use timer::IntervalTimer;

/// Parallel I/O and the ADC front end.
pub mod pio;
pub use pio::{Pio, ANALOG_HIGH_LEVEL, ANALOG_THRESHOLD};

/// The I/O port map. Only addresses below [`ports::PORT_LIMIT`] are valid.
///
/// Several ports read and write different devices: `0x00`/`0x01` read the
/// data switches but write the buzzer/speaker, `0x03` reads SIO status but
/// writes SIO control, `0x04`/`0x05` pair the timer counter/period and
/// status/control the same way.
pub mod ports {
    /// IN: data switches. OUT: buzzer (bit 0).
    pub const BUZZER: u8 = 0x00;
    /// IN: data switches. OUT: speaker (bit 0).
    pub const SPEAKER: u8 = 0x01;
    /// IN: RX data (clears `RX_FULL`). OUT: TX data (clears `TX_EMPTY`).
    pub const SIO_DATA: u8 = 0x02;
    /// IN: SIO status. OUT: SIO interrupt control.
    pub const SIO_CONTROL: u8 = 0x03;
    /// IN: timer counter. OUT: timer period.
    pub const TIMER: u8 = 0x04;
    /// IN: timer status (clears `elapsed`). OUT: timer control.
    pub const TIMER_CONTROL: u8 = 0x05;
    /// OUT: console interrupt enable (bit 0). Reads as zero.
    pub const CONSOLE: u8 = 0x06;
    /// IN: parallel input. OUT: parallel output.
    pub const PARALLEL: u8 = 0x07;
    /// IN: ADC channel 0. Channels 1..3 follow at `0x09..0x0B`.
    pub const ADC_BASE: u8 = 0x08;
    /// OUT: extended parallel output control. Reads as zero.
    pub const PIO_CONTROL: u8 = 0x0C;
    /// First invalid port address.
    pub const PORT_LIMIT: u8 = 0x10;
}
