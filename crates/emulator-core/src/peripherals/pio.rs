//! Parallel I/O and the ADC front end.
//!
//! The four ADC channels shadow the parallel input: driving a parallel
//! input bit sets the matching channel to a HIGH/LOW analog level, and
//! writing an analog level drives the matching input bit through a 1.6 V
//! threshold (on a 3.3 V range).

/// Analog level written to a channel whose parallel input bit is HIGH
/// (3.0 V on the 3.3 V range).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const ANALOG_HIGH_LEVEL: u8 = (255.0 * 3.0 / 3.3) as u8;

/// Analog level above which a channel drives its parallel input bit HIGH
/// (1.6 V on the 3.3 V range).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const ANALOG_THRESHOLD: u8 = (255.0 * 1.6 / 3.3) as u8;

/// Parallel I/O state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pio {
    input: u8,
    output: u8,
    ext_output: u8,
    ext_enabled: bool,
    adc: [u8; 4],
}

impl Pio {
    /// CPU read of the parallel input register.
    #[must_use]
    pub const fn read_input(&self) -> u8 {
        self.input
    }

    /// CPU write of the parallel output register.
    pub const fn write_output(&mut self, value: u8) {
        self.output = value;
    }

    /// CPU write of PIO control: bit 7 enables the extended output and
    /// latches the low nibble into it.
    pub const fn write_control(&mut self, value: u8) {
        self.ext_enabled = value & 0x80 != 0;
        if self.ext_enabled {
            self.ext_output = value & 0x0F;
        }
    }

    /// Host view of the parallel output register.
    #[must_use]
    pub const fn output(&self) -> u8 {
        self.output
    }

    /// Host view of the 4-bit extended parallel output.
    #[must_use]
    pub const fn ext_output(&self) -> u8 {
        self.ext_output
    }

    /// CPU read of an ADC channel (`channel` masked to `0..4`).
    #[must_use]
    pub const fn adc_channel(&self, channel: u8) -> u8 {
        self.adc[(channel & 0x03) as usize]
    }

    /// Host write of the parallel input register. Each input bit drives
    /// its ADC channel to the HIGH or LOW analog level.
    pub const fn write_host_input(&mut self, value: u8) {
        self.input = value;
        let mut bit = 0;
        while bit < 4 {
            self.adc[bit] = if value & (1 << bit) != 0 {
                ANALOG_HIGH_LEVEL
            } else {
                0
            };
            bit += 1;
        }
    }

    /// Host write of an analog level. The matching parallel input bit goes
    /// HIGH when the level exceeds the 1.6 V threshold.
    pub const fn write_analog(&mut self, channel: u8, value: u8) {
        let bit = channel & 0x03;
        self.adc[bit as usize] = value;
        let high = if value > ANALOG_THRESHOLD { 1 } else { 0 };
        self.input = (self.input & !(1 << bit)) | (high << bit);
    }
}
