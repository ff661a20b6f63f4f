//! Two-stream buffered output sink.
//!
//! Bytes arrive tagged as *serial* (drained from the SIO) or *print*
//! (sampled machine state); each stream has its own encoding. Bytes buffer
//! until a flush point: switching streams, changing the current stream's
//! mode, or the final explicit flush. Write failures are swallowed so a
//! dying stdout at exit cannot clobber output already emitted.

use std::io::Write;

/// Output encodings selectable per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Raw octets.
    Raw,
    /// `%02X` bytes, space-separated, eight per line.
    Hex,
    /// `0XXH` per byte, one per line.
    Tec,
    /// Signed decimal, one per line.
    Sdec,
    /// Unsigned decimal, one per line.
    Udec,
}

impl OutputMode {
    /// Resolves an (uppercase) mode name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RAW" => Some(Self::Raw),
            "HEX" => Some(Self::Hex),
            "TEC" => Some(Self::Tec),
            "SDEC" => Some(Self::Sdec),
            "UDEC" => Some(Self::Udec),
            _ => None,
        }
    }
}

/// Start-up serial-stream encoding.
pub const DEFAULT_SERIAL_MODE: OutputMode = OutputMode::Raw;
/// Start-up print-stream encoding.
pub const DEFAULT_PRINT_MODE: OutputMode = OutputMode::Udec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    None,
    Serial,
    Print,
}

/// The buffered two-stream sink.
#[derive(Debug)]
pub struct Printer<W: Write> {
    out: W,
    serial_mode: OutputMode,
    print_mode: OutputMode,
    buffer: Vec<u8>,
    current: Stream,
}

impl<W: Write> Printer<W> {
    /// A printer over `out` with the default modes.
    pub fn new(out: W) -> Self {
        Self {
            out,
            serial_mode: DEFAULT_SERIAL_MODE,
            print_mode: DEFAULT_PRINT_MODE,
            buffer: Vec::new(),
            current: Stream::None,
        }
    }

    /// Changes the serial encoding, flushing pending serial bytes first.
    pub fn set_serial_mode(&mut self, mode: OutputMode) {
        if self.current == Stream::Serial {
            self.flush_buffer(self.serial_mode);
        }
        self.serial_mode = mode;
    }

    /// Changes the print encoding, flushing pending print bytes first.
    pub fn set_print_mode(&mut self, mode: OutputMode) {
        if self.current == Stream::Print {
            self.flush_buffer(self.print_mode);
        }
        self.print_mode = mode;
    }

    /// Appends one byte to the serial stream.
    pub fn serial(&mut self, byte: u8) {
        if self.current != Stream::Serial {
            self.flush();
            self.current = Stream::Serial;
        }
        self.buffer.push(byte);
    }

    /// Appends one byte to the print stream.
    pub fn print(&mut self, byte: u8) {
        if self.current != Stream::Print {
            self.flush();
            self.current = Stream::Print;
        }
        self.buffer.push(byte);
    }

    /// Flushes whatever stream is pending.
    pub fn flush(&mut self) {
        match self.current {
            Stream::None => {}
            Stream::Serial => self.flush_buffer(self.serial_mode),
            Stream::Print => self.flush_buffer(self.print_mode),
        }
    }

    /// Takes back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    #[allow(clippy::cast_possible_wrap)]
    fn flush_buffer(&mut self, mode: OutputMode) {
        let mut rendered = Vec::new();
        match mode {
            OutputMode::Raw => rendered.extend_from_slice(&self.buffer),
            OutputMode::Hex => {
                for (index, byte) in self.buffer.iter().enumerate() {
                    rendered.extend_from_slice(format!("{byte:02X}").as_bytes());
                    if index + 1 < self.buffer.len() {
                        rendered.push(if (index + 1) % 8 == 0 { b'\n' } else { b' ' });
                    }
                }
                rendered.push(b'\n');
            }
            OutputMode::Tec => {
                for byte in &self.buffer {
                    rendered.extend_from_slice(format!("{byte:03X}H\n").as_bytes());
                }
            }
            OutputMode::Sdec => {
                for byte in &self.buffer {
                    rendered.extend_from_slice(format!("{}\n", *byte as i8).as_bytes());
                }
            }
            OutputMode::Udec => {
                for byte in &self.buffer {
                    rendered.extend_from_slice(format!("{byte}\n").as_bytes());
                }
            }
        }
        let _ = self.out.write_all(&rendered);
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputMode, Printer};

    fn collect(build: impl FnOnce(&mut Printer<Vec<u8>>)) -> String {
        let mut printer = Printer::new(Vec::new());
        build(&mut printer);
        printer.flush();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn raw_serial_passes_octets_through() {
        let out = collect(|p| {
            p.serial(b'H');
            p.serial(b'I');
        });
        assert_eq!(out, "HI");
    }

    #[test]
    fn hex_groups_eight_bytes_per_line() {
        let out = collect(|p| {
            p.set_print_mode(OutputMode::Hex);
            for byte in 0..10_u8 {
                p.print(byte);
            }
        });
        assert_eq!(out, "00 01 02 03 04 05 06 07\n08 09\n");
    }

    #[test]
    fn tec_mode_pads_to_three_hex_digits() {
        let out = collect(|p| {
            p.set_print_mode(OutputMode::Tec);
            p.print(0x0A);
            p.print(0xFF);
        });
        assert_eq!(out, "00AH\n0FFH\n");
    }

    #[test]
    fn signed_and_unsigned_decimals() {
        let out = collect(|p| {
            p.set_print_mode(OutputMode::Sdec);
            p.print(0x80);
            p.print(0x7F);
        });
        assert_eq!(out, "-128\n127\n");

        let out = collect(|p| {
            p.print(0x80);
        });
        assert_eq!(out, "128\n");
    }

    #[test]
    fn switching_streams_flushes_the_previous_one() {
        let out = collect(|p| {
            p.serial(b'A');
            p.print(1);
            p.serial(b'B');
        });
        assert_eq!(out, "A1\nB");
    }

    #[test]
    fn mode_change_flushes_only_the_matching_stream() {
        let out = collect(|p| {
            p.serial(b'A');
            // Changing the print mode leaves pending serial bytes alone.
            p.set_print_mode(OutputMode::Hex);
            p.serial(b'B');
        });
        assert_eq!(out, "AB");
    }

    #[test]
    fn mode_names_resolve() {
        assert_eq!(OutputMode::from_name("RAW"), Some(OutputMode::Raw));
        assert_eq!(OutputMode::from_name("UDEC"), Some(OutputMode::Udec));
        assert_eq!(OutputMode::from_name("raw"), None);
        assert_eq!(OutputMode::from_name("BIN"), None);
    }
}
