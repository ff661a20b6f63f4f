//! The event-driven run loop.
//!
//! Events execute strictly in order. `$WAIT`-class events alternate small
//! quanta of CPU time with serial mediation: each quantum is at most
//! [`SERIAL_UNIT_STATES`], the time the hardware needs to move one SIO
//! byte, so the driver's polling rate matches the byte rate without
//! drift. A CPU fault aborts the run with a register/stack dump.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::Write;

use thiserror::Error;

use tec7_core::{Cpu, Flag, Reg, SERIAL_UNIT_STATES};

use crate::event::Event;
use crate::loader::ProgramBinary;
use crate::printer::Printer;

/// A failed run: the message is printed under the `エラー: ` prefix and
/// the process exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RunError(String);

/// Owns the machine, the output sink, and the serial-input queue.
pub struct Driver<W: Write> {
    cpu: Cpu,
    printer: Printer<W>,
    serial_in: VecDeque<u8>,
}

impl<W: Write> Driver<W> {
    /// A driver for a loaded program, writing to `out`.
    pub fn new(binary: &ProgramBinary, out: W) -> Self {
        let mut cpu = Cpu::new();
        cpu.load_program(binary.start, &binary.code);
        Self {
            cpu,
            printer: Printer::new(out),
            serial_in: VecDeque::new(),
        }
    }

    /// Runs an event list to completion, flushing the printer at the end.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the CPU faults (with the full dump as the
    /// message) or when `$WRITE` fires while the machine is stopped. The
    /// printer is deliberately not flushed on that path; only output that
    /// already reached the sink survives, matching the abort semantics.
    pub fn run(&mut self, events: &[Event]) -> Result<(), RunError> {
        for event in events {
            self.apply(event)?;
        }
        self.printer.flush();
        Ok(())
    }

    /// Takes back the output sink.
    pub fn into_output(self) -> W {
        self.printer.into_inner()
    }

    fn apply(&mut self, event: &Event) -> Result<(), RunError> {
        match event {
            Event::SetReg { reg, value } => self.cpu.set_reg(*reg, *value),
            Event::SetFlag { flag, value } => self.cpu.set_flag(*flag, *value),
            Event::SetMem { addr, value } => self.cpu.set_mem(*addr, *value),
            Event::SetDataSwitch { value } => self.cpu.set_data_switch(*value),
            Event::Run => self.cpu.run(),
            Event::Stop => self.cpu.stop(),
            Event::Reset => self.cpu.reset(),
            Event::Serial { bytes } => self.serial_in.extend(bytes),
            Event::Write => {
                if !self.cpu.is_running() {
                    return Err(RunError("TeC is not running.".into()));
                }
                self.cpu.raise_console_interrupt();
            }
            Event::Analog { channel, value } => self.cpu.write_analog(*channel, *value),
            Event::WriteParallel { value } => self.cpu.write_parallel(*value),
            Event::SetSerialMode { mode } => self.printer.set_serial_mode(*mode),
            Event::SetPrintMode { mode } => self.printer.set_print_mode(*mode),
            Event::PrintReg { reg } => self.printer.print(self.cpu.reg(*reg)),
            Event::PrintFlag { flag } => self.printer.print(u8::from(self.cpu.flag(*flag))),
            Event::PrintMem { addr } => self.printer.print(self.cpu.mem(*addr)),
            Event::PrintParallel => self.printer.print(self.cpu.parallel_output()),
            Event::PrintExtParallel => self.printer.print(self.cpu.ext_parallel_output()),
            Event::PrintBuzzer => self.printer.print(u8::from(self.cpu.buzzer())),
            Event::PrintSpeaker => self.printer.print(u8::from(self.cpu.speaker())),
            Event::PrintRun => self.printer.print(u8::from(self.cpu.is_running())),
            Event::WaitStates { states } => {
                let mut elapsed = 0;
                while elapsed < *states && self.cpu.is_running() {
                    elapsed += self.cpu.clock(SERIAL_UNIT_STATES.min(states - elapsed));
                    self.mediate_serial();
                    self.check_machine()?;
                }
            }
            Event::WaitSerial => {
                while self.cpu.is_running()
                    && (self.cpu.serial_in_full() || !self.serial_in.is_empty())
                {
                    self.cpu.clock(SERIAL_UNIT_STATES);
                    self.mediate_serial();
                    self.check_machine()?;
                }
            }
            Event::WaitStop => {
                while self.cpu.is_running() {
                    self.cpu.clock(SERIAL_UNIT_STATES);
                    self.mediate_serial();
                    self.check_machine()?;
                }
            }
        }
        Ok(())
    }

    /// One poll per quantum: drain TX toward the printer, refill RX from
    /// the queue.
    fn mediate_serial(&mut self) {
        if let Some(byte) = self.cpu.try_read_serial_out() {
            self.printer.serial(byte);
        }
        if let Some(front) = self.serial_in.front() {
            if self.cpu.try_write_serial_in(*front) {
                self.serial_in.pop_front();
            }
        }
    }

    fn check_machine(&self) -> Result<(), RunError> {
        if self.cpu.is_error() {
            return Err(RunError(self.dump()));
        }
        Ok(())
    }

    /// The invalid-instruction dump: PC and the five bytes up to it, SP and
    /// the five bytes around it, the registers, and the flags.
    fn dump(&self) -> String {
        let pc = self.cpu.reg(Reg::Pc);
        let sp = self.cpu.reg(Reg::Sp);
        let mut out = String::from("INVALID INSTRUCTION.\n");
        let _ = writeln!(out, "PC: {pc:03X}H");
        for offset in 0..5_u8 {
            let addr = pc.wrapping_sub(4).wrapping_add(offset);
            let _ = writeln!(out, "[{addr:03X}H]: {:03X}H", self.cpu.mem(addr));
        }
        let _ = writeln!(out, "SP: {sp:03X}H");
        for offset in 0..5_u8 {
            let addr = sp.wrapping_sub(2).wrapping_add(offset);
            let _ = writeln!(out, "[{addr:03X}H]: {:03X}H", self.cpu.mem(addr));
        }
        let _ = writeln!(
            out,
            "G0: {:03X}H, G1: {:03X}H, G2: {:03X}H, SP: {sp:03X}H",
            self.cpu.reg(Reg::G0),
            self.cpu.reg(Reg::G1),
            self.cpu.reg(Reg::G2),
        );
        let _ = write!(
            out,
            "C: {}, S: {}, Z: {}",
            u8::from(self.cpu.flag(Flag::C)),
            u8::from(self.cpu.flag(Flag::S)),
            u8::from(self.cpu.flag(Flag::Z)),
        );
        out
    }
}
