//! The TeC7 CPU: decode, execute, interrupts, and the clocked run loop.
//!
//! One [`Cpu::step`] executes a single instruction: the timer gets a chance
//! to tick, at most one pending interrupt is serviced, then the opcode is
//! fetched and executed. State counts follow the operation table in
//! [`crate::timing`]; the accumulated count is what the scenario driver's
//! cycle budgets are measured in.

use crate::decoder::{split, AddrMode, Gr};
use crate::fault::Fault;
use crate::memory::Memory;
use crate::peripherals::{ports, IntervalTimer, Pio, Sio};
use crate::registers::{Flag, Reg};
use crate::timing::{state_cost, StateCostKind};

/// RAM address of the INT0 (timer) vector.
pub const INT0_VECTOR: u8 = 0xDC;
/// RAM address of the INT1 (SIO receive) vector.
pub const INT1_VECTOR: u8 = 0xDD;
/// RAM address of the INT2 (SIO transmit) vector.
pub const INT2_VECTOR: u8 = 0xDE;
/// RAM address of the INT3 (console) vector.
pub const INT3_VECTOR: u8 = 0xDF;

/// The machine: registers, flags, memory, and peripherals.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    g0: u8,
    g1: u8,
    g2: u8,
    sp: u8,
    pc: u8,
    carry: bool,
    sign: bool,
    zero: bool,
    int_enabled: bool,
    running: bool,
    fault: Option<Fault>,
    memory: Memory,
    sio: Sio,
    timer: IntervalTimer,
    pio: Pio,
    data_switch: u8,
    buzzer: bool,
    speaker: bool,
    console_int_enabled: bool,
    console_pending: bool,
}

impl Cpu {
    /// A powered-on machine: cleared registers, IPL in ROM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts execution.
    pub const fn run(&mut self) {
        self.running = true;
    }

    /// Stops execution.
    pub const fn stop(&mut self) {
        self.running = false;
    }

    /// Front-panel reset: clears RUN/ERR and the registers, frees the SIO
    /// buffers. Memory and the remaining peripheral registers keep their
    /// contents.
    pub const fn reset(&mut self) {
        self.running = false;
        self.fault = None;
        self.g0 = 0;
        self.g1 = 0;
        self.g2 = 0;
        self.sp = 0;
        self.pc = 0;
        self.sio.reset();
    }

    /// Reads a register.
    #[must_use]
    pub const fn reg(&self, reg: Reg) -> u8 {
        match reg {
            Reg::G0 => self.g0,
            Reg::G1 => self.g1,
            Reg::G2 => self.g2,
            Reg::Sp => self.sp,
            Reg::Pc => self.pc,
        }
    }

    /// Writes a register.
    pub const fn set_reg(&mut self, reg: Reg, value: u8) {
        match reg {
            Reg::G0 => self.g0 = value,
            Reg::G1 => self.g1 = value,
            Reg::G2 => self.g2 = value,
            Reg::Sp => self.sp = value,
            Reg::Pc => self.pc = value,
        }
    }

    /// Reads a condition flag.
    #[must_use]
    pub const fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::C => self.carry,
            Flag::S => self.sign,
            Flag::Z => self.zero,
        }
    }

    /// Writes a condition flag.
    pub const fn set_flag(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::C => self.carry = value,
            Flag::S => self.sign = value,
            Flag::Z => self.zero = value,
        }
    }

    /// Reads main memory.
    #[must_use]
    pub const fn mem(&self, addr: u8) -> u8 {
        self.memory.read(addr)
    }

    /// Writes main memory through the ROM guard.
    pub const fn set_mem(&mut self, addr: u8, value: u8) {
        self.memory.write(addr, value);
    }

    /// Sets the data-switch register.
    pub const fn set_data_switch(&mut self, value: u8) {
        self.data_switch = value;
    }

    /// Loads a program image at `start` through the ROM guard.
    pub fn load_program(&mut self, start: u8, code: &[u8]) {
        self.memory.load_image(start, code);
    }

    /// Latches a console (INT3) interrupt request.
    pub const fn raise_console_interrupt(&mut self) {
        self.console_pending = true;
    }

    /// Host view of the parallel output register.
    #[must_use]
    pub const fn parallel_output(&self) -> u8 {
        self.pio.output()
    }

    /// Host view of the extended parallel output.
    #[must_use]
    pub const fn ext_parallel_output(&self) -> u8 {
        self.pio.ext_output()
    }

    /// Host write of the parallel input register.
    pub const fn write_parallel(&mut self, value: u8) {
        self.pio.write_host_input(value);
    }

    /// Host write of an ADC channel.
    pub const fn write_analog(&mut self, channel: u8, value: u8) {
        self.pio.write_analog(channel, value);
    }

    /// Buzzer line state.
    #[must_use]
    pub const fn buzzer(&self) -> bool {
        self.buzzer
    }

    /// Speaker line state.
    #[must_use]
    pub const fn speaker(&self) -> bool {
        self.speaker
    }

    /// Whether the RUN flag is set.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the ERR flag is set.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.fault.is_some()
    }

    /// The latched fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Whether the SIO RX register holds an unread byte.
    #[must_use]
    pub const fn serial_in_full(&self) -> bool {
        self.sio.rx_full()
    }

    /// Offers one byte to the SIO RX register; refused while it is full.
    pub const fn try_write_serial_in(&mut self, value: u8) -> bool {
        self.sio.try_write_host(value)
    }

    /// Drains the SIO TX register if a byte is staged.
    pub const fn try_read_serial_out(&mut self) -> Option<u8> {
        self.sio.try_read_host()
    }

    /// Runs instructions until at least `max_states` states elapsed or RUN
    /// dropped. Returns the states actually consumed; the final
    /// instruction may overshoot the budget.
    pub fn clock(&mut self, max_states: u64) -> u64 {
        let mut states = 0;
        self.running = true;
        loop {
            states += u64::from(self.step());
            if states >= max_states || !self.running {
                break;
            }
        }
        states
    }

    /// Executes one instruction and returns its state count (0 for `HALT`
    /// and for faults).
    pub fn step(&mut self) -> u8 {
        self.timer.maybe_tick();
        if self.int_enabled {
            self.service_pending_interrupt();
        }
        let fetch_pc = self.pc;
        let inst = self.fetch();
        let states = self.execute(inst);
        if self.fault.is_some() {
            // Leave PC naming the faulting instruction for the dump.
            self.pc = fetch_pc;
        }
        self.timer.accumulate(states);
        states
    }

    fn service_pending_interrupt(&mut self) {
        if self.timer.int_enabled() && self.timer.interrupt_pending() {
            self.timer.clear_pending();
            self.enter_interrupt(INT0_VECTOR);
        } else if self.sio.rx_int_enabled() && self.sio.rx_full() {
            self.enter_interrupt(INT1_VECTOR);
        } else if self.sio.tx_int_enabled() && self.sio.tx_empty() {
            self.enter_interrupt(INT2_VECTOR);
        } else if self.console_int_enabled && self.console_pending {
            self.console_pending = false;
            self.enter_interrupt(INT3_VECTOR);
        }
    }

    fn enter_interrupt(&mut self, vector: u8) {
        self.sp = self.sp.wrapping_sub(1);
        self.memory.write(self.sp, self.pc);
        self.sp = self.sp.wrapping_sub(1);
        self.memory.write(self.sp, self.status_byte());
        self.pc = self.memory.read(vector);
        self.int_enabled = false;
    }

    const fn status_byte(&self) -> u8 {
        (if self.int_enabled { 0x80 } else { 0 })
            | (if self.carry { 0x04 } else { 0 })
            | (if self.sign { 0x02 } else { 0 })
            | (if self.zero { 0x01 } else { 0 })
    }

    fn fetch(&mut self) -> u8 {
        let byte = self.memory.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    const fn raise(&mut self, fault: Fault) {
        self.fault = Some(fault);
        self.running = false;
    }

    const fn read_gr(&self, gr: Gr) -> u8 {
        match gr {
            Gr::G0 => self.g0,
            Gr::G1 => self.g1,
            Gr::G2 => self.g2,
            Gr::Sp => self.sp,
        }
    }

    const fn write_gr(&mut self, gr: Gr, value: u8) {
        match gr {
            Gr::G0 => self.g0 = value,
            Gr::G1 => self.g1 = value,
            Gr::G2 => self.g2 = value,
            Gr::Sp => self.sp = value,
        }
    }

    /// Fetches the operand byte and resolves the effective operand value.
    fn operand_read(&mut self, mode: AddrMode) -> u8 {
        let operand = self.fetch();
        match mode {
            AddrMode::Direct => self.memory.read(operand),
            AddrMode::G1Indexed => self.memory.read(operand.wrapping_add(self.g1)),
            AddrMode::G2Indexed => self.memory.read(operand.wrapping_add(self.g2)),
            AddrMode::Immediate => operand,
        }
    }

    const fn set_arith_flags(&mut self, wide: u16) {
        self.carry = wide & 0x100 != 0;
        self.sign = wide & 0x80 != 0;
        self.zero = wide & 0xFF == 0;
    }

    const fn set_logic_flags(&mut self, value: u8) {
        self.carry = false;
        self.sign = value & 0x80 != 0;
        self.zero = value == 0;
    }

    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    fn execute(&mut self, inst: u8) -> u8 {
        let fields = split(inst);
        let gr = Gr::from_bits(fields.gr);
        let mode = AddrMode::from_bits(fields.xr);
        match fields.op {
            0x0 => {
                if fields.gr != 0 || fields.xr != 0 {
                    self.raise(Fault::IllegalEncoding);
                    return 0;
                }
                state_cost(StateCostKind::Nop)
            }
            0x1 => {
                let value = self.operand_read(mode);
                self.write_gr(gr, value);
                state_cost(StateCostKind::Load)
            }
            0x2 => {
                let addr = match mode {
                    AddrMode::Direct => self.fetch(),
                    AddrMode::G1Indexed => self.fetch().wrapping_add(self.g1),
                    AddrMode::G2Indexed => self.fetch().wrapping_add(self.g2),
                    AddrMode::Immediate => {
                        self.raise(Fault::IllegalEncoding);
                        return 0;
                    }
                };
                self.memory.write(addr, self.read_gr(gr));
                state_cost(StateCostKind::Store)
            }
            0x3 => {
                let wide = u16::from(self.read_gr(gr)) + u16::from(self.operand_read(mode));
                self.set_arith_flags(wide);
                self.write_gr(gr, wide as u8);
                state_cost(StateCostKind::Alu)
            }
            0x4 => {
                let wide =
                    u16::from(self.read_gr(gr)).wrapping_sub(u16::from(self.operand_read(mode)));
                self.set_arith_flags(wide);
                self.write_gr(gr, wide as u8);
                state_cost(StateCostKind::Alu)
            }
            0x5 => {
                let wide =
                    u16::from(self.read_gr(gr)).wrapping_sub(u16::from(self.operand_read(mode)));
                self.set_arith_flags(wide);
                state_cost(StateCostKind::Alu)
            }
            0x6 => {
                let value = self.read_gr(gr) & self.operand_read(mode);
                self.set_logic_flags(value);
                self.write_gr(gr, value);
                state_cost(StateCostKind::Alu)
            }
            0x7 => {
                let value = self.read_gr(gr) | self.operand_read(mode);
                self.set_logic_flags(value);
                self.write_gr(gr, value);
                state_cost(StateCostKind::Alu)
            }
            0x8 => {
                let value = self.read_gr(gr) ^ self.operand_read(mode);
                self.set_logic_flags(value);
                self.write_gr(gr, value);
                state_cost(StateCostKind::Alu)
            }
            0x9 => {
                let mut value = self.read_gr(gr);
                match fields.xr {
                    // SHLA / SHLL
                    0b00 | 0b01 => {
                        self.carry = value & 0x80 != 0;
                        value <<= 1;
                    }
                    // SHRA: bit 7 preserved
                    0b10 => {
                        self.carry = value & 0x01 != 0;
                        value = (value & 0x80) | (value >> 1);
                    }
                    // SHRL
                    _ => {
                        self.carry = value & 0x01 != 0;
                        value = (value >> 1) & 0x7F;
                    }
                }
                self.sign = value & 0x80 != 0;
                self.zero = value == 0;
                self.write_gr(gr, value);
                state_cost(StateCostKind::Shift)
            }
            0xA => {
                let target = match mode {
                    AddrMode::Direct => self.fetch(),
                    AddrMode::G1Indexed => self.fetch().wrapping_add(self.g1),
                    AddrMode::G2Indexed => self.fetch().wrapping_add(self.g2),
                    AddrMode::Immediate => {
                        self.raise(Fault::IllegalEncoding);
                        return 0;
                    }
                };
                let take = match fields.gr {
                    0b00 => true,        // JMP
                    0b01 => self.zero,   // JZ
                    0b10 => self.carry,  // JC
                    _ => self.sign,      // JM
                };
                if take {
                    self.pc = target;
                }
                state_cost(StateCostKind::Jump)
            }
            0xB => {
                let target = match mode {
                    AddrMode::Direct => self.fetch(),
                    AddrMode::G1Indexed => self.fetch().wrapping_add(self.g1),
                    AddrMode::G2Indexed => self.fetch().wrapping_add(self.g2),
                    AddrMode::Immediate => {
                        self.raise(Fault::IllegalEncoding);
                        return 0;
                    }
                };
                let (take, cost) = match fields.gr {
                    // CALL pushes the return address and always jumps.
                    0b00 => {
                        self.sp = self.sp.wrapping_sub(1);
                        self.memory.write(self.sp, self.pc);
                        (true, state_cost(StateCostKind::Call))
                    }
                    0b01 => (!self.zero, state_cost(StateCostKind::Jump)),
                    0b10 => (!self.carry, state_cost(StateCostKind::Jump)),
                    _ => (!self.sign, state_cost(StateCostKind::Jump)),
                };
                if take {
                    self.pc = target;
                }
                cost
            }
            0xC => match fields.xr {
                0b00 => self.port_in(gr),
                0b11 => self.port_out(gr),
                _ => {
                    self.raise(Fault::IllegalEncoding);
                    0
                }
            },
            0xD => match fields.xr {
                0b00 => {
                    self.memory.write(self.sp.wrapping_sub(1), self.read_gr(gr));
                    self.sp = self.sp.wrapping_sub(1);
                    state_cost(StateCostKind::Push)
                }
                0b10 => {
                    let value = self.memory.read(self.sp);
                    self.sp = self.sp.wrapping_add(1);
                    self.write_gr(gr, value);
                    state_cost(StateCostKind::Pop)
                }
                _ => {
                    self.raise(Fault::IllegalEncoding);
                    0
                }
            },
            0xE => match (fields.gr, fields.xr) {
                (0b00, 0b00) => {
                    self.int_enabled = true;
                    state_cost(StateCostKind::InterruptToggle)
                }
                (0b00, 0b11) => {
                    self.int_enabled = false;
                    state_cost(StateCostKind::InterruptToggle)
                }
                (0b11, 0b00) => {
                    self.pc = self.memory.read(self.sp);
                    self.sp = self.sp.wrapping_add(1);
                    state_cost(StateCostKind::Ret)
                }
                (0b11, 0b11) => {
                    let status = self.memory.read(self.sp);
                    self.sp = self.sp.wrapping_add(1);
                    self.int_enabled = status & 0x80 != 0;
                    self.carry = status & 0x04 != 0;
                    self.sign = status & 0x02 != 0;
                    self.zero = status & 0x01 != 0;
                    self.pc = self.memory.read(self.sp);
                    self.sp = self.sp.wrapping_add(1);
                    state_cost(StateCostKind::Reti)
                }
                _ => {
                    self.raise(Fault::IllegalEncoding);
                    0
                }
            },
            _ => {
                if fields.gr == 0b11 && fields.xr == 0b11 {
                    self.running = false;
                } else {
                    self.raise(Fault::IllegalEncoding);
                }
                0
            }
        }
    }

    fn port_in(&mut self, gr: Gr) -> u8 {
        let port = self.fetch();
        if port >= ports::PORT_LIMIT {
            self.raise(Fault::InvalidPort);
            return 0;
        }
        let value = match port {
            ports::BUZZER | ports::SPEAKER => self.data_switch,
            ports::SIO_DATA => self.sio.read_data(),
            ports::SIO_CONTROL => self.sio.status(),
            ports::TIMER => self.timer.read_counter(),
            ports::TIMER_CONTROL => self.timer.read_status(),
            ports::PARALLEL => self.pio.read_input(),
            ports::ADC_BASE..=0x0B => self.pio.adc_channel(port - ports::ADC_BASE),
            _ => 0,
        };
        self.write_gr(gr, value);
        state_cost(StateCostKind::PortIn)
    }

    fn port_out(&mut self, gr: Gr) -> u8 {
        let port = self.fetch();
        if port >= ports::PORT_LIMIT {
            self.raise(Fault::InvalidPort);
            return 0;
        }
        let value = self.read_gr(gr);
        match port {
            ports::BUZZER => self.buzzer = value & 0x01 != 0,
            ports::SPEAKER => self.speaker = value & 0x01 != 0,
            ports::SIO_DATA => self.sio.write_data(value),
            ports::SIO_CONTROL => self.sio.write_control(value),
            ports::TIMER => self.timer.write_period(value),
            ports::TIMER_CONTROL => self.timer.write_control(value),
            ports::CONSOLE => self.console_int_enabled = value & 0x01 != 0,
            ports::PARALLEL => self.pio.write_output(value),
            ports::PIO_CONTROL => self.pio.write_control(value),
            _ => {}
        }
        state_cost(StateCostKind::PortOut)
    }
}

#[cfg(test)]
mod tests {
    use super::Cpu;
    use crate::registers::{Flag, Reg};

    fn loaded(code: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(0, code);
        cpu.run();
        cpu
    }

    #[test]
    fn ld_immediate_and_add_set_carry() {
        // LD G0,#200 / ADD G0,#100 / HALT
        let mut cpu = loaded(&[0x13, 200, 0x33, 100, 0xFF]);
        cpu.clock(1_000);
        assert!(!cpu.is_running());
        assert_eq!(cpu.reg(Reg::G0), 44);
        assert!(cpu.flag(Flag::C));
        assert!(!cpu.flag(Flag::Z));
    }

    #[test]
    fn shll_moves_top_bit_into_carry() {
        // LD G0,#0FFH / SHLL G0 / HALT
        let mut cpu = loaded(&[0x13, 0xFF, 0x91, 0xFF]);
        cpu.clock(1_000);
        assert_eq!(cpu.reg(Reg::G0), 0xFE);
        assert!(cpu.flag(Flag::C));
        assert!(cpu.flag(Flag::S));
    }

    #[test]
    fn push_pop_round_trips_through_the_stack() {
        // LD SP,#0D0H / LD G0,#42 / PUSH G0 / LD G0,#0 / POP G0 / HALT
        let mut cpu = loaded(&[0x1F, 0xD0, 0x13, 42, 0xD0, 0x13, 0, 0xD2, 0xFF]);
        cpu.clock(1_000);
        assert_eq!(cpu.reg(Reg::G0), 42);
        assert_eq!(cpu.reg(Reg::Sp), 0xD0);
    }

    #[test]
    fn halt_stops_without_error() {
        let mut cpu = loaded(&[0xFF]);
        let states = cpu.clock(1_000);
        assert_eq!(states, 0);
        assert!(!cpu.is_running());
        assert!(!cpu.is_error());
    }

    #[test]
    fn illegal_encoding_faults_and_rewinds_pc() {
        // 0xF0: OP=0xF with GR=0, XR=0 is not HALT.
        let mut cpu = loaded(&[0x00, 0xF0]);
        cpu.clock(1_000);
        assert!(cpu.is_error());
        assert!(!cpu.is_running());
        assert_eq!(cpu.reg(Reg::Pc), 1);
    }
}
