//! Machine timing constants and the per-operation state-cost table.

/// Clock frequency: 2.4576 MHz.
pub const STATES_PER_SEC: u64 = 2_457_600;

/// Serial line speed: 9,600 bit/s, 8-bit frames.
pub const SIO_BITS_PER_SEC: u64 = 9_600;

/// States needed to move one byte over the SIO (= 32).
pub const SERIAL_UNIT_STATES: u64 = STATES_PER_SEC / (SIO_BITS_PER_SEC * 8);

/// States between interval-timer counter increments (= 32,768).
#[allow(clippy::cast_possible_truncation)]
pub const TIMER_TICK_STATES: u16 = (STATES_PER_SEC / 75) as u16;

/// Power-on value of the timer period register.
pub const DEFAULT_TIMER_PERIOD: u8 = 74;

/// Operation forms with fixed state costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCostKind {
    /// `NO`.
    Nop,
    /// `LD` in any addressing mode.
    Load,
    /// `ST` in any legal addressing mode.
    Store,
    /// `ADD`, `SUB`, `CMP`, `AND`, `OR`, `XOR`.
    Alu,
    /// `SHLA`, `SHLL`, `SHRA`, `SHRL`.
    Shift,
    /// Conditional jumps and `JMP`, taken or not.
    Jump,
    /// `CALL`, including the return-address push.
    Call,
    /// `IN`.
    PortIn,
    /// `OUT`.
    PortOut,
    /// `PUSH`.
    Push,
    /// `POP`.
    Pop,
    /// `EI` and `DI`.
    InterruptToggle,
    /// `RET`.
    Ret,
    /// `RETI`, including the flag restore.
    Reti,
}

/// States consumed by one retirement of the given operation form.
///
/// `HALT` and faulting encodings consume no states and have no row here.
#[must_use]
pub const fn state_cost(kind: StateCostKind) -> u8 {
    match kind {
        StateCostKind::Nop => 2,
        StateCostKind::Load | StateCostKind::Alu | StateCostKind::PortIn => 4,
        StateCostKind::Store
        | StateCostKind::Shift
        | StateCostKind::Jump
        | StateCostKind::PortOut
        | StateCostKind::Push
        | StateCostKind::InterruptToggle
        | StateCostKind::Ret => 3,
        StateCostKind::Call | StateCostKind::Pop | StateCostKind::Reti => 4,
    }
}
