//! Core emulator crate for the TeC7 educational computer.

/// Main-memory model with the write-protected ROM window and IPL image.
pub mod memory;
pub use memory::{Memory, IPL_IMAGE, MEMORY_BYTES, ROM_START};

/// Architecturally visible register and flag identifiers.
pub mod registers;
pub use registers::{Flag, Reg};

/// Opcode byte field extraction and field decode tables.
pub mod decoder;
pub use decoder::{split, AddrMode, Fields, Gr};

/// Mnemonic encoding table shared with the assembler.
pub mod encoding;
pub use encoding::{lookup_mnemonic, EncodingClass, OpcodeSpec, OPCODE_TABLE};

/// Machine timing constants and the per-operation state-cost table.
pub mod timing;
pub use timing::{
    state_cost, StateCostKind, DEFAULT_TIMER_PERIOD, SERIAL_UNIT_STATES, SIO_BITS_PER_SEC,
    STATES_PER_SEC, TIMER_TICK_STATES,
};

/// Runtime fault taxonomy.
pub mod fault;
pub use fault::Fault;

/// Memory-mapped peripheral devices and the I/O port map.
pub mod peripherals;
pub use peripherals::{ports, IntervalTimer, Pio, Sio};

/// The CPU itself: decode, execute, interrupts, and the clocked run loop.
pub mod cpu;
pub use cpu::{Cpu, INT0_VECTOR, INT1_VECTOR, INT2_VECTOR, INT3_VECTOR};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
