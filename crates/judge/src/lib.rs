//! TeC7 scenario-driven emulator and judge.

/// Binary and name-table file loaders.
pub mod loader;
/// Two-stream buffered output sink with selectable encodings.
pub mod printer;
/// Scenario event language and parser.
pub mod event;
/// The event-driven run loop around the CPU.
pub mod driver;

pub use driver::{Driver, RunError};
pub use event::{parse_scenario, Event};
pub use loader::{read_binary, read_name_table, LoadError, NameTable, ProgramBinary};
pub use printer::{OutputMode, Printer};
